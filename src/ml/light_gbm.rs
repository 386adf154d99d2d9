//! LightGBM-style boosted trees.
//!
//! Features are quantized into at most `max_bins` bins once per fit and splits
//! are found from per-bin gradient histograms. Boosting starts from the
//! training log-odds and probabilities are `sigmoid(score)`.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::boosting::{BoostingParams, TreeEnsemble, boost};
use super::classifier::{
    Classifier, FitError, Prediction, TrainedModel, check_training_data, sigmoid,
};
use super::tree::{HistogramSplitSearch, TreeParams};

/// Hyperparameters for [`LightGbmTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightGbmOptions {
    pub number_of_leaves: usize,
    pub number_of_iterations: usize,
    pub minimum_example_count_per_leaf: usize,
    pub learning_rate: f64,
    pub max_bins: usize,
    pub l2: f64,
    pub min_sum_hessian: f64,
}

impl Default for LightGbmOptions {
    fn default() -> Self {
        Self {
            number_of_leaves: 8,
            number_of_iterations: 10,
            minimum_example_count_per_leaf: 4,
            learning_rate: 0.1,
            max_bins: 255,
            l2: 0.0,
            min_sum_hessian: 1e-3,
        }
    }
}

impl LightGbmOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.number_of_leaves < 2 {
            return Err("light_gbm.number_of_leaves must be >= 2".to_string());
        }
        if self.number_of_iterations == 0 {
            return Err("light_gbm.number_of_iterations must be > 0".to_string());
        }
        if self.minimum_example_count_per_leaf == 0 {
            return Err("light_gbm.minimum_example_count_per_leaf must be > 0".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("light_gbm.learning_rate must be > 0".to_string());
        }
        if !(2..=u16::MAX as usize).contains(&self.max_bins) {
            return Err(format!(
                "light_gbm.max_bins must be in 2..={}",
                u16::MAX
            ));
        }
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err("light_gbm.l2 must be >= 0".to_string());
        }
        if !(self.min_sum_hessian.is_finite() && self.min_sum_hessian >= 0.0) {
            return Err("light_gbm.min_sum_hessian must be >= 0".to_string());
        }
        Ok(())
    }

    fn boosting_params(&self) -> BoostingParams {
        BoostingParams {
            rounds: self.number_of_iterations,
            learning_rate: self.learning_rate,
            init_from_prior: true,
            tree: TreeParams {
                max_leaves: self.number_of_leaves,
                min_examples_per_leaf: self.minimum_example_count_per_leaf,
                l2: self.l2,
                min_sum_hessian: self.min_sum_hessian,
                min_gain: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LightGbmTrainer {
    pub options: LightGbmOptions,
}

impl LightGbmTrainer {
    pub fn new(options: LightGbmOptions) -> Self {
        Self { options }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightGbmModel {
    pub ensemble: TreeEnsemble,
}

impl Classifier for LightGbmTrainer {
    type Model = LightGbmModel;

    fn name(&self) -> &'static str {
        "LightGBM"
    }

    fn fit(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[bool],
    ) -> Result<LightGbmModel, FitError> {
        self.options.validate().map_err(FitError::InvalidOption)?;
        check_training_data(features, labels)?;
        let search = HistogramSplitSearch::new(features, self.options.max_bins);
        let ensemble = boost(&search, features, labels, &self.options.boosting_params());
        tracing::debug!(
            "LightGBM fitted on {} rows: {} trees, init score {:.4}",
            labels.len(),
            ensemble.trees.len(),
            ensemble.init_score
        );
        Ok(LightGbmModel { ensemble })
    }
}

impl TrainedModel for LightGbmModel {
    fn predict(&self, features: ArrayView1<'_, f32>) -> Prediction {
        let score = self.ensemble.score(features);
        Prediction::from_score(score, sigmoid(score as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, aview1};

    fn two_blobs() -> (Array2<f32>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..16 {
            let jitter = (i % 4) as f32 * 0.03;
            rows.extend([0.1 + jitter, 0.2 + jitter]);
            labels.push(false);
            rows.extend([0.8 + jitter, 0.7 + jitter]);
            labels.push(true);
        }
        (Array2::from_shape_vec((32, 2), rows).unwrap(), labels)
    }

    #[test]
    fn separates_blobs() {
        let (x, y) = two_blobs();
        let model = LightGbmTrainer::default().fit(x.view(), &y).unwrap();
        assert_eq!(model.ensemble.trees.len(), 10);
        // Balanced classes start from zero log-odds.
        assert!(model.ensemble.init_score.abs() < 1e-6);
        let hi = model.predict(aview1(&[0.85, 0.75]));
        let lo = model.predict(aview1(&[0.1, 0.2]));
        assert!(hi.predicted_label && hi.probability > 0.5);
        assert!(!lo.predicted_label && lo.probability < 0.5);
        assert!((hi.probability - sigmoid(hi.score as f64) as f32).abs() < 1e-6);
    }

    #[test]
    fn min_examples_larger_than_data_leaves_single_leaf_trees() {
        let (x, y) = two_blobs();
        let trainer = LightGbmTrainer::new(LightGbmOptions {
            minimum_example_count_per_leaf: 20,
            ..LightGbmOptions::default()
        });
        let model = trainer.fit(x.view(), &y).unwrap();
        assert!(model.ensemble.trees.iter().all(|t| t.leaf_count() == 1));
    }

    #[test]
    fn rejects_single_class() {
        let (x, _) = two_blobs();
        let labels = vec![false; x.nrows()];
        assert_eq!(
            LightGbmTrainer::default().fit(x.view(), &labels).unwrap_err(),
            FitError::SingleClass { label: false }
        );
    }

    #[test]
    fn rejects_bad_bins() {
        let (x, y) = two_blobs();
        let trainer = LightGbmTrainer::new(LightGbmOptions {
            max_bins: 1,
            ..LightGbmOptions::default()
        });
        assert!(matches!(
            trainer.fit(x.view(), &y),
            Err(FitError::InvalidOption(_))
        ));
    }
}
