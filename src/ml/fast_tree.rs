//! FastTree-style boosted decision trees.
//!
//! Small leaf-wise trees with exact split search over sorted feature values.
//! Raw margins are mapped to probabilities by a Platt calibrator fitted on the
//! training scores.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::boosting::{BoostingParams, TreeEnsemble, boost};
use super::calibration::PlattCalibrator;
use super::classifier::{Classifier, FitError, Prediction, TrainedModel, check_training_data};
use super::tree::{ExactSplitSearch, TreeParams};

/// Hyperparameters for [`FastTreeTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTreeOptions {
    pub number_of_leaves: usize,
    pub number_of_trees: usize,
    pub minimum_example_count_per_leaf: usize,
    pub learning_rate: f64,
}

impl Default for FastTreeOptions {
    fn default() -> Self {
        Self {
            number_of_leaves: 4,
            number_of_trees: 4,
            minimum_example_count_per_leaf: 2,
            learning_rate: 0.2,
        }
    }
}

impl FastTreeOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.number_of_leaves < 2 {
            return Err("fast_tree.number_of_leaves must be >= 2".to_string());
        }
        if self.number_of_trees == 0 {
            return Err("fast_tree.number_of_trees must be > 0".to_string());
        }
        if self.minimum_example_count_per_leaf == 0 {
            return Err("fast_tree.minimum_example_count_per_leaf must be > 0".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("fast_tree.learning_rate must be > 0".to_string());
        }
        Ok(())
    }

    fn boosting_params(&self) -> BoostingParams {
        BoostingParams {
            rounds: self.number_of_trees,
            learning_rate: self.learning_rate,
            init_from_prior: false,
            tree: TreeParams {
                max_leaves: self.number_of_leaves,
                min_examples_per_leaf: self.minimum_example_count_per_leaf,
                l2: 0.0,
                min_sum_hessian: 1e-3,
                min_gain: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FastTreeTrainer {
    pub options: FastTreeOptions,
}

impl FastTreeTrainer {
    pub fn new(options: FastTreeOptions) -> Self {
        Self { options }
    }
}

/// Trained FastTree ensemble with its probability calibrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastTreeModel {
    pub ensemble: TreeEnsemble,
    pub calibrator: PlattCalibrator,
}

impl Classifier for FastTreeTrainer {
    type Model = FastTreeModel;

    fn name(&self) -> &'static str {
        "FastTree"
    }

    fn fit(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[bool],
    ) -> Result<FastTreeModel, FitError> {
        self.options.validate().map_err(FitError::InvalidOption)?;
        check_training_data(features, labels)?;
        let ensemble = boost(
            &ExactSplitSearch,
            features,
            labels,
            &self.options.boosting_params(),
        );
        let scores: Vec<f32> = features
            .outer_iter()
            .map(|row| ensemble.score(row))
            .collect();
        let calibrator = PlattCalibrator::fit(&scores, labels);
        tracing::debug!(
            "FastTree fitted on {} rows: {} trees, calibrator slope {:.4} offset {:.4}",
            labels.len(),
            ensemble.trees.len(),
            calibrator.slope,
            calibrator.offset
        );
        Ok(FastTreeModel {
            ensemble,
            calibrator,
        })
    }
}

impl TrainedModel for FastTreeModel {
    fn predict(&self, features: ArrayView1<'_, f32>) -> Prediction {
        let score = self.ensemble.score(features);
        Prediction::from_score(score, self.calibrator.probability(score))
    }
}
