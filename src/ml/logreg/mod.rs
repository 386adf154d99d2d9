//! L2-regularized binary logistic regression.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::classifier::{Prediction, TrainedModel, sigmoid};

mod lbfgs;
mod train;

pub use lbfgs::{LbfgsError, LbfgsOptions, LbfgsOutcome, minimize};
pub use train::{LogisticRegressionOptions, LogisticRegressionTrainer};

/// Fitted linear model: `score = weights . x + bias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LogisticRegressionModel {
    /// Validate the model parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("No weights defined".to_string());
        }
        if self.weights.iter().any(|w| !w.is_finite()) || !self.bias.is_finite() {
            return Err("Weights must be finite".to_string());
        }
        Ok(())
    }

    /// Raw logit for a feature vector. Missing trailing features count as zero.
    pub fn score(&self, features: ArrayView1<'_, f32>) -> f32 {
        self.weights
            .iter()
            .zip(features.iter())
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }
}

impl TrainedModel for LogisticRegressionModel {
    fn predict(&self, features: ArrayView1<'_, f32>) -> Prediction {
        let score = self.score(features);
        Prediction::from_score(score, sigmoid(score as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::aview1;

    #[test]
    fn predicts_from_linear_score() {
        let model = LogisticRegressionModel {
            weights: vec![2.0, -1.0],
            bias: 0.5,
        };
        model.validate().unwrap();
        let p = model.predict(aview1(&[1.0, 1.0]));
        assert_eq!(p.score, 1.5);
        assert!(p.predicted_label);
        assert!((p.probability - sigmoid(1.5) as f32).abs() < 1e-6);
        assert!(!model.predict(aview1(&[0.0, 1.0])).predicted_label);
    }

    #[test]
    fn validate_rejects_non_finite() {
        let model = LogisticRegressionModel {
            weights: vec![f32::NAN],
            bias: 0.0,
        };
        assert!(model.validate().is_err());
    }
}
