//! Capability traits shared by every binary trainer.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output of a trained binary classifier for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `score > 0`.
    pub predicted_label: bool,
    /// Raw margin (logit for linear models, summed leaf outputs for trees).
    pub score: f32,
    /// Calibrated probability of the positive class.
    pub probability: f32,
}

impl Prediction {
    pub fn from_score(score: f32, probability: f32) -> Self {
        Self {
            predicted_label: score > 0.0,
            score,
            probability,
        }
    }
}

/// Reasons a trainer refuses its input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("training set is empty")]
    Empty,
    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("every training label is {label}; both classes are required")]
    SingleClass { label: bool },
    #[error("non-finite feature at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("optimizer failed: {0}")]
    NoConvergence(String),
}

/// A configured, untrained binary classifier.
pub trait Classifier {
    type Model: TrainedModel;

    /// Short display name used in logs and reports.
    fn name(&self) -> &'static str;

    fn fit(&self, features: ArrayView2<'_, f32>, labels: &[bool]) -> Result<Self::Model, FitError>;
}

/// A fitted model that scores feature vectors.
pub trait TrainedModel {
    fn predict(&self, features: ArrayView1<'_, f32>) -> Prediction;

    fn predict_batch(&self, features: ArrayView2<'_, f32>) -> Vec<Prediction> {
        features.outer_iter().map(|row| self.predict(row)).collect()
    }
}

/// Common input checks run by every trainer before fitting.
pub fn check_training_data(features: ArrayView2<'_, f32>, labels: &[bool]) -> Result<(), FitError> {
    let rows = features.nrows();
    if rows == 0 || labels.is_empty() {
        return Err(FitError::Empty);
    }
    if rows != labels.len() {
        return Err(FitError::LengthMismatch {
            rows,
            labels: labels.len(),
        });
    }
    if labels.iter().all(|&label| label == labels[0]) {
        return Err(FitError::SingleClass { label: labels[0] });
    }
    for ((row, column), value) in features.indexed_iter() {
        if !value.is_finite() {
            return Err(FitError::NonFinite { row, column });
        }
    }
    Ok(())
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
pub fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_single_class_and_mismatch() {
        let x = array![[0.0f32, 1.0], [1.0, 0.0]];
        assert_eq!(
            check_training_data(x.view(), &[true, true]),
            Err(FitError::SingleClass { label: true })
        );
        assert_eq!(
            check_training_data(x.view(), &[true]),
            Err(FitError::LengthMismatch { rows: 2, labels: 1 })
        );
        assert!(check_training_data(x.view(), &[true, false]).is_ok());
    }

    #[test]
    fn rejects_non_finite_values() {
        let x = array![[0.0f32, f32::NAN], [1.0, 0.0]];
        assert_eq!(
            check_training_data(x.view(), &[true, false]),
            Err(FitError::NonFinite { row: 0, column: 1 })
        );
    }

    #[test]
    fn sigmoid_and_softplus_are_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(800.0) - 1.0).abs() < 1e-12);
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
        assert!(softplus(-800.0) >= 0.0);
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn prediction_label_follows_score_sign() {
        assert!(Prediction::from_score(0.1, 0.6).predicted_label);
        assert!(!Prediction::from_score(0.0, 0.5).predicted_label);
    }
}
