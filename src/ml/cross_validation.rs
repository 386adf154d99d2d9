//! k-fold cross-validation and held-out evaluation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classifier::{Classifier, FitError, Prediction, TrainedModel};
use super::metrics::BinaryMetrics;
use crate::dataset::split::{SplitError, cross_validation_folds, fold_pairs};
use crate::features::FeatureSet;

#[derive(Debug, Error)]
pub enum CrossValidationError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("{trainer} failed on fold {fold}: {source}")]
    Fit {
        trainer: &'static str,
        fold: usize,
        source: FitError,
    },
}

/// Headline metrics for one validation fold (or their mean).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub accuracy: f64,
    pub f1: f64,
    /// `None` when the fold holds a single class.
    pub auc: Option<f64>,
}

impl From<&BinaryMetrics> for FoldMetrics {
    fn from(metrics: &BinaryMetrics) -> Self {
        Self {
            accuracy: metrics.accuracy,
            f1: metrics.f1,
            auc: metrics.auc,
        }
    }
}

impl FoldMetrics {
    /// Arithmetic mean; AUC averages only the folds where it is defined.
    pub fn mean(folds: &[FoldMetrics]) -> FoldMetrics {
        let n = folds.len().max(1) as f64;
        let aucs: Vec<f64> = folds.iter().filter_map(|f| f.auc).collect();
        FoldMetrics {
            accuracy: folds.iter().map(|f| f.accuracy).sum::<f64>() / n,
            f1: folds.iter().map(|f| f.f1).sum::<f64>() / n,
            auc: if aucs.is_empty() {
                None
            } else {
                Some(aucs.iter().sum::<f64>() / aucs.len() as f64)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub trainer: String,
    pub folds: Vec<FoldMetrics>,
    pub mean: FoldMetrics,
}

/// Fit on k-1 folds and score the held-out fold, for each of `k` folds.
pub fn cross_validate<C: Classifier>(
    classifier: &C,
    data: &FeatureSet,
    k: usize,
    seed: u64,
) -> Result<CrossValidationResult, CrossValidationError> {
    let folds = cross_validation_folds(data.len(), k, seed)?;
    let mut results = Vec::with_capacity(k);
    for (fold_idx, pair) in fold_pairs(&folds).into_iter().enumerate() {
        let train = data.select(&pair.train);
        let validation = data.select(&pair.validation);
        let model = classifier
            .fit(train.view(), &train.labels)
            .map_err(|source| CrossValidationError::Fit {
                trainer: classifier.name(),
                fold: fold_idx + 1,
                source,
            })?;
        let (_, metrics) = evaluate(&model, &validation);
        if metrics.auc.is_none() {
            tracing::warn!(
                "{} fold {}: validation fold has a single class; AUC undefined",
                classifier.name(),
                fold_idx + 1
            );
        }
        tracing::debug!(
            "{} fold {}: accuracy {:.4}, f1 {:.4}",
            classifier.name(),
            fold_idx + 1,
            metrics.accuracy,
            metrics.f1
        );
        results.push(FoldMetrics::from(&metrics));
    }
    let mean = FoldMetrics::mean(&results);
    tracing::info!(
        "{} cross-validation ({k} folds): mean accuracy {:.4}",
        classifier.name(),
        mean.accuracy
    );
    Ok(CrossValidationResult {
        trainer: classifier.name().to_string(),
        folds: results,
        mean,
    })
}

/// Predict every row of `data` in order and score against its labels.
pub fn evaluate<M: TrainedModel>(model: &M, data: &FeatureSet) -> (Vec<Prediction>, BinaryMetrics) {
    let predictions = model.predict_batch(data.view());
    let metrics = BinaryMetrics::compute(&data.labels, &predictions);
    (predictions, metrics)
}
