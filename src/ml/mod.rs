//! Binary classifiers, their shared training plumbing, and evaluation metrics.
//!
//! Every trainer implements [`classifier::Classifier`] over a normalized
//! `rows x features` matrix and produces a [`classifier::TrainedModel`] that
//! scores one row at a time.

pub mod boosting;
pub mod calibration;
pub mod classifier;
pub mod cross_validation;
pub mod fast_tree;
pub mod light_gbm;
pub mod logreg;
pub mod metrics;
pub mod tree;

pub use classifier::{Classifier, FitError, Prediction, TrainedModel};
pub use cross_validation::{
    CrossValidationError, CrossValidationResult, FoldMetrics, cross_validate, evaluate,
};
pub use fast_tree::{FastTreeModel, FastTreeOptions, FastTreeTrainer};
pub use light_gbm::{LightGbmModel, LightGbmOptions, LightGbmTrainer};
pub use logreg::{LogisticRegressionModel, LogisticRegressionOptions, LogisticRegressionTrainer};
pub use metrics::BinaryMetrics;
