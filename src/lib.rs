//! Student exam-pass experiment: three binary classifiers, cross-validated and
//! combined by majority vote.

/// Application directory resolution.
pub mod app_dirs;
/// Experiment configuration.
pub mod config;
/// CSV loading and row partitioning.
pub mod dataset;
/// Majority-vote ensemble.
pub mod ensemble;
/// The end-to-end experiment pipeline.
pub mod experiment;
/// Min-max feature normalization.
pub mod features;
/// Logging setup.
pub mod logging;
/// Classifiers and metrics.
pub mod ml;
/// Text report output.
pub mod report;
