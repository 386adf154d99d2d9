//! Tabular student records and the train/test/fold partitioning applied to them.

pub mod loader;
pub mod split;

pub use loader::{LoadError, Record, load_records, read_records};
pub use split::{SplitError, TrainTestSplit, cross_validation_folds, train_test_split};
