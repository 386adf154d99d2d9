//! Experiment configuration loaded from TOML.
//!
//! Every section and key is optional. Missing values fall back to the
//! defaults below, and command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogSettings;
use crate::ml::{FastTreeOptions, LightGbmOptions, LogisticRegressionOptions};

/// Errors that may occur while loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV input. Relative paths resolve against the config file's directory.
    pub path: Option<PathBuf>,
    pub test_fraction: f64,
    pub seed: u64,
    pub folds: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            test_fraction: 0.2,
            seed: 0,
            folds: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub clamp_out_of_range: bool,
}

/// A hand-entered student to score after training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleInput {
    pub study_hours: f32,
    pub attendance: f32,
}

fn default_samples() -> Vec<SampleInput> {
    vec![
        SampleInput {
            study_hours: 6.5,
            attendance: 90.0,
        },
        SampleInput {
            study_hours: 2.5,
            attendance: 55.0,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    pub features: FeaturesConfig,
    pub fast_tree: FastTreeOptions,
    pub logistic_regression: LogisticRegressionOptions,
    pub light_gbm: LightGbmOptions,
    pub samples: Vec<SampleInput>,
    pub logging: LogSettings,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            features: FeaturesConfig::default(),
            fast_tree: FastTreeOptions::default(),
            logistic_regression: LogisticRegressionOptions::default(),
            light_gbm: LightGbmOptions::default(),
            samples: default_samples(),
            logging: LogSettings::default(),
        }
    }
}

impl ExperimentConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ExperimentConfig =
            toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
                path: path.to_path_buf(),
                source,
            })?;
        if let (Some(data_path), Some(dir)) = (config.data.path.as_ref(), path.parent()) {
            if data_path.is_relative() {
                config.data.path = Some(dir.join(data_path));
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fraction = self.data.test_fraction;
        if !(fraction.is_finite() && fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "data.test_fraction must be in (0, 1), got {fraction}"
            )));
        }
        if self.data.folds < 2 {
            return Err(ConfigError::Invalid(format!(
                "data.folds must be >= 2, got {}",
                self.data.folds
            )));
        }
        self.fast_tree.validate().map_err(ConfigError::Invalid)?;
        self.logistic_regression
            .validate()
            .map_err(ConfigError::Invalid)?;
        self.light_gbm.validate().map_err(ConfigError::Invalid)?;
        if self.logging.max_files == 0 {
            return Err(ConfigError::Invalid(
                "logging.max_files must be > 0".to_string(),
            ));
        }
        if let Some(idx) = self
            .samples
            .iter()
            .position(|s| !(s.study_hours.is_finite() && s.attendance.is_finite()))
        {
            return Err(ConfigError::Invalid(format!(
                "samples[{idx}] must have finite values"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("experiment.toml");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
[data]
path = "data/students.csv"
test_fraction = 0.25
seed = 7
folds = 4

[features]
clamp_out_of_range = true

[fast_tree]
number_of_leaves = 6
number_of_trees = 10
minimum_example_count_per_leaf = 3
learning_rate = 0.1

[logistic_regression]
l2 = 0.5
tolerance = 1e-6
max_iterations = 50
history_size = 10

[light_gbm]
number_of_leaves = 16
number_of_iterations = 20
minimum_example_count_per_leaf = 2
learning_rate = 0.05
max_bins = 63
l2 = 1.0

[[samples]]
study_hours = 1.0
attendance = 10.0

[logging]
level = "debug"
file = false
max_files = 3
"#,
        );
        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(
            config.data.path,
            Some(dir.path().join("data/students.csv"))
        );
        assert_eq!(config.data.test_fraction, 0.25);
        assert_eq!(config.data.seed, 7);
        assert_eq!(config.data.folds, 4);
        assert!(config.features.clamp_out_of_range);
        assert_eq!(config.fast_tree.number_of_trees, 10);
        assert_eq!(config.logistic_regression.history_size, 10);
        assert_eq!(config.light_gbm.max_bins, 63);
        assert_eq!(config.light_gbm.min_sum_hessian, 1e-3);
        assert_eq!(
            config.samples,
            vec![SampleInput {
                study_hours: 1.0,
                attendance: 10.0
            }]
        );
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.file);
        assert_eq!(config.logging.max_files, 3);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "[data]\nseed = 3\n");
        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.data.seed, 3);
        assert_eq!(config.data.folds, 5);
        assert_eq!(config.data.path, None);
        assert_eq!(config.fast_tree, FastTreeOptions::default());
        assert_eq!(config.samples, default_samples());
        assert_eq!(config.logging, LogSettings::default());
    }

    #[test]
    fn absolute_data_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("elsewhere.csv");
        let path = write(
            dir.path(),
            &format!("[data]\npath = {:?}\n", csv.to_string_lossy()),
        );
        let config = ExperimentConfig::load(&path).unwrap();
        assert_eq!(config.data.path, Some(csv));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "[data]\ntest_fraction = 1.5\n");
        assert!(matches!(
            ExperimentConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
        let path = write(dir.path(), "[light_gbm]\nmax_bins = 1\n");
        assert!(matches!(
            ExperimentConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn reports_parse_and_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "[data\nseed = 1");
        assert!(matches!(
            ExperimentConfig::load(&path),
            Err(ConfigError::ParseToml { .. })
        ));
        assert!(matches!(
            ExperimentConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
