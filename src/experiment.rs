//! End-to-end experiment: load, normalize, split, cross-validate, fit, vote.
//!
//! Each stage takes the previous stage's output by reference and returns a new
//! value, so the whole run is a straight line of pure steps apart from the
//! initial file read.

use std::path::{Path, PathBuf};

use ndarray::aview1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ExperimentConfig, SampleInput};
use crate::dataset::{
    LoadError, Record, SplitError, TrainTestSplit, load_records, train_test_split,
};
use crate::ensemble::{AlignmentError, EnsembleOutcome, majority_vote};
use crate::features::{FEATURE_LEN, FeaturePipeline, FeatureSet};
use crate::ml::{
    BinaryMetrics, Classifier, CrossValidationError, CrossValidationResult, FastTreeModel,
    FastTreeTrainer, FitError, LightGbmModel, LightGbmTrainer, LogisticRegressionModel,
    LogisticRegressionTrainer, Prediction, TrainedModel, cross_validate, evaluate,
};

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("no data file given; pass --data or set data.path in the config")]
    MissingDataPath,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("cannot fit normalizers on an empty dataset")]
    EmptyDataset,
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    CrossValidation(#[from] CrossValidationError),
    #[error("{trainer} failed to train: {source}")]
    Fit {
        trainer: &'static str,
        source: FitError,
    },
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize models: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Cross-validation results for every trainer, in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub fast_tree: CrossValidationResult,
    pub logistic_regression: CrossValidationResult,
    pub light_gbm: CrossValidationResult,
}

/// One trainer's predictions over the held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutPredictions {
    pub predictions: Vec<Prediction>,
    pub metrics: BinaryMetrics,
}

/// Held-out predictions, index-aligned with `truth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutSummary {
    pub truth: Vec<bool>,
    pub fast_tree: HoldoutPredictions,
    pub logistic_regression: HoldoutPredictions,
    pub light_gbm: HoldoutPredictions,
}

/// FastTree verdict for a hand-entered sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePrediction {
    pub input: SampleInput,
    pub features: [f32; FEATURE_LEN],
    pub prediction: Prediction,
}

/// Everything fitted on the training split, exportable as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModels {
    pub pipeline: FeaturePipeline,
    pub fast_tree: FastTreeModel,
    pub logistic_regression: LogisticRegressionModel,
    pub light_gbm: LightGbmModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub folds: usize,
    pub cross_validation: CrossValidationSummary,
    pub holdout: HoldoutSummary,
    pub ensemble: EnsembleOutcome,
    pub samples: Vec<SamplePrediction>,
    pub models: TrainedModels,
}

/// Run the experiment on the CSV named by `config.data.path`.
pub fn run(config: &ExperimentConfig) -> Result<ExperimentOutcome, ExperimentError> {
    let path = config
        .data
        .path
        .as_deref()
        .ok_or(ExperimentError::MissingDataPath)?;
    let records = load_records(path)?;
    run_on_records(&records, config)
}

/// Run the experiment on records already in memory.
pub fn run_on_records(
    records: &[Record],
    config: &ExperimentConfig,
) -> Result<ExperimentOutcome, ExperimentError> {
    let pipeline = FeaturePipeline::fit(records, config.features.clamp_out_of_range)
        .ok_or(ExperimentError::EmptyDataset)?;
    let data = pipeline.transform(records);

    let split = split_for(records, config)?;
    tracing::info!(
        "Split {} rows into {} train / {} test (seed {})",
        data.len(),
        split.train.len(),
        split.test.len(),
        config.data.seed
    );
    let train = data.select(&split.train);
    let test = data.select(&split.test);

    let fast_tree = FastTreeTrainer::new(config.fast_tree.clone());
    let logistic_regression = LogisticRegressionTrainer::new(config.logistic_regression.clone());
    let light_gbm = LightGbmTrainer::new(config.light_gbm.clone());

    let cross_validation = CrossValidationSummary {
        fast_tree: cross_validate(&fast_tree, &train, config.data.folds, config.data.seed)?,
        logistic_regression: cross_validate(
            &logistic_regression,
            &train,
            config.data.folds,
            config.data.seed,
        )?,
        light_gbm: cross_validate(&light_gbm, &train, config.data.folds, config.data.seed)?,
    };

    let fast_tree_model = fit_on(&fast_tree, &train)?;
    let logistic_regression_model = fit_on(&logistic_regression, &train)?;
    let light_gbm_model = fit_on(&light_gbm, &train)?;

    let holdout = HoldoutSummary {
        truth: test.labels.clone(),
        fast_tree: holdout_predictions(&fast_tree, &fast_tree_model, &test),
        logistic_regression: holdout_predictions(
            &logistic_regression,
            &logistic_regression_model,
            &test,
        ),
        light_gbm: holdout_predictions(&light_gbm, &light_gbm_model, &test),
    };
    let ensemble = majority_vote(
        &holdout.fast_tree.predictions,
        &holdout.logistic_regression.predictions,
        &holdout.light_gbm.predictions,
        &holdout.truth,
    )?;
    tracing::info!("Ensemble accuracy {:.4}", ensemble.accuracy);

    let samples = predict_samples(&pipeline, &fast_tree_model, &config.samples);

    Ok(ExperimentOutcome {
        total_rows: data.len(),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        folds: config.data.folds,
        cross_validation,
        holdout,
        ensemble,
        samples,
        models: TrainedModels {
            pipeline,
            fast_tree: fast_tree_model,
            logistic_regression: logistic_regression_model,
            light_gbm: light_gbm_model,
        },
    })
}

fn fit_on<C: Classifier>(classifier: &C, train: &FeatureSet) -> Result<C::Model, ExperimentError> {
    let model = classifier
        .fit(train.view(), &train.labels)
        .map_err(|source| ExperimentError::Fit {
            trainer: classifier.name(),
            source,
        })?;
    tracing::info!("{} trained on {} rows", classifier.name(), train.len());
    Ok(model)
}

fn holdout_predictions<C: Classifier>(
    classifier: &C,
    model: &C::Model,
    test: &FeatureSet,
) -> HoldoutPredictions {
    let (predictions, metrics) = evaluate(model, test);
    tracing::info!(
        "{} held-out accuracy {:.4}",
        classifier.name(),
        metrics.accuracy
    );
    HoldoutPredictions {
        predictions,
        metrics,
    }
}

/// Score hand-entered samples with the fitted normalizers and FastTree model.
pub fn predict_samples<M: TrainedModel>(
    pipeline: &FeaturePipeline,
    model: &M,
    samples: &[SampleInput],
) -> Vec<SamplePrediction> {
    samples
        .iter()
        .map(|&input| {
            let features = pipeline.transform_one(input.study_hours, input.attendance);
            SamplePrediction {
                input,
                features,
                prediction: model.predict(aview1(&features)),
            }
        })
        .collect()
}

/// Write the fitted normalizers and models as pretty-printed JSON.
pub fn save_models(path: &Path, models: &TrainedModels) -> Result<(), ExperimentError> {
    let bytes = serde_json::to_vec_pretty(models)?;
    std::fs::write(path, bytes).map_err(|source| ExperimentError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved models to {}", path.display());
    Ok(())
}

/// Held-out split of `records` for this config's fraction and seed.
pub fn split_for(
    records: &[Record],
    config: &ExperimentConfig,
) -> Result<TrainTestSplit, SplitError> {
    train_test_split(records.len(), config.data.test_fraction, config.data.seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let study_hours = (i % 10) as f32 + 0.5 * (i % 3) as f32;
                let attendance = 40.0 + ((i * 7) % 60) as f32;
                Record {
                    study_hours,
                    attendance,
                    passed: study_hours * 10.0 + attendance > 100.0,
                }
            })
            .collect()
    }

    #[test]
    fn predictions_align_with_held_out_truth() {
        let data = records(60);
        let config = ExperimentConfig::default();
        let outcome = run_on_records(&data, &config).unwrap();
        assert_eq!(outcome.total_rows, 60);
        assert_eq!(outcome.test_rows, 12);
        assert_eq!(outcome.train_rows, 48);
        assert_eq!(outcome.holdout.truth.len(), 12);
        assert_eq!(outcome.holdout.fast_tree.predictions.len(), 12);
        assert_eq!(outcome.holdout.logistic_regression.predictions.len(), 12);
        assert_eq!(outcome.holdout.light_gbm.predictions.len(), 12);
        assert_eq!(outcome.ensemble.votes.len(), 12);

        let split = split_for(&data, &config).unwrap();
        let expected: Vec<bool> = split.test.iter().map(|&i| data[i].passed).collect();
        assert_eq!(outcome.holdout.truth, expected);
    }

    #[test]
    fn every_trainer_is_cross_validated() {
        let outcome = run_on_records(&records(60), &ExperimentConfig::default()).unwrap();
        let cv = &outcome.cross_validation;
        assert_eq!(cv.fast_tree.trainer, "FastTree");
        assert_eq!(cv.logistic_regression.trainer, "LogisticReg");
        assert_eq!(cv.light_gbm.trainer, "LightGBM");
        assert!(cv.fast_tree.folds.len() == 5 && cv.light_gbm.folds.len() == 5);
    }

    #[test]
    fn default_samples_are_scored_with_fitted_pipeline() {
        let outcome = run_on_records(&records(60), &ExperimentConfig::default()).unwrap();
        assert_eq!(outcome.samples.len(), 2);
        let first = outcome.samples[0];
        assert_eq!(first.input.study_hours, 6.5);
        assert_eq!(
            first.features,
            outcome.models.pipeline.transform_one(6.5, 90.0)
        );
        assert_eq!(
            first.prediction,
            outcome.models.fast_tree.predict(aview1(&first.features))
        );
    }

    #[test]
    fn missing_data_path_is_an_error() {
        let err = run(&ExperimentConfig::default()).unwrap_err();
        assert!(matches!(err, ExperimentError::MissingDataPath));
    }

    #[test]
    fn single_class_training_fails_with_trainer_name() {
        let data: Vec<Record> = (0..20)
            .map(|i| Record {
                study_hours: i as f32,
                attendance: 50.0,
                passed: true,
            })
            .collect();
        let err = run_on_records(&data, &ExperimentConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ExperimentError::CrossValidation(CrossValidationError::Fit {
                trainer: "FastTree",
                source: FitError::SingleClass { label: true },
                ..
            })
        ));
    }

    #[test]
    fn saved_models_round_trip_through_json() {
        let outcome = run_on_records(&records(40), &ExperimentConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.json");
        save_models(&path, &outcome.models).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let restored: TrainedModels = serde_json::from_str(&text).unwrap();
        assert_eq!(restored.pipeline, outcome.models.pipeline);
        assert_eq!(
            restored.logistic_regression,
            outcome.models.logistic_regression
        );
    }
}
