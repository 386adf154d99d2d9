//! Min-max feature pipeline.
//!
//! Study hours and attendance are rescaled to `[0, 1]` from their observed
//! range and concatenated into a two-value feature vector. The fitted pipeline
//! is kept so ad-hoc samples are scaled exactly like the training rows.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::dataset::Record;

/// Number of values in each feature vector.
pub const FEATURE_LEN: usize = 2;

/// Observed range of a single numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    pub min: f32,
    pub max: f32,
}

impl MinMaxNormalizer {
    /// Fit on column values. Returns `None` when there are no values.
    pub fn fit(values: impl IntoIterator<Item = f32>) -> Option<Self> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// Rescale `value` into the fitted range. Constant columns map to `0.0`.
    pub fn transform(&self, value: f32, clamp: bool) -> f32 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        let scaled = (value - self.min) / span;
        if clamp { scaled.clamp(0.0, 1.0) } else { scaled }
    }
}

/// Fitted normalizers for both numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    pub study_hours: MinMaxNormalizer,
    pub attendance: MinMaxNormalizer,
    /// Clamp values outside the fitted range at transform time.
    #[serde(default)]
    pub clamp_out_of_range: bool,
}

impl FeaturePipeline {
    /// Fit one normalizer per numeric column. Returns `None` for no records.
    pub fn fit(records: &[Record], clamp_out_of_range: bool) -> Option<Self> {
        let pipeline = Self {
            study_hours: MinMaxNormalizer::fit(records.iter().map(|r| r.study_hours))?,
            attendance: MinMaxNormalizer::fit(records.iter().map(|r| r.attendance))?,
            clamp_out_of_range,
        };
        tracing::debug!(
            "Fitted normalizers: hours [{}, {}], attendance [{}, {}]",
            pipeline.study_hours.min,
            pipeline.study_hours.max,
            pipeline.attendance.min,
            pipeline.attendance.max
        );
        Some(pipeline)
    }

    /// Feature vector for a single sample.
    pub fn transform_one(&self, study_hours: f32, attendance: f32) -> [f32; FEATURE_LEN] {
        [
            self.study_hours.transform(study_hours, self.clamp_out_of_range),
            self.attendance.transform(attendance, self.clamp_out_of_range),
        ]
    }

    /// Materialize the feature matrix and labels for `records`, preserving order.
    pub fn transform(&self, records: &[Record]) -> FeatureSet {
        let mut features = Array2::<f32>::zeros((records.len(), FEATURE_LEN));
        for (mut row, record) in features.outer_iter_mut().zip(records) {
            let values = self.transform_one(record.study_hours, record.attendance);
            row[0] = values[0];
            row[1] = values[1];
        }
        FeatureSet {
            features,
            labels: records.iter().map(|r| r.passed).collect(),
        }
    }
}

/// Normalized feature matrix (`rows x FEATURE_LEN`) with aligned labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub features: Array2<f32>,
    pub labels: Vec<bool>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f32> {
        self.features.row(idx)
    }

    /// Copy the given rows, in the given order, into a new set.
    pub fn select(&self, indices: &[usize]) -> FeatureSet {
        FeatureSet {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&idx| self.labels[idx]).collect(),
        }
    }
}
