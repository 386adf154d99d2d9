//! Plain-text experiment report.

use std::io::{self, Write};

use crate::experiment::ExperimentOutcome;
use crate::ml::{CrossValidationResult, FoldMetrics};

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn optional_percent(value: Option<f64>) -> String {
    value.map(percent).unwrap_or_else(|| "n/a".to_string())
}

/// Write the full report for `outcome` to `out`.
pub fn write_report<W: Write>(out: &mut W, outcome: &ExperimentOutcome) -> io::Result<()> {
    let cv = &outcome.cross_validation;
    writeln!(
        out,
        "--- FastTree evaluation with {}-fold cross-validation ---",
        outcome.folds
    )?;
    write_means(out, &cv.fast_tree)?;

    writeln!(out)?;
    writeln!(out, "--- Cross-validation of the remaining ensemble members ---")?;
    write_means(out, &cv.logistic_regression)?;
    write_means(out, &cv.light_gbm)?;

    writeln!(out)?;
    writeln!(
        out,
        "--- Majority vote on the held-out set ({} of {} rows) ---",
        outcome.test_rows, outcome.total_rows
    )?;
    let holdout = &outcome.holdout;
    for (i, truth) in holdout.truth.iter().enumerate() {
        writeln!(
            out,
            "Sample {}: FastTree: {}, LogisticReg: {}, LightGBM: {}, Ensemble: {}, Truth: {}",
            i + 1,
            holdout.fast_tree.predictions[i].predicted_label,
            holdout.logistic_regression.predictions[i].predicted_label,
            holdout.light_gbm.predictions[i].predicted_label,
            outcome.ensemble.votes[i],
            truth
        )?;
    }
    writeln!(out)?;
    writeln!(out, "Ensemble accuracy: {}", percent(outcome.ensemble.accuracy))?;
    for (name, metrics) in [
        ("FastTree", &holdout.fast_tree.metrics),
        ("LogisticReg", &holdout.logistic_regression.metrics),
        ("LightGBM", &holdout.light_gbm.metrics),
    ] {
        writeln!(
            out,
            "{name} held-out accuracy: {}, F1: {}, AUC: {}",
            percent(metrics.accuracy),
            percent(metrics.f1),
            optional_percent(metrics.auc)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "--- Predictions for new students ---")?;
    for (i, sample) in outcome.samples.iter().enumerate() {
        writeln!(
            out,
            "Student {} (study hours: {}, attendance: {}) => passed: {} (probability: {})",
            i + 1,
            sample.input.study_hours,
            sample.input.attendance,
            sample.prediction.predicted_label,
            percent(f64::from(sample.prediction.probability))
        )?;
    }

    writeln!(out)?;
    writeln!(out, "--- Chart data ---")?;
    writeln!(
        out,
        "FastTree mean cross-validation accuracy: {}",
        cv.fast_tree.mean.accuracy
    )?;
    writeln!(
        out,
        "Ensemble accuracy (held-out set): {}",
        outcome.ensemble.accuracy
    )?;

    writeln!(out)?;
    writeln!(out, "FastTree cross-validation per fold:")?;
    for (i, fold) in cv.fast_tree.folds.iter().enumerate() {
        write_fold(out, i + 1, fold)?;
    }
    Ok(())
}

fn write_means<W: Write>(out: &mut W, result: &CrossValidationResult) -> io::Result<()> {
    let name = &result.trainer;
    writeln!(out, "{name} mean accuracy: {}", percent(result.mean.accuracy))?;
    writeln!(out, "{name} mean F1-score: {}", percent(result.mean.f1))?;
    writeln!(out, "{name} mean AUC: {}", optional_percent(result.mean.auc))
}

fn write_fold<W: Write>(out: &mut W, index: usize, fold: &FoldMetrics) -> io::Result<()> {
    writeln!(
        out,
        "  Fold {index}: Accuracy = {}, F1-Score = {}, AUC = {}",
        percent(fold.accuracy),
        percent(fold.f1),
        optional_percent(fold.auc)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::dataset::Record;
    use crate::experiment::run_on_records;

    fn outcome() -> ExperimentOutcome {
        let records: Vec<Record> = (0..50)
            .map(|i| {
                let study_hours = (i % 9) as f32;
                let attendance = 50.0 + ((i * 11) % 50) as f32;
                Record {
                    study_hours,
                    attendance,
                    passed: study_hours > 4.0 || attendance > 90.0,
                }
            })
            .collect();
        run_on_records(&records, &ExperimentConfig::default()).unwrap()
    }

    fn render(outcome: &ExperimentOutcome) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, outcome).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn sections_appear_in_order() {
        let text = render(&outcome());
        let headings = [
            "--- FastTree evaluation with 5-fold cross-validation ---",
            "--- Cross-validation of the remaining ensemble members ---",
            "--- Majority vote on the held-out set (10 of 50 rows) ---",
            "Ensemble accuracy:",
            "--- Predictions for new students ---",
            "--- Chart data ---",
            "FastTree cross-validation per fold:",
        ];
        let mut last = 0;
        for heading in headings {
            let pos = text[last..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing or out of order: {heading}"));
            last += pos + heading.len();
        }
    }

    #[test]
    fn one_line_per_held_out_row_and_fold() {
        let outcome = outcome();
        let text = render(&outcome);
        assert_eq!(text.matches("\nSample ").count(), outcome.test_rows);
        assert_eq!(text.matches("  Fold ").count(), 5);
        assert!(text.contains("LogisticReg mean accuracy:"));
        assert!(text.contains("LightGBM mean AUC:"));
        assert!(text.contains("Student 1 (study hours: 6.5, attendance: 90)"));
        assert!(text.contains("Student 2 (study hours: 2.5, attendance: 55)"));
    }

    #[test]
    fn percentages_use_two_decimals() {
        assert_eq!(percent(0.5), "50.00%");
        assert_eq!(percent(2.0 / 3.0), "66.67%");
        assert_eq!(optional_percent(None), "n/a");
    }
}
