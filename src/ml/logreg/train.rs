use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use serde::{Deserialize, Serialize};

use super::LogisticRegressionModel;
use super::lbfgs::{LbfgsOptions, minimize};
use crate::ml::classifier::{Classifier, FitError, check_training_data, sigmoid, softplus};

/// Training options for the logistic regression trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticRegressionOptions {
    /// Weight of `0.5 * ||w||^2` added to the summed log-loss. The bias is not penalized.
    pub l2: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub history_size: usize,
}

impl Default for LogisticRegressionOptions {
    fn default() -> Self {
        Self {
            l2: 1.0,
            tolerance: 1e-7,
            max_iterations: 100,
            history_size: 20,
        }
    }
}

impl LogisticRegressionOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.l2.is_finite() && self.l2 >= 0.0) {
            return Err("logistic_regression.l2 must be >= 0".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err("logistic_regression.tolerance must be > 0".to_string());
        }
        if self.max_iterations == 0 {
            return Err("logistic_regression.max_iterations must be > 0".to_string());
        }
        if self.history_size == 0 {
            return Err("logistic_regression.history_size must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogisticRegressionTrainer {
    pub options: LogisticRegressionOptions,
}

impl LogisticRegressionTrainer {
    pub fn new(options: LogisticRegressionOptions) -> Self {
        Self { options }
    }
}

impl Classifier for LogisticRegressionTrainer {
    type Model = LogisticRegressionModel;

    fn name(&self) -> &'static str {
        "LogisticReg"
    }

    fn fit(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[bool],
    ) -> Result<LogisticRegressionModel, FitError> {
        self.options.validate().map_err(FitError::InvalidOption)?;
        check_training_data(features, labels)?;

        let design = with_bias_column(features);
        let targets: Array1<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let l2 = self.options.l2;
        let initial = Array1::<f64>::zeros(design.ncols());
        let outcome = minimize(
            |params| penalized_loss(&design, &targets, params, l2),
            initial,
            &LbfgsOptions {
                history_size: self.options.history_size,
                tolerance: self.options.tolerance,
                max_iterations: self.options.max_iterations,
            },
        )
        .map_err(|err| FitError::NoConvergence(err.to_string()))?;
        if !outcome.converged {
            tracing::warn!(
                "Logistic regression stopped after {} iterations without converging (loss {:.6})",
                outcome.iterations,
                outcome.value
            );
        } else {
            tracing::debug!(
                "Logistic regression converged in {} iterations (loss {:.6})",
                outcome.iterations,
                outcome.value
            );
        }

        let n_features = features.ncols();
        let model = LogisticRegressionModel {
            weights: outcome
                .params
                .slice(s![..n_features])
                .iter()
                .map(|&w| w as f32)
                .collect(),
            bias: outcome.params[n_features] as f32,
        };
        model.validate().map_err(FitError::NoConvergence)?;
        Ok(model)
    }
}

/// Append a constant `1.0` column so the last parameter acts as the bias.
fn with_bias_column(features: ArrayView2<'_, f32>) -> Array2<f64> {
    let (rows, cols) = features.dim();
    let mut design = Array2::<f64>::ones((rows, cols + 1));
    design
        .slice_mut(s![.., ..cols])
        .assign(&features.mapv(f64::from));
    design
}

/// Summed log-loss plus `0.5 * l2 * ||w||^2`, with its gradient.
fn penalized_loss(
    design: &Array2<f64>,
    targets: &Array1<f64>,
    params: ArrayView1<'_, f64>,
    l2: f64,
) -> (f64, Array1<f64>) {
    let logits = design.dot(&params);
    let mut loss = 0.0;
    let mut residuals = Array1::<f64>::zeros(logits.len());
    for (i, (&z, &y)) in logits.iter().zip(targets.iter()).enumerate() {
        loss += softplus(z) - y * z;
        residuals[i] = sigmoid(z) - y;
    }
    let mut grad = design.t().dot(&residuals);
    let bias_idx = params.len() - 1;
    let weights = params.slice(s![..bias_idx]);
    loss += 0.5 * l2 * weights.dot(&weights);
    grad.slice_mut(s![..bias_idx]).scaled_add(l2, &weights);
    (loss, grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classifier::TrainedModel;
    use ndarray::{array, aview1};

    fn dataset() -> (Array2<f32>, Vec<bool>) {
        let x = array![
            [0.0f32, 0.1],
            [0.1, 0.3],
            [0.2, 0.0],
            [0.3, 0.2],
            [0.7, 0.9],
            [0.8, 0.6],
            [0.9, 1.0],
            [1.0, 0.8]
        ];
        let y = vec![false, false, false, false, true, true, true, true];
        (x, y)
    }

    #[test]
    fn learns_positive_weights_for_separable_data() {
        let (x, y) = dataset();
        let trainer = LogisticRegressionTrainer::new(LogisticRegressionOptions {
            l2: 0.1,
            ..LogisticRegressionOptions::default()
        });
        let model = trainer.fit(x.view(), &y).unwrap();
        assert!(model.weights.iter().all(|&w| w > 0.0));
        for (row, &label) in x.outer_iter().zip(&y) {
            assert_eq!(model.predict(row).predicted_label, label);
        }
    }

    #[test]
    fn stronger_l2_shrinks_weights() {
        let (x, y) = dataset();
        let loose = LogisticRegressionTrainer::new(LogisticRegressionOptions {
            l2: 0.01,
            ..LogisticRegressionOptions::default()
        })
        .fit(x.view(), &y)
        .unwrap();
        let tight = LogisticRegressionTrainer::new(LogisticRegressionOptions {
            l2: 10.0,
            ..LogisticRegressionOptions::default()
        })
        .fit(x.view(), &y)
        .unwrap();
        let norm = |m: &LogisticRegressionModel| m.weights.iter().map(|w| w * w).sum::<f32>();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let (x, y) = dataset();
        let design = with_bias_column(x.view());
        let targets: Array1<f64> = y.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let params = array![0.3, -0.2, 0.1];
        let (_, grad) = penalized_loss(&design, &targets, params.view(), 0.5);
        let eps = 1e-6;
        for j in 0..params.len() {
            let mut up = params.clone();
            let mut down = params.clone();
            up[j] += eps;
            down[j] -= eps;
            let numeric = (penalized_loss(&design, &targets, up.view(), 0.5).0
                - penalized_loss(&design, &targets, down.view(), 0.5).0)
                / (2.0 * eps);
            assert!((numeric - grad[j]).abs() < 1e-5, "param {j}");
        }
    }

    #[test]
    fn rejects_single_class() {
        let (x, _) = dataset();
        let err = LogisticRegressionTrainer::default()
            .fit(x.view(), &[true; 8])
            .unwrap_err();
        assert_eq!(err, FitError::SingleClass { label: true });
    }

    #[test]
    fn middle_point_is_uncertain() {
        let (x, y) = dataset();
        let model = LogisticRegressionTrainer::default().fit(x.view(), &y).unwrap();
        let p = model.predict(aview1(&[0.5, 0.5]));
        assert!((p.probability - 0.5).abs() < 0.15);
    }
}
