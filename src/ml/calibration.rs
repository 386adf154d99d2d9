//! Platt scaling: maps raw margins to probabilities with `1 / (1 + exp(a*s + b))`.
//!
//! Fitted with Newton's method and a backtracking line search on smoothed
//! targets (Lin, Lin & Weng, 2007).

use serde::{Deserialize, Serialize};

use super::classifier::sigmoid;

const MAX_ITERATIONS: usize = 100;
const MIN_STEP: f64 = 1e-10;
const HESSIAN_RIDGE: f64 = 1e-12;
const GRADIENT_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattCalibrator {
    pub slope: f64,
    pub offset: f64,
}

impl PlattCalibrator {
    /// Identity-like calibrator equivalent to `sigmoid(score)`.
    pub fn logistic() -> Self {
        Self {
            slope: -1.0,
            offset: 0.0,
        }
    }

    pub fn probability(&self, score: f32) -> f32 {
        sigmoid(-(self.slope * score as f64 + self.offset)) as f32
    }

    /// Fit on training scores. Falls back to [`PlattCalibrator::logistic`] when a
    /// class is missing.
    pub fn fit(scores: &[f32], labels: &[bool]) -> Self {
        let n = scores.len().min(labels.len());
        let positives = labels[..n].iter().filter(|&&l| l).count() as f64;
        let negatives = n as f64 - positives;
        if positives == 0.0 || negatives == 0.0 {
            return Self::logistic();
        }
        let hi = (positives + 1.0) / (positives + 2.0);
        let lo = 1.0 / (negatives + 2.0);
        let targets: Vec<f64> = labels[..n].iter().map(|&l| if l { hi } else { lo }).collect();
        let scores: Vec<f64> = scores[..n].iter().map(|&s| s as f64).collect();

        let mut a = 0.0f64;
        let mut b = ((negatives + 1.0) / (positives + 1.0)).ln();
        let mut fval = objective(&scores, &targets, a, b);

        for _ in 0..MAX_ITERATIONS {
            let mut h11 = HESSIAN_RIDGE;
            let mut h22 = HESSIAN_RIDGE;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;
            for (&s, &t) in scores.iter().zip(&targets) {
                // p = P(positive), q = 1 - p.
                let p = sigmoid(-(s * a + b));
                let q = 1.0 - p;
                let d2 = p * q;
                h11 += s * s * d2;
                h22 += d2;
                h21 += s * d2;
                let d1 = t - p;
                g1 += s * d1;
                g2 += d1;
            }
            if g1.abs() < GRADIENT_TOLERANCE && g2.abs() < GRADIENT_TOLERANCE {
                break;
            }
            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            let mut improved = false;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(&scores, &targets, new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    improved = true;
                    break;
                }
                step /= 2.0;
            }
            if !improved {
                tracing::debug!("Platt calibration line search stalled");
                break;
            }
        }
        Self {
            slope: a,
            offset: b,
        }
    }
}

fn objective(scores: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    scores
        .iter()
        .zip(targets)
        .map(|(&s, &t)| {
            let z = s * a + b;
            if z >= 0.0 {
                t * z + (-z).exp().ln_1p()
            } else {
                (t - 1.0) * z + z.exp().ln_1p()
            }
        })
        .sum()
}
