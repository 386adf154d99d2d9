//! Limited-memory BFGS minimizer for smooth unconstrained objectives.

use std::collections::VecDeque;

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

const ARMIJO_C1: f64 = 1e-4;
const MAX_LINE_SEARCH_STEPS: usize = 40;
const CURVATURE_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsOptions {
    /// Number of correction pairs kept.
    pub history_size: usize,
    /// Stop when the relative objective decrease or the gradient norm falls below this.
    pub tolerance: f64,
    pub max_iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LbfgsOutcome {
    pub params: Array1<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LbfgsError {
    #[error("objective is not finite at the starting point")]
    NonFiniteStart,
}

struct Correction {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64,
}

/// Minimize `objective`, which returns the value and gradient at a point.
///
/// A stalled line search ends the run early with `converged = false` and the
/// best point found so far.
pub fn minimize<F>(
    mut objective: F,
    initial: Array1<f64>,
    options: &LbfgsOptions,
) -> Result<LbfgsOutcome, LbfgsError>
where
    F: FnMut(ArrayView1<'_, f64>) -> (f64, Array1<f64>),
{
    let mut x = initial;
    let (mut value, mut grad) = objective(x.view());
    if !value.is_finite() || grad.iter().any(|g| !g.is_finite()) {
        return Err(LbfgsError::NonFiniteStart);
    }
    let history_size = options.history_size.max(1);
    let mut history: VecDeque<Correction> = VecDeque::with_capacity(history_size);

    for iteration in 1..=options.max_iterations {
        if norm(&grad) <= options.tolerance {
            return Ok(LbfgsOutcome {
                params: x,
                value,
                iterations: iteration - 1,
                converged: true,
            });
        }

        let mut direction = two_loop(&grad, &history).mapv_into(|v| -v);
        let mut slope = grad.dot(&direction);
        if slope >= 0.0 {
            // Not a descent direction; restart from steepest descent.
            history.clear();
            direction = grad.mapv(|g| -g);
            slope = grad.dot(&direction);
        }

        let mut step = if history.is_empty() {
            (1.0 / norm(&grad)).min(1.0)
        } else {
            1.0
        };
        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH_STEPS {
            let candidate = &x + &(&direction * step);
            let (candidate_value, candidate_grad) = objective(candidate.view());
            if candidate_value.is_finite()
                && candidate_value <= value + ARMIJO_C1 * step * slope
            {
                accepted = Some((candidate, candidate_value, candidate_grad));
                break;
            }
            step *= 0.5;
        }
        let Some((next_x, next_value, next_grad)) = accepted else {
            tracing::debug!("L-BFGS line search stalled at iteration {iteration}");
            return Ok(LbfgsOutcome {
                params: x,
                value,
                iterations: iteration,
                converged: false,
            });
        };

        let s = &next_x - &x;
        let y = &next_grad - &grad;
        let sy = s.dot(&y);
        if sy > CURVATURE_EPS {
            if history.len() == history_size {
                history.pop_front();
            }
            history.push_back(Correction { s, y, rho: 1.0 / sy });
        }

        let relative_decrease = (value - next_value) / value.abs().max(next_value.abs()).max(1.0);
        x = next_x;
        value = next_value;
        grad = next_grad;
        if relative_decrease < options.tolerance {
            return Ok(LbfgsOutcome {
                params: x,
                value,
                iterations: iteration,
                converged: true,
            });
        }
    }

    Ok(LbfgsOutcome {
        params: x,
        value,
        iterations: options.max_iterations,
        converged: false,
    })
}

/// Two-loop recursion: approximate inverse Hessian times `grad`.
fn two_loop(grad: &Array1<f64>, history: &VecDeque<Correction>) -> Array1<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());
    for c in history.iter().rev() {
        let alpha = c.rho * c.s.dot(&q);
        q.scaled_add(-alpha, &c.y);
        alphas.push(alpha);
    }
    if let Some(last) = history.back() {
        let gamma = last.s.dot(&last.y) / last.y.dot(&last.y);
        q *= gamma;
    }
    for (c, alpha) in history.iter().zip(alphas.into_iter().rev()) {
        let beta = c.rho * c.y.dot(&q);
        q.scaled_add(alpha - beta, &c.s);
    }
    q
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}
