//! Gradient boosting of regression trees on the logistic loss.
//!
//! Each round fits a tree to the per-row gradient and hessian of
//! `log(1 + exp(-y * F))` and adds its shrunken output to the running margin.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::classifier::sigmoid;
use super::tree::{RegressionTree, SplitSearch, TreeParams, grow_tree};

/// Boosting loop configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub rounds: usize,
    pub learning_rate: f64,
    /// Start from the training log-odds instead of zero.
    pub init_from_prior: bool,
    pub tree: TreeParams,
}

/// Additive tree ensemble producing a raw margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub init_score: f32,
    /// Leaf outputs already include the learning rate.
    pub trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn score(&self, features: ArrayView1<'_, f32>) -> f32 {
        self.trees
            .iter()
            .fold(self.init_score, |acc, tree| acc + tree.predict(features))
    }
}

/// Fit a boosted ensemble. Inputs must already have passed
/// [`check_training_data`](super::classifier::check_training_data).
pub fn boost<S: SplitSearch>(
    search: &S,
    x: ArrayView2<'_, f32>,
    labels: &[bool],
    params: &BoostingParams,
) -> TreeEnsemble {
    let n = labels.len();
    let init_score = if params.init_from_prior {
        prior_log_odds(labels)
    } else {
        0.0
    };
    let mut margin = vec![init_score; n];
    let mut grad = vec![0.0f64; n];
    let mut hess = vec![0.0f64; n];
    let mut trees = Vec::with_capacity(params.rounds);

    for round in 0..params.rounds {
        for i in 0..n {
            let p = sigmoid(margin[i]);
            let y = if labels[i] { 1.0 } else { 0.0 };
            grad[i] = p - y;
            hess[i] = p * (1.0 - p);
        }
        let mut tree = grow_tree(search, x, &grad, &hess, &params.tree);
        tree.scale(params.learning_rate as f32);
        for (i, row) in x.outer_iter().enumerate() {
            margin[i] += tree.predict(row) as f64;
        }
        tracing::debug!("Boosting round {round}: {} leaves", tree.leaf_count());
        trees.push(tree);
    }

    TreeEnsemble {
        init_score: init_score as f32,
        trees,
    }
}

fn prior_log_odds(labels: &[bool]) -> f64 {
    let positives = labels.iter().filter(|&&l| l).count() as f64;
    let p = (positives / labels.len().max(1) as f64).clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}
