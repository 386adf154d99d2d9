use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::split::{SplitCandidate, SplitSearch};
use super::{RegressionTree, TreeNode};

/// Shape and regularization limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_leaves: usize,
    pub min_examples_per_leaf: usize,
    /// L2 penalty on leaf outputs.
    pub l2: f64,
    pub min_sum_hessian: f64,
    /// Splits must improve the objective by more than this.
    pub min_gain: f64,
}

struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    split: Option<SplitCandidate>,
}

/// Grow one tree leaf-wise: repeatedly split the leaf with the largest gain
/// until `max_leaves` is reached or no admissible split remains.
///
/// Leaf outputs are Newton steps `-G / (H + l2)`.
pub fn grow_tree<S: SplitSearch>(
    search: &S,
    x: ArrayView2<'_, f32>,
    grad: &[f64],
    hess: &[f64],
    params: &TreeParams,
) -> RegressionTree {
    let rows: Vec<usize> = (0..x.nrows()).collect();
    let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
    let root_split = search.best_split(x, &rows, grad, hess, params);
    let mut open = vec![OpenLeaf {
        node: 0,
        rows,
        split: root_split,
    }];

    while open.len() < params.max_leaves.max(1) {
        let Some(pick) = best_open_leaf(&open, params.min_gain) else {
            break;
        };
        let leaf = open.swap_remove(pick);
        let Some(split) = leaf.split else {
            continue;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
            .rows
            .iter()
            .partition(|&&row| x[[row, split.feature]] <= split.threshold);

        let left = nodes.len();
        let right = left + 1;
        nodes.push(TreeNode::Leaf { value: 0.0 });
        nodes.push(TreeNode::Leaf { value: 0.0 });
        nodes[leaf.node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        for (node, rows) in [(left, left_rows), (right, right_rows)] {
            let split = search.best_split(x, &rows, grad, hess, params);
            open.push(OpenLeaf { node, rows, split });
        }
    }

    for leaf in &open {
        nodes[leaf.node] = TreeNode::Leaf {
            value: newton_output(&leaf.rows, grad, hess, params.l2) as f32,
        };
    }
    RegressionTree { nodes }
}

/// Index of the open leaf with the largest admissible gain. Ties keep the
/// lowest node index so growth order is deterministic.
fn best_open_leaf(open: &[OpenLeaf], min_gain: f64) -> Option<usize> {
    let mut best: Option<(usize, f64, usize)> = None;
    for (pos, leaf) in open.iter().enumerate() {
        let Some(split) = leaf.split else {
            continue;
        };
        if split.gain <= min_gain {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, gain, node)) => split.gain > gain || (split.gain == gain && leaf.node < node),
        };
        if better {
            best = Some((pos, split.gain, leaf.node));
        }
    }
    best.map(|(pos, _, _)| pos)
}

fn newton_output(rows: &[usize], grad: &[f64], hess: &[f64], l2: f64) -> f64 {
    let (g, h) = rows
        .iter()
        .fold((0.0, 0.0), |(g, h), &row| (g + grad[row], h + hess[row]));
    let denom = h + l2;
    if denom <= 0.0 { 0.0 } else { -g / denom }
}
