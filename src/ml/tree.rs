//! Regression trees grown leaf-wise on gradient statistics.
//!
//! Shared by the boosted trainers. The split search strategy is pluggable:
//! exact scanning over sorted values or a pre-binned histogram.

mod grow;
mod split;

pub use grow::{TreeParams, grow_tree};
pub use split::{BinMapper, ExactSplitSearch, HistogramSplitSearch, SplitCandidate, SplitSearch};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One node of a [`RegressionTree`]. Children are indices into the node vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        /// Rows with `feature <= threshold` go left.
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f32,
    },
}

/// Binary regression tree stored as a flat node vector with the root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Single-leaf tree.
    pub fn constant(value: f32) -> Self {
        Self {
            nodes: vec![TreeNode::Leaf { value }],
        }
    }

    pub fn predict(&self, features: ArrayView1<'_, f32>) -> f32 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    /// Multiply every leaf output by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for node in &mut self.nodes {
            if let TreeNode::Leaf { value } = node {
                *value *= factor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::aview1;

    #[test]
    fn predict_follows_thresholds() {
        let tree = RegressionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: -1.0 },
                TreeNode::Split {
                    feature: 1,
                    threshold: 0.25,
                    left: 3,
                    right: 4,
                },
                TreeNode::Leaf { value: 1.0 },
                TreeNode::Leaf { value: 2.0 },
            ],
        };
        assert_eq!(tree.predict(aview1(&[0.5, 0.9])), -1.0);
        assert_eq!(tree.predict(aview1(&[0.6, 0.1])), 1.0);
        assert_eq!(tree.predict(aview1(&[0.6, 0.9])), 2.0);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn scale_touches_only_leaves() {
        let mut tree = RegressionTree::constant(2.0);
        tree.scale(0.5);
        assert_eq!(tree.predict(aview1(&[0.0f32])), 1.0);
    }
}
