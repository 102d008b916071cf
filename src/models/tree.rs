//! Regression tree used as a boosting stage.
//!
//! Nodes live in a flat vector with the root at index 0. A split sends a row
//! left when `x[feature] < threshold` and right otherwise (including NaN).
//! Children are always stored after their parent, which keeps traversal
//! acyclic and lets `from_nodes` validate a deserialized tree in one pass.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Node>", into = "Vec<Node>")]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// A tree with a single leaf.
    pub fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    /// Build a tree from a flat node list, checking its structure.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, AppError> {
        if nodes.is_empty() {
            return Err(AppError::new(4, "Tree has no nodes."));
        }
        for (idx, node) in nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if left <= idx || right <= idx || left >= nodes.len() || right >= nodes.len() {
                        return Err(AppError::new(
                            4,
                            format!("Tree node {idx} has invalid children ({left}, {right})."),
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(AppError::new(4, format!("Tree node {idx} has a non-finite threshold.")));
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(AppError::new(4, format!("Tree node {idx} has a non-finite leaf value.")));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Largest feature index referenced by any split.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Leaf value reached by `x`.
    ///
    /// # Panics
    /// Panics if a split references a feature beyond `x.len()`. `Booster`
    /// checks feature indices when it is constructed.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] < threshold { left } else { right };
                }
            }
        }
    }
}

impl TryFrom<Vec<Node>> for Tree {
    type Error = AppError;

    fn try_from(nodes: Vec<Node>) -> Result<Self, Self::Error> {
        Tree::from_nodes(nodes)
    }
}

impl From<Tree> for Vec<Node> {
    fn from(tree: Tree) -> Self {
        tree.nodes
    }
}
