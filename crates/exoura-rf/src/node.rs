//! Arena node types for fitted decision trees.

use std::fmt;

/// Position of a node inside a tree's node arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Impurity of a node under the criterion the tree was grown with.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// True when the node holds a single class.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= 0.0
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`]; the root is always index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// Interior node: samples with `x[feature] <= threshold` go left.
    Split {
        /// Feature column tested at this node.
        feature: usize,
        /// Split threshold (midpoint between adjacent training values).
        threshold: f64,
        /// Left child.
        left: NodeIndex,
        /// Right child.
        right: NodeIndex,
        /// Impurity before the split.
        impurity: Impurity,
        /// Training samples that reached this node.
        n_samples: usize,
        /// Sample-weighted impurity decrease achieved by the split.
        impurity_decrease: f64,
    },
    /// Terminal node.
    Leaf {
        /// Majority class.
        prediction: usize,
        /// Class fractions of the training samples in this leaf.
        distribution: Vec<f64>,
        /// Impurity of the leaf.
        impurity: Impurity,
        /// Training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the impurity recorded at this node.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_index_display_has_hash_prefix() {
        assert_eq!(NodeIndex::new(3).to_string(), "#3");
    }

    #[test]
    fn zero_impurity_is_pure() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.25).is_pure());
    }

    #[test]
    fn accessors_cover_both_variants() {
        let leaf = Node::Leaf {
            prediction: 1,
            distribution: vec![0.25, 0.75],
            impurity: Impurity::new(0.375),
            n_samples: 8,
        };
        let split = Node::Split {
            feature: 2,
            threshold: 10.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(0.5),
            n_samples: 16,
            impurity_decrease: 2.0,
        };
        assert!(leaf.is_leaf());
        assert!(!split.is_leaf());
        assert_eq!(leaf.n_samples(), 8);
        assert_eq!(split.n_samples(), 16);
        assert!((split.impurity().value() - 0.5).abs() < f64::EPSILON);
    }
}
