//! CART decision trees stored as index arenas.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::RfError;
use crate::node::{Impurity, Node, NodeIndex};
use crate::split::{SplitCriterion, find_best_split};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
/// Defaults: Gini, unlimited depth, `min_samples_split = 2`,
/// `min_samples_leaf = 1`, every feature considered, seed 42.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Limit depth to `Some(d)` levels below the root (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples each child keeps.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set how many randomly drawn features each node may split on.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the width of leaf distributions.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Grow a tree on a row-major dataset.
    ///
    /// # Errors
    ///
    /// Input errors as for [`RandomForestConfig::fit`](crate::RandomForestConfig::fit),
    /// plus [`RfError::InvalidMaxDepth`], [`RfError::InvalidMinSamplesSplit`]
    /// and [`RfError::InvalidMinSamplesLeaf`] for bad stopping rules.
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let n_features = crate::forest::validate_dataset(features, labels)?;
        self.validate_stopping_rules()?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }
        let n_classes = crate::forest::resolve_n_classes(self.n_classes, labels)?;

        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let mut builder = TreeBuilder {
            columns: &columns,
            labels,
            n_classes,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        let all: Vec<usize> = (0..features.len()).collect();
        builder.grow(&all, 0);

        debug!(n_nodes = builder.arena.len(), n_classes, "decision tree grown");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            n_classes,
        })
    }

    fn validate_stopping_rules(&self) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive arena construction state.
struct TreeBuilder<'a> {
    columns: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, samples: &[usize], depth: usize) -> NodeIndex {
        let n_samples = samples.len();
        let mut counts = vec![0usize; self.n_classes];
        for &si in samples {
            counts[self.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(&counts, n_samples);

        let at_depth_limit = self.config.max_depth.is_some_and(|d| depth >= d);
        if at_depth_limit || n_samples < self.config.min_samples_split || impurity.is_pure() {
            return self.push_leaf(&counts, impurity);
        }

        let Some(split) = find_best_split(
            self.columns,
            self.labels,
            samples,
            self.n_classes,
            self.config.criterion,
            self.max_features,
            self.config.min_samples_leaf,
            &mut self.rng,
        ) else {
            return self.push_leaf(&counts, impurity);
        };

        // Reserve the slot so the root stays at index 0; overwritten below.
        let slot = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            impurity,
            n_samples,
        });
        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);
        self.arena[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            impurity_decrease: split.impurity_decrease,
        };
        NodeIndex::new(slot)
    }

    fn push_leaf(&mut self, counts: &[usize], impurity: Impurity) -> NodeIndex {
        let n_samples: usize = counts.iter().sum();
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / n_samples.max(1) as f64)
            .collect();
        // Ties resolve to the lowest class index.
        let prediction = counts
            .iter()
            .enumerate()
            .fold((0, 0), |best, (class, &c)| if c > best.1 { (class, c) } else { best })
            .0;
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// A fitted CART decision tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the majority class of the leaf `sample` falls into.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("leaf_for always stops at a leaf"),
        }
    }

    /// Return the class fractions of the leaf `sample` falls into.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf_for(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("leaf_for always stops at a leaf"),
        }
    }

    /// Mean decrease in impurity per feature, normalized to sum to 1.0.
    ///
    /// All zeros for a single-leaf tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[*feature] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Total node count.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf count.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => deepest = deepest.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }
        deepest
    }

    /// Check the arena invariants a grown tree always satisfies.
    ///
    /// Children sit after their parent in the arena, so descent always
    /// terminates. Every split tests a real feature and every leaf carries an
    /// `n_classes`-wide distribution.
    ///
    /// # Errors
    ///
    /// [`RfError::MalformedModel`] naming the first broken invariant.
    pub fn validate(&self) -> Result<(), RfError> {
        let malformed = |reason: String| Err(RfError::MalformedModel { reason });
        if self.nodes.is_empty() {
            return malformed("tree has no nodes".into());
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.n_features {
                        return malformed(format!(
                            "node {idx} splits on feature {feature} of {}",
                            self.n_features
                        ));
                    }
                    for child in [left, right] {
                        if child.index() <= idx || child.index() >= n_nodes {
                            return malformed(format!(
                                "node {idx} points at child {child} of {n_nodes} nodes"
                            ));
                        }
                    }
                }
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => {
                    if distribution.len() != self.n_classes || *prediction >= self.n_classes {
                        return malformed(format!(
                            "leaf {idx} does not match {} classes",
                            self.n_classes
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_for(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut node = &self.nodes[0];
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = node
        {
            let next = if sample[*feature] <= *threshold { left } else { right };
            node = &self.nodes[next.index()];
        }
        Ok(node)
    }
}
