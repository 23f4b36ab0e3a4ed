//! Configuration builder for random forest training.

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;

/// Strategy for the number of features drawn as split candidates at each node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MaxFeatures {
    /// Square root of the feature count, rounded up.
    Sqrt,
    /// Base-2 logarithm of the feature count, rounded up.
    Log2,
    /// A fraction of the feature count in (0.0, 1.0], rounded up.
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// Every feature at every split.
    All,
}

impl MaxFeatures {
    /// Resolve the strategy to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] when the count falls outside
    /// `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let n = n_features as f64;
        let resolved = match self {
            MaxFeatures::Sqrt => n.sqrt().ceil() as usize,
            MaxFeatures::Log2 => n.log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n * f).ceil() as usize,
            MaxFeatures::Fixed(count) => count,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Configuration for random forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `criterion`         | `Gini`     |
/// | `n_classes`         | inferred   |
/// | `seed`              | 42         |
///
/// Every tree is grown on a bootstrap sample the size of the training set.
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            n_classes: None,
            seed: 42,
        })
    }

    /// Replace the tree count.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn with_n_trees(mut self, n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        self.n_trees = n_trees;
        Ok(self)
    }

    /// Set the per-split feature sampling strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` grows until leaves are pure.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples a node needs before it may split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples each child must keep after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fix the number of classes instead of inferring it from the labels.
    ///
    /// Needed when a training subset may not contain every class: the
    /// forest still emits a distribution over all `n_classes`.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = Some(n_classes);
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the per-split feature sampling strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the fixed class count, if one was set.
    #[must_use]
    pub fn n_classes(&self) -> Option<usize> {
        self.n_classes
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a random forest.
    ///
    /// `features[sample_idx][feature_idx]` is row-major; `labels[sample_idx]`
    /// holds zero-based class indices.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                       |
    /// |-------------------------------------|--------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                        |
    /// | [`RfError::ZeroFeatures`]           | rows have zero columns                     |
    /// | [`RfError::LabelCountMismatch`]     | `labels.len() != features.len()`           |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths             |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite               |
    /// | [`RfError::LabelOutOfRange`]        | a label exceeds the fixed class count      |
    /// | [`RfError::InvalidMaxFeatures`]     | feature budget outside `[1, n_features]`   |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                   |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                    |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                     |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_five_features_rounds_up() {
        assert_eq!(MaxFeatures::Sqrt.resolve(5).unwrap(), 3);
    }

    #[test]
    fn log2_never_below_one() {
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
    }

    #[test]
    fn fixed_above_feature_count_rejected() {
        let err = MaxFeatures::Fixed(6).resolve(5).unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMaxFeatures { max_features: 6, n_features: 5 }
        ));
    }

    #[test]
    fn zero_trees_rejected() {
        assert!(RandomForestConfig::new(0).is_err());
        let cfg = RandomForestConfig::new(3).unwrap();
        assert!(cfg.with_n_trees(0).is_err());
    }

    #[test]
    fn setters_round_trip() {
        let cfg = RandomForestConfig::new(10)
            .unwrap()
            .with_max_depth(Some(4))
            .with_min_samples_split(5)
            .with_min_samples_leaf(2)
            .with_n_classes(2)
            .with_seed(7);
        assert_eq!(cfg.n_trees(), 10);
        assert_eq!(cfg.max_depth(), Some(4));
        assert_eq!(cfg.min_samples_split(), 5);
        assert_eq!(cfg.min_samples_leaf(), 2);
        assert_eq!(cfg.n_classes(), Some(2));
        assert_eq!(cfg.seed(), 7);
    }
}
