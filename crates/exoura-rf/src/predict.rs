//! Prediction methods for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Averaged class probabilities for one sample.
///
/// Entry `i` is the mean over trees of the training-sample fraction of class
/// `i` in the leaf the sample reached. It is a vote share, not a calibrated
/// probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the most probable class; ties go to the lowest index.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (class, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = class;
            }
        }
        best
    }

    /// Return the probability of `class`, or 0.0 when out of range.
    #[must_use]
    pub fn probability(&self, class: usize) -> f64 {
        self.probs.get(class).copied().unwrap_or(0.0)
    }

    /// Return the distribution as a slice indexed by class.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class of a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Average the leaf distributions of every tree for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut sum = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(ClassDistribution::new(sum.into_iter().map(|s| s / n).collect()))
    }

    /// Predict classes for many samples in parallel, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong width.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Check a forest that was not just fitted, such as one read back from
    /// disk.
    ///
    /// # Errors
    ///
    /// [`RfError::MalformedModel`] for an empty ensemble, a tree whose shape
    /// disagrees with the forest, or a tree failing
    /// [`DecisionTree::validate`](crate::DecisionTree::validate).
    pub fn validate(&self) -> Result<(), RfError> {
        if self.trees.is_empty() {
            return Err(RfError::MalformedModel {
                reason: "forest has no trees".into(),
            });
        }
        if self.n_classes == 0 || self.feature_names.len() != self.n_features {
            return Err(RfError::MalformedModel {
                reason: format!(
                    "{} feature names for {} features, {} classes",
                    self.feature_names.len(),
                    self.n_features,
                    self.n_classes
                ),
            });
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != self.n_features || tree.n_classes != self.n_classes {
                return Err(RfError::MalformedModel {
                    reason: format!(
                        "tree {i} has {} features and {} classes, forest has {} and {}",
                        tree.n_features, tree.n_classes, self.n_features, self.n_classes
                    ),
                });
            }
            tree.validate()?;
        }
        Ok(())
    }

    /// Number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Width of every class distribution this forest produces.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature names in training column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}
