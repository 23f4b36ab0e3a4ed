//! Training result types.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// Shape of a training run.
#[derive(Debug, Clone)]
pub struct TrainingMetadata {
    /// Trees trained.
    pub n_trees: usize,
    /// Feature columns.
    pub n_features: usize,
    /// Width of the class distributions.
    pub n_classes: usize,
    /// Training samples.
    pub n_samples: usize,
    /// Features drawn per split.
    pub max_features_resolved: usize,
}

/// Fitted forest plus what was learned about it during training.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            metadata,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Mean-decrease-in-impurity importances, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
