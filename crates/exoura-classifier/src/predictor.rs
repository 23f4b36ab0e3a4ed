//! Inference over a loaded model artifact.

use std::path::Path;

use tracing::{debug, instrument};

use crate::artifact::ModelArtifact;
use crate::error::{ArtifactError, ClassifierError};
use crate::features::{FeatureVector, RangePolicy};
use crate::label::Label;

/// Averaged leaf class fractions for one input. A vote share, not a
/// calibrated probability.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ClassProbabilities {
    /// Share for [`Label::NotFalsePositive`].
    pub not_false_positive: f64,
    /// Share for [`Label::FalsePositive`].
    pub false_positive: f64,
}

impl ClassProbabilities {
    /// Share for one label.
    #[must_use]
    pub fn of(&self, label: Label) -> f64 {
        match label {
            Label::NotFalsePositive => self.not_false_positive,
            Label::FalsePositive => self.false_positive,
        }
    }

    /// Shares in class-index order.
    #[must_use]
    pub fn as_array(&self) -> [f64; 2] {
        [self.not_false_positive, self.false_positive]
    }
}

/// A label with the probabilities it was chosen from.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Prediction {
    /// Predicted label.
    pub label: Label,
    /// Per-label shares.
    pub probabilities: ClassProbabilities,
}

/// Stateless classifier over an immutable artifact.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: ModelArtifact,
    policy: RangePolicy,
}

impl Predictor {
    /// Load the artifact at `path`.
    ///
    /// # Errors
    ///
    /// Any [`ArtifactError`] from [`ModelArtifact::load`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Ok(Self::from_artifact(ModelArtifact::load(path)?))
    }

    /// Wrap an in-memory artifact.
    #[must_use]
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            policy: RangePolicy::default(),
        }
    }

    /// Set the range policy checked before each prediction.
    #[must_use]
    pub fn with_range_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The underlying artifact.
    #[must_use]
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Predict the label only.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::Input`] on a range-policy violation;
    /// [`ClassifierError::Model`] or [`ClassifierError::Artifact`] if the
    /// model cannot score the input.
    pub fn predict(&self, features: &FeatureVector) -> Result<Label, ClassifierError> {
        Ok(self.predict_proba(features)?.label)
    }

    /// Predict the label with its probabilities.
    ///
    /// # Errors
    ///
    /// As [`Predictor::predict`].
    #[instrument(skip_all)]
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        self.policy.check(features)?;
        let dist = self.artifact.forest().predict_proba(features.as_slice())?;
        let labels = self.artifact.labels();
        let class = dist.predicted_class();
        let label = labels.label(class).ok_or_else(|| ArtifactError::Inconsistent {
            path: Path::new("<memory>").to_path_buf(),
            reason: format!("no label for class {class}"),
        })?;
        let share = |l: Label| labels.index_of(l).map_or(0.0, |i| dist.probability(i));
        let probabilities = ClassProbabilities {
            not_false_positive: share(Label::NotFalsePositive),
            false_positive: share(Label::FalsePositive),
        };
        debug!(%label, p_false_positive = probabilities.false_positive, "prediction");
        Ok(Prediction { label, probabilities })
    }

    /// Validate raw values and predict.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::Input`] for wrong arity or non-finite values, else
    /// as [`Predictor::predict_proba`].
    pub fn predict_values(&self, values: &[f64]) -> Result<Prediction, ClassifierError> {
        let features = FeatureVector::from_values(values)?;
        self.predict_proba(&features)
    }
}
