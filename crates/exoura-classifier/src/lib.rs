//! Kepler false-positive classification: training pipeline, model artifact,
//! predictor, and the state behind the chat and form front ends.
//!
//! The [`Trainer`] reads a KOI CSV export, holds out a seeded test split,
//! grid-searches a random forest with stratified cross-validation, and
//! writes a versioned [`ModelArtifact`]. A [`Predictor`] loads that artifact
//! and classifies validated [`FeatureVector`]s. [`ChatSession`] and
//! [`FormState`] are thin, testable clients of the predictor.

mod artifact;
mod error;
mod features;
mod form;
mod label;
mod predictor;
mod session;
mod trainer;

pub use artifact::ModelArtifact;
pub use error::{ArtifactError, ClassifierError, InvalidInput};
pub use features::{FeatureKind, FeatureVector, RangePolicy};
pub use form::{FormState, FormView, ProportionChart, START_ANGLE_DEG, Wedge};
pub use label::{Label, LabelMap};
pub use predictor::{ClassProbabilities, Prediction, Predictor};
pub use session::{ChatReply, ChatSession, ChatState};
pub use trainer::{
    AverageMetrics, ClassificationReport, LabelMetrics, RowCounts, Trainer, TrainerConfig,
    TrainingOutcome, TrainingReport,
};
