//! Error types for exoura-classifier.

use std::path::PathBuf;

use exoura_io::DataError;
use exoura_rf::RfError;

/// Top-level error for training and inference.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Training data was unreadable, malformed, or degenerate.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The model artifact could not be written or loaded.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// A prediction request was rejected before reaching the model.
    #[error(transparent)]
    Input(#[from] InvalidInput),

    /// The forest failed to train or predict.
    #[error("model error")]
    Model(#[from] RfError),
}

/// Errors from persisting or loading a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Returned when the artifact file cannot be read.
    #[error("cannot read model artifact {path}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file is not a decodable artifact.
    #[error("corrupt model artifact {path}")]
    Decode {
        /// Path to the artifact.
        path: PathBuf,
        /// Underlying decoder error.
        source: bincode::Error,
    },

    /// Returned when the artifact was written by an incompatible version.
    #[error("incompatible model artifact {path}: format version {found}, expected {expected}")]
    IncompatibleVersion {
        /// Path to the artifact.
        path: PathBuf,
        /// Version this build reads.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// Returned when a decoded artifact contradicts itself.
    #[error("inconsistent model artifact {path}: {reason}")]
    Inconsistent {
        /// Path to the artifact.
        path: PathBuf,
        /// What did not line up.
        reason: String,
    },

    /// Returned when the artifact cannot be encoded.
    #[error("cannot encode model artifact")]
    Encode {
        /// Underlying encoder error.
        source: bincode::Error,
    },

    /// Returned when the artifact cannot be written or moved into place.
    #[error("cannot write model artifact {path}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Reasons a feature vector is refused at inference time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    /// Returned when the input does not hold exactly five values.
    #[error("expected {expected} feature values, got {got}")]
    WrongArity {
        /// Required count.
        expected: usize,
        /// Supplied count.
        got: usize,
    },

    /// Returned when a value is not a number.
    #[error("{feature} must be a number, got \"{raw}\"")]
    NonNumeric {
        /// Feature column name.
        feature: &'static str,
        /// The rejected text.
        raw: String,
    },

    /// Returned when a value is NaN or infinite.
    #[error("{feature} must be finite, got {value}")]
    NonFinite {
        /// Feature column name.
        feature: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a value violates the active range policy.
    #[error("{feature} must be non-negative, got {value}")]
    OutOfRange {
        /// Feature column name.
        feature: &'static str,
        /// The rejected value.
        value: f64,
    },
}
