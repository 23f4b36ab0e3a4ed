/// Errors from random forest training, evaluation, and model search.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when a forest is configured with zero trees.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The rejected tree count.
        n_trees: usize,
    },

    /// Returned when `max_depth` is `Some(0)`.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected depth limit.
        max_depth: usize,
    },

    /// Returned when `min_samples_split` is below 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// The rejected value.
        min_samples_split: usize,
    },

    /// Returned when `min_samples_leaf` is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The rejected value.
        min_samples_leaf: usize,
    },

    /// Returned when the per-split feature budget resolves outside `[1, n_features]`.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved feature budget.
        max_features: usize,
        /// Number of feature columns in the data.
        n_features: usize,
    },

    /// Returned when cross-validation is configured with fewer than two folds.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The rejected fold count.
        n_folds: usize,
    },

    /// Returned when a hyperparameter grid has no candidates.
    #[error("hyperparameter grid is empty: every axis needs at least one value")]
    EmptyGrid,

    /// Returned when there are no samples to train or score on.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when samples have no feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the label vector and the feature rows differ in length.
    #[error("got {n_labels} labels for {n_samples} samples")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_samples: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a class label is outside `[0, n_classes)`.
    #[error("label {label} at sample {sample_index} is outside [0, {n_classes})")]
    LabelOutOfRange {
        /// The offending label.
        label: usize,
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Number of classes the labels are checked against.
        n_classes: usize,
    },

    /// Returned when a training row has the wrong number of features.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Feature count of the first row.
        expected: usize,
        /// Feature count of the offending row.
        got: usize,
        /// Zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when a prediction input has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// Feature count the model was trained on.
        expected: usize,
        /// Feature count of the input.
        got: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// Zero-based index of the offending sample.
        sample_index: usize,
        /// Zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when k-fold splitting is asked for more folds than samples.
    #[error("cannot split {n_samples} samples into {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Number of samples available.
        n_samples: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when a deserialized model fails its structural checks.
    #[error("malformed model: {reason}")]
    MalformedModel {
        /// What the check found.
        reason: String,
    },
}
