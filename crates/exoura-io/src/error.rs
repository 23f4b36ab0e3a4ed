//! Error types for exoura-io.

use std::path::PathBuf;

/// Errors from reading and validating a KOI dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required column is absent from the header.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The required column name.
        column: String,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("ragged row in {path}: line {line} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// One-based line number in the file.
        line: u64,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a present (non-null) numeric cell is not a finite float.
    #[error("malformed value in {path}: line {line}, column {column}, raw value \"{raw}\"")]
    MalformedValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// One-based line number in the file.
        line: u64,
        /// Column name.
        column: String,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when no usable rows remain after dropping incomplete ones.
    #[error("empty dataset in {path}: {rows_read} rows read, none complete")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
        /// Data rows read before dropping.
        rows_read: usize,
    },

    /// Returned when every usable row carries the same label.
    #[error("degenerate labels: all {n_rows} rows are \"{label}\", need both classes")]
    SingleClass {
        /// Usable rows.
        n_rows: usize,
        /// The only label present.
        label: String,
    },

    /// Returned when a train/test split would leave either side empty.
    #[error("cannot split {n_rows} rows into {n_train} train and {n_test} test rows")]
    SplitTooSmall {
        /// Usable rows.
        n_rows: usize,
        /// Rows assigned to training.
        n_train: usize,
        /// Rows assigned to test.
        n_test: usize,
    },

    /// Returned when the training subset holds a single class.
    #[error("training subset of {n_train} rows contains only \"{label}\"")]
    TrainingSetSingleClass {
        /// Rows in the training subset.
        n_train: usize,
        /// The only label present.
        label: String,
    },

    /// Returned when the training subset is smaller than the fold count.
    #[error("{n_train} training rows cannot fill {n_folds} cross-validation folds")]
    TooFewRowsForFolds {
        /// Rows in the training subset.
        n_train: usize,
        /// Requested fold count.
        n_folds: usize,
    },
}

/// Errors from writing JSON reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be encoded as JSON.
    #[error("cannot serialize report for {path}")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder error.
        source: serde_json::Error,
    },

    /// Returned when a report file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
