//! Domain types for exoura-io.

use std::fmt;

use crate::ReportError;

/// The five model inputs, in the order the model consumes them.
pub const FEATURE_COLUMNS: [&str; 5] = [
    "koi_period",
    "koi_duration",
    "koi_depth",
    "koi_prad",
    "koi_model_snr",
];

/// Column holding the archive's disposition for each candidate.
pub const DISPOSITION_COLUMN: &str = "koi_disposition";

/// Optional column used to identify rows in batch outputs.
pub const NAME_COLUMN: &str = "kepoi_name";

/// Disposition value that marks the positive class.
pub const FALSE_POSITIVE: &str = "FALSE POSITIVE";

/// Archive disposition of one candidate, e.g. `CONFIRMED` or `FALSE POSITIVE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disposition(String);

impl Disposition {
    pub(crate) fn new(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// Return the disposition text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True iff the disposition is exactly `FALSE POSITIVE`.
    #[must_use]
    pub fn is_false_positive(&self) -> bool {
        self.0 == FALSE_POSITIVE
    }

    /// Binary class index: 1 for false positives, 0 otherwise.
    #[must_use]
    pub fn class_index(&self) -> usize {
        usize::from(self.is_false_positive())
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fully populated row of the KOI table.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// One-based line number in the source file.
    pub line: u64,
    /// `kepoi_name`, when the file has that column.
    pub name: Option<String>,
    /// Feature values in [`FEATURE_COLUMNS`] order.
    pub features: [f64; 5],
    /// Archive disposition; `None` only for unlabeled reads.
    pub disposition: Option<Disposition>,
}

/// A cleaned KOI dataset.
///
/// Produced by [`KoiReader`](crate::KoiReader). Every record has all five
/// features; labeled reads also guarantee a disposition.
#[derive(Debug)]
pub struct KoiDataset {
    records: Vec<CandidateRecord>,
    rows_read: usize,
}

impl KoiDataset {
    pub(crate) fn new(records: Vec<CandidateRecord>, rows_read: usize) -> Self {
        Self { records, rows_read }
    }

    /// Return the retained records in file order.
    #[must_use]
    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    /// Data rows in the file, before dropping.
    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Rows dropped for having a null in a required column.
    #[must_use]
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.records.len()
    }

    /// Number of retained rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no rows were retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Feature matrix, one row per record.
    #[must_use]
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.records.iter().map(|r| r.features.to_vec()).collect()
    }

    /// Binary labels; unlabeled records count as class 0.
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        self.records
            .iter()
            .map(|r| r.disposition.as_ref().map_or(0, Disposition::class_index))
            .collect()
    }

    /// Feature column names in model order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect()
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, ReportError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ReportError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
