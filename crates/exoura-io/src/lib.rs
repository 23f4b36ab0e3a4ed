//! Kepler KOI data loading, validation, and JSON reporting for exoura.

mod domain;
mod error;
mod koi_reader;
mod writer;

pub use domain::{
    CandidateRecord, DISPOSITION_COLUMN, Disposition, ExperimentName, FALSE_POSITIVE,
    FEATURE_COLUMNS, KoiDataset, NAME_COLUMN,
};
pub use error::{DataError, ReportError};
pub use koi_reader::KoiReader;
pub use writer::{PredictionRow, ReportWriter};
