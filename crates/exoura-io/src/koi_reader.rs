//! Kepler KOI CSV reader: column selection, null dropping, value validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::{
    CandidateRecord, DISPOSITION_COLUMN, Disposition, FALSE_POSITIVE, FEATURE_COLUMNS,
    KoiDataset, NAME_COLUMN,
};

/// Cell values treated as null in addition to the empty string.
const NULL_TOKENS: [&str; 6] = ["NaN", "nan", "NA", "N/A", "null", "NULL"];

/// Reads Kepler Objects of Interest from a cumulative-table CSV export.
///
/// Expected CSV format:
/// - Lines starting with `#` are comments and skipped
/// - Header row required; columns are looked up by name, extras ignored
/// - `koi_period,koi_duration,koi_depth,koi_prad,koi_model_snr` required,
///   `koi_disposition` required for labeled reads
///
/// Rows with a null in any required column are dropped, not rejected.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`DataError::CsvParse`] | Malformed CSV record |
/// | [`DataError::MissingColumn`] | Required column absent from header |
/// | [`DataError::InconsistentRowLength`] | Row has different column count than header |
/// | [`DataError::MalformedValue`] | Non-null feature cell is not a finite float |
/// | [`DataError::EmptyDataset`] | No complete rows |
/// | [`DataError::SingleClass`] | Labeled read left only one class |
pub struct KoiReader {
    path: PathBuf,
}

/// Header positions of the columns a read needs.
struct ColumnIndex {
    features: [usize; 5],
    disposition: Option<usize>,
    name: Option<usize>,
}

impl KoiReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read rows with all five features and a disposition.
    ///
    /// Fails unless both classes are present after dropping.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_labeled(&self) -> Result<KoiDataset, DataError> {
        let dataset = self.read(true)?;
        let positives = dataset.labels().iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == dataset.len() {
            let label = if positives == 0 {
                dataset.records()[0]
                    .disposition
                    .as_ref()
                    .map_or_else(String::new, |d| d.to_string())
            } else {
                FALSE_POSITIVE.to_string()
            };
            return Err(DataError::SingleClass {
                n_rows: dataset.len(),
                label,
            });
        }
        info!(
            n_rows = dataset.len(),
            n_false_positive = positives,
            rows_dropped = dataset.rows_dropped(),
            "labeled KOI dataset loaded"
        );
        Ok(dataset)
    }

    /// Read rows with all five features; the disposition column is optional
    /// and kept when present.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_features(&self) -> Result<KoiDataset, DataError> {
        let dataset = self.read(false)?;
        info!(
            n_rows = dataset.len(),
            rows_dropped = dataset.rows_dropped(),
            "KOI feature table loaded"
        );
        Ok(dataset)
    }

    fn read(&self, require_disposition: bool) -> Result<KoiDataset, DataError> {
        let file = std::fs::File::open(&self.path).map_err(|e| DataError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so our InconsistentRowLength check fires instead of
        // a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?.clone();
        let columns = self.locate_columns(&header, require_disposition)?;
        debug!(n_columns = header.len(), "read CSV header");

        let mut records = Vec::new();
        let mut rows_read = 0usize;
        for result in rdr.records() {
            let row = result.map_err(|e| self.parse_error(e))?;
            rows_read += 1;
            let line = row.position().map_or(0, |p| p.line());
            if row.len() != header.len() {
                return Err(DataError::InconsistentRowLength {
                    path: self.path.clone(),
                    line,
                    expected: header.len(),
                    got: row.len(),
                });
            }
            if let Some(record) = self.parse_row(&row, line, &columns, require_disposition)? {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Err(DataError::EmptyDataset {
                path: self.path.clone(),
                rows_read,
            });
        }
        debug!(rows_read, rows_kept = records.len(), "dropped incomplete rows");
        Ok(KoiDataset::new(records, rows_read))
    }

    fn locate_columns(
        &self,
        header: &csv::StringRecord,
        require_disposition: bool,
    ) -> Result<ColumnIndex, DataError> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let missing = |name: &str| DataError::MissingColumn {
            path: self.path.clone(),
            column: name.to_string(),
        };

        let mut features = [0usize; 5];
        for (slot, name) in features.iter_mut().zip(FEATURE_COLUMNS) {
            *slot = find(name).ok_or_else(|| missing(name))?;
        }
        let disposition = find(DISPOSITION_COLUMN);
        if require_disposition && disposition.is_none() {
            return Err(missing(DISPOSITION_COLUMN));
        }
        Ok(ColumnIndex {
            features,
            disposition,
            name: find(NAME_COLUMN),
        })
    }

    /// Parse one row; `Ok(None)` means a required cell was null.
    fn parse_row(
        &self,
        row: &csv::StringRecord,
        line: u64,
        columns: &ColumnIndex,
        require_disposition: bool,
    ) -> Result<Option<CandidateRecord>, DataError> {
        let disposition = columns
            .disposition
            .and_then(|i| row.get(i))
            .filter(|raw| !is_null(raw))
            .map(Disposition::new);
        if require_disposition && disposition.is_none() {
            return Ok(None);
        }

        let mut features = [0.0f64; 5];
        let cells = features.iter_mut().zip(&columns.features).zip(FEATURE_COLUMNS);
        for ((slot, &col), name) in cells {
            let raw = row.get(col).unwrap_or("");
            if is_null(raw) {
                return Ok(None);
            }
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DataError::MalformedValue {
                    path: self.path.clone(),
                    line,
                    column: name.to_string(),
                    raw: raw.to_string(),
                })?;
        }

        let name = columns
            .name
            .and_then(|i| row.get(i))
            .filter(|raw| !is_null(raw))
            .map(String::from);
        Ok(Some(CandidateRecord {
            line,
            name,
            features,
            disposition,
        }))
    }

    fn parse_error(&self, e: csv::Error) -> DataError {
        DataError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

fn is_null(raw: &str) -> bool {
    raw.is_empty() || NULL_TOKENS.contains(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "kepoi_name,koi_disposition,koi_period,koi_duration,koi_depth,koi_prad,koi_model_snr\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_labeled() {
        let csv = format!(
            "# NASA Exoplanet Archive export\n# another comment\n{HEADER}\
             K00752.01,CONFIRMED,9.49,2.96,615.8,2.26,35.8\n\
             K00754.01,FALSE POSITIVE,1.74,2.41,8079.2,33.46,505.6\n"
        );
        let f = write_csv(&csv);
        let ds = KoiReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows_dropped(), 0);
        assert_eq!(ds.labels(), vec![0, 1]);
        assert_eq!(ds.records()[0].name.as_deref(), Some("K00752.01"));
        assert!((ds.records()[1].features[2] - 8079.2).abs() < 1e-9);
    }

    #[test]
    fn drops_rows_with_nulls() {
        let csv = format!(
            "{HEADER}\
             A,CONFIRMED,9.4,2.9,615.8,2.2,35.8\n\
             B,FALSE POSITIVE,1.7,2.4,,33.4,505.6\n\
             C,,1.7,2.4,80.0,33.4,505.6\n\
             D,FALSE POSITIVE,1.7,2.4,80.0,NaN,505.6\n\
             E,FALSE POSITIVE,1.7,2.4,80.0,3.1,12.0\n"
        );
        let f = write_csv(&csv);
        let ds = KoiReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(ds.rows_read(), 5);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows_dropped(), 3);
    }

    #[test]
    fn column_order_does_not_matter() {
        let csv = "koi_model_snr,koi_prad,extra,koi_depth,koi_duration,koi_period,koi_disposition\n\
                   5,4,x,3,2,1,CONFIRMED\n\
                   50,40,y,30,20,10,FALSE POSITIVE\n";
        let f = write_csv(csv);
        let ds = KoiReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(ds.records()[0].features, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(ds.records()[0].name, None);
    }

    #[test]
    fn missing_column_error() {
        let csv = "koi_period,koi_duration,koi_depth,koi_prad,koi_disposition\n1,2,3,4,CONFIRMED\n";
        let f = write_csv(csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn { ref column, .. } if column == "koi_model_snr"
        ));
    }

    #[test]
    fn malformed_value_error() {
        let csv = format!("{HEADER}A,CONFIRMED,abc,2.9,615.8,2.2,35.8\n");
        let f = write_csv(&csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(
            err,
            DataError::MalformedValue { ref column, .. } if column == "koi_period"
        ));
    }

    #[test]
    fn infinite_value_is_malformed() {
        let csv = format!("{HEADER}A,CONFIRMED,inf,2.9,615.8,2.2,35.8\n");
        let f = write_csv(&csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(err, DataError::MalformedValue { .. }));
    }

    #[test]
    fn empty_after_dropping_error() {
        let csv = format!("{HEADER}A,CONFIRMED,,2.9,615.8,2.2,35.8\n");
        let f = write_csv(&csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(err, DataError::EmptyDataset { rows_read: 1, .. }));
    }

    #[test]
    fn single_class_error() {
        let csv = format!(
            "{HEADER}A,CONFIRMED,1,2,3,4,5\nB,CANDIDATE,1,2,3,4,5\n"
        );
        let f = write_csv(&csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(err, DataError::SingleClass { n_rows: 2, .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let csv = format!("{HEADER}A,CONFIRMED,1,2,3\n");
        let f = write_csv(&csv);
        let err = KoiReader::new(f.path()).read_labeled().unwrap_err();
        assert!(matches!(err, DataError::InconsistentRowLength { got: 5, expected: 7, .. }));
    }

    #[test]
    fn features_only_read_without_disposition() {
        let csv = "koi_period,koi_duration,koi_depth,koi_prad,koi_model_snr\n1,2,3,4,5\n,2,3,4,5\n";
        let f = write_csv(csv);
        let ds = KoiReader::new(f.path()).read_features().unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].disposition, None);
        assert_eq!(ds.records()[0].line, 2);
    }

    #[test]
    fn file_not_found_error() {
        let err = KoiReader::new(Path::new("/nonexistent/koi.csv"))
            .read_features()
            .unwrap_err();
        assert!(matches!(err, DataError::FileNotFound { .. }));
    }
}
