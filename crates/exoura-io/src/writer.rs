//! JSON report writer for training and batch classification outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::ReportError;
use crate::domain::ExperimentName;

/// Writes training and classification reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_train.json` and
/// `{experiment}_predictions.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

/// One classified row of a batch run.
///
/// Holds primitives only so this crate stays independent of the model crates.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRow {
    /// One-based line number in the input file.
    pub line: u64,
    /// `kepoi_name`, when present.
    pub name: Option<String>,
    /// Human-readable predicted label.
    pub label: String,
    /// Predicted class index.
    pub class: usize,
    /// Class probabilities in class-index order.
    pub probabilities: Vec<f64>,
    /// Archive disposition, when the input carried one.
    pub disposition: Option<String>,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, ReportError> {
        fs::create_dir_all(output_dir).map_err(|e| ReportError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a training report to `{experiment}_train.json`.
    ///
    /// The report body is flattened next to the `experiment` field.
    ///
    /// # Errors
    ///
    /// [`ReportError::Serialize`] or [`ReportError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_training<T: Serialize>(&self, report: &T) -> Result<PathBuf, ReportError> {
        let path = self.path_for("train");
        let artifact = TrainArtifact {
            experiment: self.experiment.as_str(),
            report,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "training report written");
        Ok(path)
    }

    /// Write batch predictions to `{experiment}_predictions.json`.
    ///
    /// # Errors
    ///
    /// [`ReportError::Serialize`] or [`ReportError::WriteFile`].
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn write_predictions(
        &self,
        model: &Path,
        rows_dropped: usize,
        rows: &[PredictionRow],
    ) -> Result<PathBuf, ReportError> {
        let path = self.path_for("predictions");
        let artifact = PredictionsArtifact {
            experiment: self.experiment.as_str(),
            model: model.display().to_string(),
            n_rows: rows.len(),
            rows_dropped,
            n_false_positive: rows.iter().filter(|r| r.class == 1).count(),
            predictions: rows,
        };
        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    fn path_for(&self, kind: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{kind}.json", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| ReportError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| ReportError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct TrainArtifact<'a, T: Serialize> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a T,
}

#[derive(Serialize)]
struct PredictionsArtifact<'a> {
    experiment: &'a str,
    model: String,
    n_rows: usize,
    rows_dropped: usize,
    n_false_positive: usize,
    predictions: &'a [PredictionRow],
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct FakeReport {
        test_accuracy: f64,
        rows_used: usize,
    }

    fn rows() -> Vec<PredictionRow> {
        vec![
            PredictionRow {
                line: 2,
                name: Some("K00001.01".into()),
                label: "False Positive".into(),
                class: 1,
                probabilities: vec![0.25, 0.75],
                disposition: None,
            },
            PredictionRow {
                line: 3,
                name: None,
                label: "Not False Positive".into(),
                class: 0,
                probabilities: vec![0.9, 0.1],
                disposition: Some("CONFIRMED".into()),
            },
        ]
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_training_flattens_report() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("kepler".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let path = writer
            .write_training(&FakeReport { test_accuracy: 0.9, rows_used: 10 })
            .unwrap();
        assert_eq!(path, dir.path().join("kepler_train.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "kepler");
        assert_eq!(content["rows_used"], 10);
        assert!((content["test_accuracy"].as_f64().unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn write_predictions_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("batch".into()).unwrap();
        let writer = ReportWriter::new(dir.path(), experiment).unwrap();

        let path = writer
            .write_predictions(Path::new("rf_model.bin"), 1, &rows())
            .unwrap();
        let content = read_json(&path);

        assert_eq!(content["experiment"], "batch");
        assert_eq!(content["model"], "rf_model.bin");
        assert_eq!(content["n_rows"], 2);
        assert_eq!(content["rows_dropped"], 1);
        assert_eq!(content["n_false_positive"], 1);
        let predictions = content["predictions"].as_array().unwrap();
        assert_eq!(predictions[0]["label"], "False Positive");
        assert_eq!(predictions[0]["name"], "K00001.01");
        assert!(predictions[1]["name"].is_null());
        assert_eq!(predictions[1]["probabilities"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("nested_test".into()).unwrap();
        let writer = ReportWriter::new(&nested, experiment).unwrap();

        writer
            .write_predictions(Path::new("m.bin"), 0, &[])
            .unwrap();
        assert!(nested.join("nested_test_predictions.json").exists());
    }
}
