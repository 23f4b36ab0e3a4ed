//! Model artifact persistence via bincode.

use std::io::Write;
use std::path::Path;

use exoura_rf::{HyperParams, RandomForest};
use tracing::{debug, info, instrument};

use crate::error::ArtifactError;
use crate::label::LabelMap;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized artifact.
#[derive(serde::Serialize, serde::Deserialize)]
struct ArtifactEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// The artifact itself.
    artifact: ModelArtifact,
}

/// A trained classifier with everything inference needs.
///
/// Immutable once written; every predictor loads its own copy.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelArtifact {
    forest: RandomForest,
    feature_names: Vec<String>,
    labels: LabelMap,
    params: HyperParams,
}

impl ModelArtifact {
    /// Bundle a fitted forest with its label map and winning parameters.
    #[must_use]
    pub fn new(forest: RandomForest, labels: LabelMap, params: HyperParams) -> Self {
        let feature_names = forest.feature_names().to_vec();
        Self {
            forest,
            feature_names,
            labels,
            params,
        }
    }

    /// The fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Feature names in model order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Class index to label.
    #[must_use]
    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Hyperparameters the forest was trained with.
    #[must_use]
    pub fn params(&self) -> HyperParams {
        self.params
    }

    /// Write the artifact, replacing any existing file.
    ///
    /// Bytes go to a temporary file in the destination directory that is
    /// renamed over `path`, so readers never observe a partial artifact.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ArtifactError::Encode`] | bincode encoding failed |
    /// | [`ArtifactError::Write`] | temp file creation, write, or rename failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let envelope = ArtifactEnvelope {
            format_version: FORMAT_VERSION,
            artifact: self.clone(),
        };
        let bytes = bincode::serialize(&envelope).map_err(|e| ArtifactError::Encode { source: e })?;

        let write_err = |e: std::io::Error| ArtifactError::Write {
            path: path.to_path_buf(),
            source: e,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.forest.n_trees(),
            "model artifact saved"
        );
        Ok(())
    }

    /// Load an artifact, checking its format version and internal consistency.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ArtifactError::Read`] | file read failed |
    /// | [`ArtifactError::Decode`] | bincode decoding failed |
    /// | [`ArtifactError::IncompatibleVersion`] | format version mismatch |
    /// | [`ArtifactError::Inconsistent`] | malformed forest, labels or features |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ArtifactError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        // The version leads the envelope, so it is readable even when the
        // rest of the layout changed.
        let format_version: u32 = bincode::deserialize(&bytes).map_err(|e| ArtifactError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;
        if format_version != FORMAT_VERSION {
            return Err(ArtifactError::IncompatibleVersion {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: format_version,
            });
        }

        let envelope: ArtifactEnvelope =
            bincode::deserialize(&bytes).map_err(|e| ArtifactError::Decode {
                path: path.to_path_buf(),
                source: e,
            })?;
        let artifact = envelope.artifact;

        let inconsistent = |reason: String| ArtifactError::Inconsistent {
            path: path.to_path_buf(),
            reason,
        };
        artifact
            .forest
            .validate()
            .map_err(|e| inconsistent(e.to_string()))?;
        if artifact.labels.len() != artifact.forest.n_classes() {
            return Err(inconsistent(format!(
                "{} labels for {} classes",
                artifact.labels.len(),
                artifact.forest.n_classes()
            )));
        }
        if artifact.feature_names.len() != artifact.forest.n_features() {
            return Err(inconsistent(format!(
                "{} feature names for {} features",
                artifact.feature_names.len(),
                artifact.forest.n_features()
            )));
        }

        debug!(
            n_trees = artifact.forest.n_trees(),
            n_features = artifact.forest.n_features(),
            params = %artifact.params,
            "model artifact loaded"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exoura_rf::RandomForestConfig;
    use tempfile::TempDir;

    fn tiny_artifact() -> ModelArtifact {
        let features: Vec<Vec<f64>> = (0..8)
            .map(|i| vec![i as f64, 1.0, 2.0, 3.0, if i < 4 { 10.0 } else { 500.0 }])
            .collect();
        let labels: Vec<usize> = (0..8).map(|i| usize::from(i >= 4)).collect();
        let names: Vec<String> = exoura_io::FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        let forest = RandomForestConfig::new(5)
            .unwrap()
            .with_n_classes(2)
            .fit(&features, &labels, &names)
            .unwrap()
            .into_forest();
        let params = HyperParams {
            n_trees: 5,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        };
        ModelArtifact::new(forest, LabelMap::default(), params)
    }

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf_model.bin");
        let artifact = tiny_artifact();
        artifact.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.labels(), &LabelMap::default());
        assert_eq!(loaded.params(), artifact.params());
        assert_eq!(loaded.feature_names()[0], "koi_period");
        for sample in [[0.0, 1.0, 2.0, 3.0, 10.0], [7.0, 1.0, 2.0, 3.0, 500.0]] {
            assert_eq!(
                artifact.forest().predict_proba(&sample).unwrap(),
                loaded.forest().predict_proba(&sample).unwrap()
            );
        }
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rf_model.bin");
        std::fs::write(&path, b"stale").unwrap();
        tiny_artifact().save(&path).unwrap();

        assert!(ModelArtifact::load(&path).is_ok());
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn load_nonexistent_file_error() {
        let err = ModelArtifact::load("/tmp/nonexistent_exoura_model.bin").unwrap_err();
        assert!(matches!(err, ArtifactError::Read { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"\x01\x00\x00\x00 not a model").unwrap();
        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Decode { .. }));
    }

    #[test]
    fn load_wrong_version_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let mut bytes = bincode::serialize(&99u32).unwrap();
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, bytes).unwrap();
        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::IncompatibleVersion { expected: 1, found: 99, .. }
        ));
    }

    /// Save a forest edited through its serde form, then load it back.
    fn load_edited(edit: impl FnOnce(&mut serde_json::Value)) -> ArtifactError {
        let artifact = tiny_artifact();
        let mut value = serde_json::to_value(artifact.forest()).unwrap();
        edit(&mut value);
        let forest: RandomForest = serde_json::from_value(value).unwrap();
        let edited = ModelArtifact::new(forest, LabelMap::default(), artifact.params());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edited.bin");
        edited.save(&path).unwrap();
        ModelArtifact::load(&path).unwrap_err()
    }

    /// The first split node of any tree.
    fn first_split(forest: &mut serde_json::Value) -> &mut serde_json::Value {
        forest["trees"]
            .as_array_mut()
            .unwrap()
            .iter_mut()
            .flat_map(|tree| tree["nodes"].as_array_mut().unwrap().iter_mut())
            .find_map(|node| node.get_mut("Split"))
            .expect("some tree splits")
    }

    #[test]
    fn unedited_forest_survives_serde_edit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.bin");
        let artifact = tiny_artifact();
        let value = serde_json::to_value(artifact.forest()).unwrap();
        let forest: RandomForest = serde_json::from_value(value).unwrap();
        ModelArtifact::new(forest, LabelMap::default(), artifact.params())
            .save(&path)
            .unwrap();
        assert!(ModelArtifact::load(&path).is_ok());
    }

    #[test]
    fn forest_without_trees_rejected() {
        let err = load_edited(|f| f["trees"] = serde_json::json!([]));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[test]
    fn tree_without_nodes_rejected() {
        let err = load_edited(|f| f["trees"][0]["nodes"] = serde_json::json!([]));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[test]
    fn dangling_child_rejected() {
        let err = load_edited(|f| first_split(f)["right"] = serde_json::json!(999));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[test]
    fn backward_child_rejected() {
        let err = load_edited(|f| first_split(f)["left"] = serde_json::json!(0));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[test]
    fn unknown_split_feature_rejected() {
        let err = load_edited(|f| first_split(f)["feature"] = serde_json::json!(5));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }

    #[test]
    fn tree_class_count_mismatch_rejected() {
        let err = load_edited(|f| f["trees"][0]["n_classes"] = serde_json::json!(3));
        assert!(matches!(err, ArtifactError::Inconsistent { .. }), "{err}");
    }
}
