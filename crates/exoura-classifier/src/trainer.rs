//! Training pipeline: load, split, grid search, evaluate, persist.

use std::fmt;
use std::path::Path;

use exoura_io::{DataError, KoiDataset, KoiReader};
use exoura_rf::{
    CandidateScore, ConfusionMatrix, CrossValidation, GridSearch, HyperParams, ParamGrid,
    RandomForestConfig, RankedFeature,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::artifact::ModelArtifact;
use crate::error::ClassifierError;
use crate::label::{Label, LabelMap};

/// Trainer settings.
///
/// Construct via [`TrainerConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter       | Default                |
/// |-----------------|------------------------|
/// | `test_fraction` | 0.2                    |
/// | `cv_folds`      | 3                      |
/// | `seed`          | 42                     |
/// | `grid`          | 24-point default grid  |
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    test_fraction: f64,
    cv_folds: usize,
    seed: u64,
    grid: ParamGrid,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 3,
            seed: 42,
            grid: ParamGrid::default(),
        }
    }
}

impl TrainerConfig {
    /// Create a config with the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the held-out fraction. A fraction that leaves either side of the
    /// split empty fails at training time with [`DataError::SplitTooSmall`].
    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Set the number of cross-validation folds.
    #[must_use]
    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    /// Seed for the split, the fold shuffle, and the forests.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the searched grid.
    #[must_use]
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Return the held-out fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Return the fold count.
    #[must_use]
    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the grid.
    #[must_use]
    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }
}

/// Row counts through cleaning and splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RowCounts {
    /// Data rows in the file.
    pub read: usize,
    /// Rows dropped for nulls.
    pub dropped: usize,
    /// Rows kept.
    pub used: usize,
    /// Training rows.
    pub train: usize,
    /// Held-out rows.
    pub test: usize,
}

/// One line of a classification report.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LabelMetrics {
    /// Class label.
    pub label: Label,
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1 score.
    pub f1: f64,
    /// True samples of this class in the test set.
    pub support: usize,
}

/// Averaged metrics line of a classification report.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AverageMetrics {
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1 score.
    pub f1: f64,
    /// Total test samples.
    pub support: usize,
}

/// Held-out precision/recall/F1 per label plus averages.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationReport {
    /// One entry per label, in class-index order.
    pub classes: Vec<LabelMetrics>,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Unweighted mean over labels.
    pub macro_avg: AverageMetrics,
    /// Support-weighted mean over labels.
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    fn from_confusion(cm: &ConfusionMatrix, labels: &LabelMap) -> Self {
        let support = cm.total();
        let classes = cm
            .class_metrics()
            .into_iter()
            .filter_map(|m| {
                labels.label(m.class).map(|label| LabelMetrics {
                    label,
                    precision: m.precision,
                    recall: m.recall,
                    f1: m.f1,
                    support: m.support,
                })
            })
            .collect();
        let average = |a: exoura_rf::AveragedMetrics| AverageMetrics {
            precision: a.precision,
            recall: a.recall,
            f1: a.f1,
            support,
        };
        Self {
            classes,
            accuracy: cm.accuracy(),
            macro_avg: average(cm.macro_average()),
            weighted_avg: average(cm.weighted_average()),
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>20} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>20} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>20} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>20} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

/// Everything learned during one training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingReport {
    /// Row counts through cleaning and splitting.
    pub rows: RowCounts,
    /// Seed used for split, folds, and forests.
    pub seed: u64,
    /// Cross-validation folds per candidate.
    pub cv_folds: usize,
    /// Every grid candidate in enumeration order.
    pub candidates: Vec<CandidateScore>,
    /// The winning candidate.
    pub best_params: HyperParams,
    /// Mean CV accuracy of the winner.
    pub best_cv_accuracy: f64,
    /// Accuracy of the refit winner on the held-out rows.
    pub test_accuracy: f64,
    /// Per-label held-out metrics.
    pub classification_report: ClassificationReport,
    /// Held-out confusion matrix, rows are true classes.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Refit forest's impurity importances, most important first.
    pub feature_importances: Vec<RankedFeature>,
}

/// The persisted artifact together with its report.
#[derive(Debug)]
pub struct TrainingOutcome {
    /// The artifact that was written.
    pub artifact: ModelArtifact,
    /// Metrics of the run.
    pub report: TrainingReport,
}

/// Runs the training pipeline.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

/// Row indices of a train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Split {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Trainer {
    /// Create a trainer.
    #[must_use]
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Return the configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train on the KOI CSV at `dataset` and write the artifact to `artifact_path`.
    ///
    /// Every data check runs before the first fit; nothing is written unless
    /// training succeeds.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::Data`] for unreadable, malformed, or degenerate
    /// data; [`ClassifierError::Model`] for training failures;
    /// [`ClassifierError::Artifact`] if the artifact cannot be written.
    #[instrument(
        skip_all,
        fields(dataset = %dataset.display(), artifact = %artifact_path.display())
    )]
    pub fn train(
        &self,
        dataset: &Path,
        artifact_path: &Path,
    ) -> Result<TrainingOutcome, ClassifierError> {
        let data = KoiReader::new(dataset).read_labeled()?;
        let outcome = self.fit(&data)?;
        outcome.artifact.save(artifact_path)?;
        info!(
            test_accuracy = outcome.report.test_accuracy,
            best = %outcome.report.best_params,
            "training complete"
        );
        Ok(outcome)
    }

    /// Train on an already loaded dataset without persisting anything.
    ///
    /// # Errors
    ///
    /// As [`Trainer::train`], minus artifact errors.
    #[instrument(skip_all, fields(n_rows = data.len()))]
    pub fn fit(&self, data: &KoiDataset) -> Result<TrainingOutcome, ClassifierError> {
        let features = data.features();
        let labels = data.labels();
        let names = data.feature_names();
        let label_map = LabelMap::default();

        let split = self.split(&labels)?;
        let (train_x, train_y) = gather(&features, &labels, &split.train);
        let (test_x, test_y) = gather(&features, &labels, &split.test);
        self.check_training_subset(&train_y, &label_map)?;
        let rows = RowCounts {
            read: data.rows_read(),
            dropped: data.rows_dropped(),
            used: data.len(),
            train: train_y.len(),
            test: test_y.len(),
        };
        info!(train = rows.train, test = rows.test, "split dataset");

        let base = RandomForestConfig::new(1)?
            .with_n_classes(label_map.len())
            .with_seed(self.config.seed);
        let cv = CrossValidation::new(self.config.cv_folds)?.with_seed(self.config.seed);
        let search =
            GridSearch::new(self.config.grid.clone(), cv, base)?.fit(&train_x, &train_y, &names)?;
        let best_params = search.best_params();
        let best_cv_accuracy = search.best_score();
        info!(best = %best_params, mean_cv_accuracy = best_cv_accuracy, "grid search complete");

        let forest_result = search.best_model;
        let predicted = forest_result.forest().predict_batch(&test_x)?;
        let cm = ConfusionMatrix::from_labels(&test_y, &predicted, label_map.len())?;
        let classification_report = ClassificationReport::from_confusion(&cm, &label_map);
        info!(test_accuracy = cm.accuracy(), "held-out evaluation complete");

        let report = TrainingReport {
            rows,
            seed: self.config.seed,
            cv_folds: self.config.cv_folds,
            candidates: search.candidates,
            best_params,
            best_cv_accuracy,
            test_accuracy: cm.accuracy(),
            classification_report,
            confusion_matrix: cm.as_rows().to_vec(),
            feature_importances: forest_result.importances().to_vec(),
        };
        let artifact = ModelArtifact::new(forest_result.into_forest(), label_map, best_params);
        Ok(TrainingOutcome { artifact, report })
    }

    /// Seeded shuffle; the first `ceil(n * test_fraction)` rows are held out.
    fn split(&self, labels: &[usize]) -> Result<Split, DataError> {
        let n_rows = labels.len();
        let fraction = self.config.test_fraction;
        let n_test = if fraction.is_finite() && fraction > 0.0 {
            ((n_rows as f64) * fraction).ceil() as usize
        } else {
            0
        };
        let n_train = n_rows.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(DataError::SplitTooSmall {
                n_rows,
                n_train,
                n_test,
            });
        }

        let mut order: Vec<usize> = (0..n_rows).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(self.config.seed));
        let train = order.split_off(n_test);
        Ok(Split { train, test: order })
    }

    fn check_training_subset(&self, train_y: &[usize], labels: &LabelMap) -> Result<(), DataError> {
        let n_train = train_y.len();
        if n_train < self.config.cv_folds {
            return Err(DataError::TooFewRowsForFolds {
                n_train,
                n_folds: self.config.cv_folds,
            });
        }
        let first = train_y[0];
        if train_y.iter().all(|&y| y == first) {
            return Err(DataError::TrainingSetSingleClass {
                n_train,
                label: labels.label(first).map_or_else(String::new, |l| l.to_string()),
            });
        }
        Ok(())
    }
}

fn gather(features: &[Vec<f64>], labels: &[usize], idx: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
    idx.iter().map(|&i| (features[i].clone(), labels[i])).unzip()
}
