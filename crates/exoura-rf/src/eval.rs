//! Stratified k-fold cross-validation.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument, warn};

use crate::config::RandomForestConfig;
use crate::error::RfError;

/// Cross-validation settings.
///
/// Construct via [`CrossValidation::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Train/test sample indices for one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Samples the fold's model is fitted on.
    pub train: Vec<usize>,
    /// Held-out samples the fold's model is scored on.
    pub test: Vec<usize>,
}

/// Outcome of cross-validating one configuration.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// Accuracy on each held-out fold.
    pub fold_accuracies: Vec<f64>,
    /// Mean of `fold_accuracies`.
    pub mean_accuracy: f64,
    /// Population standard deviation of `fold_accuracies`.
    pub std_accuracy: f64,
}

impl CrossValidation {
    /// Create settings for `n_folds` folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the seed for the within-class shuffle.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Partition sample indices into stratified folds.
    ///
    /// Samples are grouped by class and shuffled within each class; the
    /// groups are then dealt round-robin across folds, continuing the deal
    /// from one class to the next so fold sizes differ by at most one. A
    /// class smaller than the fold count is allowed and only logged.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | no labels |
    /// | [`RfError::TooFewSamplesForFolds`] | fewer samples than folds |
    pub fn folds(&self, labels: &[usize]) -> Result<Vec<Fold>, RfError> {
        if labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if labels.len() < self.n_folds {
            return Err(RfError::TooFewSamplesForFolds {
                n_samples: labels.len(),
                n_folds: self.n_folds,
            });
        }

        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &label) in labels.iter().enumerate() {
            by_class[label].push(i);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut assignment = vec![0usize; labels.len()];
        let mut dealt = 0usize;
        for (class, members) in by_class.iter_mut().enumerate() {
            if !members.is_empty() && members.len() < self.n_folds {
                warn!(
                    class,
                    members = members.len(),
                    n_folds = self.n_folds,
                    "class has fewer members than folds"
                );
            }
            members.shuffle(&mut rng);
            for &idx in members.iter() {
                assignment[idx] = dealt % self.n_folds;
                dealt += 1;
            }
        }

        Ok((0..self.n_folds)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..labels.len()).partition(|&i| assignment[i] == fold);
                Fold { train, test }
            })
            .collect())
    }

    /// Fit a forest per fold and score it on the held-out samples.
    ///
    /// Fold `f` trains with seed `config.seed() + f`.
    ///
    /// # Errors
    ///
    /// Fold construction errors from [`CrossValidation::folds`] and any
    /// training error from the forest.
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<CrossValidationResult, RfError> {
        let n_classes = crate::forest::resolve_n_classes(config.n_classes, labels)?;
        let folds = self.folds(labels)?;
        let config = config.clone().with_n_classes(n_classes);
        score_folds(&config, &folds, features, labels, feature_names)
    }
}

/// Score `config` on precomputed folds, fitting the folds in parallel.
///
/// `config` must already carry its class count so every fold's forest
/// produces equally wide distributions.
pub(crate) fn score_folds(
    config: &RandomForestConfig,
    folds: &[Fold],
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<CrossValidationResult, RfError> {
    let fold_accuracies = (0..folds.len())
        .into_par_iter()
        .map(|f| {
            let fold_config = config.clone().with_seed(fold_seed(config, f));
            let (predicted, truth) =
                fit_and_predict(&fold_config, &folds[f], features, labels, feature_names)?;
            let fold_accuracy = accuracy(&truth, &predicted);
            debug!(fold = f, accuracy = fold_accuracy, "fold scored");
            Ok(fold_accuracy)
        })
        .collect::<Result<Vec<f64>, RfError>>()?;

    let (mean_accuracy, std_accuracy) = mean_and_std(&fold_accuracies);
    Ok(CrossValidationResult {
        fold_accuracies,
        mean_accuracy,
        std_accuracy,
    })
}

/// Seed used for the model of fold `fold`.
fn fold_seed(config: &RandomForestConfig, fold: usize) -> u64 {
    config.seed.wrapping_add(fold as u64)
}

/// Fit on the fold's training rows; return (predictions, truth) on its test rows.
fn fit_and_predict(
    config: &RandomForestConfig,
    fold: &Fold,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<(Vec<usize>, Vec<usize>), RfError> {
    let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        idx.iter().map(|&i| (features[i].clone(), labels[i])).unzip()
    };
    let (train_x, train_y) = gather(&fold.train);
    let (test_x, test_y) = gather(&fold.test);
    let forest = config.fit(&train_x, &train_y, feature_names)?.into_forest();
    Ok((forest.predict_batch(&test_x)?, test_y))
}

/// Share of positions where the two label slices agree.
fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    fn blobs(n_per_class: usize) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            features.push(vec![i as f64 * 0.1, 1.0]);
            labels.push(0);
            features.push(vec![20.0 + i as f64 * 0.1, 1.0]);
            labels.push(1);
        }
        (features, labels, vec!["x".into(), "y".into()])
    }

    #[test]
    fn folds_partition_every_sample_once() {
        let labels: Vec<usize> = (0..11).map(|i| usize::from(i % 3 == 0)).collect();
        let folds = CrossValidation::new(3).unwrap().folds(&labels).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..11).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 11);
            assert!((3..=4).contains(&fold.test.len()));
        }
    }

    #[test]
    fn folds_are_stratified() {
        let labels: Vec<usize> = (0..30).map(|i| usize::from(i < 12)).collect();
        let folds = CrossValidation::new(3).unwrap().folds(&labels).unwrap();
        for fold in &folds {
            let positives = fold.test.iter().filter(|&&i| labels[i] == 1).count();
            assert_eq!(positives, 4);
        }
    }

    #[test]
    fn tiny_class_is_tolerated() {
        let labels = vec![0, 0, 0, 0, 1];
        let folds = CrossValidation::new(3).unwrap().folds(&labels).unwrap();
        assert_eq!(folds.len(), 3);
        assert!(folds.iter().all(|f| !f.test.is_empty()));
    }

    #[test]
    fn more_folds_than_samples_rejected() {
        let err = CrossValidation::new(3).unwrap().folds(&[0, 1]).unwrap_err();
        assert!(matches!(err, RfError::TooFewSamplesForFolds { n_samples: 2, n_folds: 3 }));
    }

    #[test]
    fn invalid_fold_count() {
        assert!(CrossValidation::new(1).is_err());
    }

    #[test]
    fn separable_data_scores_high() {
        let (features, labels, names) = blobs(15);
        let config = RandomForestConfig::new(15)
            .unwrap()
            .with_max_features(MaxFeatures::All);
        let result = CrossValidation::new(3)
            .unwrap()
            .evaluate(&config, &features, &labels, &names)
            .unwrap();
        assert_eq!(result.fold_accuracies.len(), 3);
        assert!(result.mean_accuracy > 0.9, "mean = {}", result.mean_accuracy);
        let (mean, _) = mean_and_std(&result.fold_accuracies);
        assert!((mean - result.mean_accuracy).abs() < 1e-12);
    }

    #[test]
    fn mean_and_std_of_constant_values() {
        let (mean, std) = mean_and_std(&[0.5, 0.5, 0.5]);
        assert!((mean - 0.5).abs() < 1e-12);
        assert!(std.abs() < 1e-12);
    }
}
