//! Bagged ensemble of CART trees trained in parallel.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted random forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Check shape and finiteness of a training set; returns the feature count.
pub(crate) fn validate_dataset(features: &[Vec<f64>], labels: &[usize]) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != features.len() {
        return Err(RfError::LabelCountMismatch {
            n_samples: features.len(),
            n_labels: labels.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Class count: the fixed value if given (labels must fit inside it),
/// otherwise the largest label plus one.
pub(crate) fn resolve_n_classes(fixed: Option<usize>, labels: &[usize]) -> Result<usize, RfError> {
    let observed = labels.iter().max().map_or(1, |&m| m + 1);
    match fixed {
        None => Ok(observed),
        Some(n_classes) => match labels.iter().position(|&l| l >= n_classes) {
            Some(sample_index) => Err(RfError::LabelOutOfRange {
                label: labels[sample_index],
                sample_index,
                n_classes,
            }),
            None => Ok(n_classes),
        },
    }
}

/// Train a forest: one bootstrap sample and one seeded tree per estimator.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_dataset(features, labels)?;
    let n_classes = resolve_n_classes(config.n_classes, labels)?;
    let max_features = config.max_features.resolve(n_features)?;
    let n_samples = features.len();

    let tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features))
        .with_n_classes(Some(n_classes));

    debug!(n_features, n_classes, max_features, "training random forest");

    let mut master = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master.r#gen()).collect();

    let trees = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (boot_features, boot_labels): (Vec<Vec<f64>>, Vec<usize>) = (0..n_samples)
                .map(|_| {
                    let i = rng.gen_range(0..n_samples);
                    (features[i].clone(), labels[i])
                })
                .unzip();
            tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit(&boot_features, &boot_labels)
        })
        .collect::<Result<Vec<DecisionTree>, RfError>>()?;

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let metadata = TrainingMetadata {
        n_trees: trees.len(),
        n_features,
        n_classes,
        n_samples,
        max_features_resolved: max_features,
    };
    debug!(n_trees = trees.len(), "random forest trained");

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };
    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::error::RfError;

    /// Two well separated classes on feature 0, noise on feature 1.
    fn binary_blobs() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..25 {
            features.push(vec![i as f64 * 0.1, (i % 5) as f64]);
            labels.push(0);
            features.push(vec![50.0 + i as f64 * 0.1, (i % 7) as f64]);
            labels.push(1);
        }
        (features, labels, vec!["a".into(), "b".into()])
    }

    #[test]
    fn separable_blobs_fit_well() {
        let (features, labels, names) = binary_blobs();
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let preds = result.forest().predict_batch(&features).unwrap();
        let correct = preds.iter().zip(&labels).filter(|(p, l)| p == l).count();
        assert_eq!(correct, labels.len());
        assert_eq!(result.metadata().n_classes, 2);
        assert_eq!(result.metadata().max_features_resolved, 2);
    }

    #[test]
    fn same_seed_same_forest() {
        let (features, labels, names) = binary_blobs();
        let fit = |seed| {
            RandomForestConfig::new(8)
                .unwrap()
                .with_seed(seed)
                .fit(&features, &labels, &names)
                .unwrap()
                .into_forest()
        };
        let (a, b) = (fit(5), fit(5));
        let samples = vec![vec![25.0, 1.0], vec![0.3, 4.0], vec![51.0, 0.0]];
        for sample in &samples {
            assert_eq!(
                a.predict_proba(sample).unwrap().as_slice(),
                b.predict_proba(sample).unwrap().as_slice()
            );
        }
    }

    #[test]
    fn importances_are_normalized_and_ranked() {
        let (features, labels, names) = binary_blobs();
        let result = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10);
        assert_eq!(result.importances()[0].name, "a");
        assert_eq!(result.importances()[0].rank, 1);
    }

    #[test]
    fn fixed_class_count_rejects_large_label() {
        let features = vec![vec![1.0], vec![2.0]];
        let err = RandomForestConfig::new(2)
            .unwrap()
            .with_n_classes(2)
            .fit(&features, &[0, 2], &["x".into()])
            .unwrap_err();
        assert!(matches!(err, RfError::LabelOutOfRange { label: 2, sample_index: 1, .. }));
    }

    #[test]
    fn label_length_must_match() {
        let features = vec![vec![1.0], vec![2.0]];
        let err = RandomForestConfig::new(2)
            .unwrap()
            .fit(&features, &[0], &["x".into()])
            .unwrap_err();
        assert!(matches!(err, RfError::LabelCountMismatch { n_samples: 2, n_labels: 1 }));
    }

    #[test]
    fn empty_input_rejected() {
        let err = RandomForestConfig::new(2).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }
}
