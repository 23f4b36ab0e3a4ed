//! Exhaustive hyperparameter grid search scored by cross-validated accuracy.

use std::fmt;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::error::RfError;
use crate::eval::{CrossValidation, score_folds};
use crate::result::RandomForestResult;

/// One point of the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HyperParams {
    /// Trees in the ensemble.
    pub n_trees: usize,
    /// Depth limit; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Minimum samples to split a node.
    pub min_samples_split: usize,
    /// Minimum samples per leaf.
    pub min_samples_leaf: usize,
}

impl HyperParams {
    /// Overlay these parameters on a base configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn apply(&self, base: &RandomForestConfig) -> Result<RandomForestConfig, RfError> {
        Ok(base
            .clone()
            .with_n_trees(self.n_trees)?
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf))
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "none".to_string(), |d| d.to_string());
        write!(
            f,
            "max_depth={depth} min_samples_leaf={} min_samples_split={} n_trees={}",
            self.min_samples_leaf, self.min_samples_split, self.n_trees
        )
    }
}

/// The values searched along each hyperparameter axis.
///
/// The default grid is trees {100, 200} × depth {unbounded, 10, 20} ×
/// split {2, 5} × leaf {1, 2}: 24 candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    /// Tree counts.
    pub n_trees: Vec<usize>,
    /// Depth limits.
    pub max_depth: Vec<Option<usize>>,
    /// Split minimums.
    pub min_samples_split: Vec<usize>,
    /// Leaf minimums.
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![100, 200],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5],
            min_samples_leaf: vec![1, 2],
        }
    }
}

impl ParamGrid {
    /// Enumerate every combination.
    ///
    /// Axes are nested in lexical name order (`max_depth`,
    /// `min_samples_leaf`, `min_samples_split`, `n_trees`) with the last
    /// varying fastest. This order decides ties during selection.
    #[must_use]
    pub fn candidates(&self) -> Vec<HyperParams> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &min_samples_split in &self.min_samples_split {
                    for &n_trees in &self.n_trees {
                        out.push(HyperParams {
                            n_trees,
                            max_depth,
                            min_samples_split,
                            min_samples_leaf,
                        });
                    }
                }
            }
        }
        out
    }

    /// Number of combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_trees.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
    }

    /// True when some axis has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validation summary for one candidate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateScore {
    /// The candidate's parameters.
    pub params: HyperParams,
    /// Held-out accuracy per fold.
    pub fold_accuracies: Vec<f64>,
    /// Mean fold accuracy (the selection score).
    pub mean_accuracy: f64,
    /// Standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// 1 + number of candidates with a strictly higher mean.
    pub rank: usize,
}

/// Grid search settings.
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    cv: CrossValidation,
    base: RandomForestConfig,
}

/// Outcome of a grid search, including the winner refit on all samples.
#[derive(Debug)]
pub struct GridSearchResult {
    /// Every candidate in enumeration order.
    pub candidates: Vec<CandidateScore>,
    /// Index of the winner in `candidates`.
    pub best_index: usize,
    /// Winner refit on the full search set.
    pub best_model: RandomForestResult,
}

impl GridSearchResult {
    /// Parameters of the winning candidate.
    #[must_use]
    pub fn best_params(&self) -> HyperParams {
        self.candidates[self.best_index].params
    }

    /// Mean cross-validated accuracy of the winning candidate.
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.candidates[self.best_index].mean_accuracy
    }
}

impl GridSearch {
    /// Create a search over `grid` scored with `cv`.
    ///
    /// Parameters not on the grid come from `base` (criterion, feature
    /// sampling, class count, seed).
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyGrid`] when the grid has no candidates.
    pub fn new(
        grid: ParamGrid,
        cv: CrossValidation,
        base: RandomForestConfig,
    ) -> Result<Self, RfError> {
        if grid.is_empty() {
            return Err(RfError::EmptyGrid);
        }
        Ok(Self { grid, cv, base })
    }

    /// Return the searched grid.
    #[must_use]
    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Score every candidate on every fold, pick the best mean accuracy
    /// (first in enumeration order on ties), and refit it on all samples.
    ///
    /// All candidates share one fold partition and are scored exactly as
    /// [`CrossValidation::evaluate`] scores a single configuration. Candidates
    /// and their folds run in parallel; results are gathered in enumeration
    /// order so the outcome does not depend on scheduling.
    ///
    /// # Errors
    ///
    /// Fold construction and training errors from the underlying forest.
    #[instrument(
        skip_all,
        fields(
            n_candidates = self.grid.len(),
            n_folds = self.cv.n_folds(),
            n_samples = features.len()
        )
    )]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<GridSearchResult, RfError> {
        let n_classes = crate::forest::resolve_n_classes(self.base.n_classes, labels)?;
        let base = self.base.clone().with_n_classes(n_classes);
        let folds = self.cv.folds(labels)?;
        let params = self.grid.candidates();
        let configs = params
            .iter()
            .map(|p| p.apply(&base))
            .collect::<Result<Vec<_>, _>>()?;

        info!(n_fits = configs.len() * folds.len(), "grid search started");

        let results = configs
            .par_iter()
            .map(|config| score_folds(config, &folds, features, labels, feature_names))
            .collect::<Result<Vec<_>, RfError>>()?;

        let mut candidates: Vec<CandidateScore> = params
            .into_iter()
            .zip(results)
            .map(|(params, cv)| CandidateScore {
                params,
                fold_accuracies: cv.fold_accuracies,
                mean_accuracy: cv.mean_accuracy,
                std_accuracy: cv.std_accuracy,
                rank: 0,
            })
            .collect();

        let means: Vec<f64> = candidates.iter().map(|c| c.mean_accuracy).collect();
        for candidate in &mut candidates {
            candidate.rank = 1 + means.iter().filter(|&&m| m > candidate.mean_accuracy).count();
            debug!(params = %candidate.params, mean = candidate.mean_accuracy, "candidate scored");
        }
        let best_index = candidates.iter().position(|c| c.rank == 1).unwrap_or(0);
        let best = &candidates[best_index];
        info!(
            best = %best.params,
            mean_accuracy = best.mean_accuracy,
            "grid search selected candidate"
        );

        let best_model = configs[best_index].fit(features, labels, feature_names)?;
        Ok(GridSearchResult {
            candidates,
            best_index,
            best_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_24_candidates_in_lexical_order() {
        let grid = ParamGrid::default();
        let candidates = grid.candidates();
        assert_eq!(grid.len(), 24);
        assert_eq!(candidates.len(), 24);
        assert_eq!(
            candidates[0],
            HyperParams { n_trees: 100, max_depth: None, min_samples_split: 2, min_samples_leaf: 1 }
        );
        // n_trees varies fastest, then min_samples_split.
        assert_eq!(candidates[1].n_trees, 200);
        assert_eq!(candidates[2].min_samples_split, 5);
        assert_eq!(candidates[4].min_samples_leaf, 2);
        assert_eq!(candidates[8].max_depth, Some(10));
        assert_eq!(candidates[23].max_depth, Some(20));
    }

    #[test]
    fn empty_axis_rejected() {
        let grid = ParamGrid { n_trees: vec![], ..ParamGrid::default() };
        let err = GridSearch::new(
            grid,
            CrossValidation::new(3).unwrap(),
            RandomForestConfig::new(1).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, RfError::EmptyGrid));
    }

    #[test]
    fn display_names_every_axis() {
        let p = HyperParams {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 5,
            min_samples_leaf: 2,
        };
        assert_eq!(
            p.to_string(),
            "max_depth=none min_samples_leaf=2 min_samples_split=5 n_trees=100"
        );
    }

    #[test]
    fn ties_go_to_first_candidate() {
        // Perfectly separable: every candidate scores 1.0.
        let features: Vec<Vec<f64>> = (0..12)
            .map(|i| vec![if i < 6 { i as f64 } else { 100.0 + i as f64 }])
            .collect();
        let labels: Vec<usize> = (0..12).map(|i| usize::from(i >= 6)).collect();
        let grid = ParamGrid {
            n_trees: vec![3, 5],
            max_depth: vec![None, Some(2)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let search = GridSearch::new(
            grid,
            CrossValidation::new(3).unwrap(),
            RandomForestConfig::new(1).unwrap(),
        )
        .unwrap();
        let result = search.fit(&features, &labels, &["x".into()]).unwrap();

        assert_eq!(result.candidates.len(), 4);
        assert!(result.candidates.iter().all(|c| c.fold_accuracies.len() == 3));
        assert!(result.candidates.iter().all(|c| c.rank == 1));
        assert_eq!(result.best_index, 0);
        assert_eq!(result.best_params().n_trees, 3);
        assert!((result.best_score() - 1.0).abs() < 1e-12);
        assert_eq!(result.best_model.forest().n_trees(), 3);
    }

    #[test]
    fn candidate_scores_match_single_cross_validation() {
        let features: Vec<Vec<f64>> = (0..18)
            .map(|i| vec![f64::from(i % 9), f64::from(i * 7 % 5)])
            .collect();
        let labels: Vec<usize> = (0..18).map(|i| usize::from(i % 9 >= 4)).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        let grid = ParamGrid {
            n_trees: vec![4],
            max_depth: vec![None, Some(1)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
        };
        let cv = CrossValidation::new(3).unwrap().with_seed(9);
        let base = RandomForestConfig::new(1).unwrap().with_seed(5);
        let result = GridSearch::new(grid.clone(), cv.clone(), base.clone())
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();

        for (candidate, params) in result.candidates.iter().zip(grid.candidates()) {
            let single = cv
                .evaluate(&params.apply(&base).unwrap(), &features, &labels, &names)
                .unwrap();
            assert_eq!(candidate.fold_accuracies, single.fold_accuracies);
        }
    }
}
