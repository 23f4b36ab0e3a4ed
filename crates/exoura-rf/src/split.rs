//! Split criteria and exact best-split search.

use rand::Rng;

use crate::node::Impurity;

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: `1 - Σ p_i²`.
    Gini,
    /// Shannon entropy in nats: `-Σ p_i ln p_i`.
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node with the given per-class counts.
    ///
    /// An empty node is treated as pure.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let total = n_samples as f64;
        let proportions = class_counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| c as f64 / total);
        let value = match self {
            SplitCriterion::Gini => 1.0 - proportions.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -proportions.map(|p| p * p.ln()).sum::<f64>(),
        };
        Impurity::new(value)
    }
}

/// The winning split at a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: usize,
    pub(crate) threshold: f64,
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Search for the best threshold over a random subset of `max_features` columns.
///
/// `columns` is column-major (`columns[feature][sample]`). For each drawn
/// feature the node's samples are sorted by value and scanned once, moving
/// one sample at a time from the right child counts to the left child
/// counts. Candidate thresholds sit midway between distinct adjacent values
/// and must leave at least `min_samples_leaf` samples on each side. When the
/// midpoint rounds onto the upper value or overflows, the lower value is the
/// threshold instead.
///
/// Returns `None` when no admissible threshold exists.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    columns: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = columns.len();
    let n_samples = sample_indices.len();
    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent_counts = vec![0usize; n_classes];
    for &si in sample_indices {
        parent_counts[labels[si]] += 1;
    }
    let parent_weighted = n_samples as f64 * criterion.impurity(&parent_counts, n_samples).value();

    // Partial Fisher-Yates over the feature order.
    let draw = max_features.min(n_features);
    let mut order: Vec<usize> = (0..n_features).collect();
    for i in 0..draw {
        let j = rng.gen_range(i..n_features);
        order.swap(i, j);
    }

    let mut best: Option<(usize, f64, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

    for &feature in &order[..draw] {
        let column = &columns[feature];
        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (column[si], labels[si])));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = vec![0usize; n_classes];
        let mut right = parent_counts.clone();

        for pos in 0..n_samples - 1 {
            let (value, class) = sorted[pos];
            left[class] += 1;
            right[class] -= 1;

            let next = sorted[pos + 1].0;
            if value == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let decrease = parent_weighted
                - n_left as f64 * criterion.impurity(&left, n_left).value()
                - n_right as f64 * criterion.impurity(&right, n_right).value();

            if best.is_none_or(|(_, _, d)| decrease > d) {
                best = Some((feature, threshold_between(value, next), decrease));
            }
        }
    }

    let (feature, threshold, impurity_decrease) = best?;
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| columns[feature][si] <= threshold);
    if left_indices.len() < min_samples_leaf.max(1) || right_indices.len() < min_samples_leaf.max(1)
    {
        return None;
    }

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease,
        left_indices,
        right_indices,
    })
}

/// A threshold `t` with `lower <= t < upper`, for `lower < upper`.
fn threshold_between(lower: f64, upper: f64) -> f64 {
    let mid = lower / 2.0 + upper / 2.0;
    if lower <= mid && mid < upper { mid } else { lower }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn gini_of_balanced_binary_node() {
        let imp = SplitCriterion::Gini.impurity(&[4, 4], 8);
        assert!((imp.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_balanced_binary_node() {
        let imp = SplitCriterion::Entropy.impurity(&[3, 3], 6);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn single_class_node_is_pure() {
        assert!(SplitCriterion::Gini.impurity(&[0, 7], 7).is_pure());
        assert!(SplitCriterion::Entropy.impurity(&[7, 0], 7).is_pure());
    }

    #[test]
    fn threshold_lands_between_clusters() {
        let columns = vec![vec![0.5, 1.0, 1.5, 40.0, 41.0, 42.0]];
        let labels = vec![1, 1, 1, 0, 0, 0];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let split = find_best_split(
            &columns, &labels, &indices, 2, SplitCriterion::Gini, 1, 1, &mut rng,
        )
        .expect("separable column must split");

        assert_eq!(split.feature, 0);
        assert!((split.threshold - 20.75).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        // Parent gini 0.5 over 6 samples, both children pure.
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_has_no_split() {
        let columns = vec![vec![2.0; 4]];
        let labels = vec![0, 1, 0, 1];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(
            find_best_split(&columns, &labels, &indices, 2, SplitCriterion::Gini, 1, 1, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn leaf_minimum_blocks_tiny_children() {
        let columns = vec![vec![1.0, 2.0, 3.0]];
        let labels = vec![0, 1, 1];
        let indices: Vec<usize> = (0..3).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(
            find_best_split(&columns, &labels, &indices, 2, SplitCriterion::Gini, 1, 2, &mut rng)
                .is_none()
        );
    }

    #[test]
    fn adjacent_floats_still_separate() {
        let lower = 1.0000000000000002_f64;
        let upper = f64::from_bits(lower.to_bits() + 1);
        let columns = vec![vec![lower, upper]];
        let labels = vec![0, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let split = find_best_split(
            &columns, &labels, &[0, 1], 2, SplitCriterion::Gini, 1, 1, &mut rng,
        )
        .expect("distinct values must split");
        assert!(split.threshold >= lower && split.threshold < upper);
        assert_eq!(split.left_indices, vec![0]);
        assert_eq!(split.right_indices, vec![1]);
    }

    #[test]
    fn huge_values_do_not_overflow_threshold() {
        let columns = vec![vec![1.0e308, 1.7e308, -1.7e308, -1.0e308]];
        let labels = vec![0, 1, 0, 0];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let split = find_best_split(
            &columns, &labels, &indices, 2, SplitCriterion::Gini, 1, 1, &mut rng,
        )
        .expect("distinct values must split");
        assert!(split.threshold.is_finite());
        assert_eq!(split.right_indices, vec![1]);
        assert_eq!(split.left_indices, vec![0, 2, 3]);
    }

    #[test]
    fn threshold_stays_in_lower_closed_interval() {
        let lower = 1.0000000000000002_f64;
        let pairs = [
            (1.0, 3.0),
            (lower, f64::from_bits(lower.to_bits() + 1)),
            (1.0e308, f64::MAX),
            (-f64::MAX, -1.0e308),
            (0.0, f64::from_bits(1)),
        ];
        for (lo, hi) in pairs {
            let t = threshold_between(lo, hi);
            assert!(lo <= t && t < hi, "{lo} {hi} -> {t}");
        }
        assert_eq!(threshold_between(1.0, 3.0), 2.0);
    }
}
