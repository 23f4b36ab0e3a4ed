//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::RfError;

/// Square count matrix: `counts[true_class][predicted_class]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

/// Precision, recall, F1, and support for one class.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    /// Class index.
    pub class: usize,
    /// TP / (TP + FP); 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 when the class never occurs.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are 0.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

/// Precision, recall, and F1 averaged over classes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AveragedMetrics {
    /// Averaged precision.
    pub precision: f64,
    /// Averaged recall.
    pub recall: f64,
    /// Averaged F1.
    pub f1: f64,
}

impl ConfusionMatrix {
    /// Tally true against predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | no labels |
    /// | [`RfError::LabelCountMismatch`] | slices differ in length |
    /// | [`RfError::LabelOutOfRange`] | a label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut counts = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(label) = [t, p].into_iter().find(|&l| l >= n_classes) {
                return Err(RfError::LabelOutOfRange {
                    label,
                    sample_index,
                    n_classes,
                });
            }
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    /// Fraction of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..self.n_classes()).map(|c| self.counts[c][c]).sum();
        correct as f64 / total as f64
    }

    /// Per-class metrics in class-index order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        (0..self.n_classes())
            .map(|c| {
                let tp = self.counts[c][c];
                let predicted: usize = self.counts.iter().map(|row| row[c]).sum();
                let support: usize = self.counts[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Unweighted mean over classes.
    #[must_use]
    pub fn macro_average(&self) -> AveragedMetrics {
        let metrics = self.class_metrics();
        let n = metrics.len().max(1) as f64;
        AveragedMetrics {
            precision: metrics.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: metrics.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: metrics.iter().map(|m| m.f1).sum::<f64>() / n,
        }
    }

    /// Mean over classes weighted by support.
    #[must_use]
    pub fn weighted_average(&self) -> AveragedMetrics {
        let metrics = self.class_metrics();
        let total = self.total().max(1) as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            metrics.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total
        };
        AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
        }
    }

    /// Matrix rows, one per true class.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Number of tallied samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes() {
            write!(f, " pred_{j:<3}")?;
        }
        writeln!(f)?;
        for (i, row) in self.counts.iter().enumerate() {
            write!(f, "true_{i:<3}")?;
            for count in row {
                write!(f, " {count:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
