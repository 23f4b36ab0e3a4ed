//! One-shot form front end: five fields, a submission gate, a proportion chart.

use std::fmt;

use crate::error::ClassifierError;
use crate::features::{FeatureKind, FeatureVector};
use crate::label::Label;
use crate::predictor::{Predictor, Prediction};

/// Angle of the first wedge's leading edge, degrees counter-clockwise from east.
pub const START_ANGLE_DEG: f64 = 90.0;

/// One slice of the probability chart.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Wedge {
    /// The label the slice stands for.
    pub label: Label,
    /// Share of the whole, in `[0, 1]`.
    pub fraction: f64,
    /// Share formatted as `%1.1f%%`, e.g. `"72.0%"`.
    pub text: String,
}

/// Two-wedge chart of the class probabilities.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProportionChart {
    /// Wedges in class-index order, drawn from [`START_ANGLE_DEG`].
    pub wedges: Vec<Wedge>,
}

impl ProportionChart {
    /// Build a chart from a prediction's probabilities.
    #[must_use]
    pub fn from_prediction(prediction: &Prediction) -> Self {
        let wedges = [Label::NotFalsePositive, Label::FalsePositive]
            .into_iter()
            .map(|label| {
                let fraction = prediction.probabilities.of(label);
                Wedge {
                    label,
                    fraction,
                    text: format!("{:.1}%", fraction * 100.0),
                }
            })
            .collect();
        Self { wedges }
    }
}

impl fmt::Display for ProportionChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const WIDTH: f64 = 40.0;
        for wedge in &self.wedges {
            let bar = "#".repeat((wedge.fraction * WIDTH).round() as usize);
            writeln!(f, "{:>20} {:>6} {bar}", wedge.label, wedge.text)?;
        }
        Ok(())
    }
}

/// What the form shows after a rerun.
#[derive(Debug, Clone, PartialEq)]
pub enum FormView {
    /// Every field still holds its default; nothing is classified.
    NotSubmitted,
    /// A prediction with its chart.
    Result {
        /// The prediction.
        prediction: Prediction,
        /// Chart of its probabilities.
        chart: ProportionChart,
    },
}

/// Five numeric fields defaulting to 0.0.
///
/// Each change reruns the form. A rerun classifies only when some field
/// differs from its default.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: FeatureVector,
    renders: usize,
}

impl FormState {
    /// A form with every field at 0.0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A form prefilled with `values`.
    #[must_use]
    pub fn with_values(values: FeatureVector) -> Self {
        Self { values, renders: 0 }
    }

    /// Current field values.
    #[must_use]
    pub fn values(&self) -> &FeatureVector {
        &self.values
    }

    /// How many predictions have been rendered.
    #[must_use]
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Change one field and rerun.
    ///
    /// # Errors
    ///
    /// [`ClassifierError::Input`] for a non-finite value (the field keeps
    /// its old value), or any prediction error.
    pub fn set(
        &mut self,
        kind: FeatureKind,
        value: f64,
        predictor: &Predictor,
    ) -> Result<FormView, ClassifierError> {
        let mut values = [0.0; 5];
        values.copy_from_slice(self.values.as_slice());
        values[kind.index()] = value;
        self.values = FeatureVector::from_values(&values)?;
        self.rerun(predictor)
    }

    /// Render the form for its current values.
    ///
    /// # Errors
    ///
    /// Any prediction error.
    pub fn rerun(&mut self, predictor: &Predictor) -> Result<FormView, ClassifierError> {
        if self.values.is_default() {
            return Ok(FormView::NotSubmitted);
        }
        let prediction = predictor.predict_proba(&self.values)?;
        self.renders += 1;
        Ok(FormView::Result {
            chart: ProportionChart::from_prediction(&prediction),
            prediction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ClassProbabilities;
    use crate::predictor::tests::toy_predictor;

    #[test]
    fn all_defaults_withhold_prediction() {
        let predictor = toy_predictor();
        let mut form = FormState::new();
        assert_eq!(form.rerun(&predictor).unwrap(), FormView::NotSubmitted);
        assert_eq!(form.renders(), 0);
    }

    #[test]
    fn one_change_one_render() {
        let predictor = toy_predictor();
        let mut form = FormState::new();
        form.rerun(&predictor).unwrap();
        let view = form.set(FeatureKind::TransitDepth, 9000.0, &predictor).unwrap();
        assert_eq!(form.renders(), 1);
        let FormView::Result { prediction, chart } = view else {
            panic!("expected a result");
        };
        assert_eq!(chart.wedges.len(), 2);
        assert_eq!(chart.wedges[0].label, Label::NotFalsePositive);
        let total: f64 = chart.wedges.iter().map(|w| w.fraction).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(chart.wedges[1].fraction, prediction.probabilities.false_positive);
    }

    #[test]
    fn setting_back_to_default_withholds_again() {
        let predictor = toy_predictor();
        let mut form = FormState::new();
        form.set(FeatureKind::ModelSnr, 12.0, &predictor).unwrap();
        let view = form.set(FeatureKind::ModelSnr, 0.0, &predictor).unwrap();
        assert_eq!(view, FormView::NotSubmitted);
        assert_eq!(form.renders(), 1);
    }

    #[test]
    fn non_finite_field_rejected_and_kept() {
        let predictor = toy_predictor();
        let mut form = FormState::new();
        assert!(form.set(FeatureKind::PlanetRadius, f64::INFINITY, &predictor).is_err());
        assert!(form.values().is_default());
        assert_eq!(form.renders(), 0);
    }

    #[test]
    fn wedge_text_uses_one_decimal() {
        let prediction = Prediction {
            label: Label::FalsePositive,
            probabilities: ClassProbabilities { not_false_positive: 0.28, false_positive: 0.72 },
        };
        let chart = ProportionChart::from_prediction(&prediction);
        assert_eq!(chart.wedges[0].text, "28.0%");
        assert_eq!(chart.wedges[1].text, "72.0%");
        assert!(chart.to_string().contains("False Positive  72.0%"));
    }
}
