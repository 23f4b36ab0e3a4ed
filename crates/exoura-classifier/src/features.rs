//! Validated model inputs.

use std::fmt;
use std::str::FromStr;

use exoura_io::FEATURE_COLUMNS;

use crate::error::InvalidInput;

/// One of the five model inputs, in model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Orbital period, days.
    OrbitalPeriod,
    /// Transit duration, hours.
    TransitDuration,
    /// Transit depth, ppm.
    TransitDepth,
    /// Planet radius, Earth radii.
    PlanetRadius,
    /// Transit model signal-to-noise ratio.
    ModelSnr,
}

impl FeatureKind {
    /// All kinds in model order.
    pub const ALL: [FeatureKind; 5] = [
        FeatureKind::OrbitalPeriod,
        FeatureKind::TransitDuration,
        FeatureKind::TransitDepth,
        FeatureKind::PlanetRadius,
        FeatureKind::ModelSnr,
    ];

    /// Position in the feature vector.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// KOI column name, e.g. `koi_period`.
    #[must_use]
    pub fn column(self) -> &'static str {
        FEATURE_COLUMNS[self.index()]
    }

    /// Human-readable field label with unit.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            FeatureKind::OrbitalPeriod => "Orbital Period (days)",
            FeatureKind::TransitDuration => "Transit Duration (hours)",
            FeatureKind::TransitDepth => "Transit Depth (ppm)",
            FeatureKind::PlanetRadius => "Planet Radius (Earth radii)",
            FeatureKind::ModelSnr => "Signal Noise Ratio",
        }
    }

    /// Parse one value for this feature.
    ///
    /// # Errors
    ///
    /// [`InvalidInput::NonNumeric`] or [`InvalidInput::NonFinite`].
    pub fn parse_value(self, raw: &str) -> Result<f64, InvalidInput> {
        let value = f64::from_str(raw.trim()).map_err(|_| InvalidInput::NonNumeric {
            feature: self.column(),
            raw: raw.to_string(),
        })?;
        self.check_finite(value)
    }

    fn check_finite(self, value: f64) -> Result<f64, InvalidInput> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(InvalidInput::NonFinite {
                feature: self.column(),
                value,
            })
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Five finite feature values in model order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector([f64; 5]);

impl FeatureVector {
    /// Validate arity and finiteness.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidInput::WrongArity`] | not exactly five values |
    /// | [`InvalidInput::NonFinite`] | NaN or infinite value |
    pub fn from_values(values: &[f64]) -> Result<Self, InvalidInput> {
        let array: [f64; 5] = values.try_into().map_err(|_| InvalidInput::WrongArity {
            expected: FeatureKind::ALL.len(),
            got: values.len(),
        })?;
        for (kind, &value) in FeatureKind::ALL.iter().zip(&array) {
            kind.check_finite(value)?;
        }
        Ok(Self(array))
    }

    /// Parse five text fields.
    ///
    /// # Errors
    ///
    /// [`InvalidInput::WrongArity`], [`InvalidInput::NonNumeric`], or
    /// [`InvalidInput::NonFinite`].
    pub fn parse(fields: &[&str]) -> Result<Self, InvalidInput> {
        if fields.len() != FeatureKind::ALL.len() {
            return Err(InvalidInput::WrongArity {
                expected: FeatureKind::ALL.len(),
                got: fields.len(),
            });
        }
        let mut values = [0.0; 5];
        for ((slot, kind), raw) in values.iter_mut().zip(FeatureKind::ALL).zip(fields) {
            *slot = kind.parse_value(raw)?;
        }
        Ok(Self(values))
    }

    /// Value of one feature.
    #[must_use]
    pub fn get(&self, kind: FeatureKind) -> f64 {
        self.0[kind.index()]
    }

    /// Values in model order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// True when every value is 0.0, the form's untouched state.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }

    pub(crate) fn set(&mut self, kind: FeatureKind, value: f64) {
        self.0[kind.index()] = value;
    }
}

/// Range checks applied before a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// Any finite value is accepted.
    #[default]
    Permissive,
    /// Negative values are rejected.
    NonNegative,
}

impl RangePolicy {
    /// Check a vector against this policy.
    ///
    /// # Errors
    ///
    /// [`InvalidInput::OutOfRange`] for the first offending feature.
    pub fn check(self, features: &FeatureVector) -> Result<(), InvalidInput> {
        match self {
            RangePolicy::Permissive => Ok(()),
            RangePolicy::NonNegative => FeatureKind::ALL
                .into_iter()
                .find(|&k| features.get(k) < 0.0)
                .map_or(Ok(()), |kind| {
                    Err(InvalidInput::OutOfRange {
                        feature: kind.column(),
                        value: features.get(kind),
                    })
                }),
        }
    }
}
