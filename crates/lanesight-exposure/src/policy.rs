//! Gamma policy: the tunable part of the fuzzy controller.

use serde::{Deserialize, Serialize};

/// Rule consequents, i.e. the gamma each fuzzy rule votes for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleWeights {
    pub dark: f64,
    pub normal: f64,
    pub bright: f64,
}

/// Multiplicative gamma boost applied when the normalized illuminance is
/// strictly below `threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LowLightBoost {
    pub threshold: f64,
    pub factor: f64,
}

/// Inclusive output range for gamma.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaBounds {
    pub min: f64,
    pub max: f64,
}

impl GammaBounds {
    /// Clamp into `[min, max]`. Never panics: with inverted bounds the result
    /// is `max`, and a NaN bound is ignored.
    #[inline]
    pub fn clamp(&self, gamma: f64) -> f64 {
        gamma.max(self.min).min(self.max)
    }

    #[inline]
    pub fn contains(&self, gamma: f64) -> bool {
        gamma >= self.min && gamma <= self.max
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }
}

/// Named policy variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GammaPreset {
    /// Linear darkness membership, moderate range.
    Linear,
    /// Darkness membership raised to 1.7, stronger dark rule, low-light boost
    /// and a wider range.
    #[default]
    DarkEmphasized,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("gamma policy has a non-finite parameter")]
    NonFinite,
    #[error("darkness exponent must be > 0 (got {0})")]
    InvalidExponent(f64),
    #[error("rule weights must be >= 0")]
    NegativeWeight,
    #[error("gamma bounds must satisfy 0 < min < max (got [{min}, {max}])")]
    InvalidBounds { min: f64, max: f64 },
    #[error("low-light threshold must be in [0, 1] (got {0})")]
    InvalidBoostThreshold(f64),
    #[error("low-light factor must be > 0 (got {0})")]
    InvalidBoostFactor(f64),
}

/// Fuzzy gamma controller configuration. Immutable for a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaPolicy {
    /// Exponent applied to the darkness term `(1 - L)` of the too-dark rule.
    pub darkness_exponent: f64,
    pub weights: RuleWeights,
    #[serde(default)]
    pub low_light_boost: Option<LowLightBoost>,
    pub bounds: GammaBounds,
}

impl GammaPolicy {
    pub fn linear() -> Self {
        Self {
            darkness_exponent: 1.0,
            weights: RuleWeights {
                dark: 1.6,
                normal: 1.0,
                bright: 0.4,
            },
            low_light_boost: None,
            bounds: GammaBounds { min: 0.4, max: 1.6 },
        }
    }

    pub fn dark_emphasized() -> Self {
        Self {
            darkness_exponent: 1.7,
            weights: RuleWeights {
                dark: 2.2,
                normal: 1.0,
                bright: 0.4,
            },
            low_light_boost: Some(LowLightBoost {
                threshold: 0.15,
                factor: 1.3,
            }),
            bounds: GammaBounds { min: 0.4, max: 2.5 },
        }
    }

    pub fn preset(preset: GammaPreset) -> Self {
        match preset {
            GammaPreset::Linear => Self::linear(),
            GammaPreset::DarkEmphasized => Self::dark_emphasized(),
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        let mut values = vec![
            self.darkness_exponent,
            self.weights.dark,
            self.weights.normal,
            self.weights.bright,
            self.bounds.min,
            self.bounds.max,
        ];
        if let Some(boost) = self.low_light_boost {
            values.extend([boost.threshold, boost.factor]);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PolicyError::NonFinite);
        }

        if self.darkness_exponent <= 0.0 {
            return Err(PolicyError::InvalidExponent(self.darkness_exponent));
        }
        let w = self.weights;
        if w.dark < 0.0 || w.normal < 0.0 || w.bright < 0.0 {
            return Err(PolicyError::NegativeWeight);
        }
        let b = self.bounds;
        if b.min <= 0.0 || b.min >= b.max {
            return Err(PolicyError::InvalidBounds {
                min: b.min,
                max: b.max,
            });
        }
        if let Some(boost) = self.low_light_boost {
            if !(0.0..=1.0).contains(&boost.threshold) {
                return Err(PolicyError::InvalidBoostThreshold(boost.threshold));
            }
            if boost.factor <= 0.0 {
                return Err(PolicyError::InvalidBoostFactor(boost.factor));
            }
        }
        Ok(())
    }
}

impl Default for GammaPolicy {
    fn default() -> Self {
        Self::preset(GammaPreset::default())
    }
}

impl From<GammaPreset> for GammaPolicy {
    fn from(preset: GammaPreset) -> Self {
        Self::preset(preset)
    }
}
