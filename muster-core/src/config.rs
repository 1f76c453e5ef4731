//! Tunable policy for the upgrade pass.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MIN_BRANCH_SCORE, RATIO_SUM_TOLERANCE};
use crate::ratios::RatioTriple;

/// Errors raised when upgrade configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.3})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("default ratios must sum to 1.00 within {tolerance:.3} (got {sum:.3})")]
    RatioSum { sum: f64, tolerance: f64 },
    #[error("configuration is malformed: {0}")]
    Parse(String),
}

/// Policy knobs for normalization and branch scoring.
///
/// Missing JSON fields take the values in [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    #[serde(default)]
    pub default_ratios: RatioTriple,
    #[serde(default = "UpgradeConfig::default_ratio_tolerance")]
    pub ratio_tolerance: f64,
    #[serde(default = "UpgradeConfig::default_min_branch_score")]
    pub min_branch_score: f64,
}

impl UpgradeConfig {
    const fn default_ratio_tolerance() -> f64 {
        RATIO_SUM_TOLERANCE
    }

    const fn default_min_branch_score() -> f64 {
        MIN_BRANCH_SCORE
    }

    /// Parse a (possibly partial) configuration object.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values fail validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check ranges and that the default ratios form a distribution.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = &self.default_ratios;
        for (field, value) in [
            ("default_ratios.ranged", ratios.ranged),
            ("default_ratios.cavalry", ratios.cavalry),
            ("default_ratios.infantry", ratios.infantry),
        ] {
            ensure_range(field, value, 0.0, 1.0)?;
        }
        ensure_range("ratio_tolerance", self.ratio_tolerance, 0.0, 0.5)?;
        // The floor keeps every branch share strictly positive.
        if self.min_branch_score <= 0.0 {
            return Err(ConfigError::RangeViolation {
                field: "min_branch_score",
                min: 0.0,
                max: 1.0,
                value: self.min_branch_score,
            });
        }
        ensure_range("min_branch_score", self.min_branch_score, 0.0, 1.0)?;
        let sum = ratios.sum();
        if (sum - 1.0).abs() > self.ratio_tolerance {
            return Err(ConfigError::RatioSum {
                sum,
                tolerance: self.ratio_tolerance,
            });
        }
        Ok(())
    }
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            default_ratios: RatioTriple::default(),
            ratio_tolerance: Self::default_ratio_tolerance(),
            min_branch_score: Self::default_min_branch_score(),
        }
    }
}

fn ensure_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}
