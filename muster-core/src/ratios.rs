//! Target composition ratios and their normalization.
use serde::{Deserialize, Serialize};

use crate::config::UpgradeConfig;
use crate::constants::{
    DEFAULT_CAVALRY_RATIO, DEFAULT_INFANTRY_RATIO, DEFAULT_RANGED_RATIO, RATIO_EPSILON,
};
use crate::numbers::usize_to_f64;

/// Complete target composition. Horse archers are scored as a blend of
/// ranged and cavalry demand, so they have no slot of their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioTriple {
    pub ranged: f64,
    pub cavalry: f64,
    pub infantry: f64,
}

impl RatioTriple {
    #[must_use]
    pub const fn new(ranged: f64, cavalry: f64, infantry: f64) -> Self {
        Self {
            ranged,
            cavalry,
            infantry,
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.ranged + self.cavalry + self.infantry
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= RATIO_EPSILON
    }

    fn scaled(self, divisor: f64) -> Self {
        Self::new(
            self.ranged / divisor,
            self.cavalry / divisor,
            self.infantry / divisor,
        )
    }
}

impl Default for RatioTriple {
    fn default() -> Self {
        Self::new(
            DEFAULT_RANGED_RATIO,
            DEFAULT_CAVALRY_RATIO,
            DEFAULT_INFANTRY_RATIO,
        )
    }
}

/// Caller-supplied ratios; any subset may be left unspecified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioRequest {
    #[serde(default)]
    pub ranged: Option<f64>,
    #[serde(default)]
    pub cavalry: Option<f64>,
    #[serde(default)]
    pub infantry: Option<f64>,
}

impl RatioRequest {
    #[must_use]
    pub const fn new(ranged: Option<f64>, cavalry: Option<f64>, infantry: Option<f64>) -> Self {
        Self {
            ranged,
            cavalry,
            infantry,
        }
    }

    #[must_use]
    pub const fn with_ranged(mut self, value: f64) -> Self {
        self.ranged = Some(value);
        self
    }

    #[must_use]
    pub const fn with_cavalry(mut self, value: f64) -> Self {
        self.cavalry = Some(value);
        self
    }

    #[must_use]
    pub const fn with_infantry(mut self, value: f64) -> Self {
        self.infantry = Some(value);
        self
    }

    /// Number of ratios that survive sanitizing.
    #[must_use]
    pub fn specified_count(&self) -> usize {
        self.sanitized().iter().flatten().count()
    }

    /// Non-finite values count as unspecified; finite ones are clamped to [0, 1].
    fn sanitized(&self) -> [Option<f64>; 3] {
        [self.ranged, self.cavalry, self.infantry]
            .map(|slot| slot.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0)))
    }
}

/// Turn a partial request into a complete triple that sums to 1.
///
/// - Nothing specified: the configured defaults.
/// - Everything specified: rescaled by the sum unless already within tolerance.
/// - Partially specified: rescaled when the given values reach 1, otherwise
///   the remainder is split evenly across the missing slots.
#[must_use]
pub fn normalize_ratios(request: &RatioRequest, config: &UpgradeConfig) -> RatioTriple {
    let slots = request.sanitized();
    let specified = slots.iter().flatten().count();
    let given_sum: f64 = slots.iter().flatten().sum();
    let defaults = config.default_ratios;

    let [ranged, cavalry, infantry] = match specified {
        0 => return defaults,
        3 => {
            let triple = RatioTriple::new(
                slots[0].unwrap_or(0.0),
                slots[1].unwrap_or(0.0),
                slots[2].unwrap_or(0.0),
            );
            if (given_sum - 1.0).abs() <= config.ratio_tolerance {
                return triple;
            }
            if given_sum <= 0.0 {
                return defaults;
            }
            return triple.scaled(given_sum);
        }
        _ if given_sum >= 1.0 => slots.map(|slot| slot.map_or(0.0, |v| v / given_sum)),
        _ => {
            let missing = usize_to_f64(3 - specified);
            let share = (1.0 - given_sum) / missing;
            slots.map(|slot| slot.unwrap_or(share))
        }
    };
    RatioTriple::new(ranged, cavalry, infantry)
}
