//! Locked/flexible partition of a roster and the adjusted role weights that
//! steer flexible units toward the target composition.
use serde::{Deserialize, Serialize};

use crate::constants::NEUTRAL_ROLE_WEIGHT;
use crate::numbers::{round_f64_to_u64, u64_to_f64};
use crate::ratios::RatioTriple;
use crate::reachability::RoleSet;
use crate::unit::RoleCategory;

/// Head counts for the three ratio slots. Horse archers fold into cavalry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub ranged: u64,
    pub cavalry: u64,
    pub infantry: u64,
}

impl RoleCounts {
    #[must_use]
    pub const fn sum(&self) -> u64 {
        self.ranged + self.cavalry + self.infantry
    }

    fn slot_mut(&mut self, role: RoleCategory) -> &mut u64 {
        match role {
            RoleCategory::Ranged => &mut self.ranged,
            RoleCategory::Cavalry | RoleCategory::HorseArcher => &mut self.cavalry,
            RoleCategory::Infantry => &mut self.infantry,
        }
    }
}

/// Roster troops split by whether their promotion outcome is fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionTally {
    pub total: u64,
    pub locked: RoleCounts,
    pub flexible: u64,
}

impl CompositionTally {
    /// Record `count` troops whose reachable terminal roles are `reach`.
    pub fn record(&mut self, reach: RoleSet, count: u64) {
        self.total += count;
        match reach.locked_role() {
            Some(role) => *self.locked.slot_mut(role) += count,
            None => self.flexible += count,
        }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (RoleSet, u64)>,
    {
        let mut tally = Self::default();
        for (reach, count) in entries {
            tally.record(reach, count);
        }
        tally
    }
}

/// Per-role preference handed to the branch allocator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedWeights {
    pub ranged: f64,
    pub cavalry: f64,
    pub infantry: f64,
}

impl AdjustedWeights {
    /// Equal preference for every role.
    pub const NEUTRAL: Self = Self {
        ranged: NEUTRAL_ROLE_WEIGHT,
        cavalry: NEUTRAL_ROLE_WEIGHT,
        infantry: NEUTRAL_ROLE_WEIGHT,
    };

    /// Weight for `role`; horse archers take the mean of ranged and cavalry.
    #[must_use]
    pub fn weight(&self, role: RoleCategory) -> f64 {
        match role {
            RoleCategory::Ranged => self.ranged,
            RoleCategory::Cavalry => self.cavalry,
            RoleCategory::Infantry => self.infantry,
            RoleCategory::HorseArcher => (self.ranged + self.cavalry) / 2.0,
        }
    }
}

/// Everything derived while computing the adjusted weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionPlan {
    pub tally: CompositionTally,
    pub targets: RoleCounts,
    pub deficits: RoleCounts,
    pub weights: AdjustedWeights,
}

/// Derive flexible-unit weights that make up for what locked units already
/// contribute toward `ratios`.
#[must_use]
pub fn compute_adjusted_weights(tally: &CompositionTally, ratios: &RatioTriple) -> CompositionPlan {
    let total = u64_to_f64(tally.total);
    let targets = RoleCounts {
        ranged: round_f64_to_u64(total * ratios.ranged),
        cavalry: round_f64_to_u64(total * ratios.cavalry),
        infantry: round_f64_to_u64(total * ratios.infantry),
    };
    let deficits = RoleCounts {
        ranged: targets.ranged.saturating_sub(tally.locked.ranged),
        cavalry: targets.cavalry.saturating_sub(tally.locked.cavalry),
        infantry: targets.infantry.saturating_sub(tally.locked.infantry),
    };

    let demand = deficits.sum();
    let weights = if tally.flexible == 0 || demand == 0 {
        AdjustedWeights::NEUTRAL
    } else {
        // Demand within supply keeps absolute shares; excess demand is scaled down.
        let divisor = u64_to_f64(if demand <= tally.flexible {
            tally.flexible
        } else {
            demand
        });
        AdjustedWeights {
            ranged: u64_to_f64(deficits.ranged) / divisor,
            cavalry: u64_to_f64(deficits.cavalry) / divisor,
            infantry: u64_to_f64(deficits.infantry) / divisor,
        }
    };

    CompositionPlan {
        tally: *tally,
        targets,
        deficits,
        weights,
    }
}
