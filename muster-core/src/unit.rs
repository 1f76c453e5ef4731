//! Unit definitions and role categories.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Tactical classification used for composition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    Infantry,
    Ranged,
    Cavalry,
    HorseArcher,
}

impl RoleCategory {
    pub const ALL: [Self; 4] = [
        Self::Infantry,
        Self::Ranged,
        Self::Cavalry,
        Self::HorseArcher,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Infantry => "infantry",
            Self::Ranged => "ranged",
            Self::Cavalry => "cavalry",
            Self::HorseArcher => "horse_archer",
        }
    }

    /// Dense index used by fixed-size role tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Infantry => 0,
            Self::Ranged => 1,
            Self::Cavalry => 2,
            Self::HorseArcher => 3,
        }
    }

    #[must_use]
    pub const fn is_mounted(self) -> bool {
        matches!(self, Self::Cavalry | Self::HorseArcher)
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Arena index of a unit inside a promotion graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(usize);

impl UnitId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Promotion targets in definition order. Most trees branch at most twice.
pub type PromotionTargets = SmallVec<[UnitId; 2]>;

/// Immutable definition of a unit type as stored in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDef {
    pub key: String,
    pub name: String,
    pub tier: u32,
    pub role: RoleCategory,
    /// Heroes are carried on rosters but never promoted or counted toward composition.
    pub hero: bool,
    pub upgrades: PromotionTargets,
}

impl UnitDef {
    /// A unit with no promotion targets ends every chain that reaches it.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.upgrades.is_empty()
    }

    /// True when promotion stops here for the given tier ceiling.
    #[must_use]
    pub fn is_terminal_for(&self, target_tier: u32) -> bool {
        self.tier >= target_tier || self.is_leaf()
    }
}
