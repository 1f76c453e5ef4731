//! Muster Promotion Engine
//!
//! Platform-agnostic core logic for promoting a roster of countable units
//! through branching promotion trees while steering the roster's aggregate
//! role composition toward caller-specified ratios.
//! This crate performs no I/O; the promotion graph and roster storage are
//! supplied by the caller.

pub mod allocator;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod deficit;
pub mod engine;
pub mod ledger;
pub mod numbers;
pub mod ratios;
pub mod reachability;
pub mod roster;
pub mod unit;

// Re-export commonly used types
pub use allocator::{Allocation, BranchScore, allocate_branches, score_branches, split_count};
pub use catalog::{CatalogBuilder, CatalogError, PromotionGraph, UnitCatalog};
pub use config::{ConfigError, UpgradeConfig};
pub use deficit::{
    AdjustedWeights, CompositionPlan, CompositionTally, RoleCounts, compute_adjusted_weights,
};
pub use engine::{UpgradeEngine, UpgradeError, UpgradeReport, UpgradeRequest, upgrade_roster};
pub use ledger::CountLedger;
pub use ratios::{RatioRequest, RatioTriple, normalize_ratios};
pub use reachability::{CycleError, ReachabilityCache, RoleSet};
pub use roster::{Roster, RosterError, RosterSummary};
pub use unit::{PromotionTargets, RoleCategory, UnitDef, UnitId};
