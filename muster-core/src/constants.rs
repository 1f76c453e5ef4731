//! Centralized tuning constants for roster promotion.
//!
//! These values define the deterministic math of the upgrade pass. Keeping
//! them together ensures that composition steering can only be adjusted via
//! reviewed code or an explicit `UpgradeConfig`, never through hidden state.

// Default composition ------------------------------------------------------
pub const DEFAULT_RANGED_RATIO: f64 = 0.30;
pub const DEFAULT_CAVALRY_RATIO: f64 = 0.20;
pub const DEFAULT_INFANTRY_RATIO: f64 = 0.50;

// Normalization ------------------------------------------------------------
/// Maximum deviation from 1.0 tolerated before a fully specified triple is rescaled.
pub const RATIO_SUM_TOLERANCE: f64 = 0.01;
/// Comparison slack used when checking that a normalized triple sums to 1.0.
pub const RATIO_EPSILON: f64 = 1e-9;

// Branch allocation ---------------------------------------------------------
/// Lowest score any promotion branch may receive, so no branch is starved to zero.
pub const MIN_BRANCH_SCORE: f64 = 0.05;
/// Weight handed to every role when there is no deficit to steer toward.
pub const NEUTRAL_ROLE_WEIGHT: f64 = 1.0 / 3.0;
