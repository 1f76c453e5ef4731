//! Counted unit rosters and composition summaries.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::{CatalogError, PromotionGraph, UnitCatalog};
use crate::numbers::u64_to_f64;
use crate::unit::{RoleCategory, UnitId};

/// Errors raised while assembling a roster.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("head count of unit {unit} does not fit in 64 bits")]
    CountOverflow { unit: UnitId },
}

/// Mapping from unit type to head count. Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    counts: BTreeMap<UnitId, u64>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from `(unit, count)` pairs; repeated units accumulate.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::CountOverflow`] if a unit's count overflows.
    pub fn from_counts<I>(entries: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = (UnitId, u64)>,
    {
        let mut roster = Self::new();
        for (unit, count) in entries {
            roster.add(unit, count)?;
        }
        Ok(roster)
    }

    /// Build a roster from catalog keys.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::Catalog`] for keys missing from the catalog and
    /// [`RosterError::CountOverflow`] if a unit's count overflows.
    pub fn from_named(catalog: &UnitCatalog, entries: &[(&str, u64)]) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        for &(key, count) in entries {
            roster.add(catalog.resolve(key)?, count)?;
        }
        Ok(roster)
    }

    /// Replace the count for `unit`; a zero count removes the entry.
    pub fn insert(&mut self, unit: UnitId, count: u64) {
        if count == 0 {
            self.counts.remove(&unit);
        } else {
            self.counts.insert(unit, count);
        }
    }

    /// Add to the count for `unit`, returning the new count. The roster is
    /// unchanged on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::CountOverflow`] instead of dropping units.
    pub fn add(&mut self, unit: UnitId, count: u64) -> Result<u64, RosterError> {
        let updated = self
            .count(unit)
            .checked_add(count)
            .ok_or(RosterError::CountOverflow { unit })?;
        self.insert(unit, updated);
        Ok(updated)
    }

    #[must_use]
    pub fn count(&self, unit: UnitId) -> u64 {
        self.counts.get(&unit).copied().unwrap_or(0)
    }

    /// Sum of all counts, or `None` when it does not fit in a `u64`.
    #[must_use]
    pub fn checked_total(&self) -> Option<u64> {
        self.counts
            .values()
            .try_fold(0_u64, |total, &count| total.checked_add(count))
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.checked_total().unwrap_or(u64::MAX)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, u64)> + '_ {
        self.counts.iter().map(|(&unit, &count)| (unit, count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Counts keyed by catalog key, for reports and fixtures.
    #[must_use]
    pub fn named_counts(&self, catalog: &UnitCatalog) -> BTreeMap<String, u64> {
        self.iter()
            .map(|(unit, count)| (catalog.key_of(unit), count))
            .collect()
    }
}

/// Per-role and per-tier head counts of a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total: u64,
    pub heroes: u64,
    pub by_role: BTreeMap<RoleCategory, u64>,
    pub by_tier: BTreeMap<u32, u64>,
}

impl RosterSummary {
    /// Summarize `roster`; heroes are tallied apart from the role breakdown.
    /// Units unknown to the graph are skipped. Sums saturate at `u64::MAX`.
    #[must_use]
    pub fn summarize<G>(graph: &G, roster: &Roster) -> Self
    where
        G: PromotionGraph + ?Sized,
    {
        let mut summary = Self::default();
        for (unit, count) in roster.iter().filter(|(unit, _)| graph.contains(*unit)) {
            summary.total = summary.total.saturating_add(count);
            if graph.is_hero(unit) {
                summary.heroes = summary.heroes.saturating_add(count);
                continue;
            }
            let role = summary.by_role.entry(graph.role(unit)).or_default();
            *role = role.saturating_add(count);
            let tier = summary.by_tier.entry(graph.tier(unit)).or_default();
            *tier = tier.saturating_add(count);
        }
        summary
    }

    /// Non-hero head count.
    #[must_use]
    pub fn troops(&self) -> u64 {
        self.total.saturating_sub(self.heroes)
    }

    #[must_use]
    pub fn count(&self, role: RoleCategory) -> u64 {
        self.by_role.get(&role).copied().unwrap_or(0)
    }

    /// Fraction of non-hero troops in `role`; 0 for an empty roster.
    #[must_use]
    pub fn share(&self, role: RoleCategory) -> f64 {
        let troops = self.troops();
        if troops == 0 {
            return 0.0;
        }
        u64_to_f64(self.count(role)) / u64_to_f64(troops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_are_not_stored() {
        let mut roster = Roster::new();
        roster.insert(UnitId::new(3), 0);
        assert!(roster.is_empty());
        roster.insert(UnitId::new(3), 5);
        assert_eq!(roster.add(UnitId::new(3), 2).unwrap(), 7);
        roster.insert(UnitId::new(3), 0);
        assert!(roster.is_empty());
    }

    #[test]
    fn named_rosters_round_trip_through_keys() {
        let catalog = UnitCatalog::load_from_static();
        let roster = Roster::from_named(&catalog, &[("recruit", 10), ("archer", 4)]).unwrap();
        assert_eq!(roster.total(), 14);
        let named = roster.named_counts(&catalog);
        assert_eq!(named.get("recruit"), Some(&10));
        assert_eq!(named.get("archer"), Some(&4));
        assert!(Roster::from_named(&catalog, &[("ghost", 1)]).is_err());
    }

    #[test]
    fn summary_separates_heroes_and_roles() {
        let catalog = UnitCatalog::load_from_static();
        let roster = Roster::from_named(
            &catalog,
            &[("captain", 1), ("knight", 3), ("archer", 6), ("footman", 1)],
        )
        .unwrap();
        let summary = RosterSummary::summarize(&catalog, &roster);
        assert_eq!(summary.total, 11);
        assert_eq!(summary.heroes, 1);
        assert_eq!(summary.troops(), 10);
        assert_eq!(summary.count(RoleCategory::Ranged), 6);
        assert!((summary.share(RoleCategory::Cavalry) - 0.3).abs() < 1e-9);
        assert_eq!(summary.by_tier.get(&4), Some(&3));
    }

    #[test]
    fn empty_summary_has_zero_shares() {
        let catalog = UnitCatalog::load_from_static();
        let summary = RosterSummary::summarize(&catalog, &Roster::new());
        assert_eq!(summary.troops(), 0);
        assert!(summary.share(RoleCategory::Infantry).abs() < f64::EPSILON);
    }

    #[test]
    fn overflowing_add_keeps_every_unit() {
        let unit = UnitId::new(0);
        let mut roster = Roster::from_counts([(unit, u64::MAX - 1)]).unwrap();
        let err = roster.add(unit, 5).unwrap_err();
        assert!(matches!(err, RosterError::CountOverflow { unit: u } if u == unit));
        assert_eq!(roster.count(unit), u64::MAX - 1);
        assert!(Roster::from_counts([(unit, u64::MAX), (unit, 5)]).is_err());
    }

    #[test]
    fn counts_beyond_u32_are_kept_exactly() {
        let unit = UnitId::new(1);
        let roster = Roster::from_counts([(unit, u64::from(u32::MAX)), (unit, 5)]).unwrap();
        assert_eq!(roster.count(unit), u64::from(u32::MAX) + 5);
        assert_eq!(roster.total(), u64::from(u32::MAX) + 5);
    }

    #[test]
    fn total_saturates_when_the_sum_overflows() {
        let roster =
            Roster::from_counts([(UnitId::new(0), u64::MAX), (UnitId::new(1), 1)]).unwrap();
        assert_eq!(roster.checked_total(), None);
        assert_eq!(roster.total(), u64::MAX);
    }
}
