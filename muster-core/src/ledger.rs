//! Signed count deltas accumulated during an upgrade pass.
use std::collections::BTreeMap;

use crate::roster::Roster;
use crate::unit::UnitId;

/// Pending count changes, applied to a roster exactly once.
///
/// Every change is recorded as a transfer, so the deltas always net to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountLedger {
    deltas: BTreeMap<UnitId, i128>,
}

impl CountLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `count` units from `from` to `to`.
    pub fn transfer(&mut self, from: UnitId, to: UnitId, count: u64) {
        if count == 0 {
            return;
        }
        let count = i128::from(count);
        *self.deltas.entry(from).or_default() -= count;
        *self.deltas.entry(to).or_default() += count;
    }

    #[must_use]
    pub fn delta(&self, unit: UnitId) -> i128 {
        self.deltas.get(&unit).copied().unwrap_or(0)
    }

    /// Sum of every delta.
    #[must_use]
    pub fn net(&self) -> i128 {
        self.deltas.values().sum()
    }

    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.net() == 0
    }

    /// Non-zero deltas in unit order.
    pub fn changes(&self) -> impl Iterator<Item = (UnitId, i128)> + '_ {
        self.deltas
            .iter()
            .filter(|&(_, &delta)| delta != 0)
            .map(|(&unit, &delta)| (unit, delta))
    }

    /// Units whose starting type had to promote: the sum of negative net
    /// deltas. Units only passing through an intermediate type net to zero
    /// there and are not counted again.
    #[must_use]
    pub fn moved(&self) -> u64 {
        self.deltas
            .values()
            .filter(|&&delta| delta < 0)
            .map(|delta| u64::try_from(delta.unsigned_abs()).unwrap_or(u64::MAX))
            .fold(0, u64::saturating_add)
    }

    /// Apply every non-zero delta to `roster`.
    ///
    /// Nothing is written unless every resulting count is representable; on
    /// failure the first offending unit is returned.
    ///
    /// # Errors
    ///
    /// Returns the unit whose count would leave the `u64` range.
    pub fn apply(&self, roster: &mut Roster) -> Result<(), UnitId> {
        let mut updates = Vec::with_capacity(self.deltas.len());
        for (unit, delta) in self.changes() {
            let updated = i128::from(roster.count(unit)) + delta;
            let updated = u64::try_from(updated).map_err(|_| unit)?;
            updates.push((unit, updated));
        }
        for (unit, count) in updates {
            roster.insert(unit, count);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_stay_balanced() {
        let mut ledger = CountLedger::new();
        ledger.transfer(UnitId::new(0), UnitId::new(1), 40);
        ledger.transfer(UnitId::new(1), UnitId::new(2), 15);
        assert!(ledger.is_balanced());
        assert_eq!(ledger.delta(UnitId::new(1)), 25);
        // unit 1 is only a waypoint for the 15 passing through it
        assert_eq!(ledger.moved(), 40);
    }

    #[test]
    fn merged_lineages_beyond_u32_apply_exactly() {
        let big = u64::from(u32::MAX);
        let mut roster = Roster::from_counts([(UnitId::new(0), big), (UnitId::new(1), big)]).unwrap();
        let mut ledger = CountLedger::new();
        ledger.transfer(UnitId::new(0), UnitId::new(2), big);
        ledger.transfer(UnitId::new(1), UnitId::new(2), big);
        ledger.apply(&mut roster).unwrap();
        assert_eq!(roster.count(UnitId::new(2)), big * 2);
        assert_eq!(ledger.moved(), big * 2);
    }

    #[test]
    fn apply_updates_and_drops_empty_entries() {
        let mut roster = Roster::new();
        roster.insert(UnitId::new(0), 40);
        let mut ledger = CountLedger::new();
        ledger.transfer(UnitId::new(0), UnitId::new(1), 40);
        ledger.apply(&mut roster).unwrap();
        assert_eq!(roster.count(UnitId::new(0)), 0);
        assert_eq!(roster.count(UnitId::new(1)), 40);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn underflow_leaves_roster_untouched() {
        let mut roster = Roster::new();
        roster.insert(UnitId::new(0), 5);
        let mut ledger = CountLedger::new();
        ledger.transfer(UnitId::new(0), UnitId::new(1), 3);
        ledger.transfer(UnitId::new(2), UnitId::new(1), 1);
        assert_eq!(ledger.apply(&mut roster), Err(UnitId::new(2)));
        assert_eq!(roster.count(UnitId::new(0)), 5);
        assert_eq!(roster.count(UnitId::new(1)), 0);
    }

    #[test]
    fn zero_transfers_are_ignored() {
        let mut ledger = CountLedger::new();
        ledger.transfer(UnitId::new(0), UnitId::new(1), 0);
        assert_eq!(ledger.changes().count(), 0);
    }
}
