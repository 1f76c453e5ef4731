//! Terminal role analysis over the promotion graph.
//!
//! For a unit and a tier ceiling, the reachable set holds every role category
//! a promotion chain starting at that unit can end in. Results are memoized
//! per `(unit, target_tier)`; the cache is owned by the caller, never global.
use std::collections::HashMap;
use thiserror::Error;

use crate::catalog::PromotionGraph;
use crate::unit::{RoleCategory, UnitId};

/// Small fixed set of role categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet {
    members: [bool; 4],
}

impl RoleSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            members: [false; 4],
        }
    }

    #[must_use]
    pub fn single(role: RoleCategory) -> Self {
        let mut set = Self::empty();
        set.insert(role);
        set
    }

    pub fn insert(&mut self, role: RoleCategory) {
        self.members[role.index()] = true;
    }

    #[must_use]
    pub fn union(mut self, other: Self) -> Self {
        for role in other.iter() {
            self.insert(role);
        }
        self
    }

    #[must_use]
    pub const fn contains(&self, role: RoleCategory) -> bool {
        self.members[role.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.iter().filter(|&&present| present).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(self) -> impl Iterator<Item = RoleCategory> {
        RoleCategory::ALL
            .into_iter()
            .filter(move |role| self.members[role.index()])
    }

    /// The single reachable role of a locked unit.
    #[must_use]
    pub fn locked_role(&self) -> Option<RoleCategory> {
        let mut roles = self.iter();
        match (roles.next(), roles.next()) {
            (Some(role), None) => Some(role),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_flexible(&self) -> bool {
        self.len() > 1
    }
}

impl FromIterator<RoleCategory> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleCategory>>(iter: I) -> Self {
        let mut set = Self::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

/// Raised when reachability revisits a unit still being evaluated.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("promotion cycle through unit {unit}")]
pub struct CycleError {
    pub unit: UnitId,
}

/// Memo of reachable role sets keyed by `(unit, target_tier)`.
#[derive(Debug, Default)]
pub struct ReachabilityCache {
    memo: HashMap<(UnitId, u32), RoleSet>,
    active: Vec<UnitId>,
}

impl ReachabilityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Role categories a promotion chain from `unit` can finish in when
    /// promotion stops at `target_tier` or at a unit without targets.
    ///
    /// # Errors
    ///
    /// Returns [`CycleError`] if the graph promotes a unit back into itself.
    ///
    /// # Panics
    ///
    /// Panics if `graph` panics for an unknown id, as [`UnitCatalog`] does.
    /// Check [`PromotionGraph::contains`] first for untrusted ids.
    ///
    /// [`UnitCatalog`]: crate::catalog::UnitCatalog
    pub fn reachable<G>(
        &mut self,
        graph: &G,
        unit: UnitId,
        target_tier: u32,
    ) -> Result<RoleSet, CycleError>
    where
        G: PromotionGraph + ?Sized,
    {
        if let Some(&set) = self.memo.get(&(unit, target_tier)) {
            return Ok(set);
        }
        if graph.is_terminal(unit, target_tier) {
            let set = RoleSet::single(graph.role(unit));
            self.memo.insert((unit, target_tier), set);
            return Ok(set);
        }
        if self.active.contains(&unit) {
            self.active.clear();
            return Err(CycleError { unit });
        }

        self.active.push(unit);
        let mut set = RoleSet::empty();
        for &target in graph.promotion_targets(unit) {
            set = set.union(self.reachable(graph, target, target_tier)?);
        }
        self.active.pop();

        self.memo.insert((unit, target_tier), set);
        Ok(set)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    pub fn clear(&mut self) {
        self.memo.clear();
        self.active.clear();
    }
}
