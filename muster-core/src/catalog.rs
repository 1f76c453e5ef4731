//! Promotion graph access and the bundled unit catalog.
//!
//! The upgrade pass only ever reads the graph through [`PromotionGraph`], so
//! callers can plug in their own unit source. [`UnitCatalog`] is the arena
//! implementation used by the tester and the bundled sample data.
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::unit::{PromotionTargets, RoleCategory, UnitDef, UnitId};

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/units.json");

/// Read-only view of a promotion graph.
///
/// The relation formed by `promotion_targets` must be acyclic. Catalogs built
/// through [`CatalogBuilder`] or [`UnitCatalog::from_json`] are checked on
/// construction; other implementations are guarded during reachability.
///
/// Every method except `contains` may assume its id is valid. The upgrade
/// pass checks roster keys with `contains` before any other query.
pub trait PromotionGraph {
    /// Whether `unit` is a valid id for this graph.
    fn contains(&self, unit: UnitId) -> bool;

    fn tier(&self, unit: UnitId) -> u32;

    fn role(&self, unit: UnitId) -> RoleCategory;

    /// Direct promotion targets in definition order.
    fn promotion_targets(&self, unit: UnitId) -> &[UnitId];

    /// Heroes are left untouched by the upgrade pass.
    fn is_hero(&self, _unit: UnitId) -> bool {
        false
    }

    /// True when promotion stops at `unit` for the given tier ceiling.
    fn is_terminal(&self, unit: UnitId, target_tier: u32) -> bool {
        self.tier(unit) >= target_tier || self.promotion_targets(unit).is_empty()
    }
}

/// Errors raised while building or querying a unit catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unit `{0}` is defined more than once")]
    DuplicateUnit(String),
    #[error("unit `{unit}` promotes to unknown unit `{target}`")]
    UnknownTarget { unit: String, target: String },
    #[error("unknown unit `{0}`")]
    UnknownUnit(String),
    #[error("unit `{0}` promotes to itself")]
    SelfPromotion(String),
    #[error("promotion cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("catalog data is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    units: Vec<UnitRecord>,
}

#[derive(Debug, Deserialize)]
struct UnitRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    tier: u32,
    role: RoleCategory,
    #[serde(default)]
    hero: bool,
    #[serde(default)]
    upgrades: Vec<String>,
}

/// Arena of unit definitions addressed by [`UnitId`].
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: Vec<UnitDef>,
    index: HashMap<String, UnitId>,
}

impl UnitCatalog {
    /// Parse and validate a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, an id is duplicated, an
    /// upgrade names an unknown unit, or the promotion relation has a cycle.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut builder = CatalogBuilder::new();
        for record in &file.units {
            let name = record.name.clone().unwrap_or_else(|| record.id.clone());
            builder.push(record.id.clone(), name, record.tier, record.role, record.hero)?;
        }
        for record in &file.units {
            let from = builder.resolve(&record.id)?;
            for target in &record.upgrades {
                let to = builder
                    .find(target)
                    .ok_or_else(|| CatalogError::UnknownTarget {
                        unit: record.id.clone(),
                        target: target.clone(),
                    })?;
                builder.link(from, to)?;
            }
        }
        builder.build()
    }

    /// Load the bundled sample catalog.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn find(&self, key: &str) -> Option<UnitId> {
        self.index.get(key).copied()
    }

    /// Like [`find`](Self::find) but reports the missing key.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownUnit`] when `key` is not defined.
    pub fn resolve(&self, key: &str) -> Result<UnitId, CatalogError> {
        self.find(key)
            .ok_or_else(|| CatalogError::UnknownUnit(key.to_string()))
    }

    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitDef> {
        self.units.get(unit.index())
    }

    /// Display key for a unit, falling back to its arena index.
    #[must_use]
    pub fn key_of(&self, unit: UnitId) -> String {
        self.get(unit)
            .map_or_else(|| unit.to_string(), |def| def.key.clone())
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &UnitDef)> {
        self.units
            .iter()
            .enumerate()
            .map(|(idx, def)| (UnitId::new(idx), def))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Highest tier of any non-hero unit.
    #[must_use]
    pub fn max_tier(&self) -> u32 {
        self.units
            .iter()
            .filter(|def| !def.hero)
            .map(|def| def.tier)
            .max()
            .unwrap_or(0)
    }
}

/// # Panics
///
/// Every query except `contains` panics for an id from another catalog.
impl PromotionGraph for UnitCatalog {
    fn contains(&self, unit: UnitId) -> bool {
        unit.index() < self.units.len()
    }

    fn tier(&self, unit: UnitId) -> u32 {
        self.units[unit.index()].tier
    }

    fn role(&self, unit: UnitId) -> RoleCategory {
        self.units[unit.index()].role
    }

    fn promotion_targets(&self, unit: UnitId) -> &[UnitId] {
        &self.units[unit.index()].upgrades
    }

    fn is_hero(&self, unit: UnitId) -> bool {
        self.units[unit.index()].hero
    }
}

/// Incremental catalog construction, validated on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    units: Vec<UnitDef>,
    index: HashMap<String, UnitId>,
}

impl CatalogBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular unit whose display name equals its key.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateUnit`] when the key is taken.
    pub fn add_unit(
        &mut self,
        key: &str,
        tier: u32,
        role: RoleCategory,
    ) -> Result<UnitId, CatalogError> {
        self.push(key.to_string(), key.to_string(), tier, role, false)
    }

    /// Add a hero unit.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateUnit`] when the key is taken.
    pub fn add_hero(
        &mut self,
        key: &str,
        tier: u32,
        role: RoleCategory,
    ) -> Result<UnitId, CatalogError> {
        self.push(key.to_string(), key.to_string(), tier, role, true)
    }

    fn push(
        &mut self,
        key: String,
        name: String,
        tier: u32,
        role: RoleCategory,
        hero: bool,
    ) -> Result<UnitId, CatalogError> {
        if self.index.contains_key(&key) {
            return Err(CatalogError::DuplicateUnit(key));
        }
        let id = UnitId::new(self.units.len());
        self.index.insert(key.clone(), id);
        self.units.push(UnitDef {
            key,
            name,
            tier,
            role,
            hero,
            upgrades: PromotionTargets::new(),
        });
        Ok(id)
    }

    #[must_use]
    pub fn find(&self, key: &str) -> Option<UnitId> {
        self.index.get(key).copied()
    }

    fn resolve(&self, key: &str) -> Result<UnitId, CatalogError> {
        self.find(key)
            .ok_or_else(|| CatalogError::UnknownUnit(key.to_string()))
    }

    fn key_of(&self, unit: UnitId) -> String {
        self.units
            .get(unit.index())
            .map_or_else(|| unit.to_string(), |def| def.key.clone())
    }

    /// Append `to` to the promotion targets of `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown or the link is a self-promotion.
    pub fn link(&mut self, from: UnitId, to: UnitId) -> Result<&mut Self, CatalogError> {
        if to.index() >= self.units.len() {
            return Err(CatalogError::UnknownTarget {
                unit: self.key_of(from),
                target: to.to_string(),
            });
        }
        if from == to {
            return Err(CatalogError::SelfPromotion(self.key_of(from)));
        }
        let Some(def) = self.units.get_mut(from.index()) else {
            return Err(CatalogError::UnknownUnit(from.to_string()));
        };
        def.upgrades.push(to);
        Ok(self)
    }

    /// Finish construction, rejecting cyclic promotion relations.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Cycle`] with the offending path.
    pub fn build(self) -> Result<UnitCatalog, CatalogError> {
        if let Some(path) = find_cycle(&self.units) {
            let path = path.into_iter().map(|id| self.key_of(id)).collect();
            return Err(CatalogError::Cycle { path });
        }
        Ok(UnitCatalog {
            units: self.units,
            index: self.index,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Active,
    Done,
}

fn find_cycle(units: &[UnitDef]) -> Option<Vec<UnitId>> {
    let mut marks = vec![Visit::Unseen; units.len()];
    let mut stack = Vec::new();
    for idx in 0..units.len() {
        if marks[idx] == Visit::Unseen
            && let Some(path) = visit(units, UnitId::new(idx), &mut marks, &mut stack)
        {
            return Some(path);
        }
    }
    None
}

fn visit(
    units: &[UnitDef],
    unit: UnitId,
    marks: &mut [Visit],
    stack: &mut Vec<UnitId>,
) -> Option<Vec<UnitId>> {
    marks[unit.index()] = Visit::Active;
    stack.push(unit);
    for &next in &units[unit.index()].upgrades {
        match marks[next.index()] {
            Visit::Active => {
                let start = stack.iter().position(|&id| id == next).unwrap_or(0);
                let mut path = stack[start..].to_vec();
                path.push(next);
                return Some(path);
            }
            Visit::Unseen => {
                if let Some(path) = visit(units, next, marks, stack) {
                    return Some(path);
                }
            }
            Visit::Done => {}
        }
    }
    stack.pop();
    marks[unit.index()] = Visit::Done;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_loads_and_links() {
        let catalog = UnitCatalog::load_from_static();
        assert!(!catalog.is_empty());
        let recruit = catalog.find("recruit").expect("recruit defined");
        let targets: Vec<String> = catalog
            .promotion_targets(recruit)
            .iter()
            .map(|&id| catalog.key_of(id))
            .collect();
        assert_eq!(targets, vec!["footman", "bowman", "light_rider"]);
        assert_eq!(catalog.max_tier(), 5);
        let captain = catalog.find("captain").unwrap();
        assert!(catalog.is_hero(captain));
    }

    #[test]
    fn from_json_defaults_name_and_upgrades() {
        let json = r#"{
            "units": [
                { "id": "levy", "tier": 1, "role": "infantry", "upgrades": ["guard"] },
                { "id": "guard", "name": "Town Guard", "tier": 2, "role": "infantry" }
            ]
        }"#;
        let catalog = UnitCatalog::from_json(json).unwrap();
        let levy = catalog.resolve("levy").unwrap();
        assert_eq!(catalog.get(levy).unwrap().name, "levy");
        let guard = catalog.resolve("guard").unwrap();
        assert!(catalog.is_terminal(guard, 5));
        assert!(!catalog.is_terminal(levy, 2));
        assert!(catalog.is_terminal(levy, 1));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let json = r#"{ "units": [ { "id": "levy", "tier": 1, "role": "infantry", "upgrades": ["ghost"] } ] }"#;
        let err = UnitCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTarget { ref target, .. } if target == "ghost"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add_unit("levy", 1, RoleCategory::Infantry).unwrap();
        let err = builder
            .add_unit("levy", 2, RoleCategory::Ranged)
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateUnit(_)));
    }

    #[test]
    fn cycles_are_reported_with_path() {
        let mut builder = CatalogBuilder::new();
        let a = builder.add_unit("a", 1, RoleCategory::Infantry).unwrap();
        let b = builder.add_unit("b", 2, RoleCategory::Infantry).unwrap();
        let c = builder.add_unit("c", 3, RoleCategory::Infantry).unwrap();
        builder.link(a, b).unwrap().link(b, c).unwrap().link(c, a).unwrap();
        let err = builder.build().unwrap_err();
        assert_eq!(err.to_string(), "promotion cycle detected: a -> b -> c -> a");
    }

    #[test]
    fn self_promotion_is_rejected() {
        let mut builder = CatalogBuilder::new();
        let a = builder.add_unit("a", 1, RoleCategory::Cavalry).unwrap();
        assert!(matches!(
            builder.link(a, a),
            Err(CatalogError::SelfPromotion(_))
        ));
    }

    #[test]
    fn shared_descendants_are_not_cycles() {
        let mut builder = CatalogBuilder::new();
        let a = builder.add_unit("a", 1, RoleCategory::Infantry).unwrap();
        let b = builder.add_unit("b", 2, RoleCategory::Infantry).unwrap();
        let c = builder.add_unit("c", 2, RoleCategory::Ranged).unwrap();
        let d = builder.add_unit("d", 3, RoleCategory::Ranged).unwrap();
        builder.link(a, b).unwrap();
        builder.link(a, c).unwrap();
        builder.link(b, d).unwrap();
        builder.link(c, d).unwrap();
        assert!(builder.build().is_ok());
    }
}
