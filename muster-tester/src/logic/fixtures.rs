use anyhow::{Context, Result};
use muster_core::{
    RatioRequest, Roster, UnitCatalog, UpgradeConfig, UpgradeEngine, UpgradeReport,
    UpgradeRequest,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const MAX_BATCH: u64 = 400;
const UNIT_PICK_CHANCE: f64 = 0.4;
const HERO_PICK_CHANCE: f64 = 0.25;
const RATIO_SPECIFIED_CHANCE: f64 = 0.6;

/// Catalog plus a validated engine, shared by every scenario.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub catalog: UnitCatalog,
    pub engine: UpgradeEngine,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self {
            catalog: UnitCatalog::load_from_static(),
            engine: UpgradeEngine::default(),
        }
    }

    /// Load overrides from JSON files, falling back to bundled data.
    pub fn load(catalog_path: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        if catalog_path.is_none() && config_path.is_none() {
            return Ok(Self::load_default());
        }
        let catalog = match catalog_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                UnitCatalog::from_json(&json)
                    .with_context(|| format!("invalid unit catalog {}", path.display()))?
            }
            None => UnitCatalog::load_from_static(),
        };
        let config = match config_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                UpgradeConfig::from_json(&json)
                    .with_context(|| format!("invalid upgrade config {}", path.display()))?
            }
            None => UpgradeConfig::default(),
        };
        let engine = UpgradeEngine::new(config).context("upgrade config failed validation")?;
        log::debug!(
            "loaded {} units (max tier {})",
            catalog.len(),
            catalog.max_tier()
        );
        Ok(Self { catalog, engine })
    }
}

/// Seeded roster and request for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub seed: u64,
    pub roster: Roster,
    pub request: UpgradeRequest,
}

impl Fixture {
    #[must_use]
    pub fn generate(catalog: &UnitCatalog, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut roster = Roster::new();
        for (unit, def) in catalog.units() {
            if def.hero {
                if rng.gen_bool(HERO_PICK_CHANCE) {
                    roster.insert(unit, 1);
                }
            } else if rng.gen_bool(UNIT_PICK_CHANCE) {
                roster.insert(unit, rng.gen_range(1..=MAX_BATCH));
            }
        }
        let target_tier = rng.gen_range(0..=catalog.max_tier() + 1);
        let ratio = |rng: &mut ChaCha8Rng| {
            rng.gen_bool(RATIO_SPECIFIED_CHANCE)
                .then(|| rng.gen_range(0.0..=1.0))
        };
        let ratios = RatioRequest::new(ratio(&mut rng), ratio(&mut rng), ratio(&mut rng));
        Self {
            seed,
            roster,
            request: UpgradeRequest::new(target_tier).with_ratios(ratios),
        }
    }
}

/// Result of running one fixture through the engine.
#[derive(Debug, Clone)]
pub struct PromotionRun<'a> {
    pub assets: &'a TesterAssets,
    pub fixture: Fixture,
    pub after: Roster,
    pub report: UpgradeReport,
}

impl<'a> PromotionRun<'a> {
    pub fn execute(assets: &'a TesterAssets, fixture: Fixture) -> Result<Self> {
        let (after, report) = assets
            .engine
            .upgraded(&assets.catalog, &fixture.roster, &fixture.request)
            .with_context(|| format!("upgrade failed for seed {}", fixture.seed))?;
        Ok(Self {
            assets,
            fixture,
            after,
            report,
        })
    }

    #[must_use]
    pub const fn before(&self) -> &Roster {
        &self.fixture.roster
    }

    #[must_use]
    pub const fn target_tier(&self) -> u32 {
        self.fixture.request.target_tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_reproducible() {
        let catalog = UnitCatalog::load_from_static();
        assert_eq!(
            Fixture::generate(&catalog, 42),
            Fixture::generate(&catalog, 42)
        );
        assert!(Fixture::generate(&catalog, 42).request.target_tier <= catalog.max_tier() + 1);
    }

    #[test]
    fn run_keeps_input_roster() {
        let assets = TesterAssets::load_default();
        let fixture = Fixture::generate(&assets.catalog, 7);
        let run = PromotionRun::execute(&assets, fixture.clone()).unwrap();
        assert_eq!(run.before(), &fixture.roster);
        assert_eq!(run.after.total(), fixture.roster.total());
    }

    #[test]
    fn missing_override_files_are_reported() {
        let err = TesterAssets::load(Some(Path::new("/nonexistent/units.json")), None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }
}
