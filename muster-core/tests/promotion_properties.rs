use muster_core::{
    CatalogBuilder, PromotionGraph, RatioRequest, ReachabilityCache, RoleCategory, Roster,
    RosterSummary, UnitCatalog, UnitId, UpgradeEngine, UpgradeRequest, normalize_ratios,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

const SEEDS: std::ops::Range<u64> = 0..64;
const ROLES: [RoleCategory; 4] = RoleCategory::ALL;

/// Random layered DAG: every edge climbs at least one tier, so no cycles.
fn random_catalog(rng: &mut ChaCha8Rng) -> UnitCatalog {
    let mut builder = CatalogBuilder::new();
    let mut by_tier: Vec<Vec<UnitId>> = Vec::new();
    for tier in 0..6_u32 {
        let width = rng.gen_range(1..5);
        let mut layer = Vec::new();
        for slot in 0..width {
            let role = ROLES[rng.gen_range(0..ROLES.len())];
            let id = builder
                .add_unit(&format!("t{tier}-{slot}"), tier, role)
                .unwrap();
            layer.push(id);
        }
        by_tier.push(layer);
    }
    for tier in 0..by_tier.len() - 1 {
        for &unit in &by_tier[tier] {
            let fan_out = rng.gen_range(0..4);
            let mut linked = Vec::new();
            for _ in 0..fan_out {
                let up = rng.gen_range(tier + 1..by_tier.len().min(tier + 3));
                let target = by_tier[up][rng.gen_range(0..by_tier[up].len())];
                if !linked.contains(&target) {
                    builder.link(unit, target).unwrap();
                    linked.push(target);
                }
            }
        }
    }
    builder.build().unwrap()
}

fn random_roster(rng: &mut ChaCha8Rng, catalog: &UnitCatalog) -> Roster {
    let mut roster = Roster::new();
    for (unit, _) in catalog.units() {
        if rng.gen_bool(0.5) {
            roster.insert(unit, rng.gen_range(1..250_u64));
        }
    }
    roster
}

fn random_ratios(rng: &mut ChaCha8Rng) -> RatioRequest {
    let pick = |rng: &mut ChaCha8Rng| rng.gen_bool(0.5).then(|| rng.r#gen::<f64>());
    RatioRequest::new(pick(rng), pick(rng), pick(rng))
}

fn random_case(seed: u64) -> (UnitCatalog, Roster, UpgradeRequest) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let catalog = random_catalog(&mut rng);
    let roster = random_roster(&mut rng, &catalog);
    let request = UpgradeRequest::new(rng.gen_range(0..7)).with_ratios(random_ratios(&mut rng));
    (catalog, roster, request)
}

#[test]
fn head_count_is_conserved() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, mut roster, request) = random_case(seed);
        let before = roster.total();
        let report = engine.upgrade(&catalog, &mut roster, &request).unwrap();
        assert_eq!(roster.total(), before, "seed {seed} changed head count");
        assert_eq!(report.after.total, report.before.total);
    }
}

#[test]
fn every_surviving_unit_is_terminal() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, mut roster, request) = random_case(seed);
        engine.upgrade(&catalog, &mut roster, &request).unwrap();
        for (unit, _) in roster.iter() {
            assert!(
                catalog.is_terminal(unit, request.target_tier),
                "seed {seed}: {} left below tier {}",
                catalog.key_of(unit),
                request.target_tier
            );
        }
    }
}

#[test]
fn second_pass_at_same_ceiling_is_a_no_op() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, mut roster, request) = random_case(seed);
        engine.upgrade(&catalog, &mut roster, &request).unwrap();
        let settled = roster.clone();
        let report = engine.upgrade(&catalog, &mut roster, &request).unwrap();
        assert_eq!(roster, settled, "seed {seed} moved units on the second pass");
        assert_eq!(report.moved, 0);
        assert_eq!(report.splits, 0);
    }
}

#[test]
fn normalized_ratios_always_total_one() {
    let config = muster_core::UpgradeConfig::default();
    for seed in SEEDS {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let triple = normalize_ratios(&random_ratios(&mut rng), &config);
        assert!(
            (triple.sum() - 1.0).abs() <= config.ratio_tolerance,
            "seed {seed} produced {triple:?}"
        );
    }
}

#[test]
fn locked_units_keep_their_role() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, roster, request) = random_case(seed);
        let mut cache = ReachabilityCache::new();
        for (unit, count) in roster.iter() {
            let reach = cache
                .reachable(&catalog, unit, request.target_tier)
                .unwrap();
            let Some(role) = reach.locked_role() else {
                continue;
            };
            let mut alone = Roster::from_counts([(unit, count)]).unwrap();
            engine.upgrade(&catalog, &mut alone, &request).unwrap();
            let summary = RosterSummary::summarize(&catalog, &alone);
            assert_eq!(
                summary.count(role),
                count,
                "seed {seed}: locked {} drifted away from {role}",
                catalog.key_of(unit)
            );
        }
    }
}

#[test]
fn locked_only_rosters_keep_role_totals() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, roster, request) = random_case(seed);
        let mut cache = ReachabilityCache::new();
        let mut expected: BTreeMap<RoleCategory, u64> = BTreeMap::new();
        let mut locked = Roster::new();
        for (unit, count) in roster.iter() {
            if let Some(role) = cache
                .reachable(&catalog, unit, request.target_tier)
                .unwrap()
                .locked_role()
            {
                *expected.entry(role).or_default() += count;
                locked.insert(unit, count);
            }
        }
        engine.upgrade(&catalog, &mut locked, &request).unwrap();
        let summary = RosterSummary::summarize(&catalog, &locked);
        assert_eq!(summary.by_role, expected, "seed {seed}");
    }
}

#[test]
fn upgrades_are_deterministic() {
    let engine = UpgradeEngine::default();
    for seed in SEEDS {
        let (catalog, roster, request) = random_case(seed);
        let (first, _) = engine.upgraded(&catalog, &roster, &request).unwrap();
        let (second, _) = engine.upgraded(&catalog, &roster, &request).unwrap();
        assert_eq!(first, second, "seed {seed}");
    }
}
