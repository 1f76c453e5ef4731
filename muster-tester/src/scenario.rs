use anyhow::{Result, ensure};
use muster_core::{PromotionGraph, ReachabilityCache, RosterSummary};
use std::collections::BTreeMap;

use crate::logic::PromotionRun;

pub type Expectation = fn(&PromotionRun<'_>) -> Result<()>;

/// A named set of checks applied to every seeded run.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub expectations: Vec<Expectation>,
}

impl TestScenario {
    const fn new(key: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            key,
            name,
            description,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }
}

fn scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new("smoke", "Smoke", "Upgrade completes and reports a consistent summary")
            .with_expectation(report_matches_rosters),
        TestScenario::new("conservation", "Head Count Conservation", "No unit is created or lost")
            .with_expectation(head_count_conserved),
        TestScenario::new(
            "terminality",
            "Terminal Rosters",
            "Every surviving troop sits at the ceiling or a dead end",
        )
        .with_expectation(all_units_terminal),
        TestScenario::new(
            "idempotence",
            "Idempotent Ceiling",
            "A second pass at the same ceiling moves nothing",
        )
        .with_expectation(second_pass_is_no_op),
        TestScenario::new(
            "locked-roles",
            "Locked Roles",
            "Units with a single reachable role finish in that role",
        )
        .with_expectation(locked_roles_hold),
        TestScenario::new("determinism", "Determinism", "Identical input yields identical output")
            .with_expectation(repeat_run_matches),
        TestScenario::new("heroes", "Heroes Untouched", "Hero counts never change")
            .with_expectation(heroes_untouched),
    ]
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

pub fn get_scenario(key: &str) -> Option<TestScenario> {
    scenarios().into_iter().find(|scenario| scenario.key == key)
}

fn report_matches_rosters(run: &PromotionRun<'_>) -> Result<()> {
    let catalog = &run.assets.catalog;
    ensure!(
        run.report.before == RosterSummary::summarize(catalog, run.before()),
        "report 'before' summary disagrees with the input roster"
    );
    ensure!(
        run.report.after == RosterSummary::summarize(catalog, &run.after),
        "report 'after' summary disagrees with the promoted roster"
    );
    let tolerance = run.assets.engine.config().ratio_tolerance;
    ensure!(
        (run.report.ratios.sum() - 1.0).abs() <= tolerance + f64::EPSILON,
        "ratios {:?} are not normalized",
        run.report.ratios
    );
    Ok(())
}

fn head_count_conserved(run: &PromotionRun<'_>) -> Result<()> {
    let before = run.before().total();
    let after = run.after.total();
    ensure!(before == after, "head count changed from {before} to {after}");
    ensure!(
        run.report.moved <= before,
        "moved {} exceeds roster size {before}",
        run.report.moved
    );
    Ok(())
}

fn all_units_terminal(run: &PromotionRun<'_>) -> Result<()> {
    let catalog = &run.assets.catalog;
    for (unit, count) in run.after.iter() {
        if catalog.is_hero(unit) {
            continue;
        }
        ensure!(
            catalog.is_terminal(unit, run.target_tier()),
            "{count} x {} left below tier {}",
            catalog.key_of(unit),
            run.target_tier()
        );
    }
    Ok(())
}

fn second_pass_is_no_op(run: &PromotionRun<'_>) -> Result<()> {
    let (again, report) =
        run.assets
            .engine
            .upgraded(&run.assets.catalog, &run.after, &run.fixture.request)?;
    ensure!(again == run.after, "second pass changed the roster");
    ensure!(report.moved == 0, "second pass moved {} troops", report.moved);
    Ok(())
}

fn locked_roles_hold(run: &PromotionRun<'_>) -> Result<()> {
    let catalog = &run.assets.catalog;
    let mut cache = ReachabilityCache::new();
    let mut locked = BTreeMap::new();
    for (unit, count) in run.before().iter() {
        if catalog.is_hero(unit) {
            continue;
        }
        if let Some(role) = cache.reachable(catalog, unit, run.target_tier())?.locked_role() {
            *locked.entry(role).or_insert(0_u64) += count;
        }
    }
    for (role, expected) in locked {
        let finished = run.report.after.count(role);
        ensure!(
            finished >= expected,
            "{expected} troops were locked to {role} but only {finished} finished there"
        );
    }
    Ok(())
}

fn repeat_run_matches(run: &PromotionRun<'_>) -> Result<()> {
    let (again, report) =
        run.assets
            .engine
            .upgraded(&run.assets.catalog, run.before(), &run.fixture.request)?;
    ensure!(again == run.after, "repeat run produced a different roster");
    ensure!(report == run.report, "repeat run produced a different report");
    Ok(())
}

fn heroes_untouched(run: &PromotionRun<'_>) -> Result<()> {
    let catalog = &run.assets.catalog;
    for (unit, count) in run.before().iter().filter(|(unit, _)| catalog.is_hero(*unit)) {
        let after = run.after.count(unit);
        ensure!(
            after == count,
            "hero {} changed from {count} to {after}",
            catalog.key_of(unit)
        );
    }
    Ok(())
}
