//! Roster-wide promotion pass.
//!
//! Every non-hero roster entry is promoted until it reaches the tier ceiling
//! or a unit with no promotion targets. Straight chains are followed inline;
//! forks split the batch via the allocator and re-enqueue each share. All
//! count changes go through one [`CountLedger`] that is applied at the end.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::allocator::{Allocation, allocate_branches};
use crate::catalog::PromotionGraph;
use crate::config::{ConfigError, UpgradeConfig};
use crate::deficit::{AdjustedWeights, CompositionPlan, CompositionTally, compute_adjusted_weights};
use crate::ledger::CountLedger;
use crate::ratios::{RatioRequest, RatioTriple, normalize_ratios};
use crate::reachability::{CycleError, ReachabilityCache};
use crate::roster::{Roster, RosterSummary};
use crate::unit::UnitId;

/// Errors raised by the upgrade pass. None occur for a well-formed graph.
#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("roster references unit {0} missing from the promotion graph")]
    UnknownUnit(UnitId),
    #[error(transparent)]
    CyclicPromotion(#[from] CycleError),
    #[error("roster head count does not fit in 64 bits")]
    HeadCountOverflow,
    #[error("applying promotions would push the count of unit {unit} out of range")]
    CountOverflow { unit: UnitId },
    #[error("invalid upgrade configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Parameters of one upgrade pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    pub target_tier: u32,
    #[serde(default)]
    pub ratios: RatioRequest,
}

impl UpgradeRequest {
    #[must_use]
    pub fn new(target_tier: u32) -> Self {
        Self {
            target_tier,
            ratios: RatioRequest::default(),
        }
    }

    #[must_use]
    pub const fn with_ratios(mut self, ratios: RatioRequest) -> Self {
        self.ratios = ratios;
        self
    }
}

/// What happened during a pass, for before/after reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeReport {
    pub target_tier: u32,
    pub ratios: RatioTriple,
    pub plan: CompositionPlan,
    pub before: RosterSummary,
    pub after: RosterSummary,
    /// Units whose starting type had to promote. Intermediate steps of a
    /// chain are not counted again.
    pub moved: u64,
    /// Forks resolved through the allocator.
    pub splits: u32,
    /// Batches taken off the work queue.
    pub batches: u32,
}

/// A queued group of identical units awaiting promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Batch {
    unit: UnitId,
    count: u64,
}

#[derive(Debug)]
enum BatchOutcome {
    /// Reached a terminal unit; nothing further to do.
    Promoted(Batch),
    /// Hit a fork; each share continues as its own batch.
    Split { from: Batch, shares: Allocation },
}

/// Promotion engine carrying a validated configuration.
#[derive(Debug, Clone, Default)]
pub struct UpgradeEngine {
    config: UpgradeConfig,
}

impl UpgradeEngine {
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: UpgradeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// Promote `roster` in place using a fresh reachability cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster names units unknown to `graph`, its head
    /// count does not fit in a `u64`, or the graph contains a promotion cycle.
    pub fn upgrade<G>(
        &self,
        graph: &G,
        roster: &mut Roster,
        request: &UpgradeRequest,
    ) -> Result<UpgradeReport, UpgradeError>
    where
        G: PromotionGraph + ?Sized,
    {
        let mut cache = ReachabilityCache::new();
        self.upgrade_with_cache(graph, roster, request, &mut cache)
    }

    /// Pure variant of [`upgrade`](Self::upgrade) returning a new roster.
    ///
    /// # Errors
    ///
    /// Same as [`upgrade`](Self::upgrade).
    pub fn upgraded<G>(
        &self,
        graph: &G,
        roster: &Roster,
        request: &UpgradeRequest,
    ) -> Result<(Roster, UpgradeReport), UpgradeError>
    where
        G: PromotionGraph + ?Sized,
    {
        let mut promoted = roster.clone();
        let report = self.upgrade(graph, &mut promoted, request)?;
        Ok((promoted, report))
    }

    /// Promote `roster` in place, reusing a caller-owned cache.
    ///
    /// The cache is keyed by target tier, so it may be shared across passes
    /// over the same graph.
    ///
    /// # Errors
    ///
    /// Same as [`upgrade`](Self::upgrade). The roster is unchanged on error.
    pub fn upgrade_with_cache<G>(
        &self,
        graph: &G,
        roster: &mut Roster,
        request: &UpgradeRequest,
        cache: &mut ReachabilityCache,
    ) -> Result<UpgradeReport, UpgradeError>
    where
        G: PromotionGraph + ?Sized,
    {
        if let Some((unit, _)) = roster.iter().find(|(unit, _)| !graph.contains(*unit)) {
            return Err(UpgradeError::UnknownUnit(unit));
        }
        if roster.checked_total().is_none() {
            return Err(UpgradeError::HeadCountOverflow);
        }
        let target_tier = request.target_tier;
        let before = RosterSummary::summarize(graph, roster);
        let ratios = normalize_ratios(&request.ratios, &self.config);

        let pending: Vec<Batch> = roster
            .iter()
            .filter(|&(unit, count)| count > 0 && !graph.is_hero(unit))
            .map(|(unit, count)| Batch { unit, count })
            .collect();

        let mut tally = CompositionTally::default();
        for batch in &pending {
            tally.record(cache.reachable(graph, batch.unit, target_tier)?, batch.count);
        }
        let plan = compute_adjusted_weights(&tally, &ratios);
        log::debug!(
            "upgrading {} troops to tier {target_tier}: ratios {ratios:?}, locked {:?}, flexible {}, weights {:?}",
            tally.total,
            tally.locked,
            tally.flexible,
            plan.weights
        );

        let mut queue: VecDeque<Batch> = pending.into();
        let mut ledger = CountLedger::new();
        let mut splits = 0_u32;
        let mut batches = 0_u32;
        while let Some(batch) = queue.pop_front() {
            batches += 1;
            match self.promote_batch(graph, cache, &plan.weights, batch, target_tier, &mut ledger)? {
                BatchOutcome::Promoted(done) => {
                    log::trace!("{} x{} settled", done.unit, done.count);
                }
                BatchOutcome::Split { from, shares } => {
                    splits += 1;
                    log::trace!("{} x{} forked into {shares:?}", from.unit, from.count);
                    queue.extend(shares.into_iter().map(|(unit, count)| Batch { unit, count }));
                }
            }
        }

        debug_assert!(ledger.is_balanced(), "promotion must conserve head count");
        ledger
            .apply(roster)
            .map_err(|unit| UpgradeError::CountOverflow { unit })?;

        let after = RosterSummary::summarize(graph, roster);
        let moved = ledger.moved();
        log::debug!("promotion moved {moved} troops across {splits} forks");

        Ok(UpgradeReport {
            target_tier,
            ratios,
            plan,
            before,
            after,
            moved,
            splits,
            batches,
        })
    }

    /// Follow single-target chains inline; stop at a terminal unit or a fork.
    fn promote_batch<G>(
        &self,
        graph: &G,
        cache: &mut ReachabilityCache,
        weights: &AdjustedWeights,
        batch: Batch,
        target_tier: u32,
        ledger: &mut CountLedger,
    ) -> Result<BatchOutcome, CycleError>
    where
        G: PromotionGraph + ?Sized,
    {
        let mut unit = batch.unit;
        while !graph.is_terminal(unit, target_tier) {
            if let &[only] = graph.promotion_targets(unit) {
                ledger.transfer(unit, only, batch.count);
                unit = only;
                continue;
            }
            let shares = allocate_branches(
                graph,
                cache,
                weights,
                unit,
                batch.count,
                target_tier,
                self.config.min_branch_score,
            )?;
            for &(target, amount) in &shares {
                ledger.transfer(unit, target, amount);
            }
            return Ok(BatchOutcome::Split {
                from: Batch {
                    unit,
                    count: batch.count,
                },
                shares,
            });
        }
        Ok(BatchOutcome::Promoted(Batch {
            unit,
            count: batch.count,
        }))
    }
}

/// Promote `roster` in place to `target_tier`, steering toward the given
/// ratios with the default configuration.
///
/// # Errors
///
/// See [`UpgradeEngine::upgrade`].
pub fn upgrade_roster<G>(
    graph: &G,
    roster: &mut Roster,
    target_tier: u32,
    ranged_ratio: Option<f64>,
    cavalry_ratio: Option<f64>,
    infantry_ratio: Option<f64>,
) -> Result<UpgradeReport, UpgradeError>
where
    G: PromotionGraph + ?Sized,
{
    let request = UpgradeRequest::new(target_tier).with_ratios(RatioRequest::new(
        ranged_ratio,
        cavalry_ratio,
        infantry_ratio,
    ));
    UpgradeEngine::default().upgrade(graph, roster, &request)
}
