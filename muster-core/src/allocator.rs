//! Splitting a batch of units across the branches of a promotion fork.
//!
//! Each branch is scored by the adjusted weights of the roles it can still
//! finish in, then the batch is divided proportionally. Every branch except
//! the last is rounded independently and the last absorbs the remainder, so
//! the split always sums to the batch size.
use smallvec::SmallVec;

use crate::catalog::PromotionGraph;
use crate::deficit::AdjustedWeights;
use crate::numbers::{round_f64_to_u64, u64_to_f64, usize_to_f64};
use crate::reachability::{CycleError, ReachabilityCache, RoleSet};
use crate::unit::UnitId;

/// Score of one promotion branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchScore {
    pub target: UnitId,
    pub reach: RoleSet,
    pub score: f64,
}

/// Non-zero head counts per promotion target, in definition order.
pub type Allocation = SmallVec<[(UnitId, u64); 4]>;

/// Score every direct target of a fork.
///
/// # Errors
///
/// Propagates [`CycleError`] from the reachability analysis.
pub fn score_branches<G>(
    graph: &G,
    cache: &mut ReachabilityCache,
    weights: &AdjustedWeights,
    targets: &[UnitId],
    target_tier: u32,
    min_score: f64,
) -> Result<SmallVec<[BranchScore; 4]>, CycleError>
where
    G: PromotionGraph + ?Sized,
{
    let mut scored = SmallVec::new();
    for &target in targets {
        let reach = cache.reachable(graph, target, target_tier)?;
        let raw = if reach.is_empty() {
            weights.weight(graph.role(target))
        } else {
            reach.iter().map(|role| weights.weight(role)).sum::<f64>() / usize_to_f64(reach.len())
        };
        scored.push(BranchScore {
            target,
            reach,
            score: raw.max(min_score),
        });
    }
    Ok(scored)
}

/// Divide `count` proportionally to `scores`; the result sums to `count`.
///
/// Shares that cannot be formed (no positive total) fall back to an even split.
#[must_use]
pub fn split_count(count: u64, scores: &[f64]) -> SmallVec<[u64; 4]> {
    let mut parts = SmallVec::new();
    let Some(last) = scores.len().checked_sub(1) else {
        return parts;
    };
    let total: f64 = scores.iter().sum();
    let even = 1.0 / usize_to_f64(scores.len());
    let mut remaining = count;
    for (idx, &score) in scores.iter().enumerate() {
        if idx == last {
            parts.push(remaining);
            break;
        }
        let share = if total > 0.0 { score / total } else { even };
        let allocated = round_f64_to_u64(u64_to_f64(count) * share).min(remaining);
        remaining -= allocated;
        parts.push(allocated);
    }
    parts
}

/// Distribute `count` units of `unit` across its promotion targets.
///
/// # Errors
///
/// Propagates [`CycleError`] from the reachability analysis.
pub fn allocate_branches<G>(
    graph: &G,
    cache: &mut ReachabilityCache,
    weights: &AdjustedWeights,
    unit: UnitId,
    count: u64,
    target_tier: u32,
    min_score: f64,
) -> Result<Allocation, CycleError>
where
    G: PromotionGraph + ?Sized,
{
    let targets = graph.promotion_targets(unit);
    if count == 0 || targets.is_empty() {
        return Ok(Allocation::new());
    }
    let scored = score_branches(graph, cache, weights, targets, target_tier, min_score)?;
    let scores: SmallVec<[f64; 4]> = scored.iter().map(|branch| branch.score).collect();
    let parts = split_count(count, &scores);

    let allocation: Allocation = scored
        .iter()
        .zip(parts)
        .filter(|&(_, amount)| amount > 0)
        .map(|(branch, amount)| (branch.target, amount))
        .collect();
    log::trace!(
        "split {count} of {unit} across {} branches: {allocation:?}",
        scored.len()
    );
    Ok(allocation)
}
