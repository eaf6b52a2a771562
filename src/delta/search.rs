//! Incremental re-distribution search: the [`EvoProblem`] wiring.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rand::Rng;

use super::operators::{crossover_deltas, mutate_delta};
use super::types::DistributionDelta;
use crate::constraints::ConstraintSet;
use crate::distribution::Distribution;
use crate::error::DistributeError;
use crate::evo::{EvoProblem, Individual};
use crate::item::{ItemArena, ItemId};

/// A delta paired with its cached fitness.
///
/// Fitness always comes from materializing the current delta state;
/// it is cached per evaluation, never derived incrementally.
#[derive(Clone)]
pub struct DeltaCandidate {
    pub delta: DistributionDelta,
    fitness: f64,
}

impl DeltaCandidate {
    pub fn new(delta: DistributionDelta) -> Self {
        Self {
            delta,
            fitness: f64::INFINITY,
        }
    }
}

impl Individual for DeltaCandidate {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

/// Searches for a minimally disruptive delta against a fixed origin:
/// place added items, absorb removed bins, and adjust the bin count,
/// while modifying at most `max_touched` distinct bins.
pub struct DeltaProblem {
    origin: Arc<Distribution>,
    added: Vec<ItemId>,
    removed_origin_bins: BTreeSet<usize>,
    max_touched: usize,
    bin_count_delta: i32,
    constraints: ConstraintSet,
}

impl DeltaProblem {
    /// Validates the re-distribution setup.
    ///
    /// The origin must already reflect external removals; the bins the
    /// removals came from are passed separately so they count against
    /// the budget. `target_bin_count` is the bin count of the result.
    pub fn new(
        arena: Arc<ItemArena>,
        origin: Distribution,
        added: Vec<ItemId>,
        removed_origin_bins: BTreeSet<usize>,
        max_touched: usize,
        target_bin_count: usize,
        group_weights: &HashMap<String, f64>,
    ) -> Result<Self, DistributeError> {
        if target_bin_count == 0 {
            return Err(DistributeError::InvalidSetup(
                "target bin count must be at least 1".into(),
            ));
        }
        let bin_count_delta = target_bin_count as i32 - origin.bin_count() as i32;
        let drained_bin_count = (-bin_count_delta).max(0) as usize;
        if drained_bin_count >= target_bin_count {
            return Err(DistributeError::InvalidSetup(format!(
                "cannot shrink {} bins to {}: too few survivors to absorb drained items",
                origin.bin_count(),
                target_bin_count
            )));
        }
        if let Some(&out_of_range) = removed_origin_bins
            .iter()
            .find(|&&index| index >= origin.bin_count())
        {
            return Err(DistributeError::InvalidSetup(format!(
                "removed origin bin {out_of_range} does not exist"
            )));
        }
        if let Some(&bad) = added
            .iter()
            .chain(origin.item_ids().collect::<Vec<_>>().iter())
            .find(|id| id.0 as usize >= arena.len())
        {
            return Err(DistributeError::InvalidSetup(format!(
                "item id {} is not in the arena",
                bad.0
            )));
        }

        // Structurally forced touches; one extra target slot is needed
        // when nothing forced can serve as a placement target.
        let added_bin_count = bin_count_delta.max(0) as usize;
        let structural = removed_origin_bins.len() + added_bin_count;
        let needs_target =
            (!added.is_empty() || drained_bin_count > 0) && added_bin_count == 0;
        let minimum = structural + usize::from(needs_target);
        if max_touched < minimum {
            return Err(DistributeError::InvalidSetup(format!(
                "disruption budget {max_touched} below the structural minimum {minimum}"
            )));
        }

        let mut all_ids: Vec<ItemId> = origin.item_ids().collect();
        all_ids.extend(added.iter().copied());
        if all_ids.is_empty() {
            return Err(DistributeError::InvalidSetup("no items to distribute".into()));
        }
        let constraints =
            ConstraintSet::standard(arena, &all_ids, target_bin_count, group_weights);

        Ok(Self {
            origin: Arc::new(origin),
            added,
            removed_origin_bins,
            max_touched,
            bin_count_delta,
            constraints,
        })
    }

    pub fn origin(&self) -> &Arc<Distribution> {
        &self.origin
    }

    pub fn max_touched(&self) -> usize {
        self.max_touched
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

impl EvoProblem for DeltaProblem {
    type Individual = DeltaCandidate;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> DeltaCandidate {
        DeltaCandidate::new(DistributionDelta::new(
            self.origin.clone(),
            &self.added,
            self.removed_origin_bins.clone(),
            self.max_touched,
            self.bin_count_delta,
            rng,
        ))
    }

    fn evaluate(&self, candidate: &DeltaCandidate) -> f64 {
        self.constraints.total(&candidate.delta.materialize())
    }

    fn crossover<R: Rng>(
        &self,
        p1: &DeltaCandidate,
        p2: &DeltaCandidate,
        rng: &mut R,
    ) -> Vec<DeltaCandidate> {
        let (a, b) = crossover_deltas(&p1.delta, &p2.delta, rng);
        vec![DeltaCandidate::new(a), DeltaCandidate::new(b)]
    }

    fn mutate<R: Rng>(&self, candidate: &mut DeltaCandidate, rng: &mut R) {
        mutate_delta(&mut candidate.delta, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentNode;
    use crate::evo::{Engine, EvoConfig};
    use crate::item::Item;

    fn fixture_arena(count: u32) -> Arc<ItemArena> {
        let mut arena = ItemArena::new();
        for i in 0..count {
            let group: &[&str] = if i % 5 == 0 { &["shared"] } else { &[] };
            arena.insert(Item::new(
                Arc::new(ContentNode::leaf(format!("n{i}"), Vec::<String>::new())),
                1.0 + (i % 4) as f64,
                group.iter().copied(),
            ));
        }
        Arc::new(arena)
    }

    fn ids(range: std::ops::Range<u32>) -> Vec<ItemId> {
        range.map(ItemId).collect()
    }

    #[test]
    fn test_budget_below_structural_minimum_rejected() {
        let arena = fixture_arena(16);
        let origin = Distribution::even(&ids(0..15), 5);
        let err = DeltaProblem::new(
            arena,
            origin,
            ids(15..16),
            BTreeSet::new(),
            0,
            5,
            &HashMap::new(),
        );
        assert!(matches!(err, Err(DistributeError::InvalidSetup(_))));
    }

    #[test]
    fn test_shrinking_below_survivable_count_rejected() {
        let arena = fixture_arena(12);
        let origin = Distribution::even(&ids(0..12), 4);
        let err = DeltaProblem::new(
            arena,
            origin,
            Vec::new(),
            BTreeSet::new(),
            4,
            2,
            &HashMap::new(),
        );
        assert!(matches!(err, Err(DistributeError::InvalidSetup(_))));
    }

    #[test]
    fn test_out_of_range_removed_bin_rejected() {
        let arena = fixture_arena(12);
        let origin = Distribution::even(&ids(0..12), 4);
        let removed: BTreeSet<usize> = [7].into_iter().collect();
        let err = DeltaProblem::new(
            arena,
            origin,
            Vec::new(),
            removed,
            3,
            4,
            &HashMap::new(),
        );
        assert!(matches!(err, Err(DistributeError::InvalidSetup(_))));
    }

    #[test]
    fn test_delta_search_yields_valid_bounded_result() {
        // Shrink five bins to four while absorbing two new items,
        // touching at most four bins.
        let arena = fixture_arena(17);
        let origin = Distribution::even(&ids(0..15), 5);
        let problem = DeltaProblem::new(
            arena,
            origin.clone(),
            ids(15..17),
            BTreeSet::new(),
            4,
            4,
            &HashMap::new(),
        )
        .expect("valid setup");

        let mut engine = Engine::new(
            problem,
            EvoConfig::default()
                .with_population_size(50)
                .with_seed(7)
                .with_parallel(false),
        )
        .expect("valid config");

        let initial = engine.best().fitness();
        for _ in 0..30 {
            engine.spawn_generation();
        }
        assert!(engine.best().fitness() <= initial);

        let best = &engine.best().delta;
        assert!(best.touched().len() <= 4);
        let result = best.materialize();
        assert_eq!(result.bin_count(), 4);
        let mut all: Vec<ItemId> = result.item_ids().collect();
        all.sort();
        assert_eq!(all, ids(0..17));

        // Untouched surviving origin bins carry over verbatim.
        let touched = best.touched();
        for (index, bin) in origin.bins().iter().enumerate() {
            if !touched.contains(&index) && !best.drained.contains_key(&index) {
                assert!(
                    result.bins().iter().any(|b| b == bin),
                    "untouched bin {index} was modified"
                );
            }
        }
    }
}
