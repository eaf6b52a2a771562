//! Minimally disruptive re-distribution against a fixed origin.
//!
//! A [`DistributionDelta`] records how a candidate differs from an
//! origin distribution instead of re-encoding the whole assignment:
//! item moves keyed by `(origin bin, item index)`, targets for newly
//! added items, and per-bin redistribution plans for bins being
//! drained away. The set of distinct touched bin indices is kept
//! within the disruption budget by construction at every step, never
//! checked after the fact.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::Rng;

use crate::distribution::Distribution;
use crate::item::ItemId;

/// A compact diff against a fixed origin distribution.
///
/// The origin is never mutated; [`materialize`](Self::materialize)
/// replays the recorded changes onto a copy on demand, so the result
/// always reflects the delta's current state.
#[derive(Debug, Clone)]
pub struct DistributionDelta {
    origin: Arc<Distribution>,
    /// Origin bins that lost externally removed items. They will change
    /// no matter what, so they always count against the budget.
    removed_origin_bins: BTreeSet<usize>,
    max_touched: usize,
    bin_count_delta: i32,
    /// (origin bin index, item index in bin) -> target bin index.
    pub(crate) node_moves: BTreeMap<(usize, usize), usize>,
    /// Newly added item -> target bin index.
    pub(crate) added_targets: BTreeMap<ItemId, usize>,
    /// Bin index being drained -> one target per original item, in
    /// front-to-back order. Keys are disjoint from every move, add,
    /// and redistribution target; [`evacuate`](Self::evacuate) restores
    /// that whenever the key set changes.
    pub(crate) drained: BTreeMap<usize, Vec<usize>>,
}

impl DistributionDelta {
    /// Builds a fresh delta: picks which bins to drain (for a negative
    /// bin-count delta), plans a redistribution target for each of
    /// their items, and assigns every added item a target, all under
    /// the disruption budget.
    pub fn new<R: Rng>(
        origin: Arc<Distribution>,
        added: &[ItemId],
        removed_origin_bins: BTreeSet<usize>,
        max_touched: usize,
        bin_count_delta: i32,
        rng: &mut R,
    ) -> Self {
        let mut delta = Self {
            origin,
            removed_origin_bins,
            max_touched,
            bin_count_delta,
            node_moves: BTreeMap::new(),
            added_targets: BTreeMap::new(),
            drained: BTreeMap::new(),
        };

        for _ in 0..delta.drained_bin_count() {
            let index = delta.available_index(rng);
            delta.drained.insert(index, Vec::new());
        }

        let keys: Vec<usize> = delta.drained.keys().copied().collect();
        for key in keys {
            let item_count = delta.origin.bins()[key].len();
            let mut targets = Vec::with_capacity(item_count);
            for _ in 0..item_count {
                targets.push(delta.available_index(rng));
            }
            delta.drained.insert(key, targets);
        }

        debug_assert!(
            delta
                .drained
                .values()
                .flatten()
                .all(|target| !delta.drained.contains_key(target)),
            "redistribution target points at a drained bin"
        );

        for &item in added {
            let target = delta.available_index(rng);
            delta.added_targets.insert(item, target);
        }

        delta.reseed_appended_bins(rng);

        delta
    }

    /// Guarantees every appended bin at least one arrival; without one
    /// materialization would emit an empty bin. Runs at construction
    /// and again after every operator that can remove arrivals, the
    /// same way [`evacuate`](Self::evacuate) repairs the drained set.
    pub(crate) fn reseed_appended_bins<R: Rng>(&mut self, rng: &mut R) {
        let origin_count = self.origin.bin_count();
        for new_bin in origin_count..origin_count + self.added_bin_count() {
            if self.receives_nothing(new_bin) {
                self.seed_new_bin(new_bin, rng);
            }
        }
    }

    fn receives_nothing(&self, index: usize) -> bool {
        !self.node_moves.values().any(|&to| to == index)
            && !self.added_targets.values().any(|&to| to == index)
            && !self
                .drained
                .values()
                .any(|targets| targets.contains(&index))
    }

    /// Points one placement at an empty appended bin: re-targets an
    /// added item parked on an origin bin when possible, otherwise
    /// moves an item out of the best-stocked reachable origin bin.
    fn seed_new_bin<R: Rng>(&mut self, new_bin: usize, rng: &mut R) {
        let origin_count = self.origin.bin_count();
        let donor = self
            .added_targets
            .iter()
            .find(|&(_, &target)| target < origin_count)
            .map(|(&item, _)| item);
        if let Some(item) = donor {
            self.added_targets.insert(item, new_bin);
            return;
        }

        let touched = self.touched();
        let budget_open = touched.len() < self.max_touched;
        let source = (0..origin_count)
            .filter(|index| !self.drained.contains_key(index))
            .filter(|index| budget_open || touched.contains(index))
            .filter(|&index| self.unmoved_indexes(index).len() >= 2)
            .max_by_key(|&index| self.unmoved_indexes(index).len());
        if let Some(from) = source {
            let options = self.unmoved_indexes(from);
            let item_index = options[rng.random_range(0..options.len())];
            self.node_moves.insert((from, item_index), new_bin);
            return;
        }

        // Last resort: redirect an existing move bound for an origin
        // bin. That bin keeps at least one unmoved item of its own, so
        // nothing else empties out.
        let redirect = self
            .node_moves
            .iter()
            .find(|&(_, &to)| to < origin_count)
            .map(|(&key, _)| key);
        if let Some(key) = redirect {
            self.node_moves.insert(key, new_bin);
        }
    }

    /// Item indexes of an origin bin not yet claimed by a move.
    pub(crate) fn unmoved_indexes(&self, from: usize) -> Vec<usize> {
        (0..self.origin.bins()[from].len())
            .filter(|&i| !self.node_moves.contains_key(&(from, i)))
            .collect()
    }

    /// Same origin and structural parameters, no recorded changes yet.
    pub(crate) fn blank(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            removed_origin_bins: self.removed_origin_bins.clone(),
            max_touched: self.max_touched,
            bin_count_delta: self.bin_count_delta,
            node_moves: BTreeMap::new(),
            added_targets: BTreeMap::new(),
            drained: BTreeMap::new(),
        }
    }

    /// Whether `index` can absorb one more placement without blowing
    /// the budget or pointing at a drained bin.
    pub(crate) fn accepts_target(&self, index: usize) -> bool {
        if index >= self.bin_count() || self.drained.contains_key(&index) {
            return false;
        }
        let touched = self.touched();
        touched.contains(&index) || touched.len() < self.max_touched
    }

    pub fn origin(&self) -> &Arc<Distribution> {
        &self.origin
    }

    /// Bin count of the materialized result.
    pub fn bin_count(&self) -> usize {
        (self.origin.bin_count() as i32 + self.bin_count_delta) as usize
    }

    pub fn bin_count_delta(&self) -> i32 {
        self.bin_count_delta
    }

    pub fn added_bin_count(&self) -> usize {
        self.bin_count_delta.max(0) as usize
    }

    pub fn drained_bin_count(&self) -> usize {
        (-self.bin_count_delta).max(0) as usize
    }

    pub fn max_touched(&self) -> usize {
        self.max_touched
    }

    pub fn removed_origin_bins(&self) -> &BTreeSet<usize> {
        &self.removed_origin_bins
    }

    /// Indices an item may be placed into: every index of the final
    /// layout that is not being drained.
    pub fn valid_indexes(&self) -> Vec<usize> {
        (0..self.bin_count())
            .filter(|index| !self.drained.contains_key(index))
            .collect()
    }

    /// Distinct bin indices this delta modifies. Externally removed
    /// bins and appended bins always count; drained bins do not (they
    /// cease to exist).
    pub fn touched(&self) -> BTreeSet<usize> {
        let mut touched: BTreeSet<usize> = self.removed_origin_bins.iter().copied().collect();
        for (&(from, _), &to) in &self.node_moves {
            touched.insert(from);
            touched.insert(to);
        }
        touched.extend(self.added_targets.values().copied());
        let origin_count = self.origin.bin_count();
        touched.extend(origin_count..origin_count + self.added_bin_count());
        for targets in self.drained.values() {
            touched.extend(targets.iter().copied());
        }
        for key in self.drained.keys() {
            touched.remove(key);
        }
        touched
    }

    /// Picks a placement target: any valid index while the budget
    /// allows touching new bins, otherwise an already-touched one.
    ///
    /// # Panics
    /// Panics when no candidate index remains; that means the budget
    /// cannot accommodate the structurally required changes, which
    /// setup validation is supposed to reject up front.
    pub(crate) fn available_index<R: Rng>(&self, rng: &mut R) -> usize {
        let pool = self.target_pool();
        assert!(
            !pool.is_empty(),
            "no valid placement index remains; disruption budget too small for required changes"
        );
        pool[rng.random_range(0..pool.len())]
    }

    /// Like [`available_index`](Self::available_index) but never yields
    /// `exclude`; `None` when `exclude` was the only candidate.
    pub(crate) fn available_index_excluding<R: Rng>(
        &self,
        exclude: usize,
        rng: &mut R,
    ) -> Option<usize> {
        let mut pool = self.target_pool();
        pool.retain(|&index| index != exclude);
        if pool.is_empty() {
            None
        } else {
            Some(pool[rng.random_range(0..pool.len())])
        }
    }

    fn target_pool(&self) -> Vec<usize> {
        let touched = self.touched();
        if touched.len() < self.max_touched {
            self.valid_indexes()
        } else {
            touched.into_iter().collect()
        }
    }

    /// Redirects every pointer at a newly drained bin to a still-valid
    /// index. Mandatory after every change to the drained key set;
    /// skipping it would let [`materialize`](Self::materialize) place
    /// an item into a bin about to be deleted.
    pub(crate) fn evacuate<R: Rng>(&mut self, index: usize, rng: &mut R) {
        let retarget: Vec<(usize, usize)> = self
            .node_moves
            .iter()
            .filter(|&(_, &to)| to == index)
            .map(|(&key, _)| key)
            .collect();
        for key in retarget {
            let target = self.available_index(rng);
            self.node_moves.insert(key, target);
        }

        // Moves out of a drained bin are subsumed by its plan.
        self.node_moves.retain(|&(from, _), _| from != index);

        let relocate: Vec<ItemId> = self
            .added_targets
            .iter()
            .filter(|&(_, &target)| target == index)
            .map(|(&item, _)| item)
            .collect();
        for item in relocate {
            let target = self.available_index(rng);
            self.added_targets.insert(item, target);
        }

        if self.drained.contains_key(&index) {
            let stale: Vec<usize> = self.drained[&index]
                .iter()
                .enumerate()
                .filter(|(_, target)| self.drained.contains_key(target))
                .map(|(position, _)| position)
                .collect();
            for position in stale {
                let target = self.available_index(rng);
                if let Some(targets) = self.drained.get_mut(&index) {
                    targets[position] = target;
                }
            }
        }
    }

    /// Replays the delta onto a copy of the origin.
    ///
    /// Order matters: append new bins, pull moved items out of their
    /// source bins highest-index-first (so earlier pops cannot shift
    /// later ones), place moved then added items, drain removed bins
    /// front-to-back into their recorded targets, and finally delete
    /// the drained bins highest-index-first.
    pub fn materialize(&self) -> Distribution {
        let mut bins = self.origin.bins().to_vec();
        for _ in 0..self.added_bin_count() {
            bins.push(Vec::new());
        }

        let mut per_source: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        for (&(from, item_index), &to) in &self.node_moves {
            per_source.entry(from).or_default().push((item_index, to));
        }

        let mut moved: Vec<(ItemId, usize)> = Vec::with_capacity(self.node_moves.len());
        for (from, mut entries) in per_source {
            entries.sort_by(|a, b| b.0.cmp(&a.0));
            for (item_index, to) in entries {
                moved.push((bins[from].remove(item_index), to));
            }
        }
        for (item, to) in moved {
            bins[to].push(item);
        }

        for (&item, &to) in &self.added_targets {
            bins[to].push(item);
        }

        for (&from, targets) in &self.drained {
            for &to in targets {
                let item = bins[from].remove(0);
                bins[to].push(item);
            }
        }

        for &from in self.drained.keys().rev().collect::<Vec<_>>() {
            bins.remove(from);
        }

        Distribution::from_bins(bins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(range: std::ops::Range<u32>) -> Vec<ItemId> {
        range.map(ItemId).collect()
    }

    /// Origin with `bin_count` bins of `bin_size` items each.
    fn origin(bin_count: usize, bin_size: usize) -> Arc<Distribution> {
        let all = ids(0..(bin_count * bin_size) as u32);
        Arc::new(Distribution::even(&all, bin_count))
    }

    #[test]
    fn test_identity_delta_materializes_origin() {
        let mut rng = StdRng::seed_from_u64(1);
        let origin = origin(4, 3);
        let delta = DistributionDelta::new(origin.clone(), &[], BTreeSet::new(), 3, 0, &mut rng);

        assert!(delta.node_moves.is_empty());
        assert!(delta.drained.is_empty());
        assert_eq!(delta.materialize(), *origin);
    }

    #[test]
    fn test_shrink_by_one_bin() {
        // Four bins of two items, drop one bin, budget two.
        let mut rng = StdRng::seed_from_u64(5);
        let origin = origin(4, 2);
        let delta = DistributionDelta::new(origin, &[], BTreeSet::new(), 2, -1, &mut rng);

        assert_eq!(delta.drained.len(), 1);
        let materialized = delta.materialize();
        assert_eq!(materialized.bin_count(), 3);
        assert!(materialized.bins().iter().all(|bin| !bin.is_empty()));
        assert_eq!(materialized.item_count(), 8);
    }

    #[test]
    fn test_grow_by_one_bin_with_added_items() {
        let mut rng = StdRng::seed_from_u64(9);
        let origin = origin(3, 2);
        let added = ids(6..9);
        let delta = DistributionDelta::new(origin.clone(), &added, BTreeSet::new(), 4, 1, &mut rng);

        assert_eq!(delta.added_targets.len(), 3);
        let materialized = delta.materialize();
        assert_eq!(materialized.bin_count(), 4);
        assert_eq!(materialized.item_count(), 9);

        let mut all: Vec<ItemId> = materialized.item_ids().collect();
        all.sort();
        assert_eq!(all, ids(0..9));
    }

    #[test]
    fn test_materialize_twice_is_stable() {
        let mut rng = StdRng::seed_from_u64(17);
        let origin = origin(4, 3);
        let added = ids(12..14);
        let delta = DistributionDelta::new(origin, &added, BTreeSet::new(), 3, -1, &mut rng);

        assert_eq!(delta.materialize(), delta.materialize());
    }

    #[test]
    fn test_touched_within_budget_after_construction() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let origin = origin(5, 2);
            let added = ids(10..12);
            let delta = DistributionDelta::new(origin, &added, BTreeSet::new(), 4, -1, &mut rng);
            assert!(
                delta.touched().len() <= 4,
                "touched {:?} exceeds budget",
                delta.touched()
            );
        }
    }

    #[test]
    fn test_moves_replay_highest_index_first() {
        let mut rng = StdRng::seed_from_u64(2);
        let origin = origin(2, 4);
        let mut delta = DistributionDelta::new(origin, &[], BTreeSet::new(), 2, 0, &mut rng);

        // Move both items 1 and 3 out of bin 0. If replay popped lowest
        // first, index 3 would shift and the wrong item would move.
        delta.node_moves.insert((0, 1), 1);
        delta.node_moves.insert((0, 3), 1);

        let materialized = delta.materialize();
        assert_eq!(materialized.bins()[0], vec![ItemId(0), ItemId(4)]);
        let mut moved = materialized.bins()[1].clone();
        moved.sort();
        assert_eq!(
            moved,
            vec![ItemId(1), ItemId(2), ItemId(3), ItemId(5), ItemId(6), ItemId(7)]
        );
    }

    #[test]
    fn test_evacuate_redirects_all_pointers() {
        let mut rng = StdRng::seed_from_u64(3);
        let origin = origin(4, 2);
        let mut delta = DistributionDelta::new(origin, &ids(8..9), BTreeSet::new(), 4, 0, &mut rng);

        // Point everything at bin 2, then drain it.
        delta.node_moves.insert((0, 0), 2);
        delta.node_moves.insert((2, 1), 0);
        delta.added_targets.insert(ItemId(8), 2);
        delta.drained.insert(2, vec![0, 0]);
        delta.evacuate(2, &mut rng);

        assert!(delta.node_moves.values().all(|&to| to != 2));
        assert!(delta.node_moves.keys().all(|&(from, _)| from != 2));
        assert!(delta.added_targets.values().all(|&to| to != 2));
        // The forged drain still replays: bin 2 empties out and is
        // deleted, nothing is lost.
        let materialized = delta.materialize();
        assert_eq!(materialized.bin_count(), 3);
        assert_eq!(materialized.item_count(), 9);
    }

    #[test]
    #[should_panic(expected = "disruption budget too small")]
    fn test_exhausted_target_pool_is_fatal() {
        let mut rng = StdRng::seed_from_u64(4);
        let origin = origin(2, 3);
        // Budget zero: no bin may be touched, yet an added item needs a
        // target. available_index has nowhere to go.
        let _ = DistributionDelta::new(origin, &ids(6..7), BTreeSet::new(), 0, 0, &mut rng);
    }
}
