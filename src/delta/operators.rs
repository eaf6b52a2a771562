//! Mutation and crossover over distribution deltas.
//!
//! Every edit goes through [`DistributionDelta::available_index`] or
//! [`DistributionDelta::accepts_target`], so the disruption budget
//! holds after each operator application, not just at evaluation time.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::DistributionDelta;
use crate::item::ItemId;

/// Randomly perturbs a delta in place.
///
/// Move edits dominate; relocating added items, swapping which bin is
/// drained, and re-rolling a single redistribution target fire rarely.
pub fn mutate_delta<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    for _ in 0..5 {
        if rng.random_range(0.0..1.0) < 0.8 {
            mutate_moves(delta, rng);
        }
    }
    for _ in 0..2 {
        if !delta.added_targets.is_empty() && rng.random_range(0.0..1.0) < 0.2 {
            relocate_added(delta, rng);
        }
    }
    for _ in 0..2 {
        if !delta.drained.is_empty() && rng.random_range(0.0..1.0) < 0.05 {
            swap_drained_bin(delta, rng);
        }
    }
    for _ in 0..5 {
        if !delta.drained.is_empty() && rng.random_range(0.0..1.0) < 0.1 {
            retarget_redistribution(delta, rng);
        }
    }
    // A deleted move may have been an appended bin's only arrival.
    delta.reseed_appended_bins(rng);
    debug_assert!(delta.touched().len() <= delta.max_touched());
}

fn delete_random_move<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    if delta.node_moves.is_empty() {
        return;
    }
    let keys: Vec<(usize, usize)> = delta.node_moves.keys().copied().collect();
    let key = keys[rng.random_range(0..keys.len())];
    delta.node_moves.remove(&key);
}

/// Adds a fresh move or deletes an existing one.
fn mutate_moves<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    if !delta.node_moves.is_empty() && rng.random_bool(0.3) {
        delete_random_move(delta, rng);
        return;
    }

    let touched = delta.touched();
    let budget_open = touched.len() < delta.max_touched();
    // A source bin keeps at least one unmoved item so it cannot be
    // emptied by moves alone.
    let sources: Vec<usize> = (0..delta.origin().bin_count())
        .filter(|i| !delta.drained.contains_key(i))
        .filter(|i| budget_open || touched.contains(i))
        .filter(|&i| delta.unmoved_indexes(i).len() >= 2)
        .collect();
    if sources.is_empty() {
        delete_random_move(delta, rng);
        return;
    }

    let from = sources[rng.random_range(0..sources.len())];
    let options = delta.unmoved_indexes(from);
    let item_index = options[rng.random_range(0..options.len())];

    // Book the source with a self-move first so the budget already
    // accounts for it when the real target is drawn. The source itself
    // is never a target: a move must relocate the item.
    delta.node_moves.insert((from, item_index), from);
    match delta.available_index_excluding(from, rng) {
        Some(target) => {
            delta.node_moves.insert((from, item_index), target);
        }
        None => {
            delta.node_moves.remove(&(from, item_index));
        }
    }
}

/// Re-targets one added item; the item itself always stays placed.
fn relocate_added<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    let items: Vec<ItemId> = delta.added_targets.keys().copied().collect();
    let item = items[rng.random_range(0..items.len())];
    let target = delta.available_index(rng);
    delta.added_targets.insert(item, target);
}

/// Drains a different origin bin instead of one currently drained.
fn swap_drained_bin<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    let keys: Vec<usize> = delta.drained.keys().copied().collect();
    let old = keys[rng.random_range(0..keys.len())];
    let candidates: Vec<usize> = delta
        .valid_indexes()
        .into_iter()
        .filter(|&i| i < delta.origin().bin_count())
        .collect();
    if candidates.is_empty() {
        return;
    }
    let new = candidates[rng.random_range(0..candidates.len())];

    delta.drained.remove(&old);
    delta.drained.insert(new, Vec::new());
    // Moves and adds pointing at the new key must leave before its
    // plan is drawn, otherwise materialization would feed a dying bin.
    delta.evacuate(new, rng);

    let item_count = delta.origin().bins()[new].len();
    for _ in 0..item_count {
        let target = delta.available_index(rng);
        if let Some(plan) = delta.drained.get_mut(&new) {
            plan.push(target);
        }
    }
}

/// Re-rolls a single redistribution target of one drained bin.
fn retarget_redistribution<R: Rng>(delta: &mut DistributionDelta, rng: &mut R) {
    let keys: Vec<usize> = delta.drained.keys().copied().collect();
    let key = keys[rng.random_range(0..keys.len())];
    let plan_len = delta.drained[&key].len();
    if plan_len == 0 {
        return;
    }
    let position = rng.random_range(0..plan_len);
    let target = delta.available_index(rng);
    if let Some(plan) = delta.drained.get_mut(&key) {
        plan[position] = target;
    }
}

/// Recombines two deltas over the same origin into two children.
pub fn crossover_deltas<R: Rng>(
    first: &DistributionDelta,
    second: &DistributionDelta,
    rng: &mut R,
) -> (DistributionDelta, DistributionDelta) {
    debug_assert!(Arc::ptr_eq(first.origin(), second.origin()));
    (
        recombine(first, second, rng),
        recombine(first, second, rng),
    )
}

/// Samples one child from the parents' pooled genes: drained keys and
/// plans first, then moves, then added-item targets. Inherited indices
/// that no longer fit the child (drained there, or over budget) are
/// re-drawn instead of dropped.
fn recombine<R: Rng>(
    a: &DistributionDelta,
    b: &DistributionDelta,
    rng: &mut R,
) -> DistributionDelta {
    let mut child = a.blank();

    let mut key_pool: Vec<usize> = a.drained.keys().chain(b.drained.keys()).copied().collect();
    key_pool.sort_unstable();
    key_pool.dedup();
    key_pool.shuffle(rng);
    for &key in key_pool.iter().take(child.drained_bin_count()) {
        child.drained.insert(key, Vec::new());
    }

    let keys: Vec<usize> = child.drained.keys().copied().collect();
    for key in keys {
        let mut templates: Vec<&Vec<usize>> = Vec::new();
        if let Some(plan) = a.drained.get(&key) {
            templates.push(plan);
        }
        if let Some(plan) = b.drained.get(&key) {
            templates.push(plan);
        }
        // Every pooled key came from at least one parent.
        let template = templates[rng.random_range(0..templates.len())].clone();
        for inherited in template {
            let target = if child.accepts_target(inherited) {
                inherited
            } else {
                child.available_index(rng)
            };
            if let Some(plan) = child.drained.get_mut(&key) {
                plan.push(target);
            }
        }
    }

    let mut move_pool: Vec<((usize, usize), usize)> = a
        .node_moves
        .iter()
        .chain(b.node_moves.iter())
        .map(|(&key, &to)| (key, to))
        .collect();
    move_pool.shuffle(rng);
    let min_count = a.node_moves.len().min(b.node_moves.len());
    let max_count = a.node_moves.len().max(b.node_moves.len());
    let quota = if max_count == 0 {
        0
    } else {
        rng.random_range(min_count..=max_count)
    };
    for ((from, item_index), to) in move_pool {
        if child.node_moves.len() >= quota {
            break;
        }
        if child.node_moves.contains_key(&(from, item_index))
            || child.drained.contains_key(&from)
            || child.unmoved_indexes(from).len() < 2
        {
            continue;
        }
        let touched = child.touched();
        if !touched.contains(&from) && touched.len() >= child.max_touched() {
            continue;
        }
        child.node_moves.insert((from, item_index), from);
        if child.accepts_target(to) {
            child.node_moves.insert((from, item_index), to);
        } else {
            match child.available_index_excluding(from, rng) {
                Some(target) => {
                    child.node_moves.insert((from, item_index), target);
                }
                None => {
                    child.node_moves.remove(&(from, item_index));
                }
            }
        }
    }

    // Both parents target the same added item set.
    let added: Vec<ItemId> = a.added_targets.keys().copied().collect();
    for item in added {
        let mut options: Vec<usize> = Vec::new();
        if let Some(&target) = a.added_targets.get(&item) {
            options.push(target);
        }
        if let Some(&target) = b.added_targets.get(&item) {
            options.push(target);
        }
        options.shuffle(rng);
        let target = match options.iter().copied().find(|&t| child.accepts_target(t)) {
            Some(target) => target,
            None => child.available_index(rng),
        };
        child.added_targets.insert(item, target);
    }

    // The shuffled pools may leave an appended bin with no arrivals.
    child.reseed_appended_bins(rng);

    debug_assert!(child.touched().len() <= child.max_touched());
    child
}
