//! Mutation and crossover over full distributions.

use rand::Rng;

use super::types::Distribution;
use crate::item::ItemId;

/// Mutates a distribution in place.
///
/// Two disjoint strategies, chosen stochastically: with probability 0.7
/// relocate 1–5 random items between bins, otherwise swap one random
/// item between two distinct bins 1–2 times. Bins of size 0 or 1 are
/// tolerated by skipping, and the item multiset never changes.
pub fn mutate_distribution<R: Rng>(distribution: &mut Distribution, rng: &mut R) {
    if rng.random_range(0.0..1.0) < 0.7 {
        for _ in 0..rng.random_range(1..=5) {
            relocate_one(distribution, rng);
        }
    } else {
        for _ in 0..rng.random_range(1..=2) {
            swap_one(distribution, rng);
        }
    }
}

fn relocate_one<R: Rng>(distribution: &mut Distribution, rng: &mut R) {
    let bin_count = distribution.bin_count();
    if bin_count < 2 {
        return;
    }
    let non_empty: Vec<usize> = (0..bin_count)
        .filter(|&i| !distribution.bins()[i].is_empty())
        .collect();
    let Some(&source) = pick(&non_empty, rng) else {
        return;
    };
    let mut target = rng.random_range(0..bin_count - 1);
    if target >= source {
        target += 1;
    }

    let bins = distribution.bins_mut();
    let item_index = rng.random_range(0..bins[source].len());
    let item = bins[source].remove(item_index);
    bins[target].push(item);
}

fn swap_one<R: Rng>(distribution: &mut Distribution, rng: &mut R) {
    let non_empty: Vec<usize> = (0..distribution.bin_count())
        .filter(|&i| !distribution.bins()[i].is_empty())
        .collect();
    if non_empty.len() < 2 {
        return;
    }
    let first = non_empty[rng.random_range(0..non_empty.len())];
    let mut second = first;
    while second == first {
        second = non_empty[rng.random_range(0..non_empty.len())];
    }

    let bins = distribution.bins_mut();
    let first_index = rng.random_range(0..bins[first].len());
    let second_index = rng.random_range(0..bins[second].len());
    let a = bins[first].remove(first_index);
    let b = bins[second].remove(second_index);
    bins[first].push(b);
    bins[second].push(a);
}

fn pick<'a, T, R: Rng>(slice: &'a [T], rng: &mut R) -> Option<&'a T> {
    if slice.is_empty() {
        None
    } else {
        Some(&slice[rng.random_range(0..slice.len())])
    }
}

/// Produces two children from two parents over the same item collection
/// and bin count.
///
/// For every item the bin indices it occupies across both parents are
/// recorded (one or two entries); each child independently assigns the
/// item to a uniform draw from that location set. Children are valid by
/// construction, no repair needed.
pub fn crossover_distributions<R: Rng>(
    first: &Distribution,
    second: &Distribution,
    arena_len: usize,
    rng: &mut R,
) -> (Distribution, Distribution) {
    debug_assert_eq!(first.bin_count(), second.bin_count());
    let bin_count = first.bin_count();

    let first_located = first.locate(arena_len);
    let second_located = second.locate(arena_len);
    let all_items: Vec<ItemId> = first.item_ids().collect();

    let mut build = |rng: &mut R| {
        let mut bins = vec![Vec::new(); bin_count];
        for &id in &all_items {
            let a = first_located[id.0 as usize];
            let b = second_located[id.0 as usize];
            let target = match (a, b) {
                (Some(a), Some(b)) => {
                    if a == b || rng.random_range(0.0..1.0) < 0.5 {
                        a
                    } else {
                        b
                    }
                }
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => unreachable!("item present in parent must locate"),
            };
            bins[target].push(id);
        }
        Distribution::from_bins(bins)
    };

    let child_a = build(rng);
    let child_b = build(rng);
    (child_a, child_b)
}
