//! Parent selection strategies.

use super::types::{Fitness, Individual};
use rand::Rng;

/// Selection strategy for choosing parents.
///
/// All strategies assume minimization (lower fitness = better).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Tournament selection: pick `k` individuals at random, select the
    /// best. Higher `k` means stronger selection pressure.
    Tournament(usize),

    /// Fitness-proportionate (roulette wheel) selection, using an
    /// inverse-fitness transformation since lower is better.
    Roulette,

    /// Rank-based selection: probability proportional to rank position,
    /// avoiding the scaling problems of roulette.
    Rank,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects a parent index from the population.
    ///
    /// # Panics
    /// Panics if `population` is empty.
    pub fn select<I: Individual, R: Rng>(&self, population: &[I], rng: &mut R) -> usize {
        assert!(!population.is_empty(), "cannot select from empty population");

        match self {
            Selection::Tournament(k) => tournament(population, *k, rng),
            Selection::Roulette => roulette(population, rng),
            Selection::Rank => rank(population, rng),
        }
    }
}

fn tournament<I: Individual, R: Rng>(population: &[I], k: usize, rng: &mut R) -> usize {
    let k = k.max(1);
    let n = population.len();

    let mut best_idx = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if population[idx].fitness() < population[best_idx].fitness() {
            best_idx = idx;
        }
    }
    best_idx
}

/// Roulette wheel with `weight_i = max_fitness - fitness_i + epsilon`,
/// so the best (lowest fitness) individual gets the highest weight.
fn roulette<I: Individual, R: Rng>(population: &[I], rng: &mut R) -> usize {
    let n = population.len();
    if n == 1 {
        return 0;
    }

    let fitnesses: Vec<f64> = population.iter().map(|ind| ind.fitness().to_f64()).collect();
    let max_fitness = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let epsilon = 1e-10;

    let weights: Vec<f64> = fitnesses
        .iter()
        .map(|&f| {
            let w = max_fitness - f + epsilon;
            if w > 0.0 {
                w
            } else {
                epsilon
            }
        })
        .collect();

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.random_range(0..n);
    }

    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > threshold {
            return i;
        }
    }

    n - 1 // floating-point fallback
}

/// Linear ranking: sort by fitness ascending, weight by inverse rank.
fn rank<I: Individual, R: Rng>(population: &[I], rng: &mut R) -> usize {
    let n = population.len();
    if n == 1 {
        return 0;
    }

    let mut indexed: Vec<(usize, f64)> = population
        .iter()
        .enumerate()
        .map(|(i, ind)| (i, ind.fitness().to_f64()))
        .collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let total: f64 = (n * (n + 1)) as f64 / 2.0;
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;

    for (rank, &(original_idx, _)) in indexed.iter().enumerate() {
        cumulative += (n - rank) as f64;
        if cumulative > threshold {
            return original_idx;
        }
    }

    indexed.last().expect("population has n >= 2 elements").0
}
