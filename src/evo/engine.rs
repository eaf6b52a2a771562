//! Stepwise evolutionary engine.
//!
//! [`Engine`] owns a population and advances it one generation per
//! [`spawn_generation`](Engine::spawn_generation) call, recording a
//! (best, mean) fitness history. An external driver — normally a
//! [`crate::worker::Worker`] — decides when to step and when to stop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use super::config::EvoConfig;
use super::types::{EvoProblem, Fitness, Individual};

/// Per-generation fitness summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    /// 1-based generation index, strictly increasing without gaps.
    pub generation: usize,
    /// Best (lowest) fitness seen so far in the run.
    pub best: f64,
    /// Mean fitness of the current population.
    pub mean: f64,
}

/// Seeded RNG construction; an unseeded engine draws a random seed.
pub(crate) fn create_rng(seed: Option<u64>) -> StdRng {
    StdRng::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// Drives the evolutionary loop one generation at a time.
pub struct Engine<P: EvoProblem> {
    problem: P,
    config: EvoConfig,
    rng: StdRng,
    population: Vec<P::Individual>,
    best: P::Individual,
    history: Vec<GenerationStats>,
}

impl<P: EvoProblem> Engine<P> {
    /// Creates and evaluates the initial population.
    pub fn new(problem: P, config: EvoConfig) -> Result<Self, String> {
        config.validate()?;

        let mut rng = create_rng(config.seed);
        let mut population: Vec<P::Individual> = (0..config.population_size)
            .map(|_| problem.create_individual(&mut rng))
            .collect();
        evaluate_population(&problem, &mut population, config.parallel);
        let best = find_best(&population).clone();

        Ok(Self {
            problem,
            config,
            rng,
            population,
            best,
            history: Vec::new(),
        })
    }

    /// Advances the population by exactly one generation: sort, keep
    /// elites, select/mate/mutate to refill, evaluate the newcomers,
    /// and record the stats frame.
    pub fn spawn_generation(&mut self) -> GenerationStats {
        self.population.sort_by(|a, b| {
            a.fitness()
                .partial_cmp(&b.fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let elite_count = (self.config.population_size as f64 * self.config.elite_ratio) as usize;
        let mut next_gen: Vec<P::Individual> = self.population[..elite_count].to_vec();

        while next_gen.len() < self.config.population_size {
            let p1_idx = self.config.selection.select(&self.population, &mut self.rng);
            let p2_idx = self.config.selection.select(&self.population, &mut self.rng);

            let children = if self.rng.random_range(0.0..1.0) < self.config.crossover_rate {
                self.problem
                    .crossover(&self.population[p1_idx], &self.population[p2_idx], &mut self.rng)
            } else {
                vec![self.population[p1_idx].clone()]
            };

            for mut child in children {
                if next_gen.len() >= self.config.population_size {
                    break;
                }
                if self.rng.random_range(0.0..1.0) < self.config.mutation_rate {
                    self.problem.mutate(&mut child, &mut self.rng);
                }
                next_gen.push(child);
            }
        }

        if self.config.parallel {
            next_gen[elite_count..].par_iter_mut().for_each(|ind| {
                let f = self.problem.evaluate(ind);
                ind.set_fitness(f);
            });
        } else {
            for ind in &mut next_gen[elite_count..] {
                let f = self.problem.evaluate(ind);
                ind.set_fitness(f);
            }
        }

        self.population = next_gen;

        let gen_best = find_best(&self.population);
        if gen_best.fitness() < self.best.fitness() {
            self.best = gen_best.clone();
        }

        let mean = self
            .population
            .iter()
            .map(|ind| ind.fitness().to_f64())
            .sum::<f64>()
            / self.population.len() as f64;

        let stats = GenerationStats {
            generation: self.history.len() + 1,
            best: self.best.fitness().to_f64(),
            mean,
        };
        debug!(
            generation = stats.generation,
            best = stats.best,
            mean = stats.mean,
            "generation complete"
        );
        self.history.push(stats);
        stats
    }

    /// The best individual found so far across all generations.
    pub fn best(&self) -> &P::Individual {
        &self.best
    }

    pub fn population(&self) -> &[P::Individual] {
        &self.population
    }

    /// One stats frame per completed generation.
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    pub fn generation_count(&self) -> usize {
        self.history.len()
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }
}

fn evaluate_population<P: EvoProblem>(
    problem: &P,
    population: &mut [P::Individual],
    parallel: bool,
) {
    if parallel {
        population.par_iter_mut().for_each(|ind| {
            let f = problem.evaluate(ind);
            ind.set_fitness(f);
        });
    } else {
        for ind in population.iter_mut() {
            let f = problem.evaluate(ind);
            ind.set_fitness(f);
        }
    }
}

fn find_best<I: Individual>(population: &[I]) -> &I {
    population
        .iter()
        .min_by(|a, b| {
            a.fitness()
                .partial_cmp(&b.fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .expect("population must not be empty")
}
