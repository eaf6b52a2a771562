//! Cold-start distribution search: the [`EvoProblem`] wiring.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use super::operators::{crossover_distributions, mutate_distribution};
use super::types::Distribution;
use crate::constraints::ConstraintSet;
use crate::error::DistributeError;
use crate::evo::{EvoProblem, Individual};
use crate::item::{ItemArena, ItemId};

/// A distribution paired with its cached fitness.
#[derive(Clone)]
pub struct Candidate {
    pub distribution: Distribution,
    fitness: f64,
}

impl Candidate {
    pub fn new(distribution: Distribution) -> Self {
        Self {
            distribution,
            fitness: f64::INFINITY,
        }
    }
}

impl Individual for Candidate {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

/// Searches for a fresh distribution of the full item collection over
/// a fixed bin count.
pub struct DistributionProblem {
    arena: Arc<ItemArena>,
    ids: Vec<ItemId>,
    bin_count: usize,
    constraints: ConstraintSet,
}

impl DistributionProblem {
    pub fn new(
        arena: Arc<ItemArena>,
        bin_count: usize,
        group_weights: &HashMap<String, f64>,
    ) -> Result<Self, DistributeError> {
        if bin_count == 0 {
            return Err(DistributeError::InvalidSetup(
                "bin count must be at least 1".into(),
            ));
        }
        let ids: Vec<ItemId> = arena.ids().collect();
        if ids.is_empty() {
            return Err(DistributeError::InvalidSetup("no items to distribute".into()));
        }
        let constraints = ConstraintSet::standard(arena.clone(), &ids, bin_count, group_weights);
        Ok(Self {
            arena,
            ids,
            bin_count,
            constraints,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

impl EvoProblem for DistributionProblem {
    type Individual = Candidate;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> Candidate {
        Candidate::new(Distribution::random(&self.ids, self.bin_count, rng))
    }

    fn evaluate(&self, candidate: &Candidate) -> f64 {
        self.constraints.total(&candidate.distribution)
    }

    fn crossover<R: Rng>(&self, p1: &Candidate, p2: &Candidate, rng: &mut R) -> Vec<Candidate> {
        let (a, b) = crossover_distributions(
            &p1.distribution,
            &p2.distribution,
            self.arena.len(),
            rng,
        );
        vec![Candidate::new(a), Candidate::new(b)]
    }

    fn mutate<R: Rng>(&self, candidate: &mut Candidate, rng: &mut R) {
        mutate_distribution(&mut candidate.distribution, rng);
    }
}
