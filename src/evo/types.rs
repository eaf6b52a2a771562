//! Core trait definitions for the evolutionary engine.
//!
//! [`Individual`] and [`EvoProblem`] define the contract between the
//! generic engine and the domain callbacks the distribution searches
//! plug in.

use rand::Rng;

/// Marker trait for fitness values.
///
/// Fitness must support comparison and be cheaply copyable.
/// Lower fitness is considered better (minimization).
pub trait Fitness: PartialOrd + Copy + Send + Sync + std::fmt::Debug + 'static {
    /// Worst possible fitness, used for unevaluated individuals.
    fn worst() -> Self;

    /// Converts the fitness to `f64` for history and statistics.
    fn to_f64(self) -> f64;
}

impl Fitness for f64 {
    fn worst() -> Self {
        f64::INFINITY
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl Fitness for f32 {
    fn worst() -> Self {
        f32::INFINITY
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// A candidate solution in the population.
///
/// Individuals carry their own fitness value. The engine calls
/// [`EvoProblem::evaluate`] and stores the result via
/// [`set_fitness`](Individual::set_fitness).
pub trait Individual: Clone + Send + Sync {
    type Fitness: Fitness;

    fn fitness(&self) -> Self::Fitness;

    fn set_fitness(&mut self, fitness: Self::Fitness);
}

/// Defines an evolutionary search problem: how to create, evaluate,
/// recombine, and perturb individuals.
///
/// `EvoProblem` must be `Send + Sync` because the engine may evaluate
/// individuals in parallel using rayon.
pub trait EvoProblem: Send + Sync {
    type Individual: Individual;

    /// Creates a random individual. Must be valid, not necessarily good.
    fn create_individual<R: Rng>(&self, rng: &mut R) -> Self::Individual;

    /// Evaluates an individual. Lower is better. May run in parallel
    /// across the population.
    fn evaluate(&self, individual: &Self::Individual) -> <Self::Individual as Individual>::Fitness;

    /// Produces one or two offspring from two parents.
    ///
    /// The default implementation clones the first parent.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        _parent2: &Self::Individual,
        _rng: &mut R,
    ) -> Vec<Self::Individual> {
        vec![parent1.clone()]
    }

    /// Mutates an individual in place. Default is a no-op.
    fn mutate<R: Rng>(&self, _individual: &mut Self::Individual, _rng: &mut R) {}
}
