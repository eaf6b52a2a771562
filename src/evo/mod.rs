//! Generic evolutionary search engine.
//!
//! A compact, domain-agnostic population engine: the distribution
//! searches plug in via [`EvoProblem`], the worker drives generations
//! via [`Engine::spawn_generation`].
//!
//! # Core traits
//!
//! - [`Individual`]: a candidate solution with an associated fitness
//! - [`EvoProblem`]: problem definition — initialization, evaluation,
//!   crossover, mutation
//!
//! # Key types
//!
//! - [`EvoConfig`]: engine parameters (population size, rates, seed)
//! - [`Engine`]: stepwise evolutionary loop with (best, mean) history
//! - [`Selection`]: parent selection strategies

mod config;
mod engine;
mod selection;
mod types;

pub use config::EvoConfig;
pub use engine::{Engine, GenerationStats};
pub use selection::Selection;
pub use types::{EvoProblem, Fitness, Individual};
