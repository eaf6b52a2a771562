//! Full item-to-bin assignments and their search operators.

mod operators;
mod search;
mod types;

pub use operators::{crossover_distributions, mutate_distribution};
pub use search::{Candidate, DistributionProblem};
pub use types::Distribution;
