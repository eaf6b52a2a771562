//! Incremental re-distribution against a fixed origin.
//!
//! Instead of searching the full assignment space again when items
//! arrive, leave, or the bin count changes, the search here evolves
//! [`DistributionDelta`]s: compact diffs that move a handful of items,
//! place the new ones, and drain bins scheduled for removal, while
//! touching at most a configured number of distinct bins.

mod operators;
mod search;
mod types;

pub use operators::{crossover_deltas, mutate_delta};
pub use search::{DeltaCandidate, DeltaProblem};
pub use types::DistributionDelta;
