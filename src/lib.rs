//! Item-to-bin distribution engine with evolutionary search.
//!
//! Partitions a weighted, labeled item collection into a fixed number
//! of bins so that total weight, item count, and rendering cost come
//! out roughly even per bin while items sharing a group label land in
//! different bins. The assignment space is combinatorial and the
//! objective non-convex, so the engine searches stochastically instead
//! of solving exactly.
//!
//! Two search modes share the same constraint set:
//!
//! - **Cold start** ([`distribution::DistributionProblem`]): evolve
//!   full assignments from scratch.
//! - **Incremental** ([`delta::DeltaProblem`]): given an existing
//!   distribution and a small change (items added or removed, bin
//!   count shifted), evolve a [`delta::DistributionDelta`] that
//!   touches at most a configured number of bins, so most already
//!   delivered bins survive untouched.
//!
//! Searches run on a background [`worker::Worker`] that steps the
//! [`evo::Engine`] one generation at a time, honors pause/resume/stop
//! commands, and publishes progress as a replayable event stream.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use binshift::content::ContentNode;
//! use binshift::distribution::DistributionProblem;
//! use binshift::evo::{Engine, EvoConfig};
//! use binshift::item::{Item, ItemArena};
//!
//! let mut arena = ItemArena::new();
//! for i in 0..9 {
//!     let node = Arc::new(ContentNode::leaf(format!("card{i}"), Vec::<String>::new()));
//!     arena.insert(Item::new(node, 1.0 + (i % 3) as f64, Vec::<String>::new()));
//! }
//!
//! let problem = DistributionProblem::new(Arc::new(arena), 3, &HashMap::new()).unwrap();
//! let mut engine = Engine::new(
//!     problem,
//!     EvoConfig::default().with_population_size(40).with_seed(1),
//! )
//! .unwrap();
//! for _ in 0..20 {
//!     engine.spawn_generation();
//! }
//! let best = &engine.best().distribution;
//! assert_eq!(best.item_count(), 9);
//! ```

pub mod bundle;
pub mod constraints;
pub mod content;
pub mod delta;
pub mod distribution;
pub mod error;
pub mod evo;
pub mod item;
pub mod worker;
