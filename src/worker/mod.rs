//! Background execution of an evolutionary search.
//!
//! A [`Worker`] owns the search thread; callers steer it with
//! pause/resume/stop commands and observe it through an [`EventLog`]
//! that replays history to late subscribers. [`PausePolicy`] lets the
//! worker pause itself on a schedule or on stagnation.

mod events;
mod policy;
mod worker;

pub use events::{Event, EventLog, WorkerStatus};
pub use policy::{GenerationBudget, NeverPause, PausePolicy, Stagnation};
pub use worker::Worker;

use crate::evo::{Engine, EvoProblem, GenerationStats};

/// A stepwise search the worker can drive.
///
/// Implemented by [`Engine`] over any problem; the worker only needs
/// to step generations and read progress, not the problem type.
pub trait Evolver: Send + 'static {
    fn spawn_generation(&mut self) -> GenerationStats;

    fn generation_count(&self) -> usize;

    fn history(&self) -> &[GenerationStats];
}

impl<P: EvoProblem + 'static> Evolver for Engine<P> {
    fn spawn_generation(&mut self) -> GenerationStats {
        Engine::spawn_generation(self)
    }

    fn generation_count(&self) -> usize {
        Engine::generation_count(self)
    }

    fn history(&self) -> &[GenerationStats] {
        Engine::history(self)
    }
}
