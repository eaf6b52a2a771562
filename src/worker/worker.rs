//! The background search worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, info};

use super::events::{Event, EventLog, WorkerStatus};
use super::policy::PausePolicy;
use super::Evolver;

#[derive(Debug)]
enum Command {
    Pause,
    Resume,
    Stop,
}

/// Runs an [`Evolver`] on a dedicated thread, one generation at a
/// time, publishing progress to an [`EventLog`].
///
/// Commands are asynchronous: a pause or stop takes effect after the
/// generation in flight finishes. Redundant commands are ignored, so
/// pausing a paused worker or stopping a stopping one is harmless.
pub struct Worker<E> {
    commands: Sender<Command>,
    log: Arc<EventLog>,
    thread: JoinHandle<E>,
}

impl<E: Evolver> Worker<E> {
    /// Starts the worker. It runs until `max_generations` generations
    /// have completed, [`stop`](Self::stop) is called, or the handle is
    /// consumed by [`join`](Self::join).
    pub fn spawn<P: PausePolicy>(evolver: E, policy: P, max_generations: usize) -> Self {
        let (commands, inbox) = unbounded();
        let log = Arc::new(EventLog::new());
        let thread_log = Arc::clone(&log);
        let thread =
            thread::spawn(move || run_loop(evolver, policy, max_generations, inbox, thread_log));
        Self {
            commands,
            log,
            thread,
        }
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Replays all events so far, then streams live ones.
    pub fn subscribe(&self) -> Receiver<Event> {
        self.log.subscribe()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.events()
    }

    pub fn status(&self) -> Option<WorkerStatus> {
        self.log.last_status()
    }

    /// Asks the worker to stop by closing the command channel, waits
    /// for it to finish, and returns the evolver in its final state.
    pub fn join(self) -> E {
        drop(self.commands);
        match self.thread.join() {
            Ok(evolver) => evolver,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    fn send(&self, command: Command) {
        // A send error means the worker already stopped; the command
        // is moot at that point.
        let _ = self.commands.send(command);
    }
}

fn run_loop<E: Evolver, P: PausePolicy>(
    mut evolver: E,
    mut policy: P,
    max_generations: usize,
    inbox: Receiver<Command>,
    log: Arc<EventLog>,
) -> E {
    let mut status = WorkerStatus::Running;
    log.publish(Event::Status(WorkerStatus::Running));

    loop {
        // Absorb every pending command before deciding the next step.
        while matches!(status, WorkerStatus::Running | WorkerStatus::Pausing) {
            match inbox.try_recv() {
                Ok(command) => status = next_status(status, command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => status = WorkerStatus::Stopping,
            }
        }

        match status {
            WorkerStatus::Running => {
                let stats = evolver.spawn_generation();
                log.publish(Event::Generation(stats));
                if evolver.generation_count() >= max_generations {
                    info!(
                        generations = evolver.generation_count(),
                        best = stats.best,
                        "generation ceiling reached"
                    );
                    log.publish(Event::Completed);
                    status = WorkerStatus::Stopping;
                } else if policy.should_pause(&stats) {
                    debug!(generation = stats.generation, "pause policy triggered");
                    status = WorkerStatus::Pausing;
                }
            }
            WorkerStatus::Pausing | WorkerStatus::Paused => {
                if status == WorkerStatus::Pausing {
                    status = WorkerStatus::Paused;
                    log.publish(Event::Status(WorkerStatus::Paused));
                }
                match inbox.recv() {
                    Ok(command) => {
                        let next = next_status(status, command);
                        if next == WorkerStatus::Running {
                            policy.on_resume();
                            log.publish(Event::Status(WorkerStatus::Running));
                        }
                        status = next;
                    }
                    Err(_) => status = WorkerStatus::Stopping,
                }
            }
            WorkerStatus::Stopping | WorkerStatus::Stopped => {
                log.publish(Event::Status(WorkerStatus::Stopping));
                log.publish(Event::Status(WorkerStatus::Stopped));
                return evolver;
            }
        }
    }
}

fn next_status(status: WorkerStatus, command: Command) -> WorkerStatus {
    match (status, command) {
        (_, Command::Stop) => WorkerStatus::Stopping,
        (WorkerStatus::Running, Command::Pause) => WorkerStatus::Pausing,
        (WorkerStatus::Pausing | WorkerStatus::Paused, Command::Resume) => WorkerStatus::Running,
        (status, _) => status,
    }
}
