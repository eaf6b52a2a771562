//! Worker event log with replay-then-live subscriptions.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::evo::GenerationStats;

/// Lifecycle state of a [`super::Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Running,
    /// Pause requested, current generation still finishing.
    Pausing,
    Paused,
    /// Stop requested or generation ceiling reached.
    Stopping,
    Stopped,
}

/// Everything a worker reports while running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// One finished generation.
    Generation(GenerationStats),
    Status(WorkerStatus),
    /// The generation ceiling was reached; a stop follows.
    Completed,
}

/// Ordered, append-only event history with broadcast.
///
/// A subscriber first receives every event published so far, in order,
/// then live events as they happen. No subscriber can observe a gap or
/// a reordering: replay and registration happen under the same lock
/// that publishing takes.
#[derive(Default)]
pub struct EventLog {
    inner: Mutex<LogInner>,
}

#[derive(Default)]
struct LogInner {
    events: Vec<Event>,
    subscribers: Vec<Sender<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, event: Event) {
        let mut inner = self.inner.lock();
        inner.events.push(event);
        inner.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Replays the full history into a fresh channel, then keeps it fed.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        let mut inner = self.inner.lock();
        for &event in &inner.events {
            if tx.send(event).is_err() {
                return rx;
            }
        }
        inner.subscribers.push(tx);
        rx
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    /// The most recently published status, if any.
    pub fn last_status(&self) -> Option<WorkerStatus> {
        self.inner
            .lock()
            .events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Status(status) => Some(*status),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(generation: usize) -> Event {
        Event::Generation(GenerationStats {
            generation,
            best: 1.0,
            mean: 2.0,
        })
    }

    #[test]
    fn test_late_subscriber_sees_full_history() {
        let log = EventLog::new();
        log.publish(Event::Status(WorkerStatus::Running));
        log.publish(frame(1));
        log.publish(frame(2));

        let rx = log.subscribe();
        log.publish(frame(3));

        let received: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                Event::Status(WorkerStatus::Running),
                frame(1),
                frame(2),
                frame(3)
            ]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let log = EventLog::new();
        drop(log.subscribe());
        log.publish(frame(1));

        let rx = log.subscribe();
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_last_status_skips_generation_events() {
        let log = EventLog::new();
        assert_eq!(log.last_status(), None);
        log.publish(Event::Status(WorkerStatus::Running));
        log.publish(frame(1));
        assert_eq!(log.last_status(), Some(WorkerStatus::Running));
    }
}
