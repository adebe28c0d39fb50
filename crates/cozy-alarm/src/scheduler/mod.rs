//! Background fire-timer scheduling.
//!
//! A scheduler owns at most one armed, cancelable timer per alarm id and
//! announces naturally elapsed timers on the due stream. Two backends:
//! [`RuntimeScheduler`] (per-id runtime timers) and [`WallClockScheduler`]
//! (scan loop that re-reads the wall clock, surviving host suspend).

pub mod runtime;
pub mod wall_clock;

pub use runtime::RuntimeScheduler;
pub use wall_clock::WallClockScheduler;

use tokio::sync::mpsc;

use cozy_core::types::{AlarmId, Timestamp};

/// Sending half of the due stream; held by schedulers.
pub type DueSender = mpsc::UnboundedSender<AlarmId>;

/// Receiving half of the due stream; held by the coordinator.
pub type DueReceiver = mpsc::UnboundedReceiver<AlarmId>;

/// Create the due stream connecting a scheduler to the coordinator.
///
/// Unbounded: due events are tiny and rare, and dropping one would lose
/// a wake-up.
pub fn due_channel() -> (DueSender, DueReceiver) {
    mpsc::unbounded_channel()
}

/// One cancelable fire-timer per alarm id.
///
/// Implementations guarantee: at most one outstanding timer per id;
/// re-arming replaces, so an id fires exactly once, at the most recently
/// armed time; timers fire at or after their target, never before; each
/// armed timer delivers at most one due event.
pub trait Scheduler: Send + Sync {
    /// Arm a one-shot timer for `id` at `time`, replacing any existing
    /// timer for that id first. A `time` already in the past is a no-op;
    /// the caller owns immediate-firing semantics.
    fn arm(&self, id: AlarmId, time: Timestamp);

    /// Cancel and remove the outstanding timer for `id`; no-op if none
    /// exists.
    fn cancel(&self, id: AlarmId);

    /// Whether a timer is currently armed for `id`.
    fn is_armed(&self, id: AlarmId) -> bool;

    /// Number of currently armed timers.
    fn armed_count(&self) -> usize;

    /// Drop all outstanding timers and stop background work.
    fn shutdown(&self);
}
