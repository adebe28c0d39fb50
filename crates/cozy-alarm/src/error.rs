//! Error types for the alarm subsystem.
//!
//! Only validation and storage failures are caller-visible. Sound
//! resolution degrades to the fallback tone instead of erroring, and
//! malformed AI schedule items are collected into the import report
//! rather than thrown.

use cozy_core::error::CozyError;
use cozy_core::types::{AlarmId, Timestamp};

/// Errors from coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    #[error("Alarm time {requested} is not in the future (now {now})")]
    TimeNotInFuture {
        requested: Timestamp,
        now: Timestamp,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] CozyError),
}

/// Why a single AI-proposed schedule item was skipped.
///
/// Item failures never abort sibling items and are never raised to the
/// import caller; they are collected in the [`ImportReport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportItemError {
    #[error("Missing date or time")]
    MissingDateTime,
    #[error("Unparseable date: {0}")]
    BadDate(String),
    #[error("Unparseable time: {0}")]
    BadTime(String),
    #[error("Local date-time does not exist: {0}")]
    NonexistentLocalTime(String),
    #[error("Scheduled instant {0} is not in the future")]
    NotInFuture(Timestamp),
}

/// One skipped proposal item: its position in the proposal and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub index: usize,
    pub reason: ImportItemError,
}

/// Outcome of an AI schedule import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Ids of the alarms created by this import, in proposal order.
    pub created: Vec<AlarmId>,
    /// Items that were skipped, with their positions and reasons.
    pub skipped: Vec<SkippedItem>,
}
