//! Domain events emitted by the alarm coordinator.
//!
//! The coordinator emits events after state changes instead of calling the
//! render layer inline; subscribers (UI, event log) react through the
//! broadcast channel. Emission never blocks and a missing subscriber is not
//! an error.

use serde::{Deserialize, Serialize};

use crate::types::{AlarmId, PlayHandle, Timestamp};

/// All domain events the alarm subsystem can emit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// The set of stored alarms changed (create, delete, reschedule, or
    /// import). Subscribers re-read the list; the event carries no delta.
    AlarmsChanged { timestamp: Timestamp },

    /// An alarm fired. Carries everything the surface needs: the label to
    /// display and the resolved play handle, so no store read is required
    /// after the fact.
    AlarmFired {
        id: AlarmId,
        label: String,
        sound: PlayHandle,
        timestamp: Timestamp,
    },

    /// An AI schedule import completed (counts only; the returned report
    /// carries the detail).
    ScheduleImported {
        created: usize,
        skipped: usize,
        timestamp: Timestamp,
    },
}

impl DomainEvent {
    /// When the event occurred.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            DomainEvent::AlarmsChanged { timestamp, .. }
            | DomainEvent::AlarmFired { timestamp, .. }
            | DomainEvent::ScheduleImported { timestamp, .. } => *timestamp,
        }
    }

    /// Stable snake_case name for logs and wire formats.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::AlarmsChanged { .. } => "alarms_changed",
            DomainEvent::AlarmFired { .. } => "alarm_fired",
            DomainEvent::ScheduleImported { .. } => "schedule_imported",
        }
    }
}
