//! AI schedule import.
//!
//! The assistant proposes wake schedules as a JSON payload. This module
//! holds the wire types for that payload and plans each proposed item
//! into a ready-to-store alarm, composing the item's local date and wall
//! time into an instant. Items are planned independently so one bad item
//! never sinks its siblings.

use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use cozy_core::types::{NewAlarm, Timestamp};

use crate::error::ImportItemError;
use crate::resolver::SoundResolver;

/// A full schedule proposal produced by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleProposal {
    #[serde(default)]
    pub intent: String,
    #[serde(rename = "scheduleDetails", default)]
    pub schedule_details: Vec<ScheduleItem>,
}

/// One proposed alarm, fields as the assistant emits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    #[serde(rename = "type", default)]
    pub kind: ScheduleItemKind,
    /// Local wall time, "HH:MM".
    #[serde(default)]
    pub time: String,
    /// Local date, "YYYY-MM-DD".
    #[serde(default)]
    pub date: String,
    /// Free-form sound wish, e.g. "ocean waves".
    #[serde(rename = "soundRequest", default)]
    pub sound_request: String,
    #[serde(default)]
    pub label: String,
}

/// Proposed item kind. `Normal` items repeat daily; anything else fires
/// once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleItemKind {
    Normal,
    Exception,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Compose a local date and wall time into an instant.
///
/// The assistant emits "-" for fields it left blank.
pub fn compose_local_instant(date: &str, time: &str) -> Result<Timestamp, ImportItemError> {
    if date.is_empty() || date == "-" || time.is_empty() || time == "-" {
        return Err(ImportItemError::MissingDateTime);
    }
    let date_part = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ImportItemError::BadDate(date.to_string()))?;
    let time_part = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| ImportItemError::BadTime(time.to_string()))?;
    // A DST gap can make a wall time nonexistent in the local zone.
    let local = Local
        .from_local_datetime(&date_part.and_time(time_part))
        .earliest()
        .ok_or_else(|| ImportItemError::NonexistentLocalTime(format!("{date} {time}")))?;
    Ok(Timestamp(local.timestamp_millis()))
}

/// Plan one proposed item into a storable alarm.
pub async fn plan_item(
    item: &ScheduleItem,
    now: Timestamp,
    resolver: &SoundResolver,
) -> Result<NewAlarm, ImportItemError> {
    let time = compose_local_instant(&item.date, &item.time)?;
    if time <= now {
        return Err(ImportItemError::NotInFuture(time));
    }
    let sound = resolver.resolve_request(&item.sound_request).await;
    Ok(NewAlarm {
        time,
        label: item.label.clone(),
        sound,
        is_repeating: item.kind == ScheduleItemKind::Normal,
        managed_by_ai: true,
    })
}
