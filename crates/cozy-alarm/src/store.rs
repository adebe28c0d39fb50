//! Alarm store contract.
//!
//! The coordinator depends on this trait, not on SQLite. The store is the
//! single source of truth for alarm records; it has no side effects beyond
//! the persisted collection and never touches the scheduler. Every method
//! is a suspend point from the coordinator's perspective.

use async_trait::async_trait;

use cozy_core::error::CozyError;
use cozy_core::types::{Alarm, AlarmId, NewAlarm};
use cozy_storage::AlarmRepository;

/// Durable keyed collection of alarm records.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Persist a new record and return the allocated id.
    async fn add(&self, new: &NewAlarm) -> Result<AlarmId, CozyError>;

    /// Load by id.
    async fn get(&self, id: AlarmId) -> Result<Option<Alarm>, CozyError>;

    /// Upsert by id (used for rescheduling).
    async fn put(&self, alarm: &Alarm) -> Result<(), CozyError>;

    /// Idempotent delete; a missing id is a no-op, not an error.
    async fn delete(&self, id: AlarmId) -> Result<(), CozyError>;

    /// Snapshot of all alarms ascending by time, ties broken by id.
    async fn list_by_time(&self) -> Result<Vec<Alarm>, CozyError>;

    /// Remove every AI-managed alarm, returning the removed ids.
    async fn delete_ai_managed(&self) -> Result<Vec<AlarmId>, CozyError>;
}

#[async_trait]
impl AlarmStore for AlarmRepository {
    async fn add(&self, new: &NewAlarm) -> Result<AlarmId, CozyError> {
        AlarmRepository::add(self, new)
    }

    async fn get(&self, id: AlarmId) -> Result<Option<Alarm>, CozyError> {
        AlarmRepository::get(self, id)
    }

    async fn put(&self, alarm: &Alarm) -> Result<(), CozyError> {
        AlarmRepository::put(self, alarm)
    }

    async fn delete(&self, id: AlarmId) -> Result<(), CozyError> {
        AlarmRepository::delete(self, id)
    }

    async fn list_by_time(&self) -> Result<Vec<Alarm>, CozyError> {
        AlarmRepository::list_by_time(self)
    }

    async fn delete_ai_managed(&self) -> Result<Vec<AlarmId>, CozyError> {
        AlarmRepository::delete_ai_managed(self)
    }
}
