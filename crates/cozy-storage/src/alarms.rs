//! Alarm persistence.
//!
//! CRUD plus the two bulk shapes the coordinator needs: time-ordered
//! listing and removal of all AI-managed rows. The `sound` column stores
//! the legacy string encoding; it is decoded into `SoundRef` here, at the
//! store boundary, and nowhere else.

use std::sync::Arc;

use rusqlite::{OptionalExtension, Row};

use cozy_core::error::CozyError;
use cozy_core::types::{Alarm, AlarmId, NewAlarm, SoundRef, Timestamp};

use crate::db::Database;

/// Repository for alarm records.
pub struct AlarmRepository {
    db: Arc<Database>,
}

fn row_to_alarm(row: &Row<'_>) -> rusqlite::Result<Alarm> {
    Ok(Alarm {
        id: AlarmId(row.get(0)?),
        time: Timestamp(row.get(1)?),
        label: row.get(2)?,
        sound: SoundRef::parse(&row.get::<_, String>(3)?),
        is_repeating: row.get::<_, i64>(4)? != 0,
        managed_by_ai: row.get::<_, i64>(5)? != 0,
    })
}

impl AlarmRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new alarm and return the allocated id.
    pub fn add(&self, new: &NewAlarm) -> Result<AlarmId, CozyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alarms (time, label, sound, is_repeating, managed_by_ai)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    new.time.0,
                    new.label,
                    new.sound.to_string(),
                    new.is_repeating as i32,
                    new.managed_by_ai as i32,
                ],
            )
            .map_err(|e| CozyError::Storage(format!("Failed to insert alarm: {}", e)))?;
            Ok(AlarmId(conn.last_insert_rowid()))
        })
    }

    /// Load an alarm by id.
    pub fn get(&self, id: AlarmId) -> Result<Option<Alarm>, CozyError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, time, label, sound, is_repeating, managed_by_ai
                 FROM alarms WHERE id = ?1",
                rusqlite::params![id.0],
                row_to_alarm,
            )
            .optional()
            .map_err(|e| CozyError::Storage(format!("Failed to load alarm: {}", e)))
        })
    }

    /// Upsert by id (used for rescheduling a repeating alarm in place).
    pub fn put(&self, alarm: &Alarm) -> Result<(), CozyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alarms (id, time, label, sound, is_repeating, managed_by_ai)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     time = excluded.time,
                     label = excluded.label,
                     sound = excluded.sound,
                     is_repeating = excluded.is_repeating,
                     managed_by_ai = excluded.managed_by_ai",
                rusqlite::params![
                    alarm.id.0,
                    alarm.time.0,
                    alarm.label,
                    alarm.sound.to_string(),
                    alarm.is_repeating as i32,
                    alarm.managed_by_ai as i32,
                ],
            )
            .map_err(|e| CozyError::Storage(format!("Failed to upsert alarm: {}", e)))?;
            Ok(())
        })
    }

    /// Delete by id. Idempotent: deleting a missing id is a no-op.
    pub fn delete(&self, id: AlarmId) -> Result<(), CozyError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM alarms WHERE id = ?1", rusqlite::params![id.0])
                .map_err(|e| CozyError::Storage(format!("Failed to delete alarm: {}", e)))?;
            Ok(())
        })
    }

    /// All alarms ascending by time, ties broken by id for determinism.
    pub fn list_by_time(&self) -> Result<Vec<Alarm>, CozyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, time, label, sound, is_repeating, managed_by_ai
                     FROM alarms ORDER BY time ASC, id ASC",
                )
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_alarm)
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let mut alarms = Vec::new();
            for row in rows {
                alarms.push(row.map_err(|e| CozyError::Storage(e.to_string()))?);
            }
            Ok(alarms)
        })
    }

    /// Remove every AI-managed alarm, returning the removed ids so the
    /// caller can cancel their timers. Select and delete run under the
    /// single connection lock.
    pub fn delete_ai_managed(&self) -> Result<Vec<AlarmId>, CozyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id FROM alarms WHERE managed_by_ai = 1 ORDER BY id ASC")
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| row.get::<_, i64>(0))
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let mut ids = Vec::new();
            for row in rows {
                ids.push(AlarmId(
                    row.map_err(|e| CozyError::Storage(e.to_string()))?,
                ));
            }

            conn.execute("DELETE FROM alarms WHERE managed_by_ai = 1", [])
                .map_err(|e| CozyError::Storage(format!("Failed to delete AI alarms: {}", e)))?;

            Ok(ids)
        })
    }

    /// Total number of stored alarms.
    pub fn count(&self) -> Result<u64, CozyError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM alarms", [], |row| row.get(0))
                .map_err(|e| CozyError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}
