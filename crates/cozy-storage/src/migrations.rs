//! Database schema migrations.
//!
//! Applies the initial schema: the alarms and user_sounds tables plus the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use cozy_core::error::CozyError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), CozyError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CozyError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| CozyError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), CozyError> {
    conn.execute_batch(
        "
        -- Alarm records. AUTOINCREMENT keeps ids monotonic; a deleted
        -- alarm's id is never handed out again.
        CREATE TABLE IF NOT EXISTS alarms (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            time            INTEGER NOT NULL,
            label           TEXT NOT NULL DEFAULT '',
            sound           TEXT NOT NULL DEFAULT '',
            is_repeating    INTEGER NOT NULL DEFAULT 0,
            managed_by_ai   INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_alarms_time
            ON alarms (time ASC, id ASC);

        CREATE INDEX IF NOT EXISTS idx_alarms_managed_by_ai
            ON alarms (managed_by_ai)
            WHERE managed_by_ai = 1;

        -- User sound library. Uploads carry the blob inline; linked videos
        -- carry only the external id.
        CREATE TABLE IF NOT EXISTS user_sounds (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            icon            TEXT NOT NULL DEFAULT '',
            kind            TEXT NOT NULL
                            CHECK (kind IN ('upload', 'linked_video')),
            media_type      TEXT,
            video_id        TEXT,
            data            BLOB,
            is_favorite     INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_user_sounds_favorite
            ON user_sounds (is_favorite, id ASC);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| CozyError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
