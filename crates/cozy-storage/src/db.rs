//! Database connection management.
//!
//! One rusqlite Connection behind a Mutex. WAL mode so the embedding
//! host's reads never block alarm writes, and migrations run on open so
//! callers always see the current schema.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use cozy_core::error::CozyError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not
/// Sync; all access funnels through [`with_conn`](Self::with_conn).
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path, creating parent
    /// directories as needed.
    pub fn new(path: &Path) -> Result<Self, CozyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CozyError::Storage(format!("Failed to open database: {}", e)))?;
        let db = Self::from_connection(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, CozyError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CozyError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        Self::from_connection(conn)
    }

    /// Apply pragmas and migrations, then wrap the connection.
    fn from_connection(conn: Connection) -> Result<Self, CozyError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| CozyError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure, so multi-step
    /// reads (select then delete) stay consistent.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, CozyError>
    where
        F: FnOnce(&Connection) -> Result<T, CozyError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CozyError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
