//! User sound library persistence.
//!
//! The library UI (upload, rename, favorites) lives outside this core;
//! this repository carries what sound resolution needs: lookup by id,
//! the favorited list, and blob access for uploaded clips.

use std::sync::Arc;

use rusqlite::{OptionalExtension, Row};

use cozy_core::error::CozyError;
use cozy_core::types::{UserSound, UserSoundKind};

use crate::db::Database;

/// Repository for user sound records.
pub struct SoundRepository {
    db: Arc<Database>,
}

fn row_to_user_sound(row: &Row<'_>) -> rusqlite::Result<UserSound> {
    let kind: String = row.get(3)?;
    let kind = match kind.as_str() {
        "upload" => UserSoundKind::Upload {
            media_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        },
        _ => UserSoundKind::LinkedVideo {
            video_id: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        },
    };
    Ok(UserSound {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        kind,
        is_favorite: row.get::<_, i64>(6)? != 0,
    })
}

impl SoundRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a sound record and return the allocated id.
    ///
    /// `data` is the audio blob for uploads; linked videos pass `None`.
    pub fn save(
        &self,
        name: &str,
        icon: &str,
        kind: &UserSoundKind,
        data: Option<&[u8]>,
        is_favorite: bool,
    ) -> Result<i64, CozyError> {
        let (kind_str, media_type, video_id) = match kind {
            UserSoundKind::Upload { media_type } => ("upload", Some(media_type.as_str()), None),
            UserSoundKind::LinkedVideo { video_id } => {
                ("linked_video", None, Some(video_id.as_str()))
            }
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_sounds (name, icon, kind, media_type, video_id, data, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![name, icon, kind_str, media_type, video_id, data, is_favorite as i32],
            )
            .map_err(|e| CozyError::Storage(format!("Failed to save sound: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Load a sound record by id (without the blob).
    pub fn get_by_id(&self, id: i64) -> Result<Option<UserSound>, CozyError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, icon, kind, media_type, video_id, is_favorite
                 FROM user_sounds WHERE id = ?1",
                rusqlite::params![id],
                row_to_user_sound,
            )
            .optional()
            .map_err(|e| CozyError::Storage(format!("Failed to load sound: {}", e)))
        })
    }

    /// All favorited sounds, oldest first.
    pub fn list_favorited(&self) -> Result<Vec<UserSound>, CozyError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, icon, kind, media_type, video_id, is_favorite
                     FROM user_sounds WHERE is_favorite = 1 ORDER BY id ASC",
                )
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_user_sound)
                .map_err(|e| CozyError::Storage(e.to_string()))?;

            let mut sounds = Vec::new();
            for row in rows {
                sounds.push(row.map_err(|e| CozyError::Storage(e.to_string()))?);
            }
            Ok(sounds)
        })
    }

    /// Fetch the stored audio blob for an uploaded clip.
    pub fn load_clip(&self, id: i64) -> Result<Option<Vec<u8>>, CozyError> {
        self.db.with_conn(|conn| {
            let blob = conn
                .query_row(
                    "SELECT data FROM user_sounds WHERE id = ?1",
                    rusqlite::params![id],
                    |row| row.get::<_, Option<Vec<u8>>>(0),
                )
                .optional()
                .map_err(|e| CozyError::Storage(format!("Failed to load clip: {}", e)))?;
            Ok(blob.flatten())
        })
    }

    /// Mark or unmark a sound as favorite.
    pub fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<(), CozyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE user_sounds SET is_favorite = ?2 WHERE id = ?1",
                rusqlite::params![id, is_favorite as i32],
            )
            .map_err(|e| CozyError::Storage(format!("Failed to update favorite: {}", e)))?;
            Ok(())
        })
    }

    /// Delete a sound record. Idempotent.
    pub fn delete(&self, id: i64) -> Result<(), CozyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM user_sounds WHERE id = ?1",
                rusqlite::params![id],
            )
            .map_err(|e| CozyError::Storage(format!("Failed to delete sound: {}", e)))?;
            Ok(())
        })
    }
}
