//! Shared domain types for the alarm subsystem.
//!
//! Newtypes enforce unit discipline (epoch milliseconds, store-allocated
//! ids) and `SoundRef` replaces the legacy string-prefix tagging of sound
//! references with an explicit tagged type, decoded once at the store
//! boundary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Time
// =============================================================================

/// Milliseconds in one day; repeating alarms advance by exactly this much.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Unix timestamp in milliseconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + days * MILLIS_PER_DAY)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Store-allocated alarm identifier.
///
/// Assigned monotonically by the alarm store on insert and never reused
/// after deletion. Stable for the alarm's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub i64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Sound References
// =============================================================================

/// A reference to the sound an alarm should play.
///
/// Persisted as the legacy string encoding so existing data keeps working:
/// `default-<key>` for built-in library entries, `user-<integer>` for
/// sounds in the user library, and any other string as a raw URL. A
/// `user-` marker with a non-numeric id never carried a valid reference
/// and decodes as `Raw`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SoundRef {
    /// Built-in library entry, keyed by its short name (e.g. `rain`).
    Default(String),
    /// Entry in the user sound library, by store id.
    User(i64),
    /// A directly resolvable URL.
    Raw(String),
}

impl SoundRef {
    /// Decode the persisted string form. Never fails: unrecognized input
    /// is carried through as a raw reference.
    pub fn parse(s: &str) -> Self {
        if let Some(key) = s.strip_prefix("default-") {
            return SoundRef::Default(key.to_string());
        }
        if let Some(raw_id) = s.strip_prefix("user-") {
            if let Ok(id) = raw_id.parse::<i64>() {
                return SoundRef::User(id);
            }
        }
        SoundRef::Raw(s.to_string())
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundRef::Default(key) => write!(f, "default-{}", key),
            SoundRef::User(id) => write!(f, "user-{}", id),
            SoundRef::Raw(url) => write!(f, "{}", url),
        }
    }
}

// Serialized as the legacy string encoding, matching the persisted layout.
impl Serialize for SoundRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SoundRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SoundRef::parse(&s))
    }
}

// =============================================================================
// Alarm Records
// =============================================================================

/// A scheduled wake event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    /// Store-allocated, stable for the alarm's lifetime.
    pub id: AlarmId,
    /// Absolute instant at which the alarm must fire.
    pub time: Timestamp,
    /// Display text; empty means unset. No effect on firing.
    #[serde(default)]
    pub label: String,
    /// What to play when the alarm fires.
    pub sound: SoundRef,
    /// Repeating alarms are rescheduled a day forward on fire instead of
    /// being deleted.
    pub is_repeating: bool,
    /// Alarms owned by the AI schedule importer; replaced as a group on
    /// every import, never merged with user-created alarms.
    #[serde(default)]
    pub managed_by_ai: bool,
}

impl Alarm {
    /// Next fire instant for a repeating alarm: one day later, rolled
    /// forward in whole days until strictly after `now`. The roll-forward
    /// keeps rescheduling future-by-construction even when the host slept
    /// through several occurrences.
    pub fn next_occurrence(&self, now: Timestamp) -> Timestamp {
        let mut next = self.time.plus_days(1);
        while next <= now {
            next = next.plus_days(1);
        }
        next
    }
}

/// Input for creating an alarm; the store allocates the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAlarm {
    pub time: Timestamp,
    #[serde(default)]
    pub label: String,
    pub sound: SoundRef,
    pub is_repeating: bool,
    #[serde(default)]
    pub managed_by_ai: bool,
}

impl NewAlarm {
    pub fn with_id(&self, id: AlarmId) -> Alarm {
        Alarm {
            id,
            time: self.time,
            label: self.label.clone(),
            sound: self.sound.clone(),
            is_repeating: self.is_repeating,
            managed_by_ai: self.managed_by_ai,
        }
    }
}

// =============================================================================
// Play Handles
// =============================================================================

/// What sound resolution produces: something the playback layer can act on
/// without further lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayHandle {
    /// Stream an audio URL (built-in library entry or raw reference).
    Stream { url: String },
    /// Play an uploaded clip; the blob is fetched from the sound library
    /// by id.
    Clip { sound_id: i64, media_type: String },
    /// Direct the external video-embed collaborator to load this id.
    Video { video_id: String },
    /// The guaranteed-available built-in alarm tone.
    FallbackTone { url: String },
}

// =============================================================================
// User Sounds
// =============================================================================

/// How a user sound is backed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserSoundKind {
    /// Uploaded audio stored as a blob in the library.
    Upload { media_type: String },
    /// A linked external video, played through the embed collaborator.
    LinkedVideo { video_id: String },
}

/// A record in the user sound library.
///
/// The library itself (upload, rename, favorites UI) lives outside this
/// core; the resolver only reads these records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSound {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub kind: UserSoundKind,
    #[serde(default)]
    pub is_favorite: bool,
}
