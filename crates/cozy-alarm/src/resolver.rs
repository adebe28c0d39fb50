//! Sound resolution.
//!
//! Turns a stored [`SoundRef`] into something playable. Resolution never
//! fails: every missing or malformed reference degrades to the fallback
//! tone, and each degradation is logged so it can be diagnosed later.

use std::sync::Arc;

use tracing::warn;

use cozy_core::types::{PlayHandle, SoundRef, UserSoundKind};

use crate::library::SoundLibrary;

/// One entry of the built-in ambient sound catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSound {
    /// Stable key stored in a `SoundRef::Default`.
    pub key: &'static str,
    /// Display name shown to users and matched during import.
    pub name: &'static str,
    pub icon: &'static str,
    pub url: &'static str,
}

/// Built-in ambient sounds, addressable by key.
pub const DEFAULT_SOUNDS: [DefaultSound; 6] = [
    DefaultSound {
        key: "rain",
        name: "Rain",
        icon: "fas fa-cloud-showers-heavy",
        url: "https://www.soundjay.com/nature/rain-04.mp3",
    },
    DefaultSound {
        key: "river",
        name: "River",
        icon: "fas fa-water",
        url: "https://www.soundjay.com/nature/sounds/river-2.mp3",
    },
    DefaultSound {
        key: "lake",
        name: "Lake Waves",
        icon: "fas fa-wave-square",
        url: "https://www.soundjay.com/nature/sounds/lake-waves-01.mp3",
    },
    DefaultSound {
        key: "wind",
        name: "Wind",
        icon: "fas fa-wind",
        url: "https://www.soundjay.com/nature/wind-1.mp3",
    },
    DefaultSound {
        key: "campfire",
        name: "Campfire",
        icon: "fas fa-fire",
        url: "https://www.soundjay.com/nature/campfire-1.mp3",
    },
    DefaultSound {
        key: "ocean",
        name: "Ocean Waves",
        icon: "fas fa-water",
        url: "https://www.soundjay.com/nature/ocean-wave-1.mp3",
    },
];

/// Tone used whenever a reference cannot be resolved to a real sound.
pub const FALLBACK_TONE_URL: &str =
    "https://assets.mixkit.co/sfx/preview/mixkit-alarm-digital-bleep-991.mp3";

/// Look up a built-in sound by its stored key.
pub fn default_sound(key: &str) -> Option<&'static DefaultSound> {
    DEFAULT_SOUNDS.iter().find(|s| s.key == key)
}

/// Resolves sound references against the built-in catalog and the user
/// sound library.
#[derive(Clone)]
pub struct SoundResolver {
    library: Arc<dyn SoundLibrary>,
    fallback_url: String,
}

impl SoundResolver {
    pub fn new(library: Arc<dyn SoundLibrary>) -> Self {
        Self::with_fallback(library, FALLBACK_TONE_URL)
    }

    pub fn with_fallback(library: Arc<dyn SoundLibrary>, fallback_url: impl Into<String>) -> Self {
        Self {
            library,
            fallback_url: fallback_url.into(),
        }
    }

    /// Resolve a reference to a playable handle.
    ///
    /// Always returns a handle. An alarm must make noise even when its
    /// sound has been deleted since it was created, so unknown keys,
    /// missing library rows and empty URLs all degrade to the fallback
    /// tone instead of erroring.
    pub async fn resolve(&self, sound: &SoundRef) -> PlayHandle {
        match sound {
            SoundRef::Default(key) => match default_sound(key) {
                Some(entry) => PlayHandle::Stream {
                    url: entry.url.to_string(),
                },
                None => {
                    warn!(key = %key, "unknown default sound, using fallback tone");
                    self.fallback()
                }
            },
            SoundRef::User(id) => match self.library.get_by_id(*id).await {
                Ok(Some(user_sound)) => match user_sound.kind {
                    UserSoundKind::Upload { media_type } => PlayHandle::Clip {
                        sound_id: user_sound.id,
                        media_type,
                    },
                    UserSoundKind::LinkedVideo { video_id } => PlayHandle::Video { video_id },
                },
                Ok(None) => {
                    warn!(sound_id = id, "user sound no longer exists, using fallback tone");
                    self.fallback()
                }
                Err(e) => {
                    warn!(sound_id = id, error = %e, "user sound lookup failed, using fallback tone");
                    self.fallback()
                }
            },
            SoundRef::Raw(url) => {
                if url.is_empty() {
                    warn!("empty raw sound reference, using fallback tone");
                    self.fallback()
                } else {
                    PlayHandle::Stream { url: url.clone() }
                }
            }
        }
    }

    /// Map a free-form sound request from an imported schedule to a
    /// stored reference.
    ///
    /// Matches the built-in catalog by key or display name ignoring
    /// case, then falls back to the user's first favorited sound, then
    /// to the fallback tone.
    pub async fn resolve_request(&self, request: &str) -> SoundRef {
        let wanted = request.trim();
        if !wanted.is_empty() {
            if let Some(entry) = DEFAULT_SOUNDS
                .iter()
                .find(|s| s.key.eq_ignore_ascii_case(wanted) || s.name.eq_ignore_ascii_case(wanted))
            {
                return SoundRef::Default(entry.key.to_string());
            }
        }

        match self.library.list_favorited().await {
            Ok(favorites) => {
                if let Some(favorite) = favorites.first() {
                    return SoundRef::User(favorite.id);
                }
            }
            Err(e) => {
                warn!(error = %e, "favorite sound lookup failed");
            }
        }

        warn!(request = %request, "no matching sound, falling back to tone");
        SoundRef::Raw(self.fallback_url.clone())
    }

    fn fallback(&self) -> PlayHandle {
        PlayHandle::FallbackTone {
            url: self.fallback_url.clone(),
        }
    }
}
