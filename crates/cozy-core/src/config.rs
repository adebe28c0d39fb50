//! Workspace configuration loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CozyError, Result};

/// Top-level configuration for an embedding host.
///
/// Loaded from `~/.cozy/config.toml` by convention. Every section has full
/// defaults, so an empty file (or no file) yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CozyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sounds: SoundsConfig,
}

impl Default for CozyConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
            scheduler: SchedulerConfig::default(),
            sounds: SoundsConfig::default(),
        }
    }
}

impl CozyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CozyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CozyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "~/.cozy/cozy.db".to_string(),
        }
    }
}

/// Which scheduler implementation the host should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerBackend {
    /// Host-runtime timers; fine while the process keeps running.
    Runtime,
    /// Wall-clock scan loop; delivers missed alarms after suspend.
    WallClock,
}

/// Background scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub backend: SchedulerBackend,
    /// Scan interval for the wall-clock backend, in seconds.
    pub tick_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backend: SchedulerBackend::Runtime,
            tick_seconds: 1,
        }
    }
}

/// Sound resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundsConfig {
    /// URL of the guaranteed-available alarm tone used when resolution
    /// degrades.
    pub fallback_url: String,
}

impl Default for SoundsConfig {
    fn default() -> Self {
        Self {
            fallback_url:
                "https://assets.mixkit.co/sfx/preview/mixkit-alarm-digital-bleep-991.mp3"
                    .to_string(),
        }
    }
}
