//! Composition root.
//!
//! Wires the whole subsystem from a [`CozyConfig`]: opens the database,
//! constructs the scheduler backend the config names, builds the
//! coordinator and spawns its background loops. The embedding host keeps
//! the returned handle, subscribes to events, and calls
//! [`AlarmCoordinator::restore`] once a subscriber is in place so
//! boot-time fires are observed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use cozy_core::config::{CozyConfig, SchedulerBackend};
use cozy_storage::{AlarmRepository, Database, SoundRepository};

use crate::clock::{Clock, SystemClock};
use crate::coordinator::AlarmCoordinator;
use crate::error::AlarmError;
use crate::resolver::SoundResolver;
use crate::scheduler::{due_channel, RuntimeScheduler, Scheduler, WallClockScheduler};
use crate::store::AlarmStore;

/// Expand a leading ~ to the home directory.
fn resolve_database_path(raw: &str) -> PathBuf {
    if raw.starts_with("~/") || raw.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&raw[2..])
    } else {
        PathBuf::from(raw)
    }
}

/// A fully wired alarm subsystem with its background tasks running.
pub struct AlarmSystem {
    pub coordinator: Arc<AlarmCoordinator>,
    scheduler: Arc<dyn Scheduler>,
    tasks: Vec<JoinHandle<()>>,
}

impl AlarmSystem {
    /// Wire the subsystem from configuration and spawn its loops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &CozyConfig) -> Result<Self, AlarmError> {
        let db_path = resolve_database_path(&config.storage.database_path);
        let db = Arc::new(Database::new(&db_path)?);
        info!(path = %db_path.display(), "database opened");

        let store = Arc::new(AlarmRepository::new(Arc::clone(&db)));
        let library = Arc::new(SoundRepository::new(db));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let resolver = SoundResolver::with_fallback(library, config.sounds.fallback_url.clone());

        let (due_tx, due_rx) = due_channel();
        let mut tasks = Vec::new();
        let scheduler: Arc<dyn Scheduler> = match config.scheduler.backend {
            SchedulerBackend::Runtime => {
                Arc::new(RuntimeScheduler::new(Arc::clone(&clock), due_tx))
            }
            SchedulerBackend::WallClock => {
                let scanner = Arc::new(WallClockScheduler::new(
                    Arc::clone(&clock),
                    due_tx,
                    Duration::from_secs(config.scheduler.tick_seconds.max(1)),
                ));
                tasks.push(tokio::spawn({
                    let scanner = Arc::clone(&scanner);
                    async move { scanner.run().await }
                }));
                scanner
            }
        };

        let coordinator = Arc::new(AlarmCoordinator::new(
            store as Arc<dyn AlarmStore>,
            Arc::clone(&scheduler),
            resolver,
            clock,
            due_rx,
        ));
        tasks.push(tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.run().await }
        }));
        info!(backend = ?config.scheduler.backend, "alarm system started");

        Ok(Self {
            coordinator,
            scheduler,
            tasks,
        })
    }

    /// Stop the run loops and drop all armed timers.
    pub async fn stop(self) {
        self.coordinator.shutdown();
        self.scheduler.shutdown();
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
