//! Wall-clock scan scheduler.
//!
//! Keeps an armed map of id to target instant and re-reads the injected
//! clock on every pass, so alarms missed while the host was suspended are
//! delivered on the next scan after resume: late, never early, exactly
//! once. The runtime backend's monotonic sleeps stall across suspend;
//! this backend is for environments that need wake reliability.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use cozy_core::types::{AlarmId, Timestamp};

use crate::clock::Clock;
use crate::scheduler::{DueSender, Scheduler};

/// Scheduler backed by a wall-clock scan loop.
pub struct WallClockScheduler {
    clock: Arc<dyn Clock>,
    due_tx: DueSender,
    armed: Mutex<HashMap<AlarmId, Timestamp>>,
    tick: Duration,
    shutdown: Arc<Notify>,
}

impl WallClockScheduler {
    /// `tick` bounds both the scan interval and how long a newly armed
    /// timer can go unnoticed while the loop is asleep.
    pub fn new(clock: Arc<dyn Clock>, due_tx: DueSender, tick: Duration) -> Self {
        Self {
            clock,
            due_tx,
            armed: Mutex::new(HashMap::new()),
            tick,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Run the scan loop until shutdown.
    ///
    /// Each pass delivers every armed timer whose target has passed
    /// (earliest first; entries are removed before their ids are sent),
    /// then sleeps until the earliest remaining target or one tick,
    /// whichever comes first.
    pub async fn run(&self) {
        loop {
            let now = self.clock.now();

            let mut due: Vec<(AlarmId, Timestamp)> = {
                let mut armed = self.armed.lock().unwrap();
                let ids: Vec<(AlarmId, Timestamp)> = armed
                    .iter()
                    .filter(|(_, target)| **target <= now)
                    .map(|(id, target)| (*id, *target))
                    .collect();
                for (id, _) in &ids {
                    armed.remove(id);
                }
                ids
            };
            due.sort_by_key(|(id, target)| (*target, *id));

            for (id, target) in due {
                debug!(%id, %target, "wall-clock timer due");
                let _ = self.due_tx.send(id);
            }

            let sleep_for = {
                let armed = self.armed.lock().unwrap();
                armed
                    .values()
                    .map(|target| Duration::from_millis((target.0 - now.0).max(0) as u64))
                    .min()
                    .map(|until_next| until_next.min(self.tick))
                    .unwrap_or(self.tick)
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.shutdown.notified() => return,
            }
        }
    }
}

impl Scheduler for WallClockScheduler {
    fn arm(&self, id: AlarmId, time: Timestamp) {
        if time <= self.clock.now() {
            debug!(%id, %time, "arm skipped: target not in the future");
            return;
        }
        // Insert replaces any previous target for this id.
        self.armed.lock().unwrap().insert(id, time);
    }

    fn cancel(&self, id: AlarmId) {
        if self.armed.lock().unwrap().remove(&id).is_some() {
            debug!(%id, "timer canceled");
        }
    }

    fn is_armed(&self, id: AlarmId) -> bool {
        self.armed.lock().unwrap().contains_key(&id)
    }

    fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }

    fn shutdown(&self) {
        self.armed.lock().unwrap().clear();
        self.shutdown.notify_one();
    }
}
