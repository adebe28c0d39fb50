//! Host-runtime timer scheduler.
//!
//! One spawned task per armed id sleeps until the target instant. A
//! generation counter per arm call guards against stale deliveries: after
//! a re-arm or cancel, an already-elapsed sleeper finds its generation
//! superseded and sends nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use cozy_core::types::{AlarmId, Timestamp};

use crate::clock::Clock;
use crate::scheduler::{DueSender, Scheduler};

struct ArmedTimer {
    generation: u64,
    // Attached after spawn; delivery correctness rests on the generation
    // check, aborting is cleanup.
    task: Option<JoinHandle<()>>,
}

/// Scheduler backed by per-id runtime timer tasks.
///
/// Suited to hosts that keep running: a suspended process delivers these
/// timers only after resume (late, never early). For wake reliability
/// across suspend, use the wall-clock backend.
pub struct RuntimeScheduler {
    clock: Arc<dyn Clock>,
    due_tx: DueSender,
    armed: Arc<Mutex<HashMap<AlarmId, ArmedTimer>>>,
    next_generation: AtomicU64,
}

impl RuntimeScheduler {
    /// Must be created and used inside a tokio runtime; `arm` spawns
    /// timer tasks.
    pub fn new(clock: Arc<dyn Clock>, due_tx: DueSender) -> Self {
        Self {
            clock,
            due_tx,
            armed: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }
}

impl Scheduler for RuntimeScheduler {
    fn arm(&self, id: AlarmId, time: Timestamp) {
        let delay_ms = time.0 - self.clock.now().0;
        if delay_ms <= 0 {
            debug!(%id, %time, "arm skipped: target not in the future");
            return;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        // Register the new generation before the timer task exists so an
        // early wakeup on another worker cannot miss it.
        {
            let mut armed = self.armed.lock().unwrap();
            if let Some(old) = armed.insert(
                id,
                ArmedTimer {
                    generation,
                    task: None,
                },
            ) {
                if let Some(task) = old.task {
                    task.abort();
                }
            }
        }

        let armed = Arc::clone(&self.armed);
        let due_tx = self.due_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;

            // Deliver only if this arm call is still the current one.
            let mut armed = armed.lock().unwrap();
            if armed.get(&id).is_some_and(|t| t.generation == generation) {
                armed.remove(&id);
                let _ = due_tx.send(id);
            }
        });

        let mut armed = self.armed.lock().unwrap();
        match armed.get_mut(&id) {
            Some(entry) if entry.generation == generation => entry.task = Some(task),
            // Replaced or canceled while spawning.
            _ => task.abort(),
        }
    }

    fn cancel(&self, id: AlarmId) {
        let mut armed = self.armed.lock().unwrap();
        if let Some(timer) = armed.remove(&id) {
            if let Some(task) = timer.task {
                task.abort();
            }
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
        let mut armed = self.armed.lock().unwrap();
        for (_, timer) in armed.drain() {
            if let Some(task) = timer.task {
                task.abort();
            }
        }
    }
}
