//! Alarm coordination.
//!
//! Single entry point for alarm mutations. The coordinator validates,
//! persists through the store, arms timers through the scheduler, resolves
//! sounds at fire time and announces every state change on the event
//! channel. All collaborators are injected, so tests swap in manual clocks
//! and failing stores freely.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, info, warn};

use cozy_core::events::DomainEvent;
use cozy_core::types::{Alarm, AlarmId, NewAlarm};

use crate::clock::Clock;
use crate::error::{AlarmError, ImportReport, SkippedItem};
use crate::importer::{plan_item, ScheduleProposal};
use crate::resolver::SoundResolver;
use crate::scheduler::{DueReceiver, Scheduler};
use crate::store::AlarmStore;

/// Slow subscribers lag behind rather than block emission.
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct AlarmCoordinator {
    store: Arc<dyn AlarmStore>,
    scheduler: Arc<dyn Scheduler>,
    resolver: SoundResolver,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<DomainEvent>,
    due_rx: Mutex<DueReceiver>,
    shutdown: Notify,
}

impl AlarmCoordinator {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        scheduler: Arc<dyn Scheduler>,
        resolver: SoundResolver,
        clock: Arc<dyn Clock>,
        due_rx: DueReceiver,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            scheduler,
            resolver,
            clock,
            events,
            due_rx: Mutex::new(due_rx),
            shutdown: Notify::new(),
        }
    }

    /// Subscribe to domain events. Each subscriber gets every event
    /// emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Validate and create an alarm, arming its fire timer.
    ///
    /// The record is persisted before the timer is armed, so a storage
    /// failure leaves nothing armed.
    pub async fn create_alarm(&self, new: NewAlarm) -> Result<Alarm, AlarmError> {
        let now = self.clock.now();
        if new.time <= now {
            return Err(AlarmError::TimeNotInFuture {
                requested: new.time,
                now,
            });
        }

        let id = self.store.add(&new).await?;
        self.scheduler.arm(id, new.time);
        self.emit(DomainEvent::AlarmsChanged {
            timestamp: self.clock.now(),
        });
        info!(%id, time = %new.time, repeating = new.is_repeating, "alarm created");
        Ok(new.with_id(id))
    }

    /// Cancel the timer and delete the record, in that order, so a
    /// storage failure cannot leave an armed timer for a record that is
    /// about to disappear. Deleting an unknown id is a no-op.
    pub async fn delete_alarm(&self, id: AlarmId) -> Result<(), AlarmError> {
        self.scheduler.cancel(id);
        self.store.delete(id).await?;
        self.emit(DomainEvent::AlarmsChanged {
            timestamp: self.clock.now(),
        });
        info!(%id, "alarm deleted");
        Ok(())
    }

    /// All stored alarms, soonest first.
    pub async fn list_alarms(&self) -> Result<Vec<Alarm>, AlarmError> {
        Ok(self.store.list_by_time().await?)
    }

    /// Drive due timers until shutdown.
    ///
    /// Due alarms are handled one at a time, in delivery order. A failure
    /// handling one alarm is logged and does not stop the loop.
    pub async fn run(&self) {
        let mut due_rx = self.due_rx.lock().await;
        loop {
            tokio::select! {
                maybe_id = due_rx.recv() => {
                    let Some(id) = maybe_id else { return };
                    if let Err(e) = self.on_due(id).await {
                        warn!(%id, error = %e, "failed to handle due alarm");
                    }
                }
                _ = self.shutdown.notified() => return,
            }
        }
    }

    /// Stop the run loop. Armed timers are left to the scheduler's own
    /// shutdown.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Handle one due alarm id.
    ///
    /// Normally invoked from [`run`](Self::run); exposed so startup
    /// restoration can fire missed alarms directly. An id with no stored
    /// record is a stale timer for a deleted alarm and is silently
    /// dropped. Repeating alarms are persisted at their next occurrence
    /// and re-armed; one-shot alarms are deleted.
    pub async fn on_due(&self, id: AlarmId) -> Result<(), AlarmError> {
        let Some(alarm) = self.store.get(id).await? else {
            debug!(%id, "due timer for a deleted alarm, ignoring");
            return Ok(());
        };

        let handle = self.resolver.resolve(&alarm.sound).await;
        self.emit(DomainEvent::AlarmFired {
            id,
            label: alarm.label.clone(),
            sound: handle,
            timestamp: self.clock.now(),
        });
        info!(%id, label = %alarm.label, "alarm fired");

        if alarm.is_repeating {
            let next = alarm.next_occurrence(self.clock.now());
            let rescheduled = Alarm {
                time: next,
                ..alarm
            };
            self.store.put(&rescheduled).await?;
            self.scheduler.arm(id, next);
            debug!(%id, next = %next, "repeating alarm rescheduled");
        } else {
            self.store.delete(id).await?;
        }

        self.emit(DomainEvent::AlarmsChanged {
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Rebuild timer state from the store after a restart.
    ///
    /// Future alarms are re-armed; alarms whose time passed while the
    /// process was down fire immediately through the due path. Returns
    /// the number of timers armed.
    pub async fn restore(&self) -> Result<usize, AlarmError> {
        let now = self.clock.now();
        let alarms = self.store.list_by_time().await?;
        let mut fired = 0usize;
        for alarm in alarms {
            if alarm.time > now {
                self.scheduler.arm(alarm.id, alarm.time);
            } else {
                self.on_due(alarm.id).await?;
                fired += 1;
            }
        }
        let armed = self.scheduler.armed_count();
        info!(armed, fired, "alarm state restored");
        Ok(armed)
    }

    /// Replace all AI-managed alarms with a new proposal.
    ///
    /// Previously imported alarms are removed (and their timers canceled)
    /// even when the proposal is empty. Items are then processed
    /// independently: a malformed item is recorded in the report and its
    /// siblings still import. Only a storage failure aborts.
    pub async fn import_ai_schedule(
        &self,
        proposal: &ScheduleProposal,
    ) -> Result<ImportReport, AlarmError> {
        let removed = self.store.delete_ai_managed().await?;
        for id in &removed {
            self.scheduler.cancel(*id);
        }

        let now = self.clock.now();
        let mut report = ImportReport::default();
        for (index, item) in proposal.schedule_details.iter().enumerate() {
            match plan_item(item, now, &self.resolver).await {
                Ok(new) => {
                    let id = self.store.add(&new).await?;
                    self.scheduler.arm(id, new.time);
                    report.created.push(id);
                }
                Err(reason) => {
                    warn!(index, error = %reason, "schedule item skipped");
                    report.skipped.push(SkippedItem { index, reason });
                }
            }
        }

        self.emit(DomainEvent::ScheduleImported {
            created: report.created.len(),
            skipped: report.skipped.len(),
            timestamp: self.clock.now(),
        });
        self.emit(DomainEvent::AlarmsChanged {
            timestamp: self.clock.now(),
        });
        info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            replaced = removed.len(),
            "AI schedule imported"
        );
        Ok(report)
    }

    fn emit(&self, event: DomainEvent) {
        // Send only fails when no subscriber exists, which is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use cozy_core::error::CozyError;
    use cozy_core::types::{PlayHandle, SoundRef, Timestamp};
    use cozy_storage::{AlarmRepository, Database, SoundRepository};

    use crate::clock::ManualClock;
    use crate::importer::{ScheduleItem, ScheduleItemKind};
    use crate::scheduler::{due_channel, RuntimeScheduler};

    struct Parts {
        clock: Arc<ManualClock>,
        store: Arc<AlarmRepository>,
        scheduler: Arc<RuntimeScheduler>,
        coordinator: AlarmCoordinator,
    }

    fn make_parts() -> Parts {
        let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
        let db = Arc::new(Database::in_memory().unwrap());
        let store = Arc::new(AlarmRepository::new(Arc::clone(&db)));
        let library = Arc::new(SoundRepository::new(Arc::clone(&db)));
        let (due_tx, due_rx) = due_channel();
        let scheduler = Arc::new(RuntimeScheduler::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            due_tx,
        ));
        let coordinator = AlarmCoordinator::new(
            Arc::clone(&store) as Arc<dyn AlarmStore>,
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            SoundResolver::new(library),
            Arc::clone(&clock) as Arc<dyn Clock>,
            due_rx,
        );
        Parts {
            clock,
            store,
            scheduler,
            coordinator,
        }
    }

    fn sample(time_ms: i64) -> NewAlarm {
        NewAlarm {
            time: Timestamp(time_ms),
            label: "Morning".to_string(),
            sound: SoundRef::Default("rain".to_string()),
            is_repeating: false,
            managed_by_ai: false,
        }
    }

    fn schedule_item(date: &str, time: &str, kind: ScheduleItemKind) -> ScheduleItem {
        ScheduleItem {
            kind,
            time: time.to_string(),
            date: date.to_string(),
            sound_request: String::new(),
            label: String::new(),
        }
    }

    // ==========================================================
    // create / delete
    // ==========================================================

    #[tokio::test]
    async fn test_create_alarm_persists_and_arms() {
        let parts = make_parts();
        let mut events = parts.coordinator.subscribe();

        let alarm = parts.coordinator.create_alarm(sample(5_000)).await.unwrap();

        let stored = parts.store.get(alarm.id).unwrap().expect("persisted");
        assert_eq!(stored, alarm);
        assert!(parts.scheduler.is_armed(alarm.id));
        assert!(matches!(
            events.try_recv().unwrap(),
            DomainEvent::AlarmsChanged { .. }
        ));
    }

    #[tokio::test]
    async fn test_create_alarm_rejects_time_not_in_future() {
        let parts = make_parts();

        // Exactly now is rejected too.
        let err = parts.coordinator.create_alarm(sample(1_000)).await.unwrap_err();
        assert!(matches!(err, AlarmError::TimeNotInFuture { .. }));

        let err = parts.coordinator.create_alarm(sample(500)).await.unwrap_err();
        assert!(matches!(err, AlarmError::TimeNotInFuture { .. }));

        assert!(parts.store.list_by_time().unwrap().is_empty());
        assert_eq!(parts.scheduler.armed_count(), 0);
    }

    struct FailingStore;

    #[async_trait]
    impl AlarmStore for FailingStore {
        async fn add(&self, _new: &NewAlarm) -> Result<AlarmId, CozyError> {
            Err(CozyError::Storage("simulated write failure".to_string()))
        }

        async fn get(&self, _id: AlarmId) -> Result<Option<Alarm>, CozyError> {
            Ok(None)
        }

        async fn put(&self, _alarm: &Alarm) -> Result<(), CozyError> {
            Err(CozyError::Storage("simulated write failure".to_string()))
        }

        async fn delete(&self, _id: AlarmId) -> Result<(), CozyError> {
            Err(CozyError::Storage("simulated write failure".to_string()))
        }

        async fn list_by_time(&self) -> Result<Vec<Alarm>, CozyError> {
            Ok(Vec::new())
        }

        async fn delete_ai_managed(&self) -> Result<Vec<AlarmId>, CozyError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_create_storage_failure_leaves_nothing_armed() {
        let parts = make_parts();
        let (due_tx, due_rx) = due_channel();
        let scheduler = Arc::new(RuntimeScheduler::new(
            Arc::clone(&parts.clock) as Arc<dyn Clock>,
            due_tx,
        ));
        let library = Arc::new(SoundRepository::new(Arc::new(Database::in_memory().unwrap())));
        let coordinator = AlarmCoordinator::new(
            Arc::new(FailingStore),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            SoundResolver::new(library),
            Arc::clone(&parts.clock) as Arc<dyn Clock>,
            due_rx,
        );

        let err = coordinator.create_alarm(sample(5_000)).await.unwrap_err();
        assert!(matches!(err, AlarmError::Storage(_)));
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_alarm_cancels_and_removes() {
        let parts = make_parts();
        let alarm = parts.coordinator.create_alarm(sample(5_000)).await.unwrap();
        let mut events = parts.coordinator.subscribe();

        parts.coordinator.delete_alarm(alarm.id).await.unwrap();

        assert!(parts.store.get(alarm.id).unwrap().is_none());
        assert!(!parts.scheduler.is_armed(alarm.id));
        assert!(matches!(
            events.try_recv().unwrap(),
            DomainEvent::AlarmsChanged { .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_alarm_is_noop() {
        let parts = make_parts();
        parts.coordinator.delete_alarm(AlarmId(99)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_alarms_ordered_by_time() {
        let parts = make_parts();
        let late = parts.coordinator.create_alarm(sample(9_000)).await.unwrap();
        let early = parts.coordinator.create_alarm(sample(3_000)).await.unwrap();

        let listed = parts.coordinator.list_alarms().await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![early.id, late.id]
        );
    }

    // ==========================================================
    // due handling
    // ==========================================================

    #[tokio::test]
    async fn test_on_due_one_shot_fires_and_deletes() {
        let parts = make_parts();
        let id = parts.store.add(&sample(900)).unwrap();
        let mut events = parts.coordinator.subscribe();

        parts.coordinator.on_due(id).await.unwrap();

        match events.try_recv().unwrap() {
            DomainEvent::AlarmFired { id: fired, label, sound, .. } => {
                assert_eq!(fired, id);
                assert_eq!(label, "Morning");
                assert_eq!(
                    sound,
                    PlayHandle::Stream {
                        url: "https://www.soundjay.com/nature/rain-04.mp3".to_string()
                    }
                );
            }
            other => panic!("Expected AlarmFired, got {:?}", other),
        }
        assert!(matches!(
            events.try_recv().unwrap(),
            DomainEvent::AlarmsChanged { .. }
        ));
        assert!(parts.store.get(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_on_due_missing_record_is_silent() {
        let parts = make_parts();
        let mut events = parts.coordinator.subscribe();

        parts.coordinator.on_due(AlarmId(42)).await.unwrap();

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_on_due_repeating_reschedules_one_day_later() {
        let parts = make_parts();
        let id = parts
            .store
            .add(&NewAlarm {
                is_repeating: true,
                ..sample(1_000)
            })
            .unwrap();
        parts.clock.set(Timestamp(1_000));

        parts.coordinator.on_due(id).await.unwrap();

        let rescheduled = parts.store.get(id).unwrap().expect("still stored");
        assert_eq!(rescheduled.time, Timestamp(1_000 + 86_400_000));
        assert!(rescheduled.is_repeating);
        assert!(parts.scheduler.is_armed(id));
    }

    #[tokio::test]
    async fn test_on_due_repeating_rolls_past_missed_days() {
        let parts = make_parts();
        let id = parts
            .store
            .add(&NewAlarm {
                is_repeating: true,
                ..sample(1_000)
            })
            .unwrap();
        // Three full days passed while the host was suspended.
        parts.clock.set(Timestamp(1_000 + 3 * 86_400_000));

        parts.coordinator.on_due(id).await.unwrap();

        let rescheduled = parts.store.get(id).unwrap().unwrap();
        assert_eq!(rescheduled.time, Timestamp(1_000 + 4 * 86_400_000));
        assert!(parts.scheduler.is_armed(id));
    }

    // ==========================================================
    // restore
    // ==========================================================

    #[tokio::test]
    async fn test_restore_arms_future_and_fires_missed() {
        let parts = make_parts();
        let future_id = parts.store.add(&sample(5_000)).unwrap();
        let missed_id = parts.store.add(&sample(500)).unwrap();
        let repeating_id = parts
            .store
            .add(&NewAlarm {
                is_repeating: true,
                ..sample(800)
            })
            .unwrap();
        let mut events = parts.coordinator.subscribe();

        let armed = parts.coordinator.restore().await.unwrap();

        // Future alarm armed; missed repeating alarm fired and re-armed.
        assert_eq!(armed, 2);
        assert!(parts.scheduler.is_armed(future_id));
        assert!(parts.scheduler.is_armed(repeating_id));
        assert!(parts.store.get(missed_id).unwrap().is_none());

        let mut fired = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::AlarmFired { id, .. } = event {
                fired.push(id);
            }
        }
        assert_eq!(fired, vec![missed_id, repeating_id]);
    }

    #[tokio::test]
    async fn test_restore_with_empty_store() {
        let parts = make_parts();
        assert_eq!(parts.coordinator.restore().await.unwrap(), 0);
    }

    // ==========================================================
    // AI schedule import
    // ==========================================================

    #[tokio::test]
    async fn test_import_replaces_ai_alarms_keeps_user_alarms() {
        let parts = make_parts();
        let user_alarm = parts.coordinator.create_alarm(sample(5_000)).await.unwrap();
        let old_ai = parts
            .coordinator
            .create_alarm(NewAlarm {
                managed_by_ai: true,
                ..sample(6_000)
            })
            .await
            .unwrap();

        let proposal = ScheduleProposal {
            intent: "set_schedule".to_string(),
            schedule_details: vec![
                schedule_item("2099-01-01", "07:30", ScheduleItemKind::Normal),
                schedule_item("2099-01-02", "09:00", ScheduleItemKind::Exception),
            ],
        };
        let report = parts.coordinator.import_ai_schedule(&proposal).await.unwrap();

        assert_eq!(report.created.len(), 2);
        assert!(report.skipped.is_empty());

        // The old AI alarm is gone, record and timer both.
        assert!(parts.store.get(old_ai.id).unwrap().is_none());
        assert!(!parts.scheduler.is_armed(old_ai.id));

        // The user alarm is untouched.
        assert!(parts.store.get(user_alarm.id).unwrap().is_some());
        assert!(parts.scheduler.is_armed(user_alarm.id));

        let listed = parts.store.list_by_time().unwrap();
        assert_eq!(listed.len(), 3);
        for id in &report.created {
            let imported = parts.store.get(*id).unwrap().unwrap();
            assert!(imported.managed_by_ai);
            assert!(parts.scheduler.is_armed(*id));
        }
    }

    #[tokio::test]
    async fn test_import_kind_controls_repetition() {
        let parts = make_parts();
        let proposal = ScheduleProposal {
            intent: String::new(),
            schedule_details: vec![
                schedule_item("2099-01-01", "07:30", ScheduleItemKind::Normal),
                schedule_item("2099-01-02", "09:00", ScheduleItemKind::Exception),
            ],
        };
        let report = parts.coordinator.import_ai_schedule(&proposal).await.unwrap();

        let normal = parts.store.get(report.created[0]).unwrap().unwrap();
        let exception = parts.store.get(report.created[1]).unwrap().unwrap();
        assert!(normal.is_repeating);
        assert!(!exception.is_repeating);
    }

    #[tokio::test]
    async fn test_import_collects_bad_items_and_keeps_good_ones() {
        let parts = make_parts();
        let mut events = parts.coordinator.subscribe();

        let proposal = ScheduleProposal {
            intent: String::new(),
            schedule_details: vec![
                schedule_item("2099-01-01", "07:30", ScheduleItemKind::Normal),
                schedule_item("-", "07:30", ScheduleItemKind::Normal),
                schedule_item("2099-01-03", "not-a-time", ScheduleItemKind::Normal),
                schedule_item("2099-01-04", "08:00", ScheduleItemKind::Exception),
            ],
        };
        let report = parts.coordinator.import_ai_schedule(&proposal).await.unwrap();

        assert_eq!(report.created.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(
            report.skipped[0].reason,
            crate::error::ImportItemError::MissingDateTime
        );
        assert_eq!(report.skipped[1].index, 2);
        assert!(matches!(
            report.skipped[1].reason,
            crate::error::ImportItemError::BadTime(_)
        ));

        match events.try_recv().unwrap() {
            DomainEvent::ScheduleImported { created, skipped, .. } => {
                assert_eq!(created, 2);
                assert_eq!(skipped, 2);
            }
            other => panic!("Expected ScheduleImported, got {:?}", other),
        }
        assert!(matches!(
            events.try_recv().unwrap(),
            DomainEvent::AlarmsChanged { .. }
        ));
    }

    #[tokio::test]
    async fn test_import_empty_proposal_clears_ai_alarms() {
        let parts = make_parts();
        let old_ai = parts
            .coordinator
            .create_alarm(NewAlarm {
                managed_by_ai: true,
                ..sample(6_000)
            })
            .await
            .unwrap();

        let proposal = ScheduleProposal {
            intent: "clear".to_string(),
            schedule_details: Vec::new(),
        };
        let report = parts.coordinator.import_ai_schedule(&proposal).await.unwrap();

        assert!(report.created.is_empty());
        assert!(report.skipped.is_empty());
        assert!(parts.store.get(old_ai.id).unwrap().is_none());
        assert!(!parts.scheduler.is_armed(old_ai.id));
    }

    // ==========================================================
    // run loop
    // ==========================================================

    #[tokio::test]
    async fn test_shutdown_stops_run_loop() {
        let parts = make_parts();
        let coordinator = Arc::new(parts.coordinator);

        let handle = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run().await })
        };

        coordinator.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("run should stop after shutdown")
            .unwrap();
    }
}
