//! Reminder scheduler — local timers for the signed-in patient's task list.
//!
//! Policy: on every snapshot of the task set, cancel ALL pending timers and
//! recompute from scratch. The in-memory timer set is therefore always a
//! pure function of the latest observed snapshot — no stale timer survives
//! a task deletion or a reminder-time change, and re-delivered or
//! out-of-order snapshots are harmless.
//!
//! Eligibility: `reminder_at` strictly in the future at observation time
//! AND `alarm_fired_at` unset. Past-due reminders never fire retroactively,
//! and a reminder that already fired once is never re-armed.
//!
//! Firing: local notification (requesting permission first if undetermined,
//! skipping silently if denied), the configured alarm sound, then a
//! best-effort `alarmFiredAt` write-back through the gateway.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::{json, Map};
use tokio::task::JoinHandle;

use crate::gateway::{paths, RealtimeStore, Subscription};
use crate::models::enums::AlarmSound;
use crate::models::Task;
use crate::notify::{AlarmPlayer, Notifier, Permission};

pub struct ReminderScheduler {
    store: Arc<dyn RealtimeStore>,
    notifier: Arc<dyn Notifier>,
    alarm: Arc<dyn AlarmPlayer>,
    /// Whose task list this scheduler serves. A new identity gets a new
    /// scheduler; tearing this one down cancels everything.
    patient_uid: String,
    alarm_sound: Mutex<AlarmSound>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        notifier: Arc<dyn Notifier>,
        alarm: Arc<dyn AlarmPlayer>,
        patient_uid: impl Into<String>,
        alarm_sound: AlarmSound,
    ) -> Self {
        Self {
            store,
            notifier,
            alarm,
            patient_uid: patient_uid.into(),
            alarm_sound: Mutex::new(alarm_sound),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Swap the alarm variant (settings save while the scheduler is live).
    pub fn set_alarm_sound(&self, sound: AlarmSound) {
        if let Ok(mut current) = self.alarm_sound.lock() {
            *current = sound;
        }
    }

    /// Recompute the timer set from a fresh task snapshot.
    ///
    /// Cancels every pending timer, then schedules one timer per eligible
    /// task. Feeding the same snapshot twice yields the same pending set.
    pub fn refresh(self: &Arc<Self>, tasks: &HashMap<String, Task>) {
        let now = Utc::now();
        let mut timers = match self.timers.lock() {
            Ok(timers) => timers,
            Err(_) => return,
        };
        for (_, handle) in timers.drain() {
            handle.abort();
        }

        for task in tasks.values() {
            if task.alarm_fired_at.is_some() {
                continue;
            }
            let due = match task.reminder_at {
                Some(due) if due > now => due,
                // Absent or already past at observation time: never fires.
                _ => continue,
            };
            let delay = (due - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            let scheduler = Arc::clone(self);
            let task_id = task.id.clone();
            let text = task.text.clone();
            timers.insert(
                task.id.clone(),
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    scheduler.fire(&task_id, &text).await;
                }),
            );
        }
        tracing::debug!(
            patient = %self.patient_uid,
            pending = timers.len(),
            "Reminder timers recomputed"
        );
    }

    /// Timers scheduled and not yet fired.
    pub fn pending_count(&self) -> usize {
        self.timers
            .lock()
            .map(|timers| timers.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Cancel every pending timer (teardown / identity change).
    pub fn clear(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, handle) in timers.drain() {
                handle.abort();
            }
        }
    }

    async fn fire(&self, task_id: &str, text: &str) {
        let permission = match self.notifier.permission() {
            Permission::Undetermined => self.notifier.request_permission(),
            known => known,
        };
        match permission {
            Permission::Granted => self.notifier.notify("Task reminder", text),
            // Denied: skip silently, the alarm sound still plays.
            _ => {}
        }

        let sound = self
            .alarm_sound
            .lock()
            .map(|s| *s)
            .unwrap_or(AlarmSound::Beep);
        self.alarm.play(sound);

        // Best-effort acknowledgement: failure is logged, never retried.
        let mut fields = Map::new();
        fields.insert("alarmFiredAt".into(), json!(Utc::now().to_rfc3339()));
        if let Err(e) = self
            .store
            .update(&paths::task(&self.patient_uid, task_id), fields)
            .await
        {
            tracing::warn!(task = task_id, error = %e, "alarmFiredAt write failed");
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, handle) in timers.drain() {
                handle.abort();
            }
        }
    }
}

/// Parse a task-collection snapshot from the untyped store value.
pub fn tasks_from_snapshot(value: &serde_json::Value) -> HashMap<String, Task> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(id, body)| (id.clone(), Task::from_store(id, body)))
                .collect()
        })
        .unwrap_or_default()
}

/// Drive a scheduler from a live task subscription.
///
/// Refreshes once from the current snapshot, then on every change, until
/// the subscription's store goes away or the returned handle is aborted.
pub fn spawn_task_watcher(
    scheduler: Arc<ReminderScheduler>,
    mut subscription: Subscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = tasks_from_snapshot(&subscription.current());
            scheduler.refresh(&snapshot);
            if !subscription.changed().await {
                break;
            }
        }
        scheduler.clear();
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryStore;
    use crate::notify::{RecordingAlarmPlayer, RecordingNotifier};
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        alarm: Arc<RecordingAlarmPlayer>,
        scheduler: Arc<ReminderScheduler>,
    }

    fn fixture(permission: Permission, sound: AlarmSound) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new(permission));
        let alarm = Arc::new(RecordingAlarmPlayer::new());
        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::clone(&store) as Arc<dyn RealtimeStore>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Arc::clone(&alarm) as Arc<dyn AlarmPlayer>,
            "p1",
            sound,
        ));
        Fixture {
            store,
            notifier,
            alarm,
            scheduler,
        }
    }

    fn task_due_in(id: &str, seconds: i64) -> Task {
        let mut task = Task::new(id, format!("task {id}"), "p1");
        task.reminder_at = Some(Utc::now() + ChronoDuration::seconds(seconds));
        task
    }

    fn snapshot(tasks: Vec<Task>) -> HashMap<String, Task> {
        tasks.into_iter().map(|t| (t.id.clone(), t)).collect()
    }

    #[tokio::test]
    async fn schedules_only_future_reminders() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        let tasks = snapshot(vec![
            task_due_in("future", 60),
            task_due_in("past", -60),
            Task::new("none", "no reminder", "p1"),
        ]);
        f.scheduler.refresh(&tasks);
        assert_eq!(f.scheduler.pending_count(), 1);
    }

    #[tokio::test]
    async fn already_fired_task_is_not_rearmed() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        let mut task = task_due_in("t1", 60);
        task.alarm_fired_at = Some(Utc::now());
        f.scheduler.refresh(&snapshot(vec![task]));
        assert_eq!(f.scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn identical_snapshot_twice_keeps_timer_count() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        let tasks = snapshot(vec![task_due_in("a", 60), task_due_in("b", 120)]);
        f.scheduler.refresh(&tasks);
        assert_eq!(f.scheduler.pending_count(), 2);
        f.scheduler.refresh(&tasks);
        assert_eq!(f.scheduler.pending_count(), 2);
    }

    #[tokio::test]
    async fn removing_task_cancels_its_timer() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        f.scheduler
            .refresh(&snapshot(vec![task_due_in("a", 60), task_due_in("b", 60)]));
        assert_eq!(f.scheduler.pending_count(), 2);
        f.scheduler.refresh(&snapshot(vec![task_due_in("a", 60)]));
        assert_eq!(f.scheduler.pending_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_with_chime_and_writes_acknowledgement() {
        let f = fixture(Permission::Granted, AlarmSound::Chime);
        let task = task_due_in("t1", 5);
        f.store
            .write(&paths::task("p1", "t1"), task.to_store())
            .await
            .unwrap();
        f.scheduler.refresh(&snapshot(vec![task]));

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert_eq!(f.notifier.notified(), 1);
        assert_eq!(f.alarm.count(), 1);
        assert_eq!(
            *f.alarm.played.lock().unwrap(),
            vec![AlarmSound::Chime]
        );

        let stored = f.store.read(&paths::task("p1", "t1")).await.unwrap();
        assert!(stored.get("alarmFiredAt").and_then(|v| v.as_str()).is_some());
        assert_eq!(f.scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undetermined_permission_requests_then_notifies() {
        let f = fixture(Permission::Undetermined, AlarmSound::Beep);
        f.scheduler.refresh(&snapshot(vec![task_due_in("t1", 2)]));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert_eq!(f.notifier.requested(), 1);
        assert_eq!(f.notifier.notified(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn denied_permission_skips_notification_but_plays_alarm() {
        let f = fixture(Permission::Denied, AlarmSound::Bell);
        f.scheduler.refresh(&snapshot(vec![task_due_in("t1", 2)]));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert_eq!(f.notifier.notified(), 0);
        assert_eq!(f.notifier.requested(), 0);
        assert_eq!(f.alarm.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_cancels_pending_timers() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        f.scheduler.refresh(&snapshot(vec![task_due_in("t1", 5)]));
        f.scheduler.clear();

        tokio::time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(f.notifier.notified(), 0);
        assert_eq!(f.alarm.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledgement_gates_refire_across_refresh() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        let task = task_due_in("t1", 2);
        f.store
            .write(&paths::task("p1", "t1"), task.to_store())
            .await
            .unwrap();
        f.scheduler.refresh(&snapshot(vec![task]));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(f.alarm.count(), 1);

        // Re-ingest the store state (as the task watcher would): the task
        // now carries alarmFiredAt, so it must not re-arm even though its
        // reminder handling already happened.
        let stored = f.store.read(&paths::tasks("p1")).await.unwrap();
        let tasks = tasks_from_snapshot(&stored);
        assert!(tasks["t1"].alarm_fired_at.is_some());
        f.scheduler.refresh(&tasks);
        assert_eq!(f.scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_reschedules_on_store_change() {
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        let store = Arc::clone(&f.store);
        let subscription = store.subscribe(&paths::tasks("p1"));
        let watcher = spawn_task_watcher(Arc::clone(&f.scheduler), subscription);
        tokio::task::yield_now().await;
        assert_eq!(f.scheduler.pending_count(), 0);

        let task = task_due_in("t1", 5);
        store
            .write(&paths::task("p1", "t1"), task.to_store())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.scheduler.pending_count(), 1);

        // Deleting the task cancels its timer on the next refresh.
        store.remove(&paths::task("p1", "t1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.scheduler.pending_count(), 0);

        watcher.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn best_effort_write_failure_is_swallowed() {
        // Scheduler pointed at a patient path that cannot be written
        // (store value at the parent is a non-object).
        let f = fixture(Permission::Granted, AlarmSound::Beep);
        f.store
            .write("users/p1/tasks", serde_json::json!("scalar"))
            .await
            .unwrap();
        f.scheduler.refresh(&snapshot(vec![task_due_in("t1", 2)]));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        // Firing still happened; the failed acknowledgement was dropped.
        assert_eq!(f.notifier.notified(), 1);
        assert_eq!(f.alarm.count(), 1);
    }
}
