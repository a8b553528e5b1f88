//! Transport-agnostic application state.
//!
//! `CoreState` is the single shared state behind the REST surface: the
//! identity session, the realtime store handle, the device-local database,
//! and the per-identity background services (reminder scheduler, SOS
//! watcher). Wrapped in `Arc` at startup.
//!
//! Background services are owned here with an explicit lifecycle: starting
//! services for a new identity tears down the previous identity's timers
//! and subscriptions first. Leaking either causes duplicate firings or
//! stale writes to a now-wrong identity path.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::assistant::AssistantClient;
use crate::calendar::CalendarClient;
use crate::db;
use crate::gateway::{paths, RealtimeStore};
use crate::models::Settings;
use crate::notify::{AlarmPlayer, LogAlarmPlayer, LogNotifier, Notifier};
use crate::roles::{self, DashboardKind};
use crate::scheduler::{spawn_task_watcher, ReminderScheduler};
use crate::session::{AuthProvider, IdentitySession};
use crate::sos::{spawn_sos_watcher, SosWatcher};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    /// Identity session over the external auth provider.
    pub session: IdentitySession,
    /// Shared realtime store — the single source of truth.
    pub store: Arc<dyn RealtimeStore>,
    /// Device-local database (settings + chat log).
    db_path: PathBuf,
    pub assistant: AssistantClient,
    pub calendar: CalendarClient,
    notifier: Arc<dyn Notifier>,
    alarm: Arc<dyn AlarmPlayer>,
    /// Patient-side reminder machinery, present while a patient is active.
    scheduler: Mutex<Option<SchedulerService>>,
    /// Viewer-side SOS machinery, present while a doctor/caregiver is active.
    sos: Mutex<Option<SosService>>,
}

struct SchedulerService {
    scheduler: Arc<ReminderScheduler>,
    watcher: JoinHandle<()>,
}

impl Drop for SchedulerService {
    fn drop(&mut self) {
        self.watcher.abort();
        self.scheduler.clear();
    }
}

struct SosService {
    watcher: Arc<SosWatcher>,
    task: JoinHandle<()>,
}

impl Drop for SosService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl CoreState {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        auth: Arc<dyn AuthProvider>,
        db_path: PathBuf,
    ) -> Self {
        Self {
            session: IdentitySession::new(auth),
            store,
            db_path,
            assistant: AssistantClient::default_remote(),
            calendar: CalendarClient::default_remote(),
            notifier: Arc::new(LogNotifier),
            alarm: Arc::new(LogAlarmPlayer),
            scheduler: Mutex::new(None),
            sos: Mutex::new(None),
        }
    }

    /// Swap the notification/alarm sinks (platform integration).
    pub fn with_sinks(mut self, notifier: Arc<dyn Notifier>, alarm: Arc<dyn AlarmPlayer>) -> Self {
        self.notifier = notifier;
        self.alarm = alarm;
        self
    }

    // ── Local database ──────────────────────────────────────

    /// Open the device-local database. One connection per operation.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    pub fn load_settings(&self) -> Result<Settings, CoreError> {
        let conn = self.open_db()?;
        db::load_settings(&conn).map_err(CoreError::Database)
    }

    /// Persist settings and apply the alarm variant to a live scheduler.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        db::save_settings(&conn, settings)?;
        if let Ok(guard) = self.scheduler.lock() {
            if let Some(service) = guard.as_ref() {
                service.scheduler.set_alarm_sound(settings.alarm);
            }
        }
        Ok(())
    }

    // ── Background services per identity ────────────────────

    /// Start the services matching the signed-in user's dashboard.
    ///
    /// Patient: reminder scheduler driven by the task subscription.
    /// Doctor/caregiver: SOS watcher over the associated patients.
    /// Any services from a previous identity are torn down first.
    pub async fn activate_dashboard(&self, uid: &str) -> Result<DashboardKind, CoreError> {
        self.deactivate();

        let (profile, dashboard) = roles::resolve_dashboard(self.store.as_ref(), uid)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;

        match dashboard {
            DashboardKind::Patient => {
                let alarm_sound = self.load_settings()?.alarm;
                let scheduler = Arc::new(ReminderScheduler::new(
                    Arc::clone(&self.store),
                    Arc::clone(&self.notifier),
                    Arc::clone(&self.alarm),
                    uid,
                    alarm_sound,
                ));
                let subscription = self.store.subscribe(&paths::tasks(uid));
                let watcher = spawn_task_watcher(Arc::clone(&scheduler), subscription);
                if let Ok(mut guard) = self.scheduler.lock() {
                    *guard = Some(SchedulerService { scheduler, watcher });
                }
            }
            DashboardKind::Doctor => {
                self.start_sos_watcher(SosWatcher::for_doctor(&profile));
            }
            DashboardKind::Caregiver => {
                let assigned = roles::find_assigned_patient(self.store.as_ref(), uid)
                    .await
                    .map_err(|e| CoreError::Store(e.to_string()))?;
                if let Some(patient) = assigned {
                    self.start_sos_watcher(SosWatcher::for_caregiver(&patient));
                }
            }
            DashboardKind::NoRole => {}
        }
        Ok(dashboard)
    }

    fn start_sos_watcher(&self, watcher: SosWatcher) {
        let watcher = Arc::new(watcher);
        let subscription = self.store.subscribe(&paths::sos_alerts());
        let task = spawn_sos_watcher(Arc::clone(&watcher), subscription);
        if let Ok(mut guard) = self.sos.lock() {
            *guard = Some(SosService { watcher, task });
        }
    }

    /// Tear down all background services (sign-out / identity change).
    pub fn deactivate(&self) {
        if let Ok(mut guard) = self.scheduler.lock() {
            *guard = None;
        }
        if let Ok(mut guard) = self.sos.lock() {
            *guard = None;
        }
    }

    /// The live reminder scheduler, when a patient dashboard is active.
    pub fn scheduler(&self) -> Option<Arc<ReminderScheduler>> {
        self.scheduler
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| Arc::clone(&s.scheduler)))
    }

    /// The live SOS watcher, when a viewer dashboard is active.
    pub fn sos_watcher(&self) -> Option<Arc<SosWatcher>> {
        self.sos
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| Arc::clone(&s.watcher)))
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Store error: {0}")]
    Store(String),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
