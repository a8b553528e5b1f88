//! Notification and alarm-sound seams for the reminder scheduler.
//!
//! The core is headless: presentation owns the actual toast and audio
//! output. These traits are what the scheduler fires into; the default
//! implementations log through `tracing` so local mode stays observable.

#[cfg(test)]
use std::sync::Mutex;

use crate::models::enums::AlarmSound;

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

/// Local notification display.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask the user. Only called when the current state is `Undetermined`.
    fn request_permission(&self) -> Permission;

    fn notify(&self, title: &str, body: &str);
}

/// Audible alarm output.
pub trait AlarmPlayer: Send + Sync {
    fn play(&self, sound: AlarmSound);
}

// ── Default (logging) implementations ───────────────────────

/// Logs notifications instead of displaying them.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "Notification");
    }
}

/// Logs the alarm sound instead of playing it.
pub struct LogAlarmPlayer;

impl AlarmPlayer for LogAlarmPlayer {
    fn play(&self, sound: AlarmSound) {
        tracing::info!(sound = %sound, "Alarm");
    }
}

// ── Recording implementations (tests) ───────────────────────

/// Records every notification and permission request.
#[cfg(test)]
pub struct RecordingNotifier {
    state: Mutex<Permission>,
    /// What a permission request resolves to.
    pub grant_on_request: bool,
    pub notifications: Mutex<Vec<(String, String)>>,
    pub requests: Mutex<u32>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new(state: Permission) -> Self {
        Self {
            state: Mutex::new(state),
            grant_on_request: true,
            notifications: Mutex::new(Vec::new()),
            requests: Mutex::new(0),
        }
    }

    pub fn denying(state: Permission) -> Self {
        Self {
            grant_on_request: false,
            ..Self::new(state)
        }
    }

    pub fn notified(&self) -> usize {
        self.notifications.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn requested(&self) -> u32 {
        self.requests.lock().map(|r| *r).unwrap_or(0)
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.state.lock().map(|s| *s).unwrap_or(Permission::Denied)
    }

    fn request_permission(&self) -> Permission {
        if let Ok(mut requests) = self.requests.lock() {
            *requests += 1;
        }
        let resolved = if self.grant_on_request {
            Permission::Granted
        } else {
            Permission::Denied
        };
        if let Ok(mut state) = self.state.lock() {
            *state = resolved;
        }
        resolved
    }

    fn notify(&self, title: &str, body: &str) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push((title.to_string(), body.to_string()));
        }
    }
}

/// Records every alarm played.
#[cfg(test)]
pub struct RecordingAlarmPlayer {
    pub played: Mutex<Vec<AlarmSound>>,
}

#[cfg(test)]
impl RecordingAlarmPlayer {
    pub fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.played.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[cfg(test)]
impl AlarmPlayer for RecordingAlarmPlayer {
    fn play(&self, sound: AlarmSound) {
        if let Ok(mut played) = self.played.lock() {
            played.push(sound);
        }
    }
}
