//! SOS alert channel — patient location broadcast to doctor/caregiver views.
//!
//! Patient side publishes `{lat, lng, timestamp}` keyed by their own uid,
//! overwriting any prior alert (at most one active alert per patient).
//! Viewer side holds a live subscription to the whole alert collection and
//! filters to associated patients. Dismissal is view-local only: the alert
//! stays in the store and re-surfaces on the next change notification or for
//! any other viewer, until `resolve_sos` deletes it upstream.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::gateway::{paths, RealtimeStore, StoreError, Subscription};
use crate::models::{SosAlert, UserProfile};

/// Surfaced as a blocking alert; the send is aborted.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SosError {
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error("SOS publish failed: {0}")]
    Store(#[from] StoreError),
}

/// Single-shot device location acquisition.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<(f64, f64), LocationError>;
}

/// Acquire the device location and publish an alert for `patient_uid`.
///
/// User-initiated: both the location failure and the store failure are
/// surfaced to the caller, never swallowed.
pub async fn send_sos(
    store: &dyn RealtimeStore,
    location: &dyn LocationProvider,
    patient_uid: &str,
) -> Result<SosAlert, SosError> {
    let (lat, lng) = location.current_location().await?;
    Ok(publish_sos(store, patient_uid, lat, lng).await?)
}

/// Publish an alert with coordinates already in hand (the portal client
/// resolves geolocation on its side and sends them over).
pub async fn publish_sos(
    store: &dyn RealtimeStore,
    patient_uid: &str,
    lat: f64,
    lng: f64,
) -> Result<SosAlert, StoreError> {
    let alert = SosAlert::new(lat, lng);
    store
        .write(&paths::sos_alert(patient_uid), alert.to_store())
        .await?;
    tracing::info!(patient = patient_uid, "SOS published");
    Ok(alert)
}

/// Delete a patient's alert from the shared store, for all viewers.
pub async fn resolve_sos(store: &dyn RealtimeStore, patient_uid: &str) -> Result<(), StoreError> {
    store.remove(&paths::sos_alert(patient_uid)).await
}

// ═══════════════════════════════════════════════════════════
// Viewer side
// ═══════════════════════════════════════════════════════════

/// The alert currently surfaced in a viewer's session.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAlert {
    pub patient_uid: String,
    pub alert: SosAlert,
}

/// Per-viewer SOS state: which patients this viewer is associated with, and
/// which alert (if any) is currently surfaced.
pub struct SosWatcher {
    watched: HashSet<String>,
    active: Mutex<Option<ActiveAlert>>,
}

impl SosWatcher {
    pub fn new(watched: impl IntoIterator<Item = String>) -> Self {
        Self {
            watched: watched.into_iter().collect(),
            active: Mutex::new(None),
        }
    }

    /// A doctor watches every patient on their roster.
    pub fn for_doctor(profile: &UserProfile) -> Self {
        Self::new(profile.patient_ids.iter().cloned())
    }

    /// A caregiver watches their single assigned patient.
    pub fn for_caregiver(patient_uid: &str) -> Self {
        Self::new([patient_uid.to_string()])
    }

    /// Apply a fresh snapshot of the alert collection.
    ///
    /// Surfaces the first alert belonging to a watched patient; clears the
    /// surfaced alert when no watched alert remains. A previously dismissed
    /// alert that is still in the snapshot re-surfaces here — dismissal is
    /// not distributed.
    pub fn apply(&self, snapshot: &Value) {
        let next = snapshot.as_object().and_then(|alerts| {
            alerts.iter().find_map(|(uid, body)| {
                if !self.watched.contains(uid) {
                    return None;
                }
                SosAlert::from_store(body).map(|alert| ActiveAlert {
                    patient_uid: uid.clone(),
                    alert,
                })
            })
        });
        if let Ok(mut active) = self.active.lock() {
            *active = next;
        }
    }

    /// The alert currently surfaced, if any.
    pub fn active(&self) -> Option<ActiveAlert> {
        self.active.lock().ok().and_then(|active| active.clone())
    }

    /// Hide the surfaced alert in this viewer's session only. The shared
    /// store is untouched.
    pub fn dismiss(&self) {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
    }
}

/// Drive a watcher from a live subscription to the alert collection.
pub fn spawn_sos_watcher(
    watcher: Arc<SosWatcher>,
    mut subscription: Subscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            watcher.apply(&subscription.current());
            if !subscription.changed().await {
                break;
            }
        }
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
