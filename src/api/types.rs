//! Request and response bodies shared by the endpoint handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Task;
use crate::sos::ActiveAlert;

// ── Session ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub uid: String,
    pub email: String,
    /// "patient" | "doctor" | "caregiver" | "none"
    pub dashboard: &'static str,
}

// ── Tasks ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub text: String,
    #[serde(default)]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub calendar_requested: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    /// `null` clears the reminder.
    pub reminder_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

// ── SOS ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SosRequest {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAlertResponse {
    pub patient_uid: String,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<ActiveAlert> for ActiveAlertResponse {
    fn from(active: ActiveAlert) -> Self {
        Self {
            patient_uid: active.patient_uid,
            lat: active.alert.lat,
            lng: active.alert.lng,
            timestamp: active.alert.timestamp,
        }
    }
}

// ── Chat ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Omitted on the first message; a new conversation is opened.
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub conversation_id: String,
    /// Assistant reply, or the raw provider error on the degraded path.
    pub reply: String,
}
