//! External calendar integration — one event per reminder, synced at most once.
//!
//! The interactive authorization handshake happens in the presentation
//! layer; the resulting session token is handed to the client here. The
//! per-task `calendarEventCreated` flag makes the sync idempotent: one
//! false→true transition, after which the task is never synced again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::gateway::{paths, RealtimeStore};
use crate::models::Task;

pub type EventId = String;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar session not authorized")]
    NotAuthorized,
    #[error("Calendar request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Non-2xx from the provider; carries the raw provider message.
    #[error("{0}")]
    Provider(String),
}

/// HTTP client for the external calendar API.
pub struct CalendarClient {
    base_url: String,
    client: reqwest::Client,
}

impl CalendarClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn default_remote() -> Self {
        Self::new("https://www.googleapis.com/calendar/v3")
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a calendar event; returns the provider-assigned event id.
    pub async fn create_event(
        &self,
        access_token: &str,
        summary: &str,
        description: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<EventId, CalendarError> {
        let url = format!("{}/calendars/primary/events", self.base_url);
        let body = EventRequest {
            summary,
            description,
            start: EventTime {
                date_time: start.to_rfc3339(),
            },
            end: EventTime {
                date_time: end.to_rfc3339(),
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(CalendarError::Provider(raw));
        }

        let created: EventResponse = response.json().await?;
        Ok(created.id)
    }
}

/// Sync a task's reminder to the calendar, at most once per task.
///
/// Returns `Ok(None)` when there is nothing to do: no reminder, calendar
/// sync not requested, or already synced. On success the
/// `calendarEventCreated` flag (and `calendarCreatedByDoctor` when the
/// doctor initiated it) is written back best-effort — a failed flag write
/// is logged and swallowed, the event itself exists either way.
pub async fn sync_task_to_calendar(
    store: &dyn RealtimeStore,
    client: &CalendarClient,
    access_token: Option<&str>,
    patient_uid: &str,
    task: &Task,
    by_doctor: bool,
) -> Result<Option<EventId>, CalendarError> {
    if task.calendar_event_created || !task.calendar_requested {
        return Ok(None);
    }
    let start = match task.reminder_at {
        Some(start) => start,
        None => return Ok(None),
    };
    let token = access_token.ok_or(CalendarError::NotAuthorized)?;

    let end = start + chrono::Duration::minutes(30);
    let event_id = client
        .create_event(token, &task.text, "CareLink task reminder", start, end)
        .await?;

    let mut fields = Map::new();
    fields.insert("calendarEventCreated".into(), json!(true));
    if by_doctor {
        fields.insert("calendarCreatedByDoctor".into(), json!(true));
    }
    if let Err(e) = store
        .update(&paths::task(patient_uid, &task.id), fields)
        .await
    {
        tracing::warn!(task = %task.id, error = %e, "calendar flag write failed");
    }
    Ok(Some(event_id))
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Serialize)]
struct EventRequest<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
}

#[derive(Serialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

#[derive(Deserialize)]
struct EventResponse {
    id: String,
}
