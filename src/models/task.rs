use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task on a patient's shared list, optionally carrying a reminder.
///
/// Lives in the realtime store under `users/{patient}/tasks/{id}`. The store
/// is untyped JSON, so ingestion goes through [`Task::from_store`], which
/// defaults missing or mistyped fields instead of failing — a half-written
/// record from another client must never take the task list down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned key, unique within one patient's task collection.
    pub id: String,
    pub text: String,
    /// Uid of the assigning actor (the patient or their doctor).
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    /// Presence signals an alarm is desired at this absolute time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_at: Option<DateTime<Utc>>,
    /// Reminder was requested with calendar intent.
    pub calendar_requested: bool,
    /// External calendar sync completed. At most one false→true transition.
    pub calendar_event_created: bool,
    pub calendar_created_by_doctor: bool,
    /// Set the first time the local alarm fires; gates re-scheduling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_fired_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task as written by `assign_task` / `add_task`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            completed: false,
            reminder_at: None,
            calendar_requested: false,
            calendar_event_created: false,
            calendar_created_by_doctor: false,
            alarm_fired_at: None,
        }
    }

    /// Build a task from an untyped store record, defaulting anything
    /// missing or mistyped. `id` comes from the record's key, not the body.
    pub fn from_store(id: &str, value: &Value) -> Self {
        Self {
            id: id.to_string(),
            text: str_field(value, "text").unwrap_or_default(),
            created_by: str_field(value, "createdBy").unwrap_or_default(),
            created_at: time_field(value, "createdAt").unwrap_or_else(Utc::now),
            completed: bool_field(value, "completed"),
            reminder_at: time_field(value, "reminderAt"),
            calendar_requested: bool_field(value, "calendarRequested"),
            calendar_event_created: bool_field(value, "calendarEventCreated"),
            calendar_created_by_doctor: bool_field(value, "calendarCreatedByDoctor"),
            alarm_fired_at: time_field(value, "alarmFiredAt"),
        }
    }

    /// Serialize for the store. Timestamps become RFC 3339 strings.
    pub fn to_store(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(|s| s.to_string())
}

fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn time_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = value.get(key)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
