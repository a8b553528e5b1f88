//! Task list operations for a patient's shared list.
//!
//! The patient uid is a path parameter: doctors and caregivers operate on
//! their patients' lists through the same routes the patient uses.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Map};
use uuid::Uuid;

use crate::api::endpoints::require_uid;
use crate::api::error::ApiError;
use crate::api::types::{CreateTaskRequest, ReminderRequest, TaskListResponse};
use crate::core_state::CoreState;
use crate::gateway::paths;
use crate::models::Task;
use crate::scheduler::tasks_from_snapshot;

/// All tasks on a patient's list, newest first.
pub async fn list(
    State(core): State<Arc<CoreState>>,
    Path(patient_uid): Path<String>,
) -> Result<Json<TaskListResponse>, ApiError> {
    require_uid(&core)?;
    let snapshot = core.store.read(&paths::tasks(&patient_uid)).await?;
    let mut tasks: Vec<Task> = tasks_from_snapshot(&snapshot).into_values().collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(TaskListResponse { tasks }))
}

/// Create a task on the patient's list, attributed to the signed-in user.
pub async fn create(
    State(core): State<Arc<CoreState>>,
    Path(patient_uid): Path<String>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let creator = require_uid(&core)?;
    let text = body.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Task text is empty".into()));
    }

    let mut task = Task::new(Uuid::new_v4().to_string(), text, creator);
    task.reminder_at = body.reminder_at;
    task.calendar_requested = body.calendar_requested;
    core.store
        .write(&paths::task(&patient_uid, &task.id), task.to_store())
        .await?;
    Ok(Json(task))
}

/// Mark a task completed. Completion does not touch the reminder; a pending
/// alarm on a completed task still fires.
pub async fn complete(
    State(core): State<Arc<CoreState>>,
    Path((patient_uid, task_id)): Path<(String, String)>,
) -> Result<(), ApiError> {
    require_uid(&core)?;
    ensure_task_exists(&core, &patient_uid, &task_id).await?;

    let mut fields = Map::new();
    fields.insert("completed".into(), json!(true));
    core.store
        .update(&paths::task(&patient_uid, &task_id), fields)
        .await?;
    Ok(())
}

/// Set or clear a task's reminder. Rescheduling re-arms the alarm: the
/// fired marker is cleared together with the new time.
pub async fn set_reminder(
    State(core): State<Arc<CoreState>>,
    Path((patient_uid, task_id)): Path<(String, String)>,
    Json(body): Json<ReminderRequest>,
) -> Result<(), ApiError> {
    require_uid(&core)?;
    ensure_task_exists(&core, &patient_uid, &task_id).await?;

    let mut fields = Map::new();
    fields.insert(
        "reminderAt".into(),
        match body.reminder_at {
            Some(at) => json!(at.to_rfc3339()),
            None => serde_json::Value::Null,
        },
    );
    fields.insert("alarmFiredAt".into(), serde_json::Value::Null);
    core.store
        .update(&paths::task(&patient_uid, &task_id), fields)
        .await?;
    Ok(())
}

async fn ensure_task_exists(
    core: &Arc<CoreState>,
    patient_uid: &str,
    task_id: &str,
) -> Result<(), ApiError> {
    let record = core.store.read(&paths::task(patient_uid, task_id)).await?;
    if record.is_null() {
        return Err(ApiError::NotFound(format!("Task {task_id} not found")));
    }
    Ok(())
}
