//! SOS alert endpoints.
//!
//! The patient publishes with coordinates the client resolved; viewers read
//! the single surfaced alert from their live watcher. Dismissal is local to
//! the viewer, resolution deletes the alert for everyone.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::api::endpoints::require_uid;
use crate::api::error::ApiError;
use crate::api::types::{ActiveAlertResponse, SosRequest};
use crate::core_state::CoreState;
use crate::sos;

/// Publish an SOS for the signed-in patient.
pub async fn send(
    State(core): State<Arc<CoreState>>,
    Json(body): Json<SosRequest>,
) -> Result<(), ApiError> {
    let uid = require_uid(&core)?;
    sos::publish_sos(core.store.as_ref(), &uid, body.lat, body.lng).await?;
    Ok(())
}

/// The alert currently surfaced in this viewer's session, if any.
pub async fn active(
    State(core): State<Arc<CoreState>>,
) -> Result<Json<Option<ActiveAlertResponse>>, ApiError> {
    require_uid(&core)?;
    let active = core
        .sos_watcher()
        .and_then(|watcher| watcher.active())
        .map(ActiveAlertResponse::from);
    Ok(Json(active))
}

/// Hide the surfaced alert in this session only. Other viewers keep theirs.
pub async fn dismiss(State(core): State<Arc<CoreState>>) -> Result<(), ApiError> {
    require_uid(&core)?;
    if let Some(watcher) = core.sos_watcher() {
        watcher.dismiss();
    }
    Ok(())
}

/// Delete a patient's alert from the store, clearing it for every viewer.
pub async fn resolve(
    State(core): State<Arc<CoreState>>,
    Path(patient_uid): Path<String>,
) -> Result<(), ApiError> {
    require_uid(&core)?;
    sos::resolve_sos(core.store.as_ref(), &patient_uid).await?;
    Ok(())
}
