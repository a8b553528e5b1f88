//! Settings read/write. Saving applies the alarm sound to a live scheduler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::api::endpoints::require_uid;
use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::models::Settings;

pub async fn get(State(core): State<Arc<CoreState>>) -> Result<Json<Settings>, ApiError> {
    require_uid(&core)?;
    Ok(Json(core.load_settings()?))
}

pub async fn save(
    State(core): State<Arc<CoreState>>,
    Json(settings): Json<Settings>,
) -> Result<(), ApiError> {
    require_uid(&core)?;
    core.save_settings(&settings)?;
    Ok(())
}
