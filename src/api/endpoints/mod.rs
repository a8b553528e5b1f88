//! Endpoint handlers, grouped by concern.

pub mod alerts;
pub mod chat;
pub mod session;
pub mod settings;
pub mod tasks;

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// The signed-in uid, or 401.
pub(crate) fn require_uid(core: &Arc<CoreState>) -> Result<String, ApiError> {
    core.session
        .current()
        .map(|user| user.uid)
        .ok_or(ApiError::NotSignedIn)
}
