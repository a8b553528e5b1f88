//! Sign-in, sign-out, and session introspection.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{SessionResponse, SignInRequest};
use crate::core_state::CoreState;
use crate::roles::DashboardKind;

fn dashboard_str(kind: DashboardKind) -> &'static str {
    match kind {
        DashboardKind::Patient => "patient",
        DashboardKind::Doctor => "doctor",
        DashboardKind::Caregiver => "caregiver",
        DashboardKind::NoRole => "none",
    }
}

/// Sign in and start the background services for the resolved dashboard.
pub async fn sign_in(
    State(core): State<Arc<CoreState>>,
    Json(body): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = core.session.sign_in(&body.email, &body.password).await?;
    let dashboard = core.activate_dashboard(&user.uid).await?;
    Ok(Json(SessionResponse {
        uid: user.uid,
        email: user.email,
        dashboard: dashboard_str(dashboard),
    }))
}

/// Sign out, tearing down timers and subscriptions first.
pub async fn sign_out(State(core): State<Arc<CoreState>>) -> Result<(), ApiError> {
    core.deactivate();
    core.session.sign_out().await;
    Ok(())
}

/// The current session, re-resolving the dashboard from the live profile.
pub async fn current(
    State(core): State<Arc<CoreState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = core.session.current().ok_or(ApiError::NotSignedIn)?;
    let (_, dashboard) = crate::roles::resolve_dashboard(core.store.as_ref(), &user.uid)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(SessionResponse {
        uid: user.uid,
        email: user.email,
        dashboard: dashboard_str(dashboard),
    }))
}
