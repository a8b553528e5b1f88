//! Portal API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes live under `/api/`; the browser client is served from another
//! origin during development, so CORS is left permissive.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::api::endpoints::{alerts, chat, session, settings, tasks};
use crate::config;
use crate::core_state::CoreState;

pub fn portal_router(core: Arc<CoreState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/session", get(session::current))
        .route("/api/session/sign-in", post(session::sign_in))
        .route("/api/session/sign-out", post(session::sign_out))
        .route(
            "/api/patients/:uid/tasks",
            get(tasks::list).post(tasks::create),
        )
        .route(
            "/api/patients/:uid/tasks/:task_id/complete",
            post(tasks::complete),
        )
        .route(
            "/api/patients/:uid/tasks/:task_id/reminder",
            put(tasks::set_reminder),
        )
        .route("/api/sos", post(alerts::send))
        .route("/api/sos/active", get(alerts::active))
        .route("/api/sos/dismiss", post(alerts::dismiss))
        .route("/api/sos/:uid/resolve", post(alerts::resolve))
        .route("/api/chat/send", post(chat::send))
        .route("/api/chat/conversations", get(chat::conversations))
        .route("/api/chat/conversations/:id", get(chat::transcript))
        .route("/api/settings", get(settings::get).put(settings::save))
        .layer(CorsLayer::permissive())
        .with_state(core)
}

async fn health(State(core): State<Arc<CoreState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": config::APP_VERSION,
        "signed_in": core.session.is_signed_in(),
    }))
}
