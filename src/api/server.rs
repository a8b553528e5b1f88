//! Server lifecycle — bind, spawn, shut down.
//!
//! Bind → spawn background task → return a handle owning the shutdown
//! channel. Dropping the handle without calling `shutdown` aborts nothing;
//! the server runs for the life of the process.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::api::router::portal_router;
use crate::core_state::CoreState;

/// Handle to a running portal server.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    /// Signal graceful shutdown. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Portal server shutdown signal sent");
        }
    }
}

/// Bind the portal API and serve it in a background task.
///
/// Pass a port of 0 to bind an ephemeral port; the bound address is on the
/// returned handle.
pub async fn start_server(core: Arc<CoreState>, bind: &str) -> Result<ServerHandle, ServerError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| ServerError::Bind(bind.to_string(), e))?;
    let addr = listener.local_addr().map_err(ServerError::Addr)?;

    let app = portal_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Portal server received shutdown signal");
        };

        tracing::info!(%addr, "Portal server started");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Portal server error: {e}");
        }
        tracing::info!("Portal server stopped");
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {0}: {1}")]
    Bind(String, #[source] std::io::Error),
    #[error("Failed to read bound address: {0}")]
    Addr(#[source] std::io::Error),
}
