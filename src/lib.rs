pub mod api;
pub mod assistant;
pub mod calendar;
pub mod config;
pub mod core_state;
pub mod db;
pub mod gateway;
pub mod models;
pub mod notify;
pub mod push;
pub mod roles;
pub mod scheduler;
pub mod session;
pub mod sos;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::gateway::{MemoryStore, RealtimeStore};
use crate::session::LocalAuthProvider;

/// Start the portal core with the in-process store and local auth provider.
///
/// Deployments with an external realtime backend construct
/// [`core_state::CoreState`] with their own `RealtimeStore`/`AuthProvider`
/// implementations and call [`api::start_server`] directly.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let data_dir = config::app_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let core = Arc::new(core_state::CoreState::new(
        Arc::new(MemoryStore::new()) as Arc<dyn RealtimeStore>,
        Arc::new(LocalAuthProvider::new()),
        config::local_db_path(),
    ));

    let mut server = api::start_server(core, config::DEFAULT_BIND_ADDR).await?;
    tracing::info!(addr = %server.addr, "Portal ready");

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    Ok(())
}
