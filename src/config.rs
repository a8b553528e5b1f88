use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "CareLink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the REST surface.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7420";

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "carelink=info,tower_http=warn".to_string()
}

/// Get the application data directory
/// ~/CareLink/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("CareLink")
}

/// Path of the local database (settings + chat log).
/// The shared portal data never lives here — only device-local state.
pub fn local_db_path() -> PathBuf {
    app_data_dir().join("carelink.db")
}
