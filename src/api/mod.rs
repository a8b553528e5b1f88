//! HTTP surface of the portal core.
//!
//! A thin axum layer over [`CoreState`](crate::core_state::CoreState):
//! session, tasks, SOS, chat, and settings endpoints, plus the server
//! lifecycle handle. All state lives in the core; handlers translate
//! between JSON bodies and core calls.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{start_server, ServerHandle};
