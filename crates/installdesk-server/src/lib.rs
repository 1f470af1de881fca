//! HTTP API for InstallDesk.
//!
//! Every `/api` route requires a session token (`Authorization: Bearer` or
//! `x-session-token`). The resolved [`installdesk_core::Identity`] determines
//! the row scope passed to the store.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
