//! HTTP surface for the voice subsystem.
//!
//! JSON over REST under `/api`, axum routers with shared [`server::AppState`].
//! Caller identity arrives as the `x-user-id` header injected by the
//! platform's identity layer (out of scope here) and is threaded explicitly
//! into every operation; handlers never read ambient state.

pub mod error;
pub mod extract;
pub mod routes;
pub mod server;

pub use {
    error::ApiError,
    server::{AppState, build_app, start_server},
};
