//! relwatch HTTP API.
//!
//! Exposes [`relwatch_core::UpdateService`] over axum, behind a per-IP
//! fixed-window rate limit.

pub mod check;
pub mod handlers;
pub mod rate_limit;
pub mod server;
pub mod wrapper;

pub use rate_limit::FixedWindowLimiter;
pub use server::{build_router, start_server, AppState};
