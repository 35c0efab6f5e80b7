//! Axum middleware stack.

pub mod cors;
pub mod logging;
pub mod rate_limit;
pub mod security;
