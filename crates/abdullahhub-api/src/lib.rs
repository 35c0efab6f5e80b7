//! # abdullahhub-api
//!
//! HTTP API layer for AbdullahHub built on Axum.
//!
//! Provides the dashboard, marketplace, plugin execution, credential,
//! public API, and admin endpoints, plus middleware (rate limiting, CORS,
//! security headers, logging), extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, run_server};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
