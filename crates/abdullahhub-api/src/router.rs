//! Route definitions for the AbdullahHub HTTP API.
//!
//! Routes with their own rate limit sit in separate routers so each can
//! carry its limiter as a route layer. Everything else except `/health`
//! shares the default hourly and daily limits.

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use abdullahhub_core::error::AppError;

use crate::error::ApiError;
use crate::handlers;
use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::middleware::rate_limit::{RateLimiter, default_rate_limit, rate_limit};
use crate::middleware::security::with_security_headers;
use crate::state::AppState;

/// Room for multipart framing on top of the package size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state
        .config
        .plugins
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let limits = state.rate_limits.clone();

    let default_limited = Router::new()
        .merge(user_routes())
        .merge(api_key_routes())
        .merge(admin_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            limits.clone(),
            default_rate_limit,
        ));

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .merge(limited(
            "/plugins/install/{id}",
            post(handlers::plugins::install),
            &limits.install,
        ))
        .merge(limited(
            "/plugins/execute/{id}",
            post(handlers::plugins::execute),
            &limits.execute,
        ))
        .merge(limited(
            "/api/v1/plugins",
            get(handlers::public::list_plugins),
            &limits.public_list,
        ))
        .merge(limited(
            "/api/v1/execute",
            post(handlers::public::execute),
            &limits.public_execute,
        ))
        .merge(default_limited)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(axum_middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state.config.server.cors));

    with_security_headers(router).with_state(state)
}

/// A single route guarded by its own limiter.
fn limited(
    path: &str,
    method_router: axum::routing::MethodRouter<AppState>,
    limiter: &RateLimiter,
) -> Router<AppState> {
    Router::new()
        .route(path, method_router)
        .route_layer(axum_middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit,
        ))
}

/// Dashboard, marketplace, installed plugin management
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route("/plugins/marketplace", get(handlers::plugins::marketplace))
        .route("/plugins/{id}", get(handlers::plugins::details))
        .route("/plugins/uninstall/{id}", post(handlers::plugins::uninstall))
        .route(
            "/plugins/{id}/config",
            get(handlers::plugins::get_config).put(handlers::plugins::update_config),
        )
        .route("/plugins/{id}/rate", post(handlers::plugins::rate))
}

/// Stored third-party credentials
fn api_key_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/keys",
            get(handlers::api_keys::list).post(handlers::api_keys::store),
        )
        .route("/api/keys/{id}", delete(handlers::api_keys::delete))
}

/// Admin dashboard, moderation, uploads
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(handlers::admin::overview))
        .route("/admin/plugins", get(handlers::admin::list_plugins))
        .route(
            "/admin/plugins/{id}/{action}",
            post(handlers::admin::moderate),
        )
        .route("/admin/upload-plugin", post(handlers::admin::upload_plugin))
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/system", get(handlers::admin::system))
}

async fn not_found() -> ApiError {
    ApiError(AppError::not_found("Resource not found"))
}
