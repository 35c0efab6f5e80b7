//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use abdullahhub_database::connection::health_check;

use crate::dto::response::{HealthResponse, UnhealthyResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    match health_check(&state.db_pool).await {
        Ok(()) => Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: e.message,
                }),
            )
                .into_response()
        }
    }
}
