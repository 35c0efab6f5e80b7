//! Unauthenticated and API-key endpoints under `/api/v1`.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::dto::request::PublicExecuteRequest;
use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiKeyHeader};
use crate::state::AppState;

/// GET /api/v1/plugins
pub async fn list_plugins(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let plugins = state.marketplace_service.public_list().await?;
    Ok(Json(json!({ "success": true, "plugins": plugins })))
}

/// POST /api/v1/execute
pub async fn execute(
    State(state): State<AppState>,
    ApiKeyHeader(api_key): ApiKeyHeader,
    ApiJson(req): ApiJson<PublicExecuteRequest>,
) -> ApiResult<Json<Value>> {
    let outcome = state
        .execution_service
        .execute_with_api_key(&api_key, req.plugin_id, req.input)
        .await?;
    Ok(Json(outcome.into_body()))
}
