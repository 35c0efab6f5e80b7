//! Stored API key handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use abdullahhub_core::types::ApiKeyId;
use abdullahhub_service::StoreApiKeyRequest;

use crate::error::ApiResult;
use crate::extractors::path::parse_id;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// GET /api/keys
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let keys = state.api_key_service.list(&auth).await?;
    Ok(Json(json!({ "success": true, "api_keys": keys })))
}

/// POST /api/keys
pub async fn store(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<StoreApiKeyRequest>,
) -> ApiResult<Json<Value>> {
    let stored = state.api_key_service.store(&auth, req).await?;
    Ok(Json(json!({
        "success": true,
        "message": "API key saved",
        "api_key": stored,
    })))
}

/// DELETE /api/keys/{id}
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: ApiKeyId = parse_id(&id)?;
    state.api_key_service.delete(&auth, id).await?;
    Ok(Json(json!({ "success": true, "message": "API key deleted" })))
}
