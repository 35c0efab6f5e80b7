//! Marketplace, installation, configuration, and execution handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde_json::{Value, json};

use abdullahhub_core::types::PluginId;
use abdullahhub_service::InstallOutcome;

use crate::dto::request::{MarketplaceParams, RateRequest};
use crate::error::ApiResult;
use crate::extractors::path::parse_id;
use crate::extractors::{ApiJson, AuthUser, ExecutePayload, ValidatedJson};
use crate::state::AppState;

/// GET /plugins/marketplace
pub async fn marketplace(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<MarketplaceParams>,
) -> ApiResult<Json<Value>> {
    let (query, page) = params.into_parts();
    let result = state.marketplace_service.browse(query, page).await?;
    Ok(Json(json!({ "success": true, "data": result })))
}

/// GET /plugins/{id}
pub async fn details(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let details = state.marketplace_service.details(&auth, id).await?;
    Ok(Json(json!({
        "success": true,
        "plugin": details.plugin,
        "is_installed": details.is_installed,
        "installation": details.installation,
    })))
}

/// POST /plugins/install/{id}
pub async fn install(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    match state.installation_service.install(&auth, id).await? {
        InstallOutcome::Installed {
            plugin,
            installation,
        } => Ok(Json(json!({
            "success": true,
            "message": format!("Plugin {} installed successfully", plugin.name),
            "installation": installation,
        }))),
        InstallOutcome::AlreadyInstalled => Ok(Json(json!({
            "success": false,
            "message": "Plugin already installed",
        }))),
    }
}

/// POST /plugins/uninstall/{id}
pub async fn uninstall(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    state.installation_service.uninstall(&auth, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Plugin uninstalled successfully",
    })))
}

/// POST /plugins/execute/{id}
///
/// A plugin that answers `success: false` still yields 200; only failures
/// to run it at all are errors.
pub async fn execute(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ExecutePayload(request): ExecutePayload,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let outcome = state.execution_service.execute(&auth, id, request).await?;
    Ok(Json(outcome.into_body()))
}

/// GET /plugins/{id}/config
pub async fn get_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let view = state.installation_service.config(&auth, id).await?;
    Ok(Json(json!({
        "success": true,
        "config": view.config,
        "schema": view.schema,
        "default_config": view.default_config,
    })))
}

/// PUT /plugins/{id}/config
pub async fn update_config(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<Value>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let view = state
        .installation_service
        .update_config(&auth, id, &changes)
        .await?;
    Ok(Json(json!({
        "success": true,
        "config": view.config,
        "schema": view.schema,
        "default_config": view.default_config,
    })))
}

/// POST /plugins/{id}/rate
pub async fn rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RateRequest>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let plugin = state.marketplace_service.rate(&auth, id, req.rating).await?;
    Ok(Json(json!({
        "success": true,
        "rating": plugin.rating,
        "review_count": plugin.review_count,
    })))
}
