//! Admin handlers: overview, catalog moderation, uploads, users, system.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use serde_json::{Value, json};

use abdullahhub_core::error::AppError;
use abdullahhub_core::types::PluginId;
use abdullahhub_service::ModerationAction;

use crate::dto::request::AdminPluginsParams;
use crate::error::ApiResult;
use crate::extractors::path::parse_id;
use crate::extractors::{AdminUser, PaginationParams};
use crate::state::AppState;

/// Form field carrying the package in `POST /admin/upload-plugin`.
const UPLOAD_FIELD: &str = "file";

/// GET /admin
pub async fn overview(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let overview = state.admin_service.overview().await?;
    Ok(Json(json!({ "success": true, "data": overview })))
}

/// GET /admin/plugins
pub async fn list_plugins(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdminPluginsParams>,
) -> ApiResult<Json<Value>> {
    let plugins = state.catalog_service.list(params.pending_only()).await?;
    Ok(Json(json!({ "success": true, "plugins": plugins })))
}

/// POST /admin/plugins/{id}/{action}
pub async fn moderate(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((id, action)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let id: PluginId = parse_id(&id)?;
    let action: ModerationAction = action.parse()?;
    let plugin = state.catalog_service.moderate(&admin, id, action).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Plugin {} updated", plugin.name),
        "plugin": plugin,
    })))
}

/// POST /admin/upload-plugin
pub async fn upload_plugin(
    State(state): State<AppState>,
    admin: AdminUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid form data: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Failed to read upload: {}", e.body_text())))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .filter(|(name, bytes)| !name.is_empty() && !bytes.is_empty())
        .ok_or_else(|| AppError::validation("No file provided"))?;

    let result = state
        .catalog_service
        .upload(&admin, filename, bytes.to_vec())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Plugin {} uploaded", result.plugin.name),
        "data": result,
    })))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Value>> {
    let users = state
        .admin_service
        .users(&params.into_page_request())
        .await?;
    Ok(Json(json!({ "success": true, "data": users })))
}

/// GET /admin/system
pub async fn system(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Value>> {
    let view = state.admin_service.system().await?;
    Ok(Json(json!({
        "success": true,
        "system": view.system,
        "logs": view.logs,
        "loaded_plugins": view.loaded_plugins,
    })))
}
