//! User dashboard handler.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /dashboard
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let dashboard = state.dashboard_service.dashboard(&auth).await?;
    Ok(Json(json!({
        "success": true,
        "stats": dashboard.stats,
        "installed_plugins": dashboard.installed_plugins,
    })))
}
