//! Engine parameter endpoints
//!
//! Parameters resolve at startup (defaults + `settings` table); writes here
//! persist a `param.<name>` override that takes effect on the next start.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::settings;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use fwip_common::params::EngineParams;

/// GET /params - the parameter set this process is running with
pub async fn get_params(State(state): State<AppState>) -> Json<EngineParams> {
    Json((*state.params).clone())
}

#[derive(Debug, Deserialize)]
pub struct SettingRequest {
    pub key: String,
    pub value: String,
}

/// POST /settings - persist a parameter override
pub async fn set_setting(
    State(state): State<AppState>,
    Json(request): Json<SettingRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !request.key.starts_with("param.") {
        return Err(ApiError::BadRequest(format!(
            "Settings keys must be under the param. prefix (got {:?})",
            request.key
        )));
    }

    settings::set_setting(&state.db, &request.key, &request.value).await?;
    Ok(Json(serde_json::json!({
        "key": request.key,
        "value": request.value,
        "note": "takes effect on next service start",
    })))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/params", get(get_params))
        .route("/settings", post(set_setting))
}
