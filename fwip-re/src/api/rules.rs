//! Mapping rule lifecycle and rollback audit endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{rollbacks, rules};
use crate::error::{ApiError, ApiResult};
use crate::models::{MappingRule, RollbackLog, RuleVersion};
use crate::services::rule_manager::{self, RuleContent};
use crate::AppState;

/// POST /rules request body
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub forwarder_id: Uuid,
    pub field_name: String,
    #[serde(flatten)]
    pub content: RuleContent,
}

/// POST /rules - create a DRAFT rule
pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<CreateRuleRequest>,
) -> ApiResult<Json<MappingRule>> {
    let rule = rule_manager::create_rule(
        &state.db,
        request.forwarder_id,
        &request.field_name,
        request.content,
    )
    .await?;
    Ok(Json(rule))
}

/// GET /rules - list all rules
pub async fn list_rules(State(state): State<AppState>) -> ApiResult<Json<Vec<MappingRule>>> {
    Ok(Json(rules::list_rules(&state.db).await?))
}

/// GET /rules/:id
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MappingRule>> {
    let rule = rules::get_rule(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No mapping rule {}", id)))?;
    Ok(Json(rule))
}

/// GET /rules/:id/versions - full snapshot history
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<RuleVersion>>> {
    Ok(Json(rules::list_versions(&state.db, id).await?))
}

/// POST /rules/:id/submit - DRAFT -> PENDING_REVIEW
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    rule_manager::submit_for_review(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "status": "PENDING_REVIEW" })))
}

/// POST /rules/:id/activate - PENDING_REVIEW -> ACTIVE
pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    rule_manager::activate(&state.db, &state.event_bus, id).await?;
    Ok(Json(serde_json::json!({ "status": "ACTIVE" })))
}

/// POST /rules/:id/versions request body
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    #[serde(flatten)]
    pub content: RuleContent,
    pub change_reason: String,
}

/// POST /rules/:id/versions - release new content for an ACTIVE rule
pub async fn release_version(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReleaseRequest>,
) -> ApiResult<Json<RuleVersion>> {
    let version = rule_manager::release_version(
        &state.db,
        &state.event_bus,
        id,
        request.content,
        &request.change_reason,
    )
    .await?;
    Ok(Json(version))
}

/// POST /rules/:id/deprecate - terminal
pub async fn deprecate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    rule_manager::deprecate(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "status": "DEPRECATED" })))
}

/// GET /rollbacks - rollback audit log, newest first
pub async fn list_rollbacks(State(state): State<AppState>) -> ApiResult<Json<Vec<RollbackLog>>> {
    Ok(Json(rollbacks::list_logs(&state.db).await?))
}

/// Build rule routes
pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route("/rules", post(create_rule).get(list_rules))
        .route("/rules/:id", get(get_rule))
        .route("/rules/:id/versions", get(list_versions).post(release_version))
        .route("/rules/:id/submit", post(submit))
        .route("/rules/:id/activate", post(activate))
        .route("/rules/:id/deprecate", post(deprecate))
        .route("/rollbacks", get(list_rollbacks))
}
