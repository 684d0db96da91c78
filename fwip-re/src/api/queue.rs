//! Review queue endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queue;
use crate::error::ApiResult;
use crate::models::{QueueEntry, QueueStatus};
use crate::AppState;

/// GET /queue - open entries in review order
pub async fn list_queue(State(state): State<AppState>) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(queue::list_open(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assignee: Uuid,
}

/// POST /queue/:document_id/assign
pub async fn assign(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<QueueEntry>> {
    queue::assign_entry(&state.db, document_id, request.assignee).await?;
    let entry = queue::get_entry(&state.db, document_id).await?.ok_or_else(|| {
        crate::ApiError::Internal(format!("Queue entry {} vanished after assign", document_id))
    })?;
    Ok(Json(entry))
}

/// POST /queue/:document_id/complete
pub async fn complete(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    queue::close_entry(&state.db, document_id, QueueStatus::Completed).await?;
    Ok(Json(serde_json::json!({ "status": "COMPLETED" })))
}

/// POST /queue/:document_id/skip
pub async fn skip(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    queue::close_entry(&state.db, document_id, QueueStatus::Skipped).await?;
    Ok(Json(serde_json::json!({ "status": "SKIPPED" })))
}

/// Build queue routes
pub fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/queue", get(list_queue))
        .route("/queue/:document_id/assign", post(assign))
        .route("/queue/:document_id/complete", post(complete))
        .route("/queue/:document_id/skip", post(skip))
}
