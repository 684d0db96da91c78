//! Correction pattern endpoints and manual analyzer trigger

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::patterns;
use crate::error::{ApiError, ApiResult};
use crate::models::{CorrectionPattern, PatternStatus};
use crate::services::pattern_analyzer;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PatternQuery {
    /// Optional status filter (DETECTED, CANDIDATE, SUGGESTED, ...)
    pub status: Option<String>,
}

/// GET /patterns - list correction patterns
pub async fn list_patterns(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> ApiResult<Json<Vec<CorrectionPattern>>> {
    let status = query
        .status
        .as_deref()
        .map(PatternStatus::parse)
        .transpose()?;
    Ok(Json(patterns::list_patterns(&state.db, status).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: PatternStatus,
}

/// POST /patterns/:id/status - move a pattern through review
pub async fn set_pattern_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<CorrectionPattern>> {
    patterns::set_status(&state.db, id, request.status).await?;
    let pattern = patterns::get_pattern(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No correction pattern {}", id)))?;
    Ok(Json(pattern))
}

/// POST /analyzer/run - trigger an analysis batch immediately
///
/// Refused with 409 while a batch (scheduled or manual) is in flight.
pub async fn run_analyzer(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let Ok(_guard) = state.analyzer_lock.try_lock() else {
        return Err(ApiError::Conflict(
            "An analyzer run is already in progress".to_string(),
        ));
    };

    let report = pattern_analyzer::run_batch(&state.db, &state.event_bus, &state.params).await?;
    Ok(Json(serde_json::json!({
        "corrections_consumed": report.corrections_consumed,
        "clusters_written": report.clusters_written,
        "patterns_promoted": report.patterns_promoted,
    })))
}

/// Build pattern routes
pub fn pattern_routes() -> Router<AppState> {
    Router::new()
        .route("/patterns", get(list_patterns))
        .route("/patterns/:id/status", post(set_pattern_status))
        .route("/analyzer/run", post(run_analyzer))
}
