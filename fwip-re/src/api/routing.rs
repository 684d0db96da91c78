//! Scoring and routing endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::decisions;
use crate::error::{ApiError, ApiResult};
use crate::models::{ConfidenceBand, FieldFactors, FieldScore, RoutingDecision};
use crate::services::{confidence_scorer, path_router};
use crate::AppState;

/// One extracted field in a routing request
#[derive(Debug, Deserialize)]
pub struct FieldInput {
    pub field_name: String,
    /// Raw scoring factors; absent factors use configured fallbacks
    #[serde(default)]
    pub factors: FieldFactors,
    #[serde(default)]
    pub critical: bool,
}

/// POST /route request body
#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub document_id: Uuid,
    pub fields: Vec<FieldInput>,
}

/// Scored field as returned to the caller
#[derive(Debug, Serialize)]
pub struct ScoredField {
    pub field_name: String,
    pub score: f64,
    pub band: ConfidenceBand,
    pub critical: bool,
}

/// POST /route response body
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub document_id: Uuid,
    pub path: String,
    pub reason: String,
    pub confidence: f64,
    pub band: ConfidenceBand,
    pub low_confidence_fields: Vec<String>,
    pub fields: Vec<ScoredField>,
}

/// POST /route
///
/// Scores the submitted fields, decides the processing path, and commits
/// the decision with its queue effect. Re-submitting a document supersedes
/// its earlier decision.
pub async fn route_document(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    let params = &state.params;

    let scored: Vec<_> = request
        .fields
        .iter()
        .map(|f| {
            (
                confidence_scorer::score_field(&f.field_name, &f.factors, params),
                f.critical,
            )
        })
        .collect();

    let confidences: Vec<_> = scored.iter().map(|(c, _)| c.clone()).collect();
    let document = confidence_scorer::score_document(&confidences)?;

    let field_scores: Vec<FieldScore> = scored
        .iter()
        .map(|(c, critical)| FieldScore {
            field_name: c.field_name.clone(),
            score: c.score,
            critical: *critical,
        })
        .collect();

    let decision = path_router::route(request.document_id, &field_scores, document.score, params);
    path_router::commit(&state.db, &state.event_bus, &decision).await?;

    Ok(Json(RouteResponse {
        document_id: decision.document_id,
        path: decision.path.as_str().to_string(),
        reason: decision.reason,
        confidence: decision.confidence,
        band: confidence_scorer::classify(decision.confidence, params),
        low_confidence_fields: decision.low_confidence_fields,
        fields: scored
            .into_iter()
            .map(|(c, critical)| ScoredField {
                band: confidence_scorer::classify(c.score, params),
                field_name: c.field_name,
                score: c.score,
                critical,
            })
            .collect(),
    }))
}

/// GET /documents/:id/decision - latest routing decision for a document
pub async fn get_decision(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Json<RoutingDecision>> {
    let decision = decisions::latest_decision(&state.db, document_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No routing decision for document {}", document_id))
        })?;
    Ok(Json(decision))
}

/// Build routing routes
pub fn routing_routes() -> Router<AppState> {
    Router::new()
        .route("/route", post(route_document))
        .route("/documents/:id/decision", get(get_decision))
}
