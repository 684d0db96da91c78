//! Correction, rule application, and verification endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{applications, corrections};
use crate::error::ApiResult;
use crate::models::{Correction, RuleApplication};
use crate::services::correction_recorder::{self, NewCorrection};
use crate::AppState;

/// POST /corrections - record a reviewer correction
pub async fn record_correction(
    State(state): State<AppState>,
    Json(request): Json<NewCorrection>,
) -> ApiResult<Json<Correction>> {
    let correction = correction_recorder::record(&state.db, request).await?;
    Ok(Json(correction))
}

/// GET /documents/:id/corrections - audit view
pub async fn list_corrections(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Correction>>> {
    Ok(Json(
        corrections::list_for_document(&state.db, document_id).await?,
    ))
}

/// POST /applications request body
#[derive(Debug, Deserialize)]
pub struct NewApplication {
    pub rule_id: Uuid,
    pub rule_version: i64,
    pub document_id: Uuid,
    pub field_name: String,
    pub extracted_value: String,
}

/// POST /applications - record that a rule version produced a field value
pub async fn record_application(
    State(state): State<AppState>,
    Json(request): Json<NewApplication>,
) -> ApiResult<Json<RuleApplication>> {
    let application = RuleApplication {
        id: Uuid::new_v4(),
        rule_id: request.rule_id,
        rule_version: request.rule_version,
        document_id: request.document_id,
        field_name: request.field_name,
        extracted_value: request.extracted_value,
        is_accurate: None,
        applied_at: chrono::Utc::now(),
        verified_at: None,
    };
    applications::record_application(&state.db, &application).await?;
    Ok(Json(application))
}

/// POST /verifications request body
#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub application_id: Uuid,
    pub is_accurate: bool,
}

/// POST /verifications - supply ground truth for a rule application
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerificationRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    applications::verify_application(&state.db, request.application_id, request.is_accurate)
        .await?;
    Ok(Json(serde_json::json!({ "verified": true })))
}

/// Build correction routes
pub fn correction_routes() -> Router<AppState> {
    Router::new()
        .route("/corrections", post(record_correction))
        .route("/documents/:id/corrections", get(list_corrections))
        .route("/applications", post(record_application))
        .route("/verifications", post(verify))
}
