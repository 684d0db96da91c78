//! Correction intake
//!
//! Records reviewer corrections with full provenance and feeds two loops:
//! the pattern analyzer (via the unanalyzed backlog) and accuracy
//! monitoring (by marking the field's rule applications inaccurate).

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use fwip_common::Result;

use crate::db::{applications, corrections};
use crate::models::{Correction, CorrectionType};

/// A correction as submitted by a reviewer
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewCorrection {
    pub document_id: Uuid,
    pub forwarder_id: Uuid,
    pub field_name: String,
    pub original_value: String,
    pub corrected_value: String,
    pub correction_type: CorrectionType,
    pub corrected_by: Uuid,
}

/// Record a correction
///
/// Stores whatever the reviewer entered; the only failure is storage
/// failure. Filtering (EXCEPTION class, no-op corrections) happens at the
/// analyzer's read boundary so the audit trail stays complete.
pub async fn record(pool: &SqlitePool, new: NewCorrection) -> Result<Correction> {
    let correction = Correction {
        id: Uuid::new_v4(),
        document_id: new.document_id,
        forwarder_id: new.forwarder_id,
        field_name: new.field_name,
        original_value: new.original_value,
        corrected_value: new.corrected_value,
        correction_type: new.correction_type,
        corrected_by: new.corrected_by,
        created_at: chrono::Utc::now(),
        analyzed_at: None,
    };

    corrections::insert_correction(pool, &correction).await?;

    // A human override is ground truth: whatever rule produced this field
    // value was wrong.
    let marked = applications::verify_for_field(
        pool,
        correction.document_id,
        &correction.field_name,
        false,
    )
    .await?;

    debug!(
        "Recorded {} correction for document {} field {} ({} rule applications marked inaccurate)",
        correction.correction_type.as_str(),
        correction.document_id,
        correction.field_name,
        marked
    );

    Ok(correction)
}
