//! Correction persistence
//!
//! Corrections are immutable after insert except for `analyzed_at`, which
//! the pattern analyzer sets exactly once inside its batch transaction.

use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use fwip_common::Result;

use crate::db::{parse_opt_ts, parse_ts, parse_uuid};
use crate::models::{Correction, CorrectionType};

/// Insert a correction with full provenance
pub async fn insert_correction(pool: &SqlitePool, correction: &Correction) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO corrections (
            id, document_id, forwarder_id, field_name,
            original_value, corrected_value, correction_type,
            corrected_by, created_at, analyzed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(correction.id.to_string())
    .bind(correction.document_id.to_string())
    .bind(correction.forwarder_id.to_string())
    .bind(&correction.field_name)
    .bind(&correction.original_value)
    .bind(&correction.corrected_value)
    .bind(correction.correction_type.as_str())
    .bind(correction.corrected_by.to_string())
    .bind(correction.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch unanalyzed NORMAL corrections, oldest first, bounded by `limit`
///
/// EXCEPTION corrections and no-op corrections (corrected value identical
/// to the original) are filtered here, at the analyzer's read boundary, so
/// the write path keeps the audit trail complete. A no-op would form a
/// zero-distance cluster and teach the engine nothing.
pub async fn fetch_unanalyzed(pool: &SqlitePool, limit: i64) -> Result<Vec<Correction>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, forwarder_id, field_name,
               original_value, corrected_value, correction_type,
               corrected_by, created_at, analyzed_at
        FROM corrections
        WHERE analyzed_at IS NULL
          AND correction_type = 'NORMAL'
          AND original_value <> corrected_value
        ORDER BY created_at ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_correction).collect()
}

/// Mark a batch of corrections analyzed (within the analyzer's transaction)
///
/// The marker is append-only: rows already carrying `analyzed_at` are left
/// untouched, so a correction is never double-counted.
pub async fn mark_analyzed(
    conn: &mut SqliteConnection,
    ids: &[Uuid],
    at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let at = at.to_rfc3339();
    for id in ids {
        sqlx::query(
            "UPDATE corrections SET analyzed_at = ? WHERE id = ? AND analyzed_at IS NULL",
        )
        .bind(&at)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// List corrections for a document (audit view), newest first
pub async fn list_for_document(pool: &SqlitePool, document_id: Uuid) -> Result<Vec<Correction>> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, forwarder_id, field_name,
               original_value, corrected_value, correction_type,
               corrected_by, created_at, analyzed_at
        FROM corrections
        WHERE document_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(document_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_correction).collect()
}

fn map_correction(row: sqlx::sqlite::SqliteRow) -> Result<Correction> {
    let id: String = row.get("id");
    let document_id: String = row.get("document_id");
    let forwarder_id: String = row.get("forwarder_id");
    let correction_type: String = row.get("correction_type");
    let corrected_by: String = row.get("corrected_by");
    let created_at: String = row.get("created_at");
    let analyzed_at: Option<String> = row.get("analyzed_at");

    Ok(Correction {
        id: parse_uuid("id", &id)?,
        document_id: parse_uuid("document_id", &document_id)?,
        forwarder_id: parse_uuid("forwarder_id", &forwarder_id)?,
        field_name: row.get("field_name"),
        original_value: row.get("original_value"),
        corrected_value: row.get("corrected_value"),
        correction_type: CorrectionType::parse(&correction_type)?,
        corrected_by: parse_uuid("corrected_by", &corrected_by)?,
        created_at: parse_ts("created_at", &created_at)?,
        analyzed_at: parse_opt_ts("analyzed_at", analyzed_at)?,
    })
}
