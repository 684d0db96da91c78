//! Rule application persistence
//!
//! Append-only observation log feeding accuracy monitoring. An application
//! row is only counted toward accuracy after verification sets
//! `is_accurate`.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use fwip_common::{Error, Result};

use crate::db::{parse_opt_ts, parse_ts, parse_uuid};
use crate::models::RuleApplication;

/// Record that a rule version produced a value for a document field
pub async fn record_application(pool: &SqlitePool, app: &RuleApplication) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rule_applications (
            id, rule_id, rule_version, document_id, field_name,
            extracted_value, is_accurate, applied_at, verified_at
        ) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, NULL)
        "#,
    )
    .bind(app.id.to_string())
    .bind(app.rule_id.to_string())
    .bind(app.rule_version)
    .bind(app.document_id.to_string())
    .bind(&app.field_name)
    .bind(&app.extracted_value)
    .bind(app.applied_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Verify a single application by id
pub async fn verify_application(
    pool: &SqlitePool,
    application_id: Uuid,
    is_accurate: bool,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rule_applications
        SET is_accurate = ?, verified_at = ?
        WHERE id = ?
        "#,
    )
    .bind(is_accurate)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(application_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "No rule application {}",
            application_id
        )));
    }
    Ok(())
}

/// Verify all unverified applications for a document field
///
/// Corrections use this path: a correction against a field marks the rule
/// output for that field inaccurate without knowing the application id.
/// Returns the number of applications updated (zero is fine when no rule
/// produced the field).
pub async fn verify_for_field(
    pool: &SqlitePool,
    document_id: Uuid,
    field_name: &str,
    is_accurate: bool,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE rule_applications
        SET is_accurate = ?, verified_at = ?
        WHERE document_id = ? AND field_name = ? AND verified_at IS NULL
        "#,
    )
    .bind(is_accurate)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(document_id.to_string())
    .bind(field_name)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Verified accuracy counts for a rule version since `cutoff`
///
/// Returns (accurate, total) over applications verified inside the window.
/// Unverified rows are excluded entirely.
pub async fn accuracy_in_window(
    pool: &SqlitePool,
    rule_id: Uuid,
    rule_version: i64,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<(i64, i64)> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN is_accurate = 1 THEN 1 ELSE 0 END), 0) AS accurate,
            COUNT(*) AS total
        FROM rule_applications
        WHERE rule_id = ? AND rule_version = ?
          AND verified_at IS NOT NULL AND verified_at >= ?
        "#,
    )
    .bind(rule_id.to_string())
    .bind(rule_version)
    .bind(cutoff.to_rfc3339())
    .fetch_one(pool)
    .await?;

    let accurate: i64 = row.get("accurate");
    let total: i64 = row.get("total");
    Ok((accurate, total))
}

/// List applications for a document, newest first
pub async fn list_for_document(
    pool: &SqlitePool,
    document_id: Uuid,
) -> Result<Vec<RuleApplication>> {
    let rows = sqlx::query(
        r#"
        SELECT id, rule_id, rule_version, document_id, field_name,
               extracted_value, is_accurate, applied_at, verified_at
        FROM rule_applications
        WHERE document_id = ?
        ORDER BY applied_at DESC
        "#,
    )
    .bind(document_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_application).collect()
}

fn map_application(row: sqlx::sqlite::SqliteRow) -> Result<RuleApplication> {
    let id: String = row.get("id");
    let rule_id: String = row.get("rule_id");
    let document_id: String = row.get("document_id");
    let applied_at: String = row.get("applied_at");
    let verified_at: Option<String> = row.get("verified_at");

    Ok(RuleApplication {
        id: parse_uuid("id", &id)?,
        rule_id: parse_uuid("rule_id", &rule_id)?,
        rule_version: row.get("rule_version"),
        document_id: parse_uuid("document_id", &document_id)?,
        field_name: row.get("field_name"),
        extracted_value: row.get("extracted_value"),
        is_accurate: row.get("is_accurate"),
        applied_at: parse_ts("applied_at", &applied_at)?,
        verified_at: parse_opt_ts("verified_at", verified_at)?,
    })
}
