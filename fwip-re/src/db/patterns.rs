//! Correction pattern persistence
//!
//! All cluster writes go through the `UNIQUE(forwarder_id, field_name,
//! pattern_hash)` constraint with atomic `ON CONFLICT` upserts, so identical
//! clusters across analysis runs (or concurrent runs) collapse to one row.

use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use fwip_common::{Error, Result};

use crate::db::{parse_ts, parse_uuid};
use crate::models::{CorrectionPattern, PatternStatus};

/// Upsert a cluster: create the pattern row or add to its occurrence count
///
/// `occurrence_count` only ever grows here; `first_seen_at` is kept from the
/// original insert and `last_seen_at` advances. Runs inside the analyzer's
/// batch transaction.
pub async fn upsert_cluster(
    conn: &mut SqliteConnection,
    forwarder_id: Uuid,
    field_name: &str,
    pattern_hash: &str,
    original_pattern: &str,
    corrected_pattern: &str,
    cluster_size: i64,
    seen_at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let seen_at = seen_at.to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO correction_patterns (
            id, forwarder_id, field_name, pattern_hash,
            original_pattern, corrected_pattern,
            occurrence_count, status, first_seen_at, last_seen_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'DETECTED', ?, ?)
        ON CONFLICT(forwarder_id, field_name, pattern_hash) DO UPDATE SET
            occurrence_count = occurrence_count + excluded.occurrence_count,
            last_seen_at = excluded.last_seen_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(forwarder_id.to_string())
    .bind(field_name)
    .bind(pattern_hash)
    .bind(original_pattern)
    .bind(corrected_pattern)
    .bind(cluster_size)
    .bind(&seen_at)
    .bind(&seen_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Promote DETECTED patterns that reached the occurrence threshold
///
/// One-way transition; returns the promoted rows so the caller can emit
/// suggestion notifications after commit.
pub async fn promote_candidates(
    conn: &mut SqliteConnection,
    threshold: i64,
) -> Result<Vec<CorrectionPattern>> {
    let rows = sqlx::query(
        r#"
        SELECT id, forwarder_id, field_name, pattern_hash,
               original_pattern, corrected_pattern,
               occurrence_count, status, first_seen_at, last_seen_at
        FROM correction_patterns
        WHERE status = 'DETECTED' AND occurrence_count >= ?
        "#,
    )
    .bind(threshold)
    .fetch_all(&mut *conn)
    .await?;

    let mut promoted = Vec::with_capacity(rows.len());
    for row in rows {
        let mut pattern = map_pattern(row)?;

        sqlx::query(
            "UPDATE correction_patterns SET status = 'CANDIDATE' WHERE id = ? AND status = 'DETECTED'",
        )
        .bind(pattern.id.to_string())
        .execute(&mut *conn)
        .await?;

        pattern.status = PatternStatus::Candidate;
        promoted.push(pattern);
    }

    Ok(promoted)
}

/// List patterns, optionally filtered by status, most recently seen first
pub async fn list_patterns(
    pool: &SqlitePool,
    status: Option<PatternStatus>,
) -> Result<Vec<CorrectionPattern>> {
    let rows = match status {
        Some(status) => {
            sqlx::query(
                r#"
                SELECT id, forwarder_id, field_name, pattern_hash,
                       original_pattern, corrected_pattern,
                       occurrence_count, status, first_seen_at, last_seen_at
                FROM correction_patterns
                WHERE status = ?
                ORDER BY last_seen_at DESC
                "#,
            )
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, forwarder_id, field_name, pattern_hash,
                       original_pattern, corrected_pattern,
                       occurrence_count, status, first_seen_at, last_seen_at
                FROM correction_patterns
                ORDER BY last_seen_at DESC
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(map_pattern).collect()
}

/// Load one pattern by id
pub async fn get_pattern(pool: &SqlitePool, id: Uuid) -> Result<Option<CorrectionPattern>> {
    let row = sqlx::query(
        r#"
        SELECT id, forwarder_id, field_name, pattern_hash,
               original_pattern, corrected_pattern,
               occurrence_count, status, first_seen_at, last_seen_at
        FROM correction_patterns
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(map_pattern).transpose()
}

/// Set a pattern's review status (SUGGESTED / PROCESSED / IGNORED)
///
/// Demotion back to DETECTED is rejected: promotion is one-way.
pub async fn set_status(pool: &SqlitePool, id: Uuid, status: PatternStatus) -> Result<()> {
    if status == PatternStatus::Detected {
        return Err(Error::InvalidInput(
            "Patterns cannot be demoted back to DETECTED".to_string(),
        ));
    }

    let result = sqlx::query("UPDATE correction_patterns SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("No correction pattern {}", id)));
    }
    Ok(())
}

fn map_pattern(row: sqlx::sqlite::SqliteRow) -> Result<CorrectionPattern> {
    let id: String = row.get("id");
    let forwarder_id: String = row.get("forwarder_id");
    let status: String = row.get("status");
    let first_seen_at: String = row.get("first_seen_at");
    let last_seen_at: String = row.get("last_seen_at");

    Ok(CorrectionPattern {
        id: parse_uuid("id", &id)?,
        forwarder_id: parse_uuid("forwarder_id", &forwarder_id)?,
        field_name: row.get("field_name"),
        pattern_hash: row.get("pattern_hash"),
        original_pattern: row.get("original_pattern"),
        corrected_pattern: row.get("corrected_pattern"),
        occurrence_count: row.get("occurrence_count"),
        status: PatternStatus::parse(&status)?,
        first_seen_at: parse_ts("first_seen_at", &first_seen_at)?,
        last_seen_at: parse_ts("last_seen_at", &last_seen_at)?,
    })
}
