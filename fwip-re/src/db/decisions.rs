//! Routing decision persistence
//!
//! One row per routing attempt; the latest row per document supersedes
//! earlier ones (re-extraction creates a new decision, never mutates).

use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use fwip_common::{Error, Result};

use crate::db::{parse_ts, parse_uuid};
use crate::models::{RoutePath, RoutingDecision};

/// Insert a routing decision (within the router's commit transaction)
pub async fn insert_decision(
    conn: &mut SqliteConnection,
    decision: &RoutingDecision,
) -> Result<()> {
    let fields = serde_json::to_string(&decision.low_confidence_fields)
        .map_err(|e| Error::Corrupt(format!("Failed to serialize field list: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO routing_decisions (
            id, document_id, path, reason, confidence,
            low_confidence_fields, decided_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(decision.document_id.to_string())
    .bind(decision.path.as_str())
    .bind(&decision.reason)
    .bind(decision.confidence)
    .bind(&fields)
    .bind(decision.decided_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Load the latest (superseding) decision for a document
pub async fn latest_decision(
    pool: &SqlitePool,
    document_id: Uuid,
) -> Result<Option<RoutingDecision>> {
    let row = sqlx::query(
        r#"
        SELECT document_id, path, reason, confidence,
               low_confidence_fields, decided_at
        FROM routing_decisions
        WHERE document_id = ?
        ORDER BY decided_at DESC, rowid DESC
        LIMIT 1
        "#,
    )
    .bind(document_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let document_id: String = row.get("document_id");
        let path: String = row.get("path");
        let fields: String = row.get("low_confidence_fields");
        let decided_at: String = row.get("decided_at");

        Ok(RoutingDecision {
            document_id: parse_uuid("document_id", &document_id)?,
            path: RoutePath::parse(&path)?,
            reason: row.get("reason"),
            confidence: row.get("confidence"),
            low_confidence_fields: serde_json::from_str(&fields)
                .map_err(|e| Error::Corrupt(format!("Failed to parse field list: {}", e)))?,
            decided_at: parse_ts("decided_at", &decided_at)?,
        })
    })
    .transpose()
}

/// Count decisions recorded for a document (each extraction attempt adds one)
pub async fn decision_count(pool: &SqlitePool, document_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM routing_decisions WHERE document_id = ?")
            .bind(document_id.to_string())
            .fetch_one(pool)
            .await?;
    Ok(count)
}
