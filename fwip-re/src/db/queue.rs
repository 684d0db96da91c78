//! Review queue persistence
//!
//! The queue is keyed on document_id: re-routing a document replaces its
//! entry via `ON CONFLICT`, it never duplicates. Status transitions after
//! PENDING belong to review-workflow collaborators.

use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use fwip_common::{Error, Result};

use crate::db::{parse_ts, parse_uuid};
use crate::models::{QueueEntry, QueueStatus, RoutePath};

/// Upsert the queue entry for a document (within the router's commit
/// transaction)
///
/// A replaced entry resets to PENDING with no assignee: the new routing
/// decision invalidates any in-flight review of the superseded extraction.
pub async fn upsert_entry(
    conn: &mut SqliteConnection,
    document_id: Uuid,
    path: RoutePath,
    priority: i64,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO queue_entries (
            document_id, path, priority, assignee, status, created_at, updated_at
        ) VALUES (?, ?, ?, NULL, 'PENDING', ?, ?)
        ON CONFLICT(document_id) DO UPDATE SET
            path = excluded.path,
            priority = excluded.priority,
            assignee = NULL,
            status = 'PENDING',
            updated_at = excluded.updated_at
        "#,
    )
    .bind(document_id.to_string())
    .bind(path.as_str())
    .bind(priority)
    .bind(&now)
    .bind(&now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove a document's queue entry (auto-approved re-route)
pub async fn remove_entry(conn: &mut SqliteConnection, document_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM queue_entries WHERE document_id = ?")
        .bind(document_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

/// Assign a queue entry to a reviewer and mark it IN_PROGRESS
pub async fn assign_entry(pool: &SqlitePool, document_id: Uuid, assignee: Uuid) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE queue_entries
        SET assignee = ?, status = 'IN_PROGRESS', updated_at = ?
        WHERE document_id = ?
        "#,
    )
    .bind(assignee.to_string())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(document_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "No queue entry for document {}",
            document_id
        )));
    }
    Ok(())
}

/// Move a queue entry to a terminal status (COMPLETED or SKIPPED)
pub async fn close_entry(
    pool: &SqlitePool,
    document_id: Uuid,
    status: QueueStatus,
) -> Result<()> {
    if !matches!(status, QueueStatus::Completed | QueueStatus::Skipped) {
        return Err(Error::InvalidInput(format!(
            "{} is not a terminal queue status",
            status.as_str()
        )));
    }

    let result = sqlx::query(
        "UPDATE queue_entries SET status = ?, updated_at = ? WHERE document_id = ?",
    )
    .bind(status.as_str())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(document_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "No queue entry for document {}",
            document_id
        )));
    }
    Ok(())
}

/// Load a single queue entry
pub async fn get_entry(pool: &SqlitePool, document_id: Uuid) -> Result<Option<QueueEntry>> {
    let row = sqlx::query(
        r#"
        SELECT document_id, path, priority, assignee, status, created_at, updated_at
        FROM queue_entries
        WHERE document_id = ?
        "#,
    )
    .bind(document_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(map_entry).transpose()
}

/// List open entries in review order: priority ascending (lower number =
/// more scrutiny = reviewed first), oldest first within a priority
pub async fn list_open(pool: &SqlitePool) -> Result<Vec<QueueEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT document_id, path, priority, assignee, status, created_at, updated_at
        FROM queue_entries
        WHERE status IN ('PENDING', 'IN_PROGRESS')
        ORDER BY priority ASC, created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_entry).collect()
}

fn map_entry(row: sqlx::sqlite::SqliteRow) -> Result<QueueEntry> {
    let document_id: String = row.get("document_id");
    let path: String = row.get("path");
    let assignee: Option<String> = row.get("assignee");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(QueueEntry {
        document_id: parse_uuid("document_id", &document_id)?,
        path: RoutePath::parse(&path)?,
        priority: row.get("priority"),
        assignee: assignee
            .map(|s| parse_uuid("assignee", &s))
            .transpose()?,
        status: QueueStatus::parse(&status)?,
        created_at: parse_ts("created_at", &created_at)?,
        updated_at: parse_ts("updated_at", &updated_at)?,
    })
}
