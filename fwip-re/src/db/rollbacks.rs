//! Rollback audit log persistence

use sqlx::{Row, SqliteConnection, SqlitePool};

use fwip_common::Result;

use crate::db::{parse_ts, parse_uuid};
use crate::models::{RollbackLog, RollbackTrigger};

/// Insert a rollback audit record (within the rollback transaction)
pub async fn insert_log(conn: &mut SqliteConnection, log: &RollbackLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rollback_log (
            id, rule_id, from_version, to_version, trigger_type,
            reason, accuracy_before, accuracy_after, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(log.id.to_string())
    .bind(log.rule_id.to_string())
    .bind(log.from_version)
    .bind(log.to_version)
    .bind(log.trigger.as_str())
    .bind(&log.reason)
    .bind(log.accuracy_before)
    .bind(log.accuracy_after)
    .bind(log.created_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// List rollback records, newest first
pub async fn list_logs(pool: &SqlitePool) -> Result<Vec<RollbackLog>> {
    let rows = sqlx::query(
        r#"
        SELECT id, rule_id, from_version, to_version, trigger_type,
               reason, accuracy_before, accuracy_after, created_at
        FROM rollback_log
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_log).collect()
}

/// List rollback records for one rule, newest first
pub async fn list_for_rule(pool: &SqlitePool, rule_id: uuid::Uuid) -> Result<Vec<RollbackLog>> {
    let rows = sqlx::query(
        r#"
        SELECT id, rule_id, from_version, to_version, trigger_type,
               reason, accuracy_before, accuracy_after, created_at
        FROM rollback_log
        WHERE rule_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(rule_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_log).collect()
}

fn map_log(row: sqlx::sqlite::SqliteRow) -> Result<RollbackLog> {
    let id: String = row.get("id");
    let rule_id: String = row.get("rule_id");
    let trigger: String = row.get("trigger_type");
    let created_at: String = row.get("created_at");

    Ok(RollbackLog {
        id: parse_uuid("id", &id)?,
        rule_id: parse_uuid("rule_id", &rule_id)?,
        from_version: row.get("from_version"),
        to_version: row.get("to_version"),
        trigger: RollbackTrigger::parse(&trigger)?,
        reason: row.get("reason"),
        accuracy_before: row.get("accuracy_before"),
        accuracy_after: row.get("accuracy_after"),
        created_at: parse_ts("created_at", &created_at)?,
    })
}
