//! Mapping rule and version snapshot persistence
//!
//! A rule identity is (forwarder_id, field_name); its extraction content
//! lives in immutable `rule_versions` snapshots. The `current_version`
//! pointer only ever moves forward, including during rollback.

use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use fwip_common::{Error, Result};

use crate::db::{parse_ts, parse_uuid};
use crate::models::{ExtractionMethod, MappingRule, RuleStatus, RuleVersion};

/// Insert a new rule identity with its version-1 snapshot, in one transaction
pub async fn insert_rule(
    pool: &SqlitePool,
    rule: &MappingRule,
    first_version: &RuleVersion,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO mapping_rules (
            id, forwarder_id, field_name, status, current_version,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rule.id.to_string())
    .bind(rule.forwarder_id.to_string())
    .bind(&rule.field_name)
    .bind(rule.status.as_str())
    .bind(rule.current_version)
    .bind(rule.created_at.to_rfc3339())
    .bind(rule.updated_at.to_rfc3339())
    .execute(&mut *tx)
    .await?;

    insert_version(&mut tx, first_version).await?;

    tx.commit().await?;
    Ok(())
}

/// Insert an immutable version snapshot (within a caller transaction)
pub async fn insert_version(conn: &mut SqliteConnection, version: &RuleVersion) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rule_versions (
            rule_id, version, extraction_method, pattern,
            confidence, priority, change_reason, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(version.rule_id.to_string())
    .bind(version.version)
    .bind(version.extraction_method.as_str())
    .bind(&version.pattern)
    .bind(version.confidence)
    .bind(version.priority)
    .bind(&version.change_reason)
    .bind(version.created_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

/// Update a rule's lifecycle status (within a caller transaction)
pub async fn set_status(
    conn: &mut SqliteConnection,
    rule_id: Uuid,
    status: RuleStatus,
) -> Result<()> {
    sqlx::query("UPDATE mapping_rules SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(rule_id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}

/// Advance the current-version pointer (within a caller transaction)
///
/// The pointer moves forward only; a regression here would break the
/// immutable-history invariant.
pub async fn advance_current_version(
    conn: &mut SqliteConnection,
    rule_id: Uuid,
    new_version: i64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE mapping_rules
        SET current_version = ?, updated_at = ?
        WHERE id = ? AND current_version < ?
        "#,
    )
    .bind(new_version)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(rule_id.to_string())
    .bind(new_version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::InvalidInput(format!(
            "Version pointer for rule {} cannot move to {}",
            rule_id, new_version
        )));
    }
    Ok(())
}

/// Load a rule identity by id
pub async fn get_rule(pool: &SqlitePool, rule_id: Uuid) -> Result<Option<MappingRule>> {
    let row = sqlx::query(
        r#"
        SELECT id, forwarder_id, field_name, status, current_version,
               created_at, updated_at
        FROM mapping_rules
        WHERE id = ?
        "#,
    )
    .bind(rule_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(map_rule).transpose()
}

/// List all rule identities, newest first
pub async fn list_rules(pool: &SqlitePool) -> Result<Vec<MappingRule>> {
    let rows = sqlx::query(
        r#"
        SELECT id, forwarder_id, field_name, status, current_version,
               created_at, updated_at
        FROM mapping_rules
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_rule).collect()
}

/// ACTIVE rules that have a predecessor version to compare against
pub async fn list_monitorable(pool: &SqlitePool) -> Result<Vec<MappingRule>> {
    let rows = sqlx::query(
        r#"
        SELECT id, forwarder_id, field_name, status, current_version,
               created_at, updated_at
        FROM mapping_rules
        WHERE status = 'ACTIVE' AND current_version > 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_rule).collect()
}

/// Load one version snapshot
pub async fn get_version(
    pool: &SqlitePool,
    rule_id: Uuid,
    version: i64,
) -> Result<Option<RuleVersion>> {
    let row = sqlx::query(
        r#"
        SELECT rule_id, version, extraction_method, pattern,
               confidence, priority, change_reason, created_at
        FROM rule_versions
        WHERE rule_id = ? AND version = ?
        "#,
    )
    .bind(rule_id.to_string())
    .bind(version)
    .fetch_optional(pool)
    .await?;

    row.map(map_version).transpose()
}

/// Full version history for a rule, oldest first
pub async fn list_versions(pool: &SqlitePool, rule_id: Uuid) -> Result<Vec<RuleVersion>> {
    let rows = sqlx::query(
        r#"
        SELECT rule_id, version, extraction_method, pattern,
               confidence, priority, change_reason, created_at
        FROM rule_versions
        WHERE rule_id = ?
        ORDER BY version ASC
        "#,
    )
    .bind(rule_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_version).collect()
}

fn map_rule(row: sqlx::sqlite::SqliteRow) -> Result<MappingRule> {
    let id: String = row.get("id");
    let forwarder_id: String = row.get("forwarder_id");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(MappingRule {
        id: parse_uuid("id", &id)?,
        forwarder_id: parse_uuid("forwarder_id", &forwarder_id)?,
        field_name: row.get("field_name"),
        status: RuleStatus::parse(&status)?,
        current_version: row.get("current_version"),
        created_at: parse_ts("created_at", &created_at)?,
        updated_at: parse_ts("updated_at", &updated_at)?,
    })
}

fn map_version(row: sqlx::sqlite::SqliteRow) -> Result<RuleVersion> {
    let rule_id: String = row.get("rule_id");
    let extraction_method: String = row.get("extraction_method");
    let created_at: String = row.get("created_at");

    Ok(RuleVersion {
        rule_id: parse_uuid("rule_id", &rule_id)?,
        version: row.get("version"),
        extraction_method: ExtractionMethod::parse(&extraction_method)?,
        pattern: row.get("pattern"),
        confidence: row.get("confidence"),
        priority: row.get("priority"),
        change_reason: row.get("change_reason"),
        created_at: parse_ts("created_at", &created_at)?,
    })
}
