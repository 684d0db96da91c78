//! Database access for fwip-re
//!
//! Shared SQLite database holding routing decisions, the review queue,
//! corrections, correction patterns, mapping rules with version snapshots,
//! rule applications, the rollback audit log, and the settings table.
//!
//! Every upsert in the engine is backed by a unique constraint declared here,
//! so concurrent writers resolve through `ON CONFLICT` instead of
//! read-then-write races.

pub mod applications;
pub mod corrections;
pub mod decisions;
pub mod patterns;
pub mod queue;
pub mod rollbacks;
pub mod rules;
pub mod settings;

use fwip_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Initialize database connection pool
///
/// Connects to fwip.db in the root folder, creating it if missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create engine tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routing_decisions (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            path TEXT NOT NULL,
            reason TEXT NOT NULL,
            confidence REAL NOT NULL,
            low_confidence_fields TEXT NOT NULL DEFAULT '[]',
            decided_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_decisions_document
        ON routing_decisions(document_id, decided_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_entries (
            document_id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            priority INTEGER NOT NULL,
            assignee TEXT,
            status TEXT NOT NULL DEFAULT 'PENDING',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS corrections (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            forwarder_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            original_value TEXT NOT NULL,
            corrected_value TEXT NOT NULL,
            correction_type TEXT NOT NULL,
            corrected_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            analyzed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_corrections_unanalyzed
        ON corrections(analyzed_at, correction_type, created_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS correction_patterns (
            id TEXT PRIMARY KEY,
            forwarder_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            pattern_hash TEXT NOT NULL,
            original_pattern TEXT NOT NULL,
            corrected_pattern TEXT NOT NULL,
            occurrence_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'DETECTED',
            first_seen_at TEXT NOT NULL,
            last_seen_at TEXT NOT NULL,
            UNIQUE(forwarder_id, field_name, pattern_hash)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mapping_rules (
            id TEXT PRIMARY KEY,
            forwarder_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            current_version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(forwarder_id, field_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rule_versions (
            rule_id TEXT NOT NULL,
            version INTEGER NOT NULL,
            extraction_method TEXT NOT NULL,
            pattern TEXT NOT NULL,
            confidence REAL NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            change_reason TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY(rule_id, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rule_applications (
            id TEXT PRIMARY KEY,
            rule_id TEXT NOT NULL,
            rule_version INTEGER NOT NULL,
            document_id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            extracted_value TEXT NOT NULL,
            is_accurate INTEGER,
            applied_at TEXT NOT NULL,
            verified_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_applications_accuracy
        ON rule_applications(rule_id, rule_version, verified_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rollback_log (
            id TEXT PRIMARY KEY,
            rule_id TEXT NOT NULL,
            from_version INTEGER NOT NULL,
            to_version INTEGER NOT NULL,
            trigger_type TEXT NOT NULL,
            reason TEXT NOT NULL,
            accuracy_before REAL NOT NULL,
            accuracy_after REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}

/// Parse a TEXT uuid column value
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Corrupt(format!("Failed to parse {}: {}", column, e)))
}

/// Parse a TEXT RFC 3339 timestamp column value
pub(crate) fn parse_ts(column: &str, value: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Corrupt(format!("Failed to parse {}: {}", column, e)))
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Parse an optional TEXT RFC 3339 timestamp column value
pub(crate) fn parse_opt_ts(
    column: &str,
    value: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value.map(|s| parse_ts(column, &s)).transpose()
}
