//! Rule accuracy monitoring and automatic rollback
//!
//! Periodically compares each ACTIVE rule's current version against its
//! predecessor over a trailing verification window. A drop beyond the
//! configured threshold restores the predecessor's content as a NEW version
//! (the pointer never moves backward) and writes an audit record, all in
//! one transaction.
//!
//! Failure to roll back is the one condition this engine treats as
//! critical: the rule keeps producing degraded extractions until a human
//! intervenes, so it is logged at error level and broadcast.

use sqlx::SqlitePool;
use tracing::{debug, error, info};
use uuid::Uuid;

use fwip_common::events::{EngineEvent, EventBus};
use fwip_common::params::EngineParams;
use fwip_common::{Error, Result};

use crate::db::{applications, rollbacks, rules};
use crate::models::{AccuracyDropResult, MappingRule, RollbackLog, RollbackTrigger, RuleVersion};

/// Outcome of one monitor sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorReport {
    pub rules_checked: usize,
    pub rollbacks_executed: usize,
    pub failures: usize,
}

/// Compare a rule's current version against its predecessor
///
/// Returns None when no rollback is warranted. Either version having zero
/// verified samples in the window makes the comparison meaningless, so it
/// is skipped rather than acted on.
pub async fn check_accuracy_drop(
    pool: &SqlitePool,
    rule: &MappingRule,
    params: &EngineParams,
) -> Result<Option<AccuracyDropResult>> {
    let previous_version = rule.current_version - 1;
    let cutoff = chrono::Utc::now() - chrono::Duration::hours(params.rollback_window_hours);

    let (current_ok, current_total) =
        applications::accuracy_in_window(pool, rule.id, rule.current_version, cutoff).await?;
    let (previous_ok, previous_total) =
        applications::accuracy_in_window(pool, rule.id, previous_version, cutoff).await?;

    if current_total == 0 || previous_total == 0 {
        debug!(
            "Rule {}: insufficient verified samples (current {}, previous {}), skipping",
            rule.id, current_total, previous_total
        );
        return Ok(None);
    }

    let current_accuracy = current_ok as f64 / current_total as f64;
    let previous_accuracy = previous_ok as f64 / previous_total as f64;
    let drop = previous_accuracy - current_accuracy;

    if drop <= params.rollback_drop_threshold {
        return Ok(None);
    }

    Ok(Some(AccuracyDropResult {
        rule_id: rule.id,
        current_version: rule.current_version,
        previous_version,
        current_accuracy,
        previous_accuracy,
        drop,
    }))
}

/// Roll a rule back to its previous version's content
///
/// Restoration appends the predecessor's snapshot as version current+1 with
/// change reason "auto rollback", moves the pointer, and records the audit
/// row, atomically.
pub async fn execute_rollback(
    pool: &SqlitePool,
    event_bus: &EventBus,
    drop: &AccuracyDropResult,
) -> Result<RollbackLog> {
    let previous: RuleVersion = rules::get_version(pool, drop.rule_id, drop.previous_version)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "Rule {} has no version {} snapshot to restore",
                drop.rule_id, drop.previous_version
            ))
        })?;

    let now = chrono::Utc::now();
    let restored = RuleVersion {
        rule_id: drop.rule_id,
        version: drop.current_version + 1,
        extraction_method: previous.extraction_method,
        pattern: previous.pattern,
        confidence: previous.confidence,
        priority: previous.priority,
        change_reason: "auto rollback".to_string(),
        created_at: now,
    };
    let log = RollbackLog {
        id: Uuid::new_v4(),
        rule_id: drop.rule_id,
        from_version: drop.current_version,
        to_version: restored.version,
        trigger: RollbackTrigger::Auto,
        reason: format!(
            "Accuracy dropped {:.3} (from {:.3} to {:.3})",
            drop.drop, drop.previous_accuracy, drop.current_accuracy
        ),
        accuracy_before: drop.current_accuracy,
        accuracy_after: drop.previous_accuracy,
        created_at: now,
    };

    let mut tx = pool.begin().await?;
    rules::insert_version(&mut tx, &restored).await?;
    rules::advance_current_version(&mut tx, drop.rule_id, restored.version).await?;
    rollbacks::insert_log(&mut tx, &log).await?;
    tx.commit().await?;

    info!(
        "Rolled back rule {} from version {} to content of version {} (now version {})",
        drop.rule_id, drop.current_version, drop.previous_version, restored.version
    );
    event_bus.emit_lossy(EngineEvent::RollbackExecuted {
        rule_id: drop.rule_id,
        from_version: log.from_version,
        to_version: log.to_version,
        accuracy_before: log.accuracy_before,
        accuracy_after: log.accuracy_after,
        timestamp: now,
    });

    Ok(log)
}

/// Run one monitor sweep over all rollback-eligible rules
///
/// Failures are isolated per rule: one rule's storage error must not stop
/// the sweep from protecting the others.
pub async fn run_once(
    pool: &SqlitePool,
    event_bus: &EventBus,
    params: &EngineParams,
) -> Result<MonitorReport> {
    let rules = rules::list_monitorable(pool).await?;
    let mut report = MonitorReport {
        rules_checked: rules.len(),
        ..Default::default()
    };

    for rule in &rules {
        match monitor_rule(pool, event_bus, rule, params).await {
            Ok(true) => report.rollbacks_executed += 1,
            Ok(false) => {}
            Err(e) => {
                report.failures += 1;
                error!(
                    "CRITICAL: rollback handling failed for rule {} (stuck on version {}): {}",
                    rule.id, rule.current_version, e
                );
                event_bus.emit_lossy(EngineEvent::RollbackFailed {
                    rule_id: rule.id,
                    version: rule.current_version,
                    reason: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    debug!(
        "Rollback monitor: {} rules checked, {} rollbacks, {} failures",
        report.rules_checked, report.rollbacks_executed, report.failures
    );
    Ok(report)
}

async fn monitor_rule(
    pool: &SqlitePool,
    event_bus: &EventBus,
    rule: &MappingRule,
    params: &EngineParams,
) -> Result<bool> {
    match check_accuracy_drop(pool, rule, params).await? {
        Some(drop) => {
            execute_rollback(pool, event_bus, &drop).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}
