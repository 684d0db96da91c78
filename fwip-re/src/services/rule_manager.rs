//! Mapping rule lifecycle management
//!
//! Lifecycle: DRAFT -> PENDING_REVIEW -> ACTIVE; DEPRECATED is terminal and
//! reachable from any other state. Rule content changes never mutate a
//! snapshot: activating new content appends the next version and moves the
//! forward-only pointer.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use fwip_common::events::{EngineEvent, EventBus};
use fwip_common::{Error, Result};

use crate::db::rules;
use crate::models::{ExtractionMethod, MappingRule, RuleStatus, RuleVersion};

/// Content for a new rule or a new version of an existing rule
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RuleContent {
    pub extraction_method: ExtractionMethod,
    pub pattern: String,
    /// Confidence asserted for extractions, 0-100; defaults to the
    /// extraction method's base confidence when absent
    pub confidence: Option<f64>,
    #[serde(default)]
    pub priority: i64,
}

impl RuleContent {
    fn resolved_confidence(&self) -> f64 {
        self.confidence
            .unwrap_or_else(|| self.extraction_method.base_confidence())
            .clamp(0.0, 100.0)
    }
}

/// Create a DRAFT rule with its version-1 snapshot
pub async fn create_rule(
    pool: &SqlitePool,
    forwarder_id: Uuid,
    field_name: &str,
    content: RuleContent,
) -> Result<MappingRule> {
    if content.pattern.trim().is_empty() {
        return Err(Error::InvalidInput("Rule pattern must not be empty".to_string()));
    }

    let now = chrono::Utc::now();
    let rule = MappingRule {
        id: Uuid::new_v4(),
        forwarder_id,
        field_name: field_name.to_string(),
        status: RuleStatus::Draft,
        current_version: 1,
        created_at: now,
        updated_at: now,
    };
    let version = RuleVersion {
        rule_id: rule.id,
        version: 1,
        extraction_method: content.extraction_method,
        confidence: content.resolved_confidence(),
        pattern: content.pattern,
        priority: content.priority,
        change_reason: "initial".to_string(),
        created_at: now,
    };

    rules::insert_rule(pool, &rule, &version).await?;
    info!(
        "Created rule {} for forwarder {} field {}",
        rule.id, forwarder_id, field_name
    );
    Ok(rule)
}

/// Submit a DRAFT rule for review
pub async fn submit_for_review(pool: &SqlitePool, rule_id: Uuid) -> Result<()> {
    transition(pool, rule_id, RuleStatus::PendingReview).await
}

/// Activate a PENDING_REVIEW rule on its current version
pub async fn activate(pool: &SqlitePool, event_bus: &EventBus, rule_id: Uuid) -> Result<()> {
    let rule = require_rule(pool, rule_id).await?;
    check_transition(&rule, RuleStatus::Active)?;

    let mut tx = pool.begin().await?;
    rules::set_status(&mut tx, rule_id, RuleStatus::Active).await?;
    tx.commit().await?;

    info!("Activated rule {} at version {}", rule_id, rule.current_version);
    event_bus.emit_lossy(EngineEvent::RuleActivated {
        rule_id,
        version: rule.current_version,
        timestamp: chrono::Utc::now(),
    });
    Ok(())
}

/// Release new content for an ACTIVE rule as the next version
///
/// Snapshots the content as version current+1 and moves the pointer, in one
/// transaction. The superseded snapshot stays in history for accuracy
/// comparison and rollback.
pub async fn release_version(
    pool: &SqlitePool,
    event_bus: &EventBus,
    rule_id: Uuid,
    content: RuleContent,
    change_reason: &str,
) -> Result<RuleVersion> {
    if content.pattern.trim().is_empty() {
        return Err(Error::InvalidInput("Rule pattern must not be empty".to_string()));
    }

    let rule = require_rule(pool, rule_id).await?;
    if rule.status != RuleStatus::Active {
        return Err(Error::InvalidInput(format!(
            "Cannot release a version for rule {} in status {}",
            rule_id,
            rule.status.as_str()
        )));
    }

    let version = RuleVersion {
        rule_id,
        version: rule.current_version + 1,
        extraction_method: content.extraction_method,
        confidence: content.resolved_confidence(),
        pattern: content.pattern,
        priority: content.priority,
        change_reason: change_reason.to_string(),
        created_at: chrono::Utc::now(),
    };

    let mut tx = pool.begin().await?;
    rules::insert_version(&mut tx, &version).await?;
    rules::advance_current_version(&mut tx, rule_id, version.version).await?;
    tx.commit().await?;

    info!(
        "Released rule {} version {} ({})",
        rule_id, version.version, change_reason
    );
    event_bus.emit_lossy(EngineEvent::RuleActivated {
        rule_id,
        version: version.version,
        timestamp: version.created_at,
    });
    Ok(version)
}

/// Deprecate a rule (terminal)
pub async fn deprecate(pool: &SqlitePool, rule_id: Uuid) -> Result<()> {
    transition(pool, rule_id, RuleStatus::Deprecated).await
}

async fn transition(pool: &SqlitePool, rule_id: Uuid, to: RuleStatus) -> Result<()> {
    let rule = require_rule(pool, rule_id).await?;
    check_transition(&rule, to)?;

    let mut tx = pool.begin().await?;
    rules::set_status(&mut tx, rule_id, to).await?;
    tx.commit().await?;

    info!(
        "Rule {} moved {} -> {}",
        rule_id,
        rule.status.as_str(),
        to.as_str()
    );
    Ok(())
}

async fn require_rule(pool: &SqlitePool, rule_id: Uuid) -> Result<MappingRule> {
    rules::get_rule(pool, rule_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No mapping rule {}", rule_id)))
}

/// Validate a lifecycle transition
fn check_transition(rule: &MappingRule, to: RuleStatus) -> Result<()> {
    use RuleStatus::*;
    let allowed = match (rule.status, to) {
        (Draft, PendingReview) => true,
        (PendingReview, Active) => true,
        // Terminal state, reachable from anywhere else
        (Draft | PendingReview | Active, Deprecated) => true,
        _ => false,
    };
    if !allowed {
        return Err(Error::InvalidInput(format!(
            "Rule {} cannot move {} -> {}",
            rule.id,
            rule.status.as_str(),
            to.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_in(status: RuleStatus) -> MappingRule {
        let now = chrono::Utc::now();
        MappingRule {
            id: Uuid::new_v4(),
            forwarder_id: Uuid::new_v4(),
            field_name: "invoice_number".to_string(),
            status,
            current_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(check_transition(&rule_in(RuleStatus::Draft), RuleStatus::PendingReview).is_ok());
        assert!(check_transition(&rule_in(RuleStatus::PendingReview), RuleStatus::Active).is_ok());
        assert!(check_transition(&rule_in(RuleStatus::Active), RuleStatus::Deprecated).is_ok());
        assert!(check_transition(&rule_in(RuleStatus::Draft), RuleStatus::Deprecated).is_ok());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        // No skipping review, no resurrection, no regression
        assert!(check_transition(&rule_in(RuleStatus::Draft), RuleStatus::Active).is_err());
        assert!(check_transition(&rule_in(RuleStatus::Active), RuleStatus::Draft).is_err());
        assert!(
            check_transition(&rule_in(RuleStatus::Deprecated), RuleStatus::Active).is_err()
        );
        assert!(
            check_transition(&rule_in(RuleStatus::Deprecated), RuleStatus::Deprecated).is_err()
        );
    }

    #[test]
    fn test_rule_content_defaults_confidence_from_method() {
        let content = RuleContent {
            extraction_method: ExtractionMethod::Regex,
            pattern: r"INV-\d+".to_string(),
            confidence: None,
            priority: 0,
        };
        assert_eq!(content.resolved_confidence(), 85.0);

        let content = RuleContent {
            confidence: Some(150.0),
            ..content
        };
        assert_eq!(content.resolved_confidence(), 100.0);
    }
}
