//! Mapping rule, version snapshot, application, and rollback types

use fwip_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mapping rule lifecycle
///
/// DRAFT -> PENDING_REVIEW -> ACTIVE -> ... ; DEPRECATED is terminal and
/// reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Draft,
    PendingReview,
    Active,
    Deprecated,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Draft => "DRAFT",
            RuleStatus::PendingReview => "PENDING_REVIEW",
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Deprecated => "DEPRECATED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "DRAFT" => Ok(RuleStatus::Draft),
            "PENDING_REVIEW" => Ok(RuleStatus::PendingReview),
            "ACTIVE" => Ok(RuleStatus::Active),
            "DEPRECATED" => Ok(RuleStatus::Deprecated),
            other => Err(Error::InvalidInput(format!("Unknown rule status: {}", other))),
        }
    }
}

/// Extraction method a mapping rule uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Direct field from the document-intelligence payload
    AzureField,
    /// Regular-expression match over OCR text
    Regex,
    /// Keyword proximity match
    Keyword,
    /// Positional region extraction
    Position,
    /// LLM classification
    Llm,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::AzureField => "azure_field",
            ExtractionMethod::Regex => "regex",
            ExtractionMethod::Keyword => "keyword",
            ExtractionMethod::Position => "position",
            ExtractionMethod::Llm => "llm",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "azure_field" => Ok(ExtractionMethod::AzureField),
            "regex" => Ok(ExtractionMethod::Regex),
            "keyword" => Ok(ExtractionMethod::Keyword),
            "position" => Ok(ExtractionMethod::Position),
            "llm" => Ok(ExtractionMethod::Llm),
            other => Err(Error::InvalidInput(format!(
                "Unknown extraction method: {}",
                other
            ))),
        }
    }

    /// Base confidence contributed to `rule_match` when a rule of this
    /// method fires. Direct document-intelligence fields are most reliable;
    /// LLM classification is most variable.
    pub fn base_confidence(&self) -> f64 {
        match self {
            ExtractionMethod::AzureField => 90.0,
            ExtractionMethod::Regex => 85.0,
            ExtractionMethod::Keyword => 75.0,
            ExtractionMethod::Position => 70.0,
            ExtractionMethod::Llm => 60.0,
        }
    }
}

/// A mapping rule identity: one per (forwarder_id, field_name)
///
/// Carries the lifecycle status and the forward-only `current_version`
/// pointer; the extraction content itself lives in immutable
/// [`RuleVersion`] snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    pub id: Uuid,
    pub forwarder_id: Uuid,
    pub field_name: String,
    pub status: RuleStatus,
    /// Monotonically increasing; moves forward only, including on rollback
    pub current_version: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// An immutable snapshot of a rule's extraction definition at a version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVersion {
    pub rule_id: Uuid,
    pub version: i64,
    pub extraction_method: ExtractionMethod,
    /// Extraction pattern (regex source, keyword list, field name...)
    pub pattern: String,
    /// Confidence the rule asserts for its extractions, 0-100
    pub confidence: f64,
    /// Higher priority rules are tried first by the extraction collaborator
    pub priority: i64,
    /// Why this version exists ("initial", "pattern upgrade", "auto rollback")
    pub change_reason: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One live application of a rule version to a document field
///
/// Append-only observation log. `is_accurate` stays NULL until a human
/// confirmation or correction supplies ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleApplication {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub rule_version: i64,
    pub document_id: Uuid,
    pub field_name: String,
    pub extracted_value: String,
    pub is_accurate: Option<bool>,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// What triggered a rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackTrigger {
    /// Accuracy monitor detected a regression
    Auto,
    /// Operator-initiated
    Manual,
    /// Operator-initiated, bypassing accuracy comparison
    Emergency,
}

impl RollbackTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RollbackTrigger::Auto => "AUTO",
            RollbackTrigger::Manual => "MANUAL",
            RollbackTrigger::Emergency => "EMERGENCY",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AUTO" => Ok(RollbackTrigger::Auto),
            "MANUAL" => Ok(RollbackTrigger::Manual),
            "EMERGENCY" => Ok(RollbackTrigger::Emergency),
            other => Err(Error::InvalidInput(format!(
                "Unknown rollback trigger: {}",
                other
            ))),
        }
    }
}

/// Append-only audit record of a rollback; never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackLog {
    pub id: Uuid,
    pub rule_id: Uuid,
    /// Version the rule regressed on
    pub from_version: i64,
    /// New version carrying the restored content (from_version + 1)
    pub to_version: i64,
    pub trigger: RollbackTrigger,
    pub reason: String,
    /// Accuracy of the regressed version over the comparison window
    pub accuracy_before: f64,
    /// Accuracy of the restored content's version over the same window
    pub accuracy_after: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Result of an accuracy comparison that crossed the rollback threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyDropResult {
    pub rule_id: Uuid,
    pub current_version: i64,
    pub previous_version: i64,
    /// Accuracy of the current version in the trailing window
    pub current_accuracy: f64,
    /// Accuracy of the previous version in the same window
    pub previous_accuracy: f64,
    /// previous_accuracy - current_accuracy
    pub drop: f64,
}
