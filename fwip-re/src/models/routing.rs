//! Routing decision and review queue types

use fwip_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing path assigned to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutePath {
    /// Finalized without human review
    AutoApprove,
    /// Reviewer checks only the low-confidence fields
    QuickReview,
    /// Reviewer checks the whole document
    FullReview,
    /// Escalated: too many critical fields are unreliable
    ManualRequired,
}

impl RoutePath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePath::AutoApprove => "AUTO_APPROVE",
            RoutePath::QuickReview => "QUICK_REVIEW",
            RoutePath::FullReview => "FULL_REVIEW",
            RoutePath::ManualRequired => "MANUAL_REQUIRED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "AUTO_APPROVE" => Ok(RoutePath::AutoApprove),
            "QUICK_REVIEW" => Ok(RoutePath::QuickReview),
            "FULL_REVIEW" => Ok(RoutePath::FullReview),
            "MANUAL_REQUIRED" => Ok(RoutePath::ManualRequired),
            other => Err(Error::InvalidInput(format!("Unknown route path: {}", other))),
        }
    }

    /// Review queue priority for this path.
    ///
    /// NOTE: lower number = reviewed first. FULL_REVIEW and MANUAL_REQUIRED
    /// documents need the most scrutiny, so they sort ahead of QUICK_REVIEW.
    /// This inversion is deliberate and load-bearing for queue ordering.
    pub fn queue_priority(&self) -> i64 {
        match self {
            RoutePath::AutoApprove => 0, // never queued
            RoutePath::QuickReview => 1,
            RoutePath::FullReview | RoutePath::ManualRequired => 0,
        }
    }
}

/// Per-field input to the router: resolved score plus criticality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldScore {
    pub field_name: String,
    /// Resolved confidence score in [0, 100]
    pub score: f64,
    /// Critical fields escalate routing when enough of them are unreliable
    #[serde(default)]
    pub critical: bool,
}

/// Routing decision for one extraction attempt
///
/// Created exactly once per attempt; a retried extraction produces a new
/// decision that supersedes this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub document_id: Uuid,
    pub path: RoutePath,
    /// Human-readable explanation of which rule fired
    pub reason: String,
    /// Aggregate document confidence at decision time
    pub confidence: f64,
    /// Fields scoring below the quick-review bar (reviewer focus list)
    pub low_confidence_fields: Vec<String>,
    pub decided_at: chrono::DateTime<chrono::Utc>,
}

/// Review queue entry status
///
/// PENDING and the transitions out of it are owned by review-workflow
/// collaborators; the router only creates/replaces PENDING entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "PENDING",
            QueueStatus::InProgress => "IN_PROGRESS",
            QueueStatus::Completed => "COMPLETED",
            QueueStatus::Skipped => "SKIPPED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(QueueStatus::Pending),
            "IN_PROGRESS" => Ok(QueueStatus::InProgress),
            "COMPLETED" => Ok(QueueStatus::Completed),
            "SKIPPED" => Ok(QueueStatus::Skipped),
            other => Err(Error::InvalidInput(format!("Unknown queue status: {}", other))),
        }
    }
}

/// Review queue entry, unique per document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub document_id: Uuid,
    pub path: RoutePath,
    /// Lower number = reviewed first (see [`RoutePath::queue_priority`])
    pub priority: i64,
    pub assignee: Option<Uuid>,
    pub status: QueueStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
