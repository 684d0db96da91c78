//! Correction pattern (rule-upgrade candidate) types

use fwip_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a correction pattern
///
/// DETECTED -> CANDIDATE is one-way and automatic (promotion threshold).
/// SUGGESTED / PROCESSED / IGNORED are set by the review-and-promote UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternStatus {
    Detected,
    Candidate,
    Suggested,
    Processed,
    Ignored,
}

impl PatternStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternStatus::Detected => "DETECTED",
            PatternStatus::Candidate => "CANDIDATE",
            PatternStatus::Suggested => "SUGGESTED",
            PatternStatus::Processed => "PROCESSED",
            PatternStatus::Ignored => "IGNORED",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "DETECTED" => Ok(PatternStatus::Detected),
            "CANDIDATE" => Ok(PatternStatus::Candidate),
            "SUGGESTED" => Ok(PatternStatus::Suggested),
            "PROCESSED" => Ok(PatternStatus::Processed),
            "IGNORED" => Ok(PatternStatus::Ignored),
            other => Err(Error::InvalidInput(format!(
                "Unknown pattern status: {}",
                other
            ))),
        }
    }
}

/// A cluster of similar corrections sharing forwarder, field, and normalized
/// original/corrected value pair
///
/// Unique per (forwarder_id, field_name, pattern_hash). `occurrence_count` is
/// monotonically non-decreasing while status is DETECTED or CANDIDATE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionPattern {
    pub id: Uuid,
    pub forwarder_id: Uuid,
    pub field_name: String,
    /// Stable fingerprint over (forwarder, field, normalized original,
    /// normalized corrected); the dedup key across analysis runs
    pub pattern_hash: String,
    /// Representative original value (earliest correction in the cluster)
    pub original_pattern: String,
    /// Representative corrected value
    pub corrected_pattern: String,
    pub occurrence_count: i64,
    pub status: PatternStatus,
    pub first_seen_at: chrono::DateTime<chrono::Utc>,
    pub last_seen_at: chrono::DateTime<chrono::Utc>,
}
