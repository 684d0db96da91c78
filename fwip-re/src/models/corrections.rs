//! Human correction records

use fwip_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a human correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrectionType {
    /// Routine fix; feeds the pattern analyzer
    Normal,
    /// One-off anomaly; kept for audit, never learned from
    Exception,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionType::Normal => "NORMAL",
            CorrectionType::Exception => "EXCEPTION",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "NORMAL" => Ok(CorrectionType::Normal),
            "EXCEPTION" => Ok(CorrectionType::Exception),
            other => Err(Error::InvalidInput(format!(
                "Unknown correction type: {}",
                other
            ))),
        }
    }
}

/// A human edit of an extracted value, with full provenance
///
/// Immutable after creation except `analyzed_at`, which the pattern analyzer
/// sets exactly once when it consumes the row. The marker is never reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub id: Uuid,
    pub document_id: Uuid,
    pub forwarder_id: Uuid,
    pub field_name: String,
    pub original_value: String,
    pub corrected_value: String,
    pub correction_type: CorrectionType,
    /// Reviewer who made the edit
    pub corrected_by: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Set once consumed by the pattern analyzer
    pub analyzed_at: Option<chrono::DateTime<chrono::Utc>>,
}
