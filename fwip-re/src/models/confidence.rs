//! Confidence scoring types

use serde::{Deserialize, Serialize};

/// Raw scoring factors for one extracted field, each 0-100
///
/// All factors are optional: upstream extraction may not supply every signal,
/// and the scorer substitutes documented fallbacks so scoring never fails on
/// partial input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FieldFactors {
    /// OCR clarity reported by the extraction collaborator
    pub ocr_clarity: Option<f64>,
    /// How strongly a mapping rule matched (seeded from the rule's
    /// extraction-method base confidence)
    pub rule_match: Option<f64>,
    /// Whether the value passed format validation
    pub format_validity: Option<f64>,
    /// Historical accuracy of this field for this forwarder
    pub historical_accuracy: Option<f64>,
}

/// Resolved confidence for one field
///
/// Ephemeral: computed per extraction pass and carried inside the routing
/// request, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfidence {
    /// Field name (e.g. "invoice_number", "total_amount")
    pub field_name: String,
    /// Weighted score in [0, 100]
    pub score: f64,
    /// The factors the score was computed from, with fallbacks applied
    pub factors: ResolvedFactors,
}

/// Factor values after fallback substitution (all present)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolvedFactors {
    pub ocr_clarity: f64,
    pub rule_match: f64,
    pub format_validity: f64,
    pub historical_accuracy: f64,
}

/// Aggregate confidence for a document: the mean of its field scores
///
/// Owned by the extraction result; immutable once routing consumes it. A
/// re-extraction produces a new value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DocumentConfidence {
    /// Mean field score in [0, 100]
    pub score: f64,
    /// Number of fields the mean was taken over (always >= 1)
    pub field_count: usize,
}

/// Confidence band used by routing and display collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    /// Score >= band_high (default 90)
    High,
    /// Score >= band_medium (default 70)
    Medium,
    /// Everything below
    Low,
}

impl ConfidenceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}
