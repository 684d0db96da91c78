//! Field and document confidence scoring
//!
//! Scoring is a pure, total function over extraction output: absent factors
//! fall back to configured defaults, out-of-range factors clamp into
//! [0, 100], and the weighted combination therefore always lands in
//! [0, 100]. The only refusal is a document with no fields at all.

use fwip_common::params::EngineParams;
use fwip_common::{Error, Result};

use crate::models::{
    ConfidenceBand, DocumentConfidence, FieldConfidence, FieldFactors, ResolvedFactors,
};

/// Clamp a factor into the valid [0, 100] range
fn clamp_factor(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Resolve raw factors against the configured fallbacks
fn resolve_factors(factors: &FieldFactors, params: &EngineParams) -> ResolvedFactors {
    let d = &params.factor_defaults;
    ResolvedFactors {
        ocr_clarity: clamp_factor(factors.ocr_clarity.unwrap_or(d.ocr_clarity)),
        rule_match: clamp_factor(factors.rule_match.unwrap_or(d.rule_match)),
        format_validity: clamp_factor(factors.format_validity.unwrap_or(d.format_validity)),
        historical_accuracy: clamp_factor(
            factors.historical_accuracy.unwrap_or(d.historical_accuracy),
        ),
    }
}

/// Score one field from its raw factors
pub fn score_field(
    field_name: &str,
    factors: &FieldFactors,
    params: &EngineParams,
) -> FieldConfidence {
    let resolved = resolve_factors(factors, params);
    let w = &params.weights;

    let score = resolved.ocr_clarity * w.ocr_clarity
        + resolved.rule_match * w.rule_match
        + resolved.format_validity * w.format_validity
        + resolved.historical_accuracy * w.historical_accuracy;

    FieldConfidence {
        field_name: field_name.to_string(),
        score,
        factors: resolved,
    }
}

/// Aggregate field scores into a document confidence (unweighted mean)
pub fn score_document(fields: &[FieldConfidence]) -> Result<DocumentConfidence> {
    if fields.is_empty() {
        return Err(Error::InvalidInput(
            "Cannot score a document with no extracted fields".to_string(),
        ));
    }

    let sum: f64 = fields.iter().map(|f| f.score).sum();
    Ok(DocumentConfidence {
        score: sum / fields.len() as f64,
        field_count: fields.len(),
    })
}

/// Classify a score into its display band
pub fn classify(score: f64, params: &EngineParams) -> ConfidenceBand {
    if score >= params.band_high {
        ConfidenceBand::High
    } else if score >= params.band_medium {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EngineParams {
        EngineParams::default()
    }

    #[test]
    fn test_score_field_weighted_combination() {
        // 95*0.30 + 90*0.30 + 100*0.25 + 85*0.15 = 93.25
        let factors = FieldFactors {
            ocr_clarity: Some(95.0),
            rule_match: Some(90.0),
            format_validity: Some(100.0),
            historical_accuracy: Some(85.0),
        };
        let field = score_field("invoice_number", &factors, &params());
        assert!((field.score - 93.25).abs() < 1e-9);
        assert_eq!(classify(field.score, &params()), ConfidenceBand::High);
    }

    #[test]
    fn test_score_field_applies_fallbacks() {
        // All absent: 80*0.30 + 70*0.30 + 100*0.25 + 85*0.15 = 82.75
        let field = score_field("total_amount", &FieldFactors::default(), &params());
        assert!((field.score - 82.75).abs() < 1e-9);
        assert_eq!(field.factors.format_validity, 100.0);
    }

    #[test]
    fn test_score_field_clamps_out_of_range_factors() {
        let factors = FieldFactors {
            ocr_clarity: Some(150.0),
            rule_match: Some(-20.0),
            format_validity: Some(100.0),
            historical_accuracy: Some(85.0),
        };
        let field = score_field("eta", &factors, &params());
        assert_eq!(field.factors.ocr_clarity, 100.0);
        assert_eq!(field.factors.rule_match, 0.0);
        assert!(field.score >= 0.0 && field.score <= 100.0);
    }

    #[test]
    fn test_score_document_mean() {
        let p = params();
        let fields = vec![
            score_field("a", &FieldFactors::default(), &p),
            score_field("b", &FieldFactors::default(), &p),
        ];
        let doc = score_document(&fields).unwrap();
        assert!((doc.score - 82.75).abs() < 1e-9);
        assert_eq!(doc.field_count, 2);
    }

    #[test]
    fn test_score_document_rejects_empty() {
        assert!(score_document(&[]).is_err());
    }

    #[test]
    fn test_classify_band_boundaries() {
        let p = params();
        assert_eq!(classify(90.0, &p), ConfidenceBand::High);
        assert_eq!(classify(89.999, &p), ConfidenceBand::Medium);
        assert_eq!(classify(70.0, &p), ConfidenceBand::Medium);
        assert_eq!(classify(69.999, &p), ConfidenceBand::Low);
    }
}
