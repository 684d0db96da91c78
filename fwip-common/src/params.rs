//! Tunable engine parameters
//!
//! Every behavioral constant of the routing engine lives here rather than in
//! code: scoring weights and factor fallbacks, confidence band boundaries,
//! routing thresholds, analyzer similarity/promotion thresholds, and the
//! rollback monitor's window and drop threshold.
//!
//! Parameters load in three layers, later layers winning:
//! 1. Compiled defaults (`EngineParams::default()`)
//! 2. `settings` table overrides (key `param.<field_name>`)
//!
//! `validate()` runs at startup; an invalid parameter set (weights not
//! summing to 1.0, inverted thresholds) refuses to start the service.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

/// Scoring weights for the four field-confidence factors
///
/// The weights must sum to exactly 1.0 so a field score stays in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// OCR clarity weight (default 0.30)
    pub ocr_clarity: f64,
    /// Rule match weight (default 0.30)
    pub rule_match: f64,
    /// Format validity weight (default 0.25)
    pub format_validity: f64,
    /// Historical accuracy weight (default 0.15)
    pub historical_accuracy: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ocr_clarity: 0.30,
            rule_match: 0.30,
            format_validity: 0.25,
            historical_accuracy: 0.15,
        }
    }
}

impl ScoringWeights {
    /// Sum of the four weights
    pub fn sum(&self) -> f64 {
        self.ocr_clarity + self.rule_match + self.format_validity + self.historical_accuracy
    }

    /// Validate that weights sum to exactly 1.0 (within f64 epsilon)
    pub fn validate(&self) -> Result<()> {
        if (self.sum() - 1.0).abs() > 1e-9 {
            return Err(Error::Config(format!(
                "Scoring weights must sum to 1.0 (got {})",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Fallback values used when a scoring factor is absent from the input
///
/// These make field scoring a total function: partial extraction output
/// never fails the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorDefaults {
    /// OCR clarity fallback (default 80)
    pub ocr_clarity: f64,
    /// Rule match fallback (default 70)
    pub rule_match: f64,
    /// Format validity fallback (default 100)
    pub format_validity: f64,
    /// Historical accuracy fallback (default 85)
    pub historical_accuracy: f64,
}

impl Default for FactorDefaults {
    fn default() -> Self {
        Self {
            ocr_clarity: 80.0,
            rule_match: 70.0,
            format_validity: 100.0,
            historical_accuracy: 85.0,
        }
    }
}

/// All runtime-tunable engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Field scoring weights
    pub weights: ScoringWeights,

    /// Factor fallback values for partial scoring input
    pub factor_defaults: FactorDefaults,

    /// Confidence band boundary: "high" is score >= this (default 90)
    pub band_high: f64,

    /// Confidence band boundary: "medium" is score >= this (default 70)
    pub band_medium: f64,

    /// Routing: document confidence at or above this auto-approves (default 95)
    pub auto_approve_threshold: f64,

    /// Routing: document confidence at or above this gets quick review
    /// (default 80); also the per-field bar for `low_confidence_fields`
    pub quick_review_threshold: f64,

    /// Routing: this many critical fields below the quick-review bar forces
    /// MANUAL_REQUIRED regardless of the aggregate (default 3)
    pub critical_field_limit: usize,

    /// Analyzer: combined similarity at or above this joins two corrections
    /// into the same pattern (default 0.8)
    pub similarity_threshold: f64,

    /// Analyzer: occurrence count at which a DETECTED pattern becomes a
    /// CANDIDATE rule-upgrade suggestion (default 3)
    pub promotion_threshold: i64,

    /// Analyzer: maximum corrections consumed per run, to keep run latency
    /// bounded (default 500)
    pub analyzer_batch_limit: i64,

    /// Analyzer: seconds between scheduled runs (default 300)
    pub analyzer_interval_secs: u64,

    /// Rollback: accuracy drop (fraction) beyond which the previous rule
    /// version is restored (default 0.10)
    pub rollback_drop_threshold: f64,

    /// Rollback: trailing window in hours for accuracy comparison (default 24)
    pub rollback_window_hours: i64,

    /// Rollback: seconds between monitor runs (default 3600)
    pub monitor_interval_secs: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            factor_defaults: FactorDefaults::default(),
            band_high: 90.0,
            band_medium: 70.0,
            auto_approve_threshold: 95.0,
            quick_review_threshold: 80.0,
            critical_field_limit: 3,
            similarity_threshold: 0.8,
            promotion_threshold: 3,
            analyzer_batch_limit: 500,
            analyzer_interval_secs: 300,
            rollback_drop_threshold: 0.10,
            rollback_window_hours: 24,
            monitor_interval_secs: 3600,
        }
    }
}

impl EngineParams {
    /// Validate the parameter set; called at startup before any job runs
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        if self.band_high <= self.band_medium {
            return Err(Error::Config(format!(
                "band_high ({}) must exceed band_medium ({})",
                self.band_high, self.band_medium
            )));
        }
        if self.auto_approve_threshold <= self.quick_review_threshold {
            return Err(Error::Config(format!(
                "auto_approve_threshold ({}) must exceed quick_review_threshold ({})",
                self.auto_approve_threshold, self.quick_review_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Config(format!(
                "similarity_threshold must be in [0,1] (got {})",
                self.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.rollback_drop_threshold) {
            return Err(Error::Config(format!(
                "rollback_drop_threshold must be in [0,1] (got {})",
                self.rollback_drop_threshold
            )));
        }
        if self.promotion_threshold < 1 {
            return Err(Error::Config(
                "promotion_threshold must be at least 1".to_string(),
            ));
        }
        if self.analyzer_batch_limit < 1 {
            return Err(Error::Config(
                "analyzer_batch_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load parameters: defaults overridden by `settings` table values
    ///
    /// Unknown or unparseable settings values are skipped with a debug log;
    /// the database is authoritative only for values it actually holds.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let mut params = Self::default();

        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM settings WHERE key LIKE 'param.%'",
        )
        .fetch_all(pool)
        .await?;

        for (key, value) in rows {
            params.apply_override(&key, &value);
        }

        params.validate()?;
        Ok(params)
    }

    /// Apply a single `param.<name>` override from the settings table
    fn apply_override(&mut self, key: &str, value: &str) {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
            match value.parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    debug!("Ignoring unparseable setting {} = {:?}", key, value);
                    None
                }
            }
        }

        match key {
            "param.weight_ocr_clarity" => {
                if let Some(v) = parse(key, value) {
                    self.weights.ocr_clarity = v;
                }
            }
            "param.weight_rule_match" => {
                if let Some(v) = parse(key, value) {
                    self.weights.rule_match = v;
                }
            }
            "param.weight_format_validity" => {
                if let Some(v) = parse(key, value) {
                    self.weights.format_validity = v;
                }
            }
            "param.weight_historical_accuracy" => {
                if let Some(v) = parse(key, value) {
                    self.weights.historical_accuracy = v;
                }
            }
            "param.band_high" => {
                if let Some(v) = parse(key, value) {
                    self.band_high = v;
                }
            }
            "param.band_medium" => {
                if let Some(v) = parse(key, value) {
                    self.band_medium = v;
                }
            }
            "param.auto_approve_threshold" => {
                if let Some(v) = parse(key, value) {
                    self.auto_approve_threshold = v;
                }
            }
            "param.quick_review_threshold" => {
                if let Some(v) = parse(key, value) {
                    self.quick_review_threshold = v;
                }
            }
            "param.critical_field_limit" => {
                if let Some(v) = parse(key, value) {
                    self.critical_field_limit = v;
                }
            }
            "param.similarity_threshold" => {
                if let Some(v) = parse(key, value) {
                    self.similarity_threshold = v;
                }
            }
            "param.promotion_threshold" => {
                if let Some(v) = parse(key, value) {
                    self.promotion_threshold = v;
                }
            }
            "param.analyzer_batch_limit" => {
                if let Some(v) = parse(key, value) {
                    self.analyzer_batch_limit = v;
                }
            }
            "param.analyzer_interval_secs" => {
                if let Some(v) = parse(key, value) {
                    self.analyzer_interval_secs = v;
                }
            }
            "param.rollback_drop_threshold" => {
                if let Some(v) = parse(key, value) {
                    self.rollback_drop_threshold = v;
                }
            }
            "param.rollback_window_hours" => {
                if let Some(v) = parse(key, value) {
                    self.rollback_window_hours = v;
                }
            }
            "param.monitor_interval_secs" => {
                if let Some(v) = parse(key, value) {
                    self.monitor_interval_secs = v;
                }
            }
            _ => debug!("Ignoring unknown setting key {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_unbalanced_weights_rejected() {
        let weights = ScoringWeights {
            ocr_clarity: 0.5,
            rule_match: 0.5,
            format_validity: 0.25,
            historical_accuracy: 0.15,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_default_params_validate() {
        assert!(EngineParams::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut params = EngineParams::default();
        params.auto_approve_threshold = 70.0; // below quick_review (80)
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_apply_override_parses_values() {
        let mut params = EngineParams::default();
        params.apply_override("param.similarity_threshold", "0.9");
        params.apply_override("param.promotion_threshold", "5");
        assert_eq!(params.similarity_threshold, 0.9);
        assert_eq!(params.promotion_threshold, 5);
    }

    #[test]
    fn test_apply_override_skips_garbage() {
        let mut params = EngineParams::default();
        params.apply_override("param.similarity_threshold", "not-a-number");
        params.apply_override("param.unknown_key", "1");
        assert_eq!(params, EngineParams::default());
    }
}
