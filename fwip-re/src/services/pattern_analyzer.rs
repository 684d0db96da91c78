//! Correction pattern analysis
//!
//! Periodically clusters unanalyzed NORMAL corrections into recurring
//! patterns, scoped per (forwarder, field). Two corrections join a cluster
//! when the mean of their original-value and corrected-value similarities
//! reaches the configured threshold; similarity is type-aware, comparing
//! dates by calendar distance and amounts numerically before falling back
//! to edit distance.
//!
//! Each run is all-or-nothing: cluster upserts, the analyzed markers, and
//! candidate promotion commit in a single transaction, so a crashed run
//! leaves every correction unanalyzed and re-processable.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use strsim::normalized_levenshtein;
use tracing::{debug, info};
use uuid::Uuid;

use fwip_common::events::{EngineEvent, EventBus};
use fwip_common::params::EngineParams;
use fwip_common::Result;

use crate::db::{corrections, patterns};
use crate::models::Correction;
use crate::utils::values::{parse_amount, parse_date};

/// Outcome of one analyzer run
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyzerReport {
    pub corrections_consumed: usize,
    pub clusters_written: usize,
    pub patterns_promoted: usize,
}

/// Similarity of two field values in [0, 1]
///
/// Typed comparison applies only when BOTH values parse as the same type;
/// a malformed value on either side falls back to string distance. Dates
/// are tried before amounts: the amount parser strips separators, so a
/// date like "31.12.2024" would otherwise read as a huge integer.
fn value_similarity(a: &str, b: &str) -> f64 {
    if let (Some(x), Some(y)) = (parse_date(a), parse_date(b)) {
        return date_similarity(x, y);
    }
    if let (Some(x), Some(y)) = (parse_amount(a), parse_amount(b)) {
        return numeric_similarity(x, y);
    }
    normalized_levenshtein(a, b)
}

fn numeric_similarity(a: f64, b: f64) -> f64 {
    let denom = a.abs().max(b.abs());
    if denom == 0.0 {
        return 1.0;
    }
    (1.0 - (a - b).abs() / denom).max(0.0)
}

fn date_similarity(a: chrono::NaiveDate, b: chrono::NaiveDate) -> f64 {
    let days = (a - b).num_days().abs() as f64;
    (1.0 - days / 30.0).max(0.0)
}

/// Similarity of two corrections: mean of the original-side and
/// corrected-side value similarities
fn correction_similarity(a: &Correction, b: &Correction) -> f64 {
    let original = value_similarity(&a.original_value, &b.original_value);
    let corrected = value_similarity(&a.corrected_value, &b.corrected_value);
    (original + corrected) / 2.0
}

/// Canonical text form used for pattern identity
///
/// Text-only normalization (trim, collapse whitespace, lowercase). Numeric
/// reformatting is deliberately NOT normalized away: a correction that only
/// changes "100.5" to "100.50" is exactly the kind of formatting pattern
/// the analyzer exists to detect.
fn normalize_pattern(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable fingerprint for a pattern within its (forwarder, field) scope
fn pattern_hash(
    forwarder_id: Uuid,
    field_name: &str,
    normalized_original: &str,
    normalized_corrected: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(forwarder_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(field_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized_original.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized_corrected.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Union-find over correction indices within one (forwarder, field) group
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Cluster a group of corrections; each cluster keeps input order, so the
/// first member is the oldest (fetch order is created_at ascending)
fn cluster_group(group: &[Correction], threshold: f64) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(group.len());
    for i in 0..group.len() {
        for j in (i + 1)..group.len() {
            if correction_similarity(&group[i], &group[j]) >= threshold {
                sets.union(i, j);
            }
        }
    }

    let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..group.len() {
        clusters.entry(sets.find(i)).or_default().push(i);
    }

    let mut out: Vec<Vec<usize>> = clusters.into_values().collect();
    out.sort_by_key(|members| members[0]);
    out
}

/// Run one analysis batch
pub async fn run_batch(
    pool: &SqlitePool,
    event_bus: &EventBus,
    params: &EngineParams,
) -> Result<AnalyzerReport> {
    let backlog = corrections::fetch_unanalyzed(pool, params.analyzer_batch_limit).await?;
    if backlog.is_empty() {
        debug!("Pattern analyzer: no unanalyzed corrections");
        return Ok(AnalyzerReport::default());
    }

    let mut groups: HashMap<(Uuid, String), Vec<Correction>> = HashMap::new();
    for correction in &backlog {
        groups
            .entry((correction.forwarder_id, correction.field_name.clone()))
            .or_default()
            .push(correction.clone());
    }

    let now = chrono::Utc::now();
    let mut clusters_written = 0usize;

    let mut tx = pool.begin().await?;

    for ((forwarder_id, field_name), group) in &groups {
        for members in cluster_group(group, params.similarity_threshold) {
            // Oldest member is the cluster representative
            let representative = &group[members[0]];
            let normalized_original = normalize_pattern(&representative.original_value);
            let normalized_corrected = normalize_pattern(&representative.corrected_value);
            let hash = pattern_hash(
                *forwarder_id,
                field_name,
                &normalized_original,
                &normalized_corrected,
            );
            let last_seen = members
                .iter()
                .map(|&i| group[i].created_at)
                .max()
                .unwrap_or(now);

            patterns::upsert_cluster(
                &mut tx,
                *forwarder_id,
                field_name,
                &hash,
                &normalized_original,
                &normalized_corrected,
                members.len() as i64,
                last_seen,
            )
            .await?;
            clusters_written += 1;
        }
    }

    let ids: Vec<Uuid> = backlog.iter().map(|c| c.id).collect();
    corrections::mark_analyzed(&mut tx, &ids, now).await?;

    let promoted = patterns::promote_candidates(&mut tx, params.promotion_threshold).await?;

    tx.commit().await?;

    for pattern in &promoted {
        event_bus.emit_lossy(EngineEvent::PatternPromoted {
            pattern_id: pattern.id,
            forwarder_id: pattern.forwarder_id,
            field_name: pattern.field_name.clone(),
            occurrence_count: pattern.occurrence_count,
            timestamp: now,
        });
    }

    info!(
        "Pattern analyzer: {} corrections into {} clusters, {} promoted",
        backlog.len(),
        clusters_written,
        promoted.len()
    );

    Ok(AnalyzerReport {
        corrections_consumed: backlog.len(),
        clusters_written,
        patterns_promoted: promoted.len(),
    })
}
