//! Routing: path selection and transactional commit
//!
//! `route` is a pure function over the scored fields; `commit` persists the
//! decision and its queue effect atomically, then notifies subscribers.
//! Precedence: the critical-field escalation wins over any aggregate
//! threshold, then the thresholds apply top-down.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use fwip_common::events::{EngineEvent, EventBus};
use fwip_common::params::EngineParams;
use fwip_common::Result;

use crate::db::{decisions, queue};
use crate::models::{FieldScore, RoutePath, RoutingDecision};

/// Decide the processing path for a scored document
pub fn route(
    document_id: Uuid,
    fields: &[FieldScore],
    document_confidence: f64,
    params: &EngineParams,
) -> RoutingDecision {
    let low_confidence_fields: Vec<String> = fields
        .iter()
        .filter(|f| f.score < params.quick_review_threshold)
        .map(|f| f.field_name.clone())
        .collect();

    let critical_low = fields
        .iter()
        .filter(|f| f.critical && f.score < params.quick_review_threshold)
        .count();

    let (path, reason) = if critical_low >= params.critical_field_limit {
        (
            RoutePath::ManualRequired,
            format!(
                "{} critical fields below {}",
                critical_low, params.quick_review_threshold
            ),
        )
    } else if document_confidence >= params.auto_approve_threshold {
        (
            RoutePath::AutoApprove,
            format!(
                "Document confidence {:.2} >= {}",
                document_confidence, params.auto_approve_threshold
            ),
        )
    } else if document_confidence >= params.quick_review_threshold {
        (
            RoutePath::QuickReview,
            format!(
                "Document confidence {:.2} >= {}",
                document_confidence, params.quick_review_threshold
            ),
        )
    } else {
        (
            RoutePath::FullReview,
            format!(
                "Document confidence {:.2} < {}",
                document_confidence, params.quick_review_threshold
            ),
        )
    };

    RoutingDecision {
        document_id,
        path,
        reason,
        confidence: document_confidence,
        low_confidence_fields,
        decided_at: chrono::Utc::now(),
    }
}

/// Persist a routing decision and its queue effect in one transaction
///
/// Review paths upsert the document's queue entry; AUTO_APPROVE removes any
/// stale entry left by an earlier decision, so a re-extracted document that
/// now clears the bar drops out of the queue.
pub async fn commit(pool: &SqlitePool, event_bus: &EventBus, decision: &RoutingDecision) -> Result<()> {
    let mut tx = pool.begin().await?;

    decisions::insert_decision(&mut tx, decision).await?;

    match decision.path {
        RoutePath::AutoApprove => {
            queue::remove_entry(&mut tx, decision.document_id).await?;
        }
        path => {
            queue::upsert_entry(&mut tx, decision.document_id, path, path.queue_priority())
                .await?;
        }
    }

    tx.commit().await?;

    info!(
        "Routed document {} to {} (confidence {:.2})",
        decision.document_id,
        decision.path.as_str(),
        decision.confidence
    );

    event_bus.emit_lossy(EngineEvent::DocumentRouted {
        document_id: decision.document_id,
        path: decision.path.as_str().to_string(),
        confidence: decision.confidence,
        timestamp: decision.decided_at,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> EngineParams {
        EngineParams::default()
    }

    fn field(name: &str, score: f64, critical: bool) -> FieldScore {
        FieldScore {
            field_name: name.to_string(),
            score,
            critical,
        }
    }

    #[test]
    fn test_route_auto_approve() {
        let fields = vec![field("invoice_number", 97.0, true), field("eta", 96.0, false)];
        let decision = route(Uuid::new_v4(), &fields, 96.5, &params());
        assert_eq!(decision.path, RoutePath::AutoApprove);
        assert!(decision.low_confidence_fields.is_empty());
    }

    #[test]
    fn test_route_quick_review_collects_low_fields() {
        let fields = vec![
            field("invoice_number", 95.0, true),
            field("consignee", 75.0, false),
        ];
        let decision = route(Uuid::new_v4(), &fields, 85.0, &params());
        assert_eq!(decision.path, RoutePath::QuickReview);
        assert_eq!(decision.low_confidence_fields, vec!["consignee"]);
    }

    #[test]
    fn test_route_full_review_below_quick_bar() {
        let fields = vec![field("invoice_number", 79.0, false)];
        let decision = route(Uuid::new_v4(), &fields, 79.0, &params());
        assert_eq!(decision.path, RoutePath::FullReview);
    }

    #[test]
    fn test_route_exact_thresholds_inclusive() {
        let p = params();
        let decision = route(Uuid::new_v4(), &[field("a", 95.0, false)], 95.0, &p);
        assert_eq!(decision.path, RoutePath::AutoApprove);
        let decision = route(Uuid::new_v4(), &[field("a", 80.0, false)], 80.0, &p);
        assert_eq!(decision.path, RoutePath::QuickReview);
    }

    #[test]
    fn test_critical_escalation_overrides_aggregate() {
        // Aggregate would auto-approve, but three critical fields are weak
        let fields = vec![
            field("invoice_number", 60.0, true),
            field("total_amount", 65.0, true),
            field("hbl_number", 70.0, true),
            field("notes", 99.0, false),
        ];
        let decision = route(Uuid::new_v4(), &fields, 96.0, &params());
        assert_eq!(decision.path, RoutePath::ManualRequired);
        assert_eq!(decision.low_confidence_fields.len(), 3);
    }

    #[test]
    fn test_two_weak_criticals_do_not_escalate() {
        let fields = vec![
            field("invoice_number", 60.0, true),
            field("total_amount", 65.0, true),
            field("hbl_number", 85.0, true),
        ];
        let decision = route(Uuid::new_v4(), &fields, 82.0, &params());
        assert_eq!(decision.path, RoutePath::QuickReview);
    }
}
