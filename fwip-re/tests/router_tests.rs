//! Integration tests for routing decisions and the review queue

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use fwip_common::events::EventBus;
use fwip_common::params::EngineParams;
use fwip_re::db::{decisions, queue};
use fwip_re::models::{FieldScore, QueueStatus, RoutePath};
use fwip_re::services::path_router;

/// Test helper: in-memory database with the engine schema
async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    fwip_re::db::init_tables(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

fn field(name: &str, score: f64, critical: bool) -> FieldScore {
    FieldScore {
        field_name: name.to_string(),
        score,
        critical,
    }
}

#[tokio::test]
async fn test_commit_creates_queue_entry_with_path_priority() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();

    let decision = path_router::route(
        document_id,
        &[field("invoice_number", 85.0, true)],
        85.0,
        &params,
    );
    assert_eq!(decision.path, RoutePath::QuickReview);
    path_router::commit(&pool, &bus, &decision).await.unwrap();

    let entry = queue::get_entry(&pool, document_id).await.unwrap().unwrap();
    assert_eq!(entry.path, RoutePath::QuickReview);
    assert_eq!(entry.priority, 1);
    assert_eq!(entry.status, QueueStatus::Pending);
    assert!(entry.assignee.is_none());
}

#[tokio::test]
async fn test_recommit_replaces_queue_entry_and_resets_review_state() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let first = path_router::route(document_id, &[field("eta", 85.0, false)], 85.0, &params);
    path_router::commit(&pool, &bus, &first).await.unwrap();
    queue::assign_entry(&pool, document_id, reviewer).await.unwrap();

    // Re-extraction scores worse: FULL_REVIEW replaces the entry
    let second = path_router::route(document_id, &[field("eta", 60.0, false)], 60.0, &params);
    path_router::commit(&pool, &bus, &second).await.unwrap();

    let open = queue::list_open(&pool).await.unwrap();
    assert_eq!(open.len(), 1, "re-routing must not duplicate the entry");
    let entry = &open[0];
    assert_eq!(entry.path, RoutePath::FullReview);
    assert_eq!(entry.priority, 0);
    assert_eq!(entry.status, QueueStatus::Pending);
    assert!(entry.assignee.is_none(), "in-flight review is invalidated");
}

#[tokio::test]
async fn test_auto_approve_removes_stale_queue_entry() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();

    let first = path_router::route(document_id, &[field("eta", 82.0, false)], 82.0, &params);
    path_router::commit(&pool, &bus, &first).await.unwrap();
    assert!(queue::get_entry(&pool, document_id).await.unwrap().is_some());

    let second = path_router::route(document_id, &[field("eta", 97.0, false)], 97.0, &params);
    assert_eq!(second.path, RoutePath::AutoApprove);
    path_router::commit(&pool, &bus, &second).await.unwrap();

    assert!(
        queue::get_entry(&pool, document_id).await.unwrap().is_none(),
        "auto-approved re-route must drop the document from the queue"
    );
}

#[tokio::test]
async fn test_decisions_are_append_only_and_latest_supersedes() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();

    let first = path_router::route(document_id, &[field("eta", 70.0, false)], 70.0, &params);
    path_router::commit(&pool, &bus, &first).await.unwrap();
    let second = path_router::route(document_id, &[field("eta", 90.0, false)], 90.0, &params);
    path_router::commit(&pool, &bus, &second).await.unwrap();

    assert_eq!(decisions::decision_count(&pool, document_id).await.unwrap(), 2);
    let latest = decisions::latest_decision(&pool, document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.path, RoutePath::QuickReview);
    assert_eq!(latest.confidence, 90.0);
}

#[tokio::test]
async fn test_queue_review_order_full_review_first() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();

    let quick = Uuid::new_v4();
    let full = Uuid::new_v4();

    let d1 = path_router::route(quick, &[field("eta", 85.0, false)], 85.0, &params);
    path_router::commit(&pool, &bus, &d1).await.unwrap();
    let d2 = path_router::route(full, &[field("eta", 50.0, false)], 50.0, &params);
    path_router::commit(&pool, &bus, &d2).await.unwrap();

    let open = queue::list_open(&pool).await.unwrap();
    assert_eq!(open.len(), 2);
    // Priority 0 (FULL_REVIEW) sorts ahead of priority 1 (QUICK_REVIEW)
    assert_eq!(open[0].document_id, full);
    assert_eq!(open[1].document_id, quick);
}

#[tokio::test]
async fn test_close_entry_rejects_non_terminal_status() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();

    let decision = path_router::route(document_id, &[field("eta", 85.0, false)], 85.0, &params);
    path_router::commit(&pool, &bus, &decision).await.unwrap();

    assert!(queue::close_entry(&pool, document_id, QueueStatus::Pending)
        .await
        .is_err());
    assert!(queue::close_entry(&pool, document_id, QueueStatus::Completed)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_commit_emits_document_routed_event() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let params = EngineParams::default();
    let document_id = Uuid::new_v4();

    let decision = path_router::route(document_id, &[field("eta", 85.0, false)], 85.0, &params);
    path_router::commit(&pool, &bus, &decision).await.unwrap();

    match rx.recv().await.unwrap() {
        fwip_common::events::EngineEvent::DocumentRouted {
            document_id: id,
            path,
            ..
        } => {
            assert_eq!(id, document_id);
            assert_eq!(path, "QUICK_REVIEW");
        }
        other => panic!("Unexpected event: {:?}", other),
    }
}
