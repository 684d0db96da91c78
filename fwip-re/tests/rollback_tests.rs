//! Integration tests for accuracy monitoring and automatic rollback

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use fwip_common::events::{EngineEvent, EventBus};
use fwip_common::params::EngineParams;
use fwip_re::db::{applications, rollbacks, rules};
use fwip_re::models::{ExtractionMethod, MappingRule, RollbackTrigger, RuleApplication};
use fwip_re::services::{rollback_monitor, rule_manager};

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

/// Create an ACTIVE rule on version 2 (version 1 is regex, version 2 keyword)
async fn active_rule_v2(pool: &SqlitePool, bus: &EventBus) -> MappingRule {
    let rule = rule_manager::create_rule(
        pool,
        Uuid::new_v4(),
        "invoice_number",
        rule_manager::RuleContent {
            extraction_method: ExtractionMethod::Regex,
            pattern: r"INV-\d{6}".to_string(),
            confidence: None,
            priority: 10,
        },
    )
    .await
    .unwrap();
    rule_manager::submit_for_review(pool, rule.id).await.unwrap();
    rule_manager::activate(pool, bus, rule.id).await.unwrap();
    rule_manager::release_version(
        pool,
        bus,
        rule.id,
        rule_manager::RuleContent {
            extraction_method: ExtractionMethod::Keyword,
            pattern: "invoice no".to_string(),
            confidence: None,
            priority: 10,
        },
        "pattern upgrade",
    )
    .await
    .unwrap();

    rules::get_rule(pool, rule.id).await.unwrap().unwrap()
}

/// Record `total` verified applications for a rule version, `accurate` of
/// them accurate
async fn verified_applications(pool: &SqlitePool, rule_id: Uuid, version: i64, accurate: usize, total: usize) {
    for i in 0..total {
        let app = RuleApplication {
            id: Uuid::new_v4(),
            rule_id,
            rule_version: version,
            document_id: Uuid::new_v4(),
            field_name: "invoice_number".to_string(),
            extracted_value: format!("INV-{:06}", i),
            is_accurate: None,
            applied_at: chrono::Utc::now(),
            verified_at: None,
        };
        applications::record_application(pool, &app).await.unwrap();
        applications::verify_application(pool, app.id, i < accurate)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_accuracy_drop_triggers_rollback_as_new_version() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let params = EngineParams::default();

    let rule = active_rule_v2(&pool, &bus).await;
    assert_eq!(rule.current_version, 2);

    // Version 1 ran at 0.85, version 2 dropped to 0.70
    verified_applications(&pool, rule.id, 1, 17, 20).await;
    verified_applications(&pool, rule.id, 2, 7, 10).await;

    let report = rollback_monitor::run_once(&pool, &bus, &params).await.unwrap();
    assert_eq!(report.rules_checked, 1);
    assert_eq!(report.rollbacks_executed, 1);
    assert_eq!(report.failures, 0);

    // The pointer moved forward to a new version carrying v1's content
    let rule = rules::get_rule(&pool, rule.id).await.unwrap().unwrap();
    assert_eq!(rule.current_version, 3);
    let restored = rules::get_version(&pool, rule.id, 3).await.unwrap().unwrap();
    assert_eq!(restored.extraction_method, ExtractionMethod::Regex);
    assert_eq!(restored.pattern, r"INV-\d{6}");
    assert_eq!(restored.change_reason, "auto rollback");

    // History is intact: three immutable snapshots
    assert_eq!(rules::list_versions(&pool, rule.id).await.unwrap().len(), 3);

    let logs = rollbacks::list_for_rule(&pool, rule.id).await.unwrap();
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.from_version, 2);
    assert_eq!(log.to_version, 3);
    assert_eq!(log.trigger, RollbackTrigger::Auto);
    assert!((log.accuracy_before - 0.70).abs() < 1e-9);
    assert!((log.accuracy_after - 0.85).abs() < 1e-9);

    // Skip the RuleActivated events from setup
    loop {
        match rx.recv().await.unwrap() {
            EngineEvent::RollbackExecuted {
                rule_id,
                from_version,
                to_version,
                ..
            } => {
                assert_eq!(rule_id, rule.id);
                assert_eq!(from_version, 2);
                assert_eq!(to_version, 3);
                break;
            }
            EngineEvent::RuleActivated { .. } => continue,
            other => panic!("Unexpected event: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_small_drop_does_not_roll_back() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();

    let rule = active_rule_v2(&pool, &bus).await;

    // 0.85 -> 0.80 is a 0.05 drop, inside the 0.10 tolerance
    verified_applications(&pool, rule.id, 1, 17, 20).await;
    verified_applications(&pool, rule.id, 2, 8, 10).await;

    let report = rollback_monitor::run_once(&pool, &bus, &params).await.unwrap();
    assert_eq!(report.rollbacks_executed, 0);
    assert_eq!(
        rules::get_rule(&pool, rule.id).await.unwrap().unwrap().current_version,
        2
    );
}

#[tokio::test]
async fn test_zero_verified_samples_skips_comparison() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();

    let rule = active_rule_v2(&pool, &bus).await;

    // Current version has samples, the predecessor has none: no baseline,
    // no rollback, regardless of how bad the current numbers look
    verified_applications(&pool, rule.id, 2, 1, 10).await;

    let drop = rollback_monitor::check_accuracy_drop(&pool, &rule, &params)
        .await
        .unwrap();
    assert!(drop.is_none());

    let report = rollback_monitor::run_once(&pool, &bus, &params).await.unwrap();
    assert_eq!(report.rollbacks_executed, 0);
    assert_eq!(report.failures, 0);
}

#[tokio::test]
async fn test_first_version_rules_are_not_monitored() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let params = EngineParams::default();

    let rule = rule_manager::create_rule(
        &pool,
        Uuid::new_v4(),
        "eta",
        rule_manager::RuleContent {
            extraction_method: ExtractionMethod::AzureField,
            pattern: "delivery_date".to_string(),
            confidence: None,
            priority: 0,
        },
    )
    .await
    .unwrap();
    rule_manager::submit_for_review(&pool, rule.id).await.unwrap();
    rule_manager::activate(&pool, &bus, rule.id).await.unwrap();

    let report = rollback_monitor::run_once(&pool, &bus, &params).await.unwrap();
    assert_eq!(report.rules_checked, 0);
}

#[tokio::test]
async fn test_failure_on_one_rule_does_not_stop_the_sweep() {
    let pool = test_pool().await;
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let params = EngineParams::default();

    let healthy = active_rule_v2(&pool, &bus).await;
    let broken = active_rule_v2(&pool, &bus).await;

    // Both rules show a rollback-worthy drop
    for rule_id in [healthy.id, broken.id] {
        verified_applications(&pool, rule_id, 1, 17, 20).await;
        verified_applications(&pool, rule_id, 2, 7, 10).await;
    }

    // Sabotage: the broken rule's predecessor snapshot is gone
    sqlx::query("DELETE FROM rule_versions WHERE rule_id = ? AND version = 1")
        .bind(broken.id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let report = rollback_monitor::run_once(&pool, &bus, &params).await.unwrap();
    assert_eq!(report.rules_checked, 2);
    assert_eq!(report.rollbacks_executed, 1);
    assert_eq!(report.failures, 1);

    // The healthy rule rolled back, the broken one is stuck on version 2
    assert_eq!(
        rules::get_rule(&pool, healthy.id).await.unwrap().unwrap().current_version,
        3
    );
    assert_eq!(
        rules::get_rule(&pool, broken.id).await.unwrap().unwrap().current_version,
        2
    );

    // A RollbackFailed event names the stuck rule
    let mut saw_failure = false;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::RollbackFailed { rule_id, version, .. } = event {
            assert_eq!(rule_id, broken.id);
            assert_eq!(version, 2);
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}
