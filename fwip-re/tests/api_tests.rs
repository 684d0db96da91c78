//! Integration tests for the fwip-re HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use fwip_common::events::EventBus;
use fwip_common::params::EngineParams;
use fwip_re::AppState;

/// Test helper: create test app with in-memory database
async fn create_test_app() -> axum::Router {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    fwip_re::db::init_tables(&pool)
        .await
        .expect("Failed to initialize schema");

    let state = AppState::new(pool, EventBus::new(100), EngineParams::default());
    fwip_re::build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "fwip-re");
}

#[tokio::test]
async fn test_route_document_end_to_end() {
    let app = create_test_app().await;
    let document_id = uuid::Uuid::new_v4();

    let request = post_json(
        "/route",
        json!({
            "document_id": document_id,
            "fields": [
                {
                    "field_name": "invoice_number",
                    "factors": {
                        "ocr_clarity": 95.0,
                        "rule_match": 90.0,
                        "format_validity": 100.0,
                        "historical_accuracy": 85.0
                    },
                    "critical": true
                },
                {
                    "field_name": "consignee",
                    "factors": { "ocr_clarity": 60.0, "rule_match": 60.0,
                                 "format_validity": 50.0, "historical_accuracy": 60.0 }
                }
            ]
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    // 93.25 and 57.5 average to 75.375: full review
    assert_eq!(body["path"], "FULL_REVIEW");
    assert_eq!(body["low_confidence_fields"], json!(["consignee"]));
    assert_eq!(body["fields"][0]["band"], "high");
    assert_eq!(body["fields"][1]["band"], "low");

    // The decision is readable back
    let response = app
        .clone()
        .oneshot(get(&format!("/documents/{}/decision", document_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["path"], "FULL_REVIEW");

    // And the document sits in the queue at full-review priority
    let response = app.oneshot(get("/queue")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body[0]["document_id"], json!(document_id));
    assert_eq!(body[0]["priority"], 0);
}

#[tokio::test]
async fn test_route_rejects_empty_field_list() {
    let app = create_test_app().await;

    let request = post_json(
        "/route",
        json!({ "document_id": uuid::Uuid::new_v4(), "fields": [] }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_decision_lookup_unknown_document_is_404() {
    let app = create_test_app().await;

    let response = app
        .oneshot(get(&format!("/documents/{}/decision", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_correction_flow_feeds_analyzer() {
    let app = create_test_app().await;
    let forwarder_id = uuid::Uuid::new_v4();

    for _ in 0..3 {
        let request = post_json(
            "/corrections",
            json!({
                "document_id": uuid::Uuid::new_v4(),
                "forwarder_id": forwarder_id,
                "field_name": "total_amount",
                "original_value": "100.5",
                "corrected_value": "100.50",
                "correction_type": "NORMAL",
                "corrected_by": uuid::Uuid::new_v4()
            }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/analyzer/run", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["corrections_consumed"], 3);
    assert_eq!(body["patterns_promoted"], 1);

    let response = app.oneshot(get("/patterns?status=CANDIDATE")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["occurrence_count"], 3);
}

#[tokio::test]
async fn test_no_op_correction_is_stored_but_not_analyzed() {
    let app = create_test_app().await;
    let document_id = uuid::Uuid::new_v4();

    // The recorder performs no judgment: a corrected value identical to
    // the original is stored for audit
    let request = post_json(
        "/corrections",
        json!({
            "document_id": document_id,
            "forwarder_id": uuid::Uuid::new_v4(),
            "field_name": "total_amount",
            "original_value": "100.50",
            "corrected_value": "100.50",
            "correction_type": "NORMAL",
            "corrected_by": uuid::Uuid::new_v4()
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/documents/{}/corrections", document_id)))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The analyzer's read boundary filters it out: no cluster is learned
    let response = app
        .clone()
        .oneshot(post_json("/analyzer/run", json!({})))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["corrections_consumed"], 0);
    assert_eq!(body["clusters_written"], 0);

    let response = app.oneshot(get("/patterns")).await.unwrap();
    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rule_lifecycle_over_http() {
    let app = create_test_app().await;

    let request = post_json(
        "/rules",
        json!({
            "forwarder_id": uuid::Uuid::new_v4(),
            "field_name": "invoice_number",
            "extraction_method": "regex",
            "pattern": "INV-\\d{6}",
            "priority": 5
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let rule = body_json(response).await;
    assert_eq!(rule["status"], "DRAFT");
    let rule_id = rule["id"].as_str().unwrap().to_string();

    // Activation straight from DRAFT is an invalid transition
    let response = app
        .clone()
        .oneshot(post_json(&format!("/rules/{}/activate", rule_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(&format!("/rules/{}/submit", rule_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(&format!("/rules/{}/activate", rule_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // New content becomes version 2
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/rules/{}/versions", rule_id),
            json!({
                "extraction_method": "keyword",
                "pattern": "invoice no",
                "change_reason": "pattern upgrade"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let version = body_json(response).await;
    assert_eq!(version["version"], 2);
    // Confidence defaulted from the keyword method
    assert_eq!(version["confidence"], 75.0);

    let response = app
        .clone()
        .oneshot(get(&format!("/rules/{}/versions", rule_id)))
        .await
        .unwrap();
    let versions = body_json(response).await;
    assert_eq!(versions.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get(&format!("/rules/{}", rule_id)))
        .await
        .unwrap();
    let rule = body_json(response).await;
    assert_eq!(rule["status"], "ACTIVE");
    assert_eq!(rule["current_version"], 2);
}
