//! HTTP API integration tests
//!
//! Exercise the router in-process with `tower::ServiceExt::oneshot` against the
//! in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use vendcrm_activity_relay::config::Settings;
use vendcrm_activity_relay::server::{create_app, AppState};
use vendcrm_activity_relay::store::MemoryActivityStore;

fn test_state(api_key: Option<&str>) -> AppState {
    let mut settings = Settings::default();
    settings.store.backend = "memory".to_string();
    settings.api.key = api_key.map(str::to_string);
    AppState::with_store(settings, Arc::new(MemoryActivityStore::new()))
}

fn test_app(api_key: Option<&str>) -> Router {
    create_app(test_state(api_key))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_activity(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/activities")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_create_activity_returns_stored_record() {
    let app = test_app(None);

    let response = app
        .oneshot(post_activity(json!({
            "customerId": 12,
            "type": "call",
            "description": "  Discussed Q3 restock schedule  ",
            "outcome": "Agreed",
            "nextSteps": "",
            "contactMethod": "phone"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["customerId"], 12);
    assert_eq!(body["type"], "call");
    assert_eq!(body["description"], "Discussed Q3 restock schedule");
    assert_eq!(body["nextSteps"], Value::Null);
    assert!(body["createdAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_create_activity_rejects_invalid_payloads() {
    let state = test_state(None);

    let cases = [
        json!({"customerId": 0, "type": "call", "description": "x"}),
        json!({"customerId": 1, "type": "fax", "description": "x"}),
        json!({"customerId": 1, "type": "note", "description": "   "}),
        json!({"customerId": 1, "type": "note"}),
    ];

    for payload in cases {
        let response = create_app(state.clone())
            .oneshot(post_activity(payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    // Nothing was stored
    let response = create_app(state).oneshot(get("/api/v1/activities")).await.unwrap();
    assert_eq!(body_json(response).await["count"], 0);
}

#[tokio::test]
async fn test_list_recent_and_per_customer() {
    let state = test_state(None);

    for (customer_id, description) in [(1, "Intro call"), (2, "Site survey"), (1, "Contract sent")] {
        let response = create_app(state.clone())
            .oneshot(post_activity(json!({
                "customerId": customer_id,
                "type": "email",
                "description": description
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = create_app(state.clone())
        .oneshot(get("/api/v1/activities?limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["activities"][0]["description"], "Contract sent");

    let response = create_app(state)
        .oneshot(get("/api/v1/customers/1/activities"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    let descriptions: Vec<&str> = body["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["description"].as_str().unwrap())
        .collect();
    assert_eq!(descriptions, vec!["Contract sent", "Intro call"]);
}

#[tokio::test]
async fn test_malformed_query_and_path_return_json_errors() {
    let state = test_state(None);

    for uri in [
        "/api/v1/activities?limit=abc",
        "/api/v1/customers/abc/activities",
        "/api/v1/customers/1/activities?limit=-3",
        "/api/v1/customers/0/activities",
    ] {
        let response = create_app(state.clone()).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{uri}");
        assert!(body["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let state = test_state(Some("secret"));

    let response = create_app(state.clone())
        .oneshot(get("/api/v1/activities"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/activities")
        .header("X-API-Key", "wrong")
        .body(Body::empty())
        .unwrap();
    let response = create_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/activities")
        .header("X-API-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let response = create_app(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Ops endpoints stay open
    let response = create_app(state).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_stats_and_metrics() {
    let state = test_state(None);

    let response = create_app(state.clone()).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["store"]["reachable"], true);
    assert_eq!(body["store"]["durable"], false);
    assert_eq!(body["store"]["retained_rows"], 0);

    // The in-memory row count follows inserts
    let response = create_app(state.clone())
        .oneshot(post_activity(json!({
            "customerId": 4,
            "type": "note",
            "description": "Restock reminder"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = create_app(state.clone()).oneshot(get("/health")).await.unwrap();
    assert_eq!(body_json(response).await["store"]["retained_rows"], 1);

    let response = create_app(state.clone()).oneshot(get("/stats")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["connections"]["total_connections"], 0);
    assert_eq!(body["relay"]["running"], false);
    assert_eq!(body["relay"]["cursor_policy"], "max_seen");
    assert_eq!(body["relay"]["poll_interval_ms"], 5000);

    let response = create_app(state).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("vendcrm_feed_connections"));
}
