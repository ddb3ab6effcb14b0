//! Integration tests for the API server over the in-memory stores.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::{InMemoryCheckpointStore, InMemoryEventStore};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{InMemoryReadModelStore, Projector};
use saga::{InMemoryOutcomeStore, RetryPolicy, SagaConfig};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn fast_saga_config() -> SagaConfig {
    SagaConfig {
        retry: RetryPolicy {
            initial_interval: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            max_interval: Duration::from_millis(50),
            max_attempts: 3,
        },
        step_timeout: Duration::from_secs(5),
        ..SagaConfig::default()
    }
}

fn setup() -> (
    axum::Router,
    Projector<InMemoryEventStore, InMemoryCheckpointStore, InMemoryReadModelStore>,
) {
    let store = InMemoryEventStore::new();
    let (state, projector) = api::create_state(
        store,
        InMemoryCheckpointStore::new(),
        InMemoryReadModelStore::new(),
        Arc::new(InMemoryOutcomeStore::new()),
        fast_saga_config(),
    );
    let app = api::create_app(state, get_metrics_handle());
    (app, projector)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Polls the saga status endpoint until it reports a terminal state.
async fn wait_for_terminal_state(app: &axum::Router, order_id: &str) -> serde_json::Value {
    for _ in 0..400 {
        let (status, json) = get_json(app, &format!("/orders/{order_id}/saga")).await;
        if status == StatusCode::OK {
            let state = json["state"].as_str().unwrap_or_default();
            if matches!(
                state,
                "Completed" | "Failed" | "Compensated" | "CompensationFailed"
            ) {
                return json;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("saga for {order_id} never reached a terminal state");
}

#[tokio::test]
async fn health_check() {
    let (app, _) = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn add_stock_then_query_the_view() {
    let (app, projector) = setup();

    let (status, json) =
        post_json(&app, "/products/SKU-001/stock", serde_json::json!({"qty": 10})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 1);

    // The view lags until the projector folds the event.
    let (status, _) = get_json(&app, "/products/SKU-001").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    projector.catch_up().await.unwrap();

    let (status, json) = get_json(&app, "/products/SKU-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["available"], 10);
    assert_eq!(json["last_applied_version"], 1);
}

#[tokio::test]
async fn submission_is_soft_rejected_without_stock() {
    let (app, _) = setup();

    let (status, json) = post_json(
        &app,
        "/orders",
        serde_json::json!({
            "order_id": "ORD-1", "product_id": "SKU-001", "qty": 3, "amount": 500
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "out of stock");
    assert_eq!(json["available"], 0);
}

#[tokio::test]
async fn accepted_order_runs_to_completion() {
    let (app, projector) = setup();

    post_json(&app, "/products/SKU-001/stock", serde_json::json!({"qty": 10})).await;
    projector.catch_up().await.unwrap();

    let (status, json) = post_json(
        &app,
        "/orders",
        serde_json::json!({
            "order_id": "ORD-1", "product_id": "SKU-001", "qty": 3, "amount": 500
        }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["saga_id"], "order-ORD-1");
    assert_eq!(json["status"], "processing started");

    let saga = wait_for_terminal_state(&app, "ORD-1").await;
    assert_eq!(saga["state"], "Completed");

    projector.catch_up().await.unwrap();
    let (_, product) = get_json(&app, "/products/SKU-001").await;
    assert_eq!(product["available"], 7);
}

#[tokio::test]
async fn rejected_payment_surfaces_as_compensated() {
    let (app, projector) = setup();

    post_json(&app, "/products/SKU-001/stock", serde_json::json!({"qty": 10})).await;
    projector.catch_up().await.unwrap();

    // Over the payment approval limit.
    let (status, _) = post_json(
        &app,
        "/orders",
        serde_json::json!({
            "order_id": "ORD-1", "product_id": "SKU-001", "qty": 3, "amount": 15000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let saga = wait_for_terminal_state(&app, "ORD-1").await;
    assert_eq!(saga["state"], "Compensated");

    // Inventory is back where it started.
    projector.catch_up().await.unwrap();
    let (_, product) = get_json(&app, "/products/SKU-001").await;
    assert_eq!(product["available"], 10);
}

#[tokio::test]
async fn saga_status_for_unknown_order_is_not_found() {
    let (app, _) = setup();
    let (status, _) = get_json(&app, "/orders/ORD-404/saga").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_submissions_are_rejected_up_front() {
    let (app, _) = setup();

    for body in [
        serde_json::json!({"order_id": "", "product_id": "SKU-001", "qty": 3, "amount": 500}),
        serde_json::json!({"order_id": "ORD-1", "product_id": "SKU-001", "qty": 0, "amount": 500}),
        serde_json::json!({"order_id": "ORD-1", "product_id": "SKU-001", "qty": 3, "amount": -1}),
    ] {
        let (status, _) = post_json(&app, "/orders", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn stale_view_can_false_accept_but_the_hard_check_holds() {
    let (app, projector) = setup();

    post_json(&app, "/products/SKU-001/stock", serde_json::json!({"qty": 3})).await;
    projector.catch_up().await.unwrap();

    // First order takes everything; the view still shows 3 until the
    // projector catches up, so the second order passes the soft check.
    post_json(
        &app,
        "/orders",
        serde_json::json!({
            "order_id": "ORD-1", "product_id": "SKU-001", "qty": 3, "amount": 500
        }),
    )
    .await;
    let first = wait_for_terminal_state(&app, "ORD-1").await;
    assert_eq!(first["state"], "Completed");

    let (status, _) = post_json(
        &app,
        "/orders",
        serde_json::json!({
            "order_id": "ORD-2", "product_id": "SKU-001", "qty": 3, "amount": 500
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // The authoritative check at append time refuses it.
    let second = wait_for_terminal_state(&app, "ORD-2").await;
    assert_eq!(second["state"], "Failed");
}
