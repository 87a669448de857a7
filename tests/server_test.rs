//! HTTP API tests driven through the router without binding a socket.

use std::sync::Arc;

use anchor_knn::server::routes::{
    create_router, ClassifyResponse, HealthResponse, MetricsResponse,
};
use anchor_knn::server::AppState;
use anchor_knn::{ClassifierParams, FastKnn};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

fn app() -> (Router, Arc<AppState>) {
    let classifier = FastKnn::with_params(ClassifierParams::new(2).with_seed(21));
    let state = Arc::new(AppState::new(classifier));
    (create_router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get<T: DeserializeOwned>(app: &Router, uri: &str) -> T {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_insert_and_classify() {
    let (app, _) = app();

    let (status, _) = send(
        &app,
        "POST",
        "/points/batch",
        serde_json::json!({
            "points": [[0.0, 0.0], [10.0, 10.0]],
            "labels": ["A", "B"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        "/points",
        serde_json::json!({"point": [1.0, 1.0], "label": "A"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/classify",
        serde_json::json!({"point": [0.5, 0.5], "k": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: ClassifyResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.label, "A");
    assert_eq!(response.neighbors.len(), 1);

    let health: HealthResponse = get(&app, "/health").await;
    assert_eq!(health.point_count, 3);
    assert_eq!(health.anchor_count, 2);
    assert!(health.index_fresh);

    // The first query built the index; the second reuses it.
    let (status, _) = send(
        &app,
        "POST",
        "/classify",
        serde_json::json!({"point": [9.0, 9.0], "k": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let metrics: MetricsResponse = get(&app, "/metrics").await;
    assert_eq!(metrics.total_inserts, 3);
    assert_eq!(metrics.total_queries, 2);
    assert_eq!(metrics.cold_queries, 1);
    assert_eq!(metrics.cold_latency.samples, 1);
    assert_eq!(metrics.warm_latency.samples, 1);
}

#[tokio::test]
async fn test_invalid_requests() {
    let (app, state) = app();

    let (status, _) = send(
        &app,
        "POST",
        "/classify",
        serde_json::json!({"point": [0.0, 0.0]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/points/batch",
        serde_json::json!({"points": [[0.0, 0.0], [1.0, 1.0]], "labels": ["A", "B", "C"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(state.classifier.lock().unwrap().len(), 0);

    send(&app, "POST", "/points", serde_json::json!({"point": [0.0, 0.0], "label": "A"})).await;
    let (status, _) = send(
        &app,
        "POST",
        "/classify",
        serde_json::json!({"point": [0.0, 0.0], "method": "mean"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = serde_json::json!({"strategy": "kmeans"});
    let (status, _) = send(&app, "POST", "/anchors", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_anchors_marks_index_stale() {
    let (app, _) = app();
    send(
        &app,
        "POST",
        "/points/batch",
        serde_json::json!({"points": [[0.0], [1.0], [2.0]], "labels": ["x", "y", "y"]}),
    )
    .await;
    send(&app, "POST", "/classify", serde_json::json!({"point": [1.9], "k": 2})).await;

    let (status, _) = send(&app, "POST", "/anchors", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = get(&app, "/health").await;
    assert!(!health.index_fresh);
    assert_eq!(health.anchor_count, 2);

    let metrics: MetricsResponse = get(&app, "/metrics").await;
    assert_eq!(metrics.total_anchor_resets, 1);
}

#[tokio::test]
async fn test_health_reports_poisoned_classifier() {
    let (app, state) = app();

    let holder = state.clone();
    let crashed = std::thread::spawn(move || {
        let _guard = holder.classifier.lock().unwrap();
        panic!("handler crashed while holding the classifier");
    })
    .join();
    assert!(crashed.is_err());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
