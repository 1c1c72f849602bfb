//! HTTP API tests, driving the router in-process.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mips_lsh::server::routes::create_router;
use mips_lsh::server::AppState;
use mips_lsh::{Corpus, LshParams, MipsIndex, RetrievalConfig};

fn app() -> Router {
    let items = Corpus::from_vectors(vec![
        (1, vec![1.0, 0.0]),
        (2, vec![0.0, 1.0]),
        (3, vec![0.7, 0.7]),
    ])
    .unwrap();
    let users = Corpus::from_vectors(vec![(10, vec![1.0, 1.0])]).unwrap();
    let config = RetrievalConfig {
        // One table of one bit keeps every item on one side or the other;
        // plenty of tables makes sure each item meets the query somewhere.
        lsh: LshParams::new(1, 32).with_seed(4),
        top_k: 2,
        use_xbox_transform: true,
    };
    let index = MipsIndex::build(Arc::new(items), &config).unwrap();
    create_router(Arc::new(AppState::new(
        Arc::new(index),
        Some(Arc::new(users)),
    )))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_query(body: Value) -> Request<Body> {
    Request::post("/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["item_count"], 3);
    assert_eq!(body["user_count"], 1);
}

#[tokio::test]
async fn test_query_by_vector() {
    let (status, body) = send(app(), post_query(json!({"vector": [1.0, 1.0], "k": 2}))).await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert!(!results.is_empty() && results.len() <= 2);
    assert_eq!(results[0]["id"], 3);
    let fraction = body["touched_fraction"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&fraction));
}

#[tokio::test]
async fn test_query_by_user_uses_default_k() {
    let (status, body) = send(app(), post_query(json!({"user": 10}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"].as_array().unwrap().len() <= 2);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (status, body) = send(app(), post_query(json!({"user": 99}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("99"));
}

#[tokio::test]
async fn test_dimension_mismatch_is_bad_request() {
    let (status, _) = send(app(), post_query(json!({"vector": [1.0, 2.0, 3.0]}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zero_k_is_bad_request() {
    let (status, _) = send(app(), post_query(json!({"vector": [1.0, 2.0], "k": 0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ambiguous_request_is_bad_request() {
    let (status, _) = send(app(), post_query(json!({"vector": [1.0, 2.0], "user": 10}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(app(), post_query(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_reports_seed_and_stats() {
    let (status, body) = send(app(), Request::get("/config").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["lsh"]["seed"], 4);
    assert_eq!(body["config"]["top_k"], 2);
    assert_eq!(body["stats"]["num_tables"], 32);
    assert_eq!(body["stats"]["dimension"], 3);
}

#[tokio::test]
async fn test_metrics_count_queries() {
    let app = app();
    send(app.clone(), post_query(json!({"vector": [1.0, 0.0]}))).await;
    send(app.clone(), post_query(json!({"user": 99}))).await;

    let (status, body) = send(app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_queries"], 1);
    assert_eq!(body["failed_queries"], 1);
}
