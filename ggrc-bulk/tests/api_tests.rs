//! Integration tests for ggrc-bulk HTTP endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use ggrc_bulk::build_router;
use ggrc_bulk::notifications::BulkOperation;
use helpers::*;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot` method

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let db = setup_test_db().await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ggrc-bulk");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_complete_empty_ids_is_bad_request() {
    let db = setup_test_db().await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let response = app
        .oneshot(json_request(
            "/api/bulk_operations/complete",
            json!({"assessments_ids": [], "attributes": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(
        body["error"]["message"],
        "assessments_ids list for /complete operation can't be empty."
    );
}

#[tokio::test]
async fn test_save_with_ids_is_bad_request() {
    let db = setup_test_db().await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let response = app
        .oneshot(json_request(
            "/api/bulk_operations/cavs/save",
            json!({"assessments_ids": [1], "attributes": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["error"]["message"],
        "assessments_ids list for /save operation should be empty."
    );
}

#[tokio::test]
async fn test_verify_empty_ids_is_bad_request() {
    let db = setup_test_db().await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let response = app
        .oneshot(json_request("/api/bulk_operations/verify", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_endpoint_reports_outcome() {
    let db = setup_test_db().await;
    add_assessment(&db.pool, 10, "a-10", "In Progress").await;
    add_assessment(&db.pool, 20, "a-20", "In Progress").await;
    add_lca(&db.pool, Lca::text(1, 10, "x").of_type("Checkbox")).await;
    let (state, notifier) = app_state(&db.pool);
    let app = build_router(state);

    let mut request = json_request(
        "/api/bulk_operations/complete",
        json!({
            "assessments_ids": [10, 20],
            "attributes": [
                {"assessment": {"id": 10, "slug": "a-10"},
                 "values": [{"value": "1", "title": "x", "type": "Checkbox",
                             "definition_id": 10, "id": 1, "extra": {}}]},
                {"assessment": {"id": 20, "slug": "a-20"}, "values": []}
            ]
        }),
    );
    request
        .headers_mut()
        .insert("x-ggrc-user", "user@example.com".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["succeeded"],
        json!([
            {"title": "Title a-10", "url": "http://ggrc.test/assessments/10"},
            {"title": "Title a-20", "url": "http://ggrc.test/assessments/20"}
        ])
    );
    assert_eq!(body["update_errors"], json!([]));
    assert_eq!(body["deleted"], json!([]));

    assert_eq!(stored_value(&db.pool, 1, 10).await, Some((Some("1".into()), None)));
    assert_eq!(status_of(&db.pool, 10).await, "Completed");
    assert_eq!(status_of(&db.pool, 20).await, "Completed");

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent[0].0, BulkOperation::Complete);
    assert_eq!(sent[0].1.as_deref(), Some("user@example.com"));
}

#[tokio::test]
async fn test_cavs_search_endpoint() {
    let db = setup_test_db().await;
    add_assessment(&db.pool, 1, "ASMT-1", "In Progress").await;
    add_lca(&db.pool, Lca::text(5, 1, "Notes")).await;
    add_value(&db.pool, 5, 1, "hi", None).await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let response = app
        .oneshot(json_request(
            "/api/bulk_operations/cavs/search",
            json!({"ids": [7, 1]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["assessments"][0], Value::Null);
    assert_eq!(body["assessments"][1]["slug"], "ASMT-1");
    assert_eq!(body["attributes"][0]["title"], "Notes");
    assert_eq!(body["attributes"][0]["values"]["1"]["value"], "hi");
    assert_eq!(body["attributes"][0]["values"]["1"]["definition_id"], 1);
}

#[tokio::test]
async fn test_cavs_search_empty_ids() {
    let db = setup_test_db().await;
    let (state, _) = app_state(&db.pool);
    let app = build_router(state);

    let response = app
        .oneshot(json_request("/api/bulk_operations/cavs/search", json!({"ids": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({"attributes": [], "assessments": []}));
}
