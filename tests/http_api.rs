// HTTP surface: routing, status mapping and response shapes.
// Run with: cargo test --test http_api

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{start_env, TestEnv, MASTERS, OPERATIONS};
use freight_erp_sync::startup::{build_router, AppState};

fn router(env: &TestEnv) -> Router {
    build_router(AppState::from_config(env.config.clone()).unwrap())
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let env = start_env().await;
    let (status, body) = call(router(&env), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "freight-erp-sync");
}

#[tokio::test]
async fn tenant_status_lists_both_tenants() {
    let env = start_env().await;
    let (status, body) = call(router(&env), "GET", "/api/tenants/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["all_connected"], true);
    let tenants = body["tenants"].as_array().unwrap();
    assert_eq!(tenants.len(), 2);
    assert_eq!(tenants[0]["tenant"], "AR");
    assert_eq!(tenants[1]["company_id"], 2);
}

#[tokio::test]
async fn process_master_returns_result() {
    let env = start_env().await;
    env.records.write().await.insert(
        MASTERS,
        "recM7",
        json!({"Master": "M-7", "Nombre del Cliente": "ACME SA", "País Cliente": "Argentina"}),
    );

    let (status, body) = call(router(&env), "POST", "/api/masters/recM7/process").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], "AR");
    assert_eq!(body["shipment_name"], "M-7");
    assert!(body["party"]["id"].is_i64());
}

#[tokio::test]
async fn missing_record_is_404() {
    let env = start_env().await;
    let (status, body) = call(router(&env), "POST", "/api/operations/recNope/process").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn validation_failure_is_422() {
    let env = start_env().await;
    env.records
        .write()
        .await
        .insert(MASTERS, "recM8", json!({"Master": "M-8"}));

    let (status, body) = call(router(&env), "POST", "/api/masters/recM8/process").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn unknown_tenant_is_bad_request() {
    let env = start_env().await;
    let (status, body) = call(router(&env), "POST", "/api/tenants/BR/products/sync").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn operation_fields_are_sorted() {
    let env = start_env().await;
    env.records.write().await.insert(
        OPERATIONS,
        "recOp1",
        json!({"Tarifa de Venta": 100, "Destino": "Santiago", "Origen": "Mendoza"}),
    );

    let (status, body) = call(router(&env), "GET", "/api/operations/recOp1/fields").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record_id"], "recOp1");
    let keys: Vec<&String> = body["fields"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["Destino", "Origen", "Tarifa de Venta"]);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let env = start_env().await;
    let response = router(&env)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn metrics_are_exposed() {
    let env = start_env().await;
    let app = router(&env);
    call(app.clone(), "GET", "/health").await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("freight_http_requests_total"));
}
