// ============================================================================
// Prometheus Metrics
// ============================================================================
//
// ## Metrics Collected:
//
// 1. **HTTP Request Duration / Total**
//    - freight_http_request_duration_seconds, freight_http_requests_total
//    - Labels: method, path, status
//
// 2. **Sync Operations**
//    - Counter: freight_sync_operations_total
//    - Labels: operation, tenant, outcome
//
// 3. **ERP Calls**
//    - Counter: freight_erp_calls_total
//    - Labels: tenant, model, method
//
// 4. **Write-back Failures**
//    - Counter: freight_write_back_failures_total
//    - Labels: table
//
// ## Endpoints:
//
// - GET /metrics - Prometheus scrape endpoint
//
// ============================================================================

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Instant;

use crate::models::tenant::TenantCode;

// ============================================================================
// PROMETHEUS METRICS REGISTRY
// ============================================================================

lazy_static! {
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "freight_http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path", "status"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "freight_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    ).unwrap();

    /// Orchestration outcomes; `outcome` is `success` or the error kind
    pub static ref SYNC_OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "freight_sync_operations_total",
        "Sync operations by outcome",
        &["operation", "tenant", "outcome"]
    ).unwrap();

    pub static ref ERP_CALLS_TOTAL: CounterVec = register_counter_vec!(
        "freight_erp_calls_total",
        "ERP execute_kw calls",
        &["tenant", "model", "method"]
    ).unwrap();

    pub static ref WRITE_BACK_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "freight_write_back_failures_total",
        "Record-store write-backs that failed after the ERP side succeeded",
        &["table"]
    ).unwrap();
}

/// Collapse record ids so label cardinality stays bounded.
///
/// Example: /api/masters/recA1b2/invoice -> /api/masters/:id/invoice
fn normalize_path(path: &str) -> String {
    let mut normalized: Vec<&str> = Vec::new();
    let mut previous = "";

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if matches!(previous, "masters" | "operations" | "companies") {
            normalized.push(":id");
        } else {
            normalized.push(segment);
        }
        previous = segment;
    }

    format!("/{}", normalized.join("/"))
}

// ============================================================================
// METRICS MIDDLEWARE
// ============================================================================

pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[method.as_str(), &path, &status])
        .observe(duration.as_secs_f64());
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();

    tracing::debug!(
        target: "metrics",
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %duration.as_millis(),
        "HTTP request completed"
    );

    response
}

// ============================================================================
// METRICS ENDPOINT HANDLER
// ============================================================================

pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

// ============================================================================
// HELPER FUNCTIONS FOR APPLICATION USE
// ============================================================================

/// `tenant` is `None` when the call failed before a tenant was resolved.
pub fn record_sync_operation(operation: &str, tenant: Option<TenantCode>, outcome: &str) {
    let tenant = tenant.map(|t| t.as_str()).unwrap_or("none");
    SYNC_OPERATIONS_TOTAL
        .with_label_values(&[operation, tenant, outcome])
        .inc();
}

pub fn record_erp_call(tenant: TenantCode, model: &str, method: &str) {
    ERP_CALLS_TOTAL
        .with_label_values(&[tenant.as_str(), model, method])
        .inc();
}

pub fn record_write_back_failure(table: &str) {
    WRITE_BACK_FAILURES_TOTAL.with_label_values(&[table]).inc();
}

// ============================================================================
// TESTS
// ============================================================================
