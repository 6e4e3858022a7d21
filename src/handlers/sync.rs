// Sync API Handlers
// Thin HTTP layer over the orchestrators: parse the path, run the flow,
// return the structured result as JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::middleware::error_handling::{AppError, Result};
use crate::models::tenant::TenantCode;
use crate::services::{CatalogSync, CompanySync, LegOrchestrator, MasterOrchestrator};
use crate::startup::AppState;
use crate::utils::log_sanitizer::sanitize_for_log;

#[derive(Debug, Serialize)]
pub struct RecordFieldsResponse {
    pub record_id: String,
    pub created_time: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

fn parse_tenant(raw: &str) -> Result<TenantCode> {
    TenantCode::parse(raw).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unknown tenant: {}. Must be 'AR' or 'CL'",
            sanitize_for_log(raw)
        ))
    })
}

// ============================================================================
// Health / Connectivity
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "freight-erp-sync",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Per-tenant login check. Always 200; failures are reported per tenant.
/// GET /api/tenants/status
pub async fn tenant_status(State(state): State<AppState>) -> impl IntoResponse {
    let tenants = state.sync.connections.check_all().await;
    let all_connected = tenants.iter().all(|t| t.connected);
    Json(json!({
        "all_connected": all_connected,
        "tenants": tenants,
    }))
}

// ============================================================================
// Masters
// ============================================================================

/// POST /api/masters/:id/process
pub async fn process_master(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let result = MasterOrchestrator::new(state.sync.clone()).process(&record_id).await?;
    Ok(Json(result))
}

/// POST /api/masters/:id/invoice
pub async fn invoice_master(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let result = MasterOrchestrator::new(state.sync.clone()).invoice(&record_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

// ============================================================================
// Operations (legs)
// ============================================================================

/// POST /api/operations/:id/process
pub async fn process_operation(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let result = LegOrchestrator::new(state.sync.clone()).process(&record_id).await?;
    Ok(Json(result))
}

/// POST /api/operations/:id/invoice
pub async fn invoice_operation(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let result = LegOrchestrator::new(state.sync.clone())
        .invoice_carrier(&record_id)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Raw record fields, sorted by name, for checking column mappings.
/// GET /api/operations/:id/fields
pub async fn operation_fields(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let table = &state.sync.config.record_store.tables.operations;
    let record = state.sync.load(table, &record_id).await?;

    Ok(Json(RecordFieldsResponse {
        record_id: record.id,
        created_time: record.created_time,
        fields: record.fields.into_iter().collect(),
    }))
}

// ============================================================================
// Reference data
// ============================================================================

/// POST /api/companies/:id/sync
pub async fn sync_company(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse> {
    let result = CompanySync::new(state.sync.clone()).sync(&record_id).await?;
    Ok(Json(result))
}

/// POST /api/tenants/:tenant/products/sync
pub async fn sync_products(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse> {
    let tenant = parse_tenant(&tenant)?;
    let result = CatalogSync::new(state.sync.clone()).sync_products(tenant).await?;
    Ok(Json(result))
}

/// POST /api/tenants/:tenant/rate-cards/sync
pub async fn sync_rate_cards(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> Result<impl IntoResponse> {
    let tenant = parse_tenant(&tenant)?;
    let result = CatalogSync::new(state.sync.clone()).sync_rate_cards(tenant).await?;
    Ok(Json(result))
}
