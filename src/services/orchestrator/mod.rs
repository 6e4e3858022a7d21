// Orchestrators
// Request-level flows: load a record, route it to a tenant, resolve ERP
// entities, write identifiers back. Each flow awaits its remote calls one
// after another.

pub mod leg;
pub mod master;

pub use leg::LegOrchestrator;
pub use master::MasterOrchestrator;

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::metrics::{record_sync_operation, record_write_back_failure};
use crate::models::record::Record;
use crate::models::sync_result::WriteBackStatus;
use crate::models::tenant::TenantCode;
use crate::services::country_router::is_invalid_override;
use crate::services::erp::session_pool::TenantConnectionManager;
use crate::services::error::{Result, SyncError};
use crate::services::record_store::AirtableClient;
use crate::utils::log_sanitizer::{sanitize_for_log, sanitize_option_for_log};

/// Shared dependencies of every sync flow. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<AppConfig>,
    pub connections: Arc<TenantConnectionManager>,
    pub record_store: AirtableClient,
}

impl SyncContext {
    pub fn new(config: Arc<AppConfig>, record_store: AirtableClient) -> Self {
        let connections = Arc::new(TenantConnectionManager::new(
            config.tenants.clone(),
            config.http_timeout,
        ));
        Self {
            config,
            connections,
            record_store,
        }
    }

    pub(crate) async fn load(&self, table: &str, record_id: &str) -> Result<Record> {
        if record_id.trim().is_empty() {
            return Err(SyncError::Validation("record id is required".to_string()));
        }
        self.record_store
            .get_record(table, record_id)
            .await
            .map_err(|err| match SyncError::from(err) {
                SyncError::NotFound(_) => {
                    SyncError::NotFound(format!("{} record {}", table, record_id))
                }
                other => other,
            })
    }

    /// Best-effort update of ERP identifiers on the source record. Failure
    /// never undoes the ERP side; it is reported in the result instead.
    pub(crate) async fn write_back(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> WriteBackStatus {
        let names: Vec<String> = fields.keys().cloned().collect();

        match self.record_store.update_record(table, record_id, fields).await {
            Ok(_) => WriteBackStatus::Written { fields: names },
            Err(err) => {
                let err = SyncError::PartialWrite(format!(
                    "ERP changes applied but {} record {} was not updated: {}",
                    table, record_id, err
                ));
                tracing::warn!(
                    table,
                    record_id = %sanitize_for_log(record_id),
                    error = %err,
                    "Write-back failed"
                );
                record_write_back_failure(table);
                WriteBackStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

pub(crate) fn warn_on_invalid_override(field: &str, value: Option<&str>) {
    if is_invalid_override(value) {
        tracing::warn!(
            field,
            value = %sanitize_option_for_log(value),
            "Ignoring unknown tenant override"
        );
    }
}

/// Count the outcome of a flow and pass the result through.
pub(crate) fn observe<T>(
    operation: &str,
    result: Result<T>,
    tenant_of: impl Fn(&T) -> TenantCode,
) -> Result<T> {
    match &result {
        Ok(value) => record_sync_operation(operation, Some(tenant_of(value)), "success"),
        Err(err) => {
            tracing::warn!(operation, error = %err, "Sync operation failed");
            record_sync_operation(operation, None, err.kind());
        }
    }
    result
}
