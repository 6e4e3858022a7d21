// ERP JSON-RPC Client
// Authenticates once per tenant and scopes every call to the tenant's company
// through the `allowed_company_ids` / `company_id` context keys.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::TenantConfig;
use crate::middleware::metrics::record_erp_call;
use crate::models::tenant::TenantCode;
use crate::services::error::{ConnectionTarget, SyncError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum OdooError {
    #[error("ERP {tenant} HTTP error ({status}): {body}")]
    Http {
        tenant: TenantCode,
        status: StatusCode,
        body: String,
    },

    #[error("ERP {tenant} authentication failed: {message}")]
    Auth { tenant: TenantCode, message: String },

    #[error("ERP {tenant} network error: {source}")]
    Network {
        tenant: TenantCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("ERP {tenant} returned an unexpected response: {message}")]
    Decode { tenant: TenantCode, message: String },

    #[error("ERP {tenant} RPC fault: {message}")]
    Rpc { tenant: TenantCode, message: String },
}

pub type Result<T> = std::result::Result<T, OdooError>;

impl From<OdooError> for SyncError {
    fn from(err: OdooError) -> Self {
        match err {
            OdooError::Rpc { tenant, message } => SyncError::ErpRejected { tenant, message },
            OdooError::Http { tenant, .. }
            | OdooError::Auth { tenant, .. }
            | OdooError::Network { tenant, .. }
            | OdooError::Decode { tenant, .. } => {
                SyncError::connection(ConnectionTarget::Erp(tenant), err.to_string())
            }
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    #[serde(default)]
    message: String,
    data: Option<RpcFaultData>,
}

#[derive(Debug, Deserialize)]
struct RpcFaultData {
    #[serde(default)]
    message: String,
}

impl RpcFault {
    fn describe(&self) -> String {
        match &self.data {
            Some(data) if !data.message.is_empty() => data.message.clone(),
            _ => self.message.clone(),
        }
    }
}

/// One ERP row returned by `search_read`.
pub type ErpRow = Map<String, Value>;

pub fn row_id(row: &ErpRow) -> Option<i64> {
    row.get("id").and_then(Value::as_i64)
}

// ============================================================================
// Client
// ============================================================================

/// Authenticated session against one tenant.
pub struct OdooClient {
    tenant: TenantCode,
    endpoint: String,
    db: String,
    uid: i64,
    password: String,
    company_id: i64,
    http_client: Client,
}

impl OdooClient {
    /// Authenticate with the tenant's credentials and return a ready session.
    pub async fn login(config: &TenantConfig, timeout: Duration) -> Result<Self> {
        let tenant = config.tenant;
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| OdooError::Network { tenant, source })?;

        let endpoint = format!("{}/jsonrpc", config.url.trim_end_matches('/'));

        let result = rpc(
            &http_client,
            tenant,
            &endpoint,
            "common",
            "login",
            json!([config.db, config.username, config.password]),
        )
        .await
        .map_err(|err| match err {
            OdooError::Rpc { tenant, message } => OdooError::Auth { tenant, message },
            other => other,
        })?;

        let uid = result.as_i64().filter(|uid| *uid > 0).ok_or_else(|| OdooError::Auth {
            tenant,
            message: format!("login rejected for user {}", config.username),
        })?;

        tracing::info!(tenant = %tenant, uid, company_id = config.company_id, "ERP session established");

        Ok(Self {
            tenant,
            endpoint,
            db: config.db.clone(),
            uid,
            password: config.password.clone(),
            company_id: config.company_id,
            http_client,
        })
    }

    pub fn tenant(&self) -> TenantCode {
        self.tenant
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    // ========================================================================
    // Object Service
    // ========================================================================

    /// `execute_kw` with the tenant's company forced into the call context.
    pub async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        mut kwargs: Map<String, Value>,
    ) -> Result<Value> {
        let context = kwargs
            .entry("context")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(ctx) = context {
            ctx.insert("allowed_company_ids".to_string(), json!([self.company_id]));
            ctx.insert("company_id".to_string(), json!(self.company_id));
        }

        record_erp_call(self.tenant, model, method);

        rpc(
            &self.http_client,
            self.tenant,
            &self.endpoint,
            "object",
            "execute_kw",
            json!([self.db, self.uid, self.password, model, method, args, kwargs]),
        )
        .await
    }

    /// Search and read rows. `limit == 0` means no limit.
    pub async fn search_read(
        &self,
        model: &str,
        domain: Value,
        fields: &[&str],
        limit: usize,
    ) -> Result<Vec<ErpRow>> {
        let mut kwargs = Map::new();
        if !fields.is_empty() {
            kwargs.insert("fields".to_string(), json!(fields));
        }
        if limit > 0 {
            kwargs.insert("limit".to_string(), json!(limit));
        }

        let result = self.execute_kw(model, "search_read", json!([domain]), kwargs).await?;

        match result {
            Value::Array(rows) => Ok(rows
                .into_iter()
                .filter_map(|row| match row {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(self.decode_error(format!("search_read on {} returned {}", model, other))),
        }
    }

    pub async fn search_one(&self, model: &str, domain: Value, fields: &[&str]) -> Result<Option<ErpRow>> {
        Ok(self.search_read(model, domain, fields, 1).await?.into_iter().next())
    }

    pub async fn create(&self, model: &str, payload: Value) -> Result<i64> {
        let result = self.execute_kw(model, "create", json!([payload]), Map::new()).await?;
        // Single-record create returns an id; batch create returns a list.
        result
            .as_i64()
            .or_else(|| result.as_array().and_then(|ids| ids.first()).and_then(Value::as_i64))
            .ok_or_else(|| self.decode_error(format!("create on {} returned {}", model, result)))
    }

    pub async fn write(&self, model: &str, ids: &[i64], payload: Value) -> Result<bool> {
        let result = self
            .execute_kw(model, "write", json!([ids, payload]), Map::new())
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    /// Call a record method such as `action_post` on `ids`.
    pub async fn call_method(&self, model: &str, method: &str, ids: &[i64]) -> Result<Value> {
        self.execute_kw(model, method, json!([ids]), Map::new()).await
    }

    fn decode_error(&self, message: String) -> OdooError {
        OdooError::Decode {
            tenant: self.tenant,
            message,
        }
    }
}

async fn rpc(
    http_client: &Client,
    tenant: TenantCode,
    endpoint: &str,
    service: &str,
    method: &str,
    args: Value,
) -> Result<Value> {
    let payload = json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": {
            "service": service,
            "method": method,
            "args": args,
        },
        "id": uuid::Uuid::new_v4().to_string(),
    });

    let response = http_client
        .post(endpoint)
        .json(&payload)
        .send()
        .await
        .map_err(|source| OdooError::Network { tenant, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        return Err(OdooError::Http { tenant, status, body });
    }

    let body: RpcResponse = response.json().await.map_err(|e| OdooError::Decode {
        tenant,
        message: e.to_string(),
    })?;

    if let Some(fault) = body.error {
        return Err(OdooError::Rpc {
            tenant,
            message: fault.describe(),
        });
    }

    Ok(body.result.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_fault_prefers_detailed_message() {
        let fault: RpcFault = serde_json::from_value(json!({
            "message": "Odoo Server Error",
            "data": {"message": "Missing required field: plan_id"}
        }))
        .unwrap();
        assert_eq!(fault.describe(), "Missing required field: plan_id");
    }

    #[test]
    fn rpc_fault_maps_to_erp_rejected() {
        let err: SyncError = OdooError::Rpc {
            tenant: TenantCode::Cl,
            message: "access denied".to_string(),
        }
        .into();
        assert!(matches!(err, SyncError::ErpRejected { tenant: TenantCode::Cl, .. }));
    }

    #[test]
    fn auth_failure_maps_to_connection_error() {
        let err: SyncError = OdooError::Auth {
            tenant: TenantCode::Ar,
            message: "bad password".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            SyncError::Connection { target: ConnectionTarget::Erp(TenantCode::Ar), .. }
        ));
    }

    #[test]
    fn row_id_reads_integer_ids() {
        let row: ErpRow = json!({"id": 12, "name": "x"}).as_object().cloned().unwrap();
        assert_eq!(row_id(&row), Some(12));
    }
}
