// Sync Error Taxonomy
// Every orchestration call returns one of these; transport clients convert
// their own error enums into it at the service boundary.

use std::fmt;
use thiserror::Error;

use crate::models::tenant::TenantCode;

/// Remote backend a connection failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTarget {
    Erp(TenantCode),
    RecordStore,
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::Erp(tenant) => write!(f, "ERP tenant {}", tenant),
            ConnectionTarget::RecordStore => f.write_str("record store"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error ({target}): {message}")]
    Connection {
        target: ConnectionTarget,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("ERP tenant {tenant} rejected the request: {message}")]
    ErpRejected { tenant: TenantCode, message: String },

    /// Write-back to the record store failed after the ERP side succeeded.
    /// Never propagated out of an orchestrator; see `WriteBackStatus`.
    #[error("Partial write: {0}")]
    PartialWrite(String),
}

impl SyncError {
    pub fn connection(target: ConnectionTarget, message: impl Into<String>) -> Self {
        SyncError::Connection {
            target,
            message: message.into(),
        }
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Configuration(_) => "configuration",
            SyncError::Connection { .. } => "connection",
            SyncError::NotFound(_) => "not_found",
            SyncError::Validation(_) => "validation",
            SyncError::ErpRejected { .. } => "erp_rejected",
            SyncError::PartialWrite(_) => "partial_write",
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_names_the_tenant() {
        let err = SyncError::connection(ConnectionTarget::Erp(TenantCode::Cl), "login refused");
        assert_eq!(err.to_string(), "Connection error (ERP tenant CL): login refused");
        assert_eq!(err.kind(), "connection");
    }
}
