// ============================================================================
// Error Handling - HTTP mapping for sync errors
// ============================================================================
//
// Validation and not-found messages are written by this service and safe to
// return as-is. Connection and ERP faults can carry upstream bodies, so the
// detail is logged server-side and the client gets the failing target only.
//
// ============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::error::SyncError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Sync(err) => match err {
                SyncError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
                SyncError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                SyncError::Configuration(msg) => {
                    tracing::error!("Configuration error: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Service is not configured".to_string())
                }
                SyncError::Connection { target, message } => {
                    tracing::error!(target_system = %target, "Connection error: {}", message);
                    (StatusCode::BAD_GATEWAY, format!("Upstream unavailable: {}", target))
                }
                SyncError::ErpRejected { tenant, message } => {
                    tracing::error!(tenant = %tenant, "ERP rejected request: {}", message);
                    (StatusCode::BAD_GATEWAY, format!("ERP tenant {} rejected the request", tenant))
                }
                SyncError::PartialWrite(msg) => {
                    tracing::error!("Partial write escaped orchestration: {}", msg);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Sync(err) => err.kind(),
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
            "kind": self.kind(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenant::TenantCode;
    use crate::services::error::ConnectionTarget;

    fn status_of(err: SyncError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn maps_sync_errors_to_status_codes() {
        assert_eq!(status_of(SyncError::Validation("x".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(SyncError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(SyncError::Configuration("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status_of(SyncError::connection(ConnectionTarget::RecordStore, "down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SyncError::ErpRejected { tenant: TenantCode::Cl, message: "x".into() }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn upstream_detail_is_not_returned() {
        let err = AppError::from(SyncError::connection(
            ConnectionTarget::Erp(TenantCode::Ar),
            "password=hunter2 rejected",
        ));
        let (_, message) = err.status_and_message();
        assert!(!message.contains("hunter2"));
        assert!(message.contains("ERP tenant AR"));
    }

    #[test]
    fn bad_request_keeps_message() {
        let (status, message) = AppError::BadRequest("unknown tenant XX".into()).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "unknown tenant XX");
    }
}
