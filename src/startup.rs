//! Router assembly and server lifecycle.

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::AppConfig;
use crate::handlers::sync::{
    health_check, invoice_master, invoice_operation, operation_fields, process_master,
    process_operation, sync_company, sync_products, sync_rate_cards, tenant_status,
};
use crate::middleware::{metrics_handler, metrics_middleware, request_id_middleware};
use crate::services::error::SyncError;
use crate::services::{AirtableClient, SyncContext};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sync: SyncContext,
}

impl AppState {
    /// Builds the record-store client and the lazy tenant sessions. Only the
    /// record store is validated here; tenant credentials are checked on the
    /// first call that needs them.
    pub fn from_config(config: AppConfig) -> Result<Self, SyncError> {
        let config = Arc::new(config);
        let record_store = AirtableClient::new(&config.record_store, config.http_timeout)?;
        let sync = SyncContext::new(config.clone(), record_store);
        Ok(Self { config, sync })
    }
}

pub fn build_router(state: AppState) -> Router {
    // Callers are automation webhooks, not browsers with cookies.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let api = Router::new()
        .route("/tenants/status", get(tenant_status))
        .route("/masters/:id/process", post(process_master))
        .route("/masters/:id/invoice", post(invoice_master))
        .route("/operations/:id/process", post(process_operation))
        .route("/operations/:id/invoice", post(invoice_operation))
        .route("/operations/:id/fields", get(operation_fields))
        .route("/companies/:id/sync", post(sync_company))
        .route("/tenants/:tenant/products/sync", post(sync_products))
        .route("/tenants/:tenant/rate-cards/sync", post(sync_rate_cards));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(middleware::from_fn(metrics_middleware))
                .layer(middleware::from_fn(request_id_middleware))
                .layer(cors),
        )
}

pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let address = config.server_address();
        let state = AppState::from_config(config)?;
        let listener = TcpListener::bind(&address).await?;
        tracing::info!(address = %address, "Listening");
        Ok(Self {
            listener,
            router: build_router(state),
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
