use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freight_erp_sync::config::AppConfig;
use freight_erp_sync::models::tenant::TenantCode;
use freight_erp_sync::startup::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO; override with RUST_LOG when debugging a tenant.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "freight_erp_sync=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    for tenant in TenantCode::ALL {
        if let Err(err) = config.tenant(tenant).validate() {
            tracing::warn!(tenant = %tenant, error = %err, "Tenant not fully configured; its requests will fail");
        }
    }

    tracing::info!(
        primary = %TenantCode::PRIMARY,
        secondary = %TenantCode::SECONDARY,
        auto_post = config.options.auto_post_invoices,
        invoice_guard = config.options.invoice_guard,
        "Starting freight ERP sync"
    );

    let app = Application::build(config).await?;
    app.run().await
}
