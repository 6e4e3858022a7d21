// Tenant Connection Manager
// One lazily authenticated ERP session per tenant, shared across requests.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::TenantConfig;
use crate::models::tenant::{PerTenant, TenantCode};
use crate::services::erp::odoo_client::OdooClient;
use crate::services::error::{Result, SyncError};

/// Connectivity report entry for one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct TenantStatus {
    pub tenant: TenantCode,
    pub connected: bool,
    pub company_id: i64,
    pub uid: Option<i64>,
    pub error: Option<String>,
}

pub struct TenantConnectionManager {
    configs: PerTenant<TenantConfig>,
    sessions: PerTenant<OnceCell<Arc<OdooClient>>>,
    timeout: Duration,
}

impl TenantConnectionManager {
    pub fn new(configs: PerTenant<TenantConfig>, timeout: Duration) -> Self {
        Self {
            configs,
            sessions: PerTenant::new(OnceCell::new(), OnceCell::new()),
            timeout,
        }
    }

    pub fn config(&self, tenant: TenantCode) -> &TenantConfig {
        self.configs.get(tenant)
    }

    /// Session for `tenant`, authenticating on first use. A failed login
    /// leaves the cell empty so the next call retries; the other tenant's
    /// cell is never touched.
    pub async fn session(&self, tenant: TenantCode) -> Result<Arc<OdooClient>> {
        let cell = self.sessions.get(tenant);
        let client = cell
            .get_or_try_init(|| async {
                let config = self.configs.get(tenant);
                config.validate()?;
                tracing::debug!(tenant = %tenant, url = %config.url, "Authenticating ERP tenant");
                let client = OdooClient::login(config, self.timeout)
                    .await
                    .map_err(SyncError::from)?;
                Ok::<_, SyncError>(Arc::new(client))
            })
            .await?;
        Ok(Arc::clone(client))
    }

    pub fn is_connected(&self, tenant: TenantCode) -> bool {
        self.sessions.get(tenant).initialized()
    }

    /// Try every tenant and report, never failing as a whole.
    pub async fn check_all(&self) -> Vec<TenantStatus> {
        let mut report = Vec::with_capacity(TenantCode::ALL.len());
        for tenant in TenantCode::ALL {
            let company_id = self.configs.get(tenant).company_id;
            let status = match self.session(tenant).await {
                Ok(client) => TenantStatus {
                    tenant,
                    connected: true,
                    company_id,
                    uid: Some(client.uid()),
                    error: None,
                },
                Err(err) => {
                    tracing::warn!(tenant = %tenant, error = %err, "ERP tenant unreachable");
                    TenantStatus {
                        tenant,
                        connected: false,
                        company_id,
                        uid: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            report.push(status);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceProducts;

    fn unconfigured(tenant: TenantCode) -> TenantConfig {
        TenantConfig {
            tenant,
            url: String::new(),
            db: String::new(),
            username: String::new(),
            password: String::new(),
            company_id: 1,
            currency: "ARS".to_string(),
            products: ServiceProducts::default(),
            sales_journal: None,
            purchase_journal: None,
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_caching() {
        let manager = TenantConnectionManager::new(
            PerTenant::new(unconfigured(TenantCode::Ar), unconfigured(TenantCode::Cl)),
            Duration::from_secs(1),
        );

        let err = manager.session(TenantCode::Cl).await.err().unwrap();
        assert!(matches!(err, SyncError::Configuration(_)));
        assert!(!manager.is_connected(TenantCode::Cl));

        let report = manager.check_all().await;
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|s| !s.connected && s.error.is_some()));
    }
}
