pub mod record_schema;

use std::env;
use std::fmt;
use std::time::Duration;
use anyhow::Result;

use crate::models::tenant::{PerTenant, TenantCode};
use crate::services::error::SyncError;

pub use record_schema::RecordSchema;

/// ERP product ids used on invoice lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProducts {
    pub transport: i64,
    pub freight: i64,
}

impl Default for ServiceProducts {
    fn default() -> Self {
        Self { transport: 2, freight: 3 }
    }
}

#[derive(Clone)]
pub struct TenantConfig {
    pub tenant: TenantCode,
    pub url: String,
    pub db: String,
    pub username: String,
    pub password: String,
    pub company_id: i64,
    pub currency: String,
    pub products: ServiceProducts,
    pub sales_journal: Option<i64>,
    pub purchase_journal: Option<i64>,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("tenant", &self.tenant)
            .field("url", &self.url)
            .field("db", &self.db)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("company_id", &self.company_id)
            .field("currency", &self.currency)
            .field("products", &self.products)
            .field("sales_journal", &self.sales_journal)
            .field("purchase_journal", &self.purchase_journal)
            .finish()
    }
}

impl TenantConfig {
    /// Checked on first connection, not at startup, so one tenant with
    /// missing credentials does not take the other one down.
    pub fn validate(&self) -> std::result::Result<(), SyncError> {
        let missing: Vec<&str> = [
            ("url", &self.url),
            ("db", &self.db),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(SyncError::Configuration(format!(
                "ERP tenant {} is missing {}",
                self.tenant,
                missing.join(", ")
            )));
        }
        if url::Url::parse(&self.url).is_err() {
            return Err(SyncError::Configuration(format!(
                "ERP tenant {} has an invalid url",
                self.tenant
            )));
        }
        Ok(())
    }

    fn from_env(tenant: TenantCode) -> Result<Self> {
        let (default_company, default_currency) = match tenant {
            TenantCode::Ar => (1, "ARS"),
            TenantCode::Cl => (2, "USD"),
        };

        Ok(Self {
            tenant,
            url: tenant_var(tenant, "URL").unwrap_or_default(),
            db: tenant_var(tenant, "DB").unwrap_or_default(),
            username: tenant_var(tenant, "USERNAME").unwrap_or_default(),
            password: tenant_var(tenant, "PASSWORD").unwrap_or_default(),
            company_id: parse_or(tenant_var(tenant, "COMPANY_ID"), default_company)?,
            currency: tenant_var(tenant, "CURRENCY").unwrap_or_else(|| default_currency.to_string()),
            products: ServiceProducts {
                transport: parse_or(tenant_var(tenant, "PRODUCT_TRANSPORT"), 2)?,
                freight: parse_or(tenant_var(tenant, "PRODUCT_FREIGHT"), 3)?,
            },
            sales_journal: tenant_var(tenant, "JOURNAL_SALES").map(|v| v.parse()).transpose()?,
            purchase_journal: tenant_var(tenant, "JOURNAL_PURCHASES").map(|v| v.parse()).transpose()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordTables {
    pub masters: String,
    pub operations: String,
    pub companies: String,
    pub rate_cards: String,
    /// Request cards linked from legs; holds the customer when the master
    /// has none.
    pub request_cards: String,
}

impl Default for RecordTables {
    fn default() -> Self {
        Self {
            masters: "Masters".to_string(),
            operations: "tblV9e6v8lhdMCqUG".to_string(),
            companies: "Empresas".to_string(),
            rate_cards: "Tarifas".to_string(),
            request_cards: "tblgNDyHnuG4pppWY".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct RecordStoreConfig {
    pub api_key: String,
    pub base_id: String,
    pub base_url: String,
    pub tables: RecordTables,
}

impl fmt::Debug for RecordStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStoreConfig")
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("base_url", &self.base_url)
            .field("tables", &self.tables)
            .finish()
    }
}

impl RecordStoreConfig {
    pub fn validate(&self) -> std::result::Result<(), SyncError> {
        if self.api_key.trim().is_empty() {
            return Err(SyncError::Configuration("AIRTABLE_API_KEY is required".to_string()));
        }
        if self.base_id.trim().is_empty() {
            return Err(SyncError::Configuration("AIRTABLE_BASE_ID is required".to_string()));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(SyncError::Configuration(format!(
                "AIRTABLE_BASE_URL is not a valid url: {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Preferred analytic plan (matched with `ilike`); first plan otherwise.
    pub analytic_plan_name: Option<String>,
    pub pricelist_name: String,
    /// Reject invoicing records already marked as invoiced.
    pub invoice_guard: bool,
    /// Only invoice masters whose status column holds the pre-invoiced value.
    pub require_preinvoiced: bool,
    pub auto_post_invoices: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            analytic_plan_name: None,
            pricelist_name: "Tarifas Flete".to_string(),
            invoice_guard: false,
            require_preinvoiced: false,
            auto_post_invoices: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tenants: PerTenant<TenantConfig>,
    pub record_store: RecordStoreConfig,
    pub schema: RecordSchema,
    pub options: SyncOptions,
    pub http_timeout: Duration,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = RecordTables::default();
        let tables = RecordTables {
            masters: env::var("AIRTABLE_TABLE_MASTERS").unwrap_or(defaults.masters),
            operations: env::var("AIRTABLE_TABLE_OPERATIONS").unwrap_or(defaults.operations),
            companies: env::var("AIRTABLE_TABLE_COMPANIES").unwrap_or(defaults.companies),
            rate_cards: env::var("AIRTABLE_TABLE_RATE_CARDS").unwrap_or(defaults.rate_cards),
            request_cards: env::var("AIRTABLE_TABLE_REQUEST_CARDS").unwrap_or(defaults.request_cards),
        };

        let option_defaults = SyncOptions::default();

        Ok(Self {
            tenants: PerTenant::new(
                TenantConfig::from_env(TenantCode::Ar)?,
                TenantConfig::from_env(TenantCode::Cl)?,
            ),
            record_store: RecordStoreConfig {
                api_key: env::var("AIRTABLE_API_KEY").unwrap_or_default(),
                base_id: env::var("AIRTABLE_BASE_ID").unwrap_or_default(),
                base_url: env::var("AIRTABLE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.airtable.com/v0".to_string()),
                tables,
            },
            schema: RecordSchema::default(),
            options: SyncOptions {
                analytic_plan_name: non_empty(env::var("ANALYTIC_PLAN_NAME").ok()),
                pricelist_name: env::var("PRICELIST_NAME").unwrap_or(option_defaults.pricelist_name),
                invoice_guard: flag("INVOICE_GUARD"),
                require_preinvoiced: flag("INVOICE_REQUIRE_PREINVOICED"),
                auto_post_invoices: flag("AUTO_POST_INVOICES"),
            },
            http_timeout: Duration::from_secs(parse_or(env::var("HTTP_TIMEOUT_SECS").ok(), 30)?),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
        })
    }

    pub fn tenant(&self, tenant: TenantCode) -> &TenantConfig {
        self.tenants.get(tenant)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// `ODOO_{TENANT}_{KEY}` wins over the shared `ODOO_{KEY}`.
fn tenant_var(tenant: TenantCode, key: &str) -> Option<String> {
    non_empty(env::var(format!("ODOO_{}_{}", tenant.as_str(), key)).ok())
        .or_else(|| non_empty(env::var(format!("ODOO_{}", key)).ok()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn flag(key: &str) -> bool {
    matches!(
        env::var(key).map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn parse_or<T>(value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => Ok(raw.trim().parse()?),
        None => Ok(default),
    }
}
