pub mod analytic_builder;
pub mod catalog_sync;
pub mod company_sync;
pub mod country_router;
pub mod erp;
pub mod error;
pub mod invoice_composer;
pub mod invoice_service;
pub mod orchestrator;
pub mod partner_resolver;
pub mod record_store;

pub use analytic_builder::AnalyticBuilder;
pub use catalog_sync::CatalogSync;
pub use company_sync::CompanySync;
pub use country_router::{resolve_tenant, RoutingHints};
pub use error::SyncError;
pub use invoice_service::InvoiceService;
pub use orchestrator::{LegOrchestrator, MasterOrchestrator, SyncContext};
pub use partner_resolver::PartnerResolver;
pub use record_store::AirtableClient;
