// ERP Integration Module
// JSON-RPC client, per-tenant session cache and the idempotent upsert helper

pub mod odoo_client;
pub mod session_pool;
pub mod upsert;

pub use odoo_client::{ErpRow, OdooClient, OdooError};
pub use session_pool::{TenantConnectionManager, TenantStatus};
pub use upsert::{find_one, upsert, SearchKey, UpsertOutcome};
