// Catalog Sync
// Keeps per-tenant ERP reference data in place: the service products used on
// invoice lines and the freight rate cards kept in a fixed-price pricelist.

use rust_decimal::prelude::*;
use serde_json::{json, Map, Value};

use crate::config::record_schema::RateCardFields;
use crate::models::record::Record;
use crate::models::sync_result::BatchSyncResult;
use crate::models::tenant::TenantCode;
use crate::services::erp::odoo_client::{row_id, OdooClient};
use crate::services::erp::upsert::{upsert, SearchKey};
use crate::services::error::{Result, SyncError};
use crate::services::invoice_composer::normalize_rate;
use crate::services::orchestrator::{observe, SyncContext};

const PRODUCT_MODEL: &str = "product.template";
const PRICELIST_MODEL: &str = "product.pricelist";
const PRICELIST_ITEM_MODEL: &str = "product.pricelist.item";

/// Service products every tenant needs for invoicing.
pub const SERVICE_PRODUCTS: [&str; 3] = ["Transporte", "Flete", "Estadía"];

/// Optional references attached to service products when the tenant has them.
#[derive(Debug, Clone, Default, PartialEq)]
struct ProductDefaults {
    category_id: Option<i64>,
    uom_id: Option<i64>,
    sale_tax_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateCard {
    pub record_id: String,
    pub origin: String,
    pub destination: String,
    pub price: Decimal,
}

impl RateCard {
    pub fn from_record(record: &Record, fields: &RateCardFields) -> Self {
        let price = fields
            .price
            .iter()
            .find_map(|key| record.raw(key))
            .map(normalize_rate)
            .unwrap_or(Decimal::ZERO);
        Self {
            record_id: record.id.clone(),
            origin: record.text(fields.origin).unwrap_or_else(|| "Unknown".to_string()),
            destination: record.text(fields.destination).unwrap_or_else(|| "Unknown".to_string()),
            price,
        }
    }

    /// Pricelist item name; one item per route.
    pub fn key(&self) -> String {
        format!("{} - {}", self.origin, self.destination)
    }
}

pub struct CatalogSync {
    ctx: SyncContext,
}

impl CatalogSync {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync_products(&self, tenant: TenantCode) -> Result<BatchSyncResult> {
        tracing::info!(tenant = %tenant, "Syncing service products");
        observe("product_sync", self.run_products(tenant).await, |r| r.tenant)
    }

    pub async fn sync_rate_cards(&self, tenant: TenantCode) -> Result<BatchSyncResult> {
        tracing::info!(tenant = %tenant, "Syncing rate cards");
        observe("rate_card_sync", self.run_rate_cards(tenant).await, |r| r.tenant)
    }

    // ========================================================================
    // Service products
    // ========================================================================

    async fn run_products(&self, tenant: TenantCode) -> Result<BatchSyncResult> {
        let client = self.ctx.connections.session(tenant).await?;
        let defaults = product_defaults(&client).await?;
        let mut result = BatchSyncResult::new(tenant);

        for name in SERVICE_PRODUCTS {
            let (create, update) = product_payloads(name, &defaults);
            match upsert(&client, PRODUCT_MODEL, &SearchKey::by("name", "=", name), create, Some(update)).await {
                Ok(outcome) => result.record_ok(name, &outcome.into_entity(name)),
                Err(err) => {
                    tracing::warn!(tenant = %tenant, product = name, error = %err, "Product sync failed");
                    result.record_error(name, err);
                }
            }
        }

        Ok(result)
    }

    // ========================================================================
    // Rate cards
    // ========================================================================

    async fn run_rate_cards(&self, tenant: TenantCode) -> Result<BatchSyncResult> {
        let client = self.ctx.connections.session(tenant).await?;
        let currency = self.ctx.connections.config(tenant).currency.clone();
        let pricelist_id = ensure_pricelist(&client, &self.ctx.config.options.pricelist_name, &currency).await?;

        let records = self
            .ctx
            .record_store
            .search_records(&self.ctx.config.record_store.tables.rate_cards, None)
            .await?;

        let mut result = BatchSyncResult::new(tenant);
        for record in &records {
            let card = RateCard::from_record(record, &self.ctx.config.schema.rate_card);
            let key = card.key();

            if card.price <= Decimal::ZERO {
                result.record_error(
                    key,
                    SyncError::Validation(format!("rate card {} has no positive price", card.record_id)),
                );
                continue;
            }

            let (create, update) = rate_card_payloads(&card, pricelist_id);
            // Item names repeat across pricelists; only this pricelist's item is ours.
            let search = SearchKey::by("name", "=", &key).and("pricelist_id", "=", pricelist_id);
            match upsert(&client, PRICELIST_ITEM_MODEL, &search, create, Some(update)).await {
                Ok(outcome) => {
                    let entity = outcome.into_entity(key.clone());
                    result.record_ok(key, &entity);
                }
                Err(err) => {
                    tracing::warn!(tenant = %tenant, rate_card = %key, error = %err, "Rate card sync failed");
                    result.record_error(key, err);
                }
            }
        }

        tracing::info!(
            tenant = %tenant,
            pricelist_id,
            created = result.summary.created,
            updated = result.summary.updated,
            errors = result.summary.errors,
            "Rate cards synced"
        );

        Ok(result)
    }
}

async fn first_id(client: &OdooClient, model: &str, domain: Value) -> Result<Option<i64>> {
    Ok(client.search_one(model, domain, &["id"]).await?.as_ref().and_then(row_id))
}

async fn product_defaults(client: &OdooClient) -> Result<ProductDefaults> {
    let category_id = first_id(client, "product.category", json!([["name", "ilike", "Servi"]])).await?;
    let uom_id = first_id(client, "uom.uom", json!([["name", "ilike", "Unit"]])).await?;
    let sale_tax_id = match first_id(
        client,
        "account.tax",
        json!([["type_tax_use", "=", "sale"], ["amount", "=", 21.0]]),
    )
    .await?
    {
        Some(id) => Some(id),
        None => first_id(client, "account.tax", json!([["type_tax_use", "=", "sale"]])).await?,
    };

    Ok(ProductDefaults {
        category_id,
        uom_id,
        sale_tax_id,
    })
}

fn product_payloads(name: &str, defaults: &ProductDefaults) -> (Value, Map<String, Value>) {
    let mut create = Map::new();
    create.insert("name".to_string(), json!(name));
    create.insert("type".to_string(), json!("service"));
    create.insert("sale_ok".to_string(), json!(true));
    create.insert("purchase_ok".to_string(), json!(true));
    create.insert("list_price".to_string(), json!(0.0));

    let mut update = Map::new();
    if let Some(category_id) = defaults.category_id {
        create.insert("categ_id".to_string(), json!(category_id));
        update.insert("categ_id".to_string(), json!(category_id));
    }
    if let Some(uom_id) = defaults.uom_id {
        create.insert("uom_id".to_string(), json!(uom_id));
        create.insert("uom_po_id".to_string(), json!(uom_id));
    }
    if let Some(tax_id) = defaults.sale_tax_id {
        // (6, 0, ids) replaces the whole tax set.
        create.insert("taxes_id".to_string(), json!([[6, 0, [tax_id]]]));
        update.insert("taxes_id".to_string(), json!([[6, 0, [tax_id]]]));
    }

    (Value::Object(create), update)
}

/// Configured pricelist by name, created in the tenant currency when missing;
/// if creation is refused, any active pricelist.
async fn ensure_pricelist(client: &OdooClient, name: &str, currency: &str) -> Result<i64> {
    if let Some(id) = first_id(client, PRICELIST_MODEL, json!([["name", "=", name]])).await? {
        return Ok(id);
    }

    let mut payload = Map::new();
    payload.insert("name".to_string(), json!(name));
    payload.insert("active".to_string(), json!(true));
    if let Some(currency_id) = first_id(client, "res.currency", json!([["name", "=", currency]])).await? {
        payload.insert("currency_id".to_string(), json!(currency_id));
    }

    match client.create(PRICELIST_MODEL, Value::Object(payload)).await {
        Ok(id) => {
            tracing::info!(tenant = %client.tenant(), pricelist_id = id, name, "Created pricelist");
            Ok(id)
        }
        Err(err) => {
            tracing::warn!(tenant = %client.tenant(), error = %err, "Pricelist creation refused, using any active one");
            first_id(client, PRICELIST_MODEL, json!([["active", "=", true]]))
                .await?
                .ok_or_else(|| SyncError::NotFound(format!("no pricelist available in tenant {}", client.tenant())))
        }
    }
}

fn rate_card_payloads(card: &RateCard, pricelist_id: i64) -> (Value, Map<String, Value>) {
    let key = card.key();
    let price = card.price.to_f64().unwrap_or(0.0);

    let create = json!({
        "name": key,
        "pricelist_id": pricelist_id,
        "applied_on": "3_global",
        "compute_price": "fixed",
        "fixed_price": price,
        "min_quantity": 1,
    });

    let mut update = Map::new();
    update.insert("name".to_string(), json!(key));
    update.insert("fixed_price".to_string(), json!(price));

    (create, update)
}
