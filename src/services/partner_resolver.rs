// Partner Resolver
// Finds or creates the ERP partner for a customer or carrier. Lookup order is
// tax id (exact), name (exact), name (ilike).

use serde_json::{json, Map, Value};

use crate::models::shipment::{PartyInput, PartyRole};
use crate::models::sync_result::EntityRef;
use crate::services::erp::odoo_client::{row_id, OdooClient};
use crate::services::erp::upsert::{upsert, SearchKey};
use crate::services::error::{Result, SyncError};

const PARTNER_MODEL: &str = "res.partner";
const COUNTRY_MODEL: &str = "res.country";

pub struct PartnerResolver<'a> {
    client: &'a OdooClient,
}

impl<'a> PartnerResolver<'a> {
    pub fn new(client: &'a OdooClient) -> Self {
        Self { client }
    }

    pub async fn find_or_create(&self, party: &PartyInput) -> Result<EntityRef> {
        let name = party.name.trim();
        if name.is_empty() {
            return Err(SyncError::Validation("partner name is required".to_string()));
        }

        let key = search_key(party);
        let create = self.create_payload(party).await?;
        let outcome = upsert(self.client, PARTNER_MODEL, &key, create, Some(update_payload(party))).await?;

        tracing::info!(
            tenant = %self.client.tenant(),
            partner_id = outcome.id,
            action = outcome.action.as_str(),
            role = ?party.role,
            "Resolved partner"
        );

        Ok(outcome.into_entity(name))
    }

    async fn create_payload(&self, party: &PartyInput) -> Result<Value> {
        let mut payload = Map::new();
        payload.insert("name".to_string(), json!(party.name.trim()));
        payload.insert("is_company".to_string(), json!(true));
        let (customer_rank, supplier_rank) = match party.role {
            PartyRole::Customer => (1, 0),
            PartyRole::Carrier => (0, 1),
        };
        payload.insert("customer_rank".to_string(), json!(customer_rank));
        payload.insert("supplier_rank".to_string(), json!(supplier_rank));

        for (field, value) in optional_fields(party) {
            payload.insert(field.to_string(), json!(value));
        }

        if let Some(code) = present(&party.country_code) {
            if let Some(country_id) = self.country_id(code).await? {
                payload.insert("country_id".to_string(), json!(country_id));
            }
        }

        Ok(Value::Object(payload))
    }

    async fn country_id(&self, code: &str) -> Result<Option<i64>> {
        let row = self
            .client
            .search_one(COUNTRY_MODEL, json!([["code", "=", code.to_ascii_uppercase()]]), &["id"])
            .await?;
        Ok(row.as_ref().and_then(row_id))
    }
}

fn search_key(party: &PartyInput) -> SearchKey {
    let name = party.name.trim();
    let key = match present(&party.tax_id) {
        Some(tax_id) => SearchKey::by("vat", "=", tax_id),
        None => SearchKey::new(),
    };
    key.or("name", "=", name).or("name", "ilike", name)
}

/// Only the incoming fields that carry a value; an existing partner never
/// loses data because the record store left a column blank.
fn update_payload(party: &PartyInput) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("name".to_string(), json!(party.name.trim()));
    for (field, value) in optional_fields(party) {
        payload.insert(field.to_string(), json!(value));
    }
    payload
}

fn optional_fields(party: &PartyInput) -> Vec<(&'static str, &str)> {
    [
        ("vat", present(&party.tax_id)),
        ("email", present(&party.email)),
        ("phone", present(&party.phone)),
    ]
    .into_iter()
    .filter_map(|(field, value)| value.map(|v| (field, v)))
    .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
