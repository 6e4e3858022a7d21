// Analytic Hierarchy Builder
// One cost center per shipment (`MASTER-{id}`) and per leg (`OP-{id}`), keyed
// by name. Creation failures degrade to `CostCenterLink::Unavailable` so the
// surrounding orchestration can still finish.

use serde_json::{json, Map, Value};

use crate::models::sync_result::{CostCenterLink, EntityRef, SyncAction};
use crate::services::erp::odoo_client::{row_id, OdooClient};
use crate::services::erp::upsert::{find_one, SearchKey};
use crate::services::error::Result;

const ACCOUNT_MODEL: &str = "account.analytic.account";
const PLAN_MODEL: &str = "account.analytic.plan";

pub const SHIPMENT_PREFIX: &str = "MASTER-";
pub const LEG_PREFIX: &str = "OP-";

/// `prefix` + `id`, unless `id` already starts with `prefix` (any case).
pub fn cost_center_name(prefix: &str, id: &str) -> String {
    let id = id.trim();
    let already_prefixed = id
        .get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
    if already_prefixed {
        id.to_string()
    } else {
        format!("{}{}", prefix, id)
    }
}

pub fn leg_code(leg_id: &str, parent_shipment_id: Option<&str>) -> String {
    match parent_shipment_id.map(str::trim).filter(|p| !p.is_empty()) {
        Some(parent) => format!("{}/{}", parent, leg_id.trim()),
        None => leg_id.trim().to_string(),
    }
}

pub struct AnalyticBuilder<'a> {
    client: &'a OdooClient,
    plan_name: Option<&'a str>,
}

impl<'a> AnalyticBuilder<'a> {
    pub fn new(client: &'a OdooClient, plan_name: Option<&'a str>) -> Self {
        Self { client, plan_name }
    }

    pub async fn for_shipment(&self, shipment_id: &str, partner_id: Option<i64>) -> Result<CostCenterLink> {
        let name = cost_center_name(SHIPMENT_PREFIX, shipment_id);
        self.find_or_create(name, shipment_id.trim().to_string(), partner_id).await
    }

    pub async fn for_leg(
        &self,
        leg_id: &str,
        parent_shipment_id: Option<&str>,
        partner_id: Option<i64>,
    ) -> Result<CostCenterLink> {
        let name = cost_center_name(LEG_PREFIX, leg_id);
        self.find_or_create(name, leg_code(leg_id, parent_shipment_id), partner_id).await
    }

    async fn find_or_create(&self, name: String, code: String, partner_id: Option<i64>) -> Result<CostCenterLink> {
        let key = SearchKey::by("name", "=", &name);

        if let Some(id) = find_one(self.client, ACCOUNT_MODEL, &key, &["id", "name"])
            .await?
            .as_ref()
            .and_then(row_id)
        {
            return Ok(CostCenterLink::Linked(EntityRef {
                id,
                action: SyncAction::Existing,
                name,
            }));
        }

        let mut payload = Map::new();
        payload.insert("name".to_string(), json!(name));
        payload.insert("code".to_string(), json!(code));
        if let Some(partner_id) = partner_id {
            payload.insert("partner_id".to_string(), json!(partner_id));
        }
        if let Some(plan_id) = self.default_plan().await {
            payload.insert("plan_id".to_string(), json!(plan_id));
        }

        match self.client.create(ACCOUNT_MODEL, Value::Object(payload)).await {
            Ok(id) => {
                tracing::info!(tenant = %self.client.tenant(), id, name = %name, "Created cost center");
                Ok(CostCenterLink::Linked(EntityRef {
                    id,
                    action: SyncAction::Created,
                    name,
                }))
            }
            Err(err) => {
                tracing::warn!(
                    tenant = %self.client.tenant(),
                    name = %name,
                    error = %err,
                    "Cost center unavailable, continuing without it"
                );
                Ok(CostCenterLink::Unavailable {
                    name,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Configured plan by name, else the first plan. Older ERP versions have
    /// no plan model at all, so any failure here means "no plan".
    async fn default_plan(&self) -> Option<i64> {
        if let Some(plan_name) = self.plan_name {
            match self
                .client
                .search_one(PLAN_MODEL, json!([["name", "ilike", plan_name]]), &["id"])
                .await
            {
                Ok(Some(row)) => return row_id(&row),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "Analytic plan lookup failed");
                    return None;
                }
            }
        }

        match self.client.search_one(PLAN_MODEL, json!([]), &["id"]).await {
            Ok(row) => row.as_ref().and_then(row_id),
            Err(err) => {
                tracing::debug!(error = %err, "Analytic plan lookup failed");
                None
            }
        }
    }
}
