// Company Sync
// Pushes one record-store company into the ERP as a partner of the tenant its
// country routes to, then stores the partner id on the company record.

use chrono::Utc;
use serde_json::{json, Map};

use crate::config::RecordSchema;
use crate::models::shipment::{country_code_hint, PartyInput, PartyRole};
use crate::models::sync_result::CompanySyncResult;
use crate::models::tenant::OperationKind;
use crate::services::country_router::{resolve_tenant, RoutingHints};
use crate::services::error::{Result, SyncError};
use crate::services::orchestrator::{observe, SyncContext};
use crate::services::partner_resolver::PartnerResolver;
use crate::utils::log_sanitizer::sanitize_for_log;

pub struct CompanySync {
    ctx: SyncContext,
}

impl CompanySync {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn sync(&self, record_id: &str) -> Result<CompanySyncResult> {
        tracing::info!(record_id = %sanitize_for_log(record_id), "Syncing company");
        observe("company_sync", self.run(record_id).await, |r| r.tenant)
    }

    async fn run(&self, record_id: &str) -> Result<CompanySyncResult> {
        let table = &self.ctx.config.record_store.tables.companies;
        let fields = &self.ctx.config.schema.company;
        let record = self.ctx.load(table, record_id).await?;

        let name = record
            .text(fields.name)
            .ok_or_else(|| SyncError::Validation(format!("company {} has no name", record.id)))?;
        let country = record.text(fields.country);
        let kind = record.text(fields.kind);

        let hints = RoutingHints {
            customer_country: country.clone(),
            ..RoutingHints::default()
        };
        let tenant = resolve_tenant(None, &hints, OperationKind::Sale);

        let mut party = PartyInput::new(name, PartyRole::from_kind(kind.as_deref()))
            .with_tax_id(record.text(fields.tax_id));
        party.email = record.text(fields.email);
        party.phone = record.text(fields.phone);
        party.country_code = country.as_deref().and_then(country_code_hint);

        let client = self.ctx.connections.session(tenant).await?;
        let partner = PartnerResolver::new(&client).find_or_create(&party).await?;

        let mut update = Map::new();
        update.insert(
            RecordSchema::per_tenant(fields.partner_id_prefix, tenant),
            json!(partner.id.to_string()),
        );
        let write_back = self.ctx.write_back(table, &record.id, update).await;

        Ok(CompanySyncResult {
            record_id: record.id,
            tenant,
            party: partner,
            write_back,
            completed_at: Utc::now(),
        })
    }
}
