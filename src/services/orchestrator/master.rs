// Master shipment flows: process (partner + cost center) and customer invoice.

use chrono::Utc;
use serde_json::{json, Map};

use crate::config::RecordSchema;
use crate::models::shipment::{country_code_hint, Leg, MasterShipment, PartyInput, PartyRole};
use crate::models::sync_result::{
    CostCenterLink, EntityRef, InvoiceShipmentResult, ProcessShipmentResult,
};
use crate::models::tenant::{OperationKind, TenantCode};
use crate::services::analytic_builder::AnalyticBuilder;
use crate::services::country_router::{resolve_tenant, RoutingHints};
use crate::services::erp::odoo_client::OdooClient;
use crate::services::error::{Result, SyncError};
use crate::services::invoice_composer::{compose_customer_invoice, InvoiceContext};
use crate::services::invoice_service::InvoiceService;
use crate::services::orchestrator::{observe, warn_on_invalid_override, SyncContext};
use crate::services::partner_resolver::PartnerResolver;
use crate::utils::log_sanitizer::sanitize_for_log;

pub struct MasterOrchestrator {
    ctx: SyncContext,
}

impl MasterOrchestrator {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, record_id: &str) -> Result<ProcessShipmentResult> {
        tracing::info!(record_id = %sanitize_for_log(record_id), "Processing master");
        observe("master_process", self.run_process(record_id).await, |r| r.tenant)
    }

    pub async fn invoice(&self, record_id: &str) -> Result<InvoiceShipmentResult> {
        tracing::info!(record_id = %sanitize_for_log(record_id), "Invoicing master");
        observe("master_invoice", self.run_invoice(record_id).await, |r| r.tenant)
    }

    async fn load_master(&self, record_id: &str) -> Result<MasterShipment> {
        let record = self
            .ctx
            .load(&self.ctx.config.record_store.tables.masters, record_id)
            .await?;
        Ok(MasterShipment::from_record(&record, &self.ctx.config.schema.master))
    }

    fn sale_tenant(&self, master: &MasterShipment) -> TenantCode {
        let fields = &self.ctx.config.schema.master;
        warn_on_invalid_override(fields.sale_tenant, master.sale_tenant.as_deref());
        resolve_tenant(
            master.sale_tenant.as_deref(),
            &RoutingHints::for_shipment(master),
            OperationKind::Sale,
        )
    }

    /// Customer partner and `MASTER-` cost center; both idempotent.
    async fn resolve_entities(
        &self,
        client: &OdooClient,
        master: &MasterShipment,
    ) -> Result<(EntityRef, CostCenterLink)> {
        let customer = match master.customer_name.clone() {
            Some(name) => name,
            None => self.customer_from_request_cards(master).await.ok_or_else(|| {
                SyncError::Validation(format!("master {} has no customer name", master.name))
            })?,
        };

        let mut party = PartyInput::new(customer, PartyRole::Customer)
            .with_tax_id(master.customer_tax_id.clone());
        party.country_code = master.customer_country.as_deref().and_then(country_code_hint);

        let partner = PartnerResolver::new(client).find_or_create(&party).await?;

        let plan_name = self.ctx.config.options.analytic_plan_name.as_deref();
        let cost_center = AnalyticBuilder::new(client, plan_name)
            .for_shipment(&master.name, Some(partner.id))
            .await?;

        Ok((partner, cost_center))
    }

    /// Customer of the first linked leg whose request card names one. Legs or
    /// cards that cannot be read are passed over.
    async fn customer_from_request_cards(&self, master: &MasterShipment) -> Option<String> {
        let tables = &self.ctx.config.record_store.tables;
        let schema = &self.ctx.config.schema;

        for leg_id in &master.leg_ids {
            let leg = match self.ctx.load(&tables.operations, leg_id).await {
                Ok(record) => Leg::from_record(&record, &schema.leg),
                Err(err) => {
                    tracing::debug!(leg_id = %sanitize_for_log(leg_id), error = %err, "Leg unreadable");
                    continue;
                }
            };
            let Some(card_id) = leg.request_card_ids.first() else {
                continue;
            };
            match self.ctx.load(&tables.request_cards, card_id).await {
                Ok(card) => {
                    if let Some(customer) = card.text(schema.request_card.customer_name) {
                        tracing::info!(
                            master = %sanitize_for_log(&master.name),
                            card_id = %sanitize_for_log(card_id),
                            "Customer taken from request card"
                        );
                        return Some(customer);
                    }
                }
                Err(err) => {
                    tracing::debug!(card_id = %sanitize_for_log(card_id), error = %err, "Request card unreadable");
                }
            }
        }
        None
    }

    async fn run_process(&self, record_id: &str) -> Result<ProcessShipmentResult> {
        let master = self.load_master(record_id).await?;
        let tenant = self.sale_tenant(&master);
        let client = self.ctx.connections.session(tenant).await?;

        let (partner, cost_center) = self.resolve_entities(&client, &master).await?;

        let fields = &self.ctx.config.schema.master;
        let mut update = Map::new();
        update.insert(fields.sale_tenant.to_string(), json!(tenant.as_str()));
        update.insert(
            RecordSchema::per_tenant(fields.partner_id_prefix, tenant),
            json!(partner.id.to_string()),
        );
        if let Some(id) = cost_center.id() {
            update.insert(
                RecordSchema::per_tenant(fields.cost_center_id_prefix, tenant),
                json!(id.to_string()),
            );
        }

        let write_back = self
            .ctx
            .write_back(&self.ctx.config.record_store.tables.masters, &master.record_id, update)
            .await;

        tracing::info!(
            master = %sanitize_for_log(&master.name),
            tenant = %tenant,
            partner_id = partner.id,
            cost_center_id = ?cost_center.id(),
            "Master processed"
        );

        Ok(ProcessShipmentResult {
            record_id: master.record_id,
            shipment_name: master.name,
            tenant,
            party: partner,
            cost_center,
            write_back,
            completed_at: Utc::now(),
        })
    }

    async fn run_invoice(&self, record_id: &str) -> Result<InvoiceShipmentResult> {
        let master = self.load_master(record_id).await?;
        let schema = &self.ctx.config.schema;

        if self.ctx.config.options.invoice_guard
            && master.billing_state.as_deref() == Some(schema.invoiced_state)
        {
            return Err(SyncError::Validation(format!(
                "master {} is already invoiced",
                master.name
            )));
        }

        if self.ctx.config.options.require_preinvoiced
            && master.status.as_deref() != Some(schema.preinvoiced_state)
        {
            return Err(SyncError::Validation(format!(
                "master {} must be in state {} to invoice, found {}",
                master.name,
                schema.preinvoiced_state,
                master.status.as_deref().unwrap_or("none")
            )));
        }
        if master.leg_ids.is_empty() {
            return Err(SyncError::Validation(format!(
                "master {} has no linked legs",
                master.name
            )));
        }

        let tenant = self.sale_tenant(&master);
        let client = self.ctx.connections.session(tenant).await?;
        let (partner, cost_center) = self.resolve_entities(&client, &master).await?;

        let (legs, skipped_legs) = self.load_legs(&master).await?;

        let tenant_config = self.ctx.connections.config(tenant);
        let invoice_ctx = InvoiceContext {
            tenant,
            partner_id: partner.id,
            product_id: tenant_config.products.transport,
            cost_center_id: cost_center.id(),
            journal_id: tenant_config.sales_journal,
            reference: format!("Master {}", master.name),
        };
        let draft = compose_customer_invoice(&invoice_ctx, &legs)?;

        let invoice = InvoiceService::new(&client)
            .issue(&draft, self.ctx.config.options.auto_post_invoices)
            .await?;

        let fields = &schema.master;
        let mut update = Map::new();
        update.insert(fields.billing_state.to_string(), json!(schema.invoiced_state));
        update.insert(fields.invoice_number.to_string(), json!(invoice.name));
        update.insert(
            RecordSchema::per_tenant(fields.invoice_id_prefix, tenant),
            json!(invoice.id.to_string()),
        );

        let write_back = self
            .ctx
            .write_back(&self.ctx.config.record_store.tables.masters, &master.record_id, update)
            .await;

        tracing::info!(
            master = %sanitize_for_log(&master.name),
            tenant = %tenant,
            invoice_id = invoice.id,
            lines = draft.lines.len(),
            skipped = skipped_legs.len(),
            "Master invoiced"
        );

        Ok(InvoiceShipmentResult {
            record_id: master.record_id,
            shipment_name: master.name,
            tenant,
            party: partner,
            cost_center,
            total: draft.total(),
            lines_count: draft.lines.len(),
            invoice,
            skipped_legs,
            write_back,
            completed_at: Utc::now(),
        })
    }

    /// Linked legs in link order. A link to a deleted leg is skipped; any
    /// other failure aborts the invoice.
    async fn load_legs(&self, master: &MasterShipment) -> Result<(Vec<Leg>, Vec<String>)> {
        let table = &self.ctx.config.record_store.tables.operations;
        let mut legs = Vec::with_capacity(master.leg_ids.len());
        let mut skipped = Vec::new();

        for leg_id in &master.leg_ids {
            match self.ctx.load(table, leg_id).await {
                Ok(record) => legs.push(Leg::from_record(&record, &self.ctx.config.schema.leg)),
                Err(SyncError::NotFound(_)) => {
                    tracing::warn!(
                        master = %sanitize_for_log(&master.name),
                        leg_id = %sanitize_for_log(leg_id),
                        "Linked leg not found, skipping"
                    );
                    skipped.push(leg_id.clone());
                }
                Err(err) => return Err(err),
            }
        }

        Ok((legs, skipped))
    }
}
