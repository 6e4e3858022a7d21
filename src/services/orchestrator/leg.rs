// Leg flows: process (carrier + cost center) and carrier (vendor) invoice.

use chrono::Utc;
use serde_json::{json, Map};

use crate::config::RecordSchema;
use crate::models::shipment::{country_code_hint, Leg, MasterShipment, PartyInput, PartyRole};
use crate::models::sync_result::{EntityRef, InvoiceLegResult, ProcessLegResult};
use crate::models::tenant::{OperationKind, TenantCode};
use crate::services::analytic_builder::AnalyticBuilder;
use crate::services::country_router::{resolve_tenant, RoutingHints};
use crate::services::erp::odoo_client::OdooClient;
use crate::services::error::{Result, SyncError};
use crate::services::invoice_composer::{compose_carrier_invoice, InvoiceContext};
use crate::services::invoice_service::InvoiceService;
use crate::services::orchestrator::{observe, warn_on_invalid_override, SyncContext};
use crate::services::partner_resolver::PartnerResolver;
use crate::utils::log_sanitizer::sanitize_for_log;

pub struct LegOrchestrator {
    ctx: SyncContext,
}

impl LegOrchestrator {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, record_id: &str) -> Result<ProcessLegResult> {
        tracing::info!(record_id = %sanitize_for_log(record_id), "Processing leg");
        observe("leg_process", self.run_process(record_id).await, |r| r.tenant)
    }

    pub async fn invoice_carrier(&self, record_id: &str) -> Result<InvoiceLegResult> {
        tracing::info!(record_id = %sanitize_for_log(record_id), "Invoicing carrier");
        observe("leg_invoice", self.run_invoice(record_id).await, |r| r.tenant)
    }

    async fn load_leg(&self, record_id: &str) -> Result<Leg> {
        let record = self
            .ctx
            .load(&self.ctx.config.record_store.tables.operations, record_id)
            .await?;
        Ok(Leg::from_record(&record, &self.ctx.config.schema.leg))
    }

    /// Name of the parent shipment, when the leg links one and it loads.
    async fn parent_name(&self, leg: &Leg) -> Option<String> {
        let parent_id = leg.parent_ids.first()?;
        match self
            .ctx
            .load(&self.ctx.config.record_store.tables.masters, parent_id)
            .await
        {
            Ok(record) => Some(MasterShipment::from_record(&record, &self.ctx.config.schema.master).name),
            Err(err) => {
                tracing::warn!(
                    leg = %sanitize_for_log(&leg.name),
                    parent_id = %sanitize_for_log(parent_id),
                    error = %err,
                    "Parent shipment lookup failed, continuing without it"
                );
                None
            }
        }
    }

    fn cost_tenant(&self, leg: &Leg) -> TenantCode {
        let fields = &self.ctx.config.schema.leg;
        warn_on_invalid_override(fields.cost_tenant, leg.cost_tenant.as_deref());
        resolve_tenant(leg.cost_tenant.as_deref(), &RoutingHints::for_leg(leg), OperationKind::Cost)
    }

    async fn resolve_carrier(&self, client: &OdooClient, leg: &Leg, name: String) -> Result<EntityRef> {
        let mut party = PartyInput::new(name, PartyRole::Carrier).with_tax_id(leg.carrier_tax_id.clone());
        party.country_code = leg.carrier_country.as_deref().and_then(country_code_hint);
        PartnerResolver::new(client).find_or_create(&party).await
    }

    async fn run_process(&self, record_id: &str) -> Result<ProcessLegResult> {
        let leg = self.load_leg(record_id).await?;
        let parent = self.parent_name(&leg).await;
        let tenant = self.cost_tenant(&leg);
        let client = self.ctx.connections.session(tenant).await?;

        let carrier = match leg.carrier_name.clone() {
            Some(name) => Some(self.resolve_carrier(&client, &leg, name).await?),
            None => None,
        };

        let plan_name = self.ctx.config.options.analytic_plan_name.as_deref();
        let cost_center = AnalyticBuilder::new(&client, plan_name)
            .for_leg(&leg.name, parent.as_deref(), carrier.as_ref().map(|c| c.id))
            .await?;

        let fields = &self.ctx.config.schema.leg;
        let mut update = Map::new();
        update.insert(fields.cost_tenant.to_string(), json!(tenant.as_str()));
        if let Some(id) = cost_center.id() {
            update.insert(
                RecordSchema::per_tenant(fields.cost_center_id_prefix, tenant),
                json!(id.to_string()),
            );
        }

        let write_back = self
            .ctx
            .write_back(&self.ctx.config.record_store.tables.operations, &leg.record_id, update)
            .await;

        tracing::info!(
            leg = %sanitize_for_log(&leg.name),
            tenant = %tenant,
            carrier_id = ?carrier.as_ref().map(|c| c.id),
            cost_center_id = ?cost_center.id(),
            "Leg processed"
        );

        Ok(ProcessLegResult {
            record_id: leg.record_id,
            leg_name: leg.name,
            parent_shipment: parent,
            tenant,
            party: carrier,
            cost_center,
            write_back,
            completed_at: Utc::now(),
        })
    }

    async fn run_invoice(&self, record_id: &str) -> Result<InvoiceLegResult> {
        let leg = self.load_leg(record_id).await?;
        let schema = &self.ctx.config.schema;

        if self.ctx.config.options.invoice_guard
            && leg.billing_state.as_deref() == Some(schema.invoiced_state)
        {
            return Err(SyncError::Validation(format!("leg {} is already invoiced", leg.name)));
        }

        let carrier_name = leg
            .carrier_name
            .clone()
            .ok_or_else(|| SyncError::Validation(format!("leg {} has no carrier", leg.name)))?;

        let tenant = self.cost_tenant(&leg);
        let client = self.ctx.connections.session(tenant).await?;
        let carrier = self.resolve_carrier(&client, &leg, carrier_name).await?;

        let parent = self.parent_name(&leg).await;
        let plan_name = self.ctx.config.options.analytic_plan_name.as_deref();
        let cost_center = AnalyticBuilder::new(&client, plan_name)
            .for_leg(&leg.name, parent.as_deref(), Some(carrier.id))
            .await?;

        let tenant_config = self.ctx.connections.config(tenant);
        let invoice_ctx = InvoiceContext {
            tenant,
            partner_id: carrier.id,
            product_id: tenant_config.products.freight,
            cost_center_id: cost_center.id(),
            journal_id: tenant_config.purchase_journal,
            reference: format!("Operación {}", leg.name),
        };
        let draft = compose_carrier_invoice(&invoice_ctx, &leg)?;

        let invoice = InvoiceService::new(&client)
            .issue(&draft, self.ctx.config.options.auto_post_invoices)
            .await?;

        let fields = &schema.leg;
        let mut update = Map::new();
        update.insert(fields.billing_state.to_string(), json!(schema.invoiced_state));
        update.insert(fields.purchase_invoice_id.to_string(), json!(invoice.id.to_string()));

        let write_back = self
            .ctx
            .write_back(&self.ctx.config.record_store.tables.operations, &leg.record_id, update)
            .await;

        tracing::info!(
            leg = %sanitize_for_log(&leg.name),
            tenant = %tenant,
            invoice_id = invoice.id,
            "Carrier invoiced"
        );

        Ok(InvoiceLegResult {
            record_id: leg.record_id,
            leg_name: leg.name,
            tenant,
            party: carrier,
            cost_center,
            total: draft.total(),
            invoice,
            write_back,
            completed_at: Utc::now(),
        })
    }
}
