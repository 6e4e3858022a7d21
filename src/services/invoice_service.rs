// Invoice Service
// Sends composed drafts to the ERP as `account.move` records and reads back
// the values the ERP assigns (number, state, total).

use rust_decimal::prelude::*;
use serde_json::{json, Map, Value};

use crate::models::invoice::{InvoiceDraft, InvoiceLine};
use crate::models::record::lookup_text;
use crate::models::sync_result::{InvoiceSummary, SyncAction};
use crate::services::erp::odoo_client::{ErpRow, OdooClient};
use crate::services::error::{Result, SyncError};
use crate::services::invoice_composer::normalize_rate;

const MOVE_MODEL: &str = "account.move";

pub struct InvoiceService<'a> {
    client: &'a OdooClient,
}

impl<'a> InvoiceService<'a> {
    pub fn new(client: &'a OdooClient) -> Self {
        Self { client }
    }

    /// Create the invoice and, when asked, post it. Once the ERP has assigned
    /// an id the invoice is always returned: a failed post is reported on the
    /// summary so the caller can still record the id.
    pub async fn issue(&self, draft: &InvoiceDraft, post: bool) -> Result<InvoiceSummary> {
        let mut invoice = self.create(draft).await?;
        if post {
            if let Err(err) = self.post(&mut invoice).await {
                tracing::warn!(
                    tenant = %draft.tenant,
                    invoice_id = invoice.id,
                    error = %err,
                    "Invoice created but not posted"
                );
                invoice.post_error = Some(err.to_string());
            }
        }
        Ok(invoice)
    }

    pub async fn create(&self, draft: &InvoiceDraft) -> Result<InvoiceSummary> {
        if draft.lines.is_empty() {
            return Err(SyncError::Validation(format!("{}: invoice has no lines", draft.reference)));
        }

        let id = self.client.create(MOVE_MODEL, move_payload(draft)).await?;

        let row = self
            .read_back(id, &["id", "name", "state", "amount_total"])
            .await;

        let summary = InvoiceSummary {
            id,
            action: SyncAction::Created,
            name: row
                .as_ref()
                .and_then(|r| r.get("name"))
                .and_then(lookup_text)
                .filter(|name| name != "/" && name != "false")
                .unwrap_or_else(|| "Draft".to_string()),
            state: row
                .as_ref()
                .and_then(|r| r.get("state"))
                .and_then(lookup_text)
                .unwrap_or_else(|| "draft".to_string()),
            amount_total: row
                .as_ref()
                .and_then(|r| r.get("amount_total"))
                .map(normalize_rate)
                .unwrap_or_else(|| draft.total()),
            posted: false,
            post_error: None,
        };

        tracing::info!(
            tenant = %draft.tenant,
            invoice_id = id,
            move_type = draft.move_type.erp_value(),
            lines = draft.lines.len(),
            total = %draft.total(),
            "Created invoice"
        );

        Ok(summary)
    }

    /// Confirm a draft invoice with `action_post`. The summary is only
    /// changed once the ERP accepted the post.
    pub async fn post(&self, summary: &mut InvoiceSummary) -> Result<()> {
        self.client.call_method(MOVE_MODEL, "action_post", &[summary.id]).await?;
        summary.posted = true;
        summary.state = "posted".to_string();

        // Posting assigns the definitive number; re-read it when available.
        if let Some(row) = self.read_back(summary.id, &["name", "state"]).await {
            if let Some(name) = row.get("name").and_then(lookup_text).filter(|n| n != "/") {
                summary.name = name;
            }
            if let Some(state) = row.get("state").and_then(lookup_text) {
                summary.state = state;
            }
        }

        tracing::info!(tenant = %self.client.tenant(), invoice_id = summary.id, "Posted invoice");
        Ok(())
    }

    /// Values the ERP assigned to an existing move. The move already exists,
    /// so a failed read falls back to what is known locally.
    async fn read_back(&self, id: i64, fields: &[&str]) -> Option<ErpRow> {
        match self.client.search_one(MOVE_MODEL, json!([["id", "=", id]]), fields).await {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(
                    tenant = %self.client.tenant(),
                    invoice_id = id,
                    error = %err,
                    "Invoice read-back failed"
                );
                None
            }
        }
    }
}

fn move_payload(draft: &InvoiceDraft) -> Value {
    let mut payload = Map::new();
    payload.insert("move_type".to_string(), json!(draft.move_type.erp_value()));
    payload.insert("partner_id".to_string(), json!(draft.partner_id));
    payload.insert("ref".to_string(), json!(draft.reference));
    if let Some(journal_id) = draft.journal_id {
        payload.insert("journal_id".to_string(), json!(journal_id));
    }
    let lines: Vec<Value> = draft.lines.iter().map(|line| json!([0, 0, line_payload(line)])).collect();
    payload.insert("invoice_line_ids".to_string(), Value::Array(lines));
    Value::Object(payload)
}

fn line_payload(line: &InvoiceLine) -> Value {
    let mut payload = json!({
        "product_id": line.product_id,
        "name": line.description,
        "quantity": line.quantity.to_f64().unwrap_or(1.0),
        "price_unit": line.unit_price.to_f64().unwrap_or(0.0),
    });
    if let Some(cost_center_id) = line.cost_center_id {
        payload["analytic_distribution"] = json!({ cost_center_id.to_string(): 100 });
    }
    payload
}
