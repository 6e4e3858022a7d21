// Invoice Composer
// Builds invoice drafts from legs. No I/O: the drafts are sent to the ERP by
// `InvoiceService`.

use rust_decimal::prelude::*;
use serde_json::Value;
use std::str::FromStr;

use crate::models::invoice::{InvoiceDraft, InvoiceLine, MoveType};
use crate::models::shipment::Leg;
use crate::models::tenant::TenantCode;
use crate::services::error::{Result, SyncError};

pub const CUSTOMER_LINE_KIND: &str = "Transporte";
pub const CARRIER_LINE_KIND: &str = "Flete";

/// Invoice header values shared by every line.
#[derive(Debug, Clone)]
pub struct InvoiceContext {
    pub tenant: TenantCode,
    pub partner_id: i64,
    pub product_id: i64,
    pub cost_center_id: Option<i64>,
    pub journal_id: Option<i64>,
    pub reference: String,
}

/// Coerce a loosely typed rate to a decimal. Anything unreadable is zero.
pub fn normalize_rate(value: &Value) -> Decimal {
    match value {
        Value::Null => Decimal::ZERO,
        Value::Array(items) => items.first().map(normalize_rate).unwrap_or(Decimal::ZERO),
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .unwrap_or(Decimal::ZERO)
        }
        Value::String(s) => Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO),
        Value::Bool(_) | Value::Object(_) => Decimal::ZERO,
    }
}

pub fn describe_line(kind: &str, leg_id: &str, origin: Option<&str>, destination: Option<&str>) -> String {
    let mut description = format!("{} {}", kind, leg_id);
    if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
        description.push_str(" – ");
        description.push_str(origin.trim());
    }
    if let Some(destination) = destination.filter(|d| !d.trim().is_empty()) {
        description.push_str(" → ");
        description.push_str(destination.trim());
    }
    description
}

fn line_for(leg: &Leg, kind: &str, rate: Decimal, ctx: &InvoiceContext) -> Option<InvoiceLine> {
    (rate > Decimal::ZERO).then(|| InvoiceLine {
        product_id: ctx.product_id,
        description: describe_line(kind, &leg.name, leg.origin.as_deref(), leg.destination.as_deref()),
        quantity: Decimal::ONE,
        unit_price: rate,
        cost_center_id: ctx.cost_center_id,
        leg_record_id: leg.record_id.clone(),
    })
}

/// Customer invoice with one line per leg whose sell rate is positive.
pub fn compose_customer_invoice(ctx: &InvoiceContext, legs: &[Leg]) -> Result<InvoiceDraft> {
    let lines: Vec<InvoiceLine> = legs
        .iter()
        .filter_map(|leg| line_for(leg, CUSTOMER_LINE_KIND, normalize_rate(&leg.sell_rate), ctx))
        .collect();

    if lines.is_empty() {
        return Err(SyncError::Validation(format!(
            "{}: no leg has a positive sell rate",
            ctx.reference
        )));
    }

    Ok(draft(ctx, MoveType::Sale, lines))
}

/// Carrier (vendor) invoice for a single leg, from its buy rate.
pub fn compose_carrier_invoice(ctx: &InvoiceContext, leg: &Leg) -> Result<InvoiceDraft> {
    let rate = normalize_rate(&leg.buy_rate);
    let line = line_for(leg, CARRIER_LINE_KIND, rate, ctx).ok_or_else(|| {
        SyncError::Validation(format!("{}: buy rate must be positive, got {}", leg.name, rate))
    })?;

    Ok(draft(ctx, MoveType::Purchase, vec![line]))
}

fn draft(ctx: &InvoiceContext, move_type: MoveType, lines: Vec<InvoiceLine>) -> InvoiceDraft {
    InvoiceDraft {
        tenant: ctx.tenant,
        partner_id: ctx.partner_id,
        move_type,
        reference: ctx.reference.clone(),
        journal_id: ctx.journal_id,
        lines,
    }
}
