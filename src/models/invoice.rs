use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::tenant::TenantCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveType {
    Sale,
    Purchase,
}

impl MoveType {
    /// ERP `account.move.move_type` value.
    pub fn erp_value(&self) -> &'static str {
        match self {
            MoveType::Sale => "out_invoice",
            MoveType::Purchase => "in_invoice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub product_id: i64,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_center_id: Option<i64>,
    /// Record-store id of the leg this line bills.
    pub leg_record_id: String,
}

impl InvoiceLine {
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// A composed invoice, not yet sent to the ERP.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDraft {
    pub tenant: TenantCode,
    pub partner_id: i64,
    pub move_type: MoveType,
    pub reference: String,
    pub journal_id: Option<i64>,
    pub lines: Vec<InvoiceLine>,
}

impl InvoiceDraft {
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(InvoiceLine::subtotal).sum()
    }
}
