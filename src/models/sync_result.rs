use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::tenant::TenantCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Existing,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Created => "created",
            SyncAction::Updated => "updated",
            SyncAction::Existing => "existing",
        }
    }
}

/// An ERP record touched by a sync step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRef {
    pub id: i64,
    pub action: SyncAction,
    pub name: String,
}

/// Cost-center outcome. `Unavailable` keeps "no cost center" distinct from
/// any real id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CostCenterLink {
    Linked(EntityRef),
    Unavailable { name: String, reason: String },
}

impl CostCenterLink {
    pub fn id(&self) -> Option<i64> {
        match self {
            CostCenterLink::Linked(entity) => Some(entity.id),
            CostCenterLink::Unavailable { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CostCenterLink::Linked(entity) => &entity.name,
            CostCenterLink::Unavailable { name, .. } => name,
        }
    }
}

/// Invoice as created in the ERP, with values read back after create.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub action: SyncAction,
    pub name: String,
    pub state: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_total: Decimal,
    pub posted: bool,
    /// Set when the invoice was created but the ERP refused to post it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_error: Option<String>,
}

/// Outcome of the best-effort write-back to the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteBackStatus {
    Written { fields: Vec<String> },
    Failed { reason: String },
}

impl WriteBackStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteBackStatus::Written { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessShipmentResult {
    pub record_id: String,
    pub shipment_name: String,
    pub tenant: TenantCode,
    pub party: EntityRef,
    pub cost_center: CostCenterLink,
    pub write_back: WriteBackStatus,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceShipmentResult {
    pub record_id: String,
    pub shipment_name: String,
    pub tenant: TenantCode,
    pub party: EntityRef,
    pub cost_center: CostCenterLink,
    pub invoice: InvoiceSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub lines_count: usize,
    pub skipped_legs: Vec<String>,
    pub write_back: WriteBackStatus,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessLegResult {
    pub record_id: String,
    pub leg_name: String,
    pub parent_shipment: Option<String>,
    pub tenant: TenantCode,
    /// Absent when the leg has no carrier yet.
    pub party: Option<EntityRef>,
    pub cost_center: CostCenterLink,
    pub write_back: WriteBackStatus,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLegResult {
    pub record_id: String,
    pub leg_name: String,
    pub tenant: TenantCode,
    pub party: EntityRef,
    pub cost_center: CostCenterLink,
    pub invoice: InvoiceSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub write_back: WriteBackStatus,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanySyncResult {
    pub record_id: String,
    pub tenant: TenantCode,
    pub party: EntityRef,
    pub write_back: WriteBackStatus,
    pub completed_at: DateTime<Utc>,
}

/// Per-item outcome for batch syncs (products, rate cards).
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub key: String,
    pub id: Option<i64>,
    pub action: Option<SyncAction>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub created: usize,
    pub updated: usize,
    pub existing: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSyncResult {
    pub tenant: TenantCode,
    pub summary: BatchSummary,
    pub details: Vec<BatchItemResult>,
}

impl BatchSyncResult {
    pub fn new(tenant: TenantCode) -> Self {
        Self {
            tenant,
            summary: BatchSummary::default(),
            details: Vec::new(),
        }
    }

    pub fn record_ok(&mut self, key: impl Into<String>, entity: &EntityRef) {
        match entity.action {
            SyncAction::Created => self.summary.created += 1,
            SyncAction::Updated => self.summary.updated += 1,
            SyncAction::Existing => self.summary.existing += 1,
        }
        self.details.push(BatchItemResult {
            key: key.into(),
            id: Some(entity.id),
            action: Some(entity.action),
            error: None,
        });
    }

    pub fn record_error(&mut self, key: impl Into<String>, error: impl ToString) {
        self.summary.errors += 1;
        self.details.push(BatchItemResult {
            key: key.into(),
            id: None,
            action: None,
            error: Some(error.to_string()),
        });
    }
}
