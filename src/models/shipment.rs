use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::record_schema::{LegFields, MasterFields};
use crate::models::record::Record;
use crate::models::tenant::TenantCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Customer,
    Carrier,
}

impl PartyRole {
    /// Record-store "type" column values; carriers are also stored as
    /// `fletero` / `proveedor`.
    pub fn from_kind(kind: Option<&str>) -> Self {
        match kind.map(|k| k.trim().to_lowercase()).as_deref() {
            Some("fletero") | Some("proveedor") | Some("carrier") | Some("supplier") => {
                PartyRole::Carrier
            }
            _ => PartyRole::Customer,
        }
    }
}

/// Aggregate shipment ("Master") as read from the record store.
#[derive(Debug, Clone)]
pub struct MasterShipment {
    pub record_id: String,
    /// Human-readable identifier; falls back to the record id.
    pub name: String,
    pub customer_name: Option<String>,
    pub customer_tax_id: Option<String>,
    pub customer_country: Option<String>,
    pub destination: Option<String>,
    pub sale_tenant: Option<String>,
    pub billing_state: Option<String>,
    pub status: Option<String>,
    pub leg_ids: Vec<String>,
}

impl MasterShipment {
    pub fn from_record(record: &Record, fields: &MasterFields) -> Self {
        Self {
            record_id: record.id.clone(),
            name: record.text(fields.name).unwrap_or_else(|| record.id.clone()),
            customer_name: record.text(fields.customer_name),
            customer_tax_id: record.text(fields.customer_tax_id),
            customer_country: record.text(fields.customer_country),
            destination: record.text(fields.destination),
            sale_tenant: record.text(&[fields.sale_tenant]),
            billing_state: record.text(&[fields.billing_state]),
            status: record.text(fields.status),
            leg_ids: record.links(fields.legs),
        }
    }
}

/// One sub-movement ("Operation") of a shipment.
#[derive(Debug, Clone)]
pub struct Leg {
    pub record_id: String,
    pub name: String,
    pub parent_ids: Vec<String>,
    pub carrier_name: Option<String>,
    pub carrier_tax_id: Option<String>,
    pub carrier_country: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Raw rate values; normalized by the invoice composer.
    pub sell_rate: Value,
    pub buy_rate: Value,
    pub cost_tenant: Option<String>,
    pub billing_state: Option<String>,
    pub request_card_ids: Vec<String>,
}

impl Leg {
    pub fn from_record(record: &Record, fields: &LegFields) -> Self {
        Self {
            record_id: record.id.clone(),
            name: record.text(fields.name).unwrap_or_else(|| record.id.clone()),
            parent_ids: record.links(fields.parent),
            carrier_name: record.text(fields.carrier_name),
            carrier_tax_id: record.text(fields.carrier_tax_id),
            carrier_country: record.text(fields.carrier_country),
            origin: record.text(fields.origin),
            destination: record.text(fields.destination),
            sell_rate: record.raw(fields.sell_rate).cloned().unwrap_or(Value::Null),
            buy_rate: record.raw(fields.buy_rate).cloned().unwrap_or(Value::Null),
            cost_tenant: record.text(&[fields.cost_tenant]),
            billing_state: record.text(&[fields.billing_state]),
            request_card_ids: record.links(fields.request_card),
        }
    }
}

/// Inputs for partner resolution.
#[derive(Debug, Clone)]
pub struct PartyInput {
    pub name: String,
    pub tax_id: Option<String>,
    pub role: PartyRole,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// ISO country code, resolved against the ERP country table on create.
    pub country_code: Option<String>,
}

impl PartyInput {
    pub fn new(name: impl Into<String>, role: PartyRole) -> Self {
        Self {
            name: name.into(),
            tax_id: None,
            role,
            email: None,
            phone: None,
            country_code: None,
        }
    }

    pub fn with_tax_id(mut self, tax_id: Option<String>) -> Self {
        self.tax_id = tax_id;
        self
    }
}

/// Maps a free-text country value to an ISO code the ERP understands.
pub fn country_code_hint(value: &str) -> Option<String> {
    if let Some(tenant) = TenantCode::parse(value) {
        return Some(tenant.as_str().to_string());
    }
    let lowered = value.to_lowercase();
    TenantCode::ALL
        .iter()
        .find(|t| lowered.contains(&t.country_name().to_lowercase()))
        .map(|t| t.as_str().to_string())
        .or_else(|| {
            let trimmed = value.trim();
            (trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()))
                .then(|| trimmed.to_ascii_uppercase())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordSchema;
    use serde_json::json;

    fn record(id: &str, fields: Value) -> Record {
        Record {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_time: None,
        }
    }

    #[test]
    fn master_falls_back_to_record_id_for_name() {
        let schema = RecordSchema::default();
        let master = MasterShipment::from_record(
            &record("recM1", json!({"Cliente": ["ACME SA"], "company_venta": "cl"})),
            &schema.master,
        );
        assert_eq!(master.name, "recM1");
        assert_eq!(master.customer_name.as_deref(), Some("ACME SA"));
        assert_eq!(master.sale_tenant.as_deref(), Some("cl"));
        assert!(master.leg_ids.is_empty());
    }

    #[test]
    fn leg_keeps_raw_rates() {
        let schema = RecordSchema::default();
        let leg = Leg::from_record(
            &record(
                "recO1",
                json!({
                    "Nombre de Operación": "OP-42",
                    "Tarifa de Venta": [1500],
                    "Transportista": ["Fletes Andinos"],
                    "Master": ["recM1"],
                }),
            ),
            &schema.leg,
        );
        assert_eq!(leg.name, "OP-42");
        assert_eq!(leg.sell_rate, json!([1500]));
        assert_eq!(leg.buy_rate, Value::Null);
        assert_eq!(leg.parent_ids, vec!["recM1"]);
        assert_eq!(leg.carrier_name.as_deref(), Some("Fletes Andinos"));
    }

    #[test]
    fn role_from_record_kind() {
        assert_eq!(PartyRole::from_kind(Some("Fletero")), PartyRole::Carrier);
        assert_eq!(PartyRole::from_kind(Some("cliente")), PartyRole::Customer);
        assert_eq!(PartyRole::from_kind(None), PartyRole::Customer);
    }

    #[test]
    fn country_codes_from_free_text() {
        assert_eq!(country_code_hint("Chile").as_deref(), Some("CL"));
        assert_eq!(country_code_hint("ar").as_deref(), Some("AR"));
        assert_eq!(country_code_hint("uy").as_deref(), Some("UY"));
        assert_eq!(country_code_hint("Uruguay"), None);
    }
}
