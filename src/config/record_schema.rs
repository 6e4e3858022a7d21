// Field names of the production record-store base. Lookup-style fields list
// their alternatives in priority order; write-back fields that differ per
// tenant are built from a prefix plus the tenant suffix (`_ar` / `_cl`).

use crate::models::tenant::TenantCode;

#[derive(Debug, Clone)]
pub struct MasterFields {
    pub name: &'static [&'static str],
    pub customer_name: &'static [&'static str],
    pub customer_tax_id: &'static [&'static str],
    pub customer_country: &'static [&'static str],
    pub destination: &'static [&'static str],
    pub status: &'static [&'static str],
    pub legs: &'static str,
    pub sale_tenant: &'static str,
    pub billing_state: &'static str,
    pub invoice_number: &'static str,
    pub partner_id_prefix: &'static str,
    pub cost_center_id_prefix: &'static str,
    pub invoice_id_prefix: &'static str,
}

#[derive(Debug, Clone)]
pub struct LegFields {
    pub name: &'static [&'static str],
    pub parent: &'static str,
    pub carrier_name: &'static [&'static str],
    pub carrier_tax_id: &'static [&'static str],
    pub carrier_country: &'static [&'static str],
    pub origin: &'static [&'static str],
    pub destination: &'static [&'static str],
    pub sell_rate: &'static str,
    pub buy_rate: &'static str,
    pub cost_tenant: &'static str,
    pub billing_state: &'static str,
    pub cost_center_id_prefix: &'static str,
    pub purchase_invoice_id: &'static str,
    /// Link to the request card the leg was booked from.
    pub request_card: &'static str,
}

#[derive(Debug, Clone)]
pub struct RequestCardFields {
    pub customer_name: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct CompanyFields {
    pub name: &'static [&'static str],
    pub tax_id: &'static [&'static str],
    pub country: &'static [&'static str],
    pub kind: &'static [&'static str],
    pub email: &'static [&'static str],
    pub phone: &'static [&'static str],
    pub partner_id_prefix: &'static str,
}

#[derive(Debug, Clone)]
pub struct RateCardFields {
    pub origin: &'static [&'static str],
    pub destination: &'static [&'static str],
    pub price: &'static [&'static str],
}

#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub master: MasterFields,
    pub leg: LegFields,
    pub company: CompanyFields,
    pub rate_card: RateCardFields,
    pub request_card: RequestCardFields,
    /// Master status that allows invoicing when that check is enabled.
    pub preinvoiced_state: &'static str,
    /// Value written to billing-state columns once an invoice exists.
    pub invoiced_state: &'static str,
}

impl RecordSchema {
    pub fn per_tenant(prefix: &str, tenant: TenantCode) -> String {
        format!("{}_{}", prefix, tenant.suffix())
    }
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            master: MasterFields {
                name: &["Master"],
                customer_name: &[
                    "Nombre del Cliente",
                    "Cliente",
                    "Nombre del Cliente Formateado",
                ],
                customer_tax_id: &["CUIT/RUT", "CUIT Cliente"],
                customer_country: &["País Cliente", "País"],
                destination: &["Destino"],
                status: &["Estado"],
                legs: "Operaciones / Órdenes de Viaje 2",
                sale_tenant: "company_venta",
                billing_state: "estado_contable_master",
                invoice_number: "numero_factura_master",
                partner_id_prefix: "odoo_partner_id",
                cost_center_id_prefix: "odoo_analytic_id_master",
                invoice_id_prefix: "odoo_invoice_id",
            },
            leg: LegFields {
                name: &["Nombre de Operación", "Nombre de Operacion"],
                parent: "Master",
                carrier_name: &["Transportista", "Chofer"],
                carrier_tax_id: &["CUIT"],
                carrier_country: &["País"],
                origin: &["Origen"],
                destination: &["Destino"],
                sell_rate: "Tarifa de Venta",
                buy_rate: "Tarifa de Compra",
                cost_tenant: "company_cost",
                billing_state: "estado_contable_operacion",
                cost_center_id_prefix: "odoo_analytic_id_operacion",
                purchase_invoice_id: "odoo_purchase_invoice_id",
                request_card: "Tarjeta Madre (from Solicitudes)",
            },
            company: CompanyFields {
                name: &["Nombre", "Razón Social", "Razon_Social", "Name"],
                tax_id: &["CUIT/RUT", "CUIT", "RUT"],
                country: &["País", "Pais"],
                kind: &["Tipo"],
                email: &["Email", "Mail"],
                phone: &["Telefono", "Teléfono", "Phone"],
                partner_id_prefix: "odoo_partner_id",
            },
            rate_card: RateCardFields {
                origin: &["Origin", "Origen"],
                destination: &["Destination", "Destino"],
                price: &["Price", "Precio"],
            },
            request_card: RequestCardFields {
                customer_name: &["Cliente (from Negocios)"],
            },
            preinvoiced_state: "Prefacturada",
            invoiced_state: "facturado",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tenant_field_names() {
        let schema = RecordSchema::default();
        assert_eq!(
            RecordSchema::per_tenant(schema.master.invoice_id_prefix, TenantCode::Cl),
            "odoo_invoice_id_cl"
        );
        assert_eq!(
            RecordSchema::per_tenant(schema.leg.cost_center_id_prefix, TenantCode::Ar),
            "odoo_analytic_id_operacion_ar"
        );
    }
}
