// Country Router
// Decides which tenant books a sale or a cost. Pure and total: every input
// resolves to exactly one of the two tenants.

use crate::models::shipment::{Leg, MasterShipment};
use crate::models::tenant::{OperationKind, TenantCode};

/// Free-text location hints from a record.
#[derive(Debug, Clone, Default)]
pub struct RoutingHints {
    pub customer_country: Option<String>,
    pub carrier_country: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl RoutingHints {
    pub fn for_shipment(master: &MasterShipment) -> Self {
        Self {
            customer_country: master.customer_country.clone(),
            destination: master.destination.clone(),
            ..Self::default()
        }
    }

    pub fn for_leg(leg: &Leg) -> Self {
        Self {
            carrier_country: leg.carrier_country.clone(),
            origin: leg.origin.clone(),
            destination: leg.destination.clone(),
            ..Self::default()
        }
    }

    fn relevant(&self, kind: OperationKind) -> [Option<&str>; 2] {
        match kind {
            OperationKind::Sale => [self.customer_country.as_deref(), self.destination.as_deref()],
            OperationKind::Cost => [self.carrier_country.as_deref(), self.origin.as_deref()],
        }
    }
}

fn points_to_secondary(hint: &str) -> bool {
    let secondary = TenantCode::SECONDARY;
    hint.trim().eq_ignore_ascii_case(secondary.as_str())
        || hint
            .to_lowercase()
            .contains(&secondary.country_name().to_lowercase())
}

/// A parsable `explicit_override` wins; otherwise any relevant hint naming
/// the secondary country routes there, and everything else goes to the
/// primary tenant.
pub fn resolve_tenant(
    explicit_override: Option<&str>,
    hints: &RoutingHints,
    kind: OperationKind,
) -> TenantCode {
    if let Some(tenant) = explicit_override.and_then(TenantCode::parse) {
        return tenant;
    }

    let secondary = hints
        .relevant(kind)
        .iter()
        .flatten()
        .any(|hint| points_to_secondary(hint));

    if secondary {
        TenantCode::SECONDARY
    } else {
        TenantCode::PRIMARY
    }
}

/// True when a non-empty override is present but not a tenant code.
pub fn is_invalid_override(explicit_override: Option<&str>) -> bool {
    matches!(explicit_override, Some(value) if !value.trim().is_empty() && TenantCode::parse(value).is_none())
}
