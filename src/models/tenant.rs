use serde::{Deserialize, Serialize};
use std::fmt;

/// Country-scoped ERP company. `Ar` is the primary tenant, `Cl` the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenantCode {
    #[serde(rename = "AR")]
    Ar,
    #[serde(rename = "CL")]
    Cl,
}

impl TenantCode {
    pub const ALL: [TenantCode; 2] = [TenantCode::Ar, TenantCode::Cl];

    pub const PRIMARY: TenantCode = TenantCode::Ar;
    pub const SECONDARY: TenantCode = TenantCode::Cl;

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantCode::Ar => "AR",
            TenantCode::Cl => "CL",
        }
    }

    /// Lowercase form used in record-store field suffixes (`odoo_invoice_id_ar`).
    pub fn suffix(&self) -> &'static str {
        match self {
            TenantCode::Ar => "ar",
            TenantCode::Cl => "cl",
        }
    }

    pub fn country_name(&self) -> &'static str {
        match self {
            TenantCode::Ar => "Argentina",
            TenantCode::Cl => "Chile",
        }
    }

    /// Case-insensitive parse of `AR` / `CL`. Anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AR" => Some(TenantCode::Ar),
            "CL" => Some(TenantCode::Cl),
            _ => None,
        }
    }
}

impl fmt::Display for TenantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a triangulated movement is being booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sale,
    Cost,
}

/// Tenant-indexed pair of values, one per country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerTenant<T> {
    pub ar: T,
    pub cl: T,
}

impl<T> PerTenant<T> {
    pub fn new(ar: T, cl: T) -> Self {
        Self { ar, cl }
    }

    pub fn get(&self, tenant: TenantCode) -> &T {
        match tenant {
            TenantCode::Ar => &self.ar,
            TenantCode::Cl => &self.cl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(TenantCode::parse("cl"), Some(TenantCode::Cl));
        assert_eq!(TenantCode::parse(" Ar "), Some(TenantCode::Ar));
        assert_eq!(TenantCode::parse("BR"), None);
        assert_eq!(TenantCode::parse(""), None);
    }

    #[test]
    fn serializes_as_upper_code() {
        assert_eq!(serde_json::to_string(&TenantCode::Cl).unwrap(), "\"CL\"");
        assert_eq!(TenantCode::Ar.suffix(), "ar");
    }

    #[test]
    fn per_tenant_lookup() {
        let ids = PerTenant::new(1, 2);
        assert_eq!(*ids.get(TenantCode::Ar), 1);
        assert_eq!(*ids.get(TenantCode::Cl), 2);
    }
}
