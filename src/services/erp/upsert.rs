// Idempotent create-or-update against one ERP model.
//
// There is no lock between the search and the create: two concurrent calls
// for the same key can both create. Callers run one orchestration at a time
// per record, which keeps this window small in practice.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::models::sync_result::{EntityRef, SyncAction};
use crate::services::erp::odoo_client::{row_id, ErpRow, OdooClient};
use crate::services::error::Result;

/// Ordered list of ERP domains; the first one with a hit identifies the record.
#[derive(Debug, Clone, Default)]
pub struct SearchKey {
    domains: Vec<Value>,
}

impl SearchKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single `[field, op, value]` term.
    pub fn by(field: &str, op: &str, value: impl Serialize) -> Self {
        Self::new().or(field, op, value)
    }

    pub fn or(mut self, field: &str, op: &str, value: impl Serialize) -> Self {
        self.domains.push(json!([[field, op, value]]));
        self
    }

    /// Adds a term every alternative must also satisfy.
    pub fn and(mut self, field: &str, op: &str, value: impl Serialize) -> Self {
        let term = json!([field, op, value]);
        for domain in &mut self.domains {
            if let Value::Array(terms) = domain {
                terms.push(term.clone());
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[Value] {
        &self.domains
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: i64,
    pub action: SyncAction,
}

impl UpsertOutcome {
    pub fn into_entity(self, name: impl Into<String>) -> EntityRef {
        EntityRef {
            id: self.id,
            action: self.action,
            name: name.into(),
        }
    }
}

/// First row matched by any domain of `key`, in key order.
pub async fn find_one(
    client: &OdooClient,
    model: &str,
    key: &SearchKey,
    fields: &[&str],
) -> Result<Option<ErpRow>> {
    for domain in key.domains() {
        if let Some(row) = client.search_one(model, domain.clone(), fields).await? {
            return Ok(Some(row));
        }
    }
    Ok(None)
}

/// Find by `key`; write `update` when found (if given), otherwise create.
pub async fn upsert(
    client: &OdooClient,
    model: &str,
    key: &SearchKey,
    create: Value,
    update: Option<Map<String, Value>>,
) -> Result<UpsertOutcome> {
    let existing = find_one(client, model, key, &["id"]).await?;

    let outcome = match (existing.as_ref().and_then(row_id), update) {
        (Some(id), Some(update)) => {
            if !update.is_empty() {
                client.write(model, &[id], Value::Object(update)).await?;
            }
            UpsertOutcome { id, action: SyncAction::Updated }
        }
        (Some(id), None) => UpsertOutcome { id, action: SyncAction::Existing },
        (None, _) => {
            let id = client.create(model, create).await?;
            UpsertOutcome { id, action: SyncAction::Created }
        }
    };

    tracing::debug!(
        tenant = %client.tenant(),
        model,
        id = outcome.id,
        action = outcome.action.as_str(),
        "Upserted ERP record"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_key_keeps_domain_order() {
        let key = SearchKey::by("vat", "=", "30-1")
            .or("name", "=", "ACME")
            .or("name", "ilike", "ACME");
        let domains = key.domains();
        assert_eq!(domains.len(), 3);
        assert_eq!(domains[0], json!([["vat", "=", "30-1"]]));
        assert_eq!(domains[2], json!([["name", "ilike", "ACME"]]));
    }

    #[test]
    fn scoping_term_applies_to_every_alternative() {
        let key = SearchKey::by("name", "=", "Mendoza - Santiago")
            .or("name", "ilike", "mendoza")
            .and("pricelist_id", "=", 12);
        assert_eq!(
            key.domains()[0],
            json!([["name", "=", "Mendoza - Santiago"], ["pricelist_id", "=", 12]])
        );
        assert_eq!(key.domains()[1][1], json!(["pricelist_id", "=", 12]));
    }

    #[test]
    fn outcome_into_entity_keeps_action() {
        let entity = UpsertOutcome { id: 5, action: SyncAction::Existing }.into_entity("OP-1");
        assert_eq!(entity.id, 5);
        assert_eq!(entity.action, SyncAction::Existing);
        assert_eq!(entity.name, "OP-1");
    }
}
