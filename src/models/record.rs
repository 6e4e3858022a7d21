use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record-store row: opaque id plus a loosely typed field map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(rename = "createdTime", skip_serializing_if = "Option::is_none", default)]
    pub created_time: Option<String>,
}

impl Record {
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// First non-empty text value among `keys`. Lookup/link columns arrive as
    /// lists, in which case the first element is taken.
    pub fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(lookup_text)
    }

    /// Linked record ids stored in a multi-link column.
    pub fn links(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        }
    }
}

/// Collapse a lookup value (scalar or first-of-list) to trimmed, non-empty text.
pub fn lookup_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(lookup_text),
        Value::Null | Value::Object(_) => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    pub offset: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        Record {
            id: "rec1".to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_time: None,
        }
    }

    #[test]
    fn text_takes_first_non_empty_key() {
        let r = record(json!({"Cliente": "  ", "Nombre del Cliente": "ACME"}));
        assert_eq!(r.text(&["Cliente", "Nombre del Cliente"]), Some("ACME".to_string()));
    }

    #[test]
    fn text_unwraps_lookup_lists() {
        let r = record(json!({"Origen": ["Mendoza", "San Juan"], "Vacio": []}));
        assert_eq!(r.text(&["Origen"]), Some("Mendoza".to_string()));
        assert_eq!(r.text(&["Vacio"]), None);
        assert_eq!(r.text(&["Missing"]), None);
    }

    #[test]
    fn links_reads_id_lists() {
        let r = record(json!({"Master": ["recA", "recB"], "Solo": "recC"}));
        assert_eq!(r.links("Master"), vec!["recA", "recB"]);
        assert_eq!(r.links("Solo"), vec!["recC"]);
        assert!(r.links("None").is_empty());
    }
}
