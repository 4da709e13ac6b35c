// ── Inventory document ──
//
// The shared JSON file produced by the import step. We only ever read the
// identity/model/address fields and write inside each entity's status
// sub-record; everything else round-trips untouched, key order included.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::merge::merge_patch;
use crate::error::CoreError;
use crate::model::{EntityRef, FleetEntity};

/// Field names used by the inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentLayout {
    /// Top-level arrays holding entities. Ignored when the root is an array.
    pub collections: Vec<String>,
    pub id_field: String,
    pub model_field: String,
    /// Tried in order; the first non-empty value is the address.
    pub address_fields: Vec<String>,
    /// Per-entity object the engine owns.
    pub status_record: String,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self {
            collections: vec!["Company_Grouped".into(), "Branches_Grouped".into()],
            id_field: "ID".into(),
            model_field: "Type".into(),
            address_fields: vec!["Printer IP".into(), "IP".into(), "ip".into()],
            status_record: "printerInfo".into(),
        }
    }
}

/// An inventory held in memory between load and persist.
#[derive(Debug, Clone)]
pub struct InventoryDocument {
    root: Value,
    layout: DocumentLayout,
}

impl InventoryDocument {
    /// Wrap a parsed document. The root must be an object (named
    /// collections) or an array (a single unnamed collection).
    pub fn from_value(root: Value, layout: DocumentLayout) -> Result<Self, CoreError> {
        match &root {
            Value::Object(_) | Value::Array(_) => Ok(Self { root, layout }),
            other => Err(CoreError::DocumentLayout {
                message: format!("expected an object or array at the top level, found {}", kind(other)),
            }),
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    /// Every entity in document order. Non-object items are skipped.
    pub fn entities(&self) -> Vec<FleetEntity> {
        let mut out = Vec::new();
        match &self.root {
            Value::Array(items) => self.collect(None, items, &mut out),
            Value::Object(fields) => {
                for name in &self.layout.collections {
                    if let Some(Value::Array(items)) = fields.get(name) {
                        self.collect(Some(name), items, &mut out);
                    }
                }
            }
            _ => {}
        }
        out
    }

    fn collect(&self, collection: Option<&String>, items: &[Value], out: &mut Vec<FleetEntity>) {
        for (index, item) in items.iter().enumerate() {
            let Value::Object(fields) = item else {
                continue;
            };
            let address = self
                .layout
                .address_fields
                .iter()
                .filter_map(|f| fields.get(f).and_then(scalar))
                .find(|a| !a.is_empty())
                .unwrap_or_default();
            out.push(FleetEntity {
                location: Some(EntityRef {
                    collection: collection.cloned(),
                    index,
                }),
                id: fields.get(&self.layout.id_field).and_then(scalar).unwrap_or_default(),
                model: fields
                    .get(&self.layout.model_field)
                    .and_then(scalar)
                    .unwrap_or_default(),
                address,
            });
        }
    }

    /// The entity's status sub-record, if it has one.
    pub fn status_record(&self, at: &EntityRef) -> Option<&Map<String, Value>> {
        self.entity(at)?
            .get(&self.layout.status_record)?
            .as_object()
    }

    /// Merge `patch` into the entity's status sub-record, creating it if
    /// missing. Returns `false` when `at` no longer points at an entity.
    pub fn apply(&mut self, at: &EntityRef, patch: &Value) -> bool {
        let Some(record) = self.record_mut(at) else {
            return false;
        };
        merge_patch(record, patch);
        true
    }

    /// Store `value` under `key` in the status sub-record as is. Unlike
    /// [`apply`](Self::apply), `null` members inside `value` are kept.
    pub fn replace(&mut self, at: &EntityRef, key: &str, value: Value) -> bool {
        let Some(Value::Object(fields)) = self.record_mut(at) else {
            return false;
        };
        fields.insert(key.to_owned(), value);
        true
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        Ok(text)
    }

    fn entity(&self, at: &EntityRef) -> Option<&Value> {
        let items = match &at.collection {
            Some(name) => self.root.get(name)?,
            None => &self.root,
        };
        items.as_array()?.get(at.index)
    }

    /// The status sub-record, created (or reset from a non-object) on demand.
    fn record_mut(&mut self, at: &EntityRef) -> Option<&mut Value> {
        let key = self.layout.status_record.clone();
        let Value::Object(fields) = self.entity_mut(at)? else {
            return None;
        };
        let record = fields.entry(key).or_insert(Value::Null);
        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        Some(record)
    }

    fn entity_mut(&mut self, at: &EntityRef) -> Option<&mut Value> {
        let items = match &at.collection {
            Some(name) => self.root.get_mut(name)?,
            None => &mut self.root,
        };
        items.as_array_mut()?.get_mut(at.index)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> InventoryDocument {
        let root = json!({
            "Company_Grouped": [
                {"ID": "P-1", "Type": "M404dn", "Printer IP": "10.0.0.5", "Branch": "HQ"},
                "not an entity",
                {"ID": 17, "Type": "408dn", "Printer IP": "", "IP": "10.0.0.9",
                 "printerInfo": {"status": "offline", "supplyTypeCodes": ["MLT-D203L"]}}
            ],
            "Branches_Grouped": [
                {"ID": "B-1", "Type": "M404dn", "ip": "-"}
            ],
            "Meta": {"exported": "2024-05-01"}
        });
        InventoryDocument::from_value(root, DocumentLayout::default()).unwrap()
    }

    #[test]
    fn reads_entities_across_collections() {
        let entities = sample().entities();
        let summary: Vec<(&str, &str, &str)> = entities
            .iter()
            .map(|e| (e.id.as_str(), e.model.as_str(), e.address.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("P-1", "M404dn", "10.0.0.5"),
                ("17", "408dn", "10.0.0.9"),
                ("B-1", "M404dn", "-"),
            ]
        );
        assert_eq!(
            entities[1].location,
            Some(EntityRef {
                collection: Some("Company_Grouped".into()),
                index: 2
            })
        );
    }

    #[test]
    fn bare_array_root_is_one_collection() {
        let doc = InventoryDocument::from_value(
            json!([{"ID": "X", "Type": "M527", "IP": "10.1.1.1"}]),
            DocumentLayout::default(),
        )
        .unwrap();
        let entities = doc.entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].location.as_ref().unwrap().collection, None);
    }

    #[test]
    fn rejects_scalar_roots() {
        assert!(InventoryDocument::from_value(json!("x"), DocumentLayout::default()).is_err());
    }

    #[test]
    fn apply_creates_and_merges_status_record() {
        let mut doc = sample();
        let entities = doc.entities();

        let first = entities[0].location.clone().unwrap();
        assert!(doc.apply(&first, &json!({"status": "online"})));
        assert_eq!(doc.status_record(&first).unwrap()["status"], "online");

        let second = entities[1].location.clone().unwrap();
        assert!(doc.apply(&second, &json!({"status": "online", "reason": null})));
        let record = doc.status_record(&second).unwrap();
        assert_eq!(record["supplyTypeCodes"], json!(["MLT-D203L"]));
        assert_eq!(doc.root()["Meta"], json!({"exported": "2024-05-01"}));
    }

    #[test]
    fn replace_keeps_null_members() {
        let mut doc = sample();
        let at = doc.entities()[0].location.clone().unwrap();
        doc.apply(
            &at,
            &json!({"errorState": {"problem": "Door open", "severity": "critical", "code": "13.B2"}}),
        );

        let unknown = json!({"problem": null, "severity": "informational"});
        assert!(doc.replace(&at, "errorState", unknown.clone()));
        assert_eq!(doc.status_record(&at).unwrap()["errorState"], unknown);
    }

    #[test]
    fn apply_to_missing_entity_is_refused() {
        let mut doc = sample();
        let nowhere = EntityRef {
            collection: Some("Company_Grouped".into()),
            index: 40,
        };
        assert!(!doc.apply(&nowhere, &json!({"status": "online"})));
        assert!(!doc.replace(&nowhere, "errorState", Value::Null));
    }

    #[test]
    fn pretty_output_keeps_order_and_unicode() {
        let doc = InventoryDocument::from_value(
            json!({"z": 1, "a": "מוכן"}),
            DocumentLayout::default(),
        )
        .unwrap();
        assert_eq!(doc.to_pretty_json().unwrap(), "{\n  \"z\": 1,\n  \"a\": \"מוכן\"\n}\n");
    }
}
