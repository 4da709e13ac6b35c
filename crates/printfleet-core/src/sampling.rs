// ── Representative sampling ──
//
// Model-level attributes (accepted cartridge part numbers) are the same
// for every unit of a model, so one reachable unit per model is probed
// and the answer is copied to its peers. Groups that already carry a
// value are not probed at all.

use indexmap::IndexMap;

use crate::convert::recorded_codes;
use crate::model::FleetEntity;
use crate::store::InventoryDocument;

/// In-scope entities sharing one declared model.
#[derive(Debug, Clone)]
pub struct ModelGroup {
    /// Model as declared by the first member.
    pub model: String,
    pub members: Vec<FleetEntity>,
}

/// What to do for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupPlan {
    /// A member already has codes; copy them to the rest.
    Reuse(Vec<String>),
    /// Probe `members[index]` and propagate.
    Probe { index: usize },
    /// No member has a usable address.
    Unreachable,
}

/// Group entities by model (trimmed, case-insensitive), keeping first
/// appearance order for both groups and members.
pub fn group_by_model(entities: Vec<FleetEntity>) -> Vec<ModelGroup> {
    let mut groups: IndexMap<String, ModelGroup> = IndexMap::new();
    for entity in entities {
        let key = entity.model.trim().to_lowercase();
        groups
            .entry(key)
            .or_insert_with(|| ModelGroup {
                model: entity.model.trim().to_owned(),
                members: Vec::new(),
            })
            .members
            .push(entity);
    }
    groups.into_values().collect()
}

pub fn plan(group: &ModelGroup, document: &InventoryDocument) -> GroupPlan {
    let existing = group.members.iter().find_map(|m| {
        let at = m.location.as_ref()?;
        recorded_codes(document.status_record(at))
    });
    if let Some(codes) = existing {
        return GroupPlan::Reuse(codes);
    }
    group
        .members
        .iter()
        .position(|m| m.usable_address().is_some())
        .map_or(GroupPlan::Unreachable, |index| GroupPlan::Probe { index })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::DocumentLayout;
    use serde_json::json;

    fn document(root: serde_json::Value) -> InventoryDocument {
        InventoryDocument::from_value(root, DocumentLayout::default()).unwrap()
    }

    #[test]
    fn groups_ignore_case_and_whitespace() {
        let doc = document(json!([
            {"ID": "1", "Type": "M404dn", "IP": "10.0.0.1"},
            {"ID": "2", "Type": "E60155", "IP": "10.0.0.2"},
            {"ID": "3", "Type": " m404DN ", "IP": "10.0.0.3"}
        ]));
        let groups = group_by_model(doc.entities());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].model, "M404dn");
        let ids: Vec<&str> = groups[0].members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn first_reachable_member_is_the_representative() {
        let doc = document(json!([
            {"ID": "1", "Type": "M404dn", "IP": "-"},
            {"ID": "2", "Type": "M404dn", "IP": "10.0.0.2"},
            {"ID": "3", "Type": "M404dn", "IP": "10.0.0.3"}
        ]));
        let groups = group_by_model(doc.entities());
        assert_eq!(plan(&groups[0], &doc), GroupPlan::Probe { index: 1 });
    }

    #[test]
    fn recorded_codes_are_reused() {
        let doc = document(json!([
            {"ID": "1", "Type": "M404dn", "IP": "10.0.0.1"},
            {"ID": "2", "Type": "M404dn", "IP": "10.0.0.2",
             "printerInfo": {"supplyTypeCodes": ["CF259A"]}}
        ]));
        let groups = group_by_model(doc.entities());
        assert_eq!(plan(&groups[0], &doc), GroupPlan::Reuse(vec!["CF259A".into()]));
    }

    #[test]
    fn group_without_addresses_is_unreachable() {
        let doc = document(json!([
            {"ID": "1", "Type": "M404dn", "IP": ""},
            {"ID": "2", "Type": "M404dn", "IP": "n/a"}
        ]));
        let groups = group_by_model(doc.entities());
        assert_eq!(plan(&groups[0], &doc), GroupPlan::Unreachable);
    }
}
