// ── Findings-to-document conversions ──
//
// Turns normalized findings into the JSON shapes stored under the status
// sub-record, and builds the merge patches the orchestrator applies.

use printfleet_probe::{SupplyReading, SupplyTypeCode};
use serde_json::{Map, Value, json};

use crate::model::{ErrorState, LinkStatus, SupplyLevel};

const COLOR_ORDER: &[&str] = &["black", "cyan", "magenta", "yellow"];

/// The attribute value one successful probe produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    ErrorState(ErrorState),
    Cartridges(Vec<SupplyLevel>),
    SupplyTypeCodes(Vec<String>),
}

impl Enrichment {
    /// Document key under the status sub-record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ErrorState(_) => "errorState",
            Self::Cartridges(_) => "cartridges",
            Self::SupplyTypeCodes(_) => "supplyTypeCodes",
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::ErrorState(state) => json!({
                "problem": state.problem,
                "severity": state.severity.to_string(),
            }),
            Self::Cartridges(levels) => Value::Array(
                levels
                    .iter()
                    .map(|l| {
                        json!({
                            "cartridgeColor": l.cartridge_color,
                            "remainingPercent": l.remaining_percent,
                        })
                    })
                    .collect(),
            ),
            Self::SupplyTypeCodes(codes) => json!(codes),
        }
    }

    /// One-line rendering for summaries.
    pub fn describe(&self) -> String {
        match self {
            Self::ErrorState(state) => state.to_string(),
            Self::Cartridges(levels) => levels
                .iter()
                .map(|l| match l.remaining_percent {
                    Some(p) => format!("{} {p}%", l.cartridge_color),
                    None => format!("{} ?", l.cartridge_color),
                })
                .collect::<Vec<_>>()
                .join(", "),
            Self::SupplyTypeCodes(codes) => codes.join(", "),
        }
    }
}

pub fn cartridges(readings: &[SupplyReading]) -> Vec<SupplyLevel> {
    readings
        .iter()
        .map(|r| SupplyLevel {
            cartridge_color: r.color.clone(),
            remaining_percent: r.percent.map(|p| p.min(100)),
        })
        .collect()
}

/// Part numbers in canonical order: Black, Cyan, Magenta, Yellow, then
/// everything else as found. Duplicates keep their first position.
pub fn supply_codes(found: &[SupplyTypeCode]) -> Vec<String> {
    let mut ranked: Vec<(usize, &str)> = found
        .iter()
        .map(|c| (color_rank(c.color.as_deref()), c.code.trim()))
        .filter(|(_, code)| !code.is_empty())
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);

    let mut out: Vec<String> = Vec::with_capacity(ranked.len());
    for (_, code) in ranked {
        if !out.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            out.push(code.to_owned());
        }
    }
    out
}

fn color_rank(color: Option<&str>) -> usize {
    let Some(color) = color else {
        return COLOR_ORDER.len();
    };
    let color = color.trim().to_lowercase();
    COLOR_ORDER
        .iter()
        .position(|c| color == *c)
        .unwrap_or(COLOR_ORDER.len())
}

/// Part numbers already recorded on a status sub-record: a non-empty
/// array of strings, or a non-empty comma-separated string.
pub fn recorded_codes(record: Option<&Map<String, Value>>) -> Option<Vec<String>> {
    let codes: Vec<String> = match record?.get("supplyTypeCodes")? {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => return None,
    };
    (!codes.is_empty()).then_some(codes)
}

// ── Patches ─────────────────────────────────────────────────────────

/// One change to an entity's status sub-record.
///
/// `fields` is an RFC 7396 merge patch. The enriched attribute travels
/// separately and replaces the stored value whole, so an unknown problem
/// is kept as `"problem": null` instead of being merged away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPatch {
    pub fields: Value,
    pub attribute: Option<(&'static str, Value)>,
}

/// Successful probe: online, clear any old reason, set the attribute.
pub fn online_patch(enrichment: &Enrichment) -> StatusPatch {
    StatusPatch {
        fields: status_fields(LinkStatus::Online, None),
        attribute: Some((enrichment.key(), enrichment.to_value())),
    }
}

/// Failed probe: offline with the reason. Previously enriched attributes
/// are left as they were.
pub fn offline_patch(reason: &str) -> StatusPatch {
    StatusPatch {
        fields: status_fields(LinkStatus::Offline, Some(reason)),
        attribute: None,
    }
}

/// Attribute only, status untouched. Used for sampling peers.
pub fn attribute_patch(enrichment: &Enrichment) -> StatusPatch {
    StatusPatch {
        fields: Value::Object(Map::new()),
        attribute: Some((enrichment.key(), enrichment.to_value())),
    }
}

fn status_fields(status: LinkStatus, reason: Option<&str>) -> Value {
    json!({
        "status": status.to_string(),
        "reason": reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use pretty_assertions::assert_eq;

    fn code(color: Option<&str>, code: &str) -> SupplyTypeCode {
        SupplyTypeCode {
            color: color.map(str::to_owned),
            code: code.to_owned(),
        }
    }

    #[test]
    fn codes_follow_color_order() {
        let found = [
            code(Some("Yellow"), "W2032A"),
            code(None, "W1104A"),
            code(Some("black"), "W2030A"),
            code(Some("Magenta"), "W2033A"),
            code(Some("Cyan"), "W2031A"),
            code(Some("Black"), "w2030a"),
        ];
        assert_eq!(
            supply_codes(&found),
            vec!["W2030A", "W2031A", "W2033A", "W2032A", "W1104A"]
        );
    }

    #[test]
    fn recorded_codes_accept_arrays_and_strings() {
        let record = json!({"supplyTypeCodes": ["CF259A", ""]});
        assert_eq!(recorded_codes(record.as_object()), Some(vec!["CF259A".to_owned()]));

        let record = json!({"supplyTypeCodes": "TN-910, DR-910"});
        assert_eq!(
            recorded_codes(record.as_object()),
            Some(vec!["TN-910".to_owned(), "DR-910".to_owned()])
        );

        for empty in [json!({"supplyTypeCodes": []}), json!({"supplyTypeCodes": " "}), json!({})] {
            assert_eq!(recorded_codes(empty.as_object()), None);
        }
        assert_eq!(recorded_codes(None), None);
    }

    #[test]
    fn online_patch_clears_reason() {
        let patch = online_patch(&Enrichment::ErrorState(ErrorState::new(
            "Door open",
            Severity::Critical,
        )));
        assert_eq!(patch.fields, json!({"status": "online", "reason": null}));
        assert_eq!(
            patch.attribute,
            Some(("errorState", json!({"problem": "Door open", "severity": "critical"})))
        );
    }

    #[test]
    fn unknown_problem_is_carried_as_null() {
        let patch = attribute_patch(&Enrichment::ErrorState(ErrorState::unknown()));
        assert_eq!(patch.fields, json!({}));
        assert_eq!(
            patch.attribute,
            Some(("errorState", json!({"problem": null, "severity": "informational"})))
        );
    }

    #[test]
    fn cartridges_keep_unknown_levels() {
        let levels = cartridges(&[
            SupplyReading { color: "Black".into(), percent: Some(40) },
            SupplyReading { color: "Unknown".into(), percent: None },
        ]);
        assert_eq!(
            Enrichment::Cartridges(levels).to_value(),
            json!([
                {"cartridgeColor": "Black", "remainingPercent": 40},
                {"cartridgeColor": "Unknown", "remainingPercent": null}
            ])
        );
    }

    #[test]
    fn offline_patch_shape() {
        let patch = offline_patch("no usable address");
        assert_eq!(
            patch.fields,
            json!({"status": "offline", "reason": "no usable address"})
        );
        assert_eq!(patch.attribute, None);
    }
}
