//! JSON merge-patch (RFC 7396).

use serde_json::Value;

/// Merge `patch` into `target`: objects merge recursively, `null` removes
/// the key, anything else replaces the target value wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    let Value::Object(target_fields) = target else {
        return;
    };
    for (key, value) in patch_fields {
        if value.is_null() {
            target_fields.remove(key);
        } else {
            merge_patch(
                target_fields.entry(key.clone()).or_insert(Value::Null),
                value,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn rfc_7396_examples() {
        let cases = [
            (json!({"a": "b"}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "b"}), json!({"b": "c"}), json!({"a": "b", "b": "c"})),
            (json!({"a": "b"}), json!({"a": null}), json!({})),
            (json!({"a": ["b"]}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "c"}), json!({"a": ["b"]}), json!({"a": ["b"]})),
            (
                json!({"a": {"b": "c"}}),
                json!({"a": {"b": "d", "c": null}}),
                json!({"a": {"b": "d"}}),
            ),
            (json!({"a": [{"b": "c"}]}), json!({"a": [1]}), json!({"a": [1]})),
            (json!(["a", "b"]), json!(["c", "d"]), json!(["c", "d"])),
            (json!({"e": null}), json!({"a": 1}), json!({"e": null, "a": 1})),
            (json!([1, 2]), json!({"a": "b", "c": null}), json!({"a": "b"})),
        ];
        for (mut target, patch, expected) in cases {
            merge_patch(&mut target, &patch);
            assert_eq!(target, expected);
        }
    }

    #[test]
    fn siblings_survive_a_partial_update() {
        let mut info = json!({
            "status": "offline",
            "reason": "timed out",
            "supplyTypeCodes": ["W1470A"],
            "cartridges": [{"cartridgeColor": "Black", "remainingPercent": 40}]
        });
        merge_patch(
            &mut info,
            &json!({
                "status": "online",
                "reason": null,
                "errorState": {"problem": "Ready", "severity": "informational"}
            }),
        );
        assert_eq!(
            info,
            json!({
                "status": "online",
                "supplyTypeCodes": ["W1470A"],
                "cartridges": [{"cartridgeColor": "Black", "remainingPercent": 40}],
                "errorState": {"problem": "Ready", "severity": "informational"}
            })
        );
    }
}
