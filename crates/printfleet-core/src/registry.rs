// ── Adapter registry ──
//
// Name lookup for the closed `AdapterKind` set plus the per-adapter target
// model lists. The lists ship with defaults and can be replaced per
// adapter from configuration.

use std::collections::BTreeMap;

use printfleet_probe::AdapterKind;
use strum::IntoEnumIterator;

use crate::error::CoreError;

/// Resolve an adapter by its kebab-case name, case-insensitively.
pub fn parse_adapter(name: &str) -> Result<AdapterKind, CoreError> {
    name.trim()
        .parse::<AdapterKind>()
        .map_err(|_| CoreError::UnknownAdapter {
            name: name.to_owned(),
            known: AdapterKind::iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Whether a declared model belongs to a target model: case-insensitive
/// equality, or the declared tag contains the target (`"HP M404dn"`
/// matches `"M404dn"`).
pub fn model_matches(declared: &str, target: &str) -> bool {
    let declared = declared.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if declared.is_empty() || target.is_empty() {
        return false;
    }
    declared == target || declared.contains(&target)
}

/// Target model sets for every adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRegistry {
    overrides: BTreeMap<AdapterKind, Vec<String>>,
}

impl ModelRegistry {
    pub fn new(overrides: BTreeMap<AdapterKind, Vec<String>>) -> Self {
        Self { overrides }
    }

    /// Replace the target list for one adapter.
    #[must_use]
    pub fn with_override(mut self, kind: AdapterKind, models: Vec<String>) -> Self {
        self.overrides.insert(kind, models);
        self
    }

    pub fn is_overridden(&self, kind: AdapterKind) -> bool {
        self.overrides.contains_key(&kind)
    }

    pub fn targets(&self, kind: AdapterKind) -> Vec<String> {
        self.overrides.get(&kind).cloned().unwrap_or_else(|| {
            kind.default_models()
                .iter()
                .map(|m| (*m).to_owned())
                .collect()
        })
    }

    /// Whether an entity with `declared` model is in scope for `kind`.
    pub fn matches(&self, kind: AdapterKind, declared: &str) -> bool {
        match self.overrides.get(&kind) {
            Some(models) => models.iter().any(|t| model_matches(declared, t)),
            None => kind
                .default_models()
                .iter()
                .any(|t| model_matches(declared, t)),
        }
    }
}
