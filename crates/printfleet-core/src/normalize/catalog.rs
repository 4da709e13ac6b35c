//! Vendor alert-code catalog.
//!
//! Loaded once per run from a JSON file. Three shapes are accepted:
//!
//! ```json
//! [{"code": "S2-4211", "status": "CRITICAL", "info": "Door open"}]
//! {"items": [{"code": "S2-4211", "status": "CRITICAL", "info": "Door open"}]}
//! {"S2-4211": {"status": "CRITICAL", "info": "Door open"}}
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use super::classify_token;
use crate::error::CoreError;
use crate::model::Severity;

const DEFAULT_LABEL: &str = "Check printer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub severity: Severity,
    pub label: String,
}

/// Read-only code lookup. Codes are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CodeCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl CodeCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from an already-parsed document. Items without a code are
    /// skipped; an unrecognised shape yields an empty catalog.
    pub fn from_json(value: &Value) -> Self {
        let mut catalog = Self::default();
        match value {
            Value::Array(items) => catalog.add_items(items),
            Value::Object(map) => {
                if let Some(Value::Array(items)) = map.get("items") {
                    catalog.add_items(items);
                } else {
                    for (code, entry) in map {
                        if let Value::Object(fields) = entry {
                            catalog.insert(code, field(fields, "status"), field(fields, "info"));
                        }
                    }
                }
            }
            _ => {}
        }
        catalog
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|e| CoreError::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_json(&value);
        debug!(path = %path.display(), entries = catalog.len(), "code catalog loaded");
        Ok(catalog)
    }

    /// Load if configured; a missing or broken file degrades to an empty
    /// catalog with a warning.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::empty();
        };
        Self::load(path).unwrap_or_else(|e| {
            warn!(error = %e, "continuing without a code catalog");
            Self::empty()
        })
    }

    pub fn get(&self, code: &str) -> Option<&CatalogEntry> {
        self.entries.get(&code.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn add_items(&mut self, items: &[Value]) {
        for item in items {
            if let Value::Object(fields) = item {
                if let Some(code) = field(fields, "code") {
                    self.insert(&code, field(fields, "status"), field(fields, "info"));
                }
            }
        }
    }

    fn insert(&mut self, code: &str, status: Option<String>, info: Option<String>) {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return;
        }
        let severity = status
            .as_deref()
            .and_then(classify_token)
            .unwrap_or(Severity::Informational);
        let label = info
            .map(|i| i.trim().to_owned())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| DEFAULT_LABEL.to_owned());
        self.entries.insert(code, CatalogEntry { severity, label });
    }
}

fn field(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
