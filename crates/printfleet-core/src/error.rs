// ── Core error types ──
//
// Errors that end a run. Per-device trouble never shows up here: adapters
// report it as `ProbeFailure` data and the orchestrator records it in the
// run summary. Only the inventory document itself (load, layout, persist)
// and invalid run requests are fatal.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Inventory document ───────────────────────────────────────────
    #[error("Inventory document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("Cannot read inventory document {}: {source}", path.display())]
    DocumentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Inventory document {} is not valid JSON: {source}", path.display())]
    DocumentParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unexpected inventory layout: {message}")]
    DocumentLayout { message: String },

    #[error("Cannot write inventory document {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Lookup data ──────────────────────────────────────────────────
    #[error("Cannot load code catalog {}: {message}", path.display())]
    Catalog { path: PathBuf, message: String },

    // ── Requests ─────────────────────────────────────────────────────
    #[error("Unknown adapter '{name}' (expected one of: {known})")]
    UnknownAdapter { name: String, known: String },

    #[error("Invalid run request: {message}")]
    InvalidRequest { message: String },
}

impl CoreError {
    /// Whether the run failed while writing the document back.
    pub fn is_persist_failure(&self) -> bool {
        matches!(self, Self::Persist { .. })
    }
}
