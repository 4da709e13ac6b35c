// ── Engine configuration ──
//
// Everything one enrichment run needs, already resolved. Loading it from
// files and the environment is `printfleet-config`'s job.

use std::path::PathBuf;
use std::time::Duration;

use printfleet_probe::ProbeOptions;

use crate::normalize::PhraseTables;
use crate::registry::ModelRegistry;
use crate::store::DocumentLayout;

/// Hard per-probe deadline when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Probes in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Inventory document to enrich.
    pub inventory: PathBuf,
    /// Optional vendor code catalog.
    pub catalog: Option<PathBuf>,
    pub timeout: Duration,
    pub concurrency: usize,
    pub probe: ProbeOptions,
    pub layout: DocumentLayout,
    pub phrases: PhraseTables,
    pub models: ModelRegistry,
}

impl EngineConfig {
    pub fn new(inventory: impl Into<PathBuf>) -> Self {
        Self {
            inventory: inventory.into(),
            catalog: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            probe: ProbeOptions::default(),
            layout: DocumentLayout::default(),
            phrases: PhraseTables::default(),
            models: ModelRegistry::default(),
        }
    }
}
