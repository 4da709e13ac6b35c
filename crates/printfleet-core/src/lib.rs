//! Telemetry enrichment engine for a printer fleet inventory.
//!
//! Sits between the protocol adapters in `printfleet-probe` and the CLI:
//!
//! - **[`Orchestrator`]** -- runs one adapter across the inventory. Selects
//!   entities by declared model (or one explicit address), probes them
//!   concurrently with a hard per-probe deadline and panic isolation, and
//!   merges the outcomes into each entity's status sub-record.
//!
//! - **[`Normalizer`]** -- reduces raw alert findings to a single
//!   [`ErrorState`] in the three-level [`Severity`] taxonomy, using an
//!   optional vendor [`CodeCatalog`] and configurable [`PhraseTables`].
//!
//! - **[`sampling`]** -- model-level attributes are probed on one reachable
//!   unit per model and propagated to its peers.
//!
//! - **[`InventoryStore`]** -- the shared JSON document: read once, patched
//!   in memory with RFC 7396 merge semantics, written back atomically.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod sampling;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EngineConfig;
pub use convert::{Enrichment, StatusPatch};
pub use error::CoreError;
pub use model::{EntityRef, ErrorState, FleetEntity, LinkStatus, Severity, SupplyLevel};
pub use normalize::{CodeCatalog, Normalizer, PhraseTables, Verdict};
pub use orchestrator::{EntityOutcome, FailureRecord, Orchestrator, RunRequest, RunSummary};
pub use probe::Probe;
pub use registry::{ModelRegistry, parse_adapter};
pub use store::{DocumentLayout, InventoryDocument, InventoryStore, StagedWrite};

pub use printfleet_probe::{AdapterKind, FailureKind, ProbeOptions};
