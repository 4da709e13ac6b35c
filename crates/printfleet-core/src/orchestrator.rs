// ── Fleet orchestrator ──
//
// One enrichment run: Load -> Select -> Dispatch -> Collect -> Merge ->
// Persist. Probes run as a bounded set of independent futures; each one
// is wrapped in its own deadline and panic guard so a hung or crashing
// device only ever costs its own entity. The document is read once at
// the start and written once at the end, and only if something changed.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{FutureExt, StreamExt, stream};
use printfleet_probe::{AdapterKind, FailureKind, Findings, ProbeFailure, Prober};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, EngineConfig};
use crate::convert::{self, Enrichment, StatusPatch};
use crate::error::CoreError;
use crate::model::{FleetEntity, LinkStatus};
use crate::normalize::{CodeCatalog, Normalizer};
use crate::probe::Probe;
use crate::registry::ModelRegistry;
use crate::sampling::{self, GroupPlan};
use crate::store::{DocumentLayout, InventoryDocument, InventoryStore};

const NO_ADDRESS: &str = "no usable address";

// ── Requests and results ────────────────────────────────────────────

/// Which adapter to run and against what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub adapter: AdapterKind,
    /// Probe only entities at this address, or a one-off entity if none.
    pub only_address: Option<String>,
}

impl RunRequest {
    pub fn new(adapter: AdapterKind) -> Self {
        Self {
            adapter,
            only_address: None,
        }
    }

    #[must_use]
    pub fn only_address(mut self, address: impl Into<String>) -> Self {
        self.only_address = Some(address.into());
        self
    }
}

/// One entity that could not be enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub id: String,
    pub address: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl FailureRecord {
    fn new(entity: &FleetEntity, failure: &ProbeFailure) -> Self {
        Self {
            id: entity.id.clone(),
            address: entity.address.clone(),
            kind: failure.kind,
            reason: failure.reason.clone(),
        }
    }
}

/// Per-entity result, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub id: String,
    pub model: String,
    pub address: String,
    /// `None` for sampling peers whose reachability was not tested.
    pub status: Option<LinkStatus>,
    /// The attribute value written, in document form.
    pub value: Option<Value>,
    pub summary: Option<String>,
    pub reason: Option<String>,
    /// Whether the entity's sub-record was updated.
    pub written: bool,
}

/// Tallies for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub adapter: AdapterKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processed: usize,
    pub online: usize,
    pub offline: usize,
    pub failures: Vec<FailureRecord>,
    pub entities: Vec<EntityOutcome>,
    pub persisted: bool,
}

#[derive(Debug)]
struct Tally {
    processed: usize,
    online: usize,
    offline: usize,
    updated: usize,
    failures: Vec<FailureRecord>,
    entities: Vec<EntityOutcome>,
}

impl Tally {
    fn new() -> Self {
        Self {
            processed: 0,
            online: 0,
            offline: 0,
            updated: 0,
            failures: Vec::new(),
            entities: Vec::new(),
        }
    }

    fn fail(&mut self, adapter: AdapterKind, entity: &FleetEntity, failure: &ProbeFailure) {
        warn!(
            %adapter,
            id = %entity.id,
            address = %entity.address,
            error = %failure,
            "entity offline"
        );
        self.offline += 1;
        self.failures.push(FailureRecord::new(entity, failure));
    }

    fn record(
        &mut self,
        entity: &FleetEntity,
        status: Option<LinkStatus>,
        enrichment: Option<&Enrichment>,
        reason: Option<&str>,
        written: bool,
    ) {
        self.processed += 1;
        if written {
            self.updated += 1;
        }
        self.entities.push(EntityOutcome {
            id: entity.id.clone(),
            model: entity.model.clone(),
            address: entity.address.clone(),
            status,
            value: enrichment.map(Enrichment::to_value),
            summary: enrichment.map(Enrichment::describe),
            reason: reason.map(str::to_owned),
            written,
        });
    }
}

// ── Orchestrator ────────────────────────────────────────────────────

/// Runs adapters across the inventory.
#[derive(Debug)]
pub struct Orchestrator<P> {
    prober: P,
    normalizer: Normalizer,
    models: ModelRegistry,
    layout: DocumentLayout,
    timeout: Duration,
    concurrency: usize,
}

impl Orchestrator<Prober> {
    /// Build the production orchestrator. The code catalog is loaded here,
    /// once per run.
    pub fn from_config(config: &EngineConfig) -> Self {
        let catalog = CodeCatalog::load_or_empty(config.catalog.as_deref());
        Self::new(
            Prober::new(config.probe.clone()),
            Normalizer::new(catalog, config.phrases.clone()),
        )
        .with_models(config.models.clone())
        .with_layout(config.layout.clone())
        .with_timeout(config.timeout)
        .with_concurrency(config.concurrency)
    }
}

impl<P: Probe> Orchestrator<P> {
    pub fn new(prober: P, normalizer: Normalizer) -> Self {
        Self {
            prober,
            normalizer,
            models: ModelRegistry::default(),
            layout: DocumentLayout::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    #[must_use]
    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: DocumentLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run one adapter over the inventory in `store`.
    ///
    /// Device trouble is reported in the summary. Only document load and
    /// persist failures, or an invalid request, return `Err`; in that case
    /// the document on disk is unchanged.
    pub async fn run(
        &self,
        store: &InventoryStore,
        request: &RunRequest,
    ) -> Result<RunSummary, CoreError> {
        let started_at = Utc::now();
        let adapter = request.adapter;

        let mut document = store.load(&self.layout)?;
        let entities = document.entities();
        info!(%adapter, path = %store.path().display(), entities = entities.len(), "inventory loaded");

        let selected = self.select(entities, request)?;
        info!(%adapter, selected = selected.len(), "entities selected");

        let mut tally = Tally::new();
        if adapter.attribute().is_model_level() {
            self.run_sampled(adapter, &mut document, selected, &mut tally)
                .await;
        } else {
            self.run_each(adapter, &mut document, &selected, &mut tally)
                .await;
        }
        info!(
            %adapter,
            processed = tally.processed,
            online = tally.online,
            offline = tally.offline,
            "probes collected"
        );

        let persisted = if tally.updated > 0 {
            store.persist(&document)?;
            info!(path = %store.path().display(), updated = tally.updated, "inventory persisted");
            true
        } else {
            info!("no inventory changes to write");
            false
        };

        Ok(RunSummary {
            adapter,
            started_at,
            finished_at: Utc::now(),
            processed: tally.processed,
            online: tally.online,
            offline: tally.offline,
            failures: tally.failures,
            entities: tally.entities,
            persisted,
        })
    }

    // ── Select ──────────────────────────────────────────────────────

    fn select(
        &self,
        entities: Vec<FleetEntity>,
        request: &RunRequest,
    ) -> Result<Vec<FleetEntity>, CoreError> {
        let Some(raw) = &request.only_address else {
            return Ok(entities
                .into_iter()
                .filter(|e| self.models.matches(request.adapter, &e.model))
                .collect());
        };

        let target = raw.trim();
        if target.is_empty() {
            return Err(CoreError::InvalidRequest {
                message: "target address is empty".into(),
            });
        }
        let matched: Vec<FleetEntity> = entities
            .into_iter()
            .filter(|e| {
                e.usable_address()
                    .is_some_and(|a| a.eq_ignore_ascii_case(target))
            })
            .collect();
        if matched.is_empty() {
            info!(address = target, "address not in inventory, probing a one-off entity");
            return Ok(vec![FleetEntity::synthetic(target)]);
        }
        Ok(matched)
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Probe every `(slot, address)` pair, at most `concurrency` at a time.
    async fn dispatch(
        &self,
        adapter: AdapterKind,
        targets: Vec<(usize, String)>,
    ) -> HashMap<usize, Result<Findings, ProbeFailure>> {
        debug!(%adapter, probes = targets.len(), concurrency = self.concurrency, "dispatching");
        stream::iter(targets)
            .map(|(slot, address)| async move {
                let outcome = self.guarded(adapter, &address).await;
                (slot, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn guarded(&self, adapter: AdapterKind, address: &str) -> Result<Findings, ProbeFailure> {
        let call = AssertUnwindSafe(self.prober.probe(adapter, address)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ProbeFailure::timeout(self.timeout.as_secs())),
            Ok(Err(_)) => Err(ProbeFailure::new(FailureKind::Protocol, "probe panicked")),
            Ok(Ok(result)) => result,
        }
    }

    // ── Collect & merge ─────────────────────────────────────────────

    async fn run_each(
        &self,
        adapter: AdapterKind,
        document: &mut InventoryDocument,
        entities: &[FleetEntity],
        tally: &mut Tally,
    ) {
        let targets = entities
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.usable_address().map(|a| (slot, a.to_owned())))
            .collect();
        let mut results = self.dispatch(adapter, targets).await;

        for (slot, entity) in entities.iter().enumerate() {
            let outcome = results
                .remove(&slot)
                .unwrap_or_else(|| Err(no_address()));
            match outcome {
                Ok(findings) => {
                    let enrichment = self.enrich(adapter, entity, &findings);
                    let written = write(document, entity, &convert::online_patch(&enrichment));
                    tally.online += 1;
                    tally.record(
                        entity,
                        Some(LinkStatus::Online),
                        Some(&enrichment),
                        None,
                        written,
                    );
                }
                Err(failure) => {
                    tally.fail(adapter, entity, &failure);
                    let patch = convert::offline_patch(&failure.reason);
                    let written = write(document, entity, &patch);
                    tally.record(
                        entity,
                        Some(LinkStatus::Offline),
                        None,
                        Some(&failure.reason),
                        written,
                    );
                }
            }
        }
    }

    async fn run_sampled(
        &self,
        adapter: AdapterKind,
        document: &mut InventoryDocument,
        entities: Vec<FleetEntity>,
        tally: &mut Tally,
    ) {
        let groups = sampling::group_by_model(entities);
        let plans: Vec<GroupPlan> = groups
            .iter()
            .map(|g| sampling::plan(g, document))
            .collect();

        let targets = groups
            .iter()
            .zip(&plans)
            .enumerate()
            .filter_map(|(slot, (group, plan))| match plan {
                GroupPlan::Probe { index } => group
                    .members
                    .get(*index)
                    .and_then(FleetEntity::usable_address)
                    .map(|a| (slot, a.to_owned())),
                GroupPlan::Reuse(_) | GroupPlan::Unreachable => None,
            })
            .collect();
        let mut results = self.dispatch(adapter, targets).await;

        for (slot, (group, plan)) in groups.iter().zip(plans).enumerate() {
            match plan {
                GroupPlan::Reuse(codes) => {
                    debug!(
                        model = %group.model,
                        members = group.members.len(),
                        "reusing recorded part numbers"
                    );
                    let enrichment = Enrichment::SupplyTypeCodes(codes);
                    propagate(document, &group.members, None, &enrichment, None, tally);
                }
                GroupPlan::Unreachable => {
                    let reason = format!("no reachable address for model {}", group.model);
                    warn!(%adapter, model = %group.model, "{reason}");
                    tally.offline += 1;
                    if let Some(first) = group.members.first() {
                        tally.failures.push(FailureRecord::new(
                            first,
                            &ProbeFailure::new(FailureKind::NotApplicable, reason.clone()),
                        ));
                    }
                    let empty = Enrichment::SupplyTypeCodes(Vec::new());
                    propagate(document, &group.members, None, &empty, Some(&reason), tally);
                }
                GroupPlan::Probe { index } => {
                    let outcome = results
                        .remove(&slot)
                        .unwrap_or_else(|| Err(no_address()));
                    let representative = group.members.get(index);
                    match (outcome, representative) {
                        (Ok(findings), Some(rep)) => {
                            let enrichment = self.enrich(adapter, rep, &findings);
                            info!(
                                model = %group.model,
                                address = %rep.address,
                                codes = %enrichment.describe(),
                                "model sampled"
                            );
                            tally.online += 1;
                            propagate(
                                document,
                                &group.members,
                                Some((index, LinkStatus::Online)),
                                &enrichment,
                                None,
                                tally,
                            );
                        }
                        (Err(failure), Some(rep)) => {
                            tally.fail(adapter, rep, &failure);
                            write(document, rep, &convert::offline_patch(&failure.reason));
                            let empty = Enrichment::SupplyTypeCodes(Vec::new());
                            propagate(
                                document,
                                &group.members,
                                Some((index, LinkStatus::Offline)),
                                &empty,
                                Some(&failure.reason),
                                tally,
                            );
                        }
                        (_, None) => {}
                    }
                }
            }
        }
    }

    fn enrich(&self, adapter: AdapterKind, entity: &FleetEntity, findings: &Findings) -> Enrichment {
        match findings {
            Findings::Alerts(report) => {
                let verdict = self
                    .normalizer
                    .normalize(report, adapter.summarizes_labels());
                debug!(
                    id = %entity.display_name(),
                    code = verdict.code.as_deref().unwrap_or("-"),
                    state = %verdict.state,
                    "alerts normalized"
                );
                Enrichment::ErrorState(verdict.state)
            }
            Findings::Supplies(readings) => Enrichment::Cartridges(convert::cartridges(readings)),
            Findings::SupplyTypes(codes) => Enrichment::SupplyTypeCodes(convert::supply_codes(codes)),
        }
    }
}

fn no_address() -> ProbeFailure {
    ProbeFailure::new(FailureKind::NotApplicable, NO_ADDRESS)
}

/// Copy a model-level value to every member. The representative, if
/// any, also gets its reachability recorded.
fn propagate(
    document: &mut InventoryDocument,
    members: &[FleetEntity],
    representative: Option<(usize, LinkStatus)>,
    enrichment: &Enrichment,
    reason: Option<&str>,
    tally: &mut Tally,
) {
    for (i, member) in members.iter().enumerate() {
        let status = representative.and_then(|(index, status)| (index == i).then_some(status));
        let patch = if status == Some(LinkStatus::Online) {
            convert::online_patch(enrichment)
        } else {
            convert::attribute_patch(enrichment)
        };
        let written = write(document, member, &patch);
        tally.record(member, status, Some(enrichment), reason, written);
    }
}

/// Apply `patch` to the entity's sub-record. One-off entities have no
/// location and are never written.
fn write(document: &mut InventoryDocument, entity: &FleetEntity, patch: &StatusPatch) -> bool {
    let Some(at) = entity.location.as_ref() else {
        return false;
    };
    if !document.apply(at, &patch.fields) {
        return false;
    }
    if let Some((key, value)) = &patch.attribute {
        document.replace(at, key, value.clone());
    }
    true
}
