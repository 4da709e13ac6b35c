#![allow(clippy::unwrap_used)]

// End-to-end runs of the orchestrator against a scripted prober and a
// real inventory file in a temp directory.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use printfleet_core::{
    AdapterKind, FailureKind, InventoryStore, LinkStatus, Normalizer, Orchestrator, Probe,
    RunRequest,
};
use printfleet_probe::{
    AlertReport, AlertRow, Findings, ProbeFailure, RawSeverity, SupplyReading, SupplyTypeCode,
};
use serde_json::{Value, json};

// ── Scripted prober ─────────────────────────────────────────────────

#[derive(Clone)]
enum Script {
    Answer(Findings),
    Fail(ProbeFailure),
    Hang,
    Panic,
}

#[derive(Default)]
struct ScriptedProbe {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    fn on(mut self, address: &str, script: Script) -> Self {
        self.scripts.insert(address.to_owned(), script);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Probe for ScriptedProbe {
    fn probe(
        &self,
        _adapter: AdapterKind,
        address: &str,
    ) -> impl Future<Output = Result<Findings, ProbeFailure>> + Send {
        self.calls.lock().unwrap().push(address.to_owned());
        let script = self.scripts.get(address).cloned();
        async move {
            match script {
                Some(Script::Answer(findings)) => Ok(findings),
                Some(Script::Fail(failure)) => Err(failure),
                Some(Script::Hang) => std::future::pending().await,
                Some(Script::Panic) => panic!("driver bug"),
                None => Err(ProbeFailure::new(FailureKind::Transport, "connection refused")),
            }
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn inventory(root: &Value) -> (tempfile::TempDir, InventoryStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("printers.json");
    std::fs::write(&path, serde_json::to_string_pretty(root).unwrap()).unwrap();
    (dir, InventoryStore::new(path))
}

fn reload(store: &InventoryStore) -> Value {
    serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap()
}

fn path_of(store: &InventoryStore) -> PathBuf {
    store.path().to_path_buf()
}

fn alerts(rows: Vec<AlertRow>) -> Findings {
    Findings::Alerts(AlertReport {
        rows,
        ..AlertReport::default()
    })
}

fn door_open() -> Findings {
    alerts(vec![
        AlertRow::new(2, RawSeverity::MibLevel(4)).with_description("Toner low"),
        AlertRow::new(1, RawSeverity::MibLevel(3)).with_description("Door open"),
    ])
}

fn orchestrator(probe: ScriptedProbe) -> Orchestrator<ScriptedProbe> {
    Orchestrator::new(probe, Normalizer::default())
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn critical_alert_is_written_with_online_status() {
    let (_dir, store) = inventory(&json!({
        "Company_Grouped": [
            {"ID": "P-1", "Type": "M527", "Printer IP": "10.0.0.5", "Branch": "HQ",
             "printerInfo": {"status": "offline", "reason": "timed out after 30s", "cartridges": []}}
        ]
    }));
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.5", Script::Answer(door_open())));

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();

    assert_eq!((summary.processed, summary.online, summary.offline), (1, 1, 0));
    assert!(summary.persisted);
    let doc = reload(&store);
    assert_eq!(
        doc["Company_Grouped"][0],
        json!({
            "ID": "P-1", "Type": "M527", "Printer IP": "10.0.0.5", "Branch": "HQ",
            "printerInfo": {
                "status": "online",
                "cartridges": [],
                "errorState": {"problem": "Door open", "severity": "critical"}
            }
        })
    );
}

#[tokio::test]
async fn unknown_condition_replaces_previous_error_state() {
    let (_dir, store) = inventory(&json!([
        {"ID": "P-3", "Type": "M527", "IP": "10.0.0.7",
         "printerInfo": {
             "status": "online",
             "errorState": {"problem": "Door open", "severity": "critical", "code": "40.00.01"}
         }}
    ]));
    let unknown = alerts(vec![
        AlertRow::new(1, RawSeverity::MibLevel(3)).with_description("Unknown condition"),
    ]);
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.7", Script::Answer(unknown)));

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();

    let expected = json!({"problem": null, "severity": "informational"});
    assert_eq!(summary.entities[0].value.as_ref(), Some(&expected));
    assert_eq!(reload(&store)[0]["printerInfo"]["errorState"], expected);
}

#[tokio::test]
async fn placeholder_address_goes_offline_without_probing() {
    let (_dir, store) = inventory(&json!({
        "Company_Grouped": [{"ID": "P-2", "Type": "M527", "Printer IP": "-"}]
    }));
    let orch = orchestrator(ScriptedProbe::default());

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();

    assert!(orch_calls(&orch).is_empty());
    assert_eq!(summary.offline, 1);
    assert_eq!(summary.failures[0].kind, FailureKind::NotApplicable);
    assert_eq!(
        reload(&store)["Company_Grouped"][0]["printerInfo"],
        json!({"status": "offline", "reason": "no usable address"})
    );
}

fn orch_calls(orch: &Orchestrator<ScriptedProbe>) -> Vec<String> {
    orch.prober().calls()
}

#[tokio::test]
async fn models_outside_the_target_set_are_skipped() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M404dn", "IP": "10.0.0.1"},
        {"ID": "2", "Type": "Canon C3010", "IP": "10.0.0.2"}
    ]));
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.1", Script::Answer(door_open())));

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::LedmAlerts))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(orch_calls(&orch), vec!["10.0.0.1".to_owned()]);
    assert!(reload(&store)[1].get("printerInfo").is_none());
}

// ── Isolation ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hung_device_times_out_without_holding_up_the_batch() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M527", "IP": "10.0.0.1"},
        {"ID": "2", "Type": "M527", "IP": "10.0.0.2"},
        {"ID": "3", "Type": "M527", "IP": "10.0.0.3"}
    ]));
    let probe = ScriptedProbe::default()
        .on("10.0.0.1", Script::Answer(door_open()))
        .on("10.0.0.2", Script::Hang)
        .on("10.0.0.3", Script::Answer(alerts(Vec::new())));
    let orch = orchestrator(probe).with_timeout(Duration::from_secs(5));

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();

    assert_eq!((summary.online, summary.offline), (2, 1));
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].id, "2");
    assert_eq!(summary.failures[0].kind, FailureKind::Timeout);
    assert_eq!(summary.failures[0].reason, "timed out after 5s");

    let doc = reload(&store);
    assert_eq!(doc[0]["printerInfo"]["errorState"]["problem"], "Door open");
    assert_eq!(doc[1]["printerInfo"]["status"], "offline");
    assert_eq!(
        doc[2]["printerInfo"]["errorState"],
        json!({"problem": "Ready", "severity": "informational"})
    );
}

#[tokio::test]
async fn panicking_probe_only_affects_its_own_entity() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M527", "IP": "10.0.0.1"},
        {"ID": "2", "Type": "M527", "IP": "10.0.0.2"}
    ]));
    let probe = ScriptedProbe::default()
        .on("10.0.0.1", Script::Panic)
        .on("10.0.0.2", Script::Answer(door_open()));
    let orch = orchestrator(probe);

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();

    assert_eq!((summary.online, summary.offline), (1, 1));
    assert_eq!(summary.failures[0].kind, FailureKind::Protocol);
    let doc = reload(&store);
    assert_eq!(doc[0]["printerInfo"]["reason"], "probe panicked");
    assert_eq!(doc[1]["printerInfo"]["status"], "online");
}

// ── Explicit targets ────────────────────────────────────────────────

#[tokio::test]
async fn unknown_target_is_probed_but_never_written() {
    let root = json!([{"ID": "1", "Type": "M527", "IP": "10.0.0.1"}]);
    let (_dir, store) = inventory(&root);
    let before = std::fs::read(path_of(&store)).unwrap();
    let orch = orchestrator(ScriptedProbe::default().on("10.9.9.9", Script::Answer(door_open())));

    let summary = orch
        .run(
            &store,
            &RunRequest::new(AdapterKind::SnmpAlerts).only_address("10.9.9.9"),
        )
        .await
        .unwrap();

    assert_eq!(orch_calls(&orch), vec!["10.9.9.9".to_owned()]);
    assert_eq!(summary.online, 1);
    assert!(!summary.persisted);
    assert!(!summary.entities[0].written);
    assert_eq!(
        summary.entities[0].value,
        Some(json!({"problem": "Door open", "severity": "critical"}))
    );
    assert_eq!(std::fs::read(path_of(&store)).unwrap(), before);
}

#[tokio::test]
async fn explicit_target_ignores_model_scope() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "Canon C3010", "IP": "10.0.0.7"},
        {"ID": "2", "Type": "M527", "IP": "10.0.0.8"}
    ]));
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.7", Script::Answer(door_open())));

    let summary = orch
        .run(
            &store,
            &RunRequest::new(AdapterKind::SnmpAlerts).only_address(" 10.0.0.7 "),
        )
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    let doc = reload(&store);
    assert_eq!(doc[0]["printerInfo"]["status"], "online");
    assert!(doc[1].get("printerInfo").is_none());
}

// ── Sampling ────────────────────────────────────────────────────────

#[tokio::test]
async fn one_probe_per_model_group() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M404dn", "IP": ""},
        {"ID": "2", "Type": "M404dn", "IP": "10.0.0.2"},
        {"ID": "3", "Type": "m404dn", "IP": "10.0.0.3"}
    ]));
    let codes = Findings::SupplyTypes(vec![
        SupplyTypeCode { color: Some("Black".into()), code: "CF259A".into() },
    ]);
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.2", Script::Answer(codes)));

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpSupplyTypes))
        .await
        .unwrap();

    assert_eq!(orch_calls(&orch), vec!["10.0.0.2".to_owned()]);
    assert_eq!((summary.processed, summary.online, summary.offline), (3, 1, 0));
    let doc = reload(&store);
    for entity in doc.as_array().unwrap() {
        assert_eq!(entity["printerInfo"]["supplyTypeCodes"], json!(["CF259A"]));
    }
    assert!(doc[0]["printerInfo"].get("status").is_none());
    assert_eq!(doc[1]["printerInfo"]["status"], "online");
    assert!(doc[2]["printerInfo"].get("status").is_none());
}

#[tokio::test]
async fn recorded_codes_skip_probing() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M404dn", "IP": "10.0.0.1"},
        {"ID": "2", "Type": "M404dn", "IP": "10.0.0.2",
         "printerInfo": {"supplyTypeCodes": "CF259A"}}
    ]));
    let orch = orchestrator(ScriptedProbe::default());

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpSupplyTypes))
        .await
        .unwrap();

    assert!(orch_calls(&orch).is_empty());
    assert!(summary.failures.is_empty());
    assert_eq!(reload(&store)[0]["printerInfo"]["supplyTypeCodes"], json!(["CF259A"]));
}

#[tokio::test]
async fn failed_representative_leaves_the_group_empty() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M404dn", "IP": "10.0.0.1"},
        {"ID": "2", "Type": "M404dn", "IP": "10.0.0.2"},
        {"ID": "3", "Type": "E60155", "IP": "n/a"}
    ]));
    let orch = orchestrator(ScriptedProbe::default());

    let summary = orch
        .run(&store, &RunRequest::new(AdapterKind::SnmpSupplyTypes))
        .await
        .unwrap();

    assert_eq!(orch_calls(&orch), vec!["10.0.0.1".to_owned()]);
    assert_eq!(summary.offline, 2);
    let reasons: Vec<&str> = summary.failures.iter().map(|f| f.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec!["connection refused", "no reachable address for model E60155"]
    );

    let doc = reload(&store);
    assert_eq!(
        doc[0]["printerInfo"],
        json!({"status": "offline", "reason": "connection refused", "supplyTypeCodes": []})
    );
    assert_eq!(doc[1]["printerInfo"], json!({"supplyTypeCodes": []}));
    assert_eq!(doc[2]["printerInfo"], json!({"supplyTypeCodes": []}));
}

// ── Supplies ────────────────────────────────────────────────────────

#[tokio::test]
async fn supply_levels_replace_previous_cartridges() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "MFC-L9570CDW", "IP": "10.0.0.1",
         "printerInfo": {"cartridges": [{"cartridgeColor": "Black", "remainingPercent": 90}],
                         "supplyTypeCodes": ["TN-910BK"]}}
    ]));
    let readings = Findings::Supplies(vec![
        SupplyReading { color: "Black".into(), percent: Some(12) },
        SupplyReading { color: "Cyan".into(), percent: None },
    ]);
    let orch = orchestrator(ScriptedProbe::default().on("10.0.0.1", Script::Answer(readings)));

    orch.run(&store, &RunRequest::new(AdapterKind::BrotherSupplies))
        .await
        .unwrap();

    assert_eq!(
        reload(&store)[0]["printerInfo"],
        json!({
            "cartridges": [
                {"cartridgeColor": "Black", "remainingPercent": 12},
                {"cartridgeColor": "Cyan", "remainingPercent": null}
            ],
            "supplyTypeCodes": ["TN-910BK"],
            "status": "online"
        })
    );
}

// ── Fatal errors ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_inventory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = InventoryStore::new(dir.path().join("absent.json"));
    let err = orchestrator(ScriptedProbe::default())
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap_err();
    assert!(matches!(err, printfleet_core::CoreError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn empty_target_is_rejected() {
    let (_dir, store) = inventory(&json!([]));
    let err = orchestrator(ScriptedProbe::default())
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts).only_address("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, printfleet_core::CoreError::InvalidRequest { .. }));
}

#[tokio::test]
async fn status_column_reports_link_state() {
    let (_dir, store) = inventory(&json!([
        {"ID": "1", "Type": "M527", "IP": "10.0.0.1"}
    ]));
    let summary = orchestrator(ScriptedProbe::default())
        .run(&store, &RunRequest::new(AdapterKind::SnmpAlerts))
        .await
        .unwrap();
    assert_eq!(summary.entities[0].status, Some(LinkStatus::Offline));
    assert_eq!(summary.entities[0].reason.as_deref(), Some("connection refused"));
}
