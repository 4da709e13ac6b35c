//! Integration tests for the `printfleet` binary.
//!
//! These exercise argument parsing, help output, completions, error exit
//! codes, and runs whose entities never reach the network.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────

/// A `printfleet` command isolated from the user's config and env.
fn printfleet_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("printfleet");
    cmd.env("HOME", "/tmp/printfleet-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/printfleet-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("PRINTFLEET_CONFIG")
        .env_remove("PRINTFLEET_INVENTORY")
        .env_remove("PRINTFLEET_COMMUNITY")
        .env_remove("PRINTFLEET_TIMEOUT_SECS")
        .env_remove("PRINTFLEET_CONCURRENCY");
    cmd
}

fn write_inventory(dir: &Path, root: &Value) -> PathBuf {
    let path = dir.join("printers.json");
    std::fs::write(&path, serde_json::to_string_pretty(root).unwrap()).unwrap();
    path
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = printfleet_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    printfleet_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("adapters"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    printfleet_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("printfleet"));
}

#[test]
fn test_completions_bash() {
    printfleet_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Adapters & config ───────────────────────────────────────────────

#[test]
fn test_adapters_lists_registry() {
    printfleet_cmd()
        .args(["adapters", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("snmp-alerts")
                .and(predicate::str::contains("ledm-alerts"))
                .and(predicate::str::contains("brother-supplies"))
                .and(predicate::str::contains("\"model_level\": true")),
        );
}

#[test]
fn test_config_show_masks_community() {
    printfleet_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("timeout_secs = 30")
                .and(predicate::str::contains("public").not()),
        );
}

#[test]
fn test_explicit_missing_config_is_usage_error() {
    printfleet_cmd()
        .args(["--config", "/tmp/printfleet-cli-test-nonexistent/x.toml", "adapters"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

// ── Run errors ──────────────────────────────────────────────────────

#[test]
fn test_unknown_adapter_is_usage_error() {
    printfleet_cmd()
        .args(["run", "fax-alerts", "-j", "printers.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown adapter"));
}

#[test]
fn test_missing_inventory_exits_4() {
    printfleet_cmd()
        .args(["run", "snmp-alerts", "-j", "/tmp/printfleet-cli-test-nonexistent/printers.json"])
        .assert()
        .code(4);
}

#[test]
fn test_no_inventory_configured_is_usage_error() {
    printfleet_cmd()
        .args(["run", "snmp-alerts"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("inventory"));
}

#[test]
fn test_insecure_conflicts_with_verify_tls() {
    printfleet_cmd()
        .args(["run", "ews-alerts", "--insecure", "--verify-tls"])
        .assert()
        .code(2);
}

// ── Runs without network ────────────────────────────────────────────

#[test]
fn test_placeholder_address_is_written_offline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_inventory(
        dir.path(),
        &json!({
            "Company_Grouped": [
                {"ID": "P-2", "Type": "M527", "Printer IP": "-", "Branch": "Haifa"}
            ]
        }),
    );

    let output = printfleet_cmd()
        .args(["run", "snmp-alerts", "-o", "json", "-j"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let summary: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["offline"], 1);
    assert_eq!(summary["failures"][0]["reason"], "no usable address");
    assert_eq!(summary["persisted"], true);

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        doc["Company_Grouped"][0],
        json!({
            "ID": "P-2", "Type": "M527", "Printer IP": "-", "Branch": "Haifa",
            "printerInfo": {"status": "offline", "reason": "no usable address"}
        })
    );
}

#[test]
fn test_out_of_scope_models_leave_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_inventory(
        dir.path(),
        &json!([{"ID": "1", "Type": "Canon C3010", "IP": "192.0.2.1"}]),
    );
    let before = std::fs::read(&path).unwrap();

    printfleet_cmd()
        .args(["run", "ledm-alerts", "-j"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("processed 0").and(predicate::str::contains("inventory unchanged")));

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_failures_flag_shows_only_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_inventory(
        dir.path(),
        &json!([
            {"ID": "1", "Type": "M527", "IP": "n/a"},
            {"ID": "2", "Type": "E60155", "IP": ""}
        ]),
    );

    let output = printfleet_cmd()
        .args(["run", "snmp-alerts", "--failures", "-o", "json-compact", "-j"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let failures: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(failures.as_array().map(Vec::len), Some(2));
}
