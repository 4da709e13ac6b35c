//! Output formatting: table, JSON, YAML.
//!
//! Renders data in the format selected by `--output`. Tables use `tabled`
//! with `owo-colors` highlighting, structured formats serialize the
//! original data with serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use printfleet_core::{EntityOutcome, FailureRecord, LinkStatus, RunSummary};
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn paint_status(status: Option<LinkStatus>, color: bool) -> String {
    match (status, color) {
        (None, _) => "-".into(),
        (Some(s), false) => s.to_string(),
        (Some(LinkStatus::Online), true) => LinkStatus::Online.green().to_string(),
        (Some(LinkStatus::Offline), true) => LinkStatus::Offline.red().to_string(),
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl EntityRow {
    fn new(outcome: &EntityOutcome, color: bool) -> Self {
        let summary = outcome.summary.as_deref().filter(|s| !s.is_empty());
        let result = match (summary, outcome.reason.as_deref()) {
            (Some(s), _) if outcome.status != Some(LinkStatus::Offline) => s.to_owned(),
            (_, Some(r)) if color => r.dimmed().to_string(),
            (_, Some(r)) => r.to_owned(),
            (Some(s), None) => s.to_owned(),
            (None, None) => String::new(),
        };
        Self {
            id: dash_if_empty(&outcome.id),
            model: dash_if_empty(&outcome.model),
            address: dash_if_empty(&outcome.address),
            status: paint_status(outcome.status, color),
            result,
        }
    }
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&FailureRecord> for FailureRow {
    fn from(f: &FailureRecord) -> Self {
        Self {
            id: dash_if_empty(&f.id),
            address: dash_if_empty(&f.address),
            kind: f.kind.to_string(),
            reason: f.reason.clone(),
        }
    }
}

fn dash_if_empty(s: &str) -> String {
    if s.is_empty() { "-".into() } else { s.to_owned() }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a run summary. With `failures_only`, only the failure list is
/// shown (or serialized).
pub fn render_summary(
    format: &OutputFormat,
    summary: &RunSummary,
    failures_only: bool,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(summary_table(summary, failures_only, color)),
        OutputFormat::Json if failures_only => render_json(&summary.failures, false),
        OutputFormat::Json => render_json(summary, false),
        OutputFormat::JsonCompact if failures_only => render_json(&summary.failures, true),
        OutputFormat::JsonCompact => render_json(summary, true),
        OutputFormat::Yaml if failures_only => render_yaml(&summary.failures),
        OutputFormat::Yaml => render_yaml(summary),
    }
}

fn summary_table(summary: &RunSummary, failures_only: bool, color: bool) -> String {
    let mut out = String::new();
    if failures_only {
        if !summary.failures.is_empty() {
            let rows: Vec<FailureRow> = summary.failures.iter().map(FailureRow::from).collect();
            out.push_str(&render_table(&rows));
            out.push('\n');
        }
    } else if !summary.entities.is_empty() {
        let rows: Vec<EntityRow> = summary
            .entities
            .iter()
            .map(|e| EntityRow::new(e, color))
            .collect();
        out.push_str(&render_table(&rows));
        out.push('\n');
    }

    let elapsed = (summary.finished_at - summary.started_at).num_milliseconds();
    let tally = format!(
        "{}: processed {}, online {}, offline {} ({:.1}s)",
        summary.adapter,
        summary.processed,
        summary.online,
        summary.offline,
        f64::from(i32::try_from(elapsed).unwrap_or(i32::MAX)) / 1000.0,
    );
    if color {
        out.push_str(&tally.bold().to_string());
    } else {
        out.push_str(&tally);
    }
    if !summary.persisted {
        out.push_str("\ninventory unchanged");
    }
    out
}

/// Render any serializable value in a structured format; tables fall back
/// to pretty JSON.
pub fn render_value<T: serde::Serialize + ?Sized>(
    format: &OutputFormat,
    data: &T,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Render table rows with the standard style.
pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use printfleet_core::{AdapterKind, FailureKind};

    fn summary() -> RunSummary {
        let now = Utc::now();
        RunSummary {
            adapter: AdapterKind::SnmpAlerts,
            started_at: now,
            finished_at: now,
            processed: 2,
            online: 1,
            offline: 1,
            failures: vec![FailureRecord {
                id: "P-2".into(),
                address: "-".into(),
                kind: FailureKind::NotApplicable,
                reason: "no usable address".into(),
            }],
            entities: vec![
                EntityOutcome {
                    id: "P-1".into(),
                    model: "M527".into(),
                    address: "10.0.0.5".into(),
                    status: Some(LinkStatus::Online),
                    value: None,
                    summary: Some("Door open (critical)".into()),
                    reason: None,
                    written: true,
                },
                EntityOutcome {
                    id: "P-2".into(),
                    model: "M527".into(),
                    address: "-".into(),
                    status: Some(LinkStatus::Offline),
                    value: None,
                    summary: None,
                    reason: Some("no usable address".into()),
                    written: true,
                },
            ],
            persisted: true,
        }
    }

    #[test]
    fn table_lists_entities_and_tally() {
        let text = render_summary(&OutputFormat::Table, &summary(), false, false).unwrap();
        assert!(text.contains("Door open (critical)"));
        assert!(text.contains("no usable address"));
        assert!(text.contains("snmp-alerts: processed 2, online 1, offline 1"));
        assert!(!text.contains("inventory unchanged"));
    }

    #[test]
    fn failures_only_json_is_the_failure_list() {
        let text = render_summary(&OutputFormat::JsonCompact, &summary(), true, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["kind"], "not_applicable");
    }
}
