// ── Severity normalizer ──
//
// Reduces one adapter's raw alert report to a single `ErrorState`. Pure
// and deterministic: the catalog and phrase tables are fixed for the run
// and nothing here touches the network or the clock.
//
// Selection, first match wins, lowest row index within a tier:
//   1. rows classified critical
//   2. rows classified warning
//   3. any remaining row that carries a label
//   4. the hardware error bitmask
//   5. the device's free-form status line
//   6. "Normal"
// Canonical overrides (ready / sleeping / unknown) are applied to the
// winner last.

mod catalog;
mod phrases;

pub use catalog::{CatalogEntry, CodeCatalog};
pub use phrases::{Cleaned, PhraseTables};

use printfleet_probe::ews::find_device_code;
use printfleet_probe::{AlertReport, AlertRow, HardwareFlag, RawSeverity};
use tracing::trace;

use crate::model::{ErrorState, Severity};

const CRITICAL_WORDS: &[&str] = &[
    "jam", "door", "open", "cover", "fault", "failure", "error", "empty", "replace",
];
const WARNING_WORDS: &[&str] = &[
    "low",
    "depleted",
    "almost",
    "calibrat",
    "warming",
    "busy",
    "sleep",
    "power saver",
    "attention",
];

/// The outcome of normalizing one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub state: ErrorState,
    /// Vendor code behind the chosen row. Logged, never stored.
    pub code: Option<String>,
}

#[derive(Debug)]
struct Candidate {
    severity: Option<Severity>,
    label: String,
    code: Option<String>,
}

/// Catalog and phrase tables bound together for one run.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    catalog: CodeCatalog,
    phrases: PhraseTables,
}

impl Normalizer {
    pub fn new(catalog: CodeCatalog, phrases: PhraseTables) -> Self {
        Self { catalog, phrases }
    }

    pub fn catalog(&self) -> &CodeCatalog {
        &self.catalog
    }

    pub fn phrases(&self) -> &PhraseTables {
        &self.phrases
    }

    /// Pick the most urgent condition in `report`. With `summarize`, row
    /// labels are condensed to short fixed phrases.
    pub fn normalize(&self, report: &AlertReport, summarize: bool) -> Verdict {
        let mut rows: Vec<&AlertRow> = report.rows.iter().collect();
        rows.sort_by_key(|row| row.index);
        let candidates: Vec<Candidate> = rows
            .into_iter()
            .filter_map(|row| self.candidate(row, summarize))
            .collect();

        let chosen = [Some(Severity::Critical), Some(Severity::Warning)]
            .iter()
            .find_map(|tier| candidates.iter().find(|c| c.severity == *tier))
            .or_else(|| candidates.first());

        if let Some(candidate) = chosen {
            let severity = candidate
                .severity
                .unwrap_or_else(|| keyword_severity(&candidate.label));
            trace!(label = %candidate.label, ?severity, "alert row selected");
            return Verdict {
                state: self.finalize(Some(&candidate.label), severity),
                code: candidate.code.clone(),
            };
        }

        if let Some(state) = hardware_state(&report.hardware_flags) {
            return Verdict {
                state: self.finalize(state.problem.as_deref(), state.severity),
                code: None,
            };
        }

        if let Cleaned::Text(status) = self.phrases.clean(report.status_text.as_deref()) {
            let severity = keyword_severity(&status);
            return Verdict {
                state: self.finalize(Some(&status), severity),
                code: None,
            };
        }

        Verdict {
            state: self.finalize(Some("Normal"), Severity::Informational),
            code: None,
        }
    }

    /// Turn one row into a ranked candidate, or drop it. A catalog hit on
    /// the row's code (or a code embedded in its text) decides both label
    /// and severity. Rows whose text is a known-benign phrase are dropped.
    fn candidate(&self, row: &AlertRow, summarize: bool) -> Option<Candidate> {
        let description = self.phrases.clean(row.description.as_deref());
        let code = row
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or_else(|| description.text().and_then(find_device_code))
            .map(str::to_owned);

        if let Some(entry) = code.as_deref().and_then(|c| self.catalog.get(c)) {
            return Some(Candidate {
                severity: Some(entry.severity),
                label: entry.label.clone(),
                code,
            });
        }

        let label = match &description {
            Cleaned::Suppressed => return None,
            _ if summarize => summary_label(description.text().unwrap_or_default()).to_owned(),
            Cleaned::Text(text) => text.clone(),
            Cleaned::Absent => format!("Code {}", code.as_deref()?),
        };

        Some(Candidate {
            severity: classify(&row.severity),
            label,
            code,
        })
    }

    /// Apply the canonical overrides to a chosen label.
    pub fn finalize(&self, problem: Option<&str>, severity: Severity) -> ErrorState {
        let text = problem.map(str::trim).unwrap_or_default();
        let lower = text.to_lowercase();

        if lower.is_empty() || lower == "normal" {
            return ErrorState::ready();
        }
        if lower.contains("sleep")
            || lower.contains("inpowersave")
            || self.phrases.is_sleep_alias(text)
        {
            return ErrorState::sleeping();
        }
        if lower.contains("unknown") {
            return ErrorState::unknown();
        }
        let says_ready =
            lower.contains("ready") && !lower.contains("not ready") && !lower.contains("unready");
        if says_ready
            || lower.contains("acknowledgeconsumablestate")
            || self.phrases.is_ready_alias(text)
        {
            return ErrorState::ready();
        }
        ErrorState::new(text, severity)
    }
}

/// Map a raw severity into the taxonomy. `None` means the device gave no
/// usable classification (no column, or Printer-MIB `other`/`unknown`).
pub fn classify(raw: &RawSeverity) -> Option<Severity> {
    match raw {
        RawSeverity::Absent => None,
        RawSeverity::Numeric(n) => Some(classify_number(*n)),
        RawSeverity::Token(token) => classify_token(token),
        // RFC 3805 PrtAlertSeverityLevelTC
        RawSeverity::MibLevel(level) => match level {
            3 => Some(Severity::Critical),
            4 | 5 => Some(Severity::Warning),
            _ => None,
        },
    }
}

/// Vendor words and numeric strings. Unrecognised words are
/// informational; a blank token is no classification at all.
pub fn classify_token(token: &str) -> Option<Severity> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(classify_number(n));
    }
    let severity = match token.to_lowercase().as_str() {
        "critical" | "fatal" | "error" | "severe" | "stricterror" => Severity::Critical,
        "warning" | "warn" | "attention" | "strictwarning" => Severity::Warning,
        _ => Severity::Informational,
    };
    Some(severity)
}

fn classify_number(n: i64) -> Severity {
    if n >= 6 {
        Severity::Critical
    } else if n >= 3 {
        Severity::Warning
    } else {
        Severity::Informational
    }
}

/// Severity guessed from free text, for rows with no structured severity.
pub fn keyword_severity(text: &str) -> Severity {
    let lower = text.to_lowercase();
    if CRITICAL_WORDS.iter().any(|w| lower.contains(w)) {
        Severity::Critical
    } else if WARNING_WORDS.iter().any(|w| lower.contains(w)) {
        Severity::Warning
    } else {
        Severity::Informational
    }
}

/// Short fixed label for a console alert description.
pub fn summary_label(description: &str) -> &'static str {
    let d = description.trim().to_lowercase();
    if d.is_empty() {
        return "Normal";
    }
    let has = |w: &str| d.contains(w);
    if has("door") {
        "Door open"
    } else if has("jam") {
        "Paper jam"
    } else if has("toner") && has("detect") {
        "Toner not detected"
    } else if has("toner") && (has("empty") || has("end")) {
        "Toner empty"
    } else if (has("drum") || has("imaging unit")) && has("not") && has("install") {
        "Drum not installed"
    } else if (has("drum") || has("imaging unit")) && (has("end") || has("replace")) {
        "Replace drum now"
    } else if has("transfer") {
        "Transfer roller fault"
    } else if has("scanner") {
        "Scanner error"
    } else if has("fuser") {
        "Fuser error"
    } else {
        "Check printer"
    }
}

/// Fallback from the host-resources bitmask: every raised flag, joined.
fn hardware_state(flags: &[HardwareFlag]) -> Option<ErrorState> {
    if flags.is_empty() {
        return None;
    }
    let label = flags
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ");
    let severity = if flags.iter().any(|f| f.is_blocking()) {
        Severity::Critical
    } else {
        Severity::Warning
    };
    Some(ErrorState::new(label, severity))
}
