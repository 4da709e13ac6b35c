// ── Raw probe findings ──
//
// What adapters hand back to the engine. Nothing here is normalized:
// severities stay in the device's own vocabulary and descriptions keep
// whatever language and casing the firmware used.

use serde::Serialize;

use crate::error::Error;

// ── Alerts ───────────────────────────────────────────────────────────

/// A severity exactly as the device reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawSeverity {
    /// The row carried no severity column at all.
    Absent,
    /// A bare number (EWS JSON feeds use 0..9 style scales).
    Numeric(i64),
    /// A vendor word such as `"Critical"` or `"StrictWarning"`.
    Token(String),
    /// Printer-MIB `prtAlertSeverityLevel` (RFC 3805).
    MibLevel(i64),
}

/// One row of an alert table or event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRow {
    /// Position the device gave the row. Lower means newer on most firmware.
    pub index: u32,
    pub severity: RawSeverity,
    pub code: Option<String>,
    pub description: Option<String>,
}

impl AlertRow {
    pub fn new(index: u32, severity: RawSeverity) -> Self {
        Self {
            index,
            severity,
            code: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// `hrPrinterDetectedErrorState` bits (RFC 2790), in bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum HardwareFlag {
    LowPaper,
    NoPaper,
    LowToner,
    NoToner,
    DoorOpen,
    Jammed,
    Offline,
    ServiceRequested,
    InputTrayMissing,
    OutputTrayMissing,
    MarkerSupplyMissing,
    OutputNearFull,
    OutputFull,
    InputTrayEmpty,
    OverduePreventMaint,
}

impl HardwareFlag {
    /// Human label used when the bitmask is the only signal available.
    pub fn label(self) -> &'static str {
        match self {
            Self::LowPaper => "Low paper",
            Self::NoPaper => "No paper",
            Self::LowToner => "Low toner",
            Self::NoToner => "No toner",
            Self::DoorOpen => "Door open",
            Self::Jammed => "Paper jam",
            Self::Offline => "Offline",
            Self::ServiceRequested => "Service requested",
            Self::InputTrayMissing => "Input tray missing",
            Self::OutputTrayMissing => "Output tray missing",
            Self::MarkerSupplyMissing => "Supply missing",
            Self::OutputNearFull => "Output bin nearly full",
            Self::OutputFull => "Output bin full",
            Self::InputTrayEmpty => "Input tray empty",
            Self::OverduePreventMaint => "Maintenance overdue",
        }
    }

    /// Conditions that stop the device outright.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Offline | Self::ServiceRequested)
    }
}

/// Everything an alert-capable adapter learned about the device's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertReport {
    pub rows: Vec<AlertRow>,
    /// Only populated by adapters that read `hrPrinterDetectedErrorState`.
    pub hardware_flags: Vec<HardwareFlag>,
    /// Free-form device status line (LEDM `StatusCategory` and friends).
    pub status_text: Option<String>,
}

impl AlertReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.hardware_flags.is_empty() && self.status_text.is_none()
    }
}

// ── Supplies ─────────────────────────────────────────────────────────

/// A single marker supply level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyReading {
    /// Friendly colour name (`Black`, `Cyan`, ..., or `Unknown`).
    pub color: String,
    /// `None` when the device gives no computable fraction.
    pub percent: Option<u8>,
}

/// A cartridge part number and the colour it was found next to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SupplyTypeCode {
    pub color: Option<String>,
    pub code: String,
}

// ── Probe outcome ────────────────────────────────────────────────────

/// The successful result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Findings {
    Alerts(AlertReport),
    Supplies(Vec<SupplyReading>),
    SupplyTypes(Vec<SupplyTypeCode>),
}

/// Why a probe produced no findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Connect, DNS, TLS or socket trouble.
    Transport,
    /// The device answered with something we could not use.
    Protocol,
    /// The hard per-call deadline expired.
    Timeout,
    /// No address to probe.
    NotApplicable,
}

/// A probe failure as data: kind plus a diagnostic line for the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl ProbeFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    pub fn timeout(secs: u64) -> Self {
        Self::new(FailureKind::Timeout, format!("timed out after {secs}s"))
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

impl From<Error> for ProbeFailure {
    fn from(err: Error) -> Self {
        Self::new(err.failure_kind(), err.to_string())
    }
}
