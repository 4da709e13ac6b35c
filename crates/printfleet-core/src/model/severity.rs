use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Canonical severity. Ordered so that `Critical` is the greatest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    Informational,
    Warning,
    Critical,
}

/// The single most urgent condition on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    /// Human label; `None` when the device could not say.
    pub problem: Option<String>,
    pub severity: Severity,
}

impl ErrorState {
    pub fn new(problem: impl Into<String>, severity: Severity) -> Self {
        Self {
            problem: Some(problem.into()),
            severity,
        }
    }

    /// The idle state: `{"Ready", informational}`.
    pub fn ready() -> Self {
        Self::new("Ready", Severity::Informational)
    }

    pub fn sleeping() -> Self {
        Self::new("Sleeping", Severity::Informational)
    }

    pub fn unknown() -> Self {
        Self {
            problem: None,
            severity: Severity::Informational,
        }
    }
}

impl std::fmt::Display for ErrorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            Some(problem) => write!(f, "{problem} ({})", self.severity),
            None => write!(f, "unknown ({})", self.severity),
        }
    }
}
