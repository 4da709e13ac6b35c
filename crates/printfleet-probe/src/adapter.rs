// ── Adapter registry ──
//
// The closed set of device protocols printfleet knows how to speak.
// Each variant names one transport + payload combination and the
// inventory attribute it enriches.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Inventory attribute an adapter fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Attribute {
    /// Single most urgent condition (`errorState`).
    ErrorState,
    /// Per-colour supply levels (`cartridges`).
    SupplyLevels,
    /// Accepted cartridge part numbers (`supplyTypeCodes`), model-level.
    SupplyTypeCodes,
}

impl Attribute {
    /// Model-invariant attributes are probed once per model group.
    pub fn is_model_level(self) -> bool {
        matches!(self, Self::SupplyTypeCodes)
    }
}

/// One registered adapter.
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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AdapterKind {
    /// Printer-MIB alert table with the host-resources bitmask as fallback.
    SnmpAlerts,
    /// HP LEDM `ProductStatusDyn.xml` + `EventTable.xml`.
    LedmAlerts,
    /// SWS/EWS active-alert JSON feed, HTML table fallback.
    EwsAlerts,
    /// Printer-MIB marker supplies table.
    SnmpSupplies,
    /// Brother `general/status.html` toner gauges.
    BrotherSupplies,
    /// Part numbers embedded in Printer-MIB supply descriptions.
    SnmpSupplyTypes,
    /// Part numbers scraped from SWS supply pages.
    EwsSupplyTypes,
}

impl AdapterKind {
    pub fn attribute(self) -> Attribute {
        match self {
            Self::SnmpAlerts | Self::LedmAlerts | Self::EwsAlerts => Attribute::ErrorState,
            Self::SnmpSupplies | Self::BrotherSupplies => Attribute::SupplyLevels,
            Self::SnmpSupplyTypes | Self::EwsSupplyTypes => Attribute::SupplyTypeCodes,
        }
    }

    pub fn transport(self) -> &'static str {
        match self {
            Self::SnmpAlerts | Self::SnmpSupplies | Self::SnmpSupplyTypes => "snmp",
            Self::LedmAlerts => "http/xml",
            Self::EwsAlerts | Self::EwsSupplyTypes => "http/json",
            Self::BrotherSupplies => "http/html",
        }
    }

    /// Whether problem labels should be condensed to a short summary.
    pub fn summarizes_labels(self) -> bool {
        matches!(self, Self::EwsAlerts)
    }

    /// Model tags targeted when no configuration overrides them.
    pub fn default_models(self) -> &'static [&'static str] {
        match self {
            Self::SnmpAlerts => &[
                "E60055",
                "E60155",
                "E72525",
                "M527",
                "SL-M3820ND",
                "SL-M3870FD",
                "MFP-P57750-XC",
                "MFC-L9570CDW",
                "MFC-L6900DW",
            ],
            Self::LedmAlerts => &["M402dn", "M404dn", "M426fdn", "M426fdw", "M477fnw", "M521dn"],
            Self::EwsAlerts | Self::EwsSupplyTypes => &["408dn", "MFP432"],
            Self::SnmpSupplies => &[
                "M402dn",
                "M404dn",
                "M426fdn",
                "M426fdw",
                "M477fnw",
                "M521dn",
                "E60055",
                "E60155",
                "E72525",
                "M527",
                "SL-M3820ND",
                "SL-M3870FD",
                "MFP-P57750-XC",
                "408dn",
                "MFP432",
            ],
            Self::BrotherSupplies => &["MFC-L9570CDW", "MFC-L6900DW"],
            Self::SnmpSupplyTypes => &[
                "M402dn",
                "M404dn",
                "M426fdn",
                "M426fdw",
                "M477fnw",
                "M521dn",
                "E60055",
                "E60155",
                "E72525",
                "M527",
                "MFP-P57750-XC",
                "MFC-L9570CDW",
                "MFC-L6900DW",
                "SL-M3820ND",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip_through_kebab_case() {
        for kind in AdapterKind::iter() {
            let name = kind.to_string();
            assert_eq!(name.parse::<AdapterKind>().ok(), Some(kind), "{name}");
        }
        assert_eq!(
            "SNMP-Alerts".parse::<AdapterKind>().ok(),
            Some(AdapterKind::SnmpAlerts)
        );
    }

    #[test]
    fn only_supply_types_are_model_level() {
        let model_level: Vec<_> = AdapterKind::iter()
            .filter(|k| k.attribute().is_model_level())
            .collect();
        assert_eq!(
            model_level,
            vec![AdapterKind::SnmpSupplyTypes, AdapterKind::EwsSupplyTypes]
        );
    }

    #[test]
    fn every_adapter_targets_some_model() {
        for kind in AdapterKind::iter() {
            assert!(!kind.default_models().is_empty(), "{kind}");
        }
    }
}
