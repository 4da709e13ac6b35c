//! Printer-MIB (RFC 3805) and Host-Resources (RFC 2790) table readers.
//!
//! Parsing is split from I/O: the `parse_*` functions take walked varbinds
//! and are pure, the `read_*` functions drive an [`SnmpClient`]. Varbinds
//! whose OID does not have the column/row shape of the table being read
//! are skipped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::error::Error;
use crate::findings::{AlertReport, AlertRow, HardwareFlag, RawSeverity, SupplyReading, SupplyTypeCode};
use crate::snmp::{Oid, SnmpClient, Value};

/// `prtAlertEntry`
pub const PRT_ALERT_ENTRY: &[u32] = &[1, 3, 6, 1, 2, 1, 43, 18, 1, 1];
/// `hrPrinterDetectedErrorState`
pub const HR_PRINTER_DETECTED_ERROR_STATE: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 3, 5, 1, 2];
/// `prtMarkerSuppliesEntry`
pub const PRT_MARKER_SUPPLIES_ENTRY: &[u32] = &[1, 3, 6, 1, 2, 1, 43, 11, 1, 1];
/// `prtMarkerColorantValue`
pub const PRT_MARKER_COLORANT_VALUE: &[u32] = &[1, 3, 6, 1, 2, 1, 43, 12, 1, 1, 4];

mod alert_col {
    pub const SEVERITY: u32 = 2;
    pub const CODE: u32 = 7;
    pub const DESCRIPTION: u32 = 8;
}

mod supply_col {
    pub const COLORANT_INDEX: u32 = 3;
    pub const TYPE: u32 = 5;
    pub const DESCRIPTION: u32 = 6;
    pub const UNIT: u32 = 7;
    pub const MAX_CAPACITY: u32 = 8;
    pub const LEVEL: u32 = 9;
}

/// `prtMarkerSuppliesType` values that hold toner or ink.
const TONER_SUPPLY_TYPES: [i64; 5] = [3, 5, 6, 10, 21];
/// `prtMarkerSuppliesSupplyUnit` percent(19).
const UNIT_PERCENT: i64 = 19;

// ── Alerts ───────────────────────────────────────────────────────────

/// Rows of `prtAlertTable`, ordered by (device, alert index).
pub fn parse_alert_table(varbinds: &[(Oid, Value)]) -> Vec<AlertRow> {
    let root = Oid::from_arcs(PRT_ALERT_ENTRY);
    let mut rows: BTreeMap<(u32, u32), AlertRow> = BTreeMap::new();

    for (oid, value) in varbinds {
        let Some(&[column, device, index]) = oid.suffix(&root) else {
            continue;
        };
        let row = rows
            .entry((device, index))
            .or_insert_with(|| AlertRow::new(index, RawSeverity::Absent));
        match column {
            alert_col::SEVERITY => {
                if let Some(level) = value.as_i64() {
                    row.severity = RawSeverity::MibLevel(level);
                }
            }
            alert_col::CODE => row.code = value.as_text().filter(|c| !c.trim().is_empty()),
            alert_col::DESCRIPTION => {
                row.description = value
                    .as_text()
                    .map(|d| d.trim().to_owned())
                    .filter(|d| !d.is_empty());
            }
            _ => {}
        }
    }

    rows.into_values().collect()
}

/// Decode `hrPrinterDetectedErrorState`. The value is an SNMP BITS octet
/// string, so bit 0 is the most significant bit of the first octet.
pub fn parse_error_state(varbinds: &[(Oid, Value)]) -> Vec<HardwareFlag> {
    let Some((_, value)) = varbinds.first() else {
        return Vec::new();
    };
    let set = |bit: usize| -> bool {
        match value {
            Value::OctetString(bytes) => bytes
                .get(bit / 8)
                .is_some_and(|byte| *byte & (0x80u8 >> (bit % 8)) != 0),
            Value::Integer(bits) => bit < 63 && (*bits >> bit) & 1 == 1,
            _ => false,
        }
    };
    HardwareFlag::iter()
        .enumerate()
        .filter(|(bit, _)| set(*bit))
        .map(|(_, flag)| flag)
        .collect()
}

/// Walk the alert table and the detected-error bitmask.
pub async fn read_alerts(client: &mut SnmpClient) -> Result<AlertReport, Error> {
    let alerts = client.walk(&Oid::from_arcs(PRT_ALERT_ENTRY)).await?;
    let rows = parse_alert_table(&alerts);

    let hardware_flags = match client.walk(&Oid::from_arcs(HR_PRINTER_DETECTED_ERROR_STATE)).await {
        Ok(varbinds) => parse_error_state(&varbinds),
        Err(e) => {
            debug!(target = %client.target(), error = %e, "error-state walk failed");
            Vec::new()
        }
    };

    Ok(AlertReport {
        rows,
        hardware_flags,
        status_text: None,
    })
}

// ── Supplies ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SupplyRow {
    colorant_index: Option<i64>,
    supply_type: Option<i64>,
    description: Option<String>,
    unit: Option<i64>,
    max_capacity: Option<i64>,
    level: Option<i64>,
}

fn collect_supply_rows(varbinds: &[(Oid, Value)]) -> BTreeMap<(u32, u32), SupplyRow> {
    let root = Oid::from_arcs(PRT_MARKER_SUPPLIES_ENTRY);
    let mut rows: BTreeMap<(u32, u32), SupplyRow> = BTreeMap::new();

    for (oid, value) in varbinds {
        let Some(&[column, device, index]) = oid.suffix(&root) else {
            continue;
        };
        let row = rows.entry((device, index)).or_default();
        match column {
            supply_col::COLORANT_INDEX => row.colorant_index = value.as_i64(),
            supply_col::TYPE => row.supply_type = value.as_i64(),
            supply_col::DESCRIPTION => row.description = value.as_text(),
            supply_col::UNIT => row.unit = value.as_i64(),
            supply_col::MAX_CAPACITY => row.max_capacity = value.as_i64(),
            supply_col::LEVEL => row.level = value.as_i64(),
            _ => {}
        }
    }
    rows
}

fn is_toner(row: &SupplyRow) -> bool {
    row.supply_type.is_some_and(|t| TONER_SUPPLY_TYPES.contains(&t))
}

/// Remaining percentage, or `None` when the agent reports an unknown
/// sentinel (-1 other, -2 unknown, -3 "some remaining") or no capacity.
pub fn supply_percent(level: Option<i64>, max_capacity: Option<i64>, unit: Option<i64>) -> Option<u8> {
    let level = level.filter(|l| *l >= 0)?;
    let percent = if unit == Some(UNIT_PERCENT) {
        i128::from(level)
    } else {
        let max = i128::from(max_capacity.filter(|m| *m > 0)?);
        (i128::from(level) * 100 + max / 2) / max
    };
    u8::try_from(percent.clamp(0, 100)).ok()
}

/// Supply levels for toner-like rows, with colours resolved through the
/// colorant table when the agent exposes it.
pub fn parse_supplies(supplies: &[(Oid, Value)], colorants: &[(Oid, Value)]) -> Vec<SupplyReading> {
    let colorant_root = Oid::from_arcs(PRT_MARKER_COLORANT_VALUE);
    let colorant_names: BTreeMap<(u32, i64), String> = colorants
        .iter()
        .filter_map(|(oid, value)| match oid.suffix(&colorant_root) {
            Some(&[device, index]) => Some(((device, i64::from(index)), value.as_text()?)),
            _ => None,
        })
        .collect();

    collect_supply_rows(supplies)
        .into_iter()
        .filter(|(_, row)| is_toner(row))
        .map(|((device, _), row)| {
            let colorant = row
                .colorant_index
                .and_then(|idx| colorant_names.get(&(device, idx)))
                .map(String::as_str);
            SupplyReading {
                color: resolve_color(colorant, row.description.as_deref()),
                percent: supply_percent(row.level, row.max_capacity, row.unit),
            }
        })
        .collect()
}

/// Walk the supplies table, then the colorant table. A missing colorant
/// table only costs us colour names.
pub async fn read_supplies(client: &mut SnmpClient) -> Result<Vec<SupplyReading>, Error> {
    let supplies = client.walk(&Oid::from_arcs(PRT_MARKER_SUPPLIES_ENTRY)).await?;
    let colorants = match client.walk(&Oid::from_arcs(PRT_MARKER_COLORANT_VALUE)).await {
        Ok(v) => v,
        Err(e) => {
            debug!(target = %client.target(), error = %e, "colorant walk failed");
            Vec::new()
        }
    };
    Ok(parse_supplies(&supplies, &colorants))
}

// ── Supply part numbers ──────────────────────────────────────────────

static PAREN_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\(([A-Z0-9\-]{3,})\)").ok());
static AFTER_VENDOR_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\bHP\b\W*([A-Z0-9\-]{3,})").ok());
static GENERIC_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9\-]{2,})\b").ok());
static VOLTAGE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d{3}V$").ok());

/// Pull a part number out of a supply description such as
/// `"Black Cartridge HP CF259A"` or `"HP Toner (W1470A)"`.
pub fn extract_part_number(description: &str) -> Option<String> {
    if let Some(caps) = PAREN_CODE.as_ref().and_then(|re| re.captures(description)) {
        return caps.get(1).map(|m| m.as_str().to_owned());
    }
    if let Some(token) = AFTER_VENDOR_CODE
        .as_ref()
        .and_then(|re| re.captures(description))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    {
        let is_voltage = VOLTAGE.as_ref().is_some_and(|re| re.is_match(token));
        if !is_voltage {
            return Some(token.to_owned());
        }
    }
    let upper = description.to_uppercase();
    GENERIC_CODE
        .as_ref()?
        .captures_iter(&upper)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Part numbers from vendor-branded toner descriptions, de-duplicated,
/// in table order.
pub fn parse_supply_types(supplies: &[(Oid, Value)]) -> Vec<SupplyTypeCode> {
    let mut out: Vec<SupplyTypeCode> = Vec::new();
    for row in collect_supply_rows(supplies).into_values().filter(is_toner) {
        let Some(description) = row.description.as_deref() else {
            continue;
        };
        if !description.to_lowercase().contains("hp") {
            continue;
        }
        let (Some(color), Some(code)) = (known_color(description), extract_part_number(description))
        else {
            continue;
        };
        let entry = SupplyTypeCode {
            color: Some(color.to_owned()),
            code,
        };
        if !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}

pub async fn read_supply_types(client: &mut SnmpClient) -> Result<Vec<SupplyTypeCode>, Error> {
    let supplies = client.walk(&Oid::from_arcs(PRT_MARKER_SUPPLIES_ENTRY)).await?;
    Ok(parse_supply_types(&supplies))
}

// ── Colours ──────────────────────────────────────────────────────────

const COLOR_WORDS: &[(&str, &str)] = &[
    ("photo black", "Photo Black"),
    ("black", "Black"),
    ("cyan", "Cyan"),
    ("magenta", "Magenta"),
    ("yellow", "Yellow"),
    ("gray", "Gray"),
    ("grey", "Grey"),
    ("שחור", "Black"),
    ("ציאן", "Cyan"),
    ("סיאן", "Cyan"),
    ("מגנטה", "Magenta"),
    ("צהוב", "Yellow"),
];

/// Canonical colour named anywhere in `text`.
pub fn known_color(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    COLOR_WORDS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, name)| *name)
}

/// Colourant name first, then description, then the colourant verbatim.
fn resolve_color(colorant: Option<&str>, description: Option<&str>) -> String {
    let colorant = colorant.map(str::trim).filter(|c| !c.is_empty());
    if let Some(name) = colorant.and_then(known_color) {
        return name.to_owned();
    }
    if let Some(name) = description.and_then(known_color) {
        return name.to_owned();
    }
    colorant.map_or_else(|| "Unknown".to_owned(), title_case)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
