// ── SWS/EWS embedded web server ──
//
// Samsung-lineage HP devices (408dn, MFP432) serve their state through the
// "SWS" console. Active alerts come as a JSON feed whose file name varies
// by firmware, with an HTML grid as the fallback. The same console lists
// installed cartridge part numbers on its supplies pages.
//
// The JSON is frequently not JSON: object keys are left unquoted. We try a
// strict parse first and then repair bare keys before giving up.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::findings::{AlertReport, AlertRow, RawSeverity, SupplyTypeCode};
use crate::http::{Expect, HttpSession};

pub const LANDING_PATH: &str = "/sws/index.html";

pub const ALERT_JSON_PATHS: &[&str] = &[
    "/sws/app/information/activealert/activealert.json",
    "/sws/app/information/activealert/activeAlert.json",
    "/sws/app/information/activealert/active_alert.json",
    "/sws/app/information/activealert/alert.json",
];
pub const ALERT_HTML_PATH: &str = "/sws/app/information/activealert/activealert.html";

pub const SUPPLY_JSON_PATHS: &[&str] = &[
    "/sws/app/information/supplies/supplies.json",
    "/sws/app/information/supplies/supply.json",
    "/sws/app/information/home/home.json",
];
pub const SUPPLY_HTML_PATHS: &[&str] = &[
    "/sws/app/information/supplies/supplies.html",
    "/sws/app/information/status/supplies.html",
    LANDING_PATH,
];

/// Device error codes as the SWS console prints them (`S2-4211`).
static DEVICE_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]\d-\d{3,5}\b").ok());
static BARE_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([{\[,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):").ok());
/// Cartridge identifiers sold for SWS devices.
static TONER_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"W\d{4}[A-Z](?:X)?|MLT-[A-Z]\d{3,5}[A-Z]*|[A-Z]{2}\d{3}[A-Z]").ok()
});

/// First SWS-style device code (`S2-4211`) in `text`.
pub fn find_device_code(text: &str) -> Option<&str> {
    DEVICE_CODE.as_ref()?.find(text).map(|m| m.as_str())
}

fn find_toner_id(text: &str) -> Option<String> {
    TONER_ID.as_ref()?.find(text).map(|m| m.as_str().to_owned())
}

// ── Lenient JSON ─────────────────────────────────────────────────────

/// Parse a JSON body, repairing unquoted object keys if the strict parse
/// fails.
pub fn parse_lenient_json(text: &str) -> Result<Value, Error> {
    if let Ok(value) = serde_json::from_str(text) {
        return Ok(value);
    }
    let malformed = |message: String| Error::Malformed {
        format: "EWS JSON",
        message,
    };
    let Some(bare_key) = BARE_KEY.as_ref() else {
        return Err(malformed("key repair pattern unavailable".into()));
    };
    let repaired = bare_key.replace_all(text, r#"$1"$2"$3:"#);
    serde_json::from_str(&repaired).map_err(|e| malformed(e.to_string()))
}

// ── Alerts ───────────────────────────────────────────────────────────

/// Prime the session, then take the first JSON feed that yields alerts,
/// falling back to the HTML grid. An empty report means the console
/// answered and had nothing active.
pub async fn read_alerts(session: &mut HttpSession, address: &str) -> Result<AlertReport, Error> {
    session.prime(address, LANDING_PATH).await;

    let mut answered = false;
    for path in ALERT_JSON_PATHS {
        let fetched = match session.fetch_first(address, &[path], Expect::Structured).await {
            Ok(f) => f,
            Err(e) => {
                debug!(address, path, error = %e, "alert feed unavailable");
                continue;
            }
        };
        answered = true;
        if !fetched.body.contains('{') {
            continue;
        }
        match parse_lenient_json(&fetched.body) {
            Ok(value) => {
                let rows = alerts_from_json(&value);
                if !rows.is_empty() {
                    return Ok(report(rows));
                }
            }
            Err(e) => debug!(address, path, error = %e, "alert feed did not parse"),
        }
    }

    match session.fetch_first(address, &[ALERT_HTML_PATH], Expect::Markup).await {
        Ok(fetched) => Ok(report(alerts_from_html(&fetched.body))),
        Err(_) if answered => Ok(AlertReport::default()),
        Err(e) => Err(e),
    }
}

fn report(rows: Vec<AlertRow>) -> AlertReport {
    AlertReport {
        rows,
        ..AlertReport::default()
    }
}

/// Walk an arbitrary JSON document collecting alert-shaped objects.
///
/// Within an object, any key containing `severity`, `code`, or a
/// description-like word contributes to one candidate row. Bare strings
/// that contain a device code become rows of their own.
pub fn alerts_from_json(value: &Value) -> Vec<AlertRow> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    walk_alerts(value, &mut rows, &mut seen);
    rows
}

type AlertKey = (String, Option<String>, Option<String>);

fn walk_alerts(value: &Value, rows: &mut Vec<AlertRow>, seen: &mut HashSet<AlertKey>) {
    match value {
        Value::Object(map) => {
            let mut severity = RawSeverity::Absent;
            let mut code = None;
            let mut description = None;
            let mut consumed = Vec::new();

            for (key, v) in map {
                let lower = key.to_lowercase();
                if lower.contains("severity") {
                    severity = match v {
                        Value::String(s) if !s.trim().is_empty() => {
                            RawSeverity::Token(s.trim().to_owned())
                        }
                        Value::Number(n) => n.as_i64().map_or(severity, RawSeverity::Numeric),
                        _ => severity,
                    };
                } else if lower.contains("code") {
                    if let Some(text) = scalar_text(v) {
                        code = Some(text);
                        consumed.push(key);
                    }
                } else if ["desc", "message", "detail", "reason"]
                    .iter()
                    .any(|w| lower.contains(w))
                {
                    if let Some(text) = v.as_str().map(str::trim).filter(|t| !t.is_empty()) {
                        description = Some(text.to_owned());
                        consumed.push(key);
                    }
                }
            }

            if code.is_some() || description.is_some() {
                push_unique(rows, seen, severity, code, description);
            }
            // Fields already folded into this row are not rescanned as
            // free-standing strings.
            for (key, v) in map {
                if !consumed.contains(&key) {
                    walk_alerts(v, rows, seen);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_alerts(item, rows, seen);
            }
        }
        Value::String(s) => {
            if let Some(code) = find_device_code(s) {
                push_unique(
                    rows,
                    seen,
                    RawSeverity::Absent,
                    Some(code.to_owned()),
                    Some(s.trim().to_owned()),
                );
            }
        }
        _ => {}
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn push_unique(
    rows: &mut Vec<AlertRow>,
    seen: &mut HashSet<AlertKey>,
    severity: RawSeverity,
    code: Option<String>,
    description: Option<String>,
) {
    let severity_key = match &severity {
        RawSeverity::Absent => String::new(),
        RawSeverity::Numeric(n) | RawSeverity::MibLevel(n) => n.to_string(),
        RawSeverity::Token(t) => t.to_lowercase(),
    };
    if !seen.insert((severity_key, code.clone(), description.clone())) {
        return;
    }
    let index = u32::try_from(rows.len()).unwrap_or(u32::MAX);
    let mut row = AlertRow::new(index, severity);
    row.code = code;
    row.description = description;
    rows.push(row);
}

/// Parse the active-alert grid. ExtJS grids (`x-grid3-row`) are preferred,
/// plain tables are the fallback.
pub fn alerts_from_html(html: &str) -> Vec<AlertRow> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    let grid_rows: Vec<ElementRef<'_>> = select_all(&document, "div.x-grid3-body div.x-grid3-row");
    let (table_rows, cell_selector) = if grid_rows.is_empty() {
        (select_all(&document, "tr"), "td")
    } else {
        (grid_rows, "div.x-grid3-cell-inner")
    };
    let Ok(cell_selector) = Selector::parse(cell_selector) else {
        return rows;
    };

    for row in table_rows {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| collapse_ws(&cell.text().collect::<String>()))
            .collect();
        if cells.is_empty() {
            continue;
        }
        let joined = cells.join(" ").to_lowercase();
        if joined.contains("description") && joined.contains("status code") {
            continue;
        }

        let Some(longest) = cells.iter().max_by_key(|c| c.chars().count()) else {
            continue;
        };
        let mut description = longest.clone();
        let code = find_device_code(&description).map(str::to_owned);
        if let Some(code) = &code {
            if let Some(rest) = description.strip_prefix(code.as_str()) {
                description = rest
                    .trim_start_matches([' ', ':', '.', '-', '\u{a0}'])
                    .to_owned();
            }
        }

        let severity = image_alt(row)
            .or_else(|| {
                cells
                    .iter()
                    .filter(|c| !c.is_empty())
                    .min_by_key(|c| c.chars().count())
                    .cloned()
            })
            .map_or(RawSeverity::Absent, RawSeverity::Token);

        let description = Some(description).filter(|d| !d.is_empty());
        if code.is_none() && description.is_none() {
            continue;
        }
        push_unique(&mut rows, &mut seen, severity, code, description);
    }

    rows
}

fn image_alt(row: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("img[alt]").ok()?;
    row.select(&selector)
        .filter_map(|img| img.value().attr("alt"))
        .map(str::trim)
        .find(|alt| !alt.is_empty())
        .map(str::to_owned)
}

fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|s| document.select(&s).collect())
        .unwrap_or_default()
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Supply type codes ────────────────────────────────────────────────

/// Find the installed cartridge part number on the supplies pages.
/// JSON feeds are tried before HTML; the first page that mentions a part
/// number wins. `Ok(vec![])` means the console answered without one.
pub async fn read_supply_types(
    session: &mut HttpSession,
    address: &str,
) -> Result<Vec<SupplyTypeCode>, Error> {
    session.prime(address, LANDING_PATH).await;

    let mut answered = false;
    for path in SUPPLY_JSON_PATHS {
        let Ok(fetched) = session.fetch_first(address, &[path], Expect::Structured).await else {
            continue;
        };
        answered = true;
        let body = &fetched.body;
        if !(body.contains('{') || body.contains('[')) {
            continue;
        }
        let found = parse_lenient_json(body)
            .ok()
            .and_then(|value| toner_from_json(&value))
            .or_else(|| find_toner_id(body));
        if let Some(code) = found {
            return Ok(vec![SupplyTypeCode { color: None, code }]);
        }
    }

    let mut last_err = None;
    for path in SUPPLY_HTML_PATHS {
        match session.fetch_first(address, &[path], Expect::Markup).await {
            Ok(fetched) => {
                answered = true;
                if let Some(code) = toner_from_html(&fetched.body) {
                    return Ok(vec![SupplyTypeCode { color: None, code }]);
                }
            }
            Err(e) => last_err = Some(e),
        }
    }

    match last_err {
        Some(e) if !answered => Err(e),
        _ => Ok(Vec::new()),
    }
}

/// Collect part-number candidates from every string in a supplies JSON
/// document, in document order. Codes starting with `W` (current HP
/// lineup) are preferred over legacy Samsung ones.
pub fn toner_from_json(value: &Value) -> Option<String> {
    let mut candidates = Vec::new();
    walk_toner(value, &mut candidates);
    candidates
        .iter()
        .find(|c| c.starts_with('W'))
        .or_else(|| candidates.first())
        .cloned()
}

fn walk_toner(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| walk_toner(v, out)),
        Value::Array(items) => items.iter().for_each(|v| walk_toner(v, out)),
        Value::String(s) => out.extend(find_toner_id(s)),
        _ => {}
    }
}

/// First part number anywhere in the page's visible text.
pub fn toner_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = collapse_ws(&document.root_element().text().collect::<Vec<_>>().join(" "));
    find_toner_id(&text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn patterns_compile() {
        assert!(DEVICE_CODE.is_some());
        assert!(BARE_KEY.is_some());
        assert!(TONER_ID.is_some());
    }

    #[test]
    fn repairs_unquoted_keys() {
        let value = parse_lenient_json("{alerts: [{severity: \"Warning\", code: \"S2-4211\"}]}").unwrap();
        assert_eq!(value["alerts"][0]["code"], "S2-4211");
    }

    #[test]
    fn rejects_hopeless_payloads() {
        assert!(parse_lenient_json("<<<").is_err());
    }

    #[test]
    fn json_walk_finds_nested_alerts() {
        let value = json!({
            "GXI_ACTIVE_ALERT": {
                "list": [
                    {"severity": "Error", "statusCode": "S2-4211", "description": "Door open"},
                    {"severity": 2, "desc": "Toner low"},
                    {"severity": "Error", "statusCode": "S2-4211", "description": "Door open"}
                ]
            }
        });
        let rows = alerts_from_json(&value);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].severity, RawSeverity::Token("Error".into()));
        assert_eq!(rows[0].code.as_deref(), Some("S2-4211"));
        assert_eq!(rows[0].description.as_deref(), Some("Door open"));
        assert_eq!(rows[1].severity, RawSeverity::Numeric(2));
        assert_eq!(rows[1].index, 1);
    }

    #[test]
    fn bare_strings_with_codes_become_rows() {
        let rows = alerts_from_json(&json!(["A1-1234 Paper jam in tray 1", "nothing here"]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, RawSeverity::Absent);
        assert_eq!(rows[0].code.as_deref(), Some("A1-1234"));
    }

    #[test]
    fn html_grid_rows_are_parsed() {
        let html = r#"<html><body><div class="x-grid3-body">
            <div class="x-grid3-row">
              <div class="x-grid3-cell-inner">Status</div>
              <div class="x-grid3-cell-inner">Status Code</div>
              <div class="x-grid3-cell-inner">Description</div>
            </div>
            <div class="x-grid3-row">
              <div class="x-grid3-cell-inner"><img alt="Error" src="e.gif"></div>
              <div class="x-grid3-cell-inner">S2-4211</div>
              <div class="x-grid3-cell-inner">S2-4211: Front door is open. Close the door.</div>
            </div>
        </div></body></html>"#;
        let rows = alerts_from_html(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, RawSeverity::Token("Error".into()));
        assert_eq!(rows[0].code.as_deref(), Some("S2-4211"));
        assert_eq!(
            rows[0].description.as_deref(),
            Some("Front door is open. Close the door.")
        );
    }

    #[test]
    fn html_table_fallback_uses_shortest_cell_as_severity() {
        let html = "<table><tr><td>Warning</td><td>Toner cartridge is low on toner</td></tr></table>";
        let rows = alerts_from_html(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].severity, RawSeverity::Token("Warning".into()));
        assert_eq!(rows[0].code, None);
        assert_eq!(
            rows[0].description.as_deref(),
            Some("Toner cartridge is low on toner")
        );
    }

    #[test]
    fn toner_json_prefers_w_codes() {
        let value = json!({
            "supplies": [{"name": "MLT-D203L"}, {"partNo": "W1331X"}]
        });
        assert_eq!(toner_from_json(&value).as_deref(), Some("W1331X"));
    }

    #[test]
    fn toner_json_without_part_numbers_is_none() {
        let value = json!({"printer": {"serial": 123_456, "name": "SL-M4020"}});
        assert_eq!(toner_from_json(&value), None);
    }

    #[test]
    fn toner_html_scans_visible_text() {
        let html = "<html><body><p>Cartridge: <b>W1330A</b></p></body></html>";
        assert_eq!(toner_from_html(html).as_deref(), Some("W1330A"));
    }
}
