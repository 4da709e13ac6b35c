//! HP LEDM (Low-End Data Model) XML endpoints.
//!
//! Two documents matter: `ProductStatusDyn.xml` carries the current status
//! category and any active alerts, `EventTable.xml` the recent event log.
//! Elements are matched by local name because firmware generations use
//! different namespace URIs for the same schema.

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::Error;
use crate::findings::{AlertReport, AlertRow, RawSeverity};
use crate::http::{Expect, HttpSession};

pub const STATUS_PATH: &str = "/DevMgmt/ProductStatusDyn.xml";
pub const EVENTS_PATH: &str = "/EventMgmt/EventTable.xml";

/// `Accept` header LEDM firmware expects before it serves XML.
pub const ACCEPT_XML: &str = "application/xml,text/xml;q=0.9,*/*;q=0.5";

const EVENT_CODE: &[&str] = &["Code", "EventCode", "ID", "ErrorCode"];
const EVENT_DESCRIPTION: &[&str] = &["Description", "EventDescription", "Name", "Reason"];
const ALERT_CODE: &[&str] = &["ProductStatusAlertID", "StringId", "ID", "Code"];
const ALERT_DESCRIPTION: &[&str] = &["AlertDetailsUserAction", "Description", "Name", "Reason"];
const STATUS_STRINGS: &[&str] = &[
    "LocString",
    "StatusString",
    "StatusMessage",
    "Reason",
    "DetailedReason",
    "State",
];

/// Fetch both documents and fold them into one report.
///
/// Fails only when neither document could be fetched and parsed.
pub async fn read_alerts(session: &mut HttpSession, address: &str) -> Result<AlertReport, Error> {
    let events = fetch_xml(session, address, EVENTS_PATH).await;
    let status = fetch_xml(session, address, STATUS_PATH).await;

    match (events, status) {
        (Err(e), Err(_)) => Err(e),
        (events, status) => Ok(build_report(
            events.ok().as_deref(),
            status.ok().as_deref(),
        )),
    }
}

async fn fetch_xml(session: &mut HttpSession, address: &str, path: &str) -> Result<String, Error> {
    let fetched = session.fetch_first(address, &[path], Expect::Structured).await?;
    // Validate now so a garbage body counts as a failed endpoint.
    Document::parse(strip_bom(&fetched.body)).map_err(|e| Error::Malformed {
        format: "LEDM XML",
        message: format!("{path}: {e}"),
    })?;
    Ok(fetched.body)
}

/// Assemble a report from whichever documents arrived. Event rows come
/// first so they take the lower indices.
pub fn build_report(events_xml: Option<&str>, status_xml: Option<&str>) -> AlertReport {
    let mut report = AlertReport::default();

    if let Some(xml) = events_xml {
        match Document::parse(strip_bom(xml)) {
            Ok(doc) => collect_rows(&doc, "Event", EVENT_CODE, EVENT_DESCRIPTION, &mut report.rows),
            Err(e) => debug!(error = %e, "event table did not parse"),
        }
    }

    if let Some(xml) = status_xml {
        match Document::parse(strip_bom(xml)) {
            Ok(doc) => {
                collect_rows(&doc, "Alert", ALERT_CODE, ALERT_DESCRIPTION, &mut report.rows);
                report.status_text = status_text(&doc);
            }
            Err(e) => debug!(error = %e, "product status did not parse"),
        }
    }

    report
}

fn collect_rows(
    doc: &Document<'_>,
    element: &str,
    code_names: &[&str],
    description_names: &[&str],
    rows: &mut Vec<AlertRow>,
) {
    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == element)
    {
        let index = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let severity = first_text(node, &["Severity"]).map_or(RawSeverity::Absent, |s| {
            s.parse::<i64>()
                .map_or_else(|_| RawSeverity::Token(s.clone()), RawSeverity::Numeric)
        });
        let mut row = AlertRow::new(index, severity);
        row.code = first_text(node, code_names);
        row.description = first_text(node, description_names);
        rows.push(row);
    }
}

/// Explicit status strings win; otherwise the `StatusCategory` token is
/// mapped to a readable phrase.
pub fn status_text(doc: &Document<'_>) -> Option<String> {
    if let Some(text) = first_text(doc.root(), STATUS_STRINGS) {
        return Some(text);
    }
    let category = first_text(doc.root(), &["StatusCategory"])?.to_lowercase();
    let phrase = match category.as_str() {
        "ready" => "Ready".to_owned(),
        "processing" => "Processing".to_owned(),
        "warmup" => "Warming up".to_owned(),
        "attention" | "interventionrequired" => "Needs attention".to_owned(),
        "error" => "Error".to_owned(),
        "idle" => "Idle".to_owned(),
        "sleep" => "Sleep".to_owned(),
        other => capitalize(other),
    };
    Some(phrase)
}

/// Text of the first descendant (document order) whose local name is in
/// `names` and whose trimmed text is non-empty.
fn first_text(node: Node<'_, '_>, names: &[&str]) -> Option<String> {
    node.descendants()
        .filter(|n| n.is_element() && names.contains(&n.tag_name().name()))
        .find_map(|n| {
            n.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
        })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn strip_bom(s: &str) -> &str {
    s.trim_start_matches('\u{feff}').trim_start()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const STATUS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<psdyn:ProductStatusDyn xmlns:psdyn="http://www.hp.com/schemas/imaging/con/ledm/productstatusdyn/2007/10/31"
    xmlns:ad="http://www.hp.com/schemas/imaging/con/ledm/alertdetails/2007/10/31"
    xmlns:pscat="http://www.hp.com/schemas/imaging/con/ledm/productstatuscategories/2007/10/31">
  <psdyn:Status>
    <pscat:StatusCategory>attention</pscat:StatusCategory>
  </psdyn:Status>
  <psdyn:AlertTable>
    <psdyn:Alert>
      <ad:ProductStatusAlertID>cartridgeLow</ad:ProductStatusAlertID>
      <psdyn:Severity>Warning</psdyn:Severity>
      <ad:AlertDetailsUserAction>Black cartridge low</ad:AlertDetailsUserAction>
    </psdyn:Alert>
  </psdyn:AlertTable>
</psdyn:ProductStatusDyn>"#;

    const EVENTS: &str = r#"<ev:EventTable xmlns:ev="urn:x-hp:ev">
  <ev:Event><ev:Severity>Error</ev:Severity><ev:Code>13.B2.D2</ev:Code>
    <ev:Description>Paper jam in tray 2</ev:Description></ev:Event>
  <ev:Event><ev:EventCode>10.00.33</ev:EventCode><ev:Name>Used supply</ev:Name></ev:Event>
</ev:EventTable>"#;

    #[test]
    fn events_precede_status_alerts() {
        let report = build_report(Some(EVENTS), Some(STATUS));
        assert_eq!(report.rows.len(), 3);

        assert_eq!(report.rows[0].index, 0);
        assert_eq!(report.rows[0].severity, RawSeverity::Token("Error".into()));
        assert_eq!(report.rows[0].code.as_deref(), Some("13.B2.D2"));
        assert_eq!(report.rows[0].description.as_deref(), Some("Paper jam in tray 2"));

        assert_eq!(report.rows[1].severity, RawSeverity::Absent);
        assert_eq!(report.rows[1].code.as_deref(), Some("10.00.33"));

        assert_eq!(report.rows[2].index, 2);
        assert_eq!(report.rows[2].code.as_deref(), Some("cartridgeLow"));
        assert_eq!(report.rows[2].description.as_deref(), Some("Black cartridge low"));
    }

    #[test]
    fn status_category_maps_to_phrase() {
        let report = build_report(None, Some(STATUS));
        assert_eq!(report.status_text.as_deref(), Some("Needs attention"));
    }

    #[test]
    fn explicit_status_string_wins() {
        let xml = "<S><StatusCategory>ready</StatusCategory><LocString>Cover open</LocString></S>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(status_text(&doc).as_deref(), Some("Cover open"));
    }

    #[test]
    fn unknown_category_is_capitalized() {
        let doc = Document::parse("<S><StatusCategory>calibrating</StatusCategory></S>").unwrap();
        assert_eq!(status_text(&doc).as_deref(), Some("Calibrating"));
    }

    #[test]
    fn numeric_severity_is_kept_as_number() {
        let xml = "<T><Event><Severity>7</Severity><Code>X</Code></Event></T>";
        let report = build_report(Some(xml), None);
        assert_eq!(report.rows[0].severity, RawSeverity::Numeric(7));
    }

    #[test]
    fn unparseable_documents_are_skipped() {
        let report = build_report(Some("<not xml"), Some(STATUS));
        assert_eq!(report.rows.len(), 1);
    }
}
