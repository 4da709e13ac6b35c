//! Async protocol adapters for networked printers.
//!
//! Each adapter speaks one device protocol and returns raw [`Findings`]:
//!
//! - **SNMP** ([`snmp`], [`printer_mib`]) -- a small SNMPv2c client over
//!   tokio UDP reading the Printer-MIB alert and supplies tables and the
//!   Host-Resources error bitmask.
//! - **LEDM** ([`ledm`]) -- HP's XML status and event documents.
//! - **SWS/EWS** ([`ews`]) -- the JSON/HTML active-alert feed and supplies
//!   pages of Samsung-lineage devices.
//! - **Brother** ([`brother`]) -- toner gauges drawn on the status page.
//!
//! Nothing here decides what a finding *means*; severity normalization and
//! document updates live in `printfleet-core`. [`Prober`] is the single
//! entry point that maps an [`AdapterKind`] to the right adapter.

pub mod adapter;
pub mod brother;
pub mod error;
pub mod ews;
pub mod findings;
pub mod http;
pub mod ledm;
pub mod printer_mib;
pub mod prober;
pub mod snmp;
pub mod text;
pub mod transport;

pub use adapter::{AdapterKind, Attribute};
pub use error::Error;
pub use findings::{
    AlertReport, AlertRow, FailureKind, Findings, HardwareFlag, ProbeFailure, RawSeverity,
    SupplyReading, SupplyTypeCode,
};
pub use prober::{ProbeOptions, Prober};
pub use snmp::SnmpConfig;
pub use transport::{BasicAuth, TlsMode, TransportConfig};
