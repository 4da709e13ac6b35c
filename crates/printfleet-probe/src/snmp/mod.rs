//! Minimal SNMPv2c stack: BER codec, OIDs, and an async UDP client.

pub mod ber;
mod client;
mod oid;

pub use ber::{Message, Pdu, PduKind, Value};
pub use client::{SnmpClient, SnmpConfig};
pub use oid::Oid;
