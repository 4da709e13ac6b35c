use serde::Serialize;
use strum::Display;

/// Placeholder address values the import step leaves behind.
const BAD_ADDRESSES: &[&str] = &["", "-", "n/a", "na", "none", "0.0.0.0", "null"];

/// Where an entity lives in the inventory document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityRef {
    /// Named collection, or `None` when the document root is the array.
    pub collection: Option<String>,
    pub index: usize,
}

/// One printer as read from the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetEntity {
    #[serde(skip)]
    pub location: Option<EntityRef>,
    pub id: String,
    pub model: String,
    /// Address exactly as recorded (trimmed), placeholders included.
    pub address: String,
}

impl FleetEntity {
    /// A one-off entity for an address that is not in the inventory.
    /// It has no location, so nothing about it is ever written back.
    pub fn synthetic(address: impl Into<String>) -> Self {
        Self {
            location: None,
            id: String::new(),
            model: String::new(),
            address: address.into(),
        }
    }

    /// The address if it is something worth probing.
    pub fn usable_address(&self) -> Option<&str> {
        let address = self.address.trim();
        let lower = address.to_ascii_lowercase();
        if BAD_ADDRESSES.contains(&lower.as_str()) {
            None
        } else {
            Some(address)
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.location.is_none()
    }

    /// Label for logs and summaries: the id, else the address.
    pub fn display_name(&self) -> &str {
        if self.id.is_empty() {
            &self.address
        } else {
            &self.id
        }
    }
}

/// Reachability recorded in the status sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkStatus {
    Online,
    Offline,
}

/// One cartridge entry as stored under `cartridges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyLevel {
    pub cartridge_color: String,
    pub remaining_percent: Option<u8>,
}
