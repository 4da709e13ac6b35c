// ── Domain model ──
//
// Canonical types the engine writes into the inventory. Raw device
// vocabulary stops at the normalizer; everything here is already in the
// three-level taxonomy or a fixed document shape.

mod entity;
mod severity;

pub use entity::{EntityRef, FleetEntity, LinkStatus, SupplyLevel};
pub use severity::{ErrorState, Severity};
