//! Subcommand handlers.

pub mod adapters;
pub mod config_cmd;
pub mod run;
