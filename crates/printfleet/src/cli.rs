//! Clap derive structures for the `printfleet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// printfleet -- printer fleet telemetry enrichment
#[derive(Debug, Parser)]
#[command(
    name = "printfleet",
    version,
    about = "Enrich a printer fleet inventory with live device telemetry",
    long_about = "Probes networked printers over SNMP, HP LEDM and vendor web consoles,\n\
        normalizes what they report, and writes the results into the shared\n\
        inventory document in a single atomic update per run.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PRINTFLEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Inventory document (overrides config)
    #[arg(long, short = 'j', env = "PRINTFLEET_INVENTORY", global = true)]
    pub inventory: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one adapter across the inventory
    #[command(alias = "r")]
    Run(RunArgs),

    /// List adapters and the models they target
    Adapters,

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Adapter name (see `printfleet adapters`)
    pub adapter: String,

    /// Probe only this address, ignoring model targeting
    #[arg(long, value_name = "ADDR")]
    pub only_ip: Option<String>,

    /// Hard per-device deadline in seconds
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Probes in flight at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// SNMP community string
    #[arg(long, env = "PRINTFLEET_COMMUNITY", hide_env_values = true)]
    pub community: Option<String>,

    /// Vendor code catalog (JSON)
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', conflicts_with = "verify_tls")]
    pub insecure: bool,

    /// Verify TLS certificates
    #[arg(long)]
    pub verify_tls: bool,

    /// Show only the entities that failed
    #[arg(long)]
    pub failures: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (secrets masked)
    Show,

    /// Print the default config file location
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
