//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use printfleet_config::ConfigError;
use printfleet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERSIST: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Inventory ────────────────────────────────────────────────────
    #[error("Inventory document not found: {path}")]
    #[diagnostic(
        code(printfleet::inventory_not_found),
        help("Pass the document with --inventory (-j) or set `inventory` in the config file.")
    )]
    InventoryNotFound { path: String },

    #[error("{message}")]
    #[diagnostic(
        code(printfleet::inventory),
        help("The document must be JSON with an object or array at the top level.")
    )]
    Inventory { message: String },

    #[error("Could not write the inventory back to {path}")]
    #[diagnostic(
        code(printfleet::persist_failed),
        help("The original document was left untouched. Check free space and permissions on its directory.")
    )]
    PersistFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Requests ─────────────────────────────────────────────────────
    #[error("Unknown adapter '{name}'")]
    #[diagnostic(
        code(printfleet::unknown_adapter),
        help("Available adapters: {known}\nRun: printfleet adapters")
    )]
    UnknownAdapter { name: String, known: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(printfleet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(printfleet::no_config),
        help("Check the --config path, or omit it to use the default location.")
    )]
    ConfigNotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(printfleet::config))]
    Config(Box<figment::Error>),

    #[error("No password found for HTTP user '{username}'")]
    #[diagnostic(
        code(printfleet::no_credentials),
        help(
            "Set http.password_env to a variable holding the password,\n\
             store it in the system keyring under service 'printfleet', account 'http/{username}',\n\
             or set http.password in the config file."
        )
    )]
    NoCredentials { username: String },

    #[error("Code catalog error: {message}")]
    #[diagnostic(code(printfleet::catalog))]
    Catalog { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(printfleet::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InventoryNotFound { .. } => exit_code::NOT_FOUND,
            Self::PersistFailed { .. } => exit_code::PERSIST,
            Self::UnknownAdapter { .. }
            | Self::Validation { .. }
            | Self::ConfigNotFound { .. }
            | Self::Config(_) => exit_code::USAGE,
            Self::NoCredentials { .. } => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DocumentNotFound { path } => CliError::InventoryNotFound {
                path: path.display().to_string(),
            },
            CoreError::Persist { path, source } => CliError::PersistFailed {
                path: path.display().to_string(),
                source,
            },
            CoreError::UnknownAdapter { name, known } => CliError::UnknownAdapter { name, known },
            CoreError::InvalidRequest { message } => CliError::Validation {
                field: "request".into(),
                reason: message,
            },
            other @ CoreError::Catalog { .. } => CliError::Catalog {
                message: other.to_string(),
            },
            other @ (CoreError::DocumentRead { .. }
            | CoreError::DocumentParse { .. }
            | CoreError::DocumentLayout { .. }) => CliError::Inventory {
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::MissingFile { path } => CliError::ConfigNotFound {
                path: path.display().to_string(),
            },
            ConfigError::NoCredentials { username } => CliError::NoCredentials { username },
            ConfigError::Serialization(e) => CliError::Render(e.to_string()),
            ConfigError::Figment(e) => CliError::Config(e),
        }
    }
}
