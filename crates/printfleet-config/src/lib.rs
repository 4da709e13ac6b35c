//! Configuration for printfleet.
//!
//! TOML file + environment layering, credential resolution (env var,
//! system keyring, plaintext), and translation to
//! `printfleet_core::EngineConfig`. The CLI applies its flag overrides on
//! top of the result.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use printfleet_core::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS};
use printfleet_core::{
    DocumentLayout, EngineConfig, ModelRegistry, PhraseTables, ProbeOptions, parse_adapter,
};
use printfleet_probe::{BasicAuth, SnmpConfig, TlsMode, TransportConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEYRING_SERVICE: &str = "printfleet";
const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("no password found for HTTP user '{username}'")]
    NoCredentials { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Inventory document to enrich.
    pub inventory: Option<PathBuf>,

    /// Vendor code catalog (JSON).
    pub catalog: Option<PathBuf>,

    /// Hard per-probe deadline.
    pub timeout_secs: u64,

    /// Probes in flight at once.
    pub concurrency: usize,

    pub snmp: SnmpSection,
    pub http: HttpSection,

    /// Field names of the inventory document.
    pub document: DocumentLayout,

    /// Suppression, translation and alias tables for alert text.
    pub phrases: PhraseTables,

    /// Per-adapter target model lists, keyed by adapter name. Replaces the
    /// built-in list for that adapter.
    pub models: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory: None,
            catalog: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            snmp: SnmpSection::default(),
            http: HttpSection::default(),
            document: DocumentLayout::default(),
            phrases: PhraseTables::default(),
            models: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SnmpSection {
    /// Community string (plaintext; prefer `community_env`).
    pub community: String,

    /// Environment variable holding the community string.
    pub community_env: Option<String>,

    pub port: u16,

    /// Wait per request attempt.
    pub timeout_secs: u64,

    /// Extra attempts after the first.
    pub retries: u32,

    pub max_repetitions: u32,
}

impl Default for SnmpSection {
    fn default() -> Self {
        Self {
            community: "public".into(),
            community_env: None,
            port: 161,
            timeout_secs: 2,
            retries: 1,
            max_repetitions: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSection {
    /// Verify certificates. Printer consoles are almost always self-signed.
    pub verify_tls: bool,

    /// Per-request timeout.
    pub timeout_secs: u64,

    /// Retry with relaxed TLS after a failed handshake.
    pub legacy_tls_fallback: bool,

    /// Basic-auth user for consoles that require one.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout_secs: 4,
            legacy_tls_fallback: true,
            username: None,
            password: None,
            password_env: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "printfleet", "printfleet").map_or_else(
        || PathBuf::from(".printfleet.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then the TOML file, then `PRINTFLEET_*` environment
/// variables (`__` separates nested keys, e.g. `PRINTFLEET_SNMP__PORT`).
///
/// An explicit `path` must exist; the default location may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::MissingFile {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed("PRINTFLEET_").split("__"))
        .extract()?;
    Ok(config)
}

impl Config {
    /// A copy safe to print: plaintext secrets are masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.snmp.community = REDACTED.into();
        if copy.http.password.is_some() {
            copy.http.password = Some(REDACTED.into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build the engine configuration. `inventory` must be set by now,
    /// either here or by a CLI override.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let inventory = self.inventory.clone().ok_or_else(|| ConfigError::Validation {
            field: "inventory".into(),
            reason: "no inventory document configured (use --inventory or set `inventory`)".into(),
        })?;
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency", "must be at least 1"));
        }

        let mut engine = EngineConfig::new(inventory);
        engine.catalog.clone_from(&self.catalog);
        engine.timeout = Duration::from_secs(self.timeout_secs);
        engine.concurrency = self.concurrency;
        engine.probe = ProbeOptions {
            http: self.transport()?,
            snmp: self.snmp_config(),
        };
        engine.layout = self.document.clone();
        engine.phrases = self.phrases.clone();
        engine.models = self.model_registry()?;
        Ok(engine)
    }

    fn transport(&self) -> Result<TransportConfig, ConfigError> {
        Ok(TransportConfig {
            tls: if self.http.verify_tls {
                TlsMode::Verify
            } else {
                TlsMode::AcceptInvalid
            },
            timeout: Duration::from_secs(self.http.timeout_secs.max(1)),
            auth: resolve_http_auth(&self.http)?,
            legacy_tls_fallback: self.http.legacy_tls_fallback,
        })
    }

    fn snmp_config(&self) -> SnmpConfig {
        SnmpConfig {
            community: resolve_community(&self.snmp),
            port: self.snmp.port,
            timeout: Duration::from_secs(self.snmp.timeout_secs.max(1)),
            retries: self.snmp.retries,
            max_repetitions: self.snmp.max_repetitions.max(1),
        }
    }

    /// Target model overrides, validated against the adapter registry.
    pub fn model_registry(&self) -> Result<ModelRegistry, ConfigError> {
        let mut overrides = BTreeMap::new();
        for (name, models) in &self.models {
            let kind = parse_adapter(name).map_err(|e| invalid("models", &e.to_string()))?;
            overrides.insert(kind, models.clone());
        }
        Ok(ModelRegistry::new(overrides))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// SNMP community: the named env var, else the configured string.
pub fn resolve_community(snmp: &SnmpSection) -> SecretString {
    if let Some(value) = snmp
        .community_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return SecretString::from(value);
    }
    SecretString::from(snmp.community.clone())
}

/// HTTP basic auth, if a username is configured. The password comes from
/// the named env var, then the system keyring (service `printfleet`,
/// account `http/<username>`), then plaintext config.
pub fn resolve_http_auth(http: &HttpSection) -> Result<Option<BasicAuth>, ConfigError> {
    let Some(username) = http.username.as_deref().filter(|u| !u.is_empty()) else {
        return Ok(None);
    };

    // 1. Env var
    if let Some(pw) = http
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok(Some(basic(username, pw)));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("http/{username}")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(Some(basic(username, pw)));
        }
    }

    // 3. Plaintext in config
    if let Some(pw) = &http.password {
        return Ok(Some(basic(username, pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        username: username.into(),
    })
}

fn basic(username: &str, password: String) -> BasicAuth {
    BasicAuth {
        username: username.to_owned(),
        password: SecretString::from(password),
    }
}
