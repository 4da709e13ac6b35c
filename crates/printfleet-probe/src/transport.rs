// Shared transport configuration for building reqwest::Client instances.
//
// Every HTTP adapter goes through this module so TLS policy, timeouts and
// credentials are decided in one place. The preferred client runs on
// rustls, which only speaks TLS 1.2 and 1.3. Old printer firmware that
// stops at TLS 1.0/1.1 is reached through the legacy client on the
// platform TLS stack. It is only built for the retry after a failed
// handshake; nothing builds it up front.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

const USER_AGENT: &str = concat!("printfleet/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode for the preferred attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Use the bundled web PKI roots.
    Verify,
    /// Accept any certificate. Printer EWS pages are almost always self-signed.
    #[default]
    AcceptInvalid,
}

/// HTTP basic-auth credentials for management consoles that require them.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: SecretString,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub auth: Option<BasicAuth>,
    /// Allow the relaxed-TLS retry after a handshake failure.
    pub legacy_tls_fallback: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(4),
            auth: None,
            legacy_tls_fallback: true,
        }
    }
}

impl TransportConfig {
    /// Build the client used for the preferred attempt.
    pub fn build_client(&self, jar: Option<&Arc<Jar>>) -> Result<reqwest::Client, Error> {
        let mut builder = self.base_builder(jar).use_rustls_tls();
        if self.tls == TlsMode::AcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build the relaxed client: platform TLS, protocol versions 1.0
    /// through 1.2, no certificate or hostname verification.
    pub fn build_legacy_client(&self, jar: Option<&Arc<Jar>>) -> Result<reqwest::Client, Error> {
        self.base_builder(jar)
            .use_native_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_0)
            .max_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build legacy HTTP client: {e}")))
    }

    /// Attach basic-auth credentials, if configured, to a request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => {
                request.basic_auth(&auth.username, Some(auth.password.expose_secret()))
            }
            None => request,
        }
    }

    fn base_builder(&self, jar: Option<&Arc<Jar>>) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(USER_AGENT);
        if let Some(jar) = jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }
        builder
    }
}
