use thiserror::Error;

use crate::findings::FailureKind;

/// Top-level error type for the `printfleet-probe` crate.
///
/// Covers every failure mode of a single probe: HTTP transport, SNMP
/// datagrams, and payload decoding. `ProbeFailure` is the flattened,
/// reportable form the orchestrator consumes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Socket-level failure (bind, send, receive).
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Every candidate endpoint was tried and none produced a usable body.
    #[error("No usable endpoint on {address} ({tried} tried): {last}")]
    NoEndpoint {
        address: String,
        tried: usize,
        last: String,
    },

    // ── SNMP ────────────────────────────────────────────────────────
    /// BER encoding or decoding failed.
    #[error("BER codec error: {0}")]
    Ber(String),

    /// The agent answered with a non-zero error-status.
    #[error("SNMP agent reported error-status {status} at index {index}")]
    SnmpStatus { status: i64, index: i64 },

    /// No datagram came back within the retry budget.
    #[error("No SNMP response from {address} after {attempts} attempt(s)")]
    SnmpNoResponse { address: String, attempts: u32 },

    // ── Data ────────────────────────────────────────────────────────
    /// The payload did not have the shape the adapter expects.
    #[error("Malformed {format} payload: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::SnmpNoResponse { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this error came out of a failed TLS handshake.
    ///
    /// Walks the source chain looking for a rustls error (directly, or
    /// wrapped in an `io::Error` by the connector), falling back to the
    /// rendered message for connectors that erase the type.
    pub fn is_tls_handshake(&self) -> bool {
        match self {
            Self::Tls(_) => true,
            Self::Transport(e) => source_chain_has_tls(e),
            _ => false,
        }
    }

    /// Coarse classification used in run summaries.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } | Self::SnmpNoResponse { .. } => FailureKind::Timeout,
            Self::Transport(e) if e.is_timeout() => FailureKind::Timeout,
            Self::Transport(_) | Self::Tls(_) | Self::Io(_) | Self::NoEndpoint { .. } => {
                FailureKind::Transport
            }
            Self::InvalidUrl(_)
            | Self::Ber(_)
            | Self::SnmpStatus { .. }
            | Self::Malformed { .. } => FailureKind::Protocol,
        }
    }
}

fn source_chain_has_tls(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<rustls::Error>().is_some() {
            return true;
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io
                .get_ref()
                .is_some_and(|inner| inner.downcast_ref::<rustls::Error>().is_some())
            {
                return true;
            }
        }
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("handshake") || text.contains("tls") || text.contains("certificate") {
            return true;
        }
        current = e.source();
    }
    false
}
