// ── Candidate-endpoint HTTP session ──
//
// Management consoles move their data around between firmware releases,
// so scraping adapters hand over an ordered list of paths and take the
// first one that answers properly. Each path is tried over HTTPS first,
// then plain HTTP. The relaxed TLS client is only built after a handshake
// failure and then sticks for the rest of the session.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::text::{decode_body, looks_like_html};
use crate::transport::TransportConfig;

/// URL scheme to attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// What the caller expects back, which decides what counts as usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// JSON or XML. An HTML body means we hit an error or login page.
    Structured,
    /// An HTML page is the payload.
    Markup,
}

/// A successfully fetched and decoded body.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

/// One device's HTTP session: a cookie jar shared by both clients.
pub struct HttpSession {
    config: TransportConfig,
    jar: Arc<Jar>,
    client: reqwest::Client,
    legacy: Option<reqwest::Client>,
    schemes: Vec<Scheme>,
    accept: Option<&'static str>,
}

impl HttpSession {
    pub fn new(config: &TransportConfig) -> Result<Self, Error> {
        let jar = Arc::new(Jar::default());
        let client = config.build_client(Some(&jar))?;
        Ok(Self {
            config: config.clone(),
            jar,
            client,
            legacy: None,
            schemes: vec![Scheme::Https, Scheme::Http],
            accept: None,
        })
    }

    /// Restrict or reorder the schemes tried for every candidate path.
    #[must_use]
    pub fn with_schemes(mut self, schemes: &[Scheme]) -> Self {
        self.schemes = schemes.to_vec();
        self
    }

    /// Send an `Accept` header on every request.
    #[must_use]
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Whether the relaxed TLS client has been engaged.
    pub fn is_legacy(&self) -> bool {
        self.legacy.is_some()
    }

    /// Hit a landing page so the console issues its session cookies.
    /// Failures are ignored; the candidates that follow report their own.
    pub async fn prime(&mut self, address: &str, path: &str) {
        for scheme in self.schemes.clone() {
            let Ok(url) = build_url(scheme, address, path) else {
                return;
            };
            match self.get(&url).await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(%url, "session primed");
                    return;
                }
                Ok(resp) => debug!(%url, status = %resp.status(), "priming request rejected"),
                Err(e) => debug!(%url, error = %e, "priming request failed"),
            }
        }
    }

    /// Try `paths` under every scheme and return the first usable body.
    pub async fn fetch_first(
        &mut self,
        address: &str,
        paths: &[&str],
        expect: Expect,
    ) -> Result<Fetched, Error> {
        let mut tried = 0usize;
        let mut last = String::from("no candidates");

        for scheme in self.schemes.clone() {
            for path in paths {
                let url = build_url(scheme, address, path)?;
                tried += 1;

                let resp = match self.get(&url).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        debug!(%url, error = %e, "candidate failed");
                        let unreachable = matches!(&e, Error::Transport(t) if t.is_connect())
                            && !e.is_tls_handshake();
                        last = e.to_string();
                        if unreachable {
                            break;
                        }
                        continue;
                    }
                };

                let status = resp.status();
                if status != StatusCode::OK {
                    debug!(%url, %status, "candidate rejected");
                    last = format!("HTTP {status} from {url}");
                    continue;
                }

                let content_type = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let bytes = resp.bytes().await?;
                let body = decode_body(&bytes, content_type.as_deref());

                if expect == Expect::Structured && looks_like_html(&body) {
                    debug!(%url, "candidate returned an HTML page");
                    last = format!("HTML page instead of data at {url}");
                    continue;
                }

                debug!(%url, bytes = bytes.len(), "candidate accepted");
                return Ok(Fetched {
                    url,
                    content_type,
                    body,
                });
            }
        }

        Err(Error::NoEndpoint {
            address: address.to_owned(),
            tried,
            last,
        })
    }

    /// GET with the handshake-failure fallback.
    pub async fn get(&mut self, url: &Url) -> Result<reqwest::Response, Error> {
        if let Some(legacy) = &self.legacy {
            return self.send(legacy, url).await;
        }

        match self.send(&self.client, url).await {
            Err(e)
                if url.scheme() == "https"
                    && self.config.legacy_tls_fallback
                    && e.is_tls_handshake() =>
            {
                debug!(%url, error = %e, "TLS handshake failed, retrying with legacy TLS");
                let legacy = self.config.build_legacy_client(Some(&self.jar))?;
                let result = self.send(&legacy, url).await;
                self.legacy = Some(legacy);
                result
            }
            other => other,
        }
    }

    async fn send(&self, client: &reqwest::Client, url: &Url) -> Result<reqwest::Response, Error> {
        let mut request = client.get(url.clone());
        if let Some(accept) = self.accept {
            request = request.header(ACCEPT, accept);
        }
        let request = self.config.authorize(request);
        Ok(request.send().await?)
    }
}

fn build_url(scheme: Scheme, address: &str, path: &str) -> Result<Url, Error> {
    let path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };
    Ok(Url::parse(&format!("{}://{address}{path}", scheme.as_str()))?)
}
