//! Single-request transport through the Tor SOCKS proxy.
//!
//! The transport refuses to run without a SOCKS proxy: there is no code path
//! that sends a request over a direct connection.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::time::Instant;

use tracing::{debug, instrument};
use wreq::header::{ACCEPT_LANGUAGE, HeaderMap};
use wreq::redirect::Policy;
use wreq::{Client, Proxy};

use super::{ClientProfile, FetchError, FetchOutcome, FetchRequest};

/// Redirect hops followed; after that the last 3xx is returned as is.
const MAX_REDIRECTS: usize = 10;

/// The target site is Polish; every emulated browser asks for Polish first.
const ACCEPT_LANGUAGE_PL: &str = "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7";

/// Issues one GET for a request while impersonating a profile.
pub trait Transport: Send + Sync {
    fn fetch(
        &self,
        request: &FetchRequest,
        profile: &ClientProfile,
    ) -> impl Future<Output = Result<FetchOutcome, FetchError>> + Send;
}

/// Browser-emulating HTTP client routed through a `socks5://` or
/// `socks5h://` proxy.
///
/// Each profile is rendered with `wreq` emulation: the TLS ClientHello,
/// HTTP/2 settings and header order are those of the named browser build.
#[derive(Debug, Clone)]
pub struct TorTransport {
    proxy_url: String,
}

impl TorTransport {
    /// Create a transport bound to a SOCKS5 proxy.
    ///
    /// # Arguments
    ///
    /// * `proxy_url` - `socks5://host:port` or `socks5h://host:port`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Proxy`] if the URL is not a SOCKS5 URL or cannot
    /// be parsed as a proxy. There is no fallback to a direct connection.
    pub fn new(proxy_url: impl Into<String>) -> Result<Self, FetchError> {
        let proxy_url = proxy_url.into();
        if !proxy_url.starts_with("socks5://") && !proxy_url.starts_with("socks5h://") {
            return Err(FetchError::Proxy(format!(
                "invalid SOCKS proxy url '{proxy_url}': must start with socks5:// or socks5h://"
            )));
        }
        Proxy::all(&proxy_url)
            .map_err(|e| FetchError::Proxy(format!("invalid SOCKS proxy url '{proxy_url}': {e}")))?;
        Ok(Self { proxy_url })
    }

    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    // A fresh client per call: pooled connections would keep riding the old
    // circuit after an identity renewal.
    fn build_client(&self, request: &FetchRequest, profile: &ClientProfile) -> Result<Client, FetchError> {
        let proxy = Proxy::all(&self.proxy_url)
            .map_err(|e| FetchError::Proxy(format!("invalid SOCKS proxy url '{}': {e}", self.proxy_url)))?;

        Client::builder()
            .emulation(profile.emulation())
            .proxy(proxy)
            .redirect(redirect_policy())
            .timeout(request.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Proxy(format!("failed to build proxied client: {}", error_chain(&e))))
    }
}

/// Follow up to [`MAX_REDIRECTS`] hops, then hand back the 3xx so the ban
/// classifier can inspect its `Location`.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

impl Transport for TorTransport {
    #[instrument(level = "debug", skip_all, fields(url = %request.url, %profile))]
    async fn fetch(
        &self,
        request: &FetchRequest,
        profile: &ClientProfile,
    ) -> Result<FetchOutcome, FetchError> {
        let t0 = Instant::now();
        let client = self.build_client(request, profile)?;
        let response = client
            .get(&request.url)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_PL)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await.map_err(classify_error)?.to_vec();

        debug!(
            status,
            %final_url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Transport call finished"
        );
        Ok(FetchOutcome {
            status,
            body,
            final_url,
            headers,
        })
    }
}

/// Flatten response headers; repeated headers are joined with `", "` and
/// non-ASCII bytes are decoded lossily.
fn collect_headers(map: &HeaderMap) -> HashMap<String, String> {
    let mut headers: HashMap<String, String> = HashMap::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    headers
}

/// Map a wreq error onto a [`FetchError`] kind, keeping the full cause chain.
fn classify_error(e: wreq::Error) -> FetchError {
    let chain = error_chain(&e);
    let lower = chain.to_ascii_lowercase();
    if e.is_timeout() {
        FetchError::Timeout(chain)
    } else if lower.contains("socks") || lower.contains("proxy") {
        FetchError::Proxy(chain)
    } else if lower.contains("tls") || lower.contains("ssl") || lower.contains("certificate") || lower.contains("handshake") {
        FetchError::Tls(chain)
    } else if e.is_connect() {
        FetchError::Connect(chain)
    } else if e.is_body() || e.is_decode() {
        FetchError::Body(chain)
    } else {
        FetchError::Request(chain)
    }
}

fn error_chain(e: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![e.to_string()];
    let mut source = e.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
