//! Anonymized, ban-aware page fetching.
//!
//! Every request leaves through the Tor SOCKS proxy while impersonating a
//! browser profile. Responses are checked for explicit blocks and for the
//! disguised homepage redirect the target site uses instead of a 403.
//!
//! # Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | [`ProfileRotator`] | [`profiles`] | Round-robin browser profile dispenser |
//! | [`TorTransport`] | [`transport`] | One GET through the SOCKS proxy |
//! | [`TorControl`] | [`renewal`] | `SIGNAL NEWNYM` over the control port |
//! | [`BanClassifier`] | [`classifier`] | OK / hard block / soft ban verdict |
//! | [`ResilientFetcher`] | [`fetcher`] | Glues the above, emits retry signals |
//!
//! The fetcher never retries by itself: a block or a transport failure yields
//! [`Fetched::Retry`] and the caller decides when to try again.

pub mod classifier;
pub mod fetcher;
pub mod profiles;
pub mod renewal;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub use classifier::{BanClassifier, BanVerdict};
pub use fetcher::{Fetched, ResilientFetcher, RetryReason, RetrySignal};
pub use profiles::{ClientProfile, Impersonation, ProfileRotator};
pub use renewal::{IdentityRenewer, RenewalError, TorControl};
pub use transport::{TorTransport, Transport};

/// Timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A single page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw result of a transport call that reached the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Vec<u8>,
    /// URL after redirects were followed.
    pub final_url: String,
    pub headers: HashMap<String, String>,
}

impl FetchOutcome {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport failures. Each variant carries the message of the underlying
/// cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("proxy error: {0}")]
    Proxy(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("tls handshake failed: {0}")]
    Tls(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read body: {0}")]
    Body(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut outcome = FetchOutcome::default();
        outcome
            .headers
            .insert("Location".to_string(), "https://www.onet.pl/".to_string());
        assert_eq!(outcome.header("location"), Some("https://www.onet.pl/"));
        assert_eq!(outcome.header("content-type"), None);
    }

    #[test]
    fn test_request_defaults_to_two_minutes() {
        let req = FetchRequest::new("https://wiadomosci.onet.pl/");
        assert_eq!(req.timeout, Duration::from_secs(120));
        let req = req.with_timeout(Duration::from_secs(5));
        assert_eq!(req.timeout, Duration::from_secs(5));
    }
}
