//! The resilient fetch state machine.
//!
//! ```text
//! profile -> transport ──ok──> classify ──ok──────────────> Page
//!                │                 └──block/soft ban──┐
//!                └──error──────────────────────────── renew ─> Retry
//! ```

use std::fmt;

use tracing::{debug, error, instrument, warn};

use super::{
    BanClassifier, BanVerdict, FetchError, FetchOutcome, FetchRequest, IdentityRenewer,
    ProfileRotator, Transport,
};

/// Why a request should be retried later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Transport(FetchError),
    HardBlock(u16),
    SoftBan,
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::Transport(e) => write!(f, "transport failure: {e}"),
            RetryReason::HardBlock(code) => write!(f, "blocked with status {code}"),
            RetryReason::SoftBan => f.write_str("soft ban (redirected to homepage)"),
        }
    }
}

/// "Temporary failure, safe to retry the same request."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySignal {
    pub url: String,
    pub reason: RetryReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Page(FetchOutcome),
    Retry(RetrySignal),
}

impl Fetched {
    pub fn is_retry(&self) -> bool {
        matches!(self, Fetched::Retry(_))
    }
}

/// Fetches through the anonymizing transport, rotating identity on trouble.
///
/// The rotator is the only mutable state and is owned here, so independent
/// fetchers rotate independently. Wrap the fetcher in an `Arc` to share it
/// between concurrent callers.
#[derive(Debug)]
pub struct ResilientFetcher<T, R> {
    rotator: ProfileRotator,
    transport: T,
    renewer: R,
    classifier: BanClassifier,
}

impl<T, R> ResilientFetcher<T, R>
where
    T: Transport,
    R: IdentityRenewer,
{
    /// Assemble a fetcher from its parts.
    ///
    /// # Arguments
    ///
    /// * `rotator` - Profile source owned by this fetcher
    /// * `transport` - Anonymizing transport used for every request
    /// * `renewer` - Identity renewal channel invoked on failures and bans
    /// * `classifier` - Hard block and soft ban detection
    pub fn new(rotator: ProfileRotator, transport: T, renewer: R, classifier: BanClassifier) -> Self {
        Self {
            rotator,
            transport,
            renewer,
            classifier,
        }
    }

    /// Fetch one page through the anonymizing transport.
    ///
    /// Takes the next profile from the rotator, fetches, and classifies the
    /// response. A transport error, hard block or soft ban triggers one
    /// identity renewal before returning.
    ///
    /// # Arguments
    ///
    /// * `request` - URL and timeout of the page to fetch
    ///
    /// # Returns
    ///
    /// - [`Fetched::Page`] with status, body, final URL and headers when the
    ///   page was served; `content-encoding` is removed because the body is
    ///   already decoded
    /// - [`Fetched::Retry`] naming the reason when the request should be
    ///   repeated later
    ///
    /// Network trouble never panics and never falls back to a direct
    /// connection.
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    pub async fn handle(&self, request: &FetchRequest) -> Fetched {
        let profile = self.rotator.next();
        debug!(%profile, url = %request.url, "Fetching through Tor");

        let mut outcome = match self.transport.fetch(request, &profile).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%profile, error = %e, "Transport failed; rotating identity");
                self.renewer.renew().await;
                return Fetched::Retry(RetrySignal {
                    url: request.url.clone(),
                    reason: RetryReason::Transport(e),
                });
            }
        };

        let reason = match self.classifier.classify(&outcome, &request.url) {
            BanVerdict::Ok => {
                // The transport already decoded the body.
                outcome
                    .headers
                    .retain(|name, _| !name.eq_ignore_ascii_case("content-encoding"));
                debug!(status = outcome.status, final_url = %outcome.final_url, "Fetched page");
                return Fetched::Page(outcome);
            }
            BanVerdict::HardBlock(code) => RetryReason::HardBlock(code),
            BanVerdict::SoftBan => RetryReason::SoftBan,
        };

        warn!(
            %profile,
            ban = %reason,
            final_url = %outcome.final_url,
            "Blocked; rotating identity and signalling retry"
        );
        self.renewer.renew().await;
        Fetched::Retry(RetrySignal {
            url: request.url.clone(),
            reason,
        })
    }
}
