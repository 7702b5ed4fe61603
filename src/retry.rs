//! Retry policy for [`Fetched::Retry`] signals.
//!
//! The fetcher only says "try again later"; this wrapper decides how often
//! and how long to wait, the way a crawl engine's retry middleware would.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use rand::{Rng, rng};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::fetch::{
    FetchOutcome, FetchRequest, Fetched, IdentityRenewer, ResilientFetcher, RetryReason, Transport,
};

/// Every attempt ended in a retry signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up on {url} after {attempts} attempts: {last}")]
pub struct RetryExhausted {
    pub url: String,
    pub attempts: usize,
    pub last: RetryReason,
}

/// Retries a [`ResilientFetcher`] with exponential backoff and jitter.
pub struct RetryFetch<'a, T, R> {
    fetcher: &'a ResilientFetcher<T, R>,
    /// Retries after the first attempt.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<'a, T, R> RetryFetch<'a, T, R>
where
    T: Transport,
    R: IdentityRenewer,
{
    /// Wrap a fetcher with a retry policy.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The fetcher whose retry signals are consumed
    /// * `max_retries` - Retries after the first attempt (5 in the CLI)
    /// * `base_delay` - Delay before the first retry, doubled each time
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = config.fetcher()?;
    /// let retry = RetryFetch::new(&fetcher, 5, Duration::from_secs(2));
    /// let page = retry.fetch(&FetchRequest::new(url)).await?;
    /// ```
    pub fn new(fetcher: &'a ResilientFetcher<T, R>, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            fetcher,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Fetch until a page is served or the retries run out.
    ///
    /// # Errors
    ///
    /// Returns [`RetryExhausted`] carrying the last retry reason once
    /// `max_retries + 1` attempts have all signalled a retry.
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, RetryExhausted> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.fetcher.handle(request).await {
                Fetched::Page(outcome) => {
                    info!(
                        attempts = attempt + 1,
                        status = outcome.status,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        "Fetched page"
                    );
                    return Ok(outcome);
                }
                Fetched::Retry(signal) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            reason = %signal.reason,
                            "Fetch exhausted retries"
                        );
                        return Err(RetryExhausted {
                            url: signal.url,
                            attempts: attempt,
                            last: signal.reason,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        reason = %signal.reason,
                        "Fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn delay_for(&self, attempt: usize) -> StdDuration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T, R> fmt::Debug for RetryFetch<'_, T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}
