//! # Tor News Scraper
//!
//! Fetches news articles from a site that blocks automated clients, routing
//! every request through Tor with a rotating browser fingerprint, and writes
//! the extracted articles as JSON lines.
//!
//! ## Usage
//!
//! ```sh
//! tor_news_scraper crawl --urls-file urls.txt -o ./data
//! tor_news_scraper check-proxy
//! ```
//!
//! ## Pipeline
//!
//! 1. **Fetching**: each URL goes through the resilient fetcher; blocks and
//!    soft bans rotate the Tor identity and are retried with backoff
//! 2. **Extraction**: JSON-LD metadata, selector fallbacks, freshness filter
//!    and body cleanup produce an article record
//! 3. **Output**: accepted records are appended to a timestamped JSONL file

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use tor_news_scraper::config::ScraperConfig;
use tor_news_scraper::extract::Assembly;
use tor_news_scraper::fetch::{FetchRequest, TorTransport, Transport};
use tor_news_scraper::outputs::jsonl::JsonlWriter;
use tor_news_scraper::retry::RetryFetch;
use tor_news_scraper::utils::truncate_for_log;

mod cli;

use cli::{CheckProxyArgs, Cli, Command, CrawlArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.config, "Parsed CLI arguments");

    let mut config = ScraperConfig::load(args.config.as_deref().map(Path::new))?;
    if let Some(password) = args.tor_password {
        config.tor.password = Some(password);
    }
    info!(
        proxy = %config.tor.proxy,
        control = %config.tor.control,
        profiles = config.profiles.len(),
        days_limit = config.freshness.days_limit,
        "Configuration ready"
    );

    match args.command {
        Command::Crawl(crawl) => run_crawl(&config, crawl).await,
        Command::CheckProxy(check) => check_proxy(&config, check).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn run_crawl(config: &ScraperConfig, args: CrawlArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();

    let mut urls = args.urls;
    if let Some(path) = &args.urls_file {
        let raw = tokio::fs::read_to_string(path).await?;
        urls.extend(
            raw.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string),
        );
    }
    if urls.is_empty() {
        warn!("No URLs given; nothing to do");
        return Ok(());
    }
    info!(count = urls.len(), concurrency = args.concurrency, "Starting crawl");

    let fetcher = config.fetcher()?;
    let assembler = config.assembler();
    let retry = RetryFetch::new(&fetcher, args.max_retries, Duration::from_secs(2));
    let timeout = config.tor.timeout();
    let mut writer = JsonlWriter::create(&args.output_dir).await?;

    let mut results = stream::iter(urls)
        .map(|url| {
            let retry = &retry;
            async move {
                let request = FetchRequest::new(url).with_timeout(timeout);
                let result = retry.fetch(&request).await;
                (request.url, result)
            }
        })
        .buffer_unordered(args.concurrency.max(1));

    let (mut stale, mut invalid, mut failed) = (0usize, 0usize, 0usize);
    while let Some((url, result)) = results.next().await {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%url, error = %e, "Giving up on URL");
                failed += 1;
                continue;
            }
        };
        match assembler.assemble(&outcome.final_url, &outcome.text()) {
            Assembly::Accepted(record) => writer.write_record(&record).await?,
            Assembly::Stale { .. } => stale += 1,
            Assembly::Invalid(_) => invalid += 1,
        }
    }

    let saved = writer.finish().await?;
    let elapsed = start_time.elapsed();
    info!(
        saved,
        stale,
        invalid,
        failed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Crawl complete"
    );
    Ok(())
}

/// Fetch an IP-echo endpoint through the proxy to confirm Tor is in the path.
#[instrument(level = "info", skip_all, fields(url = %args.url))]
async fn check_proxy(config: &ScraperConfig, args: CheckProxyArgs) -> Result<(), Box<dyn Error>> {
    let transport = TorTransport::new(&config.tor.proxy)?;
    let profile = config.rotator()?.next();
    let request = FetchRequest::new(args.url).with_timeout(Duration::from_secs(30));

    match transport.fetch(&request, &profile).await {
        Ok(outcome) => {
            info!(status = outcome.status, %profile, "Proxy check succeeded");
            println!("Status: {}", outcome.status);
            println!("Final URL: {}", outcome.final_url);
            println!("Body: {}", truncate_for_log(&outcome.text(), 300));
            Ok(())
        }
        Err(e) => {
            error!(error = %e, proxy = %config.tor.proxy, "Proxy check failed");
            Err(e.into())
        }
    }
}
