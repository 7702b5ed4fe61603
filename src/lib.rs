//! Anonymized fetching and article extraction for a single hostile news site.
//!
//! The crate has two halves:
//!
//! - [`fetch`]: sends each request through Tor while impersonating a rotating
//!   browser profile, spots hard blocks and homepage-redirect soft bans, and
//!   answers them with a new Tor identity plus a retry signal.
//! - [`extract`]: turns a fetched page into an [`ArticleRecord`] using JSON-LD
//!   metadata, selector fallbacks, a freshness window and body cleanup.
//!
//! Crawl scheduling and storage live outside the crate: a crawl engine calls
//! [`ResilientFetcher::handle`] and feeds pages to [`ArticleAssembler`].
//!
//! ```no_run
//! use tor_news_scraper::config::ScraperConfig;
//! use tor_news_scraper::extract::Assembly;
//! use tor_news_scraper::fetch::{FetchRequest, Fetched};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::default();
//! let fetcher = config.fetcher()?;
//! let assembler = config.assembler();
//!
//! let request = FetchRequest::new("https://wiadomosci.onet.pl/kraj/przyklad/abc123");
//! match fetcher.handle(&request).await {
//!     Fetched::Page(page) => {
//!         if let Assembly::Accepted(record) = assembler.assemble(&page.final_url, &page.text()) {
//!             println!("{}", serde_json::to_string(&record)?);
//!         }
//!     }
//!     Fetched::Retry(signal) => println!("retry later: {}", signal.reason),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod outputs;
pub mod retry;
pub mod utils;

pub use config::{ConfigError, ScraperConfig};
pub use extract::{ArticleAssembler, Assembly};
pub use fetch::{FetchError, FetchOutcome, FetchRequest, Fetched, ResilientFetcher, RetrySignal};
pub use models::{ArticleMetadata, ArticleRecord};
