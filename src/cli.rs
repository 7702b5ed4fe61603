//! Command-line interface definitions.
//!
//! Settings that vary per deployment can also come from environment
//! variables.

use clap::{Args, Parser, Subcommand};

/// Fetch news articles through Tor and write them as JSON lines.
///
/// # Examples
///
/// ```sh
/// # Crawl a list of article URLs
/// tor_news_scraper crawl --urls-file urls.txt -o ./data
///
/// # Check that traffic really leaves through Tor
/// tor_news_scraper check-proxy
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true, env = "SCRAPER_CONFIG")]
    pub config: Option<String>,

    /// Tor control port password (overrides the config file)
    #[arg(long, global = true, env = "TOR_PASSWORD", hide_env_values = true)]
    pub tor_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and extract the given article URLs
    Crawl(CrawlArgs),
    /// Fetch the Tor check endpoint through the proxy
    CheckProxy(CheckProxyArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Article URLs to fetch
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and `#` comments ignored)
    #[arg(short, long)]
    pub urls_file: Option<String>,

    /// Output directory for the JSONL file
    #[arg(short, long, default_value = "data")]
    pub output_dir: String,

    /// Requests in flight at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Retries per URL after a block or transport failure
    #[arg(long, default_value_t = 5)]
    pub max_retries: usize,
}

#[derive(Args, Debug)]
pub struct CheckProxyArgs {
    /// Endpoint that reports the exit IP
    #[arg(long, default_value = "https://check.torproject.org/api/ip")]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_parsing() {
        let cli = Cli::parse_from([
            "tor_news_scraper",
            "crawl",
            "https://wiadomosci.onet.pl/kraj/a/abc",
            "-o",
            "/tmp/out",
            "--concurrency",
            "2",
        ]);
        match cli.command {
            Command::Crawl(args) => {
                assert_eq!(args.urls, vec!["https://wiadomosci.onet.pl/kraj/a/abc"]);
                assert_eq!(args.output_dir, "/tmp/out");
                assert_eq!(args.concurrency, 2);
                assert_eq!(args.max_retries, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["tor_news_scraper", "check-proxy", "--config", "scraper.yaml"]);
        assert_eq!(cli.config.as_deref(), Some("scraper.yaml"));
        assert!(matches!(cli.command, Command::CheckProxy(_)));
    }
}
