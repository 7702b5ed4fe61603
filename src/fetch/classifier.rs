//! Ban detection for fetched pages.
//!
//! The target answers blocked clients in two ways: an explicit 403/503, or a
//! quiet redirect of an article URL to the bare homepage ("soft ban"). The
//! soft-ban heuristic is policy, not truth, so both the article pattern and
//! the homepage forms are supplied by configuration.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;
use url::Url;

use super::FetchOutcome;

/// Status codes treated as an explicit block.
pub const HARD_BLOCK_STATUSES: [u16; 2] = [403, 503];

/// Article URLs on the news subdomain: `/<section>/<slug>/<id>`. Section
/// listings and the subdomain root do not match.
pub const DEFAULT_ARTICLE_PATTERN: &str = r"wiadomosci\.onet\.pl/[a-z0-9-]+/[a-z0-9-]+/[a-z0-9]+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanVerdict {
    Ok,
    HardBlock(u16),
    SoftBan,
}

impl fmt::Display for BanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BanVerdict::Ok => f.write_str("ok"),
            BanVerdict::HardBlock(code) => write!(f, "hard block ({code})"),
            BanVerdict::SoftBan => f.write_str("soft ban (homepage redirect)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BanClassifier {
    article_pattern: Regex,
    homepages: HashSet<String>,
}

impl BanClassifier {
    /// `article_pattern` marks request URLs that point at an article;
    /// `homepages` lists the bare homepage URLs a soft ban lands on.
    pub fn new<I, S>(article_pattern: &str, homepages: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            article_pattern: Regex::new(article_pattern)?,
            homepages: homepages
                .into_iter()
                .map(|h| normalize_url(h.as_ref()))
                .collect(),
        })
    }

    /// Judge a transport outcome.
    ///
    /// # Arguments
    ///
    /// * `outcome` - What the transport returned
    /// * `request_url` - The URL originally requested
    ///
    /// # Returns
    ///
    /// [`BanVerdict::HardBlock`] for 403/503 whatever the URL. Otherwise
    /// [`BanVerdict::SoftBan`] when an article URL landed on a homepage,
    /// either as the final URL or as the `Location` of an unfollowed 3xx.
    /// [`BanVerdict::Ok`] in every other case.
    pub fn classify(&self, outcome: &FetchOutcome, request_url: &str) -> BanVerdict {
        if HARD_BLOCK_STATUSES.contains(&outcome.status) {
            return BanVerdict::HardBlock(outcome.status);
        }
        if !self.article_pattern.is_match(request_url) {
            return BanVerdict::Ok;
        }
        if self.is_homepage(&outcome.final_url) {
            return BanVerdict::SoftBan;
        }
        // A redirect the transport did not follow still counts.
        if (300..400).contains(&outcome.status) {
            if let Some(location) = outcome.header("location") {
                let target = Url::parse(&outcome.final_url)
                    .and_then(|base| base.join(location))
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| location.to_string());
                if self.is_homepage(&target) {
                    return BanVerdict::SoftBan;
                }
            }
        }
        BanVerdict::Ok
    }

    fn is_homepage(&self, url: &str) -> bool {
        self.homepages.contains(&normalize_url(url))
    }
}

/// Drop query and fragment, then any trailing slash.
fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw
            .trim()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> BanClassifier {
        BanClassifier::new(
            DEFAULT_ARTICLE_PATTERN,
            [
                "https://www.onet.pl",
                "http://www.onet.pl",
                "https://onet.pl",
                "http://onet.pl",
            ],
        )
        .unwrap()
    }

    fn outcome(status: u16, final_url: &str) -> FetchOutcome {
        FetchOutcome {
            status,
            final_url: final_url.to_string(),
            ..Default::default()
        }
    }

    const ARTICLE: &str = "https://wiadomosci.onet.pl/kraj/artykul-polityczny/abc123";

    #[test]
    fn test_hard_block_regardless_of_final_url() {
        let c = classifier();
        assert_eq!(c.classify(&outcome(403, ARTICLE), ARTICLE), BanVerdict::HardBlock(403));
        assert_eq!(
            c.classify(&outcome(503, "https://www.onet.pl/"), ARTICLE),
            BanVerdict::HardBlock(503)
        );
    }

    #[test]
    fn test_soft_ban_on_homepage_landing() {
        let c = classifier();
        assert_eq!(c.classify(&outcome(200, "https://www.onet.pl/"), ARTICLE), BanVerdict::SoftBan);
        assert_eq!(c.classify(&outcome(200, "https://www.onet.pl"), ARTICLE), BanVerdict::SoftBan);
        assert_eq!(
            c.classify(&outcome(200, "https://www.onet.pl/?pid=xyz"), ARTICLE),
            BanVerdict::SoftBan
        );
    }

    #[test]
    fn test_homepage_landing_from_listing_page_is_ok() {
        let c = classifier();
        for listing in [
            "https://www.onet.pl/",
            "https://wiadomosci.onet.pl/",
            "https://wiadomosci.onet.pl/kraj",
            "https://wiadomosci.onet.pl/swiat?page=2",
        ] {
            assert_eq!(
                c.classify(&outcome(200, "https://www.onet.pl/"), listing),
                BanVerdict::Ok,
                "{listing}"
            );
        }
    }

    #[test]
    fn test_article_served_is_ok() {
        let c = classifier();
        assert_eq!(c.classify(&outcome(200, ARTICLE), ARTICLE), BanVerdict::Ok);
    }

    #[test]
    fn test_unfollowed_redirect_to_homepage_is_soft_ban() {
        let c = classifier();
        let mut o = outcome(302, ARTICLE);
        o.headers
            .insert("Location".to_string(), "https://www.onet.pl/?pid=xyz".to_string());
        assert_eq!(c.classify(&o, ARTICLE), BanVerdict::SoftBan);
    }

    #[test]
    fn test_redirect_elsewhere_is_ok() {
        let c = classifier();
        let mut o = outcome(301, ARTICLE);
        o.headers
            .insert("location".to_string(), "/kraj/artykul-polityczny/abc123?amp".to_string());
        assert_eq!(c.classify(&o, ARTICLE), BanVerdict::Ok);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(BanClassifier::new("(unclosed", ["https://onet.pl"]).is_err());
    }
}
