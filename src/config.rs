//! Scraper configuration.
//!
//! Loaded from an optional YAML file. Every field has a default, so an empty
//! file (or none at all) gives the stock setup for the target site:
//!
//! ```yaml
//! profiles: [chrome120, safari17_2_ios]
//! tor:
//!   proxy: socks5h://127.0.0.1:9050
//!   control: 127.0.0.1:9051
//!   password: hunter2
//!   timeout_secs: 120
//! soft_ban:
//!   article_pattern: 'wiadomosci\.onet\.pl/[a-z0-9-]+/[a-z0-9-]+/[a-z0-9]+'
//!   homepages: [https://www.onet.pl]
//! freshness:
//!   days_limit: 3
//! cleaner:
//!   cutoff_markers: [Zobacz także]
//!   junk_phrases: [Źródło:]
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::extract::cleaner::{DEFAULT_CUTOFF_MARKERS, DEFAULT_JUNK_PHRASES};
use crate::extract::freshness::DEFAULT_DAYS_LIMIT;
use crate::extract::{ArticleAssembler, ContentNormalizer, FreshnessFilter};
use crate::fetch::classifier::DEFAULT_ARTICLE_PATTERN;
use crate::fetch::profiles::DEFAULT_PROFILES;
use crate::fetch::{
    BanClassifier, ClientProfile, ProfileRotator, ResilientFetcher, TorControl, TorTransport,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub profiles: Vec<String>,
    pub tor: TorConfig,
    pub soft_ban: SoftBanConfig,
    pub freshness: FreshnessConfig,
    pub cleaner: CleanerConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILES.iter().map(|s| s.to_string()).collect(),
            tor: TorConfig::default(),
            soft_ban: SoftBanConfig::default(),
            freshness: FreshnessConfig::default(),
            cleaner: CleanerConfig::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TorConfig {
    /// SOCKS proxy. `socks5h` resolves hostnames inside Tor.
    pub proxy: String,
    /// Control port as `host:port`.
    pub control: String,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            proxy: "socks5h://127.0.0.1:9050".to_string(),
            control: "127.0.0.1:9051".to_string(),
            password: None,
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for TorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TorConfig")
            .field("proxy", &self.proxy)
            .field("control", &self.control)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SoftBanConfig {
    /// Regex a request URL must match to count as an article.
    pub article_pattern: String,
    pub homepages: Vec<String>,
}

impl Default for SoftBanConfig {
    fn default() -> Self {
        Self {
            article_pattern: DEFAULT_ARTICLE_PATTERN.to_string(),
            homepages: ["https://www.onet.pl", "http://www.onet.pl", "https://onet.pl", "http://onet.pl"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub days_limit: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            days_limit: DEFAULT_DAYS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub cutoff_markers: Vec<String>,
    pub junk_phrases: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            cutoff_markers: DEFAULT_CUTOFF_MARKERS.iter().map(|s| s.to_string()).collect(),
            junk_phrases: DEFAULT_JUNK_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScraperConfig {
    /// Load from `path`, or return the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Io`] if the file cannot be read
    /// - [`ConfigError::Yaml`] if it is not valid YAML for this schema
    /// - [`ConfigError::Invalid`] if [`validate`](Self::validate) rejects it
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config = Self::from_yaml(&raw)?;
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Check that the profile list is non-empty, the proxy is a SOCKS5 URL,
    /// the freshness window is not negative, and the article pattern
    /// compiles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("profile list is empty".to_string()));
        }
        if self.freshness.days_limit < 0 {
            return Err(ConfigError::Invalid(format!(
                "freshness.days_limit must be >= 0, got {}",
                self.freshness.days_limit
            )));
        }
        TorTransport::new(&self.tor.proxy).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.classifier()?;
        Ok(())
    }

    pub fn rotator(&self) -> Result<ProfileRotator, ConfigError> {
        let catalog = self
            .profiles
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(ClientProfile::from)
            .collect();
        ProfileRotator::new(catalog)
            .ok_or_else(|| ConfigError::Invalid("profile list is empty".to_string()))
    }

    pub fn classifier(&self) -> Result<BanClassifier, ConfigError> {
        BanClassifier::new(&self.soft_ban.article_pattern, &self.soft_ban.homepages).map_err(|e| {
            ConfigError::Invalid(format!(
                "soft_ban.article_pattern '{}': {e}",
                self.soft_ban.article_pattern
            ))
        })
    }

    pub fn assembler(&self) -> ArticleAssembler {
        ArticleAssembler::new(
            FreshnessFilter::new(self.freshness.days_limit),
            ContentNormalizer::new(
                self.cleaner.cutoff_markers.clone(),
                self.cleaner.junk_phrases.clone(),
            ),
        )
    }

    /// The production fetcher: Tor SOCKS transport plus control-port renewal.
    pub fn fetcher(&self) -> Result<ResilientFetcher<TorTransport, TorControl>, ConfigError> {
        let transport =
            TorTransport::new(&self.tor.proxy).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let renewer = TorControl::new(&self.tor.control, self.tor.password.clone());
        Ok(ResilientFetcher::new(
            self.rotator()?,
            transport,
            renewer,
            self.classifier()?,
        ))
    }
}
