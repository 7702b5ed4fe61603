//! Data models for extracted article metadata and the final article records.
//!
//! - [`ArticleMetadata`]: flat view over every JSON-LD node found in a page
//! - [`ArticleDraft`]: partially filled article, before validation
//! - [`ArticleRecord`]: validated article, one JSON object per line on output
//!
//! The record uses snake_case field names because downstream consumers read
//! the JSONL stream with those keys.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Words per minute used for the read time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Metadata pulled from the structured-data islands of a page.
///
/// Every field is optional: a missing key is left as `None` so the caller can
/// apply selector-based fallbacks.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleMetadata {
    pub datePublished: Option<String>,
    pub dateModified: Option<String>,
    pub author: Option<String>,
    pub articleSection: Option<String>,
    pub imageUrl: Option<String>,
}

impl ArticleMetadata {
    /// Copy every populated field of `other` over `self`.
    ///
    /// Empty values never clear a field that is already set.
    pub fn merge(&mut self, other: ArticleMetadata) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *slot = Some(v);
            }
        }
        take(&mut self.datePublished, other.datePublished);
        take(&mut self.dateModified, other.dateModified);
        take(&mut self.author, other.author);
        take(&mut self.articleSection, other.articleSection);
        take(&mut self.imageUrl, other.imageUrl);
    }
}

/// Reasons an assembled article is dropped instead of being written out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("url `{0}` is not an absolute http(s) url")]
    InvalidUrl(String),
}

/// An article as gathered from a page, before required fields are checked.
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub title: Option<String>,
    pub url: Option<String>,
    pub date: Option<String>,
    pub lead: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub section: Option<String>,
    pub date_modified: Option<String>,
    pub image_url: Option<String>,
    pub id: Option<String>,
}

impl ArticleDraft {
    /// Validate the draft and turn it into an [`ArticleRecord`].
    ///
    /// `title`, `url`, `date` and `content` must be present and non-empty, and
    /// the url must be an absolute http or https url. Optional fields that are
    /// blank are normalised to `None`. The read time is derived from the
    /// content.
    pub fn into_record(self) -> Result<ArticleRecord, ValidationError> {
        let title = required("title", self.title)?;
        let url = required("url", self.url)?;
        let date = required("date", self.date)?;
        let content = required("content", self.content)?;

        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ValidationError::InvalidUrl(url)),
        }

        let read_time = read_time(&content);
        Ok(ArticleRecord {
            title,
            url,
            date,
            lead: optional(self.lead),
            content,
            author: optional(self.author),
            keywords: optional(self.keywords),
            section: optional(self.section),
            date_modified: optional(self.date_modified),
            image_url: optional(self.image_url),
            id: optional(self.id),
            read_time,
        })
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    optional(value).ok_or(ValidationError::MissingField(name))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A validated article, ready to be handed to the output writer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    /// Publication date as `YYYY-MM-DD`.
    pub date: String,
    pub lead: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub section: Option<String>,
    pub date_modified: Option<String>,
    pub image_url: Option<String>,
    pub id: Option<String>,
    /// Estimated reading time in minutes, never below 1.
    pub read_time: u32,
}

/// Estimated reading time in whole minutes, rounded up, minimum 1.
pub fn read_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
