//! Turns a fetched article page into an [`ArticleRecord`].
//!
//! JSON-LD metadata comes first; visual selectors fill whatever it leaves
//! empty. Pages whose date falls outside the freshness window are skipped,
//! and records missing a required field are dropped.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};

use super::cleaner::ContentNormalizer;
use super::freshness::{FreshnessFilter, normalize_date};
use super::metadata::extract_metadata;
use crate::models::{ArticleDraft, ArticleRecord, ValidationError};

/// Fallback paragraphs shorter than this are navigation crumbs, not prose.
const MIN_FALLBACK_PARAGRAPH: usize = 30;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static TITLE: Lazy<Selector> = Lazy::new(|| selector("h1"));
static LEAD: Lazy<Selector> = Lazy::new(|| selector("#lead"));
static BODY: Lazy<Selector> = Lazy::new(|| selector(".hyphenate"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| selector("p"));
static VISUAL_DATE: Lazy<[Selector; 2]> = Lazy::new(|| {
    [
        selector(".ods-m-date-authorship__publication"),
        selector(r#"span[class*="date"]"#),
    ]
});
static AUTHOR: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        selector(".ods-m-author-xl__name-link"),
        selector(".ods-m-author-xl__name"),
        selector(".authorName"),
    ]
});
static KEYWORDS: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="keywords"]"#));
static STORY_ID: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="data-story-id"]"#));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static URL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([a-z0-9]+)$").expect("static regex"));

/// What became of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    Accepted(ArticleRecord),
    /// Too old, in the future, or undated.
    Stale { date: Option<String> },
    Invalid(ValidationError),
}

#[derive(Debug, Clone, Default)]
pub struct ArticleAssembler {
    freshness: FreshnessFilter,
    normalizer: ContentNormalizer,
}

impl ArticleAssembler {
    pub fn new(freshness: FreshnessFilter, normalizer: ContentNormalizer) -> Self {
        Self {
            freshness,
            normalizer,
        }
    }

    /// Assemble `html` fetched from `url`, judging freshness against today.
    pub fn assemble(&self, url: &str, html: &str) -> Assembly {
        self.assemble_on(url, html, Local::now().date_naive())
    }

    /// Assemble `html` fetched from `url`, judging freshness against `today`.
    ///
    /// Metadata comes from JSON-LD first, then from visual selectors. The
    /// freshness gate runs before the body is extracted, so stale pages cost
    /// no cleanup work.
    ///
    /// # Arguments
    ///
    /// * `url` - Final URL of the page; also the source of the fallback id
    /// * `html` - Raw page markup
    /// * `today` - Reference date for the freshness window
    ///
    /// # Returns
    ///
    /// - [`Assembly::Accepted`] with a validated record
    /// - [`Assembly::Stale`] with the raw date when the page is too old, in
    ///   the future, or undated
    /// - [`Assembly::Invalid`] when a required field is missing or the URL
    ///   is not http(s)
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub fn assemble_on(&self, url: &str, html: &str, today: NaiveDate) -> Assembly {
        let document = Html::parse_document(html);
        let mut metadata = extract_metadata(&document);

        if metadata.datePublished.is_none() {
            metadata.datePublished = VISUAL_DATE.iter().find_map(|s| first_text(&document, s));
        }
        let date = metadata.datePublished.clone();
        if !self.freshness.is_recent_on(date.as_deref(), today) {
            info!(date = ?date, %url, "Skipping stale article");
            return Assembly::Stale { date };
        }

        let content = self.normalizer.clean(&content_fragments(&document));

        let author = metadata
            .author
            .or_else(|| AUTHOR.iter().find_map(|s| first_text(&document, s)));
        let image_url = metadata
            .imageUrl
            .or_else(|| meta_content(&document, &OG_IMAGE));
        let id = meta_content(&document, &STORY_ID).or_else(|| {
            URL_ID
                .captures(url)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        });

        let draft = ArticleDraft {
            title: first_text(&document, &TITLE),
            url: Some(url.to_string()),
            date: date.as_deref().map(normalize_date),
            lead: first_text(&document, &LEAD),
            content: Some(content),
            author,
            keywords: meta_content(&document, &KEYWORDS),
            section: metadata.articleSection,
            date_modified: metadata.dateModified,
            image_url,
            id,
        };

        match draft.into_record() {
            Ok(record) => {
                info!(date = %record.date, %url, read_time = record.read_time, "Saved article");
                Assembly::Accepted(record)
            }
            Err(e) => {
                warn!(error = %e, %url, "Dropping invalid article");
                Assembly::Invalid(e)
            }
        }
    }
}

/// Body text fragments: direct text of `.hyphenate` elements, else long
/// `<p>` texts.
fn content_fragments(document: &Html) -> Vec<String> {
    let fragments: Vec<String> = document
        .select(&BODY)
        .flat_map(direct_text)
        .filter(|t| !t.is_empty())
        .collect();
    if !fragments.is_empty() {
        return fragments;
    }
    document
        .select(&PARAGRAPH)
        .flat_map(direct_text)
        .filter(|t| t.chars().count() > MIN_FALLBACK_PARAGRAPH)
        .collect()
}

fn direct_text(element: ElementRef<'_>) -> Vec<String> {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .collect()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|e| e.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn page(title: &str, date: &str, content: &str, json_ld: Option<bool>) -> String {
        let json_section = match json_ld {
            Some(true) => format!(
                r#"<script type="application/ld+json">
                {{
                    "@graph": [
                        {{
                            "@context": "https://schema.org",
                            "@type": "NewsArticle",
                            "datePublished": "{date}T12:00:00+01:00",
                            "dateModified": "{date}T13:00:00+01:00",
                            "author": {{ "@type": "Person", "name": "Test Author" }},
                            "headline": "{title}",
                            "articleSection": "Test Section",
                            "image": {{ "url": "http://example.com/image.jpg" }}
                        }}
                    ]
                }}
                </script>"#
            ),
            Some(false) => r#"<script type="application/ld+json">{ broken json ... </script>"#.to_string(),
            None => String::new(),
        };
        format!(
            r#"<html>
                <head>
                    {json_section}
                    <meta name="keywords" content="test, news, scraper">
                    <meta name="data-story-id" content="test1234">
                </head>
                <body class="hyphenate">
                    <h1>{title}</h1>
                    <div id="lead">Test Lead</div>
                    <span class="ods-m-date-authorship__publication">{date} 10:00</span>
                    <span class="ods-m-author-xl__name-link">Fallback Author</span>
                    {content}
                </body>
            </html>"#
        )
    }

    fn accepted(assembly: Assembly) -> ArticleRecord {
        match assembly {
            Assembly::Accepted(record) => record,
            other => panic!("expected accepted article, got {other:?}"),
        }
    }

    #[test]
    fn test_json_ld_article() {
        let content = r#"
            <p>This is the first paragraph of content which is definitely longer than thirty characters to pass the filter.</p>
            <p>This is the second paragraph which contains the phrase Dołącz do Premium text and should be cut off.</p>
        "#;
        let html = page("Test Title", "2026-10-17", content, Some(true));
        let record = accepted(ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/test-article",
            &html,
            today(),
        ));

        assert_eq!(record.title, "Test Title");
        assert_eq!(record.date, "2026-10-17");
        assert_eq!(record.author.as_deref(), Some("Test Author"));
        assert_eq!(record.section.as_deref(), Some("Test Section"));
        assert_eq!(record.date_modified.as_deref(), Some("2026-10-17T13:00:00+01:00"));
        assert_eq!(record.image_url.as_deref(), Some("http://example.com/image.jpg"));
        assert_eq!(record.lead.as_deref(), Some("Test Lead"));
        assert!(record.content.contains("This is the first paragraph"));
        assert!(!record.content.contains("Dołącz do Premium"));
        assert_eq!(record.id.as_deref(), Some("test1234"));
        assert_eq!(record.keywords.as_deref(), Some("test, news, scraper"));
        assert_eq!(record.read_time, 1);
    }

    #[test]
    fn test_selector_fallbacks_without_json_ld() {
        let html = page("Fallback Title", "2026-10-16", r#"<p class="hyphenate">Some content here.</p>"#, None);
        let record = accepted(ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/fallback-article",
            &html,
            today(),
        ));

        assert_eq!(record.title, "Fallback Title");
        assert_eq!(record.author.as_deref(), Some("Fallback Author"));
        assert_eq!(record.date, "2026-10-16");
        assert_eq!(record.content, "Some content here.");
        assert_eq!(record.image_url, None);
    }

    #[test]
    fn test_old_article_is_stale() {
        let html = page("Old Title", "2020-01-01", "<p>Old content</p>", Some(true));
        let result = ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/old-article",
            &html,
            today(),
        );
        assert_eq!(
            result,
            Assembly::Stale {
                date: Some("2020-01-01T12:00:00+01:00".to_string())
            }
        );
    }

    #[test]
    fn test_malformed_json_ld_still_assembles() {
        let html = page("Title", "2026-10-17", r#"<p class="hyphenate">Content must be present.</p>"#, Some(false));
        let record = accepted(ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/malformed",
            &html,
            today(),
        ));
        assert_eq!(record.title, "Title");
    }

    #[test]
    fn test_missing_title_is_invalid() {
        let html = page("", "2026-10-17", r#"<p class="hyphenate">Some content here.</p>"#, None);
        let result = ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/untitled",
            &html,
            today(),
        );
        assert_eq!(result, Assembly::Invalid(ValidationError::MissingField("title")));
    }

    #[test]
    fn test_undated_page_is_stale() {
        let html = r#"<html><body><h1>No date</h1><p class="hyphenate">Body text.</p></body></html>"#;
        let result = ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/kraj/no-date/x1",
            html,
            today(),
        );
        assert_eq!(result, Assembly::Stale { date: None });
    }

    #[test]
    fn test_id_falls_back_to_url_segment() {
        let html = r#"<html><body>
            <h1>Tytuł</h1>
            <span class="ods-m-date-authorship__publication">2026-10-17 08:00</span>
            <p class="hyphenate">Treść artykułu.</p>
        </body></html>"#;
        let record = accepted(ArticleAssembler::default().assemble_on(
            "https://wiadomosci.onet.pl/kraj/tytul/x9k2mpl",
            html,
            today(),
        ));
        assert_eq!(record.id.as_deref(), Some("x9k2mpl"));
    }
}
