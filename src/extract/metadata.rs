//! JSON-LD metadata extraction.
//!
//! Every `<script type="application/ld+json">` block is visited in document
//! order. A block may hold one object, an array of objects, or an
//! `{"@graph": [...]}` wrapper. Blocks that fail to parse are skipped.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::models::ArticleMetadata;
use crate::utils::truncate_for_log;

static JSON_LD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});

/// Parse `html` and extract its JSON-LD metadata.
pub fn extract_metadata_from_html(html: &str) -> ArticleMetadata {
    extract_metadata(&Html::parse_document(html))
}

/// Merge the known keys of every JSON-LD node into one [`ArticleMetadata`].
///
/// A later node only overrides a key it defines with a non-empty value.
pub fn extract_metadata(document: &Html) -> ArticleMetadata {
    let mut metadata = ArticleMetadata::default();
    for (index, block) in document.select(&JSON_LD).enumerate() {
        let raw = block.text().collect::<String>();
        let json = match serde_json::from_str::<JsonValue>(raw.trim()) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    block = index,
                    error = %e,
                    preview = %truncate_for_log(raw.trim(), 120),
                    "Skipping malformed JSON-LD block"
                );
                continue;
            }
        };
        for node in nodes(&json) {
            metadata.merge(node_metadata(node));
        }
    }
    debug!(?metadata, "Extracted JSON-LD metadata");
    metadata
}

/// Flatten a block into its objects, in order.
fn nodes(json: &JsonValue) -> Vec<&JsonValue> {
    match json {
        JsonValue::Array(items) => items.iter().flat_map(nodes).collect(),
        JsonValue::Object(obj) => match obj.get("@graph") {
            Some(graph) => {
                let mut out = vec![json];
                out.extend(nodes(graph));
                out
            }
            None => vec![json],
        },
        _ => Vec::new(),
    }
}

fn node_metadata(node: &JsonValue) -> ArticleMetadata {
    ArticleMetadata {
        datePublished: string_field(node.get("datePublished")),
        dateModified: string_field(node.get("dateModified")),
        author: node.get("author").and_then(|a| named(a, "name")),
        articleSection: node.get("articleSection").and_then(|s| match s {
            // Sections are sometimes listed; the first one is the primary.
            JsonValue::Array(items) => items.iter().find_map(|i| string_field(Some(i))),
            other => string_field(Some(other)),
        }),
        imageUrl: node.get("image").and_then(|i| named(i, "url")),
    }
}

/// A plain string, or the `key` field of an object, or the first such value
/// in an array.
fn named(value: &JsonValue, key: &str) -> Option<String> {
    match value {
        JsonValue::String(_) => string_field(Some(value)),
        JsonValue::Object(obj) => string_field(obj.get(key)),
        JsonValue::Array(items) => items.iter().find_map(|v| named(v, key)),
        _ => None,
    }
}

fn string_field(value: Option<&JsonValue>) -> Option<String> {
    value
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
