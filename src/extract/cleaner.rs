//! Article body cleanup.
//!
//! Fragments are joined, cut at the earliest boilerplate marker, and stripped
//! of junk, blank and near-empty lines. Both phrase lists come from
//! configuration.

use itertools::Itertools;

/// Cut the body at the first of these (promo footers, "see also" blocks).
pub const DEFAULT_CUTOFF_MARKERS: &[&str] = &[
    "Dołącz do Premium",
    "i odblokuj wszystkie funkcje",
    "Zobacz także",
    "Onet Premium",
];

/// Drop any line containing one of these.
pub const DEFAULT_JUNK_PHRASES: &[&str] = &[
    "Dołącz do Premium",
    "i odblokuj wszystkie funkcje",
    "dla materiałów Premium",
    "Onet Premium",
    "Kliknij tutaj",
    "Zobacz także",
    "redakcja",
    "Źródło:",
];

/// Lines with fewer non-whitespace characters than this are artifacts.
const MIN_LINE_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNormalizer {
    cutoff_markers: Vec<String>,
    junk_phrases: Vec<String>,
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl ContentNormalizer {
    /// Empty phrases are ignored; they would match everywhere.
    pub fn new(cutoff_markers: Vec<String>, junk_phrases: Vec<String>) -> Self {
        Self {
            cutoff_markers: cutoff_markers.into_iter().filter(|m| !m.is_empty()).collect(),
            junk_phrases: junk_phrases.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn with_default_rules() -> Self {
        Self::new(
            DEFAULT_CUTOFF_MARKERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_JUNK_PHRASES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Normalize article body fragments into one block of text.
    ///
    /// # Arguments
    ///
    /// * `fragments` - Text fragments in document order
    ///
    /// # Returns
    ///
    /// The fragments joined with newlines, cut before the earliest cutoff
    /// marker, with junk, blank and near-empty lines removed and the result
    /// trimmed. Empty input gives an empty string.
    pub fn clean<S: AsRef<str>>(&self, fragments: &[S]) -> String {
        if fragments.is_empty() {
            return String::new();
        }
        let joined = fragments
            .iter()
            .map(AsRef::<str>::as_ref)
            .join("\n")
            .replace('\u{a0}', " ");

        // Earliest offset wins, whatever the marker order.
        let cut = self
            .cutoff_markers
            .iter()
            .filter_map(|m| joined.find(m.as_str()))
            .min()
            .unwrap_or(joined.len());

        joined[..cut]
            .lines()
            .filter(|line| !self.junk_phrases.iter().any(|p| line.contains(p.as_str())))
            .filter(|line| line.chars().filter(|c| !c.is_whitespace()).count() >= MIN_LINE_CHARS)
            .join("\n")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(markers: &[&str], junk: &[&str]) -> ContentNormalizer {
        ContentNormalizer::new(
            markers.iter().map(|s| s.to_string()).collect(),
            junk.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_empty_input() {
        let n = ContentNormalizer::with_default_rules();
        let empty: [&str; 0] = [];
        assert_eq!(n.clean(&empty), "");
    }

    #[test]
    fn test_drops_junk_blank_and_short_lines() {
        let n = normalizer(&[], &["click here"]);
        let result = n.clean(&[
            "  ",
            "Real line one.",
            "xx",
            "Real line two. Buy now and click here",
            "Real line three.",
        ]);
        assert_eq!(result, "Real line one.\nReal line three.");
    }

    #[test]
    fn test_cutoff_removes_marker_and_everything_after() {
        let n = normalizer(&["Read more"], &[]);
        let result = n.clean(&[
            "Start of article",
            "Middle part",
            "Read more below",
            "This should be cut off",
        ]);
        assert!(result.contains("Start of article"));
        assert!(result.contains("Middle part"));
        assert!(!result.contains("Read more"));
        assert!(!result.contains("This should be cut off"));
    }

    #[test]
    fn test_earliest_cutoff_wins_over_marker_order() {
        let n = normalizer(&["Second marker", "First marker"], &[]);
        let result = n.clean(&[
            "Kept paragraph.",
            "First marker here",
            "Between the markers.",
            "Second marker here",
        ]);
        assert_eq!(result, "Kept paragraph.");
    }

    #[test]
    fn test_text_before_marker_on_same_line_survives() {
        let n = normalizer(&["Zobacz także"], &[]);
        let result = n.clean(&["Pierwszy akapit tekstu.", "Koniec zdania. Zobacz także: inne"]);
        assert_eq!(result, "Pierwszy akapit tekstu.\nKoniec zdania.");
    }

    #[test]
    fn test_non_breaking_spaces_are_normalized() {
        let n = normalizer(&[], &[]);
        assert_eq!(n.clean(&["Ala\u{a0}ma kota"]), "Ala ma kota");
    }

    #[test]
    fn test_default_rules_strip_premium_promo() {
        let n = ContentNormalizer::with_default_rules();
        let result = n.clean(&[
            "This is the first paragraph of content.",
            "Źródło: PAP",
            "Dołącz do Premium i odblokuj wszystkie funkcje",
            "Hidden paragraph.",
        ]);
        assert_eq!(result, "This is the first paragraph of content.");
    }

    #[test]
    fn test_empty_marker_is_ignored() {
        let n = normalizer(&[""], &[""]);
        assert_eq!(n.clean(&["Still here."]), "Still here.");
    }
}
