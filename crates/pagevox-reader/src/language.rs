//! Document language classification
//!
//! Coarse two-way classification (English/French). Explicit declarations win;
//! otherwise a bounded text sample is scored against per-language stopword
//! lists and French must beat English by a fixed margin to be chosen.

use pagevox_dom::Document;
use regex::Regex;
use tracing::debug;

/// Margin ratio the French stopword count must exceed the English count by
const FRENCH_MARGIN: f32 = 1.3;

/// Supported document languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocLanguage {
    #[default]
    English,
    French,
}

impl DocLanguage {
    /// Two-letter code ("en" / "fr")
    pub fn code(self) -> &'static str {
        match self {
            DocLanguage::English => "en",
            DocLanguage::French => "fr",
        }
    }

    /// Language tag submitted with utterances
    pub fn tag(self) -> &'static str {
        match self {
            DocLanguage::English => "en-US",
            DocLanguage::French => "fr-CA",
        }
    }

    fn from_prefix(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if value.starts_with("fr") {
            Some(DocLanguage::French)
        } else if value.starts_with("en") {
            Some(DocLanguage::English)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DocLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Classify the document language.
///
/// Detection order: root `lang` attribute, then a language meta declaration,
/// then the stopword heuristic over at most `sample_bytes` of body text.
/// Ties and missing signal default to English.
pub fn detect_language(doc: &Document, sample_bytes: usize) -> DocLanguage {
    if let Some(root) = doc.root() {
        if let Some(lang) = doc.attribute(root, "lang") {
            if let Some(found) = DocLanguage::from_prefix(lang) {
                debug!(lang, "language from root attribute");
                return found;
            }
        }
    }

    for meta in doc.elements_by_tag("meta") {
        let declares_language = doc
            .attribute(meta, "http-equiv")
            .map(|v| v.eq_ignore_ascii_case("content-language"))
            .unwrap_or(false)
            || doc
                .attribute(meta, "name")
                .map(|v| v.eq_ignore_ascii_case("language"))
                .unwrap_or(false);
        if declares_language {
            if let Some(found) = doc.attribute(meta, "content").and_then(DocLanguage::from_prefix) {
                debug!("language from meta declaration");
                return found;
            }
        }
    }

    let sample = match doc.body() {
        Some(body) => doc.text_content(body),
        None => return DocLanguage::English,
    };
    detect_from_sample(&sample, sample_bytes)
}

/// Stopword-count heuristic over a bounded sample
pub fn detect_from_sample(text: &str, sample_bytes: usize) -> DocLanguage {
    let mut end = sample_bytes.min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end -= 1;
    }
    let sample = text[..end].to_lowercase();

    let french =
        Regex::new(r"\b(le|la|les|des|de|du|un|une|et|avec|pour|sur|au|aux)\b").unwrap();
    let english = Regex::new(r"\b(the|and|with|for|to|of|in|on|by|from)\b").unwrap();

    let fr_hits = french.find_iter(&sample).count();
    let en_hits = english.find_iter(&sample).count();
    debug!(fr_hits, en_hits, "stopword counts");

    if fr_hits as f32 > en_hits as f32 * FRENCH_MARGIN {
        DocLanguage::French
    } else {
        DocLanguage::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_lang_attribute_wins() {
        let doc = Document::parse(r#"<html lang="fr"><body>the the the and and</body></html>"#);
        assert_eq!(detect_language(&doc, 8000), DocLanguage::French);

        let doc = Document::parse(r#"<html lang="en-GB"><body>le la les des</body></html>"#);
        assert_eq!(detect_language(&doc, 8000), DocLanguage::English);
    }

    #[test]
    fn meta_declaration_is_second() {
        let doc = Document::parse(
            r#"<html><head><meta http-equiv="Content-Language" content="fr-CA"></head><body>the and of</body></html>"#,
        );
        assert_eq!(detect_language(&doc, 8000), DocLanguage::French);
    }

    #[test]
    fn stopword_heuristic_decides_without_declarations() {
        let fr = "le chat et la souris jouent avec une pelote pour le plaisir des petits";
        assert_eq!(detect_from_sample(fr, 8000), DocLanguage::French);

        let en = "the cat and the mouse play with a ball of yarn for the joy of children";
        assert_eq!(detect_from_sample(en, 8000), DocLanguage::English);
    }

    #[test]
    fn insufficient_signal_defaults_to_english() {
        assert_eq!(detect_from_sample("12345 67890", 8000), DocLanguage::English);
        assert_eq!(detect_from_sample("", 8000), DocLanguage::English);
    }

    #[test]
    fn sample_truncation_is_char_safe() {
        let text = format!("{}é des des des des", "x".repeat(10));
        // cut lands inside the two-byte é without panicking
        let _ = detect_from_sample(&text, 11);
    }
}
