//! Spoken-text annotations
//!
//! An annotation replaces a displayed span of the original buffer with
//! different spoken text. Sources are element-anchored facts collected by the
//! segment builder (abbreviation expansions, accessible labels, emphasized
//! runs); negative-number normalization is detected here directly from the
//! original text. Ranges must not overlap: expansion beats emphasis beats
//! number normalization, and later overlapping records are dropped.

use crate::language::DocLanguage;
use pagevox_dom::NodeId;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::warn;

/// Visual emphasis derived from strong/bold and em/italic/mark ancestors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmphasisLevel {
    #[default]
    None,
    Strong,
    Emphasis,
    Both,
}

impl EmphasisLevel {
    pub fn from_flags(strong: bool, emphasis: bool) -> Self {
        match (strong, emphasis) {
            (true, true) => EmphasisLevel::Both,
            (true, false) => EmphasisLevel::Strong,
            (false, true) => EmphasisLevel::Emphasis,
            (false, false) => EmphasisLevel::None,
        }
    }

    /// Spoken cue prepended to the annotated text
    pub fn prefix(self, lang: DocLanguage) -> &'static str {
        match (self, lang) {
            (EmphasisLevel::None, _) => "",
            (EmphasisLevel::Strong, _) => "important ",
            (EmphasisLevel::Emphasis, DocLanguage::English) => "emphasis ",
            (EmphasisLevel::Emphasis, DocLanguage::French) => "emphase ",
            (EmphasisLevel::Both, DocLanguage::English) => "important emphasis ",
            (EmphasisLevel::Both, DocLanguage::French) => "important, emphase ",
        }
    }
}

/// Element-anchored fact recorded by the segment builder
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSource {
    pub node: NodeId,
    /// Byte offset of the displayed span within the original buffer
    pub offset: usize,
    /// Byte length of the displayed span (0 for pure insertions)
    pub displayed_len: usize,
    pub kind: SourceKind,
    pub emphasis: EmphasisLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Abbreviation title, accessible label, or image alt text
    Expansion { text: String },
    /// Literal content of a visually emphasized text run
    EmphasizedRun { text: String },
}

/// Annotation kinds in claim-priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnnotationKind {
    Expansion,
    Emphasis,
    Number,
}

/// A resolved, localized replacement rule
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub offset: usize,
    pub displayed_len: usize,
    pub replacement: String,
    pub kind: AnnotationKind,
}

impl Annotation {
    fn end(&self) -> usize {
        self.offset + self.displayed_len
    }
}

/// Localize builder sources into concrete annotations
pub fn localize(sources: &[AnnotationSource], lang: DocLanguage) -> Vec<Annotation> {
    sources
        .iter()
        .map(|source| {
            let (kind, text) = match &source.kind {
                SourceKind::Expansion { text } => (AnnotationKind::Expansion, text),
                SourceKind::EmphasizedRun { text } => (AnnotationKind::Emphasis, text),
            };
            Annotation {
                offset: source.offset,
                displayed_len: source.displayed_len,
                replacement: format!("{}{}", source.emphasis.prefix(lang), text),
                kind,
            }
        })
        .collect()
}

fn minus_token(lang: DocLanguage) -> &'static str {
    match lang {
        DocLanguage::English => "minus",
        DocLanguage::French => "moins",
    }
}

fn negative_token(lang: DocLanguage) -> &'static str {
    match lang {
        DocLanguage::English => "negative",
        DocLanguage::French => "négatif",
    }
}

/// Detect negative-number patterns in the original text.
///
/// A hyphen or true minus sign immediately before a digit sequence (thousands
/// separators and a decimal part allowed), at text start or after
/// whitespace/open-parenthesis, becomes a localized "minus" token; a
/// parenthesized bare number (accounting convention) becomes a localized
/// "negative" token.
pub fn detect_negative_numbers(original: &str, lang: DocLanguage) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    let signed = Regex::new(r"(^|[\s(])([-\x{2212}])(\d[\d,]*(?:\.\d+)?)").unwrap();
    for caps in signed.captures_iter(original) {
        let sign = caps.get(2).unwrap();
        let number = caps.get(3).unwrap();
        annotations.push(Annotation {
            offset: sign.start(),
            displayed_len: number.end() - sign.start(),
            replacement: format!("{} {}", minus_token(lang), number.as_str()),
            kind: AnnotationKind::Number,
        });
    }

    let accounting = Regex::new(r"\(\s*(\d[\d,]*(?:\.\d+)?)\s*\)").unwrap();
    for caps in accounting.captures_iter(original) {
        let whole = caps.get(0).unwrap();
        let number = caps.get(1).unwrap();
        annotations.push(Annotation {
            offset: whole.start(),
            displayed_len: whole.len(),
            replacement: format!("{} {}", negative_token(lang), number.as_str()),
            kind: AnnotationKind::Number,
        });
    }

    annotations
}

/// Enforce the non-overlap invariant.
///
/// Candidates are considered in priority order (expansion, emphasis, number),
/// within a priority by offset; a candidate overlapping an already accepted
/// range is dropped. The result is sorted by offset, ready for splicing.
pub fn resolve_overlaps(mut candidates: Vec<Annotation>) -> Vec<Annotation> {
    candidates.sort_by(|a, b| a.kind.cmp(&b.kind).then(a.offset.cmp(&b.offset)));

    // claimed ranges keyed by start offset, for neighbor checks
    let mut claimed: BTreeMap<usize, usize> = BTreeMap::new();
    let mut accepted = Vec::with_capacity(candidates.len());

    for candidate in candidates.drain(..) {
        // nearest claimed range starting before the candidate's end, and the
        // first one starting inside it
        let clashes = claimed
            .range(..candidate.end())
            .next_back()
            .is_some_and(|(_, &end)| candidate.offset < end)
            || claimed
                .range(candidate.offset..)
                .next()
                .is_some_and(|(&start, _)| start < candidate.end());

        if clashes {
            warn!(
                offset = candidate.offset,
                len = candidate.displayed_len,
                kind = ?candidate.kind,
                "dropping overlapping annotation"
            );
            continue;
        }
        if candidate.displayed_len > 0 {
            claimed.insert(candidate.offset, candidate.end());
        }
        accepted.push(candidate);
    }

    accepted.sort_by_key(|a| a.offset);
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(offset: usize, len: usize) -> Annotation {
        Annotation {
            offset,
            displayed_len: len,
            replacement: "n".to_string(),
            kind: AnnotationKind::Number,
        }
    }

    fn expansion(offset: usize, len: usize) -> Annotation {
        Annotation {
            offset,
            displayed_len: len,
            replacement: "x".to_string(),
            kind: AnnotationKind::Expansion,
        }
    }

    #[test]
    fn signed_number_detected_at_start_and_after_space() {
        let found = detect_negative_numbers("-5 fell to -1,234.5 total", DocLanguage::English);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].offset, 0);
        assert_eq!(found[0].replacement, "minus 5");
        assert_eq!(found[1].replacement, "minus 1,234.5");
    }

    #[test]
    fn signed_number_requires_boundary_before_sign() {
        // hyphenated words and ranges are not negative numbers
        let found = detect_negative_numbers("pages 3-5 and a-1 cell", DocLanguage::English);
        assert!(found.is_empty());
    }

    #[test]
    fn true_minus_sign_is_recognized() {
        let found = detect_negative_numbers("delta \u{2212}7", DocLanguage::English);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].replacement, "minus 7");
    }

    #[test]
    fn accounting_negative_detected() {
        let found = detect_negative_numbers("Revenue was (1,234) this year", DocLanguage::English);
        assert_eq!(found.len(), 1);
        let ann = &found[0];
        assert_eq!(ann.offset, 12);
        assert_eq!(ann.displayed_len, "(1,234)".len());
        assert_eq!(ann.replacement, "negative 1,234");
    }

    #[test]
    fn french_tokens_used_for_french_documents() {
        let found = detect_negative_numbers("solde -3 et (25)", DocLanguage::French);
        assert_eq!(found[0].replacement, "moins 3");
        assert_eq!(found[1].replacement, "négatif 25");
    }

    #[test]
    fn emphasis_prefixes_by_level_and_language() {
        assert_eq!(EmphasisLevel::Both.prefix(DocLanguage::English), "important emphasis ");
        assert_eq!(EmphasisLevel::Both.prefix(DocLanguage::French), "important, emphase ");
        assert_eq!(EmphasisLevel::Strong.prefix(DocLanguage::French), "important ");
        assert_eq!(EmphasisLevel::Emphasis.prefix(DocLanguage::French), "emphase ");
        assert_eq!(EmphasisLevel::None.prefix(DocLanguage::English), "");
    }

    #[test]
    fn overlapping_lower_priority_annotation_is_dropped() {
        let kept = resolve_overlaps(vec![number(2, 6), expansion(0, 4)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind, AnnotationKind::Expansion);
    }

    #[test]
    fn overlap_drop_is_priority_not_position() {
        // expansion discovered "later" (higher offset) still beats the number
        let kept = resolve_overlaps(vec![number(0, 4), expansion(2, 6)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].kind, AnnotationKind::Expansion);
    }

    #[test]
    fn disjoint_annotations_all_survive_in_offset_order() {
        let kept = resolve_overlaps(vec![number(10, 3), expansion(0, 4), number(5, 2)]);
        let offsets: Vec<usize> = kept.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 5, 10]);
    }

    #[test]
    fn zero_length_insertion_coexists_with_adjacent_range() {
        let image = Annotation {
            offset: 4,
            displayed_len: 0,
            replacement: "Logo".to_string(),
            kind: AnnotationKind::Expansion,
        };
        let kept = resolve_overlaps(vec![image.clone(), number(5, 2)]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], image);
    }
}
