//! Spoken buffer construction and offset mapping
//!
//! The spoken buffer is what actually goes to the speech engine: the
//! original text with every accepted annotation's displayed span replaced by
//! its spoken text. The position map carries one entry per spoken byte,
//! giving the original byte offset it came from. Verbatim bytes map to
//! themselves; every byte of a replacement maps to the annotation's start
//! anchor. The map is total and monotonically non-decreasing, which is what
//! makes resuming and highlighting from arbitrary positions exact.

use crate::annotation::Annotation;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpokenBuffer {
    pub text: String,
    pub map: Vec<usize>,
}

impl SpokenBuffer {
    /// Splice `annotations` (sorted, non-overlapping) into `original`.
    ///
    /// A single space is inserted around a replacement when it would
    /// otherwise abut non-whitespace; spacer bytes map to the annotation
    /// anchor so the map invariants are preserved.
    pub fn build(original: &str, annotations: &[Annotation]) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut map: Vec<usize> = Vec::with_capacity(original.len());
        let mut cursor = 0usize;

        for ann in annotations {
            if ann.offset < cursor || ann.offset > original.len() {
                warn!(
                    offset = ann.offset,
                    cursor, "skipping annotation outside the scan window"
                );
                continue;
            }
            let end = (ann.offset + ann.displayed_len).min(original.len());

            text.push_str(&original[cursor..ann.offset]);
            map.extend(cursor..ann.offset);

            if ann.replacement.is_empty() {
                cursor = end;
                continue;
            }

            let anchor = if original.is_empty() {
                0
            } else {
                ann.offset.min(original.len() - 1)
            };

            let needs_space_before = text
                .chars()
                .next_back()
                .map(|c| !c.is_whitespace())
                .unwrap_or(false)
                && !ann.replacement.starts_with(char::is_whitespace);
            if needs_space_before {
                text.push(' ');
                map.push(anchor);
            }

            text.push_str(&ann.replacement);
            map.extend(std::iter::repeat(anchor).take(ann.replacement.len()));

            let needs_space_after = original[end..]
                .chars()
                .next()
                .map(|c| !c.is_whitespace())
                .unwrap_or(false)
                && !ann.replacement.ends_with(char::is_whitespace);
            if needs_space_after {
                text.push(' ');
                map.push(anchor);
            }

            cursor = end;
        }

        text.push_str(&original[cursor..]);
        map.extend(cursor..original.len());

        debug_assert_eq!(text.len(), map.len());
        SpokenBuffer { text, map }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// First spoken offset whose mapped original offset is at or past
    /// `original_offset`, snapped forward to a char boundary. None when the
    /// request lies past everything spoken (callers default to the start).
    pub fn resolve_spoken(&self, original_offset: usize) -> Option<usize> {
        let mut i = self.map.partition_point(|&m| m < original_offset);
        if i >= self.text.len() {
            return None;
        }
        while i < self.text.len() && !self.text.is_char_boundary(i) {
            i += 1;
        }
        (i < self.text.len()).then_some(i)
    }

    /// Original offset for a spoken byte offset
    pub fn original_offset(&self, spoken_offset: usize) -> Option<usize> {
        self.map.get(spoken_offset).copied()
    }
}

/// Byte range of the whitespace-delimited word containing `pos`.
///
/// `pos` is snapped back to a char boundary first; a position on whitespace
/// attaches to the word before it (empty range between two spaces).
pub fn word_bounds(text: &str, pos: usize) -> (usize, usize) {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }

    let start = text[..pos]
        .rfind(char::is_whitespace)
        .map(|i| i + text[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let end = text[pos..]
        .find(char::is_whitespace)
        .map(|i| pos + i)
        .unwrap_or(text.len());

    (start, end)
}
