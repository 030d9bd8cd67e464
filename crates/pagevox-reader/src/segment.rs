//! Speakable segment building
//!
//! Walks the document tree depth-first with an explicit stack and produces
//! the ordered speakable stream: segments, the running original-text buffer,
//! annotation sources for the spoken-text synthesizer, navigation indices,
//! and the node→segment side tables used for click dispatch. Large documents
//! are processed in batches with a cooperative yield between batches; batch
//! size never changes the output.

use crate::annotation::{AnnotationSource, EmphasisLevel, SourceKind};
use pagevox_dom::{Document, NodeId};
use std::collections::HashMap;
use tokio::sync::watch;
use tracing::debug;

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const STRONG_TAGS: &[&str] = &["strong", "b"];
const EMPHASIS_TAGS: &[&str] = &["em", "i", "mark"];

fn is_skippable_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "noscript" | "iframe" | "object")
}

/// One atomic item in the reading-order stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Abbreviation,
    AriaLabel,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub node: NodeId,
    pub kind: SegmentKind,
    /// Byte offset of the segment's displayed text within the original buffer
    pub start: usize,
    /// Byte length of the displayed text (0 for image insertions)
    pub displayed_len: usize,
}

/// Entry in a navigation index
#[derive(Debug, Clone, PartialEq)]
pub struct NavEntry {
    pub node: NodeId,
    /// Text spoken when the entry is selected
    pub text: String,
    /// Original-buffer offset the playback cursor moves to
    pub offset: usize,
}

/// Build progress reported between cooperative batches
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildProgress {
    pub nodes_processed: usize,
    pub segments: usize,
    pub done: bool,
}

/// Output of one document walk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeakableStream {
    pub segments: Vec<Segment>,
    /// Running displayed-text buffer all offsets refer to
    pub original: String,
    /// Facts for the spoken-text synthesizer
    pub annotations: Vec<AnnotationSource>,
    pub headings: Vec<NavEntry>,
    pub abbreviations: Vec<NavEntry>,
    /// Text node → segment index, for click dispatch; discarded wholesale on
    /// every rebuild
    pub text_segments: HashMap<NodeId, usize>,
    /// Annotated element → segment index
    pub element_segments: HashMap<NodeId, usize>,
}

impl SpeakableStream {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment whose displayed span contains the original offset
    pub fn segment_at(&self, offset: usize) -> Option<(usize, &Segment)> {
        let idx = self
            .segments
            .partition_point(|s| s.start <= offset)
            .checked_sub(1)?;
        let seg = &self.segments[idx];
        (offset < seg.start + seg.displayed_len).then_some((idx, seg))
    }
}

pub struct SegmentBuilder {
    yield_batch: usize,
    progress: Option<watch::Sender<BuildProgress>>,
}

impl Default for SegmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self {
            yield_batch: 2000,
            progress: None,
        }
    }

    pub fn with_yield_batch(mut self, nodes: usize) -> Self {
        self.yield_batch = nodes.max(1);
        self
    }

    pub fn with_progress(mut self, tx: watch::Sender<BuildProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Walk the document and produce the speakable stream.
    ///
    /// Yields to the runtime between batches so huge documents never starve
    /// the host loop. A document without a usable root produces an empty
    /// stream, not an error.
    pub async fn build(&self, doc: &Document) -> SpeakableStream {
        let mut stream = SpeakableStream::default();
        let Some(root) = doc.body() else {
            self.report(0, &stream, true);
            return stream;
        };

        let mut stack = vec![root];
        let mut processed = 0usize;

        while let Some(id) = stack.pop() {
            processed += 1;

            if doc.is_element(id) {
                let tag = doc.tag_name(id).unwrap_or("");
                if is_skippable_tag(tag) || is_hidden(doc, id) {
                    continue;
                }

                if HEADING_TAGS.contains(&tag) {
                    let text = doc.text_content(id).trim().to_string();
                    if !text.is_empty() {
                        stream.headings.push(NavEntry {
                            node: id,
                            text,
                            offset: stream.original.len(),
                        });
                    }
                }

                if tag == "abbr" {
                    emit_abbreviation(doc, id, &mut stream);
                } else if doc.has_attribute(id, "aria-label") {
                    emit_aria_label(doc, id, &mut stream);
                } else if tag == "img" {
                    emit_image(doc, id, &mut stream);
                } else {
                    for &child in doc.children(id).iter().rev() {
                        stack.push(child);
                    }
                }
            } else if let Some(val) = doc.text(id) {
                emit_text(doc, id, val, &mut stream);
            }

            if processed % self.yield_batch == 0 {
                self.report(processed, &stream, false);
                tokio::task::yield_now().await;
            }
        }

        self.report(processed, &stream, true);
        debug!(
            segments = stream.segments.len(),
            headings = stream.headings.len(),
            abbreviations = stream.abbreviations.len(),
            original_bytes = stream.original.len(),
            "speakable stream built"
        );
        stream
    }

    fn report(&self, nodes_processed: usize, stream: &SpeakableStream, done: bool) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(BuildProgress {
                nodes_processed,
                segments: stream.segments.len(),
                done,
            });
        }
    }
}

fn is_hidden(doc: &Document, id: NodeId) -> bool {
    doc.has_attribute(id, "hidden") || doc.attribute(id, "aria-hidden") == Some("true")
}

fn emphasis_of(doc: &Document, id: NodeId) -> EmphasisLevel {
    let strong = doc.closest(id, STRONG_TAGS).is_some();
    let emphasis = doc.closest(id, EMPHASIS_TAGS).is_some();
    EmphasisLevel::from_flags(strong, emphasis)
}

/// Append a displayed run to the original buffer, inserting a newline
/// separator when neither side supplies boundary whitespace. Returns the
/// run's start offset.
fn append_run(original: &mut String, text: &str) -> usize {
    if text.is_empty() {
        return original.len();
    }
    if !original.is_empty()
        && !original.ends_with(char::is_whitespace)
        && !text.starts_with(char::is_whitespace)
    {
        original.push('\n');
    }
    let start = original.len();
    original.push_str(text);
    start
}

fn emit_abbreviation(doc: &Document, id: NodeId, stream: &mut SpeakableStream) {
    let displayed = doc.text_content(id);
    let expansion = doc
        .attribute(id, "title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| {
            let fallback = displayed.trim();
            (!fallback.is_empty()).then(|| fallback.to_string())
        });
    let Some(expansion) = expansion else {
        return;
    };

    let start = append_run(&mut stream.original, &displayed);
    push_element_segment(stream, id, SegmentKind::Abbreviation, start, displayed.len());
    stream.annotations.push(AnnotationSource {
        node: id,
        offset: start,
        displayed_len: displayed.len(),
        kind: SourceKind::Expansion {
            text: expansion.clone(),
        },
        emphasis: emphasis_of(doc, id),
    });
    stream.abbreviations.push(NavEntry {
        node: id,
        text: expansion,
        offset: start,
    });
}

fn emit_aria_label(doc: &Document, id: NodeId, stream: &mut SpeakableStream) {
    let label = doc
        .attribute(id, "aria-label")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);
    // empty label still claims the subtree: the element was marked atomic
    let Some(label) = label else {
        return;
    };

    let displayed = doc.text_content(id);
    let start = append_run(&mut stream.original, &displayed);
    push_element_segment(stream, id, SegmentKind::AriaLabel, start, displayed.len());
    stream.annotations.push(AnnotationSource {
        node: id,
        offset: start,
        displayed_len: displayed.len(),
        kind: SourceKind::Expansion { text: label },
        emphasis: emphasis_of(doc, id),
    });
}

fn emit_image(doc: &Document, id: NodeId, stream: &mut SpeakableStream) {
    let label = doc
        .attribute(id, "aria-label")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| doc.attribute(id, "alt").map(str::trim).filter(|t| !t.is_empty()));
    // absent or empty alt means decorative: no segment at all
    let Some(label) = label.map(String::from) else {
        return;
    };

    let start = stream.original.len();
    push_element_segment(stream, id, SegmentKind::Image, start, 0);
    stream.annotations.push(AnnotationSource {
        node: id,
        offset: start,
        displayed_len: 0,
        kind: SourceKind::Expansion { text: label },
        emphasis: EmphasisLevel::None,
    });
}

fn emit_text(doc: &Document, id: NodeId, val: &str, stream: &mut SpeakableStream) {
    if val.trim().is_empty() {
        // no segment, but the bytes still count toward position continuity
        stream.original.push_str(val);
        return;
    }

    let start = append_run(&mut stream.original, val);
    let idx = stream.segments.len();
    stream.segments.push(Segment {
        node: id,
        kind: SegmentKind::Text,
        start,
        displayed_len: val.len(),
    });
    stream.text_segments.insert(id, idx);

    let emphasis = emphasis_of(doc, id);
    if emphasis != EmphasisLevel::None {
        stream.annotations.push(AnnotationSource {
            node: id,
            offset: start,
            displayed_len: val.len(),
            kind: SourceKind::EmphasizedRun {
                text: val.trim().to_string(),
            },
            emphasis,
        });
    }
}

fn push_element_segment(
    stream: &mut SpeakableStream,
    node: NodeId,
    kind: SegmentKind,
    start: usize,
    displayed_len: usize,
) {
    let idx = stream.segments.len();
    stream.segments.push(Segment {
        node,
        kind,
        start,
        displayed_len,
    });
    stream.element_segments.insert(node, idx);
}
