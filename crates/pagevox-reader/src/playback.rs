//! Playback engine
//!
//! A `ReaderSession` owns everything one loaded document needs: the tree,
//! the speakable stream, the spoken buffer and its position map, the
//! navigation cursors, and the speech engine. All shared playback state
//! lives here and is mutated only through the session's own methods, driven
//! by user commands and by engine events the host loop feeds back in.
//!
//! The concurrency discipline is cancel-then-submit: every (re)submission
//! cancels the in-flight utterance first, and every incoming event is
//! checked against the current utterance id so a superseded utterance can
//! never move the cursor or the highlight.

use crate::annotation::{detect_negative_numbers, localize, resolve_overlaps, SourceKind};
use crate::config::ReaderConfig;
use crate::error::ReaderResult;
use crate::highlight::HighlightCommand;
use crate::language::{detect_language, DocLanguage};
use crate::segment::{SegmentBuilder, SegmentKind, SpeakableStream};
use crate::spoken::{word_bounds, SpokenBuffer};
use crossbeam_channel::{Receiver, Sender};
use pagevox_dom::{Document, NodeId};
use pagevox_speech::{
    pick_best_voice, wait_for_voices, SpeechEngine, UtteranceEvent, UtteranceOptions, VoiceInfo,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Playback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "IDLE"),
            PlaybackState::Speaking => write!(f, "SPEAKING"),
            PlaybackState::Paused => write!(f, "PAUSED"),
            PlaybackState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// What the in-flight utterance covers
#[derive(Debug, Clone, Copy)]
enum UtteranceScope {
    /// A suffix of the spoken buffer, submitted starting at `base`
    Buffer { base: usize },
    /// A one-shot element announcement (click or navigation)
    Element { node: NodeId },
}

/// Per-document playback session
pub struct ReaderSession<E: SpeechEngine> {
    doc: Document,
    config: ReaderConfig,
    language: DocLanguage,
    voice: Option<VoiceInfo>,
    stream: SpeakableStream,
    spoken: SpokenBuffer,
    /// Localized spoken text per annotated element, for one-shot speech
    element_texts: HashMap<NodeId, String>,
    engine: E,
    highlight_tx: mpsc::UnboundedSender<HighlightCommand>,
    state: PlaybackState,
    state_tx: Sender<PlaybackState>,
    state_rx: Receiver<PlaybackState>,
    rate: f32,
    /// Original-buffer byte offset of the last spoken word
    cursor: usize,
    current: Option<(u64, UtteranceScope)>,
    focused: Option<NodeId>,
    word_highlighted: bool,
    heading_cursor: Option<usize>,
    abbr_cursor: Option<usize>,
}

impl<E: SpeechEngine> ReaderSession<E> {
    /// Build a session for a freshly loaded document.
    ///
    /// Everything is rebuilt from scratch: segments, spoken buffer, indices,
    /// side tables. Nothing survives from a previous load.
    pub async fn create(
        doc: Document,
        engine: E,
        config: ReaderConfig,
        highlight_tx: mpsc::UnboundedSender<HighlightCommand>,
    ) -> ReaderResult<Self> {
        config.validate()?;

        let language = detect_language(&doc, config.language_sample_bytes);
        let stream = SegmentBuilder::new()
            .with_yield_batch(config.yield_batch)
            .build(&doc)
            .await;

        let mut candidates = localize(&stream.annotations, language);
        candidates.extend(detect_negative_numbers(&stream.original, language));
        let accepted = resolve_overlaps(candidates);
        let spoken = SpokenBuffer::build(&stream.original, &accepted);

        let element_texts: HashMap<NodeId, String> = stream
            .annotations
            .iter()
            .filter_map(|source| match &source.kind {
                SourceKind::Expansion { text } => Some((
                    source.node,
                    format!("{}{}", source.emphasis.prefix(language), text),
                )),
                SourceKind::EmphasizedRun { .. } => None,
            })
            .collect();

        let voices = wait_for_voices(
            &engine,
            config.voice_poll_attempts,
            Duration::from_millis(config.voice_poll_interval_ms),
        )
        .await;
        let voice = pick_best_voice(&voices, language.code()).cloned();

        info!(
            language = %language,
            voice = voice.as_ref().map(|v| v.name.as_str()).unwrap_or("engine default"),
            segments = stream.segments.len(),
            spoken_bytes = spoken.text.len(),
            "reader session ready"
        );

        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        let rate = config.default_rate;
        Ok(Self {
            doc,
            config,
            language,
            voice,
            stream,
            spoken,
            element_texts,
            engine,
            highlight_tx,
            state: PlaybackState::Idle,
            state_tx,
            state_rx,
            rate,
            cursor: 0,
            current: None,
            focused: None,
            word_highlighted: false,
            heading_cursor: None,
            abbr_cursor: None,
        })
    }

    // ---- accessors ----

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Subscribe to playback state transitions
    pub fn subscribe(&self) -> Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn language(&self) -> DocLanguage {
        self.language
    }

    pub fn voice(&self) -> Option<&VoiceInfo> {
        self.voice.as_ref()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn stream(&self) -> &SpeakableStream {
        &self.stream
    }

    pub fn spoken(&self) -> &SpokenBuffer {
        &self.spoken
    }

    pub fn is_empty(&self) -> bool {
        self.spoken.is_empty()
    }

    /// The displayed text, for the read-only transcript view
    pub fn transcript(&self) -> &str {
        &self.stream.original
    }

    /// Length-capped transcript, cut on a char boundary
    pub fn transcript_preview(&self) -> &str {
        let text = &self.stream.original;
        let mut end = self.config.transcript_limit.min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end -= 1;
        }
        &text[..end]
    }

    // ---- playback commands ----

    /// Start or restart playback from the current cursor position
    pub async fn play(&mut self) -> ReaderResult<()> {
        let at = self.cursor;
        self.play_from(at).await
    }

    /// Start playback from an original-buffer offset.
    ///
    /// Cancels any in-flight utterance first, resolves the offset through
    /// the position map (first spoken position at or past it; buffer start
    /// when unresolvable) and submits the spoken-buffer suffix as a single
    /// utterance.
    pub async fn play_from(&mut self, original_offset: usize) -> ReaderResult<()> {
        if self.spoken.is_empty() {
            debug!("empty spoken buffer, play ignored");
            return Ok(());
        }

        self.engine.cancel().await?;
        self.current = None;
        self.clear_highlight();

        let spoken_off = self.spoken.resolve_spoken(original_offset).unwrap_or(0);
        let options = self.options();
        let id = self.engine.speak(&self.spoken.text[spoken_off..], options).await?;

        self.current = Some((id, UtteranceScope::Buffer { base: spoken_off }));
        self.cursor = self.spoken.original_offset(spoken_off).unwrap_or(0);
        self.transition(PlaybackState::Speaking);
        Ok(())
    }

    /// Suspend audio; valid only while speaking, a no-op otherwise
    pub async fn pause(&mut self) -> ReaderResult<()> {
        if self.state != PlaybackState::Speaking {
            return Ok(());
        }
        self.engine.pause().await?;
        self.transition(PlaybackState::Paused);
        Ok(())
    }

    /// Resume in place; valid only while paused, a no-op otherwise
    pub async fn resume(&mut self) -> ReaderResult<()> {
        if self.state != PlaybackState::Paused {
            return Ok(());
        }
        self.engine.resume().await?;
        self.transition(PlaybackState::Speaking);
        Ok(())
    }

    /// Cancel playback and clear all highlight state
    pub async fn stop(&mut self) -> ReaderResult<()> {
        self.engine.cancel().await?;
        self.current = None;
        self.clear_highlight();
        self.transition(PlaybackState::Stopped);
        Ok(())
    }

    /// Change the playback rate. While speaking or paused the current
    /// utterance is re-issued from the last known position so the new rate
    /// takes effect immediately; restarting the current word is acceptable,
    /// losing sync is not.
    pub async fn set_rate(&mut self, rate: f32) -> ReaderResult<()> {
        self.rate = rate.clamp(0.1, 10.0);
        match self.state {
            PlaybackState::Speaking | PlaybackState::Paused => {
                let at = self.cursor;
                self.play_from(at).await
            }
            _ => Ok(()),
        }
    }

    // ---- engine events ----

    /// Apply one engine event. Events from a superseded utterance are
    /// detected by id and discarded.
    pub async fn handle_engine_event(&mut self, event: UtteranceEvent) -> ReaderResult<()> {
        let Some((current_id, scope)) = self.current else {
            debug!(id = event.utterance_id(), "event with no utterance in flight ignored");
            return Ok(());
        };
        if event.utterance_id() != current_id {
            debug!(
                id = event.utterance_id(),
                current = current_id,
                "stale utterance event ignored"
            );
            return Ok(());
        }

        match event {
            UtteranceEvent::Started { .. } => {}
            UtteranceEvent::WordBoundary { char_index, .. } => match scope {
                UtteranceScope::Buffer { base } => {
                    let abs = base + char_index;
                    match self.spoken.original_offset(abs) {
                        Some(orig) => {
                            self.cursor = orig;
                            self.highlight_word_at(orig);
                        }
                        None => warn!(abs, "boundary beyond spoken buffer"),
                    }
                }
                UtteranceScope::Element { node } => self.focus(node),
            },
            UtteranceEvent::Completed { .. } => {
                self.current = None;
                self.clear_highlight();
                if matches!(scope, UtteranceScope::Buffer { .. }) {
                    // whole remainder was one utterance; rewind for replay
                    self.cursor = 0;
                }
                self.transition(PlaybackState::Idle);
            }
            UtteranceEvent::Cancelled { .. } => {
                self.current = None;
                self.clear_highlight();
                self.transition(PlaybackState::Idle);
            }
            UtteranceEvent::Failed { error, .. } => {
                warn!(error = %error, "utterance failed");
                self.current = None;
                self.clear_highlight();
                self.transition(PlaybackState::Idle);
            }
        }
        Ok(())
    }

    // ---- click dispatch ----

    /// Click resolved to a position inside a text node: start speaking from
    /// the corresponding original offset. Unresolvable positions are
    /// silently ignored.
    pub async fn click_text(&mut self, node: NodeId, offset: usize) -> ReaderResult<()> {
        let Some(&idx) = self.stream.text_segments.get(&node) else {
            debug!("click position did not resolve to a speakable run");
            return Ok(());
        };
        let (start, displayed_len) = {
            let seg = &self.stream.segments[idx];
            (seg.start, seg.displayed_len)
        };
        self.play_from(start + offset.min(displayed_len)).await
    }

    /// Click on (or inside) an annotated element: speak its spoken text
    /// immediately instead of resolving through the buffer.
    pub async fn click_element(&mut self, node: NodeId) -> ReaderResult<()> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.stream.element_segments.contains_key(&id) {
                return self.speak_element(id).await;
            }
            current = self.doc.parent(id);
        }
        debug!("click on unannotated element ignored");
        Ok(())
    }

    async fn speak_element(&mut self, node: NodeId) -> ReaderResult<()> {
        let Some(&idx) = self.stream.element_segments.get(&node) else {
            return Ok(());
        };
        let offset = self.stream.segments[idx].start;
        let Some(text) = self.element_texts.get(&node).cloned() else {
            return Ok(());
        };
        self.speak_one_shot(node, text, offset).await
    }

    // ---- navigation ----

    /// Advance the circular heading cursor, speak the heading, and move the
    /// shared playback cursor to it
    pub async fn next_heading(&mut self) -> ReaderResult<()> {
        if self.stream.headings.is_empty() {
            return Ok(());
        }
        let next = self
            .heading_cursor
            .map(|i| (i + 1) % self.stream.headings.len())
            .unwrap_or(0);
        self.heading_cursor = Some(next);
        let entry = self.stream.headings[next].clone();
        self.speak_one_shot(entry.node, entry.text, entry.offset).await
    }

    /// Advance the circular abbreviation cursor and speak its expansion
    pub async fn next_abbreviation(&mut self) -> ReaderResult<()> {
        if self.stream.abbreviations.is_empty() {
            return Ok(());
        }
        let next = self
            .abbr_cursor
            .map(|i| (i + 1) % self.stream.abbreviations.len())
            .unwrap_or(0);
        self.abbr_cursor = Some(next);
        let entry = self.stream.abbreviations[next].clone();
        let text = self
            .element_texts
            .get(&entry.node)
            .cloned()
            .unwrap_or(entry.text);
        self.speak_one_shot(entry.node, text, entry.offset).await
    }

    // ---- internals ----

    fn options(&self) -> UtteranceOptions {
        UtteranceOptions {
            language_tag: self.language.tag().to_string(),
            rate: self.rate,
            voice: self.voice.as_ref().map(|v| v.id.clone()),
        }
    }

    async fn speak_one_shot(
        &mut self,
        node: NodeId,
        text: String,
        offset: usize,
    ) -> ReaderResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.engine.cancel().await?;
        self.current = None;
        self.clear_highlight();

        let options = self.options();
        let id = self.engine.speak(&text, options).await?;
        self.current = Some((id, UtteranceScope::Element { node }));
        self.cursor = offset;
        self.focus(node);
        self.transition(PlaybackState::Speaking);
        Ok(())
    }

    fn highlight_word_at(&mut self, orig: usize) {
        let target = self
            .stream
            .segment_at(orig)
            .map(|(_, seg)| (seg.node, seg.kind, seg.start, seg.displayed_len));
        // separator bytes belong to no segment and highlight nothing
        let Some((node, kind, start, len)) = target else {
            return;
        };

        match kind {
            SegmentKind::Text => {
                let (s, e) = word_bounds(&self.stream.original, orig);
                let s = s.max(start);
                let e = e.min(start + len);
                if s >= e {
                    return;
                }
                self.word_highlighted = true;
                let _ = self.highlight_tx.send(HighlightCommand::Word {
                    node,
                    start: s - start,
                    end: e - start,
                });
            }
            _ => self.focus(node),
        }
    }

    fn focus(&mut self, node: NodeId) {
        if self.focused == Some(node) {
            return;
        }
        if let Some(prev) = self.focused.take() {
            let _ = self.highlight_tx.send(HighlightCommand::Unfocus { node: prev });
        }
        self.focused = Some(node);
        let _ = self.highlight_tx.send(HighlightCommand::Focus { node });
    }

    fn clear_highlight(&mut self) {
        if let Some(prev) = self.focused.take() {
            let _ = self.highlight_tx.send(HighlightCommand::Unfocus { node: prev });
        }
        if self.word_highlighted {
            self.word_highlighted = false;
            let _ = self.highlight_tx.send(HighlightCommand::ClearWord);
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        debug!("Playback state: {} -> {}", self.state, next);
        self.state = next;
        let _ = self.state_tx.send(next);
    }
}
