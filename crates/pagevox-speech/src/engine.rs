//! Speech engine abstraction and utterance events

use crate::error::SpeechResult;
use crate::types::{SpeechConfig, UtteranceOptions, VoiceInfo};
use async_trait::async_trait;

/// Events emitted by an engine while it works through an utterance.
///
/// Every event names the utterance it belongs to; the consumer must discard
/// events whose id no longer matches its current utterance. Word boundaries
/// arrive in non-decreasing `char_index` order within one utterance, but an
/// engine is free to skip or coalesce boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// Playback of the utterance has begun
    Started { utterance_id: u64 },
    /// The engine reached a word. `char_index` is the byte offset of the
    /// word within the submitted text.
    WordBoundary { utterance_id: u64, char_index: usize },
    /// The utterance played to its end
    Completed { utterance_id: u64 },
    /// The utterance was cancelled before completing
    Cancelled { utterance_id: u64 },
    /// The utterance failed mid-flight
    Failed { utterance_id: u64, error: String },
}

impl UtteranceEvent {
    pub fn utterance_id(&self) -> u64 {
        match *self {
            UtteranceEvent::Started { utterance_id }
            | UtteranceEvent::WordBoundary { utterance_id, .. }
            | UtteranceEvent::Completed { utterance_id }
            | UtteranceEvent::Cancelled { utterance_id }
            | UtteranceEvent::Failed { utterance_id, .. } => utterance_id,
        }
    }
}

/// Core speech engine interface
///
/// Implementations submit text for playback and report progress through the
/// event channel supplied at construction time.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Engine name/identifier
    fn name(&self) -> &str;

    /// Initialize the engine with configuration
    async fn initialize(&mut self, config: SpeechConfig) -> SpeechResult<()>;

    /// Available voices. May legitimately be empty while the catalog is
    /// still populating; callers poll rather than block.
    async fn list_voices(&self) -> SpeechResult<Vec<VoiceInfo>>;

    /// Submit text for playback and return its utterance id. Any utterance
    /// already in flight is superseded.
    async fn speak(&mut self, text: &str, options: UtteranceOptions) -> SpeechResult<u64>;

    /// Suspend audio without losing position
    async fn pause(&mut self) -> SpeechResult<()>;

    /// Resume a paused utterance in place
    async fn resume(&mut self) -> SpeechResult<()>;

    /// Cancel any in-flight utterance
    async fn cancel(&mut self) -> SpeechResult<()>;

    /// Whether an utterance is in flight (true also while paused)
    fn is_speaking(&self) -> bool;

    /// Whether the current utterance is paused
    fn is_paused(&self) -> bool;
}
