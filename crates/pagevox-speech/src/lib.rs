//! Speech engine abstraction layer for PageVox
//!
//! This crate provides the types and traits the reader speaks through:
//! utterance events, configuration, voice selection, and the base engine
//! trait. Concrete engines deliver word-boundary and completion events on a
//! channel handed to them at construction; the reader correlates events with
//! utterances through monotonically increasing utterance ids.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod engine;
pub mod error;
pub mod sim;
pub mod testing;
pub mod types;
pub mod voice;

pub use engine::{SpeechEngine, UtteranceEvent};
pub use error::{SpeechError, SpeechResult};
pub use sim::{SimulatedConfig, SimulatedEngine};
pub use types::{SpeechConfig, UtteranceOptions, VoiceInfo};
pub use voice::{pick_best_voice, preferences_for, wait_for_voices};

/// Generates unique utterance ids
static UTTERANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique utterance id
pub fn next_utterance_id() -> u64 {
    UTTERANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
