//! Error types for the reader

use pagevox_speech::SpeechError;
use thiserror::Error;

/// Reader error types.
///
/// Malformed documents are not errors: they degrade to an empty speakable
/// stream and playback commands become no-ops.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Speech engine failure while submitting or controlling an utterance
    #[error("Speech engine error: {0}")]
    Speech(#[from] SpeechError),

    /// Configuration rejected
    #[error("Configuration error: {field}: {reason}")]
    Config { field: String, reason: String },
}

pub type ReaderResult<T> = Result<T, ReaderError>;
