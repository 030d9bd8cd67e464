//! Error types for speech functionality

use thiserror::Error;

/// Speech error types
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Engine is not available or not initialized
    #[error("Speech engine not available: {0}")]
    EngineNotAvailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Voice not found or not supported
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Utterance submission failed
    #[error("Utterance failed: {0}")]
    UtteranceFailed(String),

    /// Invalid text input
    #[error("Invalid text input: {0}")]
    InvalidInput(String),

    /// Event channel closed (host stopped listening)
    #[error("Event channel closed")]
    ChannelClosed,
}

/// Result type for speech operations
pub type SpeechResult<T> = Result<T, SpeechError>;
