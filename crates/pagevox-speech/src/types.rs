//! Core types for speech functionality

use serde::{Deserialize, Serialize};

/// Engine-level speech configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Enable/disable speech output
    pub enabled: bool,
    /// Default voice id to use when an utterance names none
    pub default_voice: Option<String>,
    /// Default playback rate (1.0 is normal)
    pub default_rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_voice: None,
            default_rate: 1.0,
        }
    }
}

/// Voice information as reported by an engine catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Unique voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// Language tag (e.g. "en-US", "fr-CA")
    pub language: String,
}

/// Options for an individual utterance
#[derive(Debug, Clone)]
pub struct UtteranceOptions {
    /// Language tag submitted with the utterance
    pub language_tag: String,
    /// Playback rate (1.0 is normal)
    pub rate: f32,
    /// Specific voice id, or None for the engine default
    pub voice: Option<String>,
}

impl Default for UtteranceOptions {
    fn default() -> Self {
        Self {
            language_tag: "en-US".to_string(),
            rate: 1.0,
            voice: None,
        }
    }
}
