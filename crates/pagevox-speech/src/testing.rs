//! Test support: a recording speech engine
//!
//! Records every submitted utterance and control call but emits no events on
//! its own; tests drive the consumer by injecting events directly. The
//! playback engine's synchronization logic is exercised this way without
//! timers.

use crate::engine::SpeechEngine;
use crate::error::{SpeechError, SpeechResult};
use crate::types::{SpeechConfig, UtteranceOptions, VoiceInfo};
use crate::next_utterance_id;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One recorded `speak` call
#[derive(Debug, Clone)]
pub struct RecordedUtterance {
    pub id: u64,
    pub text: String,
    pub options: UtteranceOptions,
}

#[derive(Debug, Default)]
struct RecordedState {
    utterances: Vec<RecordedUtterance>,
    cancel_calls: usize,
    pause_calls: usize,
    resume_calls: usize,
    speaking: bool,
    paused: bool,
}

/// Recording engine handle; clone to keep inspecting after the engine is
/// moved into the code under test.
#[derive(Debug, Clone, Default)]
pub struct RecordingEngine {
    voices: Vec<VoiceInfo>,
    state: Arc<Mutex<RecordedState>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        Self {
            voices,
            state: Arc::default(),
        }
    }

    pub fn utterances(&self) -> Vec<RecordedUtterance> {
        self.state.lock().unwrap().utterances.clone()
    }

    pub fn last_utterance(&self) -> Option<RecordedUtterance> {
        self.state.lock().unwrap().utterances.last().cloned()
    }

    pub fn cancel_calls(&self) -> usize {
        self.state.lock().unwrap().cancel_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }

    pub fn resume_calls(&self) -> usize {
        self.state.lock().unwrap().resume_calls
    }
}

#[async_trait]
impl SpeechEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn initialize(&mut self, _config: SpeechConfig) -> SpeechResult<()> {
        Ok(())
    }

    async fn list_voices(&self) -> SpeechResult<Vec<VoiceInfo>> {
        Ok(self.voices.clone())
    }

    async fn speak(&mut self, text: &str, options: UtteranceOptions) -> SpeechResult<u64> {
        if text.trim().is_empty() {
            return Err(SpeechError::InvalidInput("empty text".to_string()));
        }
        let id = next_utterance_id();
        let mut state = self.state.lock().unwrap();
        state.utterances.push(RecordedUtterance {
            id,
            text: text.to_string(),
            options,
        });
        state.speaking = true;
        state.paused = false;
        Ok(id)
    }

    async fn pause(&mut self) -> SpeechResult<()> {
        let mut state = self.state.lock().unwrap();
        state.pause_calls += 1;
        if state.speaking {
            state.paused = true;
        }
        Ok(())
    }

    async fn resume(&mut self) -> SpeechResult<()> {
        let mut state = self.state.lock().unwrap();
        state.resume_calls += 1;
        state.paused = false;
        Ok(())
    }

    async fn cancel(&mut self) -> SpeechResult<()> {
        let mut state = self.state.lock().unwrap();
        state.cancel_calls += 1;
        state.speaking = false;
        state.paused = false;
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.state.lock().unwrap().speaking
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }
}
