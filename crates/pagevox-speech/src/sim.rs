//! Simulated speech engine
//!
//! Stands in for a platform synthesizer: paces through the submitted text
//! word by word on tokio timers, emitting a boundary event per word and a
//! completion event at the end. Pause parks the pacing task, cancel makes
//! it exit with a cancellation event. Useful for the demo binary and for
//! exercising playback synchronization without audio hardware.

use crate::engine::{SpeechEngine, UtteranceEvent};
use crate::error::{SpeechError, SpeechResult};
use crate::types::{SpeechConfig, UtteranceOptions, VoiceInfo};
use crate::next_utterance_id;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Tuning for the simulated engine
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Delay between word boundaries at rate 1.0
    pub word_delay_ms: u64,
    /// Voice catalog the engine reports
    pub voices: Vec<VoiceInfo>,
    /// Number of catalog queries that see an empty list before voices
    /// "arrive", mimicking engines that populate asynchronously
    pub catalog_delay_polls: u32,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            word_delay_ms: 200,
            voices: builtin_voices(),
            catalog_delay_polls: 0,
        }
    }
}

fn builtin_voices() -> Vec<VoiceInfo> {
    let entries = [
        ("en-us-1", "Google US English", "en-US"),
        ("en-gb-1", "Google UK English Female", "en-GB"),
        ("fr-fr-1", "Google français", "fr-FR"),
        ("fr-ca-1", "Microsoft Caroline", "fr-CA"),
    ];
    entries
        .iter()
        .map(|(id, name, language)| VoiceInfo {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
        })
        .collect()
}

struct Shared {
    /// In-flight utterance id; 0 means none
    current: AtomicU64,
    paused: AtomicBool,
    catalog_polls: AtomicU32,
}

pub struct SimulatedEngine {
    config: SpeechConfig,
    sim: SimulatedConfig,
    event_tx: mpsc::Sender<UtteranceEvent>,
    shared: Arc<Shared>,
    initialized: bool,
}

impl SimulatedEngine {
    pub fn new(event_tx: mpsc::Sender<UtteranceEvent>) -> Self {
        Self::with_config(SimulatedConfig::default(), event_tx)
    }

    pub fn with_config(sim: SimulatedConfig, event_tx: mpsc::Sender<UtteranceEvent>) -> Self {
        Self {
            config: SpeechConfig::default(),
            sim,
            event_tx,
            shared: Arc::new(Shared {
                current: AtomicU64::new(0),
                paused: AtomicBool::new(false),
                catalog_polls: AtomicU32::new(0),
            }),
            initialized: false,
        }
    }
}

/// Byte offsets of word starts within `text`
pub(crate) fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            starts.push(i);
        }
    }
    starts
}

#[async_trait]
impl SpeechEngine for SimulatedEngine {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn initialize(&mut self, config: SpeechConfig) -> SpeechResult<()> {
        self.config = config;
        self.initialized = true;
        Ok(())
    }

    async fn list_voices(&self) -> SpeechResult<Vec<VoiceInfo>> {
        let polls = self.shared.catalog_polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.sim.catalog_delay_polls {
            return Ok(Vec::new());
        }
        Ok(self.sim.voices.clone())
    }

    async fn speak(&mut self, text: &str, options: UtteranceOptions) -> SpeechResult<u64> {
        if !self.initialized {
            return Err(SpeechError::EngineNotAvailable(
                "engine not initialized".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(SpeechError::InvalidInput("empty text".to_string()));
        }

        let id = next_utterance_id();
        self.shared.current.store(id, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);

        let starts = word_starts(text);
        let rate = options.rate.clamp(0.1, 10.0);
        let delay = Duration::from_millis((self.sim.word_delay_ms as f32 / rate) as u64);
        debug!(
            utterance_id = id,
            words = starts.len(),
            rate,
            voice = options.voice.as_deref().unwrap_or("default"),
            lang = %options.language_tag,
            "submitting utterance"
        );

        let shared = Arc::clone(&self.shared);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            if tx
                .send(UtteranceEvent::Started { utterance_id: id })
                .await
                .is_err()
            {
                return;
            }

            for char_index in starts {
                // pause gate: park until resumed or superseded
                while shared.paused.load(Ordering::SeqCst)
                    && shared.current.load(Ordering::SeqCst) == id
                {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                if shared.current.load(Ordering::SeqCst) != id {
                    let _ = tx.send(UtteranceEvent::Cancelled { utterance_id: id }).await;
                    return;
                }
                if tx
                    .send(UtteranceEvent::WordBoundary {
                        utterance_id: id,
                        char_index,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(delay).await;
            }

            if shared
                .current
                .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let _ = tx.send(UtteranceEvent::Completed { utterance_id: id }).await;
            } else {
                let _ = tx.send(UtteranceEvent::Cancelled { utterance_id: id }).await;
            }
        });

        Ok(id)
    }

    async fn pause(&mut self) -> SpeechResult<()> {
        if self.is_speaking() {
            self.shared.paused.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn resume(&mut self) -> SpeechResult<()> {
        self.shared.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel(&mut self) -> SpeechResult<()> {
        self.shared.current.store(0, Ordering::SeqCst);
        self.shared.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.shared.current.load(Ordering::SeqCst) != 0
    }

    fn is_paused(&self) -> bool {
        self.is_speaking() && self.shared.paused.load(Ordering::SeqCst)
    }
}
