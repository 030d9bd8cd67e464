//! Reader configuration

use crate::error::{ReaderError, ReaderResult};
use serde::{Deserialize, Serialize};

/// Configuration for document processing and playback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Nodes processed per cooperative batch during segment building
    pub yield_batch: usize,
    /// Bytes of body text sampled for language detection
    pub language_sample_bytes: usize,
    /// Maximum bytes of the transcript preview
    pub transcript_limit: usize,
    /// Initial playback rate (1.0 is normal)
    pub default_rate: f32,
    /// Voice catalog polls before giving up and using the engine default
    pub voice_poll_attempts: u32,
    /// Delay between voice catalog polls
    pub voice_poll_interval_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            yield_batch: 2000,
            language_sample_bytes: 8000,
            transcript_limit: 5000,
            default_rate: 1.0,
            voice_poll_attempts: 20,
            voice_poll_interval_ms: 100,
        }
    }
}

impl ReaderConfig {
    pub fn validate(&self) -> ReaderResult<()> {
        if self.yield_batch == 0 {
            return Err(ReaderError::Config {
                field: "yield_batch".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.1..=10.0).contains(&self.default_rate) {
            return Err(ReaderError::Config {
                field: "default_rate".to_string(),
                reason: "must be between 0.1 and 10.0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ReaderConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_batch_and_wild_rates() {
        let mut config = ReaderConfig {
            yield_batch: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.yield_batch = 100;
        config.default_rate = 0.0;
        assert!(config.validate().is_err());
    }
}
