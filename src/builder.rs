//! Builder for configuring and constructing an [`AudioGraphEngine`].

use crate::{AudioGraphEngine, Result};
use cadenza_core::{AlwaysReady, EngineConfig, ReadinessGate};
use cadenza_media::{FileSource, MediaSource};
use std::sync::Arc;

/// Every knob has a sensible default: 44.1 kHz, 512-frame blocks, a
/// 100-entry buffer cache, files resolved relative to the working
/// directory, and no readiness gating.
///
/// # Example
///
/// ```ignore
/// use cadenza::AudioGraphEngine;
///
/// let engine = AudioGraphEngine::builder()
///     .sample_rate(48000.0)
///     .block_size(256)
///     .build()?;
/// ```
pub struct AudioGraphEngineBuilder {
    config: EngineConfig,
    source: Option<Arc<dyn MediaSource>>,
    gate: Option<Arc<dyn ReadinessGate>>,
}

impl Default for AudioGraphEngineBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            source: None,
            gate: None,
        }
    }
}

impl AudioGraphEngineBuilder {
    /// Default: 44100.0
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Render block size in frames. Default: 512
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Buffer cache capacity in decoded clips. Default: 100
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Soft track-count limit. Default: 32
    pub fn max_tracks(mut self, max_tracks: usize) -> Self {
        self.config.max_tracks = max_tracks;
        self
    }

    /// Parameter smoothing ramp in seconds. Default: 0.010
    pub fn smoothing_secs(mut self, secs: f32) -> Self {
        self.config.smoothing_secs = secs;
        self
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Where clip and impulse bytes come from. Default: the filesystem,
    /// relative to the working directory.
    pub fn media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Gate readiness on a host condition (e.g. a user gesture on web-like
    /// platforms). Default: always ready.
    pub fn readiness_gate(mut self, gate: Arc<dyn ReadinessGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn build(self) -> Result<AudioGraphEngine> {
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(FileSource::new(".")));
        let gate = self.gate.unwrap_or_else(|| Arc::new(AlwaysReady));
        AudioGraphEngine::new(self.config, source, gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let engine = AudioGraphEngineBuilder::default().build().unwrap();
        assert_eq!(engine.sample_rate(), 44100.0);
        assert!(engine.is_ready());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(AudioGraphEngineBuilder::default()
            .sample_rate(0.0)
            .build()
            .is_err());
    }
}
