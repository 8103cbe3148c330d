//! Engine configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for one engine instance.
///
/// Persisted by the external project-storage collaborator; the engine
/// itself is a runtime view over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Render block size in frames. Also the convolution partition size.
    pub block_size: usize,
    /// Buffer cache capacity in entries (LRU beyond this).
    pub cache_capacity: usize,
    /// Hard track-count limit, reported via `is_within_track_limits`.
    pub max_tracks: usize,
    /// Parameter smoothing ramp in seconds.
    pub smoothing_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            block_size: 512,
            cache_capacity: 100,
            max_tracks: 32,
            smoothing_secs: 0.010,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "block_size {} must be a non-zero power of two",
                self.block_size
            )));
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_tracks == 0 {
            return Err(Error::InvalidConfig(
                "max_tracks must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing_secs) {
            return Err(Error::InvalidConfig(format!(
                "smoothing_secs {} out of range (0-1 s)",
                self.smoothing_secs
            )));
        }
        Ok(())
    }
}
