//! The engine's processing clock.
//!
//! A monotonic sample counter advanced by the render loop. All clip
//! scheduling is expressed in samples against this clock; it keeps running
//! whether or not the transport is rolling, like the audio context time of
//! the platforms this engine targets.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sample-accurate render clock.
///
/// Shared as `Arc<RenderClock>` between the render path (which advances it
/// once per block) and control-path readers.
#[derive(Debug)]
pub struct RenderClock {
    samples: AtomicU64,
    sample_rate: f64,
}

impl RenderClock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            samples: AtomicU64::new(0),
            sample_rate,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current position in samples since engine start.
    #[inline]
    pub fn now_samples(&self) -> u64 {
        self.samples.load(Ordering::Acquire)
    }

    /// Current position in seconds since engine start.
    #[inline]
    pub fn now_seconds(&self) -> f64 {
        self.now_samples() as f64 / self.sample_rate
    }

    /// Advance by one rendered block. Render path only.
    #[inline]
    pub fn advance(&self, frames: usize) {
        self.samples.fetch_add(frames as u64, Ordering::AcqRel);
    }

    #[inline]
    pub fn seconds_to_samples(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate).round() as i64
    }

    /// Reset to zero. Only valid while no render is in flight (dispose).
    pub fn reset(&self) {
        self.samples.store(0, Ordering::Release);
    }
}
