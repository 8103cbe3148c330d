//! Master chain: the final fixed path before the hardware output.
//!
//! master gain -> compressor -> soft-clip limiter -> level tap.
//!
//! Defaults follow mastering-bus practice: gentle 4:1 glue compression and
//! a soft clipper just under full scale so transients round off instead of
//! hard-clipping at the converter.

use cadenza_core::{LevelSnapshot, LevelTap, Smoothed};
use cadenza_dsp::{Compressor, SoftClip};

/// Master compressor defaults.
const COMP_THRESHOLD_DB: f32 = -12.0;
const COMP_RATIO: f32 = 4.0;
const COMP_ATTACK_SECS: f32 = 0.005;
const COMP_RELEASE_SECS: f32 = 0.120;
const COMP_KNEE_DB: f32 = 6.0;

/// Soft-clip threshold just below full scale.
const CLIP_THRESHOLD_DB: f32 = -0.3;

pub struct MasterChain {
    volume: f32,
    gain: Smoothed,
    compressor: Compressor,
    clipper: SoftClip,
    tap: LevelTap,
}

impl MasterChain {
    pub fn new(sample_rate: f64, ramp_secs: f32) -> Self {
        Self {
            volume: 1.0,
            gain: Smoothed::new(1.0, ramp_secs, sample_rate),
            compressor: Compressor::new(
                sample_rate,
                COMP_THRESHOLD_DB,
                COMP_RATIO,
                COMP_ATTACK_SECS,
                COMP_RELEASE_SECS,
                COMP_KNEE_DB,
            ),
            clipper: SoftClip::new(CLIP_THRESHOLD_DB),
            tap: LevelTap::new(),
        }
    }

    /// Smooth-ramped master volume.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.max(0.0);
        self.gain.ramp_to(self.volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    pub fn set_compressor_enabled(&mut self, enabled: bool) {
        self.compressor.set_enabled(enabled);
    }

    pub fn set_clipper_enabled(&mut self, enabled: bool) {
        self.clipper.set_enabled(enabled);
    }

    /// Output level in dBFS.
    pub fn level(&self) -> LevelSnapshot {
        self.tap.read()
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.gain.apply_gain_stereo(left, right);
        self.compressor.process_block(left, right);
        self.clipper.process_block(left, right);
        self.tap.measure(left, right);
    }
}
