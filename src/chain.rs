//! Per-track effects chain.
//!
//! Fixed-order stage pipeline, one instance per track:
//!
//! input gain -> 3-band EQ -> gate -> compressor -> soft-clip limiter ->
//! analysis tap -> reverb send -> stereo pan
//!
//! The topology never changes at runtime; bypassing an effect disables its
//! contribution in place. All parameter updates land through lock-free
//! cells or smoothed ramps, so the control path can retune any stage while
//! the render path is inside `process_block`.

use crate::model::TrackConfig;
use cadenza_core::{LevelSnapshot, LevelTap, Smoothed};
use cadenza_dsp::{Compressor, Gate, Panner, ReverbSend, SoftClip, ThreeBandEq};
use cadenza_media::ImpulseResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifies one stage of the chain for enable/bypass control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectType {
    Eq,
    Gate,
    Compressor,
    Limiter,
    Reverb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqParams {
    pub low_gain_db: f32,
    pub mid_gain_db: f32,
    pub mid_frequency_hz: f32,
    pub high_gain_db: f32,
    pub bypass: bool,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            low_gain_db: 0.0,
            mid_gain_db: 0.0,
            mid_frequency_hz: 1000.0,
            high_gain_db: 0.0,
            bypass: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub knee_db: f32,
    pub bypass: bool,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 3.0,
            attack_ms: 10.0,
            release_ms: 250.0,
            knee_db: 6.0,
            bypass: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateParams {
    pub threshold_db: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    /// Attenuation while closed, <= 0 dB.
    pub range_db: f32,
    pub bypass: bool,
}

impl Default for GateParams {
    fn default() -> Self {
        // Threshold below the meter floor keeps the default gate open.
        Self {
            threshold_db: -100.0,
            attack_ms: 5.0,
            release_ms: 100.0,
            range_db: -80.0,
            bypass: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimiterParams {
    pub threshold_db: f32,
    pub release_ms: f32,
    /// Reported through latency compensation.
    pub lookahead_ms: f32,
    pub bypass: bool,
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            threshold_db: -1.0,
            release_ms: 50.0,
            lookahead_ms: 0.0,
            bypass: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbParams {
    /// Wet/dry balance in [0, 1].
    pub mix: f32,
    /// Decay used when synthesizing a fallback impulse.
    pub decay_seconds: f64,
    pub pre_delay_ms: f32,
    /// Named impulse to convolve against; `None` uses a generated one
    /// once the mix is raised above zero.
    pub impulse_response_id: Option<String>,
    pub bypass: bool,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            mix: 0.0,
            decay_seconds: 1.5,
            pre_delay_ms: 0.0,
            impulse_response_id: None,
            bypass: false,
        }
    }
}

pub struct TrackEffectsChain {
    gain: f32,
    playback_muted: bool,
    input_gain: Smoothed,

    eq: ThreeBandEq,
    gate: Gate,
    compressor: Compressor,
    limiter: SoftClip,
    tap: Arc<LevelTap>,
    reverb: ReverbSend,
    pan: Panner,

    eq_params: EqParams,
    compressor_params: CompressorParams,
    gate_params: GateParams,
    limiter_params: LimiterParams,
    reverb_params: ReverbParams,

    /// Set when the reverb needs a (re)loaded impulse response.
    ir_dirty: bool,
}

impl TrackEffectsChain {
    pub fn new(sample_rate: f64, block_size: usize, ramp_secs: f32, config: &TrackConfig) -> Self {
        let eq_params = EqParams::default();
        let compressor_params = CompressorParams::default();
        let gate_params = GateParams::default();
        let limiter_params = LimiterParams::default();
        let reverb_params = ReverbParams::default();

        let mut chain = Self {
            gain: config.gain.max(0.0),
            playback_muted: config.muted,
            input_gain: Smoothed::new(
                if config.muted { 0.0 } else { config.gain.max(0.0) },
                ramp_secs,
                sample_rate,
            ),
            eq: ThreeBandEq::new(sample_rate),
            gate: Gate::new(
                sample_rate,
                gate_params.threshold_db,
                gate_params.attack_ms / 1000.0,
                gate_params.release_ms / 1000.0,
                gate_params.range_db,
            ),
            compressor: Compressor::new(
                sample_rate,
                compressor_params.threshold_db,
                compressor_params.ratio,
                compressor_params.attack_ms / 1000.0,
                compressor_params.release_ms / 1000.0,
                compressor_params.knee_db,
            ),
            limiter: SoftClip::new(limiter_params.threshold_db),
            tap: Arc::new(LevelTap::new()),
            reverb: ReverbSend::new(sample_rate, block_size, ramp_secs),
            pan: Panner::new(sample_rate, ramp_secs),
            eq_params,
            compressor_params,
            gate_params,
            limiter_params,
            reverb_params,
            ir_dirty: false,
        };
        chain.pan.set_pan(config.pan);
        chain
    }

    /// User gain for this track. The effective input gain also folds in the
    /// resolved mute/solo state.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
        self.retarget_input_gain();
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan.set_pan(pan);
    }

    /// Resolved playback mute (mute/solo policy), applied as a ramped gain
    /// so changes mid-playback never click and never reschedule clips.
    pub fn set_playback_muted(&mut self, muted: bool) {
        self.playback_muted = muted;
        self.retarget_input_gain();
    }

    fn retarget_input_gain(&mut self) {
        let target = if self.playback_muted { 0.0 } else { self.gain };
        self.input_gain.ramp_to(target);
    }

    pub fn update_eq(&mut self, f: impl FnOnce(&mut EqParams)) {
        f(&mut self.eq_params);
        let p = &self.eq_params;
        self.eq.set_low_gain_db(p.low_gain_db);
        self.eq.set_mid_gain_db(p.mid_gain_db);
        self.eq.set_mid_frequency(p.mid_frequency_hz);
        self.eq.set_high_gain_db(p.high_gain_db);
        self.eq.set_enabled(!p.bypass);
    }

    pub fn update_compressor(&mut self, f: impl FnOnce(&mut CompressorParams)) {
        f(&mut self.compressor_params);
        let p = &self.compressor_params;
        self.compressor.set_threshold_db(p.threshold_db);
        self.compressor.set_ratio(p.ratio);
        self.compressor.set_attack_secs(p.attack_ms / 1000.0);
        self.compressor.set_release_secs(p.release_ms / 1000.0);
        self.compressor.set_knee_db(p.knee_db);
        self.compressor.set_enabled(!p.bypass);
    }

    pub fn update_gate(&mut self, f: impl FnOnce(&mut GateParams)) {
        f(&mut self.gate_params);
        let p = &self.gate_params;
        self.gate.set_threshold_db(p.threshold_db);
        self.gate.set_attack_secs(p.attack_ms / 1000.0);
        self.gate.set_release_secs(p.release_ms / 1000.0);
        self.gate.set_range_db(p.range_db);
        self.gate.set_enabled(!p.bypass);
    }

    pub fn update_limiter(&mut self, f: impl FnOnce(&mut LimiterParams)) {
        f(&mut self.limiter_params);
        let p = &self.limiter_params;
        self.limiter.set_threshold_db(p.threshold_db);
        self.limiter.set_release_secs(p.release_ms / 1000.0);
        self.limiter.set_lookahead_secs(p.lookahead_ms / 1000.0);
        self.limiter.set_enabled(!p.bypass);
    }

    pub fn update_reverb(&mut self, f: impl FnOnce(&mut ReverbParams)) {
        let before = (
            self.reverb_params.impulse_response_id.clone(),
            self.reverb_params.decay_seconds,
        );
        f(&mut self.reverb_params);
        self.reverb_params.mix = self.reverb_params.mix.clamp(0.0, 1.0);
        let p = &self.reverb_params;
        self.reverb.set_mix(p.mix);
        self.reverb.set_pre_delay_secs(p.pre_delay_ms / 1000.0);
        self.reverb.set_enabled(!p.bypass);

        let needs_impulse = p.mix > 0.0 && !p.bypass;
        let impulse_changed =
            before != (p.impulse_response_id.clone(), p.decay_seconds) || !self.reverb.has_impulse();
        if needs_impulse && impulse_changed {
            self.ir_dirty = true;
        }
    }

    pub fn enable_effect(&mut self, effect: EffectType, enabled: bool) {
        match effect {
            EffectType::Eq => self.update_eq(|p| p.bypass = !enabled),
            EffectType::Gate => self.update_gate(|p| p.bypass = !enabled),
            EffectType::Compressor => self.update_compressor(|p| p.bypass = !enabled),
            EffectType::Limiter => self.update_limiter(|p| p.bypass = !enabled),
            EffectType::Reverb => self.update_reverb(|p| p.bypass = !enabled),
        }
    }

    pub fn eq_params(&self) -> EqParams {
        self.eq_params
    }

    pub fn compressor_params(&self) -> CompressorParams {
        self.compressor_params
    }

    pub fn gate_params(&self) -> GateParams {
        self.gate_params
    }

    pub fn limiter_params(&self) -> LimiterParams {
        self.limiter_params
    }

    pub fn reverb_params(&self) -> &ReverbParams {
        &self.reverb_params
    }

    /// Limiter lookahead in seconds, for latency accounting.
    pub fn limiter_lookahead_secs(&self) -> f64 {
        if self.limiter_params.bypass {
            0.0
        } else {
            self.limiter_params.lookahead_ms as f64 / 1000.0
        }
    }

    /// True once since the last call if the reverb wants an impulse load.
    pub fn take_ir_dirty(&mut self) -> bool {
        std::mem::take(&mut self.ir_dirty)
    }

    pub fn set_reverb_impulse(&mut self, impulse: &ImpulseResponse) -> crate::Result<()> {
        self.reverb.set_impulse(&impulse.left, &impulse.right)?;
        Ok(())
    }

    /// Analysis tap reading (post-dynamics, pre-pan), in dBFS.
    pub fn level(&self) -> LevelSnapshot {
        self.tap.read()
    }

    pub fn level_tap(&self) -> Arc<LevelTap> {
        self.tap.clone()
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.input_gain.apply_gain_stereo(left, right);
        self.eq.process_block(left, right);
        self.gate.process_block(left, right);
        self.compressor.process_block(left, right);
        self.limiter.process_block(left, right);
        self.tap.measure(left, right);
        self.reverb.process_block(left, right);
        self.pan.process_block(left, right);
    }
}
