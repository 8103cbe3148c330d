//! Bus strips and track-to-bus routing.
//!
//! Every track routes into exactly one bus; every bus feeds the master
//! chain. The master bus exists from initialization and is never removed,
//! and any track whose bus id does not resolve falls back to it with a
//! logged warning rather than failing.

use crate::model::{BusConfig, MASTER_BUS_ID};
use cadenza_core::{LevelSnapshot, LevelTap, Smoothed};
use cadenza_dsp::Panner;
use std::collections::HashMap;
use tracing::warn;

/// One bus: gain + pan + meter tap, plus mute/solo state resolved
/// engine-wide like track mute/solo.
pub struct BusStrip {
    pub(crate) id: String,
    pub(crate) name: String,
    gain: f32,
    muted: bool,
    solo: bool,
    playback_muted: bool,
    gain_smoothed: Smoothed,
    pan: Panner,
    tap: LevelTap,

    /// Accumulation buffers the render pass sums routed tracks into.
    pub(crate) input_left: Vec<f32>,
    pub(crate) input_right: Vec<f32>,
}

impl BusStrip {
    fn new(config: &BusConfig, sample_rate: f64, block_size: usize, ramp_secs: f32) -> Self {
        let gain = config.gain.max(0.0);
        let mut strip = Self {
            id: config.id.clone(),
            name: config.name.clone(),
            gain,
            muted: false,
            solo: false,
            playback_muted: false,
            gain_smoothed: Smoothed::new(gain, ramp_secs, sample_rate),
            pan: Panner::new(sample_rate, ramp_secs),
            tap: LevelTap::new(),
            input_left: vec![0.0; block_size],
            input_right: vec![0.0; block_size],
        };
        strip.pan.set_pan(config.pan);
        strip
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
        self.retarget();
    }

    pub fn set_pan(&mut self, pan: f32) {
        self.pan.set_pan(pan);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub(crate) fn set_playback_muted(&mut self, muted: bool) {
        self.playback_muted = muted;
        self.retarget();
    }

    fn retarget(&mut self) {
        let target = if self.playback_muted { 0.0 } else { self.gain };
        self.gain_smoothed.ramp_to(target);
    }

    pub fn level(&self) -> LevelSnapshot {
        self.tap.read()
    }

    pub(crate) fn clear_input(&mut self) {
        self.input_left.fill(0.0);
        self.input_right.fill(0.0);
    }

    /// Process the accumulated input in place.
    pub(crate) fn process_block(&mut self, frames: usize) {
        let (l, r) = (
            &mut self.input_left[..frames],
            &mut self.input_right[..frames],
        );
        self.gain_smoothed.apply_gain_stereo(l, r);
        self.pan.process_block(l, r);
        self.tap.measure(l, r);
    }
}

/// Owns every bus and resolves track routing.
pub struct BusRouter {
    buses: HashMap<String, BusStrip>,
    sample_rate: f64,
    block_size: usize,
    ramp_secs: f32,
}

impl BusRouter {
    /// Creates the router with the master bus already in place.
    pub fn new(sample_rate: f64, block_size: usize, ramp_secs: f32) -> Self {
        let mut router = Self {
            buses: HashMap::new(),
            sample_rate,
            block_size,
            ramp_secs,
        };
        router.create_bus(&BusConfig::new(MASTER_BUS_ID, "Master"));
        router
    }

    /// Create a bus. Re-creating an existing id reconfigures gain and pan
    /// in place instead of dropping the strip.
    pub fn create_bus(&mut self, config: &BusConfig) {
        if let Some(existing) = self.buses.get_mut(&config.id) {
            existing.set_gain(config.gain);
            existing.set_pan(config.pan);
            existing.name = config.name.clone();
            return;
        }
        self.buses.insert(
            config.id.clone(),
            BusStrip::new(config, self.sample_rate, self.block_size, self.ramp_secs),
        );
    }

    /// Resolve a track's bus id to a live bus, falling back to master.
    pub fn resolve(&self, bus_id: Option<&str>) -> &str {
        match bus_id {
            Some(id) => match self.buses.get_key_value(id) {
                Some((key, _)) => key.as_str(),
                None => {
                    warn!(bus_id = id, "track routed to unknown bus, using master");
                    MASTER_BUS_ID
                }
            },
            None => MASTER_BUS_ID,
        }
    }

    pub fn bus(&self, id: &str) -> Option<&BusStrip> {
        self.buses.get(id)
    }

    pub fn bus_mut(&mut self, id: &str) -> Option<&mut BusStrip> {
        self.buses.get_mut(id)
    }

    pub fn bus_ids(&self) -> impl Iterator<Item = &str> {
        self.buses.keys().map(String::as_str)
    }

    pub(crate) fn buses_mut(&mut self) -> impl Iterator<Item = &mut BusStrip> {
        self.buses.values_mut()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }

    /// Sum a processed track block into its bus. Unknown ids fall back to
    /// master silently here; the warning is logged once at routing time,
    /// not per rendered block.
    pub(crate) fn accumulate(&mut self, bus_id: Option<&str>, left: &[f32], right: &[f32]) {
        let key = match bus_id {
            Some(id) if self.buses.contains_key(id) => id,
            _ => MASTER_BUS_ID,
        };
        let Some(bus) = self.buses.get_mut(key) else {
            return;
        };
        let frames = left.len().min(bus.input_left.len());
        for i in 0..frames {
            bus.input_left[i] += left[i];
            bus.input_right[i] += right[i];
        }
    }

    /// Re-resolve bus mute/solo engine-wide: with any bus soloed, every
    /// non-solo bus is ramped silent.
    pub(crate) fn apply_mute_solo(&mut self) {
        let has_solo = self.buses.values().any(|b| b.solo);
        for bus in self.buses.values_mut() {
            let muted = bus.muted || (has_solo && !bus.solo);
            bus.set_playback_muted(muted);
        }
    }
}
