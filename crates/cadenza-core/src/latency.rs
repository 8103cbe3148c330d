//! Round-trip latency accounting.
//!
//! Tracks device input/output latency plus per-effect contributions
//! (lookahead stages and the like), and exposes the compensation shift used
//! to align punch-in recording with what the performer actually heard.

use crate::lockfree::AtomicDouble;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Device-reported latency figures, or enough information to estimate them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceLatency {
    /// Reported input latency in seconds, if the device provides one.
    pub input_seconds: Option<f64>,
    /// Reported output latency in seconds, if the device provides one.
    pub output_seconds: Option<f64>,
    /// Device buffer size in frames, used for estimation fallback.
    pub buffer_frames: usize,
    pub sample_rate: f64,
}

impl DeviceLatency {
    fn estimate(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.buffer_frames as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// Snapshot of the current latency model.
#[derive(Debug, Clone)]
pub struct LatencyReport {
    pub input_seconds: f64,
    pub output_seconds: f64,
    pub per_effect: HashMap<String, f64>,
    pub total_seconds: f64,
}

/// Computes and stores the engine's round-trip latency.
#[derive(Debug, Default)]
pub struct LatencyCompensationUnit {
    input_secs: AtomicDouble,
    output_secs: AtomicDouble,
    total_secs: AtomicDouble,
    per_effect: Mutex<HashMap<String, f64>>,
}

impl LatencyCompensationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from current device parameters. Called whenever the
    /// processing context's device figures change.
    pub fn recompute(&self, device: &DeviceLatency) {
        let input = device.input_seconds.unwrap_or_else(|| device.estimate());
        let output = device.output_seconds.unwrap_or_else(|| device.estimate());
        self.input_secs.set(input);
        self.output_secs.set(output);
        self.update_total();
        debug!(
            input_ms = input * 1000.0,
            output_ms = output * 1000.0,
            total_ms = self.total_ms(),
            "device latency recomputed"
        );
    }

    /// Record the latency contribution of one effect stage (keyed by a
    /// stable effect identifier). Zero or negative removes the entry.
    pub fn set_effect_latency(&self, effect_id: &str, seconds: f64) {
        if seconds < 0.0 {
            warn!(effect_id, seconds, "negative effect latency, removing entry");
        }
        {
            let mut map = self.per_effect.lock();
            if seconds <= 0.0 {
                map.remove(effect_id);
            } else {
                map.insert(effect_id.to_string(), seconds);
            }
        }
        self.update_total();
    }

    fn update_total(&self) {
        let effects: f64 = self.per_effect.lock().values().sum();
        self.total_secs
            .set(self.input_secs.get() + self.output_secs.get() + effects);
    }

    #[inline]
    pub fn total_seconds(&self) -> f64 {
        self.total_secs.get()
    }

    #[inline]
    pub fn total_ms(&self) -> f64 {
        self.total_seconds() * 1000.0
    }

    /// Shift a timeline position back by the round-trip latency, clamped at
    /// zero. Used by the recording collaborator to align punch-in points.
    #[inline]
    pub fn compensate(&self, start_position: f64) -> f64 {
        (start_position - self.total_seconds()).max(0.0)
    }

    pub fn report(&self) -> LatencyReport {
        LatencyReport {
            input_seconds: self.input_secs.get(),
            output_seconds: self.output_secs.get(),
            per_effect: self.per_effect.lock().clone(),
            total_seconds: self.total_secs.get(),
        }
    }
}
