//! Click-free parameter ramps.
//!
//! Every gain-class value in the engine (track gain, mute, bus gain, master
//! volume, pan gains, wet/dry mixes) changes through a short linear ramp
//! (10 ms by default) so control-path writes never step audibly under the
//! render path.

/// Linearly ramped parameter value.
///
/// Call [`next`](Smoothed::next) once per sample on the render path, or use
/// the block helpers.
#[derive(Debug, Clone)]
pub struct Smoothed {
    value: f32,
    target: f32,
    step: f32,
    remaining: u32,
    ramp_samples: u32,
}

impl Smoothed {
    /// Default ramp length in seconds (matches the engine's parameter
    /// smoothing contract).
    pub const DEFAULT_RAMP_SECS: f32 = 0.010;

    pub fn new(initial: f32, ramp_secs: f32, sample_rate: f64) -> Self {
        Self {
            value: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
            ramp_samples: (ramp_secs * sample_rate as f32).max(1.0) as u32,
        }
    }

    /// Start ramping toward `target` over the configured ramp length.
    pub fn ramp_to(&mut self, target: f32) {
        if (target - self.target).abs() < f32::EPSILON {
            return;
        }
        self.target = target;
        self.remaining = self.ramp_samples;
        self.step = (target - self.value) / self.remaining as f32;
    }

    /// Jump to `value` with no ramp. Control-path initialization only.
    pub fn snap_to(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.value += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                // Snap so float drift never leaves us off-target.
                self.value = self.target;
            }
        }
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Multiply a buffer in place by the ramped value, advancing the ramp.
    #[inline]
    pub fn apply_gain(&mut self, buffer: &mut [f32]) {
        if self.remaining == 0 {
            let g = self.value;
            if (g - 1.0).abs() > f32::EPSILON {
                for sample in buffer.iter_mut() {
                    *sample *= g;
                }
            }
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.next();
        }
    }

    /// Stereo variant keeping both channels on the same ramp position.
    #[inline]
    pub fn apply_gain_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        for i in 0..frames {
            let g = self.next();
            left[i] *= g;
            right[i] *= g;
        }
    }
}
