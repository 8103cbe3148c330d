//! Equal-power stereo balance.
//!
//! Center is unity on both channels; panning attenuates the far channel
//! along a sine/cosine law so perceived loudness stays constant. Gains are
//! smoothed so pan automation never zipper-clicks.

use cadenza_core::{AtomicFloat, Smoothed};

pub struct Panner {
    pan: AtomicFloat,
    left_gain: Smoothed,
    right_gain: Smoothed,
    last_pan: f32,
}

impl Panner {
    pub fn new(sample_rate: f64, ramp_secs: f32) -> Self {
        Self {
            pan: AtomicFloat::new(0.0),
            left_gain: Smoothed::new(1.0, ramp_secs, sample_rate),
            right_gain: Smoothed::new(1.0, ramp_secs, sample_rate),
            last_pan: 0.0,
        }
    }

    /// Set pan position: -1 full left, 0 center, +1 full right.
    pub fn set_pan(&self, pan: f32) {
        self.pan.set(pan.clamp(-1.0, 1.0));
    }

    pub fn pan(&self) -> f32 {
        self.pan.get()
    }

    /// Equal-power gains, normalized to unity at center.
    fn gains_for(pan: f32) -> (f32, f32) {
        let theta = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        let scale = std::f32::consts::SQRT_2;
        (theta.cos() * scale, theta.sin() * scale)
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let pan = self.pan.get();
        if (pan - self.last_pan).abs() > f32::EPSILON {
            let (l, r) = Self::gains_for(pan);
            self.left_gain.ramp_to(l);
            self.right_gain.ramp_to(r);
            self.last_pan = pan;
        }
        self.left_gain.apply_gain(left);
        self.right_gain.apply_gain(right);
    }
}
