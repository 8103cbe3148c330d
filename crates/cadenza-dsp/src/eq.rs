//! Three-band track EQ: low shelf, peaking mid, high shelf.

use crate::biquad::{Biquad, BiquadCoeffs};
use cadenza_core::{AtomicFlag, AtomicFloat};

/// Low shelf corner frequency in Hz.
pub const LOW_SHELF_HZ: f64 = 320.0;
/// High shelf corner frequency in Hz.
pub const HIGH_SHELF_HZ: f64 = 3200.0;
/// Fixed Q of the peaking mid band.
pub const MID_Q: f64 = 0.8;

/// Three cascaded biquad pairs (stereo), parameters in lock-free cells.
///
/// The render path refreshes coefficients at block rate when a parameter
/// cell changed; shelf corners are fixed, the mid center frequency is a
/// parameter.
pub struct ThreeBandEq {
    low_gain_db: AtomicFloat,
    mid_gain_db: AtomicFloat,
    mid_freq_hz: AtomicFloat,
    high_gain_db: AtomicFloat,
    enabled: AtomicFlag,

    sample_rate: f64,
    // [left, right] per band
    low: [Biquad; 2],
    mid: [Biquad; 2],
    high: [Biquad; 2],
    last: (f32, f32, f32, f32),
}

impl ThreeBandEq {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            low_gain_db: AtomicFloat::new(0.0),
            mid_gain_db: AtomicFloat::new(0.0),
            mid_freq_hz: AtomicFloat::new(1000.0),
            high_gain_db: AtomicFloat::new(0.0),
            enabled: AtomicFlag::new(true),
            sample_rate,
            low: [Biquad::identity(), Biquad::identity()],
            mid: [Biquad::identity(), Biquad::identity()],
            high: [Biquad::identity(), Biquad::identity()],
            last: (0.0, 0.0, 1000.0, 0.0),
        }
    }

    pub fn set_low_gain_db(&self, db: f32) {
        self.low_gain_db.set(db);
    }

    pub fn set_mid_gain_db(&self, db: f32) {
        self.mid_gain_db.set(db);
    }

    pub fn set_mid_frequency(&self, hz: f32) {
        self.mid_freq_hz.set(hz.clamp(20.0, 20000.0));
    }

    pub fn set_high_gain_db(&self, db: f32) {
        self.high_gain_db.set(db);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn reset(&mut self) {
        for bq in self
            .low
            .iter_mut()
            .chain(self.mid.iter_mut())
            .chain(self.high.iter_mut())
        {
            bq.reset();
        }
    }

    fn refresh_coeffs(&mut self) {
        let now = (
            self.low_gain_db.get(),
            self.mid_gain_db.get(),
            self.mid_freq_hz.get(),
            self.high_gain_db.get(),
        );
        if now == self.last {
            return;
        }
        self.last = now;
        let (low_db, mid_db, mid_hz, high_db) = now;

        let low = BiquadCoeffs::low_shelf(LOW_SHELF_HZ, low_db as f64, self.sample_rate);
        let mid = BiquadCoeffs::peaking(mid_hz as f64, MID_Q, mid_db as f64, self.sample_rate);
        let high = BiquadCoeffs::high_shelf(HIGH_SHELF_HZ, high_db as f64, self.sample_rate);
        for ch in 0..2 {
            self.low[ch].set_coeffs(low);
            self.mid[ch].set_coeffs(mid);
            self.high[ch].set_coeffs(high);
        }
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled.get() {
            return;
        }
        self.refresh_coeffs();

        self.low[0].process_block(left);
        self.mid[0].process_block(left);
        self.high[0].process_block(left);

        self.low[1].process_block(right);
        self.mid[1].process_block(right);
        self.high[1].process_block(right);
    }
}
