//! Soft-clip limiter.
//!
//! A memoryless saturating transfer curve: identity below the threshold,
//! blending into a tanh approach to unity above it, so transients round off
//! instead of hard-clipping. The curve is sampled into a lookup table once
//! per threshold change, in the spirit of wave-shaper nodes.

use crate::util::db_to_amplitude;
use cadenza_core::{AtomicFlag, AtomicFloat};

const TABLE_SIZE: usize = 4096;
/// Input range covered by the table; beyond it the curve is flat at its
/// end value (effectively unity).
const TABLE_RANGE: f32 = 4.0;

pub struct SoftClip {
    threshold_db: AtomicFloat,
    release_secs: AtomicFloat,
    lookahead_secs: AtomicFloat,
    enabled: AtomicFlag,

    table: Vec<f32>,
    table_threshold_db: f32,
}

impl SoftClip {
    pub fn new(threshold_db: f32) -> Self {
        let mut clip = Self {
            threshold_db: AtomicFloat::new(threshold_db),
            release_secs: AtomicFloat::new(0.05),
            lookahead_secs: AtomicFloat::new(0.0),
            enabled: AtomicFlag::new(true),
            table: Vec::new(),
            table_threshold_db: f32::NAN,
        };
        clip.rebuild_table(threshold_db);
        clip
    }

    pub fn set_threshold_db(&self, db: f32) {
        self.threshold_db.set(db.min(0.0));
    }

    pub fn set_release_secs(&self, secs: f32) {
        self.release_secs.set(secs.max(0.0));
    }

    /// Reported through latency accounting; the curve itself is memoryless.
    pub fn set_lookahead_secs(&self, secs: f32) {
        self.lookahead_secs.set(secs.max(0.0));
    }

    pub fn lookahead_secs(&self) -> f32 {
        self.lookahead_secs.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// The transfer function the table samples.
    fn curve(threshold: f32, x: f32) -> f32 {
        let mag = x.abs();
        if mag <= threshold {
            return x;
        }
        let headroom = (1.0 - threshold).max(1e-6);
        let shaped = threshold + headroom * ((mag - threshold) / headroom).tanh();
        shaped.copysign(x)
    }

    fn rebuild_table(&mut self, threshold_db: f32) {
        let threshold = db_to_amplitude(threshold_db);
        self.table = (0..TABLE_SIZE)
            .map(|i| {
                let x = (i as f32 / (TABLE_SIZE - 1) as f32) * 2.0 - 1.0;
                Self::curve(threshold, x * TABLE_RANGE)
            })
            .collect();
        self.table_threshold_db = threshold_db;
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        // Table lookup with linear interpolation over [-RANGE, RANGE].
        let pos = ((x / TABLE_RANGE).clamp(-1.0, 1.0) + 1.0) * 0.5 * (TABLE_SIZE - 1) as f32;
        let idx = pos as usize;
        let frac = pos - idx as f32;
        let a = self.table[idx];
        let b = self.table[(idx + 1).min(TABLE_SIZE - 1)];
        a + (b - a) * frac
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled.get() {
            return;
        }
        let threshold_db = self.threshold_db.get();
        if (threshold_db - self.table_threshold_db).abs() > 1e-4 {
            self.rebuild_table(threshold_db);
        }
        for sample in left.iter_mut().chain(right.iter_mut()) {
            *sample = self.shape(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_below_threshold_is_identity() {
        let mut clip = SoftClip::new(-0.3);
        let mut l = vec![0.1f32, -0.3, 0.5, -0.7];
        let mut r = l.clone();
        let expected = l.clone();
        clip.process_block(&mut l, &mut r);
        for (y, x) in l.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*y, *x, epsilon = 0.01);
        }
    }

    #[test]
    fn test_loud_transients_are_bounded() {
        let mut clip = SoftClip::new(-0.3);
        let mut l = vec![1.8f32, -2.5, 3.9];
        let mut r = l.clone();
        clip.process_block(&mut l, &mut r);
        for y in l.iter().chain(r.iter()) {
            assert!(y.abs() <= 1.0, "soft clip must bound output, got {y}");
        }
    }

    #[test]
    fn test_curve_is_monotonic() {
        let clip = SoftClip::new(-0.3);
        let mut prev = f32::NEG_INFINITY;
        for i in 0..200 {
            let x = -2.0 + i as f32 * 0.02;
            let y = clip.shape(x);
            assert!(y >= prev - 1e-6);
            prev = y;
        }
    }

    #[test]
    fn test_bypass_passes_overs() {
        let mut clip = SoftClip::new(-0.3);
        clip.set_enabled(false);
        let mut l = vec![2.0f32];
        let mut r = vec![2.0f32];
        clip.process_block(&mut l, &mut r);
        assert_eq!(l[0], 2.0);
    }
}
