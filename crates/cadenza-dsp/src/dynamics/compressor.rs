//! Downward compressor (stereo, linked detection).

use crate::util::{amplitude_to_db, db_to_amplitude, time_to_coeff};
use cadenza_core::{AtomicFlag, AtomicFloat};

/// Dynamics compressor with soft knee.
///
/// Parameters live in lock-free cells so the control path can retune while
/// the render path is processing; attack/release coefficients are rebuilt
/// at block rate only when the times actually changed.
pub struct Compressor {
    threshold_db: AtomicFloat,
    ratio: AtomicFloat,
    attack_secs: AtomicFloat,
    release_secs: AtomicFloat,
    knee_db: AtomicFloat,
    enabled: AtomicFlag,

    gain_reduction_db: f32,
    sample_rate: f64,
    attack_coeff: f32,
    release_coeff: f32,
    last_attack: f32,
    last_release: f32,
}

impl Compressor {
    pub fn new(
        sample_rate: f64,
        threshold_db: f32,
        ratio: f32,
        attack_secs: f32,
        release_secs: f32,
        knee_db: f32,
    ) -> Self {
        Self {
            threshold_db: AtomicFloat::new(threshold_db),
            ratio: AtomicFloat::new(ratio.max(1.0)),
            attack_secs: AtomicFloat::new(attack_secs.max(0.0)),
            release_secs: AtomicFloat::new(release_secs.max(0.0)),
            knee_db: AtomicFloat::new(knee_db.max(0.0)),
            enabled: AtomicFlag::new(true),
            gain_reduction_db: 0.0,
            sample_rate,
            attack_coeff: time_to_coeff(attack_secs, sample_rate),
            release_coeff: time_to_coeff(release_secs, sample_rate),
            last_attack: attack_secs,
            last_release: release_secs,
        }
    }

    pub fn set_threshold_db(&self, db: f32) {
        self.threshold_db.set(db);
    }

    pub fn set_ratio(&self, ratio: f32) {
        self.ratio.set(ratio.max(1.0));
    }

    pub fn set_attack_secs(&self, secs: f32) {
        self.attack_secs.set(secs.max(0.0));
    }

    pub fn set_release_secs(&self, secs: f32) {
        self.release_secs.set(secs.max(0.0));
    }

    pub fn set_knee_db(&self, db: f32) {
        self.knee_db.set(db.max(0.0));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Current gain reduction in dB (positive = reducing). Meter feed.
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    pub fn reset(&mut self) {
        self.gain_reduction_db = 0.0;
    }

    #[inline]
    fn update_coefficients(&mut self) {
        let attack = self.attack_secs.get();
        let release = self.release_secs.get();
        if (attack - self.last_attack).abs() > 1e-5 {
            self.attack_coeff = time_to_coeff(attack, self.sample_rate);
            self.last_attack = attack;
        }
        if (release - self.last_release).abs() > 1e-5 {
            self.release_coeff = time_to_coeff(release, self.sample_rate);
            self.last_release = release;
        }
    }

    /// Static transfer curve: desired reduction for an input level in dB.
    #[inline]
    fn target_reduction_db(&self, input_db: f32) -> f32 {
        let threshold = self.threshold_db.get();
        let ratio = self.ratio.get();
        let knee = self.knee_db.get();
        let slope = 1.0 - 1.0 / ratio;

        if knee <= 0.0 {
            (input_db - threshold).max(0.0) * slope
        } else {
            let half = knee / 2.0;
            if input_db <= threshold - half {
                0.0
            } else if input_db >= threshold + half {
                (input_db - threshold) * slope
            } else {
                let x = input_db - threshold + half;
                slope * x * x / (2.0 * knee)
            }
        }
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled.get() {
            return;
        }
        self.update_coefficients();

        let frames = left.len().min(right.len());
        for i in 0..frames {
            let level = left[i].abs().max(right[i].abs());
            let target = self.target_reduction_db(amplitude_to_db(level));

            let coeff = if target > self.gain_reduction_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain_reduction_db =
                coeff * self.gain_reduction_db + (1.0 - coeff) * target;

            let gain = db_to_amplitude(-self.gain_reduction_db);
            left[i] *= gain;
            right[i] *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_blocks(comp: &mut Compressor, amplitude: f32, blocks: usize) -> f32 {
        let mut last = 0.0;
        for _ in 0..blocks {
            let mut l = vec![amplitude; 256];
            let mut r = vec![amplitude; 256];
            comp.process_block(&mut l, &mut r);
            last = l[255];
        }
        last
    }

    #[test]
    fn test_reduces_gain_above_threshold() {
        let mut comp = Compressor::new(44100.0, -20.0, 4.0, 0.0001, 0.1, 0.0);
        let out = run_blocks(&mut comp, 0.9, 20);
        assert!(comp.gain_reduction_db() > 3.0);
        assert!(out < 0.9);
    }

    #[test]
    fn test_no_reduction_below_threshold() {
        let mut comp = Compressor::new(44100.0, -10.0, 4.0, 0.001, 0.1, 0.0);
        run_blocks(&mut comp, 0.1, 20);
        assert!(comp.gain_reduction_db() < 0.5);
    }

    #[test]
    fn test_soft_knee_engages_below_threshold() {
        let mut hard = Compressor::new(44100.0, -20.0, 4.0, 0.0001, 0.1, 0.0);
        let mut soft = Compressor::new(44100.0, -20.0, 4.0, 0.0001, 0.1, 12.0);
        // -23 dBFS sits inside the 12 dB knee but below the hard threshold.
        let level = 10f32.powf(-23.0 / 20.0);
        run_blocks(&mut hard, level, 20);
        run_blocks(&mut soft, level, 20);
        assert!(hard.gain_reduction_db() < 0.01);
        assert!(soft.gain_reduction_db() > 0.1);
    }

    #[test]
    fn test_bypass_is_transparent() {
        let mut comp = Compressor::new(44100.0, -20.0, 4.0, 0.0001, 0.1, 0.0);
        comp.set_enabled(false);
        let out = run_blocks(&mut comp, 0.9, 5);
        assert_eq!(out, 0.9);
        assert_eq!(comp.gain_reduction_db(), 0.0);
    }

    #[test]
    fn test_ratio_clamps_to_unity_minimum() {
        let comp = Compressor::new(44100.0, -20.0, 4.0, 0.001, 0.1, 0.0);
        comp.set_ratio(0.25);
        // Ratio below 1 would be expansion; clamped to 1:1 nothing is reduced.
        assert_eq!(comp.target_reduction_db(0.0), 0.0);
    }
}
