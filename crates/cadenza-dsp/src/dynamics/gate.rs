//! Noise gate as an envelope-driven gain stage.
//!
//! Not a brick-wall mute: below threshold the signal is attenuated by
//! `range_db`, and the gate gain itself moves with attack/release smoothing
//! so opening and closing never clicks.

use crate::util::{amplitude_to_db, db_to_amplitude, time_to_coeff};
use cadenza_core::{AtomicFlag, AtomicFloat};

pub struct Gate {
    threshold_db: AtomicFloat,
    attack_secs: AtomicFloat,
    release_secs: AtomicFloat,
    range_db: AtomicFloat,
    enabled: AtomicFlag,

    envelope: f32,
    gate_gain: f32,
    sample_rate: f64,
    attack_coeff: f32,
    release_coeff: f32,
    last_attack: f32,
    last_release: f32,
}

impl Gate {
    pub fn new(
        sample_rate: f64,
        threshold_db: f32,
        attack_secs: f32,
        release_secs: f32,
        range_db: f32,
    ) -> Self {
        Self {
            threshold_db: AtomicFloat::new(threshold_db),
            attack_secs: AtomicFloat::new(attack_secs.max(0.0)),
            release_secs: AtomicFloat::new(release_secs.max(0.0)),
            range_db: AtomicFloat::new(range_db.min(0.0)),
            enabled: AtomicFlag::new(true),
            envelope: 0.0,
            gate_gain: 1.0,
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

    pub fn set_attack_secs(&self, secs: f32) {
        self.attack_secs.set(secs.max(0.0));
    }

    pub fn set_release_secs(&self, secs: f32) {
        self.release_secs.set(secs.max(0.0));
    }

    /// Attenuation applied while closed. Clamped to <= 0 dB.
    pub fn set_range_db(&self, db: f32) {
        self.range_db.set(db.min(0.0));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// True when the gate is currently passing signal.
    pub fn is_open(&self) -> bool {
        self.gate_gain > 0.5
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.gate_gain = 1.0;
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

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.enabled.get() {
            return;
        }
        self.update_coefficients();

        let threshold = self.threshold_db.get();
        let closed_gain = db_to_amplitude(self.range_db.get());

        let frames = left.len().min(right.len());
        for i in 0..frames {
            let level = left[i].abs().max(right[i].abs());
            // Envelope follows with release smoothing so short dips below
            // threshold don't chatter the gate.
            self.envelope = if level > self.envelope {
                level
            } else {
                self.release_coeff * self.envelope + (1.0 - self.release_coeff) * level
            };

            let target = if amplitude_to_db(self.envelope) > threshold {
                1.0
            } else {
                closed_gain
            };
            let coeff = if target > self.gate_gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gate_gain = coeff * self.gate_gain + (1.0 - coeff) * target;

            left[i] *= self.gate_gain;
            right[i] *= self.gate_gain;
        }
    }
}
