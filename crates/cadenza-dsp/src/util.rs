//! Shared conversion helpers for DSP stages.

/// Convert linear amplitude to decibels with a -96 dB floor.
#[inline]
pub(crate) fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        -96.0
    } else {
        20.0 * amp.log10()
    }
}

/// Convert decibels to linear amplitude.
#[inline]
pub(crate) fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for an attack/release time constant.
#[inline]
pub(crate) fn time_to_coeff(time_seconds: f32, sample_rate: f64) -> f32 {
    if time_seconds <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_seconds * sample_rate as f32)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_amplitude_roundtrip() {
        assert!((amplitude_to_db(1.0)).abs() < 0.001);
        assert!((amplitude_to_db(0.5) + 6.02).abs() < 0.1);
        assert!((db_to_amplitude(-6.0) - 0.501).abs() < 0.01);
        assert_eq!(amplitude_to_db(0.0), -96.0);
    }

    #[test]
    fn test_time_to_coeff_bounds() {
        assert_eq!(time_to_coeff(0.0, 44100.0), 0.0);
        let c = time_to_coeff(0.1, 44100.0);
        assert!(c > 0.99 && c < 1.0);
    }
}
