//! Lock-free level metering taps.
//!
//! The render path measures each processed block and publishes peak and RMS
//! through atomic cells; meter consumers read whenever they like. Readings
//! are linear amplitude internally and converted to dBFS at the query
//! boundary.

use crate::lockfree::AtomicFloat;

/// Meter floor: linear zero maps to this dBFS value.
pub const SILENCE_DBFS: f32 = -96.0;

/// Convert linear amplitude to dBFS with the meter floor applied.
#[inline]
pub fn amplitude_to_dbfs(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        SILENCE_DBFS
    } else {
        (20.0 * amplitude.log10()).max(SILENCE_DBFS)
    }
}

/// One meter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSnapshot {
    /// Peak level in dBFS.
    pub peak: f32,
    /// RMS level in dBFS.
    pub rms: f32,
}

/// Lock-free analysis tap.
///
/// Owned by a chain stage; a clone of the `Arc` is held by whoever reports
/// levels. Writes happen once per rendered block.
#[derive(Debug, Default)]
pub struct LevelTap {
    peak: AtomicFloat,
    rms: AtomicFloat,
}

impl LevelTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure a stereo block and publish the result. Render path only.
    pub fn measure(&self, left: &[f32], right: &[f32]) {
        let frames = left.len().min(right.len());
        if frames == 0 {
            return;
        }
        let mut peak = 0.0f32;
        let mut sum_sq = 0.0f32;
        for i in 0..frames {
            let l = left[i];
            let r = right[i];
            peak = peak.max(l.abs()).max(r.abs());
            sum_sq += (l * l + r * r) * 0.5;
        }
        self.peak.set(peak);
        self.rms.set((sum_sq / frames as f32).sqrt());
    }

    /// Linear (peak, rms) reading.
    #[inline]
    pub fn read_linear(&self) -> (f32, f32) {
        (self.peak.get(), self.rms.get())
    }

    /// dBFS reading for meter consumers.
    pub fn read(&self) -> LevelSnapshot {
        let (peak, rms) = self.read_linear();
        LevelSnapshot {
            peak: amplitude_to_dbfs(peak),
            rms: amplitude_to_dbfs(rms),
        }
    }

    pub fn clear(&self) {
        self.peak.set(0.0);
        self.rms.set(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_dbfs_conversion() {
        assert_abs_diff_eq!(amplitude_to_dbfs(1.0), 0.0, epsilon = 0.001);
        assert_abs_diff_eq!(amplitude_to_dbfs(0.5), -6.02, epsilon = 0.01);
        assert_eq!(amplitude_to_dbfs(0.0), SILENCE_DBFS);
    }

    #[test]
    fn test_measure_constant_signal() {
        let tap = LevelTap::new();
        let block = [0.5f32; 256];
        tap.measure(&block, &block);
        let (peak, rms) = tap.read_linear();
        assert_abs_diff_eq!(peak, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(rms, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_measure_silence_then_clear() {
        let tap = LevelTap::new();
        tap.measure(&[0.8f32; 16], &[0.8f32; 16]);
        tap.clear();
        let snap = tap.read();
        assert_eq!(snap.peak, SILENCE_DBFS);
        assert_eq!(snap.rms, SILENCE_DBFS);
    }
}
