//! Reverb send: pre-delay, stereo convolution, equal-power wet/dry mix.
//!
//! Runs in parallel with the dry path inside a track chain: the input block
//! is tapped, pre-delayed, convolved against the active impulse response,
//! and summed back against the dry signal under an equal-power crossfade.
//! With no impulse loaded the stage is dry-only and costs nothing.

use crate::convolver::Convolver;
use crate::error::Result;
use cadenza_core::{AtomicFlag, AtomicFloat, Smoothed};
use std::collections::VecDeque;

/// Simple sample ring delay, one channel.
struct PreDelay {
    buffer: Vec<f32>,
    write: usize,
}

impl PreDelay {
    fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(1)],
            write: 0,
        }
    }

    #[inline]
    fn tick(&mut self, x: f32, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.min(len - 1);
        let read = (self.write + len - delay) % len;
        let y = if delay == 0 { x } else { self.buffer[read] };
        self.buffer[self.write] = x;
        self.write = (self.write + 1) % len;
        y
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
    }
}

pub struct ReverbSend {
    mix: AtomicFloat,
    pre_delay_secs: AtomicFloat,
    enabled: AtomicFlag,

    sample_rate: f64,
    block_size: usize,
    conv: Option<(Convolver, Convolver)>,
    pre_delay: (PreDelay, PreDelay),
    dry_gain: Smoothed,
    wet_gain: Smoothed,
    wet_in: (Vec<f32>, Vec<f32>),
    wet_out: (Vec<f32>, Vec<f32>),
    /// Staged input samples in `wet_in` awaiting a full partition. The
    /// convolver only ever advances by whole blocks, so partial render
    /// blocks accumulate here and the convolved output drains through
    /// `wet_fifo`.
    stage_fill: usize,
    wet_fifo: (VecDeque<f32>, VecDeque<f32>),
}

/// Longest supported pre-delay in seconds.
const MAX_PRE_DELAY_SECS: f64 = 0.5;

impl ReverbSend {
    pub fn new(sample_rate: f64, block_size: usize, ramp_secs: f32) -> Self {
        let max_delay = (MAX_PRE_DELAY_SECS * sample_rate) as usize;
        let dry_gain = Smoothed::new(1.0, ramp_secs, sample_rate);
        let wet_gain = Smoothed::new(0.0, ramp_secs, sample_rate);
        Self {
            mix: AtomicFloat::new(0.0),
            pre_delay_secs: AtomicFloat::new(0.0),
            enabled: AtomicFlag::new(true),
            sample_rate,
            block_size,
            conv: None,
            pre_delay: (PreDelay::new(max_delay), PreDelay::new(max_delay)),
            dry_gain,
            wet_gain,
            wet_in: (vec![0.0; block_size], vec![0.0; block_size]),
            wet_out: (vec![0.0; block_size], vec![0.0; block_size]),
            stage_fill: 0,
            wet_fifo: (VecDeque::new(), VecDeque::new()),
        }
    }

    /// Install a stereo impulse response, repartitioned for this block size.
    pub fn set_impulse(&mut self, left: &[f32], right: &[f32]) -> Result<()> {
        let conv_l = Convolver::new(left, self.block_size)?;
        let conv_r = Convolver::new(right, self.block_size)?;
        self.conv = Some((conv_l, conv_r));
        self.pre_delay.0.clear();
        self.pre_delay.1.clear();
        self.stage_fill = 0;
        self.wet_fifo.0.clear();
        self.wet_fifo.1.clear();
        Ok(())
    }

    pub fn has_impulse(&self) -> bool {
        self.conv.is_some()
    }

    /// Wet/dry balance in [0, 1]; 0 is fully dry.
    pub fn set_mix(&self, mix: f32) {
        self.mix.set(mix.clamp(0.0, 1.0));
    }

    pub fn set_pre_delay_secs(&self, secs: f32) {
        self.pre_delay_secs
            .set(secs.clamp(0.0, MAX_PRE_DELAY_SECS as f32));
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());

        // Equal-power crossfade targets; a bypassed or impulse-less send
        // ramps back to fully dry rather than dropping out.
        let mix = if self.enabled.get() && self.conv.is_some() {
            self.mix.get()
        } else {
            0.0
        };
        let theta = mix * std::f32::consts::FRAC_PI_2;
        self.dry_gain.ramp_to(theta.cos());
        self.wet_gain.ramp_to(theta.sin());

        let Some((conv_l, conv_r)) = self.conv.as_mut() else {
            // Keep the ramps advancing so re-enable stays click-free.
            for _ in 0..frames {
                self.dry_gain.next();
                self.wet_gain.next();
            }
            return;
        };

        let delay = (self.pre_delay_secs.get() as f64 * self.sample_rate) as usize;

        // Whole-block path: convolve in place with no added delay.
        if frames == self.block_size && self.stage_fill == 0 && self.wet_fifo.0.is_empty() {
            for i in 0..frames {
                self.wet_in.0[i] = self.pre_delay.0.tick(left[i], delay);
                self.wet_in.1[i] = self.pre_delay.1.tick(right[i], delay);
            }
            conv_l.process_block(&self.wet_in.0, &mut self.wet_out.0);
            conv_r.process_block(&self.wet_in.1, &mut self.wet_out.1);

            for i in 0..frames {
                let dry = self.dry_gain.next();
                let wet = self.wet_gain.next();
                left[i] = left[i] * dry + self.wet_out.0[i] * wet;
                right[i] = right[i] * dry + self.wet_out.1[i] * wet;
            }
            return;
        }

        // Partial-block path: stage input until a whole partition is
        // available, then convolve it and drain the result through the
        // wet FIFO. The convolver state stays block-aligned with the
        // samples actually fed to it; the wet path picks up a fixed
        // extra delay of (block_size - fill at the first short block).
        for i in 0..frames {
            let fill = self.stage_fill;
            self.wet_in.0[fill] = self.pre_delay.0.tick(left[i], delay);
            self.wet_in.1[fill] = self.pre_delay.1.tick(right[i], delay);
            self.stage_fill += 1;

            if self.stage_fill == self.block_size {
                conv_l.process_block(&self.wet_in.0, &mut self.wet_out.0);
                conv_r.process_block(&self.wet_in.1, &mut self.wet_out.1);
                self.wet_fifo.0.extend(self.wet_out.0.iter().copied());
                self.wet_fifo.1.extend(self.wet_out.1.iter().copied());
                self.stage_fill = 0;
            }

            let dry = self.dry_gain.next();
            let wet = self.wet_gain.next();
            let wl = self.wet_fifo.0.pop_front().unwrap_or(0.0);
            let wr = self.wet_fifo.1.pop_front().unwrap_or(0.0);
            left[i] = left[i] * dry + wl * wet;
            right[i] = right[i] * dry + wr * wet;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const BLOCK: usize = 64;

    fn settle(send: &mut ReverbSend, blocks: usize) {
        for _ in 0..blocks {
            let mut l = vec![0.0f32; BLOCK];
            let mut r = vec![0.0f32; BLOCK];
            send.process_block(&mut l, &mut r);
        }
    }

    #[test]
    fn test_no_impulse_is_dry_passthrough() {
        let mut send = ReverbSend::new(44100.0, BLOCK, 0.001);
        send.set_mix(1.0);
        settle(&mut send, 4);
        let mut l = vec![0.5f32; BLOCK];
        let mut r = vec![0.5f32; BLOCK];
        send.process_block(&mut l, &mut r);
        assert_abs_diff_eq!(l[BLOCK - 1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_full_wet_with_unit_impulse_matches_input() {
        let mut send = ReverbSend::new(44100.0, BLOCK, 0.001);
        send.set_impulse(&[1.0], &[1.0]).unwrap();
        send.set_mix(1.0);
        settle(&mut send, 4);
        let mut l = vec![0.25f32; BLOCK];
        let mut r = vec![0.25f32; BLOCK];
        send.process_block(&mut l, &mut r);
        // Unit-impulse wet path is the input itself.
        assert_abs_diff_eq!(l[BLOCK - 1], 0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_mix_zero_mutes_wet_path() {
        let mut send = ReverbSend::new(44100.0, BLOCK, 0.001);
        send.set_impulse(&[1.0], &[1.0]).unwrap();
        send.set_mix(0.0);
        settle(&mut send, 4);
        let mut l = vec![0.5f32; BLOCK];
        let mut r = vec![0.5f32; BLOCK];
        send.process_block(&mut l, &mut r);
        assert_abs_diff_eq!(l[BLOCK - 1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_bypass_forces_dry() {
        let mut send = ReverbSend::new(44100.0, BLOCK, 0.001);
        send.set_impulse(&[0.0, 0.0, 1.0], &[0.0, 0.0, 1.0]).unwrap();
        send.set_mix(1.0);
        send.set_enabled(false);
        settle(&mut send, 4);
        let mut l = vec![0.5f32; BLOCK];
        let mut r = vec![0.5f32; BLOCK];
        send.process_block(&mut l, &mut r);
        assert_abs_diff_eq!(l[BLOCK - 1], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_partial_blocks_keep_wet_path_aligned() {
        let mut send = ReverbSend::new(44100.0, BLOCK, 0.0001);
        send.set_impulse(&[1.0], &[1.0]).unwrap();
        send.set_mix(1.0);
        settle(&mut send, 8);

        // A short block first, so staging is mid-partition when the
        // spike arrives.
        let mut l = vec![0.0f32; 13];
        let mut r = vec![0.0f32; 13];
        send.process_block(&mut l, &mut r);

        let mut out = Vec::new();
        let mut l = vec![0.0f32; BLOCK];
        l[0] = 1.0;
        let mut r = l.clone();
        send.process_block(&mut l, &mut r);
        out.extend_from_slice(&l);
        for _ in 0..2 {
            let mut l2 = vec![0.0f32; BLOCK];
            let mut r2 = vec![0.0f32; BLOCK];
            send.process_block(&mut l2, &mut r2);
            out.extend_from_slice(&l2);
        }

        // The unit-impulse wet path reproduces the spike exactly once,
        // at full amplitude, regardless of the earlier short block.
        let total: f32 = out.iter().map(|x| x.abs()).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-2);
        assert!(out.iter().cloned().fold(0.0f32, f32::max) > 0.9);
    }

    #[test]
    fn test_pre_delay_shifts_wet_arrival() {
        let sr = 44100.0;
        let mut send = ReverbSend::new(sr, BLOCK, 0.0001);
        send.set_impulse(&[1.0], &[1.0]).unwrap();
        send.set_mix(1.0);
        send.set_pre_delay_secs(BLOCK as f32 / sr as f32); // exactly one block
        settle(&mut send, 8);

        // One-block impulse input.
        let mut l = vec![0.0f32; BLOCK];
        l[0] = 1.0;
        let mut r = l.clone();
        send.process_block(&mut l, &mut r);
        assert_abs_diff_eq!(l[0], 0.0, epsilon = 1e-3);

        let mut l2 = vec![0.0f32; BLOCK];
        let mut r2 = vec![0.0f32; BLOCK];
        send.process_block(&mut l2, &mut r2);
        assert!(l2[0].abs() > 0.5, "delayed wet should arrive one block late");
    }
}
