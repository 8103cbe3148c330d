//! Uniform partitioned FFT convolution.
//!
//! The impulse response is split into block-sized partitions; each incoming
//! block is transformed once and multiplied against every partition through
//! a frequency-domain delay line (overlap-save). Cost per block is one
//! forward FFT, one inverse FFT, and a complex multiply-accumulate per
//! partition, which keeps multi-second reverb tails affordable at render
//! block rate.

use crate::error::{Error, Result};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct Convolver {
    block_size: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// FFT of each IR partition.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Frequency-domain delay line of past input spectra; index 0 is the
    /// newest block.
    history: Vec<Vec<Complex<f32>>>,
    /// Previous time-domain input block (overlap-save front half).
    prev_block: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32], block_size: usize) -> Result<Self> {
        if impulse.is_empty() {
            return Err(Error::EmptyImpulse);
        }
        if block_size == 0 {
            return Err(Error::InvalidParameter {
                name: "block_size",
                value: 0.0,
            });
        }
        let fft_size = block_size * 2;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let mut partitions = Vec::with_capacity(impulse.len().div_ceil(block_size));
        for chunk in impulse.chunks(block_size) {
            let mut buf = vec![Complex::new(0.0, 0.0); fft_size];
            for (slot, &s) in buf.iter_mut().zip(chunk.iter()) {
                slot.re = s;
            }
            forward.process(&mut buf);
            partitions.push(buf);
        }

        let history = vec![vec![Complex::new(0.0, 0.0); fft_size]; partitions.len()];

        Ok(Self {
            block_size,
            fft_size,
            forward,
            inverse,
            partitions,
            history,
            prev_block: vec![0.0; block_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            accum: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Tail length in samples contributed by the IR.
    pub fn tail_len(&self) -> usize {
        self.partitions.len() * self.block_size
    }

    pub fn reset(&mut self) {
        for spectrum in self.history.iter_mut() {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.prev_block.fill(0.0);
    }

    /// Convolve one block. `input` and `output` must both be `block_size`
    /// long; shorter final blocks should be zero-padded by the caller.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(output.len(), self.block_size);

        // Overlap-save input frame: [previous block | current block].
        for i in 0..self.block_size {
            self.scratch[i] = Complex::new(self.prev_block[i], 0.0);
            self.scratch[self.block_size + i] = Complex::new(input[i], 0.0);
        }
        self.prev_block.copy_from_slice(input);
        self.forward.process(&mut self.scratch);

        // Rotate the delay line: newest spectrum moves to the front.
        if let Some(mut oldest) = self.history.pop() {
            oldest.copy_from_slice(&self.scratch);
            self.history.insert(0, oldest);
        }

        self.accum.fill(Complex::new(0.0, 0.0));
        for (spectrum, partition) in self.history.iter().zip(self.partitions.iter()) {
            for ((acc, &x), &h) in self
                .accum
                .iter_mut()
                .zip(spectrum.iter())
                .zip(partition.iter())
            {
                *acc += x * h;
            }
        }

        self.inverse.process(&mut self.accum);
        let norm = 1.0 / self.fft_size as f32;
        // Overlap-save: the second half is the valid convolution output.
        for i in 0..self.block_size {
            output[i] = self.accum[self.block_size + i].re * norm;
        }
    }
}
