//! CPAL output stream pulling the engine render loop.
//!
//! The device callback interleaves whatever channel count the device
//! reports from the engine's stereo render; channels beyond the first two
//! get silence. A panic inside the callback outputs silence for that
//! buffer instead of tearing down the stream.

use crate::{AudioGraphEngine, Error, Result};
use cadenza_core::DeviceLatency;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use tracing::info;

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` due to platform internals. The stream stays on
/// the thread that created it until [`OutputStream`] is dropped and is never
/// accessed concurrently.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: the stream is never shared; it lives inside OutputStream and is
// only dropped, never called into, from other threads.
unsafe impl Send for StreamHandle {}

/// A running audio output device stream driving one engine.
pub struct OutputStream {
    sample_rate: f64,
    channels: usize,
    _stream: StreamHandle,
}

impl OutputStream {
    /// Open the default output device and start pulling `engine.render`.
    pub fn open(engine: Arc<AudioGraphEngine>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no output device available".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| Error::Device(e.to_string()))?;

        let sample_rate = config.sample_rate().0 as f64;
        let channels = config.channels() as usize;

        // The device owns the timing; report its buffer to latency
        // compensation.
        if let cpal::SupportedBufferSize::Range { min, .. } = config.buffer_size() {
            engine.recompute_latency(&DeviceLatency {
                input_seconds: None,
                output_seconds: None,
                buffer_frames: *min as usize,
                sample_rate,
            });
        }

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), engine)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), engine)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), engine)?
            }
            format => {
                return Err(Error::Device(format!(
                    "unsupported sample format: {format:?}"
                )));
            }
        };
        stream.play().map_err(|e| Error::Device(e.to_string()))?;
        info!(sample_rate, channels, "output stream started");

        Ok(Self {
            sample_rate,
            channels,
            _stream: StreamHandle(stream),
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        engine: Arc<AudioGraphEngine>,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let frames = data.len() / channels;
                        let mut left = vec![0.0f32; frames];
                        let mut right = vec![0.0f32; frames];
                        engine.render(&mut left, &mut right);

                        for (i, sample) in data.iter_mut().enumerate() {
                            let frame = i / channels;
                            let value = match i % channels {
                                0 => left[frame],
                                1 => right[frame],
                                _ => 0.0,
                            };
                            *sample = T::from_sample(value);
                        }
                    }));

                    if result.is_err() {
                        // Panic in the callback: output silence.
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0);
                        }
                    }
                },
                |_err| {
                    // Stream error; cannot log from the device thread.
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        Ok(stream)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}
