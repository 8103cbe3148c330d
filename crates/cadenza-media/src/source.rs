//! Media sources and decoded audio.
//!
//! [`MediaSource`] is the byte-fetch seam between the engine and wherever
//! audio actually lives (disk, memory, an HTTP layer owned by the host).
//! Fetches are synchronous; the cache offloads them to a blocking task so
//! the control path never stalls on I/O.

use crate::error::{Error, Result};
use dashmap::DashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fetches raw encoded bytes for a URL. Implementations must be cheap to
/// clone behind an `Arc` and safe to call from a blocking task.
pub trait MediaSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Resolves URLs as paths relative to a root directory.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MediaSource for FileSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        std::fs::read(self.root.join(url)).map_err(|e| Error::fetch(url, e))
    }
}

/// In-memory source, primarily for tests. Counts fetches so dedup
/// behavior is observable.
#[derive(Default)]
pub struct MemorySource {
    entries: DashMap<String, Arc<Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(url.into(), Arc::new(bytes));
    }

    /// Total number of `fetch` calls served (hits and misses).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl MediaSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.entries
            .get(url)
            .map(|bytes| bytes.as_ref().clone())
            .ok_or_else(|| Error::fetch(url, "not found"))
    }
}

/// Decoded stereo audio. Mono input is duplicated into both channels so
/// downstream processing is always two-channel.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub sample_rate: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.left.len() as f64 / self.sample_rate
    }

    /// Decode WAV bytes. Integer formats are normalized to [-1, 1];
    /// channels beyond the first two are dropped.
    pub fn from_wav_bytes(url: &str, bytes: &[u8]) -> Result<Self> {
        let reader =
            hound::WavReader::new(Cursor::new(bytes)).map_err(|e| Error::decode(url, e))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::decode(url, e))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::decode(url, e))?
            }
        };

        let frames = samples.len() / channels;
        if frames == 0 {
            return Err(Error::decode(url, "no audio frames"));
        }

        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }

        Ok(Self {
            sample_rate: spec.sample_rate as f64,
            left,
            right,
        })
    }
}
