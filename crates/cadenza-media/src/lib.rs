//! # cadenza-media
//!
//! Asynchronous media plumbing for the Cadenza mixing engine:
//!
//! - [`BufferCache`] - loads, decodes, and caches clip audio with in-flight
//!   deduplication, cooperative cancellation, and LRU eviction.
//! - [`WaveformPeaks`] - three-resolution visualization summaries generated
//!   at decode time.
//! - [`ImpulseResponseLibrary`] - named reverb impulses with a synthetic
//!   exponential-noise fallback.
//! - [`MediaSource`] - the byte-fetch seam; codec internals stay behind it
//!   (WAV provided, everything else is the host's business).

pub mod cache;
pub mod error;
pub mod impulse;
pub mod peaks;
pub mod source;

pub use cache::{BufferCache, CacheStats, ClipId};
pub use error::{Error, Result};
pub use impulse::{ImpulseResponse, ImpulseResponseLibrary};
pub use peaks::WaveformPeaks;
pub use source::{DecodedAudio, FileSource, MediaSource, MemorySource};
