//! # Cadenza - Multi-track Audio Mixing Engine
//!
//! A mixing engine built from modular subsystems.
//!
//! ## Architecture
//!
//! Cadenza is an umbrella crate that coordinates:
//! - **cadenza-core** - Engine primitives (render clock, smoothing, metering,
//!   latency compensation, readiness gating)
//! - **cadenza-dsp** - Processing stages (EQ, gate, compressor, soft-clip
//!   limiter, panner, partitioned convolution reverb)
//! - **cadenza-media** - Media pipeline (deduplicating buffer cache, WAV
//!   decode, waveform peaks, impulse response library)
//!
//! On top of those this crate provides the graph itself: per-track effects
//! chains, bus routing into a master chain, and a sample-accurate transport
//! that schedules clips against the render clock.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cadenza::{AudioClip, AudioGraphEngine, TrackConfig};
//!
//! let engine = AudioGraphEngine::builder().build()?;
//!
//! engine.create_track(TrackConfig::new("vox", "Vocals"));
//! engine
//!     .load_track("vox", vec![AudioClip::new("take1", "takes/take1.wav", 0.0)])
//!     .await?;
//!
//! engine.play(Some(0.0)).await?;
//!
//! // Pull audio (or enable the `device` feature and open an OutputStream).
//! let (mut l, mut r) = (vec![0.0; 512], vec![0.0; 512]);
//! engine.render(&mut l, &mut r);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - The engine, host-driven rendering
//! - `device` - CPAL output stream pulling the render loop

/// Re-export of cadenza-core for direct access
pub use cadenza_core as core;

// Engine primitives
pub use cadenza_core::{
    AlwaysReady,
    // Lock-free primitives
    AtomicDouble,
    AtomicFlag,
    AtomicFloat,
    DeviceLatency,
    EngineConfig,
    LatencyCompensationUnit,
    LatencyReport,
    // Metering
    LevelSnapshot,
    LevelTap,
    ManualGate,
    // Readiness gating
    ReadinessGate,
    RenderClock,
    Smoothed,
    SILENCE_DBFS,
};

/// Re-export of cadenza-dsp for direct access
pub use cadenza_dsp as dsp;

pub use cadenza_dsp::{Compressor, Gate, Panner, ReverbSend, SoftClip, ThreeBandEq};

/// Re-export of cadenza-media for direct access
pub use cadenza_media as media;

pub use cadenza_media::{
    BufferCache, CacheStats, DecodedAudio, FileSource, ImpulseResponse, ImpulseResponseLibrary,
    MediaSource, MemorySource, WaveformPeaks,
};

mod builder;
mod engine;
mod error;

pub mod bus;
pub mod chain;
pub mod master;
pub mod model;
pub mod transport;

#[cfg(feature = "device")]
mod output;

pub use builder::AudioGraphEngineBuilder;
pub use engine::AudioGraphEngine;
pub use error::{Error, Result};

pub use chain::{
    CompressorParams, EffectType, EqParams, GateParams, LimiterParams, ReverbParams,
};
pub use model::{AudioClip, BusConfig, TrackConfig, MASTER_BUS_ID};
pub use transport::TransportState;

#[cfg(feature = "device")]
pub use output::OutputStream;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{AudioGraphEngine, AudioGraphEngineBuilder};

    // Session data
    pub use crate::model::{AudioClip, BusConfig, TrackConfig};

    // Effect parameters
    pub use crate::chain::{
        CompressorParams, EffectType, EqParams, GateParams, LimiterParams, ReverbParams,
    };

    // Engine primitives
    pub use crate::core::{EngineConfig, LevelSnapshot, ManualGate, ReadinessGate};

    // Media
    pub use crate::media::{FileSource, MediaSource, MemorySource};

    // Device output
    #[cfg(feature = "device")]
    pub use crate::OutputStream;
}
