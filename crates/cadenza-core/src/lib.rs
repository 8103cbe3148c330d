//! # cadenza-core
//!
//! Runtime kernel shared by every Cadenza crate:
//!
//! - **Lock-free parameter cells** ([`AtomicFloat`], [`AtomicDouble`],
//!   [`AtomicFlag`]) written by the control path and read by the render path.
//! - **Click-free parameter ramps** ([`Smoothed`]) for gain-class values.
//! - **Render clock** ([`RenderClock`]) - the sample-accurate processing
//!   clock all scheduling is expressed against.
//! - **Metering taps** ([`LevelTap`]) publishing peak/RMS to readers.
//! - **Latency accounting** ([`LatencyCompensationUnit`]).
//! - **Readiness gating** ([`ReadinessGate`]) for platforms that hold audio
//!   start behind a user gesture.

pub mod clock;
pub mod config;
pub mod error;
pub mod latency;
pub mod lockfree;
pub mod metering;
pub mod readiness;
pub mod smooth;

pub use clock::RenderClock;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use latency::{DeviceLatency, LatencyCompensationUnit, LatencyReport};
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat};
pub use metering::{amplitude_to_dbfs, LevelSnapshot, LevelTap, SILENCE_DBFS};
pub use readiness::{AlwaysReady, ManualGate, ReadinessGate};
pub use smooth::Smoothed;
