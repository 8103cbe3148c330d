//! Integration test modules for Cadenza.
//!
//! Test categories:
//! - engine: lifecycle, readiness gating, teardown
//! - transport: play/pause/stop, positions, clip scheduling
//! - mixing: track chains, buses, mute/solo, master levels
//! - media: buffer cache behavior observed through the engine

pub mod engine;
pub mod media;
pub mod mixing;
pub mod transport;
