//! Centralized error type for the cadenza umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cadenza_core::Error),

    #[error("DSP: {0}")]
    Dsp(#[from] cadenza_dsp::Error),

    #[error("Media: {0}")]
    Media(#[from] cadenza_media::Error),

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Unknown bus: {0}")]
    UnknownBus(String),

    #[error("Engine is not ready (processing context not yet unlocked)")]
    NotReady,

    #[cfg(feature = "device")]
    #[error("Audio device: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, Error>;
