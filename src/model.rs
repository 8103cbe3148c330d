//! Track, bus, and clip configuration.
//!
//! This is the external collaborator's view of the engine: plain data the
//! project-storage layer persists and hands back on session restore. The
//! engine is a runtime view over it and owns none of it between sessions.

use serde::{Deserialize, Serialize};

/// The master bus id. Created at initialization, never removed.
pub const MASTER_BUS_ID: &str = "master";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    pub id: String,
    pub name: String,
    /// Linear gain, >= 0.
    pub gain: f32,
    /// Pan position: -1 full left, +1 full right.
    pub pan: f32,
    pub muted: bool,
    pub solo: bool,
    /// Target bus; `None` or an unknown id falls back to master.
    pub bus_id: Option<String>,
}

impl TrackConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gain: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
            bus_id: None,
        }
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan.clamp(-1.0, 1.0);
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn solo(mut self, solo: bool) -> Self {
        self.solo = solo;
        self
    }

    pub fn bus(mut self, bus_id: impl Into<String>) -> Self {
        self.bus_id = Some(bus_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub id: String,
    pub name: String,
    pub gain: f32,
    pub pan: f32,
}

impl BusConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gain: 1.0,
            pan: 0.0,
        }
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan.clamp(-1.0, 1.0);
        self
    }
}

/// One clip placement on the timeline. Belongs to exactly one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    pub id: String,
    pub source_url: String,
    /// Timeline position of the clip start, in seconds.
    pub start_time: f64,
    /// Playable length in seconds. `None` plays the remainder of the
    /// source; populated lazily once the buffer has decoded.
    pub duration: Option<f64>,
    /// In-source trim: playback begins this many seconds into the source.
    pub offset: f64,
}

impl AudioClip {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>, start_time: f64) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            start_time,
            duration: None,
            offset: 0.0,
        }
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds.max(0.0));
        self
    }

    pub fn offset(mut self, seconds: f64) -> Self {
        self.offset = seconds.max(0.0);
        self
    }
}
