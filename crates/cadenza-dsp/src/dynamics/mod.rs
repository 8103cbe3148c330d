//! Envelope-follower dynamics: compressor and gate.
//!
//! Both stages detect on the stereo-linked absolute maximum of the two
//! channels so the image never shifts under gain reduction.

mod compressor;
mod gate;

pub use compressor::Compressor;
pub use gate::Gate;
