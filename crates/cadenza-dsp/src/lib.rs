//! # cadenza-dsp
//!
//! Signal-processing stages composed into Cadenza's per-track, bus, and
//! master chains:
//!
//! - [`ThreeBandEq`] - low shelf / peaking mid / high shelf biquads
//! - [`Gate`] / [`Compressor`] - envelope-follower dynamics
//! - [`SoftClip`] - tanh saturation limiter with a precomputed curve
//! - [`Panner`] - equal-power stereo balance
//! - [`Convolver`] / [`ReverbSend`] - partitioned FFT convolution reverb
//!
//! Every stage carries an `enabled` flag; a disabled stage passes its input
//! through unchanged so the chain topology never rewires at runtime.
//! Parameters live in lock-free cells written by the control path and read
//! by the render path each block.

pub mod biquad;
pub mod convolver;
pub mod dynamics;
pub mod eq;
pub mod error;
pub mod pan;
pub mod reverb;
pub mod softclip;

pub(crate) mod util;

pub use biquad::{Biquad, BiquadCoeffs};
pub use convolver::Convolver;
pub use dynamics::{Compressor, Gate};
pub use eq::ThreeBandEq;
pub use error::{Error, Result};
pub use pan::Panner;
pub use reverb::ReverbSend;
pub use softclip::SoftClip;
