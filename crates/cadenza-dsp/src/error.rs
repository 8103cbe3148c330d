//! Error types for cadenza-dsp.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Impulse response is empty")]
    EmptyImpulse,

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

pub type Result<T> = std::result::Result<T, Error>;
