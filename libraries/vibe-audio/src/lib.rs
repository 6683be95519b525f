//! Vibe Player - DSP building blocks
//!
//! This crate provides the signal-processing half of the Vibe Player
//! audio engine:
//! - Parameter automation ramps (click-free control changes)
//! - A generic dry/wet effect stage with bypass semantics
//! - The effect module processors (EQ, lo-fi, tempo/pitch, reverb)
//! - The pitch-shift strategy chain (stretch, granular, passthrough)
//! - A non-destructive analyser tap for visualization
//!
//! All audio is interleaved stereo `f32` in `[-1.0, 1.0]`. Processors
//! never allocate in their hot path after construction.

mod analyser;
mod biquad;
mod error;
pub mod effects;
pub mod pitch;
mod ramp;
#[cfg(feature = "stretch")]
mod stretch;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analyser::AnalyserTap;
pub use biquad::Biquad;
pub use error::{AudioError, Result};
pub use ramp::{ParamRamp, DEFAULT_RAMP_MS};
#[cfg(feature = "stretch")]
pub use stretch::TimeStretcher;
