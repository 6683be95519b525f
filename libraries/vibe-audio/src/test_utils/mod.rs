//! Shared helpers for DSP tests
//!
//! Enabled for this crate's own tests and, via the `test-utils`
//! feature, for downstream crates that want the same signal
//! generators and analysis helpers in their integration tests.

pub mod analysis;
pub mod signals;
