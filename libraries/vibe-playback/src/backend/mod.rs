//! Playback backends
//!
//! Two implementations of one contract, selected per load by the
//! track source:
//! - [`StreamingBackend`] for URLs: progressive packet decode,
//!   position from the media clock, tempo through a preserve-pitch
//!   stretcher.
//! - [`BufferBackend`] for byte buffers: full decode up front,
//!   sample-accurate seek, tempo as a source-rate change (pitch moves
//!   with tempo).
//!
//! Exactly one backend is active at a time; construction failures
//! leave the previous wiring untouched.

mod buffer;
mod streaming;

pub use buffer::BufferBackend;
pub use streaming::StreamingBackend;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::types::TrackSource;

/// Tempo limits shared by both backends.
pub const MIN_TEMPO: f32 = 0.5;
pub const MAX_TEMPO: f32 = 2.0;

/// A frame source under transport control. All audio is interleaved
/// stereo f32; `render` is called from the audio callback, everything
/// else from the control surface.
pub trait PlaybackBackend: Send {
    /// Position the cursor and prepare to render from `at`.
    fn start(&mut self, at: Duration) -> Result<()>;

    /// Hold the cursor; rendering stops until the next `start`.
    fn pause(&mut self);

    /// Rewind to zero and clear end-of-stream.
    fn stop(&mut self);

    /// Move to `position`, clamped to `[0, duration]`. Returns where
    /// the backend actually landed.
    fn seek(&mut self, position: Duration) -> Result<Duration>;

    fn position(&self) -> Duration;

    fn duration(&self) -> Duration;

    /// Playback speed ratio, clamped to `[0.5, 2.0]`.
    fn set_tempo(&mut self, ratio: f32);

    fn tempo(&self) -> f32;

    /// Whether tempo changes leave pitch untouched on this backend.
    fn preserves_pitch(&self) -> bool;

    /// Fill `output` with interleaved stereo frames. Returns the
    /// number of frames written; the caller zero-fills the rest.
    fn render(&mut self, output: &mut [f32]) -> Result<usize>;

    /// True once the source is exhausted.
    fn is_finished(&self) -> bool;
}

/// Synchronous source validation, run before any teardown so a bad
/// source never interrupts current playback.
pub fn validate_source(source: &TrackSource) -> Result<()> {
    match source {
        TrackSource::Url(url) => {
            resolve_url(url)?;
            Ok(())
        }
        TrackSource::Bytes(bytes) if bytes.is_empty() => {
            Err(EngineError::invalid_source("empty byte buffer"))
        }
        TrackSource::Bytes(_) => Ok(()),
    }
}

/// Build the backend matching the source type.
pub fn build_backend(source: &TrackSource) -> Result<Box<dyn PlaybackBackend>> {
    validate_source(source)?;
    match source {
        TrackSource::Url(url) => {
            let path = resolve_url(url)?;
            Ok(Box::new(StreamingBackend::load(&path)?))
        }
        TrackSource::Bytes(bytes) => Ok(Box::new(BufferBackend::load(bytes.clone())?)),
    }
}

/// Map a track URL to a local path. Remote fetching belongs to the
/// caller; anything but `file://` or a bare path is rejected here.
fn resolve_url(url: &str) -> Result<PathBuf> {
    if url.is_empty() {
        return Err(EngineError::invalid_source("empty URL"));
    }
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(EngineError::invalid_source(format!(
            "unsupported URL scheme: {url}"
        )));
    }
    Ok(PathBuf::from(url))
}

pub(crate) fn clamp_tempo(ratio: f32) -> f32 {
    ratio.clamp(MIN_TEMPO, MAX_TEMPO)
}
