//! Vibe Player - playback engine
//!
//! Sits beneath the player UI: accepts a track source (URL or raw
//! encoded bytes), renders it through a fixed effect chain
//! (tempo/pitch, lo-fi, EQ, reverb) and exposes transport control and
//! live parameter automation. The engine is pull-based: an audio
//! callback calls [`Engine::process`] per output buffer, and every
//! control change lands as a sample-domain ramp inside that call.
//!
//! Entry point for applications is [`Player`], which gates engine
//! construction on a user-interaction signal.

pub mod backend;
mod decoder;
mod engine;
mod error;
mod events;
mod graph;
#[cfg(feature = "desktop")]
mod output;
mod player;
mod types;

pub use decoder::TrackDecoder;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use events::{EventQueue, PlaybackEvent};
pub use graph::AudioGraph;
#[cfg(feature = "desktop")]
pub use output::AudioOutput;
pub use player::Player;
pub use types::{
    EffectModuleId, EngineConfig, EqLayout, PlaybackState, Track, TrackSource, TransportSnapshot,
};

// Re-exported so downstream callers configure effects without a direct
// vibe-audio dependency.
pub use vibe_audio::effects::{EqPreset, ModuleState, ReverbPreset};
pub use vibe_audio::pitch::PitchStrategyKind;
