//! Core types for the playback engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

use vibe_audio::pitch::PitchStrategyKind;

/// Where a track's audio comes from. The source decides the playback
/// backend: URLs stream progressively, byte buffers are fully decoded
/// up front for sample-accurate seeking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackSource {
    /// `file://` URL or a bare filesystem path. Fetching remote
    /// schemes is the caller's job.
    Url(String),
    /// Encoded audio bytes (any container Symphonia can probe).
    Bytes(Vec<u8>),
}

/// A loadable track. Owned by the engine for the lifetime of its
/// playback and replaced wholesale on the next load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Catalog metadata; the authoritative duration comes from the
    /// decoder once the track is loaded.
    pub duration: Option<Duration>,
    pub source: TrackSource,
    pub cover_art: Option<String>,
}

impl Track {
    /// Minimal constructor for callers that only have a source.
    pub fn from_source(id: impl Into<String>, source: TrackSource) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            artist: String::new(),
            duration: None,
            source,
            cover_art: None,
        }
    }
}

/// Transport state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded
    Idle,
    /// `load_track` in progress
    Loading,
    /// Track loaded, not yet started
    Ready,
    /// Rendering audio
    Playing,
    /// Paused mid-track
    Paused,
    /// Stopped, position rewound
    Stopped,
    /// Load failed; engine renders silence
    Error,
}

/// Polled state snapshot for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
    pub is_muted: bool,
}

impl Default for TransportSnapshot {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            volume: 1.0,
            is_muted: false,
        }
    }
}

/// Identifies an effect module slot in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectModuleId {
    TempoPitch,
    LoFi,
    Eq,
    Reverb,
}

/// Which fixed EQ band layout the graph is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqLayout {
    ThreeBand,
    SevenBand,
}

/// Engine construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Analyser window, rounded up to a power of two.
    pub analyser_size: usize,
    /// Ramp length for master volume changes, in milliseconds.
    pub master_ramp_ms: f32,
    /// Pitch-shift strategies in preference order; first available wins.
    pub pitch_strategies: Vec<PitchStrategyKind>,
    pub eq_layout: EqLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            analyser_size: 2048,
            master_ramp_ms: vibe_audio::DEFAULT_RAMP_MS,
            pitch_strategies: vibe_audio::pitch::DEFAULT_STRATEGY_ORDER.to_vec(),
            eq_layout: EqLayout::SevenBand,
        }
    }
}
