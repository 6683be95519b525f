//! Playback events
//!
//! Event-based communication for UI synchronization. The engine pushes
//! events into a bounded queue; the UI drains it once per frame
//! alongside the polled snapshot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::PlaybackState;

/// Oldest events are dropped past this point; a stalled UI should not
/// grow the engine's memory.
const MAX_QUEUED_EVENTS: usize = 256;

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Transport state changed (play/pause/stop/load transitions)
    StateChanged { state: PlaybackState },

    /// A track finished loading and is ready to play
    TrackLoaded { track_id: String },

    /// The current track reached its end naturally
    TrackEnded { track_id: String },

    /// Volume or mute changed
    VolumeChanged { volume: f32, is_muted: bool },

    /// A load failed; the engine is in the `Error` state
    Error { message: String },
}

/// Bounded FIFO of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<PlaybackEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PlaybackEvent) {
        if self.events.len() == MAX_QUEUED_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Remove and return all pending events, oldest first.
    pub fn drain(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
