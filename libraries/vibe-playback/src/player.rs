//! Public player wrapper
//!
//! Defers engine construction until a genuine user interaction has
//! been signaled, mirroring platform autoplay policy. Before the
//! signal every engine-reaching call fails with
//! [`EngineError::PlaybackBlocked`]; after it, construction happens
//! exactly once per session. `destroy` tears the engine down and
//! re-arms the gate.

use std::time::Duration;

use vibe_audio::effects::{EqPreset, ModuleState, ReverbPreset};
use vibe_audio::pitch::PitchStrategyKind;

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::events::PlaybackEvent;
use crate::types::{EffectModuleId, EngineConfig, PlaybackState, Track, TransportSnapshot};

/// Parameters accepted before the engine exists, applied at
/// construction so early UI state is not lost.
#[derive(Debug, Clone)]
struct StoredParams {
    volume: f32,
    muted: bool,
    tempo: f32,
    pitch_semitones: f32,
}

impl Default for StoredParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            tempo: 1.0,
            pitch_semitones: 0.0,
        }
    }
}

pub struct Player {
    config: EngineConfig,
    engine: Option<Engine>,
    interaction_seen: bool,
    stored: StoredParams,
}

impl Player {
    /// Builds nothing; the engine is created lazily on the first call
    /// after [`Player::notify_user_interaction`].
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
            interaction_seen: false,
            stored: StoredParams::default(),
        }
    }

    /// Arm engine construction. Call this from a real user gesture.
    pub fn notify_user_interaction(&mut self) {
        self.interaction_seen = true;
    }

    fn engine_mut(&mut self) -> Result<&mut Engine> {
        if !self.interaction_seen {
            return Err(EngineError::PlaybackBlocked);
        }
        let config = &self.config;
        let stored = &self.stored;
        Ok(self.engine.get_or_insert_with(|| {
            tracing::info!("constructing playback engine");
            let mut engine = Engine::new(config.clone());
            engine.set_volume(stored.volume);
            engine.set_muted(stored.muted);
            engine.set_tempo(stored.tempo);
            engine.set_pitch_semitones(stored.pitch_semitones);
            engine.drain_events();
            engine
        }))
    }

    /// Tear the engine down. A fresh interaction signal is required
    /// before the player can be used again; no call afterwards panics.
    pub fn destroy(&mut self) {
        self.engine = None;
        self.interaction_seen = false;
    }

    // --- transport -----------------------------------------------------

    pub fn load_track(&mut self, track: Track) -> Result<()> {
        self.engine_mut()?.load_track(track)
    }

    pub fn play(&mut self) -> Result<()> {
        self.engine_mut()?.play()
    }

    pub fn pause(&mut self) -> Result<()> {
        self.engine_mut()?.pause();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.engine_mut()?.stop();
        Ok(())
    }

    pub fn seek(&mut self, position: Duration) -> Result<Duration> {
        self.engine_mut()?.seek(position)
    }

    // --- polled state -----------------------------------------------------

    /// Zeroed defaults before the engine exists or after `destroy`.
    pub fn snapshot(&self) -> TransportSnapshot {
        self.engine
            .as_ref()
            .map(Engine::snapshot)
            .unwrap_or_default()
    }

    pub fn state(&self) -> PlaybackState {
        self.engine
            .as_ref()
            .map_or(PlaybackState::Idle, Engine::state)
    }

    pub fn position(&self) -> Duration {
        self.engine.as_ref().map_or(Duration::ZERO, Engine::position)
    }

    pub fn duration(&self) -> Duration {
        self.engine.as_ref().map_or(Duration::ZERO, Engine::duration)
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.engine
            .as_mut()
            .map(Engine::drain_events)
            .unwrap_or_default()
    }

    // --- parameters (stored when the engine does not exist yet) -----------

    pub fn set_volume(&mut self, volume: f32) {
        self.stored.volume = volume.clamp(0.0, 1.0);
        if let Some(engine) = &mut self.engine {
            engine.set_volume(volume);
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.stored.muted = muted;
        if let Some(engine) = &mut self.engine {
            engine.set_muted(muted);
        }
    }

    pub fn set_tempo(&mut self, ratio: f32) {
        self.stored.tempo = ratio;
        if let Some(engine) = &mut self.engine {
            engine.set_tempo(ratio);
        }
    }

    pub fn set_pitch_semitones(&mut self, semitones: f32) {
        self.stored.pitch_semitones = semitones;
        if let Some(engine) = &mut self.engine {
            engine.set_pitch_semitones(semitones);
        }
    }

    pub fn pitch_strategy(&self) -> Option<PitchStrategyKind> {
        self.engine.as_ref().map(Engine::pitch_strategy)
    }

    pub fn set_module_bypass(&mut self, id: EffectModuleId, bypass: bool) -> Result<()> {
        self.engine_mut()?.set_module_bypass(id, bypass);
        Ok(())
    }

    pub fn set_module_mix(&mut self, id: EffectModuleId, mix: f32) -> Result<()> {
        self.engine_mut()?.set_module_mix(id, mix);
        Ok(())
    }

    pub fn module_state(&self, id: EffectModuleId) -> Option<ModuleState> {
        self.engine.as_ref().map(|e| e.module_state(id))
    }

    pub fn set_eq_band_gain(&mut self, band: usize, gain_db: f32) -> Result<()> {
        self.engine_mut()?.set_eq_band_gain(band, gain_db)
    }

    pub fn apply_eq_preset(&mut self, preset: EqPreset) -> Result<()> {
        self.engine_mut()?.apply_eq_preset(preset);
        Ok(())
    }

    pub fn apply_reverb_preset(&mut self, preset: ReverbPreset) -> Result<()> {
        self.engine_mut()?.apply_reverb_preset(preset);
        Ok(())
    }

    // --- direct engine access (audio callback, tests) ----------------------

    /// The wired engine, if constructed. The audio output stage holds
    /// this to drive `process`.
    pub fn engine(&mut self) -> Option<&mut Engine> {
        self.engine.as_mut()
    }

    /// Render through the engine, or silence before it exists.
    pub fn process(&mut self, output: &mut [f32]) {
        match &mut self.engine {
            Some(engine) => engine.process(output),
            None => output.fill(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_blocked_before_interaction() {
        let mut player = Player::new(EngineConfig::default());
        assert!(matches!(player.play(), Err(EngineError::PlaybackBlocked)));
        assert!(matches!(
            player.seek(Duration::from_secs(1)),
            Err(EngineError::PlaybackBlocked)
        ));
    }

    #[test]
    fn snapshot_is_zeroed_without_engine() {
        let player = Player::new(EngineConfig::default());
        let snapshot = player.snapshot();
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.position, Duration::ZERO);
    }

    #[test]
    fn stored_parameters_apply_on_construction() {
        let mut player = Player::new(EngineConfig::default());
        player.set_volume(0.4);
        player.set_tempo(1.5);

        player.notify_user_interaction();
        // Any engine-reaching call constructs it
        player.stop().unwrap();

        let snapshot = player.snapshot();
        assert!((snapshot.volume - 0.4).abs() < 1e-6);
        let engine = player.engine().unwrap();
        assert_eq!(engine.tempo(), 1.5);
    }

    #[test]
    fn destroy_rearms_the_gate() {
        let mut player = Player::new(EngineConfig::default());
        player.notify_user_interaction();
        player.stop().unwrap();
        assert!(player.engine().is_some());

        player.destroy();
        assert_eq!(player.position(), Duration::ZERO);
        assert!(!player.snapshot().is_playing);
        assert!(matches!(player.play(), Err(EngineError::PlaybackBlocked)));
    }

    #[test]
    fn process_renders_silence_before_init() {
        let mut player = Player::new(EngineConfig::default());
        let mut buf = vec![0.7; 256];
        player.process(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }
}
