//! Transport controller
//!
//! The engine is the single owner of the audio graph and the active
//! playback backend. Control calls are synchronous; their audible
//! effect lands inside `process`, where transport fades count down in
//! the sample domain. Rapid repeated transport calls are
//! last-call-wins: a new call replaces whatever fade was in flight.

use std::time::Duration;

use vibe_audio::effects::{EqPreset, ModuleState, ReverbPreset};
use vibe_audio::pitch::PitchStrategyKind;
use vibe_audio::AnalyserTap;

use crate::backend::{build_backend, validate_source, PlaybackBackend};
use crate::error::{EngineError, Result};
use crate::events::{EventQueue, PlaybackEvent};
use crate::graph::AudioGraph;
use crate::types::{EffectModuleId, EngineConfig, PlaybackState, Track, TransportSnapshot};

/// What happens when the in-flight transport fade reaches silence.
#[derive(Debug, Clone, Copy)]
enum FadeAction {
    Pause,
    Stop,
    Seek(Duration),
}

#[derive(Debug)]
struct PendingFade {
    action: FadeAction,
    remaining_frames: u32,
}

pub struct Engine {
    config: EngineConfig,
    graph: AudioGraph,
    backend: Option<Box<dyn PlaybackBackend>>,
    track: Option<Track>,
    state: PlaybackState,
    tempo: f32,
    pending: Option<PendingFade>,
    events: EventQueue,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let graph = AudioGraph::new(&config);
        Self {
            config,
            graph,
            backend: None,
            track: None,
            state: PlaybackState::Idle,
            tempo: 1.0,
            pending: None,
            events: EventQueue::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.events.push(PlaybackEvent::StateChanged { state });
        }
    }

    // --- track lifecycle -----------------------------------------------

    /// Load a track, tearing down the previous backend first. A source
    /// that fails validation leaves current playback untouched; a
    /// decode failure after teardown lands in `Error` with silence.
    pub fn load_track(&mut self, track: Track) -> Result<()> {
        // Reject bad sources before touching the running backend
        validate_source(&track.source)?;

        // Implicit stop: exactly one backend may ever be wired
        self.pending = None;
        self.backend = None;
        self.track = None;
        self.graph.reset_tails();
        self.graph.snap_to_volume();
        self.set_state(PlaybackState::Loading);
        tracing::info!(track_id = %track.id, "loading track");

        let mut backend = match build_backend(&track.source) {
            Ok(backend) => backend,
            Err(e) => {
                self.set_state(PlaybackState::Error);
                self.events.push(PlaybackEvent::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        backend.set_tempo(self.tempo);

        self.events.push(PlaybackEvent::TrackLoaded {
            track_id: track.id.clone(),
        });
        self.backend = Some(backend);
        self.track = Some(track);
        self.set_state(PlaybackState::Ready);
        Ok(())
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    // --- transport -------------------------------------------------------

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => {
                // Cancel an in-flight pause/stop fade; otherwise no-op
                if self.pending.take().is_some() {
                    self.graph.fade_to_volume();
                }
                Ok(())
            }
            PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Stopped => {
                self.pending = None;
                let at = self.position();
                if let Some(backend) = &mut self.backend {
                    backend.start(at)?;
                }
                self.graph.fade_in_from_silence();
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
            PlaybackState::Idle | PlaybackState::Loading | PlaybackState::Error => {
                Err(EngineError::Unsupported {
                    what: "no track loaded".into(),
                })
            }
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.graph.fade_to_silence();
            self.pending = Some(PendingFade {
                action: FadeAction::Pause,
                remaining_frames: self.graph.fade_frames(),
            });
        }
    }

    pub fn stop(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.graph.fade_to_silence();
                self.pending = Some(PendingFade {
                    action: FadeAction::Stop,
                    remaining_frames: self.graph.fade_frames(),
                });
            }
            PlaybackState::Paused | PlaybackState::Ready => {
                if let Some(backend) = &mut self.backend {
                    backend.stop();
                }
                self.graph.reset_tails();
                self.graph.snap_to_volume();
                self.set_state(PlaybackState::Stopped);
            }
            _ => {}
        }
    }

    /// Clamped to `[0, duration]`. While playing the engine fades out,
    /// repositions at the bottom of the fade and fades back in; while
    /// paused or stopped the cursor moves immediately.
    pub fn seek(&mut self, position: Duration) -> Result<Duration> {
        let backend = self.backend.as_mut().ok_or(EngineError::Unsupported {
            what: "no track loaded".into(),
        })?;
        let target = position.min(backend.duration());

        if self.state == PlaybackState::Playing {
            self.graph.fade_to_silence();
            self.pending = Some(PendingFade {
                action: FadeAction::Seek(target),
                remaining_frames: self.graph.fade_frames(),
            });
            Ok(target)
        } else {
            backend.seek(target)
        }
    }

    pub fn position(&self) -> Duration {
        // A seek in flight already owns the clock
        if let Some(PendingFade {
            action: FadeAction::Seek(target),
            ..
        }) = &self.pending
        {
            return *target;
        }
        self.backend
            .as_ref()
            .map(|b| b.position())
            .unwrap_or(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.backend
            .as_ref()
            .map(|b| b.duration())
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            is_playing: self.is_playing(),
            position: self.position(),
            duration: self.duration(),
            volume: self.graph.volume(),
            is_muted: self.graph.is_muted(),
        }
    }

    // --- volume ------------------------------------------------------------

    pub fn set_volume(&mut self, volume: f32) {
        self.graph.set_master_volume(volume);
        self.events.push(PlaybackEvent::VolumeChanged {
            volume: self.graph.volume(),
            is_muted: self.graph.is_muted(),
        });
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.graph.set_muted(muted);
        self.events.push(PlaybackEvent::VolumeChanged {
            volume: self.graph.volume(),
            is_muted: muted,
        });
    }

    // --- tempo and pitch ---------------------------------------------------

    pub fn set_tempo(&mut self, ratio: f32) {
        self.tempo = ratio.clamp(crate::backend::MIN_TEMPO, crate::backend::MAX_TEMPO);
        if let Some(backend) = &mut self.backend {
            backend.set_tempo(self.tempo);
        }
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Whether tempo changes leave pitch untouched on the active
    /// backend. False when nothing is loaded.
    pub fn preserves_pitch(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.preserves_pitch())
    }

    pub fn set_pitch_semitones(&mut self, semitones: f32) {
        self.graph.set_pitch_semitones(semitones);
    }

    pub fn pitch_semitones(&self) -> f32 {
        self.graph.pitch_semitones()
    }

    pub fn pitch_strategy(&self) -> PitchStrategyKind {
        self.graph.pitch_strategy()
    }

    // --- effect modules -----------------------------------------------------

    pub fn set_module_bypass(&mut self, id: EffectModuleId, bypass: bool) {
        self.graph.set_bypass(id, bypass);
    }

    pub fn set_module_mix(&mut self, id: EffectModuleId, mix: f32) {
        self.graph.set_mix(id, mix);
    }

    pub fn module_state(&self, id: EffectModuleId) -> ModuleState {
        self.graph.module_state(id)
    }

    pub fn set_eq_band_gain(&mut self, band: usize, gain_db: f32) -> Result<()> {
        self.graph.set_eq_band_gain(band, gain_db)
    }

    pub fn eq_band_gain(&self, band: usize) -> Result<f32> {
        self.graph.eq_band_gain(band)
    }

    pub fn apply_eq_preset(&mut self, preset: EqPreset) {
        self.graph.apply_eq_preset(preset);
    }

    pub fn set_lofi_cutoff(&mut self, cutoff_hz: f32) {
        self.graph.lofi_mut().set_cutoff(cutoff_hz);
    }

    pub fn set_lofi_noise_level(&mut self, level: f32) {
        self.graph.lofi_mut().set_noise_level(level);
    }

    pub fn set_lofi_wow(&mut self, depth_hz: f32, rate_hz: f32) {
        self.graph.lofi_mut().set_wow_depth(depth_hz);
        self.graph.lofi_mut().set_wow_rate(rate_hz);
    }

    /// Stored only; crackle has no DSP behind it.
    pub fn set_lofi_crackle(&mut self, level: f32) {
        self.graph.lofi_mut().set_crackle_level(level);
    }

    pub fn supports_crackle(&self) -> bool {
        self.graph.lofi().supports_crackle()
    }

    pub fn apply_reverb_preset(&mut self, preset: ReverbPreset) {
        self.graph.apply_reverb_preset(preset);
    }

    pub fn set_reverb_predelay(&mut self, predelay_ms: f32) {
        self.graph.reverb_mut().set_predelay_ms(predelay_ms);
    }

    pub fn set_reverb_damping(&mut self, cutoff_hz: f32) {
        self.graph.reverb_mut().set_damping(cutoff_hz);
    }

    pub fn supports_convolution(&self) -> bool {
        self.graph.supports_convolution()
    }

    pub fn set_tone_cutoff(&mut self, cutoff_hz: f32) {
        self.graph.set_tone_cutoff(cutoff_hz);
    }

    pub fn set_tone_resonance(&mut self, q: f32) {
        self.graph.set_tone_resonance(q);
    }

    // --- observation ----------------------------------------------------------

    pub fn analyser(&self) -> &AnalyserTap {
        self.graph.analyser()
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain()
    }

    // --- rendering --------------------------------------------------------------

    /// Render one interleaved stereo block. Called from the audio
    /// callback; every transport fade completes here.
    pub fn process(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        if self.state != PlaybackState::Playing {
            return;
        }

        if let Some(backend) = &mut self.backend {
            if let Err(e) = backend.render(output) {
                // Keep the callback alive; the rest of the block is
                // already silence
                tracing::warn!("render failed: {e}");
            }
        }

        self.graph.process(output);

        let frames = (output.len() / 2) as u32;
        let fade_done = match &mut self.pending {
            Some(pending) if pending.remaining_frames > frames => {
                pending.remaining_frames -= frames;
                false
            }
            Some(_) => true,
            None => false,
        };
        if fade_done {
            if let Some(pending) = self.pending.take() {
                self.complete_fade(pending.action);
            }
        }

        let finished = self
            .backend
            .as_ref()
            .is_some_and(|b| b.is_finished());
        if finished && self.pending.is_none() && self.state == PlaybackState::Playing {
            self.finish_track();
        }
    }

    fn complete_fade(&mut self, action: FadeAction) {
        match action {
            FadeAction::Pause => {
                if let Some(backend) = &mut self.backend {
                    backend.pause();
                }
                // Restore the target volume now so the next play
                // starts audible
                self.graph.snap_to_volume();
                self.set_state(PlaybackState::Paused);
            }
            FadeAction::Stop => {
                if let Some(backend) = &mut self.backend {
                    backend.stop();
                }
                self.graph.reset_tails();
                self.graph.snap_to_volume();
                self.set_state(PlaybackState::Stopped);
            }
            FadeAction::Seek(target) => {
                if let Some(backend) = &mut self.backend {
                    if let Err(e) = backend.seek(target) {
                        tracing::warn!("seek failed: {e}");
                    }
                }
                self.graph.fade_to_volume();
            }
        }
    }

    fn finish_track(&mut self) {
        if let Some(backend) = &mut self.backend {
            backend.stop();
        }
        self.graph.snap_to_volume();
        if let Some(track) = &self.track {
            self.events.push(PlaybackEvent::TrackEnded {
                track_id: track.id.clone(),
            });
        }
        self.set_state(PlaybackState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_audio::test_utils::signals::generate_sine_wave;

    use crate::types::TrackSource;

    fn wav_bytes(frequency: f32, seconds: f32) -> Vec<u8> {
        let samples = generate_sine_wave(frequency, 44100, seconds, 0.5);
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut bytes = Vec::new();
        {
            let mut writer =
                hound::WavWriter::new(std::io::Cursor::new(&mut bytes), spec).unwrap();
            for &s in &samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    fn engine_with_track(seconds: f32) -> Engine {
        let mut engine = Engine::new(EngineConfig::default());
        let track = Track::from_source("t1", TrackSource::Bytes(wav_bytes(440.0, seconds)));
        engine.load_track(track).unwrap();
        engine
    }

    fn run(engine: &mut Engine, seconds: f32) {
        let mut block = vec![0.0; 4410 * 2];
        let blocks = (seconds * 10.0).round() as usize;
        for _ in 0..blocks {
            engine.process(&mut block);
        }
    }

    #[test]
    fn load_transitions_to_ready() {
        let engine = engine_with_track(1.0);
        assert_eq!(engine.state(), PlaybackState::Ready);
        assert!((engine.duration().as_secs_f64() - 1.0).abs() < 0.01);
    }

    #[test]
    fn invalid_source_leaves_state_untouched() {
        let mut engine = engine_with_track(1.0);
        engine.play().unwrap();

        let bad = Track::from_source("t2", TrackSource::Bytes(vec![]));
        let result = engine.load_track(bad);
        assert!(matches!(result, Err(EngineError::InvalidSource { .. })));
        assert_eq!(engine.state(), PlaybackState::Playing);
    }

    #[test]
    fn decode_failure_lands_in_error_state() {
        let mut engine = engine_with_track(1.0);
        let bad = Track::from_source("t2", TrackSource::Bytes(vec![0, 1, 2, 3]));
        let result = engine.load_track(bad);
        assert!(matches!(result, Err(EngineError::Load { .. })));
        assert_eq!(engine.state(), PlaybackState::Error);
        assert!(engine.play().is_err());
    }

    #[test]
    fn pause_completes_after_fade() {
        let mut engine = engine_with_track(5.0);
        engine.play().unwrap();
        run(&mut engine, 0.5);

        engine.pause();
        assert_eq!(engine.state(), PlaybackState::Playing);
        run(&mut engine, 0.2);
        assert_eq!(engine.state(), PlaybackState::Paused);

        let held = engine.position();
        run(&mut engine, 0.3);
        assert_eq!(engine.position(), held);
    }

    #[test]
    fn play_resumes_from_the_paused_position() {
        let mut engine = engine_with_track(5.0);
        engine.play().unwrap();
        run(&mut engine, 0.5);
        engine.pause();
        run(&mut engine, 0.2);
        assert_eq!(engine.state(), PlaybackState::Paused);
        let held = engine.position();

        engine.play().unwrap();
        run(&mut engine, 0.2);
        let pos = engine.position().as_secs_f64();
        let expected = held.as_secs_f64() + 0.2;
        assert!((pos - expected).abs() < 0.05, "position {pos}");
    }

    #[test]
    fn reverb_setters_reach_the_processor() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.set_reverb_predelay(35.0);
        engine.set_reverb_damping(2_000.0);
        assert!((engine.graph.reverb().predelay_ms() - 35.0).abs() < 0.1);
        assert_eq!(engine.graph.reverb().damping(), 2_000.0);
    }

    #[test]
    fn rapid_seeks_are_last_call_wins() {
        let mut engine = engine_with_track(20.0);
        engine.play().unwrap();
        run(&mut engine, 0.1);

        engine.seek(Duration::from_secs(5)).unwrap();
        engine.seek(Duration::from_secs(10)).unwrap();
        engine.seek(Duration::from_secs(2)).unwrap();

        let pos = engine.position().as_secs_f64();
        assert!((pos - 2.0).abs() < 0.05, "position {pos}");

        run(&mut engine, 0.5);
        let pos = engine.position().as_secs_f64();
        assert!(pos >= 2.0 && pos < 3.0, "position {pos}");
    }

    #[test]
    fn position_is_monotonic_while_playing() {
        let mut engine = engine_with_track(5.0);
        engine.play().unwrap();

        let mut block = vec![0.0; 1024];
        let mut last = engine.position();
        for _ in 0..100 {
            engine.process(&mut block);
            let now = engine.position();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn track_end_emits_event_and_stops() {
        let mut engine = engine_with_track(0.3);
        engine.play().unwrap();
        engine.drain_events();

        run(&mut engine, 1.0);
        assert_eq!(engine.state(), PlaybackState::Stopped);
        let events = engine.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            PlaybackEvent::TrackEnded { track_id } if track_id == "t1"
        )));
    }

    #[test]
    fn tempo_clamps_to_supported_range() {
        let mut engine = engine_with_track(1.0);
        engine.set_tempo(10.0);
        assert_eq!(engine.tempo(), 2.0);
        engine.set_tempo(0.1);
        assert_eq!(engine.tempo(), 0.5);
    }

    #[test]
    fn buffer_backend_does_not_preserve_pitch() {
        let engine = engine_with_track(1.0);
        assert!(!engine.preserves_pitch());
    }

    #[test]
    fn module_state_survives_track_swap() {
        let mut engine = engine_with_track(1.0);
        engine.set_module_mix(EffectModuleId::LoFi, 0.6);
        engine.set_module_bypass(EffectModuleId::LoFi, false);

        let next = Track::from_source("t2", TrackSource::Bytes(wav_bytes(880.0, 1.0)));
        engine.load_track(next).unwrap();

        let state = engine.module_state(EffectModuleId::LoFi);
        assert!(!state.bypass);
        assert_eq!(state.mix, 0.6);
    }
}
