//! Audio graph
//!
//! Fixed processing order:
//! `source → TempoPitch → LoFi → EQ → Reverb → tone low-pass → Analyser → master gain`.
//!
//! The graph owns every effect stage and the master gain. Swapping the
//! source (track changes) never touches the stages, so module
//! parameters are session state and survive track loads. Every gain
//! transition here is a ramp.

use vibe_audio::effects::{
    EffectStage, EqPreset, EqProcessor, LofiProcessor, ModuleState, PitchProcessor, ReverbPreset,
    ReverbProcessor,
};
use vibe_audio::pitch::PitchStrategyKind;
use vibe_audio::{AnalyserTap, Biquad, ParamRamp};

use crate::error::{EngineError, Result};
use crate::types::{EffectModuleId, EngineConfig, EqLayout};

/// Transport fades (play/pause/stop/seek) run slightly longer than
/// parameter ramps so level changes at state boundaries stay soft.
pub const TRANSPORT_FADE_MS: f32 = 20.0;

pub struct AudioGraph {
    sample_rate: u32,
    master_ramp_ms: f32,

    tempo_pitch: EffectStage<PitchProcessor>,
    lofi: EffectStage<LofiProcessor>,
    eq: EffectStage<EqProcessor>,
    reverb: EffectStage<ReverbProcessor>,

    tone: Biquad,
    tone_cutoff: f32,
    tone_q: f32,

    analyser: AnalyserTap,

    master: ParamRamp,
    volume: f32,
    muted: bool,
}

impl AudioGraph {
    pub fn new(config: &EngineConfig) -> Self {
        let sample_rate = config.sample_rate;

        let eq_processor = match config.eq_layout {
            EqLayout::ThreeBand => EqProcessor::three_band(sample_rate),
            EqLayout::SevenBand => EqProcessor::seven_band(sample_rate),
        };

        let pitch_processor = PitchProcessor::new(&config.pitch_strategies, sample_rate);
        tracing::debug!(strategy = ?pitch_processor.strategy(), "graph wired");

        let mut tone = Biquad::new();
        tone.set_lowpass(sample_rate as f32, 20_000.0, 0.707);
        tone.reset();

        Self {
            sample_rate,
            master_ramp_ms: config.master_ramp_ms,
            // Pitch and EQ are transparent at their neutral settings,
            // so they run fully wet by default; lo-fi and reverb are
            // audible by nature and start bypassed
            tempo_pitch: EffectStage::new(pitch_processor, 1.0, false, sample_rate),
            lofi: EffectStage::new(LofiProcessor::new(sample_rate), 1.0, true, sample_rate),
            eq: EffectStage::new(eq_processor, 1.0, false, sample_rate),
            reverb: EffectStage::new(ReverbProcessor::new(sample_rate), 0.3, true, sample_rate),
            tone,
            tone_cutoff: 20_000.0,
            tone_q: 0.707,
            analyser: AnalyserTap::with_fft_size(config.analyser_size),
            master: ParamRamp::new(1.0),
            volume: 1.0,
            muted: false,
        }
    }

    /// Run one interleaved stereo block through the whole chain.
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.tempo_pitch.process(buffer);
        self.lofi.process(buffer);
        self.eq.process(buffer);
        self.reverb.process(buffer);

        for frame in buffer.chunks_exact_mut(2) {
            let (l, r) = self.tone.process_frame(frame[0], frame[1]);
            frame[0] = l;
            frame[1] = r;
        }

        self.analyser.feed(buffer);

        for frame in buffer.chunks_exact_mut(2) {
            let gain = self.master.next();
            frame[0] *= gain;
            frame[1] *= gain;
        }
    }

    // --- master gain -------------------------------------------------

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        let target = self.effective_volume();
        self.master
            .set_target_ms(target, self.master_ramp_ms, self.sample_rate);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        let target = self.effective_volume();
        self.master
            .set_target_ms(target, self.master_ramp_ms, self.sample_rate);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Frames a transport fade occupies.
    pub fn fade_frames(&self) -> u32 {
        ((TRANSPORT_FADE_MS / 1000.0) * self.sample_rate as f32).round() as u32
    }

    pub fn fade_to_silence(&mut self) {
        self.master.set_target(0.0, self.fade_frames());
    }

    pub fn fade_to_volume(&mut self) {
        self.master
            .set_target(self.effective_volume(), self.fade_frames());
    }

    /// Start from silence and fade up, for play transitions.
    pub fn fade_in_from_silence(&mut self) {
        self.master.snap(0.0);
        self.master
            .set_target(self.effective_volume(), self.fade_frames());
    }

    /// Restore the target volume instantly while no audio flows, so
    /// the next play starts audible.
    pub fn snap_to_volume(&mut self) {
        self.master.snap(self.effective_volume());
    }

    // --- effect modules ------------------------------------------------

    pub fn set_bypass(&mut self, id: EffectModuleId, bypass: bool) {
        match id {
            EffectModuleId::TempoPitch => self.tempo_pitch.set_bypass(bypass),
            EffectModuleId::LoFi => self.lofi.set_bypass(bypass),
            EffectModuleId::Eq => self.eq.set_bypass(bypass),
            EffectModuleId::Reverb => self.reverb.set_bypass(bypass),
        }
    }

    pub fn set_mix(&mut self, id: EffectModuleId, mix: f32) {
        match id {
            EffectModuleId::TempoPitch => self.tempo_pitch.set_mix(mix),
            EffectModuleId::LoFi => self.lofi.set_mix(mix),
            EffectModuleId::Eq => self.eq.set_mix(mix),
            EffectModuleId::Reverb => self.reverb.set_mix(mix),
        }
    }

    pub fn module_state(&self, id: EffectModuleId) -> ModuleState {
        match id {
            EffectModuleId::TempoPitch => self.tempo_pitch.state(),
            EffectModuleId::LoFi => self.lofi.state(),
            EffectModuleId::Eq => self.eq.state(),
            EffectModuleId::Reverb => self.reverb.state(),
        }
    }

    pub fn set_pitch_semitones(&mut self, semitones: f32) {
        self.tempo_pitch.processor_mut().set_semitones(semitones);
    }

    pub fn pitch_semitones(&self) -> f32 {
        self.tempo_pitch.processor().semitones()
    }

    pub fn pitch_strategy(&self) -> PitchStrategyKind {
        self.tempo_pitch.processor().strategy()
    }

    pub fn set_eq_band_gain(&mut self, band: usize, gain_db: f32) -> Result<()> {
        self.eq
            .processor_mut()
            .set_band_gain(band, gain_db)
            .map_err(|e| EngineError::Unsupported {
                what: e.to_string(),
            })
    }

    pub fn eq_band_gain(&self, band: usize) -> Result<f32> {
        self.eq
            .processor()
            .band_gain(band)
            .map_err(|e| EngineError::Unsupported {
                what: e.to_string(),
            })
    }

    pub fn apply_eq_preset(&mut self, preset: EqPreset) {
        self.eq.processor_mut().apply_preset(preset);
    }

    pub fn lofi_mut(&mut self) -> &mut LofiProcessor {
        self.lofi.processor_mut()
    }

    pub fn lofi(&self) -> &LofiProcessor {
        self.lofi.processor()
    }

    pub fn apply_reverb_preset(&mut self, preset: ReverbPreset) {
        let (_, _, mix) = preset.parameters();
        self.reverb.processor_mut().apply_preset(preset);
        self.reverb.set_mix(mix);
    }

    pub fn reverb_mut(&mut self) -> &mut ReverbProcessor {
        self.reverb.processor_mut()
    }

    pub fn reverb(&self) -> &ReverbProcessor {
        self.reverb.processor()
    }

    pub fn supports_convolution(&self) -> bool {
        self.reverb.processor().supports_convolution()
    }

    // --- tone control ----------------------------------------------------

    pub fn set_tone_cutoff(&mut self, cutoff_hz: f32) {
        self.tone_cutoff = cutoff_hz.clamp(40.0, 20_000.0);
        self.tone
            .set_lowpass(self.sample_rate as f32, self.tone_cutoff, self.tone_q);
    }

    pub fn set_tone_resonance(&mut self, q: f32) {
        self.tone_q = q.clamp(0.1, 10.0);
        self.tone
            .set_lowpass(self.sample_rate as f32, self.tone_cutoff, self.tone_q);
    }

    // --- analyser ----------------------------------------------------------

    pub fn analyser(&self) -> &AnalyserTap {
        &self.analyser
    }

    /// Clear DSP tails (delay lines, filter state) without touching
    /// user parameters. Called on stop and track swaps.
    pub fn reset_tails(&mut self) {
        self.tempo_pitch.reset();
        self.lofi.reset();
        self.eq.reset();
        self.reverb.reset();
        self.tone.reset();
    }
}
