//! Dry/wet effect stage
//!
//! Every effect module sits inside an `EffectStage`, which blends the
//! unprocessed input with the processor's output through a pair of
//! gain ramps. Bypass and mix changes retarget the ramps rather than
//! switching buffers, so toggling an effect never clicks.

use serde::{Deserialize, Serialize};

use crate::ramp::{ParamRamp, DEFAULT_RAMP_MS};

/// Largest block an `EffectStage` can process in one call, in frames.
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// A processor that renders the wet path of an effect stage.
///
/// `input` and `output` are interleaved stereo and always the same
/// length. Implementations must not allocate per call.
pub trait WetProcessor: Send {
    /// Render the effect into `output`.
    fn process(&mut self, input: &[f32], output: &mut [f32], sample_rate: u32);

    /// Clear internal state (delay lines, filter memory).
    fn reset(&mut self);
}

/// Snapshot of a stage's user-facing state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleState {
    /// True when the stage passes dry signal only.
    pub bypass: bool,
    /// Wet fraction in `[0.0, 1.0]`, preserved across bypass toggles.
    pub mix: f32,
}

/// Hosts a [`WetProcessor`] behind a ramped dry/wet crossfade.
pub struct EffectStage<P: WetProcessor> {
    processor: P,
    dry: ParamRamp,
    wet: ParamRamp,
    mix: f32,
    bypass: bool,
    sample_rate: u32,
    wet_buf: Vec<f32>,
}

impl<P: WetProcessor> EffectStage<P> {
    pub fn new(processor: P, mix: f32, bypass: bool, sample_rate: u32) -> Self {
        let mix = mix.clamp(0.0, 1.0);
        let (dry0, wet0) = if bypass { (1.0, 0.0) } else { (1.0 - mix, mix) };
        Self {
            processor,
            dry: ParamRamp::new(dry0),
            wet: ParamRamp::new(wet0),
            mix,
            bypass,
            sample_rate,
            wet_buf: vec![0.0; MAX_BLOCK_FRAMES * 2],
        }
    }

    /// Process one interleaved stereo block in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        // When fully dry and settled there is nothing to render. The
        // processor still resets on transport changes, not here.
        if self.bypass && self.wet.is_settled() && self.wet.value() == 0.0 {
            return;
        }

        for block in 0..buffer.len().div_ceil(MAX_BLOCK_FRAMES * 2) {
            let start = block * MAX_BLOCK_FRAMES * 2;
            let end = (start + MAX_BLOCK_FRAMES * 2).min(buffer.len());
            let chunk = &mut buffer[start..end];

            let wet = &mut self.wet_buf[..chunk.len()];
            self.processor.process(chunk, wet, self.sample_rate);

            for (frame, wet_frame) in chunk.chunks_exact_mut(2).zip(wet.chunks_exact(2)) {
                let dry_gain = self.dry.next();
                let wet_gain = self.wet.next();
                frame[0] = frame[0] * dry_gain + wet_frame[0] * wet_gain;
                frame[1] = frame[1] * dry_gain + wet_frame[1] * wet_gain;
            }
        }
    }

    /// Toggle bypass. The stored mix survives, so un-bypassing
    /// restores the previous blend.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
        let (dry, wet) = if bypass {
            (1.0, 0.0)
        } else {
            (1.0 - self.mix, self.mix)
        };
        self.dry.set_target_ms(dry, DEFAULT_RAMP_MS, self.sample_rate);
        self.wet.set_target_ms(wet, DEFAULT_RAMP_MS, self.sample_rate);
    }

    /// Set the wet fraction. Always stored; only audible when the
    /// stage is not bypassed.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
        if !self.bypass {
            self.dry
                .set_target_ms(1.0 - self.mix, DEFAULT_RAMP_MS, self.sample_rate);
            self.wet.set_target_ms(self.mix, DEFAULT_RAMP_MS, self.sample_rate);
        }
    }

    /// Reset the wet processor and settle the gain ramps.
    pub fn reset(&mut self) {
        self.processor.reset();
        let (dry, wet) = if self.bypass {
            (1.0, 0.0)
        } else {
            (1.0 - self.mix, self.mix)
        };
        self.dry.snap(dry);
        self.wet.snap(wet);
    }

    pub fn state(&self) -> ModuleState {
        ModuleState {
            bypass: self.bypass,
            mix: self.mix,
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }
}
