//! Reverb send
//!
//! A lightweight ambience: a pre-delayed, damped feedback network is
//! more than this engine needs, so the wet path is a pre-delay line
//! into a damping low-pass with a short feedback tap. Convolution
//! against room impulse responses is part of the parameter surface
//! but not rendered; [`ReverbProcessor::supports_convolution`]
//! reports false.

use serde::{Deserialize, Serialize};

use crate::biquad::Biquad;

use super::stage::WetProcessor;

const MAX_PREDELAY_MS: f32 = 100.0;
const MIN_DAMPING_HZ: f32 = 100.0;
const MAX_DAMPING_HZ: f32 = 20_000.0;
const FEEDBACK: f32 = 0.35;

/// Named room sizes. The preset picks pre-delay, damping and the
/// stage mix together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReverbPreset {
    Small,
    Medium,
    Large,
}

impl ReverbPreset {
    /// (pre-delay ms, damping cutoff Hz, suggested wet mix)
    pub fn parameters(&self) -> (f32, f32, f32) {
        match self {
            ReverbPreset::Small => (10.0, 10_000.0, 0.2),
            ReverbPreset::Medium => (20.0, 8_000.0, 0.3),
            ReverbPreset::Large => (40.0, 5_000.0, 0.4),
        }
    }
}

pub struct ReverbProcessor {
    delay_l: Vec<f32>,
    delay_r: Vec<f32>,
    write_pos: usize,
    predelay_frames: usize,
    damping: Biquad,
    damping_hz: f32,
    sample_rate: u32,
}

impl ReverbProcessor {
    pub fn new(sample_rate: u32) -> Self {
        let capacity = ((MAX_PREDELAY_MS / 1000.0) * sample_rate as f32) as usize + 1;
        let mut reverb = Self {
            delay_l: vec![0.0; capacity],
            delay_r: vec![0.0; capacity],
            write_pos: 0,
            predelay_frames: 0,
            damping: Biquad::new(),
            damping_hz: 0.0,
            sample_rate,
        };
        reverb.apply_preset(ReverbPreset::Medium);
        reverb.damping.reset();
        reverb
    }

    /// Configure pre-delay and damping from a preset. The suggested
    /// mix is the caller's to apply to the hosting stage.
    pub fn apply_preset(&mut self, preset: ReverbPreset) {
        let (predelay_ms, damping_hz, _mix) = preset.parameters();
        self.set_predelay_ms(predelay_ms);
        self.set_damping(damping_hz);
    }

    /// Pre-delay in milliseconds, clamped to 0 - 100 ms.
    pub fn set_predelay_ms(&mut self, predelay_ms: f32) {
        self.predelay_frames = ((predelay_ms.clamp(0.0, MAX_PREDELAY_MS) / 1000.0)
            * self.sample_rate as f32) as usize;
    }

    pub fn predelay_ms(&self) -> f32 {
        self.predelay_frames as f32 * 1000.0 / self.sample_rate as f32
    }

    /// Damping low-pass cutoff in Hz, clamped to 100 Hz - 20 kHz.
    pub fn set_damping(&mut self, cutoff_hz: f32) {
        self.damping_hz = cutoff_hz.clamp(MIN_DAMPING_HZ, MAX_DAMPING_HZ);
        self.damping
            .set_lowpass(self.sample_rate as f32, self.damping_hz, 0.707);
    }

    pub fn damping(&self) -> f32 {
        self.damping_hz
    }

    pub fn supports_convolution(&self) -> bool {
        false
    }
}

impl WetProcessor for ReverbProcessor {
    fn process(&mut self, input: &[f32], output: &mut [f32], _sample_rate: u32) {
        let len = self.delay_l.len();
        for (out_frame, in_frame) in output.chunks_exact_mut(2).zip(input.chunks_exact(2)) {
            let read_pos = (self.write_pos + len - self.predelay_frames) % len;

            let delayed_l = self.delay_l[read_pos];
            let delayed_r = self.delay_r[read_pos];
            let (wet_l, wet_r) = self.damping.process_frame(delayed_l, delayed_r);

            self.delay_l[self.write_pos] = in_frame[0] + wet_l * FEEDBACK;
            self.delay_r[self.write_pos] = in_frame[1] + wet_r * FEEDBACK;
            self.write_pos = (self.write_pos + 1) % len;

            out_frame[0] = wet_l;
            out_frame[1] = wet_r;
        }
    }

    fn reset(&mut self) {
        self.delay_l.fill(0.0);
        self.delay_r.fill(0.0);
        self.write_pos = 0;
        self.damping.reset();
    }
}
