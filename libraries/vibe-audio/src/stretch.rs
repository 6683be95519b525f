//! Time-stretch / pitch-shift wrapper
//!
//! Thin adapter over the Signalsmith stretch engine. Callers feed
//! interleaved stereo input and receive interleaved stereo output;
//! the ratio of input to output frame counts sets the tempo, while
//! pitch is controlled independently in semitones.

use signalsmith_stretch::Stretch;

const CHANNELS: u32 = 2;
const MIN_RATIO: f32 = 0.25;
const MAX_RATIO: f32 = 4.0;

pub struct TimeStretcher {
    inner: Stretch,
    ratio: f32,
}

impl TimeStretcher {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Stretch::preset_default(CHANNELS, sample_rate),
            ratio: 1.0,
        }
    }

    /// Playback-speed ratio, clamped to 0.25x - 4.0x. The caller
    /// realizes the ratio by sizing input vs output blocks.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Pitch shift in semitones, independent of tempo.
    pub fn set_semitones(&mut self, semitones: f32) {
        self.inner.set_transpose_factor_semitones(semitones, None);
    }

    /// Process interleaved stereo `input` into interleaved stereo
    /// `output`. Input and output lengths may differ; the engine
    /// stretches to fill the output exactly.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.inner.process(input, output);
    }

    /// Drain remaining buffered audio into `output`.
    pub fn flush(&mut self, output: &mut [f32]) {
        self.inner.flush(output);
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Frames of input the engine buffers before output is valid.
    pub fn input_latency(&self) -> usize {
        self.inner.input_latency()
    }

    pub fn output_latency(&self) -> usize {
        self.inner.output_latency()
    }
}
