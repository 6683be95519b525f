//! Lo-fi emulation
//!
//! Models a worn playback medium with three ingredients:
//! - a low-pass filter for the dull, bandwidth-limited tone
//! - a slow "wow" LFO that wobbles the filter cutoff
//! - a loopable noise bed mixed in at a low level
//!
//! Crackle (impulsive pops) is part of the parameter surface but not
//! rendered; [`LofiProcessor::supports_crackle`] reports false so
//! callers can grey out the control.

use rand::Rng;
use std::f32::consts::TAU;

use crate::biquad::Biquad;

use super::stage::WetProcessor;

const MIN_CUTOFF_HZ: f32 = 200.0;
const MAX_CUTOFF_HZ: f32 = 20_000.0;
const MIN_WOW_RATE_HZ: f32 = 0.05;
const MAX_WOW_RATE_HZ: f32 = 8.0;

/// How often the wobbled cutoff is recomputed, in frames. The filter's
/// own coefficient smoothing interpolates between updates.
const CONTROL_INTERVAL_FRAMES: u32 = 64;

/// Noise bed length in seconds before it loops.
const NOISE_SECONDS: u32 = 2;

/// Scales the user-facing noise level to an unobtrusive mix gain.
const NOISE_GAIN: f32 = 0.02;

pub struct LofiProcessor {
    filter: Biquad,
    base_cutoff: f32,
    wow_rate: f32,
    wow_depth: f32,
    wow_phase: f32,
    noise_level: f32,
    noise: Vec<f32>,
    noise_pos: usize,
    crackle_level: f32,
    frames_until_update: u32,
    sample_rate: u32,
}

impl LofiProcessor {
    pub fn new(sample_rate: u32) -> Self {
        let mut rng = rand::thread_rng();
        let noise = (0..sample_rate * NOISE_SECONDS)
            .map(|_| rng.gen_range(-1.0_f32..=1.0))
            .collect();

        let mut filter = Biquad::new();
        filter.set_lowpass(sample_rate as f32, MAX_CUTOFF_HZ, 0.707);
        filter.reset();

        Self {
            filter,
            base_cutoff: MAX_CUTOFF_HZ,
            wow_rate: 0.3,
            wow_depth: 0.0,
            wow_phase: 0.0,
            noise_level: 0.0,
            noise,
            noise_pos: 0,
            crackle_level: 0.0,
            frames_until_update: 0,
            sample_rate,
        }
    }

    /// Low-pass cutoff before wow modulation, clamped to 200 Hz - 20 kHz.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.base_cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        self.frames_until_update = 0;
    }

    pub fn cutoff(&self) -> f32 {
        self.base_cutoff
    }

    /// Wow LFO rate in Hz, clamped to 0.05 - 8 Hz.
    pub fn set_wow_rate(&mut self, rate_hz: f32) {
        self.wow_rate = rate_hz.clamp(MIN_WOW_RATE_HZ, MAX_WOW_RATE_HZ);
    }

    pub fn wow_rate(&self) -> f32 {
        self.wow_rate
    }

    /// Peak cutoff deviation in Hz caused by the wow LFO.
    pub fn set_wow_depth(&mut self, depth_hz: f32) {
        self.wow_depth = depth_hz.max(0.0);
    }

    pub fn wow_depth(&self) -> f32 {
        self.wow_depth
    }

    /// Noise bed level in `[0.0, 1.0]`.
    pub fn set_noise_level(&mut self, level: f32) {
        self.noise_level = level.clamp(0.0, 1.0);
    }

    pub fn noise_level(&self) -> f32 {
        self.noise_level
    }

    /// Stored but not rendered; see [`Self::supports_crackle`].
    pub fn set_crackle_level(&mut self, level: f32) {
        self.crackle_level = level.clamp(0.0, 1.0);
    }

    pub fn crackle_level(&self) -> f32 {
        self.crackle_level
    }

    pub fn supports_crackle(&self) -> bool {
        false
    }

    fn update_cutoff(&mut self) {
        let wobble = self.wow_depth * (TAU * self.wow_phase).sin();
        let cutoff = (self.base_cutoff + wobble).clamp(40.0, MAX_CUTOFF_HZ);
        self.filter
            .set_lowpass(self.sample_rate as f32, cutoff, 0.707);
    }
}

impl WetProcessor for LofiProcessor {
    fn process(&mut self, input: &[f32], output: &mut [f32], sample_rate: u32) {
        let phase_step = self.wow_rate / sample_rate as f32;

        for (out_frame, in_frame) in output.chunks_exact_mut(2).zip(input.chunks_exact(2)) {
            if self.frames_until_update == 0 {
                self.update_cutoff();
                self.frames_until_update = CONTROL_INTERVAL_FRAMES;
            }
            self.frames_until_update -= 1;

            self.wow_phase = (self.wow_phase + phase_step).fract();

            let (l, r) = self.filter.process_frame(in_frame[0], in_frame[1]);

            let noise = self.noise[self.noise_pos] * self.noise_level * NOISE_GAIN;
            self.noise_pos = (self.noise_pos + 1) % self.noise.len();

            out_frame[0] = l + noise;
            out_frame[1] = r + noise;
        }
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.wow_phase = 0.0;
        self.noise_pos = 0;
        self.frames_until_update = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::analysis::calculate_rms;
    use crate::test_utils::signals::{generate_silence, generate_sine_wave};

    fn run(lofi: &mut LofiProcessor, signal: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; signal.len()];
        lofi.process(signal, &mut out, 44100);
        out
    }

    #[test]
    fn defaults_are_nearly_transparent() {
        let mut lofi = LofiProcessor::new(44100);
        let signal = generate_sine_wave(440.0, 44100, 0.2, 0.5);
        let out = run(&mut lofi, &signal);

        let ratio = calculate_rms(&out) / calculate_rms(&signal);
        assert!((ratio - 1.0).abs() < 0.05);
    }

    #[test]
    fn low_cutoff_darkens_high_tone() {
        let mut lofi = LofiProcessor::new(44100);
        lofi.set_cutoff(500.0);
        lofi.reset();

        let tone = generate_sine_wave(8000.0, 44100, 0.5, 0.5);
        let out = run(&mut lofi, &tone);

        let tail = &out[out.len() / 4..];
        let in_tail = &tone[tone.len() / 4..];
        assert!(calculate_rms(tail) < calculate_rms(in_tail) * 0.1);
    }

    #[test]
    fn cutoff_clamps_to_range() {
        let mut lofi = LofiProcessor::new(44100);
        lofi.set_cutoff(10.0);
        assert_eq!(lofi.cutoff(), 200.0);
        lofi.set_cutoff(100_000.0);
        assert_eq!(lofi.cutoff(), 20_000.0);
    }

    #[test]
    fn noise_bed_fills_silence() {
        let mut lofi = LofiProcessor::new(44100);
        lofi.set_noise_level(1.0);

        let silence = generate_silence(44100, 0.2);
        let out = run(&mut lofi, &silence);

        assert!(calculate_rms(&out) > 0.0);
        // Noise bed stays well below program level
        assert!(out.iter().all(|s| s.abs() <= NOISE_GAIN + 1e-6));
    }

    #[test]
    fn wow_modulates_output_over_time() {
        let mut lofi = LofiProcessor::new(44100);
        lofi.set_cutoff(2000.0);
        lofi.set_wow_rate(2.0);
        lofi.set_wow_depth(1500.0);
        lofi.reset();

        // A tone near the cutoff rises and falls as the cutoff wobbles
        let tone = generate_sine_wave(3000.0, 44100, 2.0, 0.5);
        let out = run(&mut lofi, &tone);

        let window = 4410 * 2;
        let levels: Vec<f32> = out.chunks(window).map(calculate_rms).collect();
        let min = levels[2..].iter().cloned().fold(f32::MAX, f32::min);
        let max = levels[2..].iter().cloned().fold(0.0_f32, f32::max);
        assert!(max > min * 1.2, "min {min} max {max}");
    }

    #[test]
    fn crackle_is_stored_but_unsupported() {
        let mut lofi = LofiProcessor::new(44100);
        lofi.set_crackle_level(0.8);
        assert_eq!(lofi.crackle_level(), 0.8);
        assert!(!lofi.supports_crackle());
    }
}
