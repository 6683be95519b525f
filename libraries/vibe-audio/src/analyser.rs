//! Analyser tap
//!
//! A non-destructive observation point at the end of the processing
//! graph. The engine feeds it every rendered block; readers pull a
//! magnitude spectrum or level measurements on demand. Feeding never
//! modifies the audio.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Default analysis window, matching common visualizer sizes.
pub const DEFAULT_FFT_SIZE: usize = 2048;

pub struct AnalyserTap {
    ring: Vec<f32>,
    write_pos: usize,
    filled: bool,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
}

impl AnalyserTap {
    pub fn new() -> Self {
        Self::with_fft_size(DEFAULT_FFT_SIZE)
    }

    /// `fft_size` is rounded up to a power of two.
    pub fn with_fft_size(fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        Self {
            ring: vec![0.0; fft_size],
            write_pos: 0,
            filled: false,
            fft: FftPlanner::new().plan_fft_forward(fft_size),
            fft_size,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Record an interleaved stereo block, downmixed to mono.
    pub fn feed(&mut self, interleaved: &[f32]) {
        for frame in interleaved.chunks_exact(2) {
            self.ring[self.write_pos] = (frame[0] + frame[1]) * 0.5;
            self.write_pos += 1;
            if self.write_pos == self.fft_size {
                self.write_pos = 0;
                self.filled = true;
            }
        }
    }

    /// Magnitude spectrum of the most recent window: `fft_size / 2`
    /// bins, normalized by window length.
    pub fn spectrum(&self) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = (0..self.fft_size)
            .map(|i| {
                let sample = self.ring[(self.write_pos + i) % self.fft_size];
                let window = 0.5 * (1.0 - (2.0 * PI * i as f32 / self.fft_size as f32).cos());
                Complex::new(sample * window, 0.0)
            })
            .collect();

        self.fft.process(&mut buffer);

        buffer
            .iter()
            .take(self.fft_size / 2)
            .map(|c| c.norm() / self.fft_size as f32)
            .collect()
    }

    /// (RMS, peak) of the most recent window.
    pub fn level(&self) -> (f32, f32) {
        let count = if self.filled {
            self.fft_size
        } else {
            self.write_pos
        };
        if count == 0 {
            return (0.0, 0.0);
        }
        let mut sum_sq = 0.0;
        let mut peak = 0.0_f32;
        for &s in &self.ring[..count] {
            sum_sq += s * s;
            peak = peak.max(s.abs());
        }
        ((sum_sq / count as f32).sqrt(), peak)
    }

    /// Center frequency of spectrum bin `index` at `sample_rate`.
    pub fn bin_frequency(&self, index: usize, sample_rate: u32) -> f32 {
        index as f32 * sample_rate as f32 / self.fft_size as f32
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write_pos = 0;
        self.filled = false;
    }
}

impl Default for AnalyserTap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::signals::generate_sine_wave;

    #[test]
    fn feed_does_not_touch_audio() {
        let signal = generate_sine_wave(440.0, 44100, 0.1, 0.5);
        let copy = signal.clone();
        let mut tap = AnalyserTap::new();
        tap.feed(&signal);
        assert_eq!(signal, copy);
    }

    #[test]
    fn spectrum_peaks_at_input_frequency() {
        let mut tap = AnalyserTap::with_fft_size(4096);
        let signal = generate_sine_wave(1000.0, 44100, 0.5, 0.5);
        tap.feed(&signal);

        let spectrum = tap.spectrum();
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        let peak_freq = tap.bin_frequency(peak_bin, 44100);
        assert!((peak_freq - 1000.0).abs() < 22.0, "got {peak_freq}");
    }

    #[test]
    fn level_tracks_amplitude() {
        let mut tap = AnalyserTap::new();
        let signal = generate_sine_wave(440.0, 44100, 0.2, 0.5);
        tap.feed(&signal);

        let (rms, peak) = tap.level();
        assert!((rms - 0.5 * std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02);
        assert!((peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn empty_tap_reports_silence() {
        let tap = AnalyserTap::new();
        assert_eq!(tap.level(), (0.0, 0.0));
    }

    #[test]
    fn fft_size_rounds_to_power_of_two() {
        let tap = AnalyserTap::with_fft_size(1000);
        assert_eq!(tap.fft_size(), 1024);
    }
}
