//! Signal analysis helpers for tests

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::PI;

/// RMS level of an interleaved (or mono) buffer.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute value of a buffer.
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
}

/// Downmix interleaved stereo to mono by averaging channels.
pub fn extract_mono(interleaved: &[f32]) -> Vec<f32> {
    interleaved
        .chunks_exact(2)
        .map(|frame| (frame[0] + frame[1]) * 0.5)
        .collect()
}

/// Find the dominant frequency of a mono signal via FFT.
///
/// Uses a Hann window over the largest power-of-two prefix of the
/// signal. Resolution is `sample_rate / fft_size` Hz, so callers
/// should pass enough samples for the tolerance they assert.
pub fn find_dominant_frequency(mono: &[f32], sample_rate: u32) -> f32 {
    let fft_size = mono.len().next_power_of_two() >> 1;
    if fft_size < 64 {
        return 0.0;
    }

    let mut buffer: Vec<Complex<f32>> = mono[..fft_size]
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let window = 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos());
            Complex::new(s * window, 0.0)
        })
        .collect();

    let fft = FftPlanner::new().plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    let mut max_bin = 0;
    let mut max_mag = 0.0_f32;
    for (i, c) in buffer.iter().enumerate().take(fft_size / 2).skip(1) {
        let mag = c.norm();
        if mag > max_mag {
            max_mag = mag;
            max_bin = i;
        }
    }

    max_bin as f32 * sample_rate as f32 / fft_size as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::signals::generate_sine_wave;

    #[test]
    fn rms_of_full_scale_sine_is_inv_sqrt2() {
        let sine = generate_sine_wave(440.0, 44100, 0.5, 1.0);
        let rms = calculate_rms(&sine);
        assert!((rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn dominant_frequency_matches_generator() {
        let sine = generate_sine_wave(440.0, 44100, 0.5, 0.5);
        let mono = extract_mono(&sine);
        let dominant = find_dominant_frequency(&mono, 44100);
        assert!((dominant - 440.0).abs() < 10.0, "got {dominant}");
    }
}
