//! Biquad filter shared by the EQ, lo-fi, reverb and pitch modules
//!
//! Implements coefficient smoothing to prevent audio artifacts (clicks,
//! pops, zipper noise) when parameters change at runtime. Coefficients
//! move exponentially toward their targets, which handles continuous
//! parameter changes (like dragging a slider) without restarting a
//! smoothing window.

use std::f32::consts::PI;

/// Smoothing coefficient for exponential coefficient interpolation.
/// 0.002 at 44.1kHz gives roughly a 3ms time constant.
const SMOOTH_COEFF: f32 = 0.002;

/// Stereo biquad filter with smoothed coefficient updates.
#[derive(Debug, Clone)]
pub struct Biquad {
    // Target coefficients (set by the set_* methods)
    target_b0: f32,
    target_b1: f32,
    target_b2: f32,
    target_a1: f32,
    target_a2: f32,

    // Active coefficients (used for processing, smoothed toward target)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // State variables (per channel)
    x1_l: f32,
    x2_l: f32,
    y1_l: f32,
    y2_l: f32,

    x1_r: f32,
    x2_r: f32,
    y1_r: f32,
    y2_r: f32,
}

impl Biquad {
    /// Create a filter with neutral (pass-through) coefficients.
    pub fn new() -> Self {
        Self {
            target_b0: 1.0,
            target_b1: 0.0,
            target_b2: 0.0,
            target_a1: 0.0,
            target_a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1_l: 0.0,
            x2_l: 0.0,
            y1_l: 0.0,
            y2_l: 0.0,
            x1_r: 0.0,
            x2_r: 0.0,
            y1_r: 0.0,
            y2_r: 0.0,
        }
    }

    #[inline]
    fn smooth_coefficients(&mut self) {
        self.b0 += SMOOTH_COEFF * (self.target_b0 - self.b0);
        self.b1 += SMOOTH_COEFF * (self.target_b1 - self.b1);
        self.b2 += SMOOTH_COEFF * (self.target_b2 - self.b2);
        self.a1 += SMOOTH_COEFF * (self.target_a1 - self.a1);
        self.a2 += SMOOTH_COEFF * (self.target_a2 - self.a2);
    }

    fn set_target_coefficients(&mut self, b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) {
        self.target_b0 = b0;
        self.target_b1 = b1;
        self.target_b2 = b2;
        self.target_a1 = a1;
        self.target_a2 = a2;
    }

    /// Clamp frequency away from Nyquist; near-Nyquist poles go unstable.
    fn clamp_frequency(sample_rate: f32, frequency: f32) -> f32 {
        frequency.clamp(1.0, sample_rate * 0.45)
    }

    /// Configure as a low-pass filter.
    pub fn set_lowpass(&mut self, sample_rate: f32, frequency: f32, q: f32) {
        if sample_rate < 1.0 {
            return;
        }
        let omega = 2.0 * PI * Self::clamp_frequency(sample_rate, frequency) / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        self.set_target_coefficients(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);
    }

    /// Configure as a peaking EQ filter.
    pub fn set_peaking(&mut self, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) {
        if sample_rate < 1.0 {
            return;
        }
        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = 2.0 * PI * Self::clamp_frequency(sample_rate, frequency) / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_omega;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha / a;

        self.set_target_coefficients(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);
    }

    /// Configure as a low shelf filter.
    pub fn set_low_shelf(&mut self, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) {
        if sample_rate < 1.0 {
            return;
        }
        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = 2.0 * PI * Self::clamp_frequency(sample_rate, frequency) / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) - (a - 1.0) * cos_omega + beta);
        let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega);
        let b2 = a * ((a + 1.0) - (a - 1.0) * cos_omega - beta);
        let a0 = (a + 1.0) + (a - 1.0) * cos_omega + beta;
        let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega);
        let a2 = (a + 1.0) + (a - 1.0) * cos_omega - beta;

        self.set_target_coefficients(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);
    }

    /// Configure as a high shelf filter.
    pub fn set_high_shelf(&mut self, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) {
        if sample_rate < 1.0 {
            return;
        }
        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = 2.0 * PI * Self::clamp_frequency(sample_rate, frequency) / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_omega + beta);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_omega - beta);
        let a0 = (a + 1.0) - (a - 1.0) * cos_omega + beta;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega);
        let a2 = (a + 1.0) - (a - 1.0) * cos_omega - beta;

        self.set_target_coefficients(b0 / a0, b1 / a0, b2 / a0, a1 / a0, a2 / a0);
    }

    /// Process one stereo frame.
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.smooth_coefficients();

        let mut out_l = self.b0 * left + self.b1 * self.x1_l + self.b2 * self.x2_l
            - self.a1 * self.y1_l
            - self.a2 * self.y2_l;
        // Flush denormals; they stall the FPU
        if out_l.abs() < 1e-15 {
            out_l = 0.0;
        }
        self.x2_l = self.x1_l;
        self.x1_l = left;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let mut out_r = self.b0 * right + self.b1 * self.x1_r + self.b2 * self.x2_r
            - self.a1 * self.y1_r
            - self.a2 * self.y2_r;
        if out_r.abs() < 1e-15 {
            out_r = 0.0;
        }
        self.x2_r = self.x1_r;
        self.x1_r = right;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l, out_r)
    }

    /// Reset filter state and snap active coefficients to target.
    pub fn reset(&mut self) {
        self.x1_l = 0.0;
        self.x2_l = 0.0;
        self.y1_l = 0.0;
        self.y2_l = 0.0;
        self.x1_r = 0.0;
        self.x2_r = 0.0;
        self.y1_r = 0.0;
        self.y2_r = 0.0;
        self.b0 = self.target_b0;
        self.b1 = self.target_b1;
        self.b2 = self.target_b2;
        self.a1 = self.target_a1;
        self.a2 = self.target_a2;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::analysis::calculate_rms;
    use crate::test_utils::signals::generate_sine_wave;

    fn run(filter: &mut Biquad, signal: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(signal.len());
        for frame in signal.chunks_exact(2) {
            let (l, r) = filter.process_frame(frame[0], frame[1]);
            out.push(l);
            out.push(r);
        }
        out
    }

    #[test]
    fn neutral_filter_is_transparent() {
        let mut filter = Biquad::new();
        let signal = generate_sine_wave(440.0, 44100, 0.2, 0.5);
        let out = run(&mut filter, &signal);

        for (a, b) in signal.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let mut filter = Biquad::new();
        filter.set_lowpass(44100.0, 1000.0, 0.707);
        filter.reset();

        let high = generate_sine_wave(10000.0, 44100, 0.5, 0.5);
        let out = run(&mut filter, &high);

        // Skip the first 10% to let the filter settle
        let tail = &out[out.len() / 10..];
        let in_tail = &high[high.len() / 10..];
        assert!(calculate_rms(tail) < calculate_rms(in_tail) * 0.1);
    }

    #[test]
    fn lowpass_passes_low_frequencies() {
        let mut filter = Biquad::new();
        filter.set_lowpass(44100.0, 10000.0, 0.707);
        filter.reset();

        let low = generate_sine_wave(200.0, 44100, 0.5, 0.5);
        let out = run(&mut filter, &low);

        let tail = &out[out.len() / 10..];
        let in_tail = &low[low.len() / 10..];
        let ratio = calculate_rms(tail) / calculate_rms(in_tail);
        assert!((ratio - 1.0).abs() < 0.05);
    }

    #[test]
    fn peaking_boost_raises_level_at_center() {
        let mut filter = Biquad::new();
        filter.set_peaking(44100.0, 1000.0, 1.0, 12.0);
        filter.reset();

        let tone = generate_sine_wave(1000.0, 44100, 0.5, 0.25);
        let out = run(&mut filter, &tone);

        let tail = &out[out.len() / 10..];
        let in_tail = &tone[tone.len() / 10..];
        // +12 dB is a 4x amplitude boost
        let ratio = calculate_rms(tail) / calculate_rms(in_tail);
        assert!(ratio > 3.5 && ratio < 4.5, "boost ratio was {ratio}");
    }

    #[test]
    fn output_stays_finite_with_extreme_settings() {
        let mut filter = Biquad::new();
        filter.set_high_shelf(44100.0, 19000.0, 0.707, 24.0);

        let noise = crate::test_utils::signals::generate_white_noise(44100, 0.1, 1.0);
        let out = run(&mut filter, &noise);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
