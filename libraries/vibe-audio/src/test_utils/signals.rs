//! Test signal generators
//!
//! All generators produce interleaved stereo `f32` with identical
//! content in both channels unless stated otherwise.

use rand::Rng;
use std::f32::consts::PI;

/// Generate a sine wave at `frequency` Hz.
///
/// Returns `duration_secs * sample_rate` frames of interleaved stereo.
pub fn generate_sine_wave(
    frequency: f32,
    sample_rate: u32,
    duration_secs: f32,
    amplitude: f32,
) -> Vec<f32> {
    let frames = (duration_secs * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let value = amplitude * (2.0 * PI * frequency * t).sin();
        samples.push(value);
        samples.push(value);
    }
    samples
}

/// Generate uniform white noise in `[-amplitude, amplitude]`.
///
/// Left and right channels are independent.
pub fn generate_white_noise(sample_rate: u32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let frames = (duration_secs * sample_rate as f32) as usize;
    let mut rng = rand::thread_rng();
    let mut samples = Vec::with_capacity(frames * 2);
    for _ in 0..frames {
        samples.push(rng.gen_range(-amplitude..=amplitude));
        samples.push(rng.gen_range(-amplitude..=amplitude));
    }
    samples
}

/// Generate a stereo signal with a different sine in each channel.
///
/// Useful for verifying that a processor keeps channels independent.
pub fn generate_dual_tone(
    left_frequency: f32,
    right_frequency: f32,
    sample_rate: u32,
    duration_secs: f32,
    amplitude: f32,
) -> Vec<f32> {
    let frames = (duration_secs * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        samples.push(amplitude * (2.0 * PI * left_frequency * t).sin());
        samples.push(amplitude * (2.0 * PI * right_frequency * t).sin());
    }
    samples
}

/// Generate interleaved stereo silence.
pub fn generate_silence(sample_rate: u32, duration_secs: f32) -> Vec<f32> {
    let frames = (duration_secs * sample_rate as f32) as usize;
    vec![0.0; frames * 2]
}
