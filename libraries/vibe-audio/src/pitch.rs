//! Pitch-shift strategies
//!
//! Pitch shifting (without tempo change) is provided by one of three
//! strategies, tried in preference order at construction time:
//!
//! 1. `Stretch` - the Signalsmith engine (best quality, behind the
//!    `stretch` cargo feature)
//! 2. `Granular` - a dual-tap modulated delay with equal-power
//!    crossfading windows (always available, audible artifacts grow
//!    with the shift amount)
//! 3. `Passthrough` - no shifting; pitch controls become no-ops
//!
//! The selected strategy is fixed for the life of the shifter and
//! reported via [`PitchShifter::kind`] so callers can expose a
//! capability flag.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::biquad::Biquad;

/// Identifies which pitch-shift implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PitchStrategyKind {
    Stretch,
    Granular,
    Passthrough,
}

/// Default preference order.
pub const DEFAULT_STRATEGY_ORDER: &[PitchStrategyKind] = &[
    PitchStrategyKind::Stretch,
    PitchStrategyKind::Granular,
    PitchStrategyKind::Passthrough,
];

/// In-place pitch shifter. Frame count is preserved; only pitch moves.
pub trait PitchShifter: Send {
    /// Shift amount in semitones, clamped to ±12.
    fn set_semitones(&mut self, semitones: f32);

    fn semitones(&self) -> f32;

    /// Process one interleaved stereo block in place.
    fn process(&mut self, buffer: &mut [f32]);

    fn reset(&mut self);

    fn kind(&self) -> PitchStrategyKind;
}

/// Build the first available strategy from `order`.
///
/// Falls back to passthrough when the list is exhausted (or empty).
pub fn build_shifter(order: &[PitchStrategyKind], sample_rate: u32) -> Box<dyn PitchShifter> {
    for kind in order {
        match kind {
            #[cfg(feature = "stretch")]
            PitchStrategyKind::Stretch => {
                tracing::debug!("pitch strategy: stretch");
                return Box::new(StretchShifter::new(sample_rate));
            }
            #[cfg(not(feature = "stretch"))]
            PitchStrategyKind::Stretch => {}
            PitchStrategyKind::Granular => {
                tracing::debug!("pitch strategy: granular");
                return Box::new(GranularShifter::new(sample_rate));
            }
            PitchStrategyKind::Passthrough => break,
        }
    }
    tracing::debug!("pitch strategy: passthrough");
    Box::new(PassthroughShifter::default())
}

const MAX_SEMITONES: f32 = 12.0;

fn clamp_semitones(semitones: f32) -> f32 {
    semitones.clamp(-MAX_SEMITONES, MAX_SEMITONES)
}

// ---------------------------------------------------------------------------
// Stretch strategy

/// Scratch size covering the largest block the engine renders.
#[cfg(feature = "stretch")]
const STRETCH_SCRATCH_SAMPLES: usize = 8192 * 2;

#[cfg(feature = "stretch")]
struct StretchShifter {
    stretcher: crate::stretch::TimeStretcher,
    semitones: f32,
    scratch: Vec<f32>,
}

#[cfg(feature = "stretch")]
impl StretchShifter {
    fn new(sample_rate: u32) -> Self {
        Self {
            stretcher: crate::stretch::TimeStretcher::new(sample_rate),
            semitones: 0.0,
            scratch: vec![0.0; STRETCH_SCRATCH_SAMPLES],
        }
    }
}

#[cfg(feature = "stretch")]
impl PitchShifter for StretchShifter {
    fn set_semitones(&mut self, semitones: f32) {
        self.semitones = clamp_semitones(semitones);
        self.stretcher.set_semitones(self.semitones);
    }

    fn semitones(&self) -> f32 {
        self.semitones
    }

    fn process(&mut self, buffer: &mut [f32]) {
        // Exact bypass at zero shift keeps the path transparent
        if self.semitones == 0.0 {
            return;
        }
        let len = buffer.len().min(self.scratch.len());
        let out = &mut self.scratch[..len];
        self.stretcher.process(&buffer[..len], out);
        buffer[..len].copy_from_slice(out);
    }

    fn reset(&mut self) {
        self.stretcher.reset();
    }

    fn kind(&self) -> PitchStrategyKind {
        PitchStrategyKind::Stretch
    }
}

// ---------------------------------------------------------------------------
// Granular strategy

/// Ring buffer length in seconds.
const GRAIN_RING_SECONDS: u32 = 1;

struct GranularShifter {
    semitones: f32,
    ratio: f32,
    window_frames: f32,
    phase: f32,
    ring_l: Vec<f32>,
    ring_r: Vec<f32>,
    write_pos: usize,
    post_lpf_a: Biquad,
    post_lpf_b: Biquad,
    sample_rate: u32,
}

impl GranularShifter {
    fn new(sample_rate: u32) -> Self {
        let capacity = (sample_rate * GRAIN_RING_SECONDS) as usize;
        let mut shifter = Self {
            semitones: 0.0,
            ratio: 1.0,
            window_frames: 0.12 * sample_rate as f32,
            phase: 0.0,
            ring_l: vec![0.0; capacity],
            ring_r: vec![0.0; capacity],
            write_pos: 0,
            post_lpf_a: Biquad::new(),
            post_lpf_b: Biquad::new(),
            sample_rate,
        };
        shifter.configure(0.0);
        shifter
    }

    fn configure(&mut self, semitones: f32) {
        self.semitones = semitones;
        self.ratio = 2.0_f32.powf(semitones / 12.0);

        // Larger shifts need longer grains to avoid gargling, at the
        // cost of more smearing
        let window_secs = (0.12 + 0.012 * semitones.abs()).min(0.30);
        self.window_frames = window_secs * self.sample_rate as f32;

        // The grain crossfade whistles near Nyquist; tighten the
        // smoothing filters as the shift grows
        let cutoff = (18_000.0 - 700.0 * semitones.abs()).max(8_000.0);
        let sr = self.sample_rate as f32;
        self.post_lpf_a.set_lowpass(sr, cutoff, 0.707);
        self.post_lpf_b.set_lowpass(sr, cutoff.min(20_000.0), 0.707);
    }

    #[inline]
    fn read_tap(ring: &[f32], write_pos: usize, delay: f32) -> f32 {
        let len = ring.len() as f32;
        let pos = (write_pos as f32 - delay).rem_euclid(len);
        let i0 = pos as usize;
        let i1 = (i0 + 1) % ring.len();
        let frac = pos - i0 as f32;
        ring[i0] * (1.0 - frac) + ring[i1] * frac
    }
}

impl PitchShifter for GranularShifter {
    fn set_semitones(&mut self, semitones: f32) {
        self.configure(clamp_semitones(semitones));
    }

    fn semitones(&self) -> f32 {
        self.semitones
    }

    fn process(&mut self, buffer: &mut [f32]) {
        if self.semitones == 0.0 {
            return;
        }

        let len = self.ring_l.len();
        // Delay grows for pitch-down (read rate < 1) and shrinks for
        // pitch-up (read rate > 1); one full sweep per window
        let phase_step = (1.0 - self.ratio) / self.window_frames;

        for frame in buffer.chunks_exact_mut(2) {
            self.ring_l[self.write_pos] = frame[0];
            self.ring_r[self.write_pos] = frame[1];

            self.phase = (self.phase + phase_step).rem_euclid(1.0);
            let p1 = self.phase;
            let p2 = (self.phase + 0.5).rem_euclid(1.0);

            let d1 = p1 * self.window_frames;
            let d2 = p2 * self.window_frames;

            // Equal-power crossfade between the two taps
            let g1 = (PI * p1).sin();
            let g2 = (PI * p2).sin();

            let l = Self::read_tap(&self.ring_l, self.write_pos, d1) * g1
                + Self::read_tap(&self.ring_l, self.write_pos, d2) * g2;
            let r = Self::read_tap(&self.ring_r, self.write_pos, d1) * g1
                + Self::read_tap(&self.ring_r, self.write_pos, d2) * g2;

            let (l, r) = self.post_lpf_a.process_frame(l, r);
            let (l, r) = self.post_lpf_b.process_frame(l, r);

            frame[0] = l;
            frame[1] = r;

            self.write_pos = (self.write_pos + 1) % len;
        }
    }

    fn reset(&mut self) {
        self.ring_l.fill(0.0);
        self.ring_r.fill(0.0);
        self.write_pos = 0;
        self.phase = 0.0;
        self.post_lpf_a.reset();
        self.post_lpf_b.reset();
    }

    fn kind(&self) -> PitchStrategyKind {
        PitchStrategyKind::Granular
    }
}

// ---------------------------------------------------------------------------
// Passthrough strategy

#[derive(Default)]
struct PassthroughShifter {
    semitones: f32,
}

impl PitchShifter for PassthroughShifter {
    fn set_semitones(&mut self, semitones: f32) {
        // Remembered so the UI round-trips, but never applied
        self.semitones = clamp_semitones(semitones);
    }

    fn semitones(&self) -> f32 {
        self.semitones
    }

    fn process(&mut self, _buffer: &mut [f32]) {}

    fn reset(&mut self) {}

    fn kind(&self) -> PitchStrategyKind {
        PitchStrategyKind::Passthrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::analysis::{calculate_rms, extract_mono, find_dominant_frequency};
    use crate::test_utils::signals::generate_sine_wave;

    #[test]
    fn builder_falls_back_to_passthrough() {
        let shifter = build_shifter(&[PitchStrategyKind::Passthrough], 44100);
        assert_eq!(shifter.kind(), PitchStrategyKind::Passthrough);

        let shifter = build_shifter(&[], 44100);
        assert_eq!(shifter.kind(), PitchStrategyKind::Passthrough);
    }

    #[test]
    fn builder_honors_granular_preference() {
        let shifter = build_shifter(
            &[PitchStrategyKind::Granular, PitchStrategyKind::Stretch],
            44100,
        );
        assert_eq!(shifter.kind(), PitchStrategyKind::Granular);
    }

    #[cfg(feature = "stretch")]
    #[test]
    fn builder_prefers_stretch_when_available() {
        let shifter = build_shifter(DEFAULT_STRATEGY_ORDER, 44100);
        assert_eq!(shifter.kind(), PitchStrategyKind::Stretch);
    }

    #[test]
    fn zero_semitones_is_bit_transparent() {
        let mut shifter = build_shifter(&[PitchStrategyKind::Granular], 44100);
        let signal = generate_sine_wave(440.0, 44100, 0.2, 0.5);
        let mut buf = signal.clone();
        shifter.process(&mut buf);
        assert_eq!(signal, buf);
    }

    #[test]
    fn semitones_clamp_to_one_octave() {
        let mut shifter = build_shifter(&[PitchStrategyKind::Granular], 44100);
        shifter.set_semitones(30.0);
        assert_eq!(shifter.semitones(), 12.0);
        shifter.set_semitones(-30.0);
        assert_eq!(shifter.semitones(), -12.0);
    }

    #[test]
    fn granular_shifts_up_an_octave() {
        let mut shifter = GranularShifter::new(44100);
        shifter.set_semitones(12.0);

        let mut buf = generate_sine_wave(440.0, 44100, 2.0, 0.5);
        shifter.process(&mut buf);

        // Skip the first window while the delay line fills
        let skip = (shifter.window_frames as usize) * 2 * 2;
        let mono = extract_mono(&buf[skip..]);
        let dominant = find_dominant_frequency(&mono, 44100);
        assert!(
            (dominant - 880.0).abs() < 60.0,
            "expected ~880 Hz, got {dominant}"
        );
    }

    #[test]
    fn granular_shifts_down() {
        let mut shifter = GranularShifter::new(44100);
        shifter.set_semitones(-12.0);

        let mut buf = generate_sine_wave(880.0, 44100, 2.0, 0.5);
        shifter.process(&mut buf);

        let skip = (shifter.window_frames as usize) * 2 * 2;
        let mono = extract_mono(&buf[skip..]);
        let dominant = find_dominant_frequency(&mono, 44100);
        assert!(
            (dominant - 440.0).abs() < 40.0,
            "expected ~440 Hz, got {dominant}"
        );
    }

    #[test]
    fn granular_output_level_is_reasonable() {
        let mut shifter = GranularShifter::new(44100);
        shifter.set_semitones(5.0);

        let signal = generate_sine_wave(440.0, 44100, 1.0, 0.5);
        let mut buf = signal.clone();
        shifter.process(&mut buf);

        let tail = &buf[buf.len() / 2..];
        let in_tail = &signal[signal.len() / 2..];
        let ratio = calculate_rms(tail) / calculate_rms(in_tail);
        assert!(ratio > 0.5 && ratio < 1.5, "level ratio was {ratio}");
    }

    #[test]
    fn passthrough_ignores_processing() {
        let mut shifter = PassthroughShifter::default();
        shifter.set_semitones(7.0);
        assert_eq!(shifter.semitones(), 7.0);

        let signal = generate_sine_wave(440.0, 44100, 0.1, 0.5);
        let mut buf = signal.clone();
        shifter.process(&mut buf);
        assert_eq!(signal, buf);
    }
}
