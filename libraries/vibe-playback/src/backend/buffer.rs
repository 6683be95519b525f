//! Buffer backend
//!
//! Fully decodes the source up front. The whole track in memory buys
//! sample-accurate seeking and a cheap restart; the price is that
//! tempo is a source-rate change, so pitch moves with it
//! (`preserves_pitch` is false). Position is the frame cursor over
//! the source sample rate, which carries pause offsets for free.

use std::time::Duration;

use crate::decoder::TrackDecoder;
use crate::error::Result;

use super::{clamp_tempo, PlaybackBackend};

pub struct BufferBackend {
    samples: Vec<f32>,
    sample_rate: u32,
    /// Fractional frame cursor; advances by `tempo` per output frame.
    cursor: f64,
    tempo: f32,
    finished: bool,
}

impl BufferBackend {
    /// Decode an encoded byte buffer completely.
    pub fn load(bytes: Vec<u8>) -> Result<Self> {
        let mut decoder = TrackDecoder::from_bytes(bytes)?;
        let sample_rate = decoder.sample_rate();
        let samples = decoder.decode_all()?;
        tracing::info!(
            frames = samples.len() / 2,
            sample_rate,
            "buffer backend loaded"
        );
        Ok(Self::from_pcm(samples, sample_rate))
    }

    /// Wrap already-decoded interleaved stereo PCM.
    pub fn from_pcm(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            cursor: 0.0,
            tempo: 1.0,
            finished: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_frames(&self) -> usize {
        self.samples.len() / 2
    }

    fn clamp_position(&self, position: Duration) -> Duration {
        position.min(self.duration())
    }
}

impl PlaybackBackend for BufferBackend {
    fn start(&mut self, at: Duration) -> Result<()> {
        self.seek(at)?;
        Ok(())
    }

    fn pause(&mut self) {
        // Cursor holds; the transport stops pulling
    }

    fn stop(&mut self) {
        self.cursor = 0.0;
        self.finished = false;
    }

    fn seek(&mut self, position: Duration) -> Result<Duration> {
        let position = self.clamp_position(position);
        self.cursor = position.as_secs_f64() * f64::from(self.sample_rate);
        self.finished = self.cursor as usize >= self.total_frames();
        Ok(position)
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.cursor / f64::from(self.sample_rate))
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames() as f64 / f64::from(self.sample_rate))
    }

    fn set_tempo(&mut self, ratio: f32) {
        self.tempo = clamp_tempo(ratio);
    }

    fn tempo(&self) -> f32 {
        self.tempo
    }

    fn preserves_pitch(&self) -> bool {
        false
    }

    fn render(&mut self, output: &mut [f32]) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }

        let total = self.total_frames();
        let mut written = 0;

        for frame in output.chunks_exact_mut(2) {
            let index = self.cursor as usize;
            if index >= total {
                self.finished = true;
                break;
            }

            // Linear interpolation between neighboring source frames;
            // at tempo 1.0 the fraction is constant so this degrades
            // to a straight copy. The last frame has no neighbor and
            // is emitted as-is.
            let next = (index + 1).min(total - 1);
            let frac = (self.cursor - index as f64) as f32;
            let a = &self.samples[index * 2..index * 2 + 2];
            let b = &self.samples[next * 2..next * 2 + 2];
            frame[0] = a[0] + (b[0] - a[0]) * frac;
            frame[1] = a[1] + (b[1] - a[1]) * frac;

            self.cursor += f64::from(self.tempo);
            written += 1;
        }

        Ok(written)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_audio::test_utils::analysis::{extract_mono, find_dominant_frequency};
    use vibe_audio::test_utils::signals::generate_sine_wave;

    fn tone_backend(seconds: f32) -> BufferBackend {
        BufferBackend::from_pcm(generate_sine_wave(440.0, 44100, seconds, 0.5), 44100)
    }

    #[test]
    fn renders_source_verbatim_at_unity_tempo() {
        let source = generate_sine_wave(440.0, 44100, 0.5, 0.5);
        let mut backend = BufferBackend::from_pcm(source.clone(), 44100);

        let mut out = vec![0.0; 8192];
        let written = backend.render(&mut out).unwrap();
        assert_eq!(written, 4096);
        for (a, b) in source.iter().zip(out.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn seek_is_sample_accurate() {
        let mut backend = tone_backend(2.0);
        let landed = backend.seek(Duration::from_millis(500)).unwrap();
        assert_eq!(landed, Duration::from_millis(500));
        assert_eq!(backend.position(), Duration::from_millis(500));
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut backend = tone_backend(1.0);
        let landed = backend.seek(Duration::from_secs(60)).unwrap();
        assert_eq!(landed, backend.duration());
        assert!(backend.is_finished());
    }

    #[test]
    fn tempo_advances_position_faster() {
        let mut backend = tone_backend(5.0);
        backend.set_tempo(2.0);

        // One second of output at 2x consumes two seconds of source
        let mut out = vec![0.0; 44100 * 2];
        backend.render(&mut out).unwrap();
        let pos = backend.position().as_secs_f64();
        assert!((pos - 2.0).abs() < 0.01, "position {pos}");
    }

    #[test]
    fn tempo_shifts_pitch_on_this_backend() {
        let mut backend = tone_backend(5.0);
        backend.set_tempo(2.0);
        assert!(!backend.preserves_pitch());

        let mut out = vec![0.0; 44100 * 2];
        backend.render(&mut out).unwrap();
        let dominant = find_dominant_frequency(&extract_mono(&out), 44100);
        assert!((dominant - 880.0).abs() < 15.0, "got {dominant}");
    }

    #[test]
    fn emits_the_final_source_frame() {
        let source = generate_sine_wave(440.0, 44100, 0.1, 0.5);
        let frames = source.len() / 2;
        let mut backend = BufferBackend::from_pcm(source.clone(), 44100);

        let mut out = vec![0.0; frames * 2 + 64];
        let written = backend.render(&mut out).unwrap();
        assert_eq!(written, frames);
        assert_eq!(out[(frames - 1) * 2], source[(frames - 1) * 2]);
        assert_eq!(out[(frames - 1) * 2 + 1], source[(frames - 1) * 2 + 1]);
        assert!(backend.is_finished());
        assert_eq!(backend.position(), backend.duration());
    }

    #[test]
    fn start_positions_the_cursor() {
        let mut backend = tone_backend(1.0);
        backend.start(Duration::from_millis(250)).unwrap();
        assert_eq!(backend.position(), Duration::from_millis(250));
    }

    #[test]
    fn exhausts_and_reports_finished() {
        let mut backend = tone_backend(0.1);
        let mut out = vec![0.0; 44100];
        let written = backend.render(&mut out).unwrap();
        assert!(written < 22050);
        assert!(backend.is_finished());
        assert_eq!(backend.render(&mut out).unwrap(), 0);

        backend.stop();
        assert!(!backend.is_finished());
        assert_eq!(backend.position(), Duration::ZERO);
    }
}
