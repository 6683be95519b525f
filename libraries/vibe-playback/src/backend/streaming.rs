//! Streaming backend
//!
//! Decodes progressively, packet by packet, so playback starts without
//! holding the whole track in memory. Position is the decoder's media
//! clock. Tempo runs through the preserve-pitch stretch engine when
//! the `stretch` feature is on; without it tempo falls back to a
//! source-rate change and `preserves_pitch` reports false.

use std::path::Path;
use std::time::Duration;

use crate::decoder::TrackDecoder;
use crate::error::Result;

use super::{clamp_tempo, PlaybackBackend};

pub struct StreamingBackend {
    decoder: TrackDecoder,
    tempo: f32,
    /// Decoded frames not yet handed to the output.
    pending: Vec<f32>,
    /// Fractional frame cursor into `pending` (resample path only).
    #[cfg(not(feature = "stretch"))]
    pending_cursor: f64,
    source_exhausted: bool,
    finished: bool,
    #[cfg(feature = "stretch")]
    stretcher: vibe_audio::TimeStretcher,
    #[cfg(feature = "stretch")]
    flushed: bool,
}

impl StreamingBackend {
    pub fn load(path: &Path) -> Result<Self> {
        let decoder = TrackDecoder::from_path(path)?;
        tracing::info!(path = %path.display(), "streaming backend loaded");
        #[cfg(feature = "stretch")]
        let sample_rate = decoder.sample_rate();
        Ok(Self {
            decoder,
            tempo: 1.0,
            pending: Vec::new(),
            #[cfg(not(feature = "stretch"))]
            pending_cursor: 0.0,
            source_exhausted: false,
            finished: false,
            #[cfg(feature = "stretch")]
            stretcher: vibe_audio::TimeStretcher::new(sample_rate),
            #[cfg(feature = "stretch")]
            flushed: false,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.decoder.sample_rate()
    }

    fn reset_buffers(&mut self) {
        self.pending.clear();
        #[cfg(not(feature = "stretch"))]
        {
            self.pending_cursor = 0.0;
        }
        self.source_exhausted = false;
        self.finished = false;
        #[cfg(feature = "stretch")]
        {
            self.stretcher.reset();
            self.flushed = false;
        }
    }

    /// Top up `pending` to at least `frames` frames from the decoder.
    fn fill_pending(&mut self, frames: usize) -> Result<()> {
        while !self.source_exhausted && self.pending.len() < frames * 2 {
            let need = frames - self.pending.len() / 2;
            match self.decoder.decode_chunk(need)? {
                Some(chunk) => self.pending.extend_from_slice(&chunk),
                None => self.source_exhausted = true,
            }
        }
        Ok(())
    }

    /// Unity-tempo path: move decoded frames straight to the output.
    fn render_direct(&mut self, output: &mut [f32]) -> Result<usize> {
        let frames = output.len() / 2;
        self.fill_pending(frames)?;

        let available = (self.pending.len() / 2).min(frames);
        output[..available * 2].copy_from_slice(&self.pending[..available * 2]);
        self.pending.drain(..available * 2);

        if self.source_exhausted && self.pending.is_empty() && available < frames {
            self.finished = true;
        }
        Ok(available)
    }

    /// Preserve-pitch path: feed `tempo` times as many source frames
    /// into the stretcher as frames rendered.
    #[cfg(feature = "stretch")]
    fn render_stretched(&mut self, output: &mut [f32]) -> Result<usize> {
        let out_frames = output.len() / 2;
        let in_frames = ((out_frames as f64) * f64::from(self.tempo)).round() as usize;

        self.fill_pending(in_frames)?;
        let take = (self.pending.len() / 2).min(in_frames);

        if take > 0 {
            // The stretcher maps its input onto the output span it is
            // given, so a short tail at end of stream gets a
            // proportionally short span to keep the tempo ratio
            let span = if take == in_frames {
                out_frames
            } else {
                (((take as f64) / f64::from(self.tempo)).round() as usize).min(out_frames)
            };
            let input: Vec<f32> = self.pending.drain(..take * 2).collect();
            self.stretcher.process(&input, &mut output[..span * 2]);
            return Ok(span);
        }

        if self.source_exhausted {
            if !self.flushed {
                self.stretcher.flush(output);
                self.flushed = true;
                return Ok(out_frames);
            }
            self.finished = true;
        }
        Ok(0)
    }

    /// Fallback tempo path without the stretch engine: linear
    /// resampling of the decoded stream (pitch moves with tempo).
    #[cfg(not(feature = "stretch"))]
    fn render_resampled(&mut self, output: &mut [f32]) -> Result<usize> {
        let out_frames = output.len() / 2;
        let mut written = 0;

        for frame in output.chunks_exact_mut(2).take(out_frames) {
            let index = self.pending_cursor as usize;
            self.fill_pending(index + 2)?;

            if index + 1 >= self.pending.len() / 2 {
                if self.source_exhausted {
                    self.finished = true;
                }
                break;
            }

            let frac = (self.pending_cursor - index as f64) as f32;
            let a = &self.pending[index * 2..index * 2 + 2];
            let b = &self.pending[(index + 1) * 2..(index + 1) * 2 + 2];
            frame[0] = a[0] + (b[0] - a[0]) * frac;
            frame[1] = a[1] + (b[1] - a[1]) * frac;

            self.pending_cursor += f64::from(self.tempo);
            written += 1;
        }

        // Drop frames the cursor has fully passed
        let consumed = self.pending_cursor as usize;
        if consumed > 0 {
            let drop = consumed.min(self.pending.len() / 2);
            self.pending.drain(..drop * 2);
            self.pending_cursor -= drop as f64;
        }

        Ok(written)
    }
}

impl PlaybackBackend for StreamingBackend {
    fn start(&mut self, at: Duration) -> Result<()> {
        self.seek(at)?;
        Ok(())
    }

    fn pause(&mut self) {
        // Decoder position holds; the transport stops pulling
    }

    fn stop(&mut self) {
        if self.decoder.seek(Duration::ZERO).is_err() {
            tracing::warn!("rewind after stop failed");
        }
        self.reset_buffers();
    }

    fn seek(&mut self, position: Duration) -> Result<Duration> {
        let landed = self.decoder.seek(position)?;
        self.reset_buffers();
        Ok(landed)
    }

    fn position(&self) -> Duration {
        // Media clock: what the decoder has handed out, minus what is
        // still waiting in the pending buffer
        let buffered =
            Duration::from_secs_f64(self.pending.len() as f64 / 2.0 / f64::from(self.sample_rate()));
        self.decoder.position().saturating_sub(buffered)
    }

    fn duration(&self) -> Duration {
        self.decoder.duration().unwrap_or(Duration::ZERO)
    }

    fn set_tempo(&mut self, ratio: f32) {
        let ratio = clamp_tempo(ratio);
        #[cfg(feature = "stretch")]
        if (ratio - 1.0).abs() > f32::EPSILON && (self.tempo - 1.0).abs() <= f32::EPSILON {
            // Entering the stretched path; stale engine state would
            // smear the first block
            self.stretcher.reset();
        }
        self.tempo = ratio;
    }

    fn tempo(&self) -> f32 {
        self.tempo
    }

    fn preserves_pitch(&self) -> bool {
        cfg!(feature = "stretch")
    }

    fn render(&mut self, output: &mut [f32]) -> Result<usize> {
        if self.finished {
            return Ok(0);
        }
        if (self.tempo - 1.0).abs() <= f32::EPSILON {
            return self.render_direct(output);
        }
        #[cfg(feature = "stretch")]
        {
            self.render_stretched(output)
        }
        #[cfg(not(feature = "stretch"))]
        {
            self.render_resampled(output)
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
