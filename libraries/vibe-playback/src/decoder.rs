//! Symphonia decoding
//!
//! One decoder type serves both backends: the buffer backend drains it
//! with [`TrackDecoder::decode_all`], the streaming backend pulls
//! packet-sized chunks with [`TrackDecoder::decode_chunk`] and seeks
//! through the container index.
//!
//! Output is always interleaved stereo f32 in `[-1.0, 1.0]`; mono is
//! duplicated and multi-channel layouts are downmixed with front L/R
//! passed through and the remaining channels folded into both sides at
//! -3 dB (ITU-R BS.775-1 coefficient).

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::error::{EngineError, Result};

/// -3 dB fold-in for center/surround channels
const SURROUND_MIX: f32 = 0.707;

pub struct TrackDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    duration: Option<Duration>,
    position_frames: u64,
}

impl TrackDecoder {
    /// Open a file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| EngineError::load(format!("{}: {e}", path.display())))?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::open(Box::new(file), hint)
    }

    /// Open an in-memory encoded buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::open(Box::new(Cursor::new(bytes)), Hint::new())
    }

    fn open(source: Box<dyn MediaSource>, hint: Hint) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| EngineError::load(format!("probe failed: {e}")))?;

        let format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| EngineError::load("no audio tracks found"))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let track_id = track.id;
        let duration = track
            .codec_params
            .n_frames
            .map(|frames| Duration::from_secs_f64(frames as f64 / sample_rate as f64));

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| EngineError::load(format!("no codec: {e}")))?;

        tracing::debug!(sample_rate, ?duration, "decoder opened");

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            duration,
            position_frames: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total duration, when the container reports a frame count.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Media-clock position: frames handed out so far (or the seek
    /// target) over the source sample rate.
    pub fn position(&self) -> Duration {
        Duration::from_secs_f64(self.position_frames as f64 / self.sample_rate as f64)
    }

    /// Decode at least `min_frames` frames of interleaved stereo, or
    /// whatever remains. `Ok(None)` signals end of stream.
    pub fn decode_chunk(&mut self, min_frames: usize) -> Result<Option<Vec<f32>>> {
        let mut samples = Vec::with_capacity(min_frames * 2);

        while samples.len() < min_frames * 2 {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(symphonia::core::errors::Error::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(EngineError::load(format!("read packet: {e}"))),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    // Corrupt packets are skippable
                    tracing::warn!("recoverable decode error: {e}");
                    continue;
                }
                Err(e) => return Err(EngineError::load(format!("decode: {e}"))),
            };

            self.position_frames += decoded.frames() as u64;
            convert_to_stereo(decoded, &mut samples);
        }

        if samples.is_empty() {
            Ok(None)
        } else {
            Ok(Some(samples))
        }
    }

    /// Decode the entire stream into one interleaved stereo buffer.
    pub fn decode_all(&mut self) -> Result<Vec<f32>> {
        let mut all = Vec::new();
        while let Some(chunk) = self.decode_chunk(16_384)? {
            all.extend_from_slice(&chunk);
        }
        Ok(all)
    }

    /// Seek to `position` (clamped to the known duration) and return
    /// where the container actually landed.
    pub fn seek(&mut self, position: Duration) -> Result<Duration> {
        let position = match self.duration {
            Some(duration) if position > duration => duration,
            _ => position,
        };

        let time = Time::new(
            position.as_secs(),
            f64::from(position.subsec_nanos()) / 1_000_000_000.0,
        );

        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| EngineError::load(format!("seek: {e}")))?;

        // Codec state is stale after a container seek
        self.decoder.reset();

        let time_base = self
            .format
            .tracks()
            .iter()
            .find(|t| t.id == self.track_id)
            .and_then(|t| t.codec_params.time_base);

        let actual = match time_base {
            Some(tb) => {
                let time = tb.calc_time(seeked.actual_ts);
                Duration::from_secs_f64(time.seconds as f64 + time.frac)
            }
            None => position,
        };

        self.position_frames = (actual.as_secs_f64() * self.sample_rate as f64) as u64;
        Ok(actual)
    }
}

/// Downmix a decoded packet into interleaved stereo f32.
fn convert_to_stereo(decoded: AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => downmix(&buf, |s| s.clamp(-1.0, 1.0), out),
        AudioBufferRef::F64(buf) => downmix(&buf, |s| (s as f32).clamp(-1.0, 1.0), out),
        AudioBufferRef::S32(buf) => downmix(&buf, |s| s as f32 / 2_147_483_648.0, out),
        AudioBufferRef::S16(buf) => downmix(&buf, |s| f32::from(s) / 32_768.0, out),
        AudioBufferRef::S8(buf) => downmix(&buf, |s| f32::from(s) / 128.0, out),
        AudioBufferRef::S24(buf) => downmix(&buf, |s| s.inner() as f32 / 8_388_608.0, out),
        AudioBufferRef::U32(buf) => {
            downmix(&buf, |s| (s as f32 / u32::MAX as f32) * 2.0 - 1.0, out)
        }
        AudioBufferRef::U16(buf) => downmix(
            &buf,
            |s| (f32::from(s) / f32::from(u16::MAX)) * 2.0 - 1.0,
            out,
        ),
        AudioBufferRef::U8(buf) => {
            downmix(&buf, |s| (f32::from(s) / f32::from(u8::MAX)) * 2.0 - 1.0, out)
        }
        AudioBufferRef::U24(buf) => {
            downmix(&buf, |s| (s.inner() as f32 / 16_777_215.0) * 2.0 - 1.0, out)
        }
    }
}

fn downmix<T, F>(buf: &symphonia::core::audio::AudioBuffer<T>, normalize: F, out: &mut Vec<f32>)
where
    T: symphonia::core::sample::Sample + Copy,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    out.reserve(frames * 2);

    match channels {
        0 => out.extend(std::iter::repeat(0.0).take(frames * 2)),
        1 => {
            let mono = buf.chan(0);
            for i in 0..frames {
                let sample = normalize(mono[i]);
                out.push(sample);
                out.push(sample);
            }
        }
        2 => {
            let left = buf.chan(0);
            let right = buf.chan(1);
            for i in 0..frames {
                out.push(normalize(left[i]));
                out.push(normalize(right[i]));
            }
        }
        _ => {
            // Front L/R pass through; center, LFE and surrounds fold
            // into both sides at -3 dB
            for i in 0..frames {
                let mut l = normalize(buf.chan(0)[i]);
                let mut r = normalize(buf.chan(1)[i]);
                for ch in 2..channels {
                    let s = normalize(buf.chan(ch)[i]) * SURROUND_MIX;
                    l += s;
                    r += s;
                }
                out.push(l.clamp(-1.0, 1.0));
                out.push(r.clamp(-1.0, 1.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_load_error() {
        let result = TrackDecoder::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(result, Err(EngineError::Load { .. })));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let result = TrackDecoder::from_path(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(result, Err(EngineError::Load { .. })));
    }
}
