//! CPAL output stage (feature `desktop`)
//!
//! Opens the default output device and drives the engine from the
//! device's data callback. The engine lives behind a mutex shared with
//! the control surface; a missed lock renders one silent block rather
//! than stalling the audio thread.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::engine::Engine;
use crate::error::{EngineError, Result};

pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl AudioOutput {
    /// Open the default device and start pulling `engine.process`.
    /// The stream stops when the returned handle is dropped.
    pub fn start(engine: Arc<Mutex<Engine>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Unsupported {
                what: "no default output device".into(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| EngineError::load(format!("output config: {e}")))?;

        if config.channels() != 2 {
            return Err(EngineError::Unsupported {
                what: format!("{}-channel output (stereo only)", config.channels()),
            });
        }
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(EngineError::Unsupported {
                what: format!("{} output (f32 only)", config.sample_format()),
            });
        }

        let sample_rate = config.sample_rate().0;
        tracing::info!(
            device = device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            "audio output started"
        );

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    match engine.try_lock() {
                        Ok(mut engine) => engine.process(data),
                        Err(_) => data.fill(0.0),
                    }
                },
                |err| tracing::error!("output stream error: {err}"),
                None,
            )
            .map_err(|e| EngineError::load(format!("build stream: {e}")))?;

        stream
            .play()
            .map_err(|e| EngineError::load(format!("start stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    /// The device's native rate; engine config should match it.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
