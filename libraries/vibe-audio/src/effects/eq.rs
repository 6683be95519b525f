//! Multi-band parametric equalizer
//!
//! Two fixed layouts are provided: a compact three-band tone control
//! (low shelf / mid peak / high shelf) and a seven-band graphic-style
//! layout of peaking filters. Band frequencies and Q values are fixed;
//! only gains are user-adjustable.

use serde::{Deserialize, Serialize};

use crate::biquad::Biquad;
use crate::error::{AudioError, Result};

use super::stage::WetProcessor;

/// Gain limits per band, in dB.
pub const MAX_BAND_GAIN_DB: f32 = 24.0;

/// Filter shape of a single band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// One EQ band: fixed frequency and Q, adjustable gain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EqBand {
    pub kind: BandKind,
    pub frequency: f32,
    pub q: f32,
    pub gain_db: f32,
}

/// Named gain presets applied atomically across all bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqPreset {
    Flat,
    BassBoost,
    Vocal,
    Treble,
}

impl EqPreset {
    /// Per-band gains for the given layout size.
    fn gains(&self, band_count: usize) -> Vec<f32> {
        match (self, band_count) {
            (EqPreset::Flat, n) => vec![0.0; n],
            (EqPreset::BassBoost, 3) => vec![6.0, 0.0, -2.0],
            (EqPreset::Vocal, 3) => vec![-2.0, 4.0, 1.0],
            (EqPreset::Treble, 3) => vec![-2.0, 0.0, 6.0],
            (EqPreset::BassBoost, _) => vec![6.0, 5.0, 3.0, 0.0, -1.0, -2.0, -2.0],
            (EqPreset::Vocal, _) => vec![-2.0, -1.0, 0.0, 3.0, 4.0, 2.0, 0.0],
            (EqPreset::Treble, _) => vec![-3.0, -2.0, -1.0, 0.0, 2.0, 5.0, 6.0],
        }
    }
}

/// Wet processor running a fixed bank of biquad bands in series.
pub struct EqProcessor {
    bands: Vec<EqBand>,
    filters: Vec<Biquad>,
    sample_rate: u32,
}

impl EqProcessor {
    /// Tone-control layout: low shelf 320 Hz, peak 1 kHz, high shelf 3.2 kHz.
    pub fn three_band(sample_rate: u32) -> Self {
        let bands = vec![
            EqBand {
                kind: BandKind::LowShelf,
                frequency: 320.0,
                q: 0.707,
                gain_db: 0.0,
            },
            EqBand {
                kind: BandKind::Peaking,
                frequency: 1000.0,
                q: 0.5,
                gain_db: 0.0,
            },
            EqBand {
                kind: BandKind::HighShelf,
                frequency: 3200.0,
                q: 0.707,
                gain_db: 0.0,
            },
        ];
        Self::from_bands(bands, sample_rate)
    }

    /// Graphic-style layout of seven peaking bands.
    pub fn seven_band(sample_rate: u32) -> Self {
        let layout: [(f32, f32); 7] = [
            (60.0, 1.0),
            (170.0, 1.1),
            (310.0, 1.2),
            (600.0, 1.3),
            (1000.0, 1.4),
            (3000.0, 1.3),
            (6000.0, 1.2),
        ];
        let bands = layout
            .iter()
            .map(|&(frequency, q)| EqBand {
                kind: BandKind::Peaking,
                frequency,
                q,
                gain_db: 0.0,
            })
            .collect();
        Self::from_bands(bands, sample_rate)
    }

    fn from_bands(bands: Vec<EqBand>, sample_rate: u32) -> Self {
        let filters = vec![Biquad::new(); bands.len()];
        let mut eq = Self {
            bands,
            filters,
            sample_rate,
        };
        for i in 0..eq.bands.len() {
            eq.update_filter(i);
            eq.filters[i].reset();
        }
        eq
    }

    fn update_filter(&mut self, index: usize) {
        let band = self.bands[index];
        let filter = &mut self.filters[index];
        let sr = self.sample_rate as f32;
        match band.kind {
            BandKind::LowShelf => filter.set_low_shelf(sr, band.frequency, band.q, band.gain_db),
            BandKind::Peaking => filter.set_peaking(sr, band.frequency, band.q, band.gain_db),
            BandKind::HighShelf => filter.set_high_shelf(sr, band.frequency, band.q, band.gain_db),
        }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    /// Set one band's gain in dB, clamped to ±24 dB.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        if index >= self.bands.len() {
            return Err(AudioError::InvalidBand(index));
        }
        self.bands[index].gain_db = gain_db.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
        self.update_filter(index);
        Ok(())
    }

    pub fn band_gain(&self, index: usize) -> Result<f32> {
        self.bands
            .get(index)
            .map(|b| b.gain_db)
            .ok_or(AudioError::InvalidBand(index))
    }

    /// Apply a preset to all bands at once. Coefficient smoothing in
    /// the filters makes the change a single audible transition.
    pub fn apply_preset(&mut self, preset: EqPreset) {
        let gains = preset.gains(self.bands.len());
        for (i, gain) in gains.into_iter().enumerate() {
            self.bands[i].gain_db = gain.clamp(-MAX_BAND_GAIN_DB, MAX_BAND_GAIN_DB);
            self.update_filter(i);
        }
    }
}

impl WetProcessor for EqProcessor {
    fn process(&mut self, input: &[f32], output: &mut [f32], _sample_rate: u32) {
        for (out_frame, in_frame) in output.chunks_exact_mut(2).zip(input.chunks_exact(2)) {
            let mut l = in_frame[0];
            let mut r = in_frame[1];
            for filter in &mut self.filters {
                let (fl, fr) = filter.process_frame(l, r);
                l = fl;
                r = fr;
            }
            out_frame[0] = l;
            out_frame[1] = r;
        }
    }

    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}
