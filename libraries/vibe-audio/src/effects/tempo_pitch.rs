//! Pitch-shift effect stage processor
//!
//! Hosts the selected [`PitchShifter`] strategy behind the common
//! [`WetProcessor`] interface. Tempo lives in the playback backends
//! (it changes how many source frames are consumed); this stage only
//! moves pitch.

use crate::pitch::{build_shifter, PitchShifter, PitchStrategyKind};

use super::stage::WetProcessor;

pub struct PitchProcessor {
    shifter: Box<dyn PitchShifter>,
}

impl PitchProcessor {
    /// Select a strategy from `order` (first available wins).
    pub fn new(order: &[PitchStrategyKind], sample_rate: u32) -> Self {
        Self {
            shifter: build_shifter(order, sample_rate),
        }
    }

    pub fn set_semitones(&mut self, semitones: f32) {
        self.shifter.set_semitones(semitones);
    }

    pub fn semitones(&self) -> f32 {
        self.shifter.semitones()
    }

    /// The strategy that won selection; `Passthrough` means pitch
    /// controls are accepted but inaudible.
    pub fn strategy(&self) -> PitchStrategyKind {
        self.shifter.kind()
    }
}

impl WetProcessor for PitchProcessor {
    fn process(&mut self, input: &[f32], output: &mut [f32], _sample_rate: u32) {
        output.copy_from_slice(input);
        self.shifter.process(output);
    }

    fn reset(&mut self) {
        self.shifter.reset();
    }
}
