//! Effect modules
//!
//! Each module is a [`WetProcessor`] hosted in an [`EffectStage`],
//! which owns the dry/wet crossfade and bypass behavior shared by
//! every effect in the engine.

mod eq;
mod lofi;
mod reverb;
mod stage;
mod tempo_pitch;

pub use eq::{BandKind, EqBand, EqPreset, EqProcessor};
pub use lofi::LofiProcessor;
pub use reverb::{ReverbPreset, ReverbProcessor};
pub use stage::{EffectStage, ModuleState, WetProcessor};
pub use tempo_pitch::PitchProcessor;
