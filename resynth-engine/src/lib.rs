//! Resynth Engine: latent-space spectral resynthesis.
//!
//! Crate layout:
//! - [`settings`]   : JSON settings file (model reference, parameters, tracks)
//! - [`params`]     : validated synthesis parameters and level pairs
//! - [`trajectory`] : latent vectors and the preset track list
//! - [`model`]      : `SpectrumModel` seam and the bundled dense decoder
//! - [`synth`]      : random-phase inverse-FFT frame synthesis
//! - [`voice`]      : model → synthesizer → overlap-add, one block at a time
//! - [`handoff`]    : lock-free snapshots shared with control threads
//! - [`control`]    : track selection, latent edits and level changes
//! - [`graph`]      : `Generator` trait and the silent-on-fault `Engine`
//!
//! Everything the audio thread needs is allocated when the voice is built.
//! Control threads only ever publish whole snapshots.

pub mod control;
pub mod error;
pub mod graph;
pub mod handoff;
pub mod model;
pub mod params;
pub mod settings;
pub mod synth;
pub mod trajectory;
pub mod voice;

pub use control::{ControlHandle, TrackSequencer};
pub use error::{Error, Result};
pub use graph::{Engine, EngineOptions, Generator};
pub use model::{DenseDecoder, ModelError, SpectrumModel};
pub use params::{Gains, SynthesisParameters, ZRange, DEFAULT_FFT_SIZE, SILENT_GAINS};
pub use settings::Settings;
pub use synth::{FixedPhase, FrameSynthesizer, PhaseSource, RandomPhase};
pub use trajectory::{LatentVector, Trajectory};
pub use voice::Voice;

pub mod prelude {
    pub use crate::control::ControlHandle;
    pub use crate::graph::{Engine, EngineOptions, Generator};
    pub use crate::model::SpectrumModel;
    pub use crate::params::{Gains, SynthesisParameters, ZRange};
    pub use crate::synth::{FixedPhase, PhaseSource, RandomPhase};
    pub use crate::trajectory::{LatentVector, Trajectory};
}
