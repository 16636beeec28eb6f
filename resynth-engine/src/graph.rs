//! Realtime render core.
//!
//! This module defines the minimal block-based `Generator` trait and the
//! `Engine` wrapper the audio driver talks to. The engine owns one generator
//! (normally a [`Voice`](crate::voice::Voice)), hands it exactly the block the
//! driver asked for, and turns any generator failure into silence.
//!
//! Design goals
//! - No dynamic allocations or locks in the render path
//! - A missing or faulted generator renders zeros instead of stopping the stream
//! - Interleaved output duplicates the mono signal to every channel

use std::path::Path;

use crate::control::ControlHandle;
use crate::error::{Error, Result};
use crate::model::{DenseDecoder, SpectrumModel};
use crate::params::SynthesisParameters;
use crate::settings::Settings;
use crate::synth::PhaseSource;
use crate::trajectory::Trajectory;
use crate::voice::Voice;

/// Default size of the mono scratch used by [`Engine::render_interleaved`].
pub const DEFAULT_MAX_BLOCK: usize = 4096;

/// Anything that can fill a block of mono samples.
pub trait Generator: Send {
    /// Fill `out` completely. An error means the generator cannot continue.
    fn render(&mut self, out: &mut [f32]) -> Result<()>;

    /// Drop any accumulated audio.
    fn reset(&mut self);
}

/// Driver-facing engine.
///
/// Once the generator reports an error the engine latches into silence; the
/// cause is kept in [`Engine::fault`] for the control side to report.
pub struct Engine {
    gen: Option<Box<dyn Generator>>,
    fault: Option<Error>,
    mono: Vec<f32>,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("active", &self.is_active())
            .field("fault", &self.fault)
            .field("max_block", &self.mono.len())
            .finish()
    }
}

impl Engine {
    pub fn new(gen: impl Generator + 'static) -> Self {
        Self::with_max_block(gen, DEFAULT_MAX_BLOCK)
    }

    /// `max_block` sizes the interleaved render scratch; larger requests are split.
    pub fn with_max_block(gen: impl Generator + 'static, max_block: usize) -> Self {
        Self { gen: Some(Box::new(gen)), fault: None, mono: vec![0.0; max_block.max(1)] }
    }

    /// An engine that only ever renders silence (configuration fallback).
    pub fn silent() -> Self {
        Self { gen: None, fault: None, mono: vec![0.0; DEFAULT_MAX_BLOCK] }
    }

    /// `true` while a healthy generator is producing audio.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.gen.is_some() && self.fault.is_none()
    }

    #[inline]
    pub fn fault(&self) -> Option<&Error> {
        self.fault.as_ref()
    }

    /// Render exactly `out.len()` mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        render_mono(&mut self.gen, &mut self.fault, out);
    }

    /// Render `out.len() / channels` frames of interleaved audio, the mono signal
    /// copied to every channel. Any trailing partial frame is zeroed.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            out.fill(0.0);
            return;
        }
        let max = self.mono.len();
        for chunk in out.chunks_mut(max * channels) {
            let frames = chunk.len() / channels;
            let mono = &mut self.mono[..frames];
            render_mono(&mut self.gen, &mut self.fault, mono);
            for (frame, &s) in chunk.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(s);
            }
            chunk[frames * channels..].fill(0.0);
        }
    }

    /// Clear accumulated audio (not the fault latch).
    pub fn reset(&mut self) {
        if let Some(gen) = self.gen.as_mut() {
            gen.reset();
        }
    }
}

// ---- construction from settings ----

/// Knobs that are not part of the settings file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineOptions {
    /// Fixed synthesis hop in samples; `None` synthesizes once per block.
    /// Must divide `win_length`.
    pub hop: Option<usize>,
    /// Largest mono block rendered in one go by [`Engine::render_interleaved`].
    pub max_block: usize,
    /// Start at the silent levels instead of the loaded ones.
    pub start_muted: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { hop: None, max_block: DEFAULT_MAX_BLOCK, start_muted: false }
    }
}

impl Engine {
    /// Wire a model into a voice and hand back the engine plus its control handle.
    pub fn build<M, P>(
        params: SynthesisParameters,
        trajectory: Trajectory,
        model: M,
        phases: P,
        opts: EngineOptions,
    ) -> Result<(Self, ControlHandle)>
    where
        M: SpectrumModel + 'static,
        P: PhaseSource + 'static,
    {
        let control = ControlHandle::new(params, trajectory);
        if opts.start_muted {
            control.mute();
        }
        let voice = Voice::new(model, control.params(), phases, control.latent_cell(), control.gains_cell())?
            .with_hop(opts.hop)?;
        Ok((Self::with_max_block(voice, opts.max_block), control))
    }

    /// Load a settings file and the dense decoder it names.
    pub fn load<P>(settings_path: impl AsRef<Path>, phases: P, opts: EngineOptions) -> Result<(Self, ControlHandle)>
    where
        P: PhaseSource + 'static,
    {
        let settings_path = settings_path.as_ref();
        let settings = Settings::from_path(settings_path)?;
        let params = settings.synthesis_parameters()?;
        let trajectory = settings.trajectory()?;
        let model_path = settings.model_path(settings_path);
        let model = DenseDecoder::from_path(&model_path)?;
        if model.latent_dim() != params.latent_dim {
            return Err(Error::ModelLoad(format!(
                "{} expects {} latent components, settings declare {}",
                model_path.display(),
                model.latent_dim(),
                params.latent_dim
            )));
        }
        tracing::info!(model = %model_path.display(), bins = model.bins(), "loaded model");
        Self::build(params, trajectory, model, phases, opts)
    }

    /// Like [`Engine::load`], but any failure yields a silent engine and no handle.
    pub fn load_or_silence<P>(settings_path: impl AsRef<Path>, phases: P, opts: EngineOptions) -> (Self, Option<ControlHandle>)
    where
        P: PhaseSource + 'static,
    {
        let settings_path = settings_path.as_ref();
        match Self::load(settings_path, phases, opts) {
            Ok((engine, control)) => (engine, Some(control)),
            Err(e) => {
                tracing::error!(path = %settings_path.display(), error = %e, "could not load; running silent");
                (Self::silent(), None)
            }
        }
    }
}

fn render_mono(gen: &mut Option<Box<dyn Generator>>, fault: &mut Option<Error>, out: &mut [f32]) {
    let Some(gen) = gen.as_mut() else {
        out.fill(0.0);
        return;
    };
    if fault.is_some() {
        out.fill(0.0);
        return;
    }
    if let Err(e) = gen.render(out) {
        tracing::error!(error = %e, "generator failed; rendering silence");
        out.fill(0.0);
        *fault = Some(e);
    }
}
