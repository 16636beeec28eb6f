//! The resynthesis voice: model → frame synthesizer → overlap-add ring.
//!
//! A `Voice` is the only thing that runs on the audio thread. Everything it
//! touches per block (latent scratch, spectrum, FFT buffers, ring) is allocated
//! in [`Voice::new`]; control input arrives through the shared snapshots.
//!
//! Frame scheduling
//! - `hop = None`   : one new frame per rendered block; the write cursor advances
//!   by the block size (the classic behaviour). Blocks longer than the window
//!   are split into window-sized pieces, each with its own frame.
//! - `hop = Some(h)`: one new frame every `h` output samples, whatever block size
//!   the driver asks for. `h` must divide `win_length` so both cursors wrap on
//!   the same boundary.

use std::sync::Arc;

use resynth_core::OverlapAddBuffer;

use crate::error::{Error, Result};
use crate::graph::Generator;
use crate::handoff::Snapshot;
use crate::model::{measure_spectrum_size, SpectrumModel};
use crate::params::{Gains, SynthesisParameters};
use crate::synth::{FrameSynthesizer, PhaseSource};
use crate::trajectory::LatentVector;

pub struct Voice<M, P> {
    model: M,
    synth: FrameSynthesizer<P>,
    ola: OverlapAddBuffer,
    latent: Arc<Snapshot<LatentVector>>,
    gains: Arc<Snapshot<Gains>>,
    latent_scratch: Vec<f32>,
    spectrum: Vec<f32>,
    hop: Option<usize>,
    /// Output samples left before the next frame is due (fixed-hop mode).
    /// Zero means a frame is due before the next sample is read.
    countdown: usize,
}

impl<M, P> core::fmt::Debug for Voice<M, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Voice")
            .field("synth", &self.synth)
            .field("win_length", &self.ola.win_length())
            .field("hop", &self.hop)
            .finish()
    }
}

impl<M: SpectrumModel, P: PhaseSource> Voice<M, P> {
    /// Build a voice and run the model once with the current latent vector to
    /// fix the spectrum size for the session.
    pub fn new(
        mut model: M,
        params: &SynthesisParameters,
        phases: P,
        latent: Arc<Snapshot<LatentVector>>,
        gains: Arc<Snapshot<Gains>>,
    ) -> Result<Self> {
        params.validate()?;

        let latent_scratch = latent.load().to_vec();
        if latent_scratch.len() != params.latent_dim {
            return Err(Error::InvalidConfig(format!(
                "latent vector has {} components, latent_dim is {}",
                latent_scratch.len(),
                params.latent_dim
            )));
        }

        let mut spectrum = Vec::new();
        let rfft_size = measure_spectrum_size(&mut model, &latent_scratch, &mut spectrum)?;
        if rfft_size > params.max_bins() {
            return Err(Error::InvalidConfig(format!(
                "model returns {rfft_size} bins; fft_size {} holds at most {}",
                params.fft_size,
                params.max_bins()
            )));
        }

        let synth = FrameSynthesizer::new(params.fft_size, rfft_size, phases)?;
        let ola = OverlapAddBuffer::new(params.win_length)?;

        tracing::debug!(
            rfft_size,
            fft_size = params.fft_size,
            win_length = params.win_length,
            "voice ready"
        );

        Ok(Self {
            model,
            synth,
            ola,
            latent,
            gains,
            latent_scratch,
            spectrum,
            hop: None,
            countdown: 0,
        })
    }

    /// Fixed hop in samples; `None` synthesizes once per block.
    ///
    /// A hop of 0, or one that does not divide `win_length`, is rejected.
    pub fn with_hop(mut self, hop: Option<usize>) -> Result<Self> {
        if let Some(h) = hop {
            let win_length = self.ola.win_length();
            if h == 0 || win_length % h != 0 {
                return Err(Error::InvalidConfig(format!(
                    "hop {h} must be non-zero and divide win_length {win_length}"
                )));
            }
        }
        self.hop = hop;
        self.countdown = 0;
        Ok(self)
    }

    #[inline] pub fn rfft_size(&self) -> usize { self.synth.rfft_size() }
    #[inline] pub fn ola(&self) -> &OverlapAddBuffer { &self.ola }

    /// Predict, synthesize and deposit one frame, advancing the write cursor by `hop`.
    fn synthesize_frame(&mut self, hop: usize) -> Result<()> {
        {
            let snap = self.latent.load();
            if snap.len() != self.latent_scratch.len() {
                return Err(Error::InvalidConfig(format!(
                    "published latent has {} components, voice expects {}",
                    snap.len(),
                    self.latent_scratch.len()
                )));
            }
            self.latent_scratch.copy_from_slice(&snap);
        }
        let gains = self.gains.get();

        self.model.predict(&self.latent_scratch, &mut self.spectrum)?;
        if self.spectrum.len() != self.synth.rfft_size() {
            return Err(Error::SpectrumSize { expected: self.synth.rfft_size(), got: self.spectrum.len() });
        }

        let frame = self.synth.synthesize(&self.spectrum, gains)?;
        self.ola.deposit(frame, hop)?;
        Ok(())
    }
}

impl<M: SpectrumModel, P: PhaseSource> Generator for Voice<M, P> {
    fn render(&mut self, out: &mut [f32]) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        match self.hop {
            None => {
                for piece in out.chunks_mut(self.ola.win_length()) {
                    self.synthesize_frame(piece.len())?;
                    self.ola.consume(piece);
                }
            }
            Some(hop) => {
                // reads stop at every frame boundary, so the read cursor sits on
                // a multiple of `hop` (== the write cursor) whenever a frame lands
                let mut rest = out;
                while !rest.is_empty() {
                    if self.countdown == 0 {
                        self.synthesize_frame(hop)?;
                        self.countdown = hop;
                    }
                    let n = self.countdown.min(rest.len());
                    let (head, tail) = rest.split_at_mut(n);
                    self.ola.consume(head);
                    self.countdown -= n;
                    rest = tail;
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.ola.clear();
        self.countdown = 0;
    }
}
