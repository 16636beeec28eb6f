//! Magnitude-only frame synthesis (stochastic-phase vocoder).
//!
//! Each bin's normalized magnitude is mapped to a linear amplitude through the
//! session's log-power scale, paired with a freshly drawn phase, and the half
//! spectrum is turned into one time-domain frame by an inverse real FFT.
//!
//! The model predicts magnitudes only, so phase is random on purpose: playing
//! the same spectrum twice sounds alike but is not bit-identical. Tests inject a
//! [`FixedPhase`] (or a seeded [`RandomPhase`]) to make frames reproducible.
//!
//! All buffers are planned and allocated in [`FrameSynthesizer::new`].

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner};
use resynth_core::dsp::{bin_amplitude, finite_or_zero, polar, TAU};

use crate::error::{Error, Result};
use crate::params::Gains;

/// Source of per-bin phases in `[0, 2π)`.
pub trait PhaseSource: Send {
    fn next_phase(&mut self) -> f32;
}

/// Uniform random phase from a PCG32 stream.
#[derive(Clone, Debug)]
pub struct RandomPhase {
    rng: Pcg32,
}

impl RandomPhase {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Pcg32::seed_from_u64(seed) }
    }

    pub fn from_entropy() -> Self {
        Self { rng: Pcg32::from_entropy() }
    }
}

impl PhaseSource for RandomPhase {
    #[inline]
    fn next_phase(&mut self) -> f32 {
        self.rng.gen_range(0.0..TAU)
    }
}

/// Every bin gets the same phase.
#[derive(Copy, Clone, Debug, Default)]
pub struct FixedPhase(pub f32);

impl PhaseSource for FixedPhase {
    #[inline]
    fn next_phase(&mut self) -> f32 {
        self.0
    }
}

pub struct FrameSynthesizer<P> {
    ifft: Arc<dyn ComplexToReal<f32>>,
    /// Half spectrum, `fft_size / 2 + 1` bins (consumed as scratch by the transform).
    bins: Vec<Complex32>,
    frame: Vec<f32>,
    scratch: Vec<Complex32>,
    rfft_size: usize,
    scale: f32,
    phases: P,
}

impl<P> core::fmt::Debug for FrameSynthesizer<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameSynthesizer")
            .field("fft_size", &self.frame.len())
            .field("rfft_size", &self.rfft_size)
            .finish()
    }
}

impl<P: PhaseSource> FrameSynthesizer<P> {
    /// Plan an inverse real FFT of `fft_size` points for spectra of `rfft_size` bins.
    pub fn new(fft_size: usize, rfft_size: usize, phases: P) -> Result<Self> {
        if fft_size < 2 || fft_size % 2 != 0 {
            return Err(Error::InvalidConfig(format!("fft_size must be even and >= 2, got {fft_size}")));
        }
        let max_bins = fft_size / 2 + 1;
        if rfft_size == 0 || rfft_size > max_bins {
            return Err(Error::InvalidConfig(format!(
                "spectrum of {rfft_size} bins does not fit an FFT of {fft_size} (max {max_bins})"
            )));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let ifft = planner.plan_fft_inverse(fft_size);
        let bins = ifft.make_input_vec();
        let frame = ifft.make_output_vec();
        let scratch = ifft.make_scratch_vec();

        Ok(Self {
            ifft,
            bins,
            frame,
            scratch,
            rfft_size,
            scale: 1.0 / fft_size as f32,
            phases,
        })
    }

    #[inline] pub fn fft_size(&self) -> usize { self.frame.len() }
    #[inline] pub fn rfft_size(&self) -> usize { self.rfft_size }

    /// Turn one magnitude frame into `fft_size` time-domain samples.
    ///
    /// `spectrum.len()` must equal `rfft_size`. Bins above `rfft_size` are silent.
    /// The DC and Nyquist bins keep only their real part so the half spectrum is
    /// Hermitian-consistent. Output is scaled by `1 / fft_size` and always finite.
    pub fn synthesize(&mut self, spectrum: &[f32], gains: Gains) -> Result<&[f32]> {
        if spectrum.len() != self.rfft_size {
            return Err(Error::SpectrumSize { expected: self.rfft_size, got: spectrum.len() });
        }

        let nyquist = self.bins.len() - 1;
        for (i, (bin, &m)) in self.bins.iter_mut().zip(spectrum).enumerate() {
            let amp = bin_amplitude(m, gains.x_max, gains.s_clip);
            let (re, im) = polar(amp, self.phases.next_phase());
            *bin = if i == 0 || i == nyquist { Complex32::new(re, 0.0) } else { Complex32::new(re, im) };
        }
        for bin in &mut self.bins[self.rfft_size..] {
            *bin = Complex32::new(0.0, 0.0);
        }

        self.ifft
            .process_with_scratch(&mut self.bins, &mut self.frame, &mut self.scratch)
            .map_err(|e| Error::Transform(e.to_string()))?;

        let scale = self.scale;
        for x in &mut self.frame {
            *x = finite_or_zero(*x * scale);
        }
        Ok(&self.frame)
    }
}
