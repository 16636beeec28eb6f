//! Session parameters.
//!
//! `SynthesisParameters` is value-owned and fixed once the engine is built, except
//! for the two level controls (`x_max`, `s_clip`), which travel to the audio thread
//! as a [`Gains`] snapshot.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inverse transform size used when the settings do not name one.
pub const DEFAULT_FFT_SIZE: usize = 4096;

/// Levels that leave the output effectively silent (x_max = 0, s_clip = -100 dB).
pub const SILENT_GAINS: Gains = Gains { x_max: 0.0, s_clip: -100.0 };

/// Advisory bounds for one latent dimension.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZRange {
    pub min: f32,
    pub max: f32,
}

impl ZRange {
    #[inline] pub fn new(min: f32, max: f32) -> Self { Self { min, max } }
    #[inline] pub fn contains(&self, v: f32) -> bool { v >= self.min && v <= self.max }
}

/// Runtime-adjustable magnitude mapping: `power = (m * x_max + s_clip) / 10`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    /// dB span of the model's normalized output.
    pub x_max: f32,
    /// dB offset (floor).
    pub s_clip: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisParameters {
    pub x_max: f32,
    pub s_clip: f32,
    /// Window length; also the ring size of the overlap-add buffer.
    pub win_length: usize,
    pub latent_dim: usize,
    pub z_range: Vec<ZRange>,
    /// Inverse real FFT size (`>= win_length`).
    pub fft_size: usize,
}

impl SynthesisParameters {
    #[inline]
    pub fn gains(&self) -> Gains {
        Gains { x_max: self.x_max, s_clip: self.s_clip }
    }

    #[inline]
    pub fn range(&self, dim: usize) -> Option<ZRange> {
        self.z_range.get(dim).copied()
    }

    /// Largest spectrum a model may return for this transform size.
    #[inline]
    pub fn max_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Check every load-time invariant.
    pub fn validate(&self) -> Result<()> {
        if self.latent_dim == 0 {
            return Err(Error::InvalidConfig("latent_dim must be > 0".into()));
        }
        if self.win_length == 0 {
            return Err(Error::InvalidConfig("win_length must be > 0".into()));
        }
        if self.fft_size < 2 || self.fft_size % 2 != 0 {
            return Err(Error::InvalidConfig(format!(
                "fft_size must be even and >= 2, got {}",
                self.fft_size
            )));
        }
        if self.win_length > self.fft_size {
            return Err(Error::InvalidConfig(format!(
                "win_length {} exceeds fft_size {}",
                self.win_length, self.fft_size
            )));
        }
        if !self.x_max.is_finite() || !self.s_clip.is_finite() {
            return Err(Error::InvalidConfig("xMax and sClip must be finite".into()));
        }
        if self.z_range.len() != self.latent_dim {
            return Err(Error::InvalidConfig(format!(
                "zRange has {} entries, latent_dim is {}",
                self.z_range.len(),
                self.latent_dim
            )));
        }
        if let Some((dim, r)) = self.z_range.iter().enumerate().find(|(_, r)| !(r.min <= r.max)) {
            return Err(Error::InvalidConfig(format!(
                "zRange[{dim}] has min {} > max {}",
                r.min, r.max
            )));
        }
        Ok(())
    }
}
