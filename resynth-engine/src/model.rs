//! Model boundary: latent vector in, magnitude spectrum out.
//!
//! The engine never looks inside a model. Anything that can fill a magnitude
//! frame from a latent slice implements [`SpectrumModel`], including plain
//! closures, so the engine builds and tests without an inference runtime.
//!
//! [`DenseDecoder`] is a small built-in backend (one affine layer + sigmoid)
//! loaded from JSON, enough to drive the CLI and C ABI end to end.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::error::{Error, Result};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("expected latent of {expected} components, got {got}")]
    LatentSize { expected: usize, got: usize },

    #[error("{0}")]
    Backend(String),
}

/// Maps a latent vector to a normalized magnitude spectrum.
///
/// `predict` overwrites `spectrum` (clear + fill). Implementations should reuse
/// its capacity so steady-state calls do not allocate. The number of bins must
/// stay the same across calls.
pub trait SpectrumModel: Send {
    fn predict(&mut self, latent: &[f32], spectrum: &mut Vec<f32>) -> std::result::Result<(), ModelError>;
}

impl<F> SpectrumModel for F
where
    F: FnMut(&[f32], &mut Vec<f32>) + Send,
{
    #[inline]
    fn predict(&mut self, latent: &[f32], spectrum: &mut Vec<f32>) -> std::result::Result<(), ModelError> {
        self(latent, spectrum);
        Ok(())
    }
}

/// Run the model once on `latent` and return the spectrum length it produces.
///
/// This fixes `rfft_size` for the session; `spectrum` keeps the warmed-up capacity.
pub fn measure_spectrum_size<M: SpectrumModel + ?Sized>(
    model: &mut M,
    latent: &[f32],
    spectrum: &mut Vec<f32>,
) -> Result<usize> {
    model.predict(latent, spectrum)?;
    if spectrum.is_empty() {
        return Err(Error::ModelLoad("model produced an empty spectrum".into()));
    }
    Ok(spectrum.len())
}

// ---------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DenseDecoderFile {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// `out[j] = sigmoid(bias[j] + Σ_i weights[j][i] · z[i])`
#[derive(Clone, Debug)]
pub struct DenseDecoder {
    /// Row-major `[bins × latent_dim]`.
    weights: Vec<f32>,
    bias: Vec<f32>,
    latent_dim: usize,
}

impl DenseDecoder {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::ModelLoad("decoder has no output rows".into()));
        }
        if weights.len() != bias.len() {
            return Err(Error::ModelLoad(format!(
                "decoder has {} rows but {} biases",
                weights.len(),
                bias.len()
            )));
        }
        let latent_dim = weights[0].len();
        if latent_dim == 0 {
            return Err(Error::ModelLoad("decoder rows are empty".into()));
        }
        if let Some(j) = weights.iter().position(|row| row.len() != latent_dim) {
            return Err(Error::ModelLoad(format!(
                "decoder row {j} has {} columns, expected {latent_dim}",
                weights[j].len()
            )));
        }
        Ok(Self { weights: weights.concat(), bias, latent_dim })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let file: DenseDecoderFile = serde_json::from_str(s)?;
        Self::new(file.weights, file.bias)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::ModelLoad(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    #[inline] pub fn latent_dim(&self) -> usize { self.latent_dim }
    #[inline] pub fn bins(&self) -> usize { self.bias.len() }
}

impl SpectrumModel for DenseDecoder {
    fn predict(&mut self, latent: &[f32], spectrum: &mut Vec<f32>) -> std::result::Result<(), ModelError> {
        if latent.len() != self.latent_dim {
            return Err(ModelError::LatentSize { expected: self.latent_dim, got: latent.len() });
        }
        spectrum.clear();
        spectrum.extend(
            self.weights
                .chunks_exact(self.latent_dim)
                .zip(self.bias.iter())
                .map(|(row, b)| {
                    let acc = row.iter().zip(latent).fold(*b, |acc, (w, z)| acc + w * z);
                    sigmoid(acc)
                }),
        );
        Ok(())
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
