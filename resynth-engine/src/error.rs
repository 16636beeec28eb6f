//! Error types for the resynthesis engine.

use thiserror::Error;

use crate::model::ModelError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Model(#[from] ModelError),

    #[error("Spectrum size changed: expected {expected} bins, got {got}")]
    SpectrumSize { expected: usize, got: usize },

    #[error("Invalid track index {index} (trajectory has {count} tracks)")]
    InvalidTrack { index: usize, count: usize },

    #[error("Invalid latent dimension {dim} (latent size is {latent_dim})")]
    InvalidDimension { dim: usize, latent_dim: usize },

    #[error("Inverse FFT failed: {0}")]
    Transform(String),

    #[error("Overlap-add error: {0}")]
    Ola(#[from] resynth_core::OlaError),
}
