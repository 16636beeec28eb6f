//! Error types for resynth-core.

use thiserror::Error;

/// Errors from overlap-add buffer operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlaError {
    #[error("Frame too short: need {needed} samples, got {got}")]
    FrameTooShort { needed: usize, got: usize },

    #[error("Window length must be non-zero")]
    EmptyWindow,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, OlaError>;
