//! Error taxonomy shared by every pipeline stage.
//!
//! The pipeline is a deterministic single-pass computation, so there are no
//! retryable variants: callers react by changing configuration or inputs.

use thiserror::Error;

/// Errors surfaced by the stitching pipeline.
#[derive(Debug, Error)]
pub enum StitchError {
    /// A stage was invoked before its predecessor populated its inputs.
    #[error("unready state: {0}")]
    UnreadyState(&'static str),

    /// Fewer than two images survived selection, or a required pair has no
    /// usable correspondences.
    #[error("insufficient overlap: {0}")]
    InsufficientOverlap(String),

    /// Camera estimation or cropping could not produce valid geometry.
    #[error("geometric degeneracy: {0}")]
    GeometricDegeneracy(String),

    /// Unsupported algorithm-variant combination requested at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Image decode/encode or filesystem failure.
    #[error("i/o error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, StitchError>;
