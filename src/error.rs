use thiserror::Error;

/// Errors from local mask derivation. These are never retried.
#[derive(Debug, Error)]
pub enum MaskError {
    #[error("mask dimensions {actual:?} do not match expected {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("cannot union an empty list of masks")]
    EmptyUnion,

    #[error("mask data size mismatch: expected {expected}, got {actual}")]
    DataSizeMismatch { expected: usize, actual: usize },

    #[error("invalid coordinate transform: {0}")]
    InvalidTransform(String),

    #[error("failed to encode mask: {0}")]
    Encoding(#[from] image::ImageError),
}

/// Terminal failure reasons of a remote edit.
///
/// Only `RateLimited` and `Transport` are retried by the orchestrator, and
/// they surface here once the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited by the edit service after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("request failed after {attempts} attempts: {reason}")]
    Transport { reason: String, attempts: u32 },

    #[error("the edit service returned no predictions")]
    EmptyResult,

    #[error("unrecognized response shape: {0}")]
    UnrecognizedResponseShape(String),

    #[error("failed to store edited image: {0}")]
    Persistence(String),

    #[error("edit cancelled")]
    Cancelled,
}
