//! Error taxonomy for the preprocessing pipeline.
//!
//! Parameter validation happens eagerly at the top of each entry point, so
//! every expensive stage (reconstruction, FFT, wavelet work) only runs on
//! inputs that already passed the cheap checks.

use thiserror::Error;

/// Errors raised by the preprocessing stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocError {
    /// A caller-supplied parameter is out of range or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested wavelet decomposition depth exceeds what the slice
    /// dimensions support.
    #[error("decomposition too deep: requested {requested} levels, slice supports {max_supported}")]
    DecompositionTooDeep {
        requested: usize,
        max_supported: usize,
    },

    /// A numeric precondition collapsed, e.g. an empty histogram range.
    #[error("numerically degenerate input: {0}")]
    NumericDegenerate(String),

    /// The external reconstruction operator failed.
    #[error("reconstruction failed: {0}")]
    Reconstruction(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PreprocError>;
