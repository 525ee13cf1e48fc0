//! Error types for block registration and reduction.

use dreg_core::CoreError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Geometry, transform or resampling failure in the core types.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An image reader could not be constructed or failed to stream voxels.
    #[error("Reader error: {0}")]
    ReaderError(String),

    /// Error in transform operation.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// A block result violates the result invariants.
    #[error("Invalid block result: {0}")]
    InvalidResult(String),

    /// Block-pair registration did not produce an acceptable estimate.
    #[error("Block registration failed: {0}")]
    BlockRegistrationFailed(String),

    /// Reduction could not produce a transform.
    #[error("Reduction error: {0}")]
    ReductionError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Dimension mismatch.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a reader error.
    pub fn reader(msg: impl Into<String>) -> Self {
        Self::ReaderError(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Create an invalid result error.
    pub fn invalid_result(msg: impl Into<String>) -> Self {
        Self::InvalidResult(msg.into())
    }

    /// Create a block registration failure.
    pub fn block_registration(msg: impl Into<String>) -> Self {
        Self::BlockRegistrationFailed(msg.into())
    }

    /// Create a reduction error.
    pub fn reduction(msg: impl Into<String>) -> Self {
        Self::ReductionError(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }
}
