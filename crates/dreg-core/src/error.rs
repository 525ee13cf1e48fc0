//! Error types for geometry, transform and resampling operations.

use thiserror::Error;

/// Error type for core spatial operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Spatial metadata cannot describe a valid voxel grid.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A point could not be mapped by a transform.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// Tensor data could not be read back from the backend.
    #[error("Tensor data error: {0}")]
    TensorData(String),

    /// Shape mismatch between a buffer and its region.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Create a tensor data error.
    pub fn tensor_data(msg: impl Into<String>) -> Self {
        Self::TensorData(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_geometry("zero spacing");
        assert_eq!(err.to_string(), "Invalid geometry: zero spacing");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CoreError::ShapeMismatch {
            expected: vec![4, 4],
            actual: vec![2, 2],
        };
        assert!(err.to_string().contains("expected [4, 4]"));
    }
}
