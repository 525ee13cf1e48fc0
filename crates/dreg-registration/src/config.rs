//! Registration run configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validation::{validate_chunk_size, validate_overlap_factors};

/// Default block length along every axis.
pub const DEFAULT_CHUNK_LENGTH: usize = 256;

/// How block registrations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Blocks are registered one after another on the calling thread.
    #[default]
    SingleThreaded,
    /// Blocks are registered on a dedicated rayon pool. `None` uses one
    /// thread per core.
    Parallel { num_threads: Option<usize> },
}

/// Configuration of a registration run.
///
/// Chunk sizes and overlap factors are in NumPy order (slowest axis first).
///
/// # Examples
/// ```rust
/// use dreg_registration::config::{ExecutionMode, RegistrationConfig};
///
/// let config = RegistrationConfig::new()
///     .with_chunk_size(vec![64, 64, 64])
///     .with_overlap_factors(vec![0.1, 0.1, 0.1])
///     .with_execution(ExecutionMode::Parallel { num_threads: Some(4) });
/// assert_eq!(config.chunk_size::<3>().unwrap(), [64, 64, 64]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Block size in voxels. Defaults to 256 along every axis.
    pub fixed_chunk_size: Option<Vec<usize>>,
    /// Total overlap along each axis as a fraction of the block length,
    /// split evenly between both sides. Defaults to no overlap.
    pub overlap_factors: Option<Vec<f64>>,
    pub execution: ExecutionMode,
}

impl RegistrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: Vec<usize>) -> Self {
        self.fixed_chunk_size = Some(chunk_size);
        self
    }

    pub fn with_overlap_factors(mut self, overlap_factors: Vec<f64>) -> Self {
        self.overlap_factors = Some(overlap_factors);
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Register blocks on a rayon pool with `num_threads` workers.
    pub fn parallel(self, num_threads: usize) -> Self {
        self.with_execution(ExecutionMode::Parallel {
            num_threads: Some(num_threads),
        })
    }

    /// Validated chunk size for a `D`-dimensional image.
    pub fn chunk_size<const D: usize>(&self) -> Result<[usize; D]> {
        match &self.fixed_chunk_size {
            Some(chunk_size) => {
                validate_chunk_size(chunk_size, D)?;
                Ok(std::array::from_fn(|k| chunk_size[k]))
            }
            None => Ok([DEFAULT_CHUNK_LENGTH; D]),
        }
    }

    /// Validated overlap factors for a `D`-dimensional image.
    pub fn overlap<const D: usize>(&self) -> Result<[f64; D]> {
        match &self.overlap_factors {
            Some(factors) => {
                validate_overlap_factors(factors, D)?;
                Ok(std::array::from_fn(|k| factors[k]))
            }
            None => Ok([0.0; D]),
        }
    }
}
