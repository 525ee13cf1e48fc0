//! Block descriptors and registration results.

use std::fmt;
use std::ops::Range;

use dreg_core::{ImageDomain, TransformRef};
use ndarray::ArrayD;

use crate::error::{RegistrationError, Result};

/// Outcome of registering one block pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockRegStatus {
    /// Registration yielded at least a forward transform.
    Success = 0,
    /// Registration failed or was skipped.
    Failure = 1,
}

impl BlockRegStatus {
    /// Status code stored in the block status array.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Position of one block of the fixed image.
///
/// Both fields are in NumPy order (slowest axis first).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockInfo<const D: usize> {
    /// Position in the block grid, counted in blocks.
    pub chunk_index: [usize; D],
    /// Voxel ranges covered by the block.
    pub array_slice: [Range<usize>; D],
}

impl<const D: usize> BlockInfo<D> {
    pub fn new(chunk_index: [usize; D], array_slice: [Range<usize>; D]) -> Self {
        Self {
            chunk_index,
            array_slice,
        }
    }

    /// Voxel shape of the block, NumPy order.
    pub fn shape(&self) -> [usize; D] {
        std::array::from_fn(|k| self.array_slice[k].len())
    }

    /// First voxel of the block, NumPy order.
    pub fn start(&self) -> [usize; D] {
        std::array::from_fn(|k| self.array_slice[k].start)
    }

    pub fn ndim(&self) -> usize {
        D
    }
}

impl<const D: usize> fmt::Display for BlockInfo<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockInfo(chunk_index={:?}, array_slice={:?})", self.chunk_index, self.array_slice)
    }
}

/// Result of registering one fixed block to its moving counterpart.
///
/// The forward transform maps points from the space reached by the initial
/// transform into moving space, and is valid over `transform_domain`.
/// Construction enforces that:
///
/// * a transform is present if and only if its domain is present;
/// * an inverse is only present together with a forward transform;
/// * no domain is empty;
/// * a successful result carries a forward transform.
#[derive(Debug, Clone)]
pub struct BlockPairRegistrationResult<const D: usize> {
    status: BlockRegStatus,
    transform: Option<TransformRef<D>>,
    transform_domain: Option<ImageDomain<D>>,
    inv_transform: Option<TransformRef<D>>,
    inv_transform_domain: Option<ImageDomain<D>>,
}

impl<const D: usize> BlockPairRegistrationResult<D> {
    pub fn new(
        status: BlockRegStatus,
        transform: Option<TransformRef<D>>,
        transform_domain: Option<ImageDomain<D>>,
        inv_transform: Option<TransformRef<D>>,
        inv_transform_domain: Option<ImageDomain<D>>,
    ) -> Result<Self> {
        if transform.is_some() != transform_domain.is_some() {
            return Err(RegistrationError::invalid_result(
                "a forward transform and its domain must be provided together",
            ));
        }
        if inv_transform.is_some() != inv_transform_domain.is_some() {
            return Err(RegistrationError::invalid_result(
                "an inverse transform and its domain must be provided together",
            ));
        }
        if inv_transform.is_some() && transform.is_none() {
            return Err(RegistrationError::invalid_result(
                "an inverse transform requires a forward transform",
            ));
        }
        for domain in transform_domain.iter().chain(inv_transform_domain.iter()) {
            if domain.region().is_empty() {
                return Err(RegistrationError::invalid_result(format!(
                    "transform domain {} is empty",
                    domain.region()
                )));
            }
        }
        if status == BlockRegStatus::Success && transform.is_none() {
            return Err(RegistrationError::invalid_result(
                "a successful result must carry a forward transform",
            ));
        }
        Ok(Self {
            status,
            transform,
            transform_domain,
            inv_transform,
            inv_transform_domain,
        })
    }

    /// Successful result with a forward transform only.
    pub fn success(transform: TransformRef<D>, domain: ImageDomain<D>) -> Result<Self> {
        Self::new(BlockRegStatus::Success, Some(transform), Some(domain), None, None)
    }

    /// Failed result with no transforms.
    pub fn failure() -> Self {
        Self {
            status: BlockRegStatus::Failure,
            transform: None,
            transform_domain: None,
            inv_transform: None,
            inv_transform_domain: None,
        }
    }

    /// Attach an inverse transform.
    pub fn with_inverse(self, inv_transform: TransformRef<D>, domain: ImageDomain<D>) -> Result<Self> {
        Self::new(
            self.status,
            self.transform,
            self.transform_domain,
            Some(inv_transform),
            Some(domain),
        )
    }

    pub fn status(&self) -> BlockRegStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == BlockRegStatus::Success
    }

    pub fn transform(&self) -> Option<&TransformRef<D>> {
        self.transform.as_ref()
    }

    pub fn transform_domain(&self) -> Option<&ImageDomain<D>> {
        self.transform_domain.as_ref()
    }

    pub fn inv_transform(&self) -> Option<&TransformRef<D>> {
        self.inv_transform.as_ref()
    }

    pub fn inv_transform_domain(&self) -> Option<&ImageDomain<D>> {
        self.inv_transform_domain.as_ref()
    }
}

/// A block result together with the fixed block it was computed for.
#[derive(Debug, Clone)]
pub struct LocatedBlockResult<const D: usize> {
    pub fixed_info: BlockInfo<D>,
    pub result: BlockPairRegistrationResult<D>,
}

/// Transforms valid over the whole fixed image.
#[derive(Debug, Clone)]
pub struct RegistrationTransformResult<const D: usize> {
    pub transform: TransformRef<D>,
    pub inv_transform: Option<TransformRef<D>>,
}

impl<const D: usize> RegistrationTransformResult<D> {
    pub fn new(transform: TransformRef<D>) -> Self {
        Self {
            transform,
            inv_transform: None,
        }
    }

    pub fn with_inverse(mut self, inv_transform: TransformRef<D>) -> Self {
        self.inv_transform = Some(inv_transform);
        self
    }
}

/// Output of a complete registration run.
#[derive(Debug, Clone)]
pub struct RegistrationResult<const D: usize> {
    pub transforms: RegistrationTransformResult<D>,
    /// One [`BlockRegStatus`] code per block, shaped like the block grid
    /// (NumPy order).
    pub status: ArrayD<u8>,
}

impl<const D: usize> RegistrationResult<D> {
    /// Number of blocks that registered successfully.
    pub fn num_successful(&self) -> usize {
        self.status
            .iter()
            .filter(|code| **code == BlockRegStatus::Success.code())
            .count()
    }
}
