//! Extension points of the block registration framework.
//!
//! A registration run is configured through three kinds of extension point:
//!
//! 1. [`ConstructReaderMethod`] for the fixed image and for the moving image.
//!    Every block task constructs its own reader so that only the block
//!    currently being registered is held in memory.
//! 2. [`BlockPairRegistrationMethod`] registers one fixed block to its
//!    moving counterpart.
//! 3. [`ReduceResultsMethod`] combines the block results into a single
//!    transform valid over the whole fixed image.

use burn::tensor::backend::Backend;
use dreg_core::{Image, ImageDomain, ImageRegion, TransformRef};

use super::result::{BlockInfo, BlockPairRegistrationResult, LocatedBlockResult, RegistrationTransformResult};
use crate::error::Result;

/// Streaming access to an image stored outside memory.
pub trait ImageReader<B: Backend, const D: usize> {
    /// Image metadata. The domain's region is the largest possible region;
    /// no voxels are read.
    fn domain(&self) -> &ImageDomain<D>;

    /// Read the voxels of `region`, which must lie inside [`Self::domain`].
    ///
    /// The returned image buffers exactly `region` and keeps the index space
    /// of the full image.
    fn read_region(&self, region: &ImageRegion<D>, device: &B::Device) -> Result<Image<B, D>>;
}

/// Owned reader trait object.
pub type BoxedImageReader<B, const D: usize> = Box<dyn ImageReader<B, D>>;

/// Factory for fresh, unbuffered image readers.
///
/// Any `Fn() -> Result<BoxedImageReader<B, D>>` closure is a reader factory.
pub trait ConstructReaderMethod<B: Backend, const D: usize>: Send + Sync {
    fn construct(&self) -> Result<BoxedImageReader<B, D>>;
}

impl<B, F, const D: usize> ConstructReaderMethod<B, D> for F
where
    B: Backend,
    F: Fn() -> Result<BoxedImageReader<B, D>> + Send + Sync,
{
    fn construct(&self) -> Result<BoxedImageReader<B, D>> {
        self()
    }
}

/// Registers one fixed block to the physically corresponding moving block.
pub trait BlockPairRegistrationMethod<B: Backend, const D: usize>: Send + Sync {
    /// # Arguments
    /// * `fixed_subimage` - Fixed voxels over the padded block; the requested
    ///   region is the unpadded block.
    /// * `moving_subimage` - Moving voxels over the padded block mapped
    ///   through `initial_transform`; the requested region is the mapped
    ///   unpadded block.
    /// * `initial_transform` - Fixed-to-moving transform from earlier stages.
    /// * `block_info` - Position of the fixed block.
    ///
    /// # Returns
    /// A forward transform that maps points already mapped by
    /// `initial_transform` into moving space, together with its domain.
    fn register(
        &self,
        fixed_subimage: &Image<B, D>,
        moving_subimage: &Image<B, D>,
        initial_transform: &TransformRef<D>,
        block_info: &BlockInfo<D>,
    ) -> Result<BlockPairRegistrationResult<D>>;
}

/// Combines block results into one transform valid over the fixed image.
pub trait ReduceResultsMethod<B: Backend, const D: usize>: Send + Sync {
    fn reduce(
        &self,
        block_results: &[LocatedBlockResult<D>],
        fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
        initial_transform: &TransformRef<D>,
    ) -> Result<RegistrationTransformResult<D>>;
}
