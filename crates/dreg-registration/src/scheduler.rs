//! Entry point of block-wise registration.
//!
//! [`register_images`] reads the fixed image metadata, subdivides the fixed
//! image into blocks and returns a [`RegistrationSchedule`]. Nothing is
//! registered until [`RegistrationSchedule::compute`] runs the map stage
//! (one [`register_subimage`] call per block) followed by the reduce stage.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use dreg_core::region::{block_to_image_region, get_target_block_region, image_to_block_region};
use dreg_core::TransformRef;
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::base::{
    BlockInfo, BlockPairRegistrationMethod, BlockPairRegistrationResult, ConstructReaderMethod, LocatedBlockResult,
    ReduceResultsMethod, RegistrationResult,
};
use crate::block::{padded_block_region, BlockGrid};
use crate::config::{ExecutionMode, RegistrationConfig};
use crate::error::{RegistrationError, Result};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::validation::validate_dimension;

/// Prepare a block-wise registration of a moving image onto a fixed image.
///
/// Only the fixed image metadata is read here.
///
/// # Arguments
/// * `fixed_reader_ctor` - Factory for readers of the fixed image.
/// * `moving_reader_ctor` - Factory for readers of the moving image.
/// * `block_registration_method` - Registers one fixed block to its moving
///   counterpart.
/// * `reduce_method` - Combines block results into one transform.
/// * `initial_transform` - Fixed-to-moving transform from earlier stages.
/// * `config` - Block size, overlap and execution mode.
/// * `device` - Device the block voxels are loaded onto.
pub fn register_images<B: Backend, const D: usize>(
    fixed_reader_ctor: Arc<dyn ConstructReaderMethod<B, D>>,
    moving_reader_ctor: Arc<dyn ConstructReaderMethod<B, D>>,
    block_registration_method: Arc<dyn BlockPairRegistrationMethod<B, D>>,
    reduce_method: Arc<dyn ReduceResultsMethod<B, D>>,
    initial_transform: TransformRef<D>,
    config: RegistrationConfig,
    device: B::Device,
) -> Result<RegistrationSchedule<B, D>> {
    info!("Preparing registration schedule");
    validate_dimension(D)?;
    let chunk_size = config.chunk_size::<D>()?;
    let overlap_factors = config.overlap::<D>()?;

    let fixed_reader = fixed_reader_ctor.construct()?;
    let fixed_blocks = BlockGrid::new(fixed_reader.domain().region().numpy_shape(), chunk_size)?;
    let block_infos: Vec<BlockInfo<D>> = fixed_blocks.iter_block_info().collect();
    debug!(
        "Subdivided the fixed image {} into {:?} blocks",
        fixed_reader.domain().region(),
        fixed_blocks.num_blocks()
    );

    Ok(RegistrationSchedule {
        fixed_reader_ctor,
        moving_reader_ctor,
        block_registration_method,
        reduce_method,
        initial_transform,
        overlap_factors,
        execution: config.execution,
        fixed_blocks,
        block_infos,
        device,
        progress: ProgressTracker::new(),
    })
}

/// A prepared registration run. The result is computed on demand.
pub struct RegistrationSchedule<B: Backend, const D: usize> {
    fixed_reader_ctor: Arc<dyn ConstructReaderMethod<B, D>>,
    moving_reader_ctor: Arc<dyn ConstructReaderMethod<B, D>>,
    block_registration_method: Arc<dyn BlockPairRegistrationMethod<B, D>>,
    reduce_method: Arc<dyn ReduceResultsMethod<B, D>>,
    initial_transform: TransformRef<D>,
    overlap_factors: [f64; D],
    execution: ExecutionMode,
    fixed_blocks: BlockGrid<D>,
    block_infos: Vec<BlockInfo<D>>,
    device: B::Device,
    progress: ProgressTracker,
}

impl<B: Backend, const D: usize> RegistrationSchedule<B, D> {
    /// Subdivision of the fixed image into registration blocks.
    pub fn fixed_blocks(&self) -> &BlockGrid<D> {
        &self.fixed_blocks
    }

    /// Blocks in the order they are registered.
    pub fn block_infos(&self) -> &[BlockInfo<D>] {
        &self.block_infos
    }

    /// Notify `callback` whenever a block finishes.
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress.add_callback(callback);
        self
    }

    /// Register every block, then reduce the block results.
    pub fn compute(&self) -> Result<RegistrationResult<D>> {
        self.progress.start(self.block_infos.len());

        let results = match self.execution {
            ExecutionMode::SingleThreaded => self.block_infos.iter().map(|info| self.run_block(info)).collect(),
            ExecutionMode::Parallel { num_threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads.unwrap_or(0))
                    .build()
                    .map_err(|e| RegistrationError::invalid_configuration(e.to_string()))?;
                pool.install(|| {
                    self.block_infos
                        .par_iter()
                        .map(|info| self.run_block(info))
                        .collect::<Vec<_>>()
                })
            }
        };

        self.finish(results).inspect_err(|e| self.progress.error(&e.to_string()))
    }

    fn run_block(&self, info: &BlockInfo<D>) -> BlockPairRegistrationResult<D> {
        let result = register_subimage(
            self.fixed_reader_ctor.as_ref(),
            self.moving_reader_ctor.as_ref(),
            self.block_registration_method.as_ref(),
            info,
            &self.initial_transform,
            &self.overlap_factors,
            &self.device,
        );
        self.progress.block_finished(&info.chunk_index, result.status());
        result
    }

    fn finish(&self, results: Vec<BlockPairRegistrationResult<D>>) -> Result<RegistrationResult<D>> {
        let status = compose_block_status_output(self.fixed_blocks.num_blocks(), &self.block_infos, &results)?;

        let located: Vec<LocatedBlockResult<D>> = self
            .block_infos
            .iter()
            .cloned()
            .zip(results)
            .map(|(fixed_info, result)| LocatedBlockResult { fixed_info, result })
            .collect();
        let transforms =
            self.reduce_method
                .reduce(&located, self.fixed_reader_ctor.as_ref(), &self.initial_transform)?;

        self.progress.complete();
        Ok(RegistrationResult { transforms, status })
    }
}

/// Register one fixed block to the physically corresponding moving block.
///
/// Never fails: every problem is logged and reported as a failed result.
pub fn register_subimage<B: Backend, const D: usize>(
    fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
    moving_reader_ctor: &dyn ConstructReaderMethod<B, D>,
    block_registration_method: &dyn BlockPairRegistrationMethod<B, D>,
    block_info: &BlockInfo<D>,
    initial_transform: &TransformRef<D>,
    overlap_factors: &[f64; D],
    device: &B::Device,
) -> BlockPairRegistrationResult<D> {
    info!("Entering block registration with {}", block_info);
    let chunk = block_info.chunk_index;
    match try_register_subimage(
        fixed_reader_ctor,
        moving_reader_ctor,
        block_registration_method,
        block_info,
        initial_transform,
        overlap_factors,
        device,
    ) {
        Ok(result) => result,
        Err(e) => {
            error!("{:?} -> {}", chunk, e);
            BlockPairRegistrationResult::failure()
        }
    }
}

fn try_register_subimage<B: Backend, const D: usize>(
    fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
    moving_reader_ctor: &dyn ConstructReaderMethod<B, D>,
    block_registration_method: &dyn BlockPairRegistrationMethod<B, D>,
    block_info: &BlockInfo<D>,
    initial_transform: &TransformRef<D>,
    overlap_factors: &[f64; D],
    device: &B::Device,
) -> Result<BlockPairRegistrationResult<D>> {
    let chunk = block_info.chunk_index;
    let (block_region, mut padded_region) = padded_block_region(block_info, overlap_factors);

    // Fixed block
    let fixed_reader = fixed_reader_ctor.construct()?;
    let fixed_largest = *fixed_reader.domain().region();
    if !padded_region.crop(&fixed_largest) || !fixed_largest.is_inside(&padded_region) {
        warn!(
            "{:?} -> Fixed padded region {} lies outside {}",
            chunk, padded_region, fixed_largest
        );
        return Ok(BlockPairRegistrationResult::failure());
    }
    debug!(
        "{:?} -> Fixed block has unpadded region {} and padded region {}",
        chunk, block_region, padded_region
    );

    let fixed_block = fixed_reader.read_region(&padded_region, device)?;
    if *fixed_block.buffered_region() != padded_region {
        warn!(
            "{:?} -> Expected fixed block buffered region {} but read {}",
            chunk,
            padded_region,
            fixed_block.buffered_region()
        );
    }
    let fixed_block = fixed_block.with_requested_region(block_region)?;

    // Corresponding moving block
    let moving_reader = moving_reader_ctor.construct()?;
    let moving_domain = moving_reader.domain().clone();
    let moving_block = get_target_block_region(
        &image_to_block_region(fixed_block.requested_region()),
        fixed_block.domain(),
        &moving_domain,
        Some(initial_transform.as_ref()),
        true,
    );
    let moving_padded_block = get_target_block_region(
        &image_to_block_region(fixed_block.buffered_region()),
        fixed_block.domain(),
        &moving_domain,
        Some(initial_transform.as_ref()),
        true,
    );
    let moving_padded_region = block_to_image_region(&moving_padded_block);
    if !moving_domain.region().is_inside(&moving_padded_region) {
        warn!(
            "{:?} -> Moving region {} lies outside largest possible region {}",
            chunk,
            moving_padded_region,
            moving_domain.region()
        );
        return Ok(BlockPairRegistrationResult::failure());
    }

    let moving_subimage = moving_reader.read_region(&moving_padded_region, device)?;
    // Rounding at the cropped fixed border may push the unpadded region one
    // voxel past the padded one.
    let mut moving_unpadded_region = block_to_image_region(&moving_block);
    if !moving_unpadded_region.crop(&moving_padded_region) {
        moving_unpadded_region = moving_padded_region;
    }
    let moving_subimage = moving_subimage.with_requested_region(moving_unpadded_region)?;
    debug!(
        "{:?} -> Moving block buffered {} requested {}",
        chunk,
        moving_subimage.buffered_region(),
        moving_subimage.requested_region()
    );

    if !moving_subimage.has_signal()? {
        warn!("{:?} -> no signal observed in moving block", chunk);
        return Ok(BlockPairRegistrationResult::failure());
    }

    match block_registration_method.register(&fixed_block, &moving_subimage, initial_transform, block_info) {
        Ok(result) => {
            info!("{:?} -> Registration completed with status {:?}", chunk, result.status());
            Ok(result)
        }
        Err(e) => {
            warn!("{:?} -> {}", chunk, e);
            Ok(BlockPairRegistrationResult::failure())
        }
    }
}

/// Arrange block status codes into an array shaped like the block grid.
///
/// # Arguments
/// * `blocks_shape` - Number of blocks along each axis, NumPy order.
/// * `block_infos` - Blocks in the same order as `results`.
/// * `results` - One result per block.
pub fn compose_block_status_output<const D: usize>(
    blocks_shape: [usize; D],
    block_infos: &[BlockInfo<D>],
    results: &[BlockPairRegistrationResult<D>],
) -> Result<ArrayD<u8>> {
    if block_infos.len() != results.len() {
        return Err(RegistrationError::ShapeMismatch {
            expected: vec![block_infos.len()],
            actual: vec![results.len()],
        });
    }
    let mut status = ArrayD::<u8>::zeros(IxDyn(&blocks_shape));
    for (info, result) in block_infos.iter().zip(results) {
        let cell = status.get_mut(IxDyn(&info.chunk_index)).ok_or_else(|| {
            RegistrationError::invalid_result(format!(
                "chunk index {:?} lies outside the block grid {:?}",
                info.chunk_index, blocks_shape
            ))
        })?;
        *cell = result.status().code();
    }
    Ok(status)
}
