//! Shared fixtures: an in-memory image reader and counting or recording mock
//! methods.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use burn::tensor::backend::Backend;
use dreg_core::transform::IdentityTransform;
use dreg_core::{Image, ImageDomain, ImageRegion, TransformRef};
use dreg_registration::base::BoxedImageReader;
use dreg_registration::{
    BlockInfo, BlockPairRegistrationMethod, BlockPairRegistrationResult, ConstructReaderMethod, ImageReader,
    LocatedBlockResult, ReduceResultsMethod, RegistrationError, RegistrationTransformResult, Result,
};

pub struct VecReader<const D: usize> {
    voxels: Arc<Vec<f32>>,
    domain: ImageDomain<D>,
}

impl<B: Backend, const D: usize> ImageReader<B, D> for VecReader<D> {
    fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    fn read_region(&self, region: &ImageRegion<D>, device: &B::Device) -> Result<Image<B, D>> {
        let full = self.domain.region();
        if !full.is_inside(region) {
            return Err(RegistrationError::reader(format!("{} is outside {}", region, full)));
        }
        let mut out = Vec::with_capacity(region.number_of_pixels());
        for flat in 0..region.number_of_pixels() {
            let mut index = region.index;
            let mut rest = flat;
            for k in 0..D {
                index[k] += (rest % region.size[k]) as i64;
                rest /= region.size[k];
            }
            let offset = full
                .offset_of(&index)
                .ok_or_else(|| RegistrationError::reader("index outside image"))?;
            out.push(self.voxels[offset]);
        }
        Ok(Image::from_voxels(out, self.domain.with_region(*region), device)?)
    }
}

/// Reader factory over a voxel buffer laid out with ITK axis 0 fastest.
pub fn reader_ctor<B: Backend, const D: usize>(
    voxels: Vec<f32>,
    domain: ImageDomain<D>,
) -> Arc<dyn ConstructReaderMethod<B, D>> {
    let voxels = Arc::new(voxels);
    Arc::new(move || -> Result<BoxedImageReader<B, D>> {
        Ok(Box::new(VecReader {
            voxels: voxels.clone(),
            domain: domain.clone(),
        }))
    })
}

pub fn unit_domain<const D: usize>(size: [usize; D]) -> ImageDomain<D> {
    ImageDomain::with_size(size)
}

/// Voxels of `f` evaluated at every index, ITK axis 0 fastest.
pub fn sample<const D: usize>(size: [usize; D], f: impl Fn([usize; D]) -> f32) -> Vec<f32> {
    let n: usize = size.iter().product();
    (0..n)
        .map(|flat| {
            let mut rest = flat;
            let index = std::array::from_fn(|k| {
                let i = rest % size[k];
                rest /= size[k];
                i
            });
            f(index)
        })
        .collect()
}

pub fn identity<const D: usize>() -> TransformRef<D> {
    Arc::new(IdentityTransform::<D>::new())
}

/// Returns a successful identity result for every block and counts calls.
#[derive(Default)]
pub struct CountingBlockPairRegistrationMethod {
    pub num_calls: AtomicUsize,
}

impl CountingBlockPairRegistrationMethod {
    pub fn calls(&self) -> usize {
        self.num_calls.load(Ordering::SeqCst)
    }
}

impl<B: Backend, const D: usize> BlockPairRegistrationMethod<B, D> for CountingBlockPairRegistrationMethod {
    fn register(
        &self,
        fixed_subimage: &Image<B, D>,
        _moving_subimage: &Image<B, D>,
        _initial_transform: &TransformRef<D>,
        _block_info: &BlockInfo<D>,
    ) -> Result<BlockPairRegistrationResult<D>> {
        self.num_calls.fetch_add(1, Ordering::SeqCst);
        BlockPairRegistrationResult::success(identity(), fixed_subimage.domain().clone())
    }
}

/// Always fails with an error.
pub struct FailingBlockPairRegistrationMethod;

impl<B: Backend, const D: usize> BlockPairRegistrationMethod<B, D> for FailingBlockPairRegistrationMethod {
    fn register(
        &self,
        _fixed_subimage: &Image<B, D>,
        _moving_subimage: &Image<B, D>,
        _initial_transform: &TransformRef<D>,
        _block_info: &BlockInfo<D>,
    ) -> Result<BlockPairRegistrationResult<D>> {
        Err(RegistrationError::block_registration("always fails"))
    }
}

/// Returns the identity and counts calls and received blocks.
#[derive(Default)]
pub struct CountingReduceResultsMethod {
    pub num_calls: AtomicUsize,
    pub num_blocks: AtomicUsize,
}

impl CountingReduceResultsMethod {
    pub fn calls(&self) -> usize {
        self.num_calls.load(Ordering::SeqCst)
    }
}

impl<B: Backend, const D: usize> ReduceResultsMethod<B, D> for CountingReduceResultsMethod {
    fn reduce(
        &self,
        block_results: &[LocatedBlockResult<D>],
        _fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
        _initial_transform: &TransformRef<D>,
    ) -> Result<RegistrationTransformResult<D>> {
        self.num_calls.fetch_add(1, Ordering::SeqCst);
        self.num_blocks.store(block_results.len(), Ordering::SeqCst);
        Ok(RegistrationTransformResult::new(identity()))
    }
}

/// Regions of one block pair as handed to a block method.
#[derive(Debug, Clone, Copy)]
pub struct BlockPairRegions<const D: usize> {
    pub fixed_buffered: ImageRegion<D>,
    pub fixed_requested: ImageRegion<D>,
    pub moving_buffered: ImageRegion<D>,
    pub moving_requested: ImageRegion<D>,
}

/// Returns a successful identity result and records the regions it received.
#[derive(Default)]
pub struct RecordingBlockPairRegistrationMethod<const D: usize> {
    pub records: Mutex<Vec<BlockPairRegions<D>>>,
}

impl<B: Backend, const D: usize> BlockPairRegistrationMethod<B, D> for RecordingBlockPairRegistrationMethod<D> {
    fn register(
        &self,
        fixed_subimage: &Image<B, D>,
        moving_subimage: &Image<B, D>,
        _initial_transform: &TransformRef<D>,
        _block_info: &BlockInfo<D>,
    ) -> Result<BlockPairRegistrationResult<D>> {
        self.records.lock().unwrap().push(BlockPairRegions {
            fixed_buffered: *fixed_subimage.buffered_region(),
            fixed_requested: *fixed_subimage.requested_region(),
            moving_buffered: *moving_subimage.buffered_region(),
            moving_requested: *moving_subimage.requested_region(),
        });
        BlockPairRegistrationResult::success(identity(), fixed_subimage.domain().clone())
    }
}
