//! In-memory image readers.
//!
//! Useful when the image already fits in memory or was produced by an
//! earlier processing stage. The voxel buffer is shared between readers and
//! every `read_region` copies only the requested region.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use dreg_core::{Image, ImageDomain, ImageRegion};
use dreg_registration::base::BoxedImageReader;
use dreg_registration::{ConstructReaderMethod, ImageReader, RegistrationError};
use tracing::debug;

/// Factory for readers over a shared CPU voxel buffer.
#[derive(Debug, Clone)]
pub struct MemoryReaderFactory<const D: usize> {
    voxels: Arc<Vec<f32>>,
    domain: ImageDomain<D>,
}

impl<const D: usize> MemoryReaderFactory<D> {
    /// `voxels` holds one value per voxel of `domain.region()`, ITK axis 0
    /// fastest.
    pub fn new(voxels: Vec<f32>, domain: ImageDomain<D>) -> Result<Self> {
        let expected = domain.region().number_of_pixels();
        if voxels.len() != expected {
            bail!(
                "Voxel buffer holds {} values but {} needs {}",
                voxels.len(),
                domain.region(),
                expected
            );
        }
        Ok(Self {
            voxels: Arc::new(voxels),
            domain,
        })
    }

    /// Copy the buffered voxels of `image`. The buffered region becomes the
    /// largest possible region of the readers.
    pub fn from_image<B: Backend>(image: &Image<B, D>) -> Result<Self> {
        let voxels = image.voxels().context("Failed to copy image voxels")?;
        Self::new(voxels, image.domain().clone())
    }

    pub fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    /// A reader sharing this factory's buffer.
    pub fn reader(&self) -> MemoryReader<D> {
        MemoryReader {
            voxels: Arc::clone(&self.voxels),
            domain: self.domain.clone(),
        }
    }
}

impl<B: Backend, const D: usize> ConstructReaderMethod<B, D> for MemoryReaderFactory<D> {
    fn construct(&self) -> dreg_registration::Result<BoxedImageReader<B, D>> {
        Ok(Box::new(self.reader()))
    }
}

/// Reader over a shared voxel buffer.
#[derive(Debug, Clone)]
pub struct MemoryReader<const D: usize> {
    voxels: Arc<Vec<f32>>,
    domain: ImageDomain<D>,
}

impl<const D: usize> MemoryReader<D> {
    fn copy_region(&self, region: &ImageRegion<D>) -> Result<Vec<f32>> {
        let full = self.domain.region();
        if !full.is_inside(region) {
            bail!("Requested {} is not inside {}", region, full);
        }
        let mut out = Vec::with_capacity(region.number_of_pixels());
        // Rows along ITK axis 0 are contiguous in both buffers.
        let row = region.size[0];
        for r in 0..region.number_of_pixels() / row {
            let mut index = region.index;
            let mut rest = r;
            for k in 1..D {
                index[k] += (rest % region.size[k]) as i64;
                rest /= region.size[k];
            }
            let start = full
                .offset_of(&index)
                .with_context(|| format!("Index {:?} lies outside {}", index, full))?;
            out.extend_from_slice(&self.voxels[start..start + row]);
        }
        Ok(out)
    }
}

impl<B: Backend, const D: usize> ImageReader<B, D> for MemoryReader<D> {
    fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    fn read_region(&self, region: &ImageRegion<D>, device: &B::Device) -> dreg_registration::Result<Image<B, D>> {
        debug!("Copying {} from memory", region);
        let voxels = self
            .copy_region(region)
            .map_err(|e| RegistrationError::reader(format!("{:#}", e)))?;
        Ok(Image::from_voxels(voxels, self.domain.with_region(*region), device)?)
    }
}
