//! Subdivision of the fixed image into registration blocks.
//!
//! Blocks are laid out like a chunked NumPy array: every axis is split into
//! chunks of the requested length with a shorter last chunk when the length
//! does not divide evenly. Blocks are enumerated in C order (last axis
//! fastest).

use std::ops::Range;

use dreg_core::region::get_target_block_size;
use dreg_core::{ImageDomain, ImageRegion};

use crate::base::BlockInfo;
use crate::error::{RegistrationError, Result};

/// Chunked layout of an image, NumPy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrid<const D: usize> {
    shape: [usize; D],
    chunks: [Vec<usize>; D],
}

impl<const D: usize> BlockGrid<D> {
    /// Split `shape` into blocks of at most `chunk_size` voxels per axis.
    pub fn new(shape: [usize; D], chunk_size: [usize; D]) -> Result<Self> {
        if let Some(axis) = chunk_size.iter().position(|c| *c == 0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "chunk size along axis {} must be positive",
                axis
            )));
        }
        let chunks = std::array::from_fn(|k| {
            let (len, chunk) = (shape[k], chunk_size[k]);
            let mut lengths = vec![chunk; len / chunk];
            if len % chunk != 0 {
                lengths.push(len % chunk);
            }
            lengths
        });
        Ok(Self { shape, chunks })
    }

    /// Image shape, NumPy order.
    pub fn shape(&self) -> [usize; D] {
        self.shape
    }

    /// Chunk lengths along each axis.
    pub fn chunks(&self) -> &[Vec<usize>; D] {
        &self.chunks
    }

    /// Number of blocks along each axis.
    pub fn num_blocks(&self) -> [usize; D] {
        std::array::from_fn(|k| self.chunks[k].len())
    }

    /// Total number of blocks.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Voxel ranges of the chunks along each axis.
    pub fn chunk_slices(&self) -> [Vec<Range<usize>>; D] {
        std::array::from_fn(|k| {
            let mut start = 0;
            self.chunks[k]
                .iter()
                .map(|len| {
                    let range = start..start + len;
                    start += len;
                    range
                })
                .collect()
        })
    }

    /// Every block, last axis fastest.
    pub fn iter_block_info(&self) -> impl Iterator<Item = BlockInfo<D>> + '_ {
        let slices = self.chunk_slices();
        let num_blocks = self.num_blocks();
        (0..self.len()).map(move |flat| {
            let mut chunk_index = [0usize; D];
            let mut rest = flat;
            for k in (0..D).rev() {
                chunk_index[k] = rest % num_blocks[k];
                rest /= num_blocks[k];
            }
            let array_slice = std::array::from_fn(|k| slices[k][chunk_index[k]].clone());
            BlockInfo::new(chunk_index, array_slice)
        })
    }

    /// Chunk another image so that its blocks cover about the same physical
    /// extent as this grid's blocks.
    ///
    /// `source` is the geometry of the image this grid chunks and `target`
    /// the geometry of the image of `target_shape` (NumPy order) to chunk.
    /// The first chunk along each axis sets the physical block size.
    pub fn rechunk_to_physical(
        &self,
        source: &ImageDomain<D>,
        target_shape: [usize; D],
        target: &ImageDomain<D>,
    ) -> Result<Self> {
        let itk_chunk: [usize; D] =
            std::array::from_fn(|k| self.chunks[D - 1 - k].first().copied().unwrap_or(1));
        let itk_target_chunk = get_target_block_size(itk_chunk, source, target);
        // A target voxel coarser than the whole source chunk still gets one voxel.
        let target_chunk = std::array::from_fn(|k| itk_target_chunk[D - 1 - k].max(1));
        Self::new(target_shape, target_chunk)
    }
}

/// Voxels added on each side of a block: `ceil(len * factor / 2)` per axis,
/// NumPy order.
pub fn block_padding<const D: usize>(shape: [usize; D], overlap_factors: &[f64; D]) -> [usize; D] {
    std::array::from_fn(|k| (shape[k] as f64 * overlap_factors[k] * 0.5).ceil().max(0.0) as usize)
}

/// Unpadded and padded regions of a block, ITK order.
///
/// The padded region may reach outside the image; callers crop it.
pub fn padded_block_region<const D: usize>(
    info: &BlockInfo<D>,
    overlap_factors: &[f64; D],
) -> (ImageRegion<D>, ImageRegion<D>) {
    let start = info.start();
    let shape = info.shape();
    let padding = block_padding(shape, overlap_factors);

    let block = ImageRegion::new(
        std::array::from_fn(|k| start[D - 1 - k] as i64),
        std::array::from_fn(|k| shape[D - 1 - k]),
    );
    let padded = block.padded(std::array::from_fn(|k| padding[D - 1 - k]));
    (block, padded)
}
