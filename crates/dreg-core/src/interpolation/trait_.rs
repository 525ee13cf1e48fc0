//! Interpolator trait for sampling values at continuous coordinates.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Samples a voxel tensor at continuous indices.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from `data` (NumPy order) at `indices`.
    ///
    /// `indices` has shape `[Batch, D]` and holds buffer-local continuous
    /// indices in ITK order. Returns the sampled values `[Batch]`.
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
