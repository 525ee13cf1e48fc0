//! Resample image filter.
//!
//! Resamples an image onto a new voxel grid by mapping every output voxel
//! through a transform into the input image and interpolating there.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use tracing::debug;

use crate::error::Result;
use crate::image::{generate_grid, Image, ImageDomain};
use crate::interpolation::{Interpolator, LinearInterpolator};
use crate::transform::{transform_points_tensor, IdentityTransform, TransformRef};

/// Resample image filter.
///
/// The transform maps from output physical space to input physical space.
/// For registration this is the fixed-to-moving transform, so resampling the
/// moving image onto the fixed grid brings it into alignment.
///
/// # Type Parameters
/// * `I` - The interpolator type
/// * `D` - The dimensionality (2 or 3)
#[derive(Debug, Clone)]
pub struct ResampleImageFilter<I, const D: usize> {
    output: ImageDomain<D>,
    transform: TransformRef<D>,
    interpolator: I,
    default_pixel_value: f64,
}

impl<const D: usize> ResampleImageFilter<LinearInterpolator, D> {
    /// Resample onto `output` with linear interpolation.
    pub fn new(output: ImageDomain<D>, transform: TransformRef<D>) -> Self {
        Self::with_interpolator(output, transform, LinearInterpolator::new())
    }

    /// Resample onto the buffered grid of `reference`.
    pub fn new_from_reference<B: Backend>(reference: &Image<B, D>, transform: TransformRef<D>) -> Self {
        Self::new(reference.domain().clone(), transform)
    }

    /// Identity resampling onto `output`.
    pub fn onto(output: ImageDomain<D>) -> Self {
        Self::new(output, Arc::new(IdentityTransform::<D>::new()))
    }
}

impl<I, const D: usize> ResampleImageFilter<I, D> {
    pub fn with_interpolator(output: ImageDomain<D>, transform: TransformRef<D>, interpolator: I) -> Self {
        Self {
            output,
            transform,
            interpolator,
            default_pixel_value: 0.0,
        }
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    pub fn output_domain(&self) -> &ImageDomain<D> {
        &self.output
    }

    /// Apply filter to an input image.
    pub fn apply<B: Backend>(&self, input: &Image<B, D>) -> Result<Image<B, D>>
    where
        I: Interpolator<B>,
    {
        self.apply_with_mask(input).map(|(image, _)| image)
    }

    /// Apply filter and also return the sampling mask: 1.0 where the output
    /// voxel maps inside the input buffer, 0.0 where the default value was
    /// used.
    pub fn apply_with_mask<B: Backend>(&self, input: &Image<B, D>) -> Result<(Image<B, D>, Image<B, D>)>
    where
        I: Interpolator<B>,
    {
        let device = input.data().device();
        let region = *self.output.region();
        let shape = region.numpy_shape();
        debug!(
            "Resampling {} input onto {} with {}",
            input.buffered_region(),
            region,
            self.transform.name()
        );

        // 1. Output voxel indices -> output physical points
        let output_indices = generate_grid::<B, D>(shape, region.index, &device);
        let output_points = self.indices_to_physical(output_indices, &device);

        // 2. Output space -> input space
        let input_points = transform_points_tensor(self.transform.as_ref(), output_points)?;

        // 3. Input physical points -> buffer-local continuous indices
        let buffer_offset: Vec<f32> = input
            .buffered_region()
            .index
            .iter()
            .map(|i| *i as f32)
            .collect();
        let buffer_offset = Tensor::<B, 1>::from_data(TensorData::new(buffer_offset, Shape::new([D])), &device)
            .reshape([1, D]);
        let input_indices = input.world_to_index_tensor(input_points) - buffer_offset;

        // 4. Interpolate and fill everything outside the input extent
        let inside = self.inside_mask(input_indices.clone(), &input.buffered_region().size);
        let sampled = self.interpolator.interpolate(input.data(), input_indices);
        let outside = inside.clone().neg() + 1.0;
        let values = sampled * inside.clone() + outside * self.default_pixel_value;

        let image = Image::from_domain(values.reshape(shape), self.output.clone())?;
        let mask = Image::from_domain(inside.reshape(shape), self.output.clone())?;
        Ok((image, mask))
    }

    fn indices_to_physical<B: Backend>(&self, indices: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
        // point = origin + index @ (Direction · diag(spacing))^T
        let origin_vec: Vec<f32> = (0..D).map(|i| self.output.origin()[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(TensorData::new(origin_vec, Shape::new([D])), device)
            .reshape([1, D]);

        let forward = self.output.index_to_physical_matrix();
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push(forward[(c, r)] as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([D, D])), device);

        indices.matmul(m_tensor) + origin_tensor
    }

    /// 1.0 where every coordinate lies in `[-0.5, size - 0.5)`, else 0.0.
    fn inside_mask<B: Backend>(&self, indices: Tensor<B, 2>, size: &[usize; D]) -> Tensor<B, 1> {
        let [batch, _] = indices.dims();
        let mut mask = Tensor::<B, 1>::ones([batch], &indices.device());
        for (k, len) in size.iter().enumerate() {
            let c = indices.clone().narrow(1, k, 1).squeeze::<1>(1);
            let above = c.clone().greater_equal_elem(-0.5).float();
            let below = c.lower_elem(*len as f64 - 0.5).float();
            mask = mask * above * below;
        }
        mask
    }
}
