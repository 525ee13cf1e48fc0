//! Image type with physical metadata and coordinate transformations.
//!
//! An [`Image`] holds a voxel buffer for one region of a (possibly much
//! larger) parent image. The buffered region records where the tensor sits in
//! the parent's index space, so physical coordinates stay consistent between a
//! block and the full image it was read from.

use std::ops::Range;

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{CoreError, Result};
use crate::image::{ImageDomain, ImageRegion};
use crate::spatial::{Direction, Point, Spacing};

/// Image voxels with physical metadata.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `D` - The dimensionality of the image (2 or 3)
///
/// # Coordinate Systems
/// * **Tensor layout**: NumPy order, `[z, y, x]` for 3-D.
/// * **Index Space**: ITK order, `(i, j, k)` with `i` fastest, expressed in
///   the parent image's index space.
/// * **Physical Space**: continuous coordinates in mm or other units.
///
/// # Examples
/// ```rust
/// use dreg_core::Image;
/// use dreg_core::spatial::{Point3, Spacing3, Direction3};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(data, Point3::origin(), Spacing3::uniform(1.0), Direction3::identity())
///     .unwrap();
/// assert_eq!(image.buffered_region().size, [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    /// Voxel buffer in NumPy order.
    data: Tensor<B, D>,
    /// Grid metadata; its region is the buffered region.
    domain: ImageDomain<D>,
    /// Region of interest inside the buffer.
    requested_region: ImageRegion<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create an image whose buffer starts at index zero.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Result<Self> {
        let mut size = data.dims();
        size.reverse();
        let domain = ImageDomain::new(origin, spacing, direction, ImageRegion::from_size(size))?;
        Self::from_domain(data, domain)
    }

    /// Create an image buffering `domain.region()`. The tensor shape must
    /// equal the region size in NumPy order.
    pub fn from_domain(data: Tensor<B, D>, domain: ImageDomain<D>) -> Result<Self> {
        let expected = domain.region().numpy_shape();
        let actual = data.dims();
        if expected != actual {
            return Err(CoreError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        let requested_region = *domain.region();
        Ok(Self {
            data,
            domain,
            requested_region,
        })
    }

    /// Create an image from a flat CPU buffer laid out with ITK axis 0
    /// fastest (equivalently NumPy C order).
    pub fn from_voxels(voxels: Vec<f32>, domain: ImageDomain<D>, device: &B::Device) -> Result<Self> {
        let shape = domain.region().numpy_shape();
        let expected: usize = shape.iter().product();
        if voxels.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![voxels.len()],
            });
        }
        let data = Tensor::<B, D>::from_data(TensorData::new(voxels, Shape::new(shape)), device);
        Self::from_domain(data, domain)
    }

    /// Restrict the region of interest. The region must lie inside the
    /// buffered region.
    pub fn with_requested_region(mut self, region: ImageRegion<D>) -> Result<Self> {
        if !self.buffered_region().is_inside(&region) {
            return Err(CoreError::invalid_geometry(format!(
                "requested {} is not inside buffered {}",
                region,
                self.buffered_region()
            )));
        }
        self.requested_region = region;
        Ok(self)
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    /// Physical coordinate of index zero of the parent image.
    pub fn origin(&self) -> &Point<D> {
        self.domain.origin()
    }

    pub fn spacing(&self) -> &Spacing<D> {
        self.domain.spacing()
    }

    pub fn direction(&self) -> &Direction<D> {
        self.domain.direction()
    }

    /// Tensor shape (NumPy order).
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    pub fn buffered_region(&self) -> &ImageRegion<D> {
        self.domain.region()
    }

    pub fn requested_region(&self) -> &ImageRegion<D> {
        &self.requested_region
    }

    /// Grid metadata over the buffered region.
    pub fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    /// Convert a physical point to a continuous index in the parent image's
    /// index space: `index = (Direction · diag(spacing))⁻¹ · (point - origin)`.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        self.domain.physical_to_continuous_index(point)
    }

    /// `point = origin + Direction · (index ⊙ spacing)`.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.domain.continuous_index_to_physical(index)
    }

    /// Batch transform physical points (`[Batch, D]`) to continuous indices.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let origin_tensor = self.origin_tensor(&device);

        // I = (P - O) @ T with T = ((D·S)^-1)^T
        let inverse = self.domain.physical_to_index_matrix();
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push(inverse[(c, r)] as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(TensorData::new(t_data, Shape::new([D, D])), &device);

        (points - origin_tensor).matmul(t_tensor)
    }

    /// Batch transform continuous indices (`[Batch, D]`) to physical points.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();
        let origin_tensor = self.origin_tensor(&device);

        // P = O + I @ M with M = (D·S)^T
        let forward = self.domain.index_to_physical_matrix();
        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push(forward[(c, r)] as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(TensorData::new(m_data, Shape::new([D, D])), &device);

        indices.matmul(m_tensor) + origin_tensor
    }

    fn origin_tensor(&self, device: &B::Device) -> Tensor<B, 2> {
        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin()[i] as f32).collect();
        Tensor::<B, 1>::from_data(TensorData::new(origin_vec, Shape::new([D])), device)
            .reshape([1, D])
    }

    /// CPU copy of the voxel buffer, ITK axis 0 fastest.
    pub fn voxels(&self) -> Result<Vec<f32>> {
        self.data
            .to_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| CoreError::tensor_data(format!("{:?}", e)))
    }

    /// Whether any buffered voxel is non-zero.
    pub fn has_signal(&self) -> Result<bool> {
        Ok(self.voxels()?.iter().any(|v| *v != 0.0))
    }

    /// Copy a sub-region of the buffer into a new image with the same grid.
    pub fn extract_region(&self, region: &ImageRegion<D>) -> Result<Self> {
        let buffered = self.buffered_region();
        if !buffered.is_inside(region) {
            return Err(CoreError::invalid_geometry(format!(
                "cannot extract {} from buffered {}",
                region, buffered
            )));
        }
        let ranges: [Range<usize>; D] = std::array::from_fn(|axis| {
            let k = D - 1 - axis;
            let start = (region.index[k] - buffered.index[k]) as usize;
            start..start + region.size[k]
        });
        let data = self.data.clone().slice(ranges);
        Self::from_domain(data, self.domain.with_region(*region))
    }
}
