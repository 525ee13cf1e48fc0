//! Transform trait for spatial coordinate transformations.

use std::fmt;
use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nalgebra::SMatrix;

use crate::error::{CoreError, Result};
use crate::spatial::{Point, Vector};

/// Maps points from one physical space to another.
///
/// Transforms are evaluated on the CPU in double precision; block results
/// are shared between worker threads, so every transform is `Send + Sync`.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality (2 or 3)
pub trait Transform<const D: usize>: Send + Sync + fmt::Debug {
    /// Apply the transform to a single physical point.
    fn transform_point(&self, point: &Point<D>) -> Point<D>;

    /// Get the inverse transform (if available).
    fn inverse(&self) -> Option<TransformRef<D>> {
        None
    }

    /// Affine representation `p' = A·p + t`, when one exists.
    fn matrix_offset(&self) -> Option<(SMatrix<f64, D, D>, Vector<D>)> {
        None
    }

    /// Short type name used in log messages.
    fn name(&self) -> &'static str;
}

/// Shared, thread-safe handle to a transform.
pub type TransformRef<const D: usize> = Arc<dyn Transform<D>>;

/// Apply a transform to a batch of points stored in a `[Batch, D]` tensor.
pub fn transform_points_tensor<B: Backend, const D: usize>(
    transform: &dyn Transform<D>,
    points: Tensor<B, 2>,
) -> Result<Tensor<B, 2>> {
    let [batch, dim] = points.dims();
    if dim != D {
        return Err(CoreError::ShapeMismatch {
            expected: vec![batch, D],
            actual: vec![batch, dim],
        });
    }
    let device = points.device();
    let values = points
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| CoreError::tensor_data(format!("{:?}", e)))?;

    let mut out = Vec::with_capacity(values.len());
    for row in values.chunks_exact(D) {
        let mut p = Point::<D>::origin();
        for k in 0..D {
            p[k] = row[k] as f64;
        }
        let q = transform.transform_point(&p);
        out.extend((0..D).map(|k| q[k] as f32));
    }
    Ok(Tensor::<B, 2>::from_data(
        TensorData::new(out, Shape::new([batch, D])),
        &device,
    ))
}
