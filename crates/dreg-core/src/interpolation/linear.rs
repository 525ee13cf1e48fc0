//! Linear interpolation (bilinear for 2D, trilinear for 3D).
//!
//! Two entry points share the same sampling rule: a batched tensor path used
//! by resampling, and a CPU stencil used for per-point evaluation of
//! displacement fields and similarity metrics.
//!
//! A voxel covers the half-open interval `[i - 0.5, i + 0.5)`. Positions in
//! the outer half voxel interpolate against the clamped edge voxel.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::trait_::Interpolator;
use crate::spatial::{Point, Vector};

/// Linear Interpolator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    pub fn new() -> Self {
        Self
    }

    /// Whether `index` lies within the sampled extent of a buffer of `size`
    /// voxels (ITK order).
    pub fn is_inside<const D: usize>(size: &[usize; D], index: &Point<D>) -> bool {
        (0..D).all(|k| index[k] >= -0.5 && index[k] < size[k] as f64 - 0.5)
    }

    /// Flat buffer offsets and weights of the `2^D` neighbours of `index`.
    ///
    /// The buffer is laid out with ITK axis 0 fastest. Returns `None` outside
    /// the sampled extent.
    pub fn stencil<const D: usize>(size: &[usize; D], index: &Point<D>) -> Option<Vec<(usize, f64)>> {
        if !Self::is_inside(size, index) {
            return None;
        }
        let mut lower = [0usize; D];
        let mut upper = [0usize; D];
        let mut frac = [0.0f64; D];
        let mut strides = [0usize; D];
        let mut stride = 1usize;
        for k in 0..D {
            let base = index[k].floor();
            let last = size[k] as i64 - 1;
            frac[k] = index[k] - base;
            lower[k] = (base as i64).clamp(0, last) as usize;
            upper[k] = (base as i64 + 1).clamp(0, last) as usize;
            strides[k] = stride;
            stride *= size[k];
        }

        let stencil = (0..1usize << D)
            .map(|mask| {
                let mut offset = 0usize;
                let mut weight = 1.0;
                for k in 0..D {
                    if mask >> k & 1 == 1 {
                        offset += upper[k] * strides[k];
                        weight *= frac[k];
                    } else {
                        offset += lower[k] * strides[k];
                        weight *= 1.0 - frac[k];
                    }
                }
                (offset, weight)
            })
            .collect();
        Some(stencil)
    }

    /// Sample a scalar buffer.
    pub fn evaluate<const D: usize>(values: &[f32], size: &[usize; D], index: &Point<D>) -> Option<f64> {
        let stencil = Self::stencil(size, index)?;
        Some(
            stencil
                .iter()
                .map(|(offset, weight)| values[*offset] as f64 * weight)
                .sum(),
        )
    }

    /// Sample a buffer of vectors, e.g. a displacement field.
    pub fn evaluate_vector<const D: usize>(
        values: &[Vector<D>],
        size: &[usize; D],
        index: &Point<D>,
    ) -> Option<Vector<D>> {
        let stencil = Self::stencil(size, index)?;
        let mut out = Vector::zeros();
        for (offset, weight) in stencil {
            if weight != 0.0 {
                out += values[offset] * weight;
            }
        }
        Some(out)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let shape = data.dims();
        let batch_size = indices.dims()[0];
        let device = indices.device();
        let total: usize = shape.iter().product();

        // Pre-flatten data once to avoid repeated reshaping
        let flat_data = data.clone().reshape([total]);

        // Per ITK axis k: NumPy axis D-1-k
        let mut lower = Vec::with_capacity(D);
        let mut upper = Vec::with_capacity(D);
        let mut weights = Vec::with_capacity(D);
        let mut strides = Vec::with_capacity(D);
        let mut stride = 1i32;
        for k in 0..D {
            let len = shape[D - 1 - k];
            let c = indices.clone().narrow(1, k, 1).squeeze::<1>(1);
            let c0 = c.clone().floor();
            weights.push(c - c0.clone());
            lower.push(c0.clone().clamp(0.0, (len - 1) as f64).int());
            upper.push((c0 + 1.0).clamp(0.0, (len - 1) as f64).int());
            strides.push(stride);
            stride *= len as i32;
        }

        let mut result = Tensor::<B, 1>::zeros([batch_size], &device);
        for mask in 0..1usize << D {
            let mut idx = Tensor::<B, 1, Int>::zeros([batch_size], &device);
            let mut weight = Tensor::<B, 1>::ones([batch_size], &device);
            for k in 0..D {
                if mask >> k & 1 == 1 {
                    idx = idx + upper[k].clone() * strides[k];
                    weight = weight * weights[k].clone();
                } else {
                    idx = idx + lower[k].clone() * strides[k];
                    weight = weight * (weights[k].clone().neg() + 1.0);
                }
            }
            result = result + flat_data.clone().gather(0, idx) * weight;
        }
        result
    }
}
