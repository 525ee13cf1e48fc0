//! Displacement field transform implementation.
//!
//! A dense field of displacement vectors sampled on a voxel grid. Points are
//! moved by the linearly interpolated displacement at their location; points
//! outside the grid are not moved.

use super::trait_::Transform;
use crate::error::{CoreError, Result};
use crate::image::ImageDomain;
use crate::interpolation::LinearInterpolator;
use crate::spatial::{Point, Vector};

/// Dense displacement field transform.
///
/// T(x) = x + u(x)
#[derive(Debug, Clone)]
pub struct DisplacementFieldTransform<const D: usize> {
    domain: ImageDomain<D>,
    /// One vector per voxel of `domain.region()`, ITK axis 0 fastest.
    displacements: Vec<Vector<D>>,
}

impl<const D: usize> DisplacementFieldTransform<D> {
    /// Create a field. `displacements` must hold one vector per voxel.
    pub fn new(domain: ImageDomain<D>, displacements: Vec<Vector<D>>) -> Result<Self> {
        let expected = domain.region().number_of_pixels();
        if displacements.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected: domain.size().to_vec(),
                actual: vec![displacements.len()],
            });
        }
        Ok(Self {
            domain,
            displacements,
        })
    }

    /// Create a zero displacement field over `domain`.
    pub fn zeros(domain: ImageDomain<D>) -> Self {
        let n = domain.region().number_of_pixels();
        Self {
            domain,
            displacements: vec![Vector::zeros(); n],
        }
    }

    pub fn domain(&self) -> &ImageDomain<D> {
        &self.domain
    }

    pub fn displacements(&self) -> &[Vector<D>] {
        &self.displacements
    }

    /// Displacement stored at a discrete index of the field grid.
    pub fn displacement_at_index(&self, index: &[i64; D]) -> Option<&Vector<D>> {
        let offset = self.domain.region().offset_of(index)?;
        self.displacements.get(offset)
    }

    /// Interpolated displacement at a physical point; zero outside the grid.
    pub fn displacement_at(&self, point: &Point<D>) -> Vector<D> {
        let mut index = self.domain.physical_to_continuous_index(point);
        let region = self.domain.region();
        for k in 0..D {
            index[k] -= region.index[k] as f64;
        }
        LinearInterpolator::evaluate_vector(&self.displacements, &region.size, &index)
            .unwrap_or_else(Vector::zeros)
    }
}

impl<const D: usize> Transform<D> for DisplacementFieldTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        *point + self.displacement_at(point)
    }

    fn name(&self) -> &'static str {
        "DisplacementFieldTransform"
    }
}
