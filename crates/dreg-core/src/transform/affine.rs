//! Affine transform implementation.

use std::sync::Arc;

use nalgebra::SMatrix;

use super::trait_::{Transform, TransformRef};
use crate::spatial::{Point, Vector};

/// Affine Transform (Linear transformation + Translation).
///
/// Represents a general affine transformation with a fixed center:
/// T(x) = A(x - c) + c + t
///
/// where:
/// * A is a D×D matrix (linear transformation: rotation, scale, shear)
/// * t is a D-dimensional translation vector
/// * c is a D-dimensional fixed center of rotation/scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: Vector<D>,
    center: Point<D>,
}

impl<const D: usize> AffineTransform<D> {
    pub fn new(matrix: SMatrix<f64, D, D>, translation: Vector<D>, center: Point<D>) -> Self {
        Self {
            matrix,
            translation,
            center,
        }
    }

    /// Build from `p' = A·p + t` (center at the origin).
    pub fn from_matrix_offset(matrix: SMatrix<f64, D, D>, offset: Vector<D>) -> Self {
        Self::new(matrix, offset, Point::origin())
    }

    pub fn identity() -> Self {
        Self::new(SMatrix::identity(), Vector::zeros(), Point::origin())
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn translation(&self) -> &Vector<D> {
        &self.translation
    }

    pub fn center(&self) -> &Point<D> {
        &self.center
    }

    /// Offset of the equivalent centre-free form: `t + c - A·c`.
    pub fn offset(&self) -> Vector<D> {
        let c = self.center.0.coords;
        Vector(self.translation.0 + c - self.matrix * c)
    }
}

impl<const D: usize> Transform<D> for AffineTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        Point(nalgebra::Point::from(self.matrix * point.0.coords + self.offset().0))
    }

    fn inverse(&self) -> Option<TransformRef<D>> {
        let inverse = self.matrix.try_inverse()?;
        // x = A⁻¹(y - c - t) + c
        let translation = Vector(-(inverse * self.translation.0));
        Some(Arc::new(Self::new(inverse, translation, self.center)))
    }

    fn matrix_offset(&self) -> Option<(SMatrix<f64, D, D>, Vector<D>)> {
        Some((self.matrix, self.offset()))
    }

    fn name(&self) -> &'static str {
        "AffineTransform"
    }
}
