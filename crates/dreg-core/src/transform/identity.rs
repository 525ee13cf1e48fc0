//! Identity transform.

use std::sync::Arc;

use nalgebra::SMatrix;

use super::trait_::{Transform, TransformRef};
use crate::spatial::{Point, Vector};

/// Maps every point onto itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform<const D: usize>;

impl<const D: usize> IdentityTransform<D> {
    pub fn new() -> Self {
        Self
    }
}

impl<const D: usize> Transform<D> for IdentityTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        *point
    }

    fn inverse(&self) -> Option<TransformRef<D>> {
        Some(Arc::new(Self))
    }

    fn matrix_offset(&self) -> Option<(SMatrix<f64, D, D>, Vector<D>)> {
        Some((SMatrix::identity(), Vector::zeros()))
    }

    fn name(&self) -> &'static str {
        "IdentityTransform"
    }
}
