//! Translation transform implementation.

use std::sync::Arc;

use nalgebra::SMatrix;

use super::trait_::{Transform, TransformRef};
use crate::spatial::{Point, Vector};

/// Translation Transform.
///
/// T(x) = x + t
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslationTransform<const D: usize> {
    offset: Vector<D>,
}

impl<const D: usize> TranslationTransform<D> {
    /// Create a new translation by `offset`.
    pub fn new(offset: Vector<D>) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> &Vector<D> {
        &self.offset
    }
}

impl<const D: usize> Transform<D> for TranslationTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        *point + self.offset
    }

    fn inverse(&self) -> Option<TransformRef<D>> {
        Some(Arc::new(Self::new(-self.offset)))
    }

    fn matrix_offset(&self) -> Option<(SMatrix<f64, D, D>, Vector<D>)> {
        Some((SMatrix::identity(), self.offset))
    }

    fn name(&self) -> &'static str {
        "TranslationTransform"
    }
}
