//! Composite transform.
//!
//! Transforms are applied in the order they were added:
//! T(x) = Tn(...T2(T1(x)))

use std::sync::Arc;

use nalgebra::SMatrix;

use super::trait_::{Transform, TransformRef};
use crate::spatial::{Point, Vector};

/// Ordered chain of shared transforms.
///
/// Used to express a block result on top of the initial transform: the
/// initial transform is added first, then the registration result.
#[derive(Debug, Clone, Default)]
pub struct CompositeTransform<const D: usize> {
    transforms: Vec<TransformRef<D>>,
}

impl<const D: usize> CompositeTransform<D> {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    pub fn from_transforms(transforms: Vec<TransformRef<D>>) -> Self {
        Self { transforms }
    }

    /// Append a transform, applied after the ones already present.
    pub fn push(&mut self, transform: TransformRef<D>) {
        self.transforms.push(transform);
    }

    pub fn then(mut self, transform: TransformRef<D>) -> Self {
        self.push(transform);
        self
    }

    pub fn transforms(&self) -> &[TransformRef<D>] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<const D: usize> Transform<D> for CompositeTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.transforms
            .iter()
            .fold(*point, |p, t| t.transform_point(&p))
    }

    fn inverse(&self) -> Option<TransformRef<D>> {
        let inverses = self
            .transforms
            .iter()
            .rev()
            .map(|t| t.inverse())
            .collect::<Option<Vec<_>>>()?;
        Some(Arc::new(Self::from_transforms(inverses)))
    }

    fn matrix_offset(&self) -> Option<(SMatrix<f64, D, D>, Vector<D>)> {
        let mut matrix = SMatrix::<f64, D, D>::identity();
        let mut offset = Vector::<D>::zeros();
        for t in &self.transforms {
            let (a, b) = t.matrix_offset()?;
            matrix = a * matrix;
            offset = Vector(a * offset.0 + b.0);
        }
        Some((matrix, offset))
    }

    fn name(&self) -> &'static str {
        "CompositeTransform"
    }
}
