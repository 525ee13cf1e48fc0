//! Rigid 3-D transform parameterised by Euler angles.

use std::sync::Arc;

use nalgebra::{Matrix3, SMatrix};

use super::trait_::{Transform, TransformRef};
use crate::error::{CoreError, Result};
use crate::spatial::{Point, Vector};

/// Euler 3D Transform (Rotation + Translation).
///
/// T(x) = R(x - c) + c + t, with `R = Rz · Rx · Ry` (rotation about Y is
/// applied first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Euler3DTransform {
    rotation: Matrix3<f64>,
    translation: Vector<3>,
    center: Point<3>,
}

impl Euler3DTransform {
    /// Create from rotation angles in radians.
    pub fn from_angles(angle_x: f64, angle_y: f64, angle_z: f64, translation: Vector<3>) -> Self {
        let (sx, cx) = angle_x.sin_cos();
        let (sy, cy) = angle_y.sin_cos();
        let (sz, cz) = angle_z.sin_cos();
        let rx = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
        let ry = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
        let rz = Matrix3::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);
        Self {
            rotation: rz * rx * ry,
            translation,
            center: Point::origin(),
        }
    }

    /// Create from a rotation matrix. Fails unless the matrix is a proper
    /// rotation (orthonormal with determinant +1).
    pub fn from_matrix(rotation: Matrix3<f64>, translation: Vector<3>) -> Result<Self> {
        let orthogonal = (rotation * rotation.transpose() - Matrix3::identity())
            .iter()
            .all(|v| v.abs() < 1e-6);
        if !orthogonal || (rotation.determinant() - 1.0).abs() > 1e-6 {
            return Err(CoreError::transform(format!(
                "matrix is not a rigid rotation: {}",
                rotation
            )));
        }
        Ok(Self {
            rotation,
            translation,
            center: Point::origin(),
        })
    }

    pub fn with_center(mut self, center: Point<3>) -> Self {
        self.center = center;
        self
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector<3> {
        &self.translation
    }

    pub fn center(&self) -> &Point<3> {
        &self.center
    }

    /// Recover `(angle_x, angle_y, angle_z)` from the rotation matrix.
    pub fn angles(&self) -> [f64; 3] {
        let m = &self.rotation;
        let angle_x = m[(2, 1)].clamp(-1.0, 1.0).asin();
        let a = angle_x.cos();
        if a.abs() > 1e-5 {
            let angle_y = (-m[(2, 0)] / a).atan2(m[(2, 2)] / a);
            let angle_z = (-m[(0, 1)] / a).atan2(m[(1, 1)] / a);
            [angle_x, angle_y, angle_z]
        } else {
            // gimbal lock: fold the Z rotation into Y
            [angle_x, m[(1, 0)].atan2(m[(0, 0)]), 0.0]
        }
    }

    fn offset(&self) -> Vector<3> {
        let c = self.center.0.coords;
        Vector(self.translation.0 + c - self.rotation * c)
    }
}

impl Transform<3> for Euler3DTransform {
    fn transform_point(&self, point: &Point<3>) -> Point<3> {
        Point(nalgebra::Point::from(self.rotation * point.0.coords + self.offset().0))
    }

    fn inverse(&self) -> Option<TransformRef<3>> {
        let inverse = self.rotation.transpose();
        Some(Arc::new(Self {
            rotation: inverse,
            translation: Vector(-(inverse * self.translation.0)),
            center: self.center,
        }))
    }

    fn matrix_offset(&self) -> Option<(SMatrix<f64, 3, 3>, Vector<3>)> {
        Some((self.rotation, self.offset()))
    }

    fn name(&self) -> &'static str {
        "Euler3DTransform"
    }
}
