//! Direction cosine matrices.

use nalgebra::SMatrix;
use super::{Spacing, Vector};

/// Largest deviation from 0 or ±1 still treated as an axis-aligned entry.
pub const AXIS_TOLERANCE: f64 = 1e-6;

/// Image orientation: column `i` is the physical direction of voxel axis `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Zero matrix, useful as a starting point for hand-built orientations.
    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    /// Build from row-major entries.
    pub fn from_rows(rows: [[f64; D]; D]) -> Self {
        Self(SMatrix::from_fn(|r, c| rows[r][c]))
    }

    /// Check that `D · Dᵀ = I`.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        let identity = SMatrix::<f64, D, D>::identity();
        (product - identity).iter().all(|v| v.abs() < 1e-6)
    }

    /// Orthogonal with determinant +1.
    pub fn is_proper_rotation(&self) -> bool {
        self.is_orthogonal() && (self.determinant() - 1.0).abs() < 1e-6
    }

    /// True when every entry is within `AXIS_TOLERANCE` of 0, 1 or -1 (a
    /// signed axis permutation).
    pub fn is_axis_aligned(&self) -> bool {
        self.0
            .iter()
            .all(|v| v.abs() < AXIS_TOLERANCE || (v.abs() - 1.0).abs() < AXIS_TOLERANCE)
    }

    /// Round a nearly axis-aligned direction to the exact signed
    /// permutation. `None` when some entry is not close to 0, 1 or -1.
    pub fn snapped_to_axes(&self) -> Option<Self> {
        if !self.is_axis_aligned() {
            return None;
        }
        Some(Self(self.0.map(|v| if v.abs() < AXIS_TOLERANCE { 0.0 } else { v.signum() })))
    }

    /// Cofactor expansion for D = 2 and 3, Gaussian elimination otherwise.
    pub fn determinant(&self) -> f64 {
        match D {
            2 => self.0[(0, 0)] * self.0[(1, 1)] - self.0[(0, 1)] * self.0[(1, 0)],
            3 => {
                let m = &self.0;
                m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                    - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                    + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
            }
            _ => {
                let mut m = self.0;
                let mut det = 1.0;
                for i in 0..D {
                    let pivot = (i..D)
                        .max_by(|a, b| m[(*a, i)].abs().total_cmp(&m[(*b, i)].abs()))
                        .unwrap_or(i);
                    if m[(pivot, i)].abs() < 1e-12 {
                        return 0.0;
                    }
                    if pivot != i {
                        m.swap_rows(i, pivot);
                        det = -det;
                    }
                    det *= m[(i, i)];
                    for j in (i + 1)..D {
                        let factor = m[(j, i)] / m[(i, i)];
                        for k in i..D {
                            m[(j, k)] -= factor * m[(i, k)];
                        }
                    }
                }
                det
            }
        }
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// `Direction · diag(spacing)`: maps a voxel index offset to a physical
    /// offset.
    pub fn scaled_by(&self, spacing: &Spacing<D>) -> SMatrix<f64, D, D> {
        self.0 * SMatrix::from_diagonal(&spacing.0)
    }

    /// Columns as physical axis vectors.
    pub fn axis_directions(&self) -> Vec<Vector<D>> {
        (0..D).map(|c| Vector(self.0.column(c).into_owned())).collect()
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_direction_orthogonality() {
        assert!(Direction3::identity().is_proper_rotation());

        let rot = Direction3::from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(rot.is_orthogonal());
        assert!(rot.is_proper_rotation());
        assert!(rot.is_axis_aligned());

        let mut reflection = Direction3::identity();
        reflection[(0, 0)] = -1.0;
        assert!(reflection.is_orthogonal());
        assert!(!reflection.is_proper_rotation());
    }

    #[test]
    fn test_direction_oblique_is_not_axis_aligned() {
        let c = std::f64::consts::FRAC_1_SQRT_2;
        let rot = Direction3::from_rows([[c, -c, 0.0], [c, c, 0.0], [0.0, 0.0, 1.0]]);
        assert!(rot.is_orthogonal());
        assert!(!rot.is_axis_aligned());
    }

    #[test]
    fn test_direction_scaled_by_spacing() {
        let rot = Direction3::from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let m = rot.scaled_by(&Vector3::new([2.0, 3.0, 4.0]));
        assert_eq!(m[(0, 1)], -3.0);
        assert_eq!(m[(1, 0)], 2.0);
        assert_eq!(m[(2, 2)], 4.0);
        assert_eq!(rot * Vector3::new([1.0, 0.0, 0.0]), Vector3::new([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_direction_axis_directions() {
        let rot = Direction3::from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let axes = rot.axis_directions();
        assert_eq!(axes[0], Vector3::new([0.0, 1.0, 0.0]));
        assert_eq!(axes[2], Vector3::new([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_direction_determinant() {
        let flip = Direction3::from_rows([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert_eq!(flip.determinant(), -1.0);
        assert!(!flip.is_proper_rotation());
        assert_eq!(Direction::<2>::from_rows([[2.0, 1.0], [1.0, 3.0]]).determinant(), 5.0);
        let scaled = Direction::<4>(nalgebra::SMatrix::<f64, 4, 4>::identity() * 2.0);
        assert!((scaled.determinant() - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearly_axis_aligned_direction_is_snapped() {
        let rot = Direction3::from_rows([
            [3.4e-8, 0.9999999999999994, 0.0],
            [-0.9999999999999994, 3.4e-8, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        assert!(rot.is_axis_aligned());
        let snapped = rot.snapped_to_axes().unwrap();
        assert_eq!(snapped, Direction3::from_rows([[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]));

        let c = std::f64::consts::FRAC_1_SQRT_2;
        let oblique = Direction3::from_rows([[c, -c, 0.0], [c, c, 0.0], [0.0, 0.0, 1.0]]);
        assert!(oblique.snapped_to_axes().is_none());
    }
}
