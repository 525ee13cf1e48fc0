//! Displacement vectors in physical space.

use nalgebra::SVector;

/// A vector in D-dimensional space.
///
/// Used for displacements, translations and (through [`super::Spacing`])
/// voxel spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Create a vector from a slice; panics when the length is not `D`.
    pub fn from_slice(components: &[f64]) -> Self {
        assert!(components.len() == D, "Component slice length must match dimension");
        Self(SVector::from_fn(|i, _| components[i]))
    }

    /// Components as a `Vec`.
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.iter().copied().collect()
    }

    /// Components as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.0[i];
        }
        out
    }

    /// Component-wise product.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Component-wise quotient.
    pub fn component_div(&self, other: &Self) -> Self {
        Self(self.0.component_div(&other.0))
    }

    /// Component-wise absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.dot(&other.0)
    }

    /// Get the inner nalgebra vector.
    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }
}

impl<const D: usize> From<[f64; D]> for Vector<D> {
    fn from(components: [f64; D]) -> Self {
        Self::new(components)
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::AddAssign for Vector<D> {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

impl<const D: usize> std::ops::Div<f64> for Vector<D> {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self(self.0 / scalar)
    }
}

impl<const D: usize> std::ops::Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Vector3 = Vector<3>;

    #[test]
    fn test_vector_arithmetic() {
        let v1 = Vector3::new([1.0, 2.0, 3.0]);
        let v2 = Vector3::new([4.0, 5.0, 6.0]);

        assert_eq!(v1 + v2, Vector3::new([5.0, 7.0, 9.0]));
        assert_eq!(v2 - v1, Vector3::new([3.0, 3.0, 3.0]));
        assert_eq!(v1 * 2.0, Vector3::new([2.0, 4.0, 6.0]));
        assert_eq!(v2 / 2.0, Vector3::new([2.0, 2.5, 3.0]));
        assert_eq!(-v1, Vector3::new([-1.0, -2.0, -3.0]));

        let mut acc = Vector3::zeros();
        acc += v1;
        acc += v1;
        assert_eq!(acc, v1 * 2.0);
    }

    #[test]
    fn test_vector_component_ops() {
        let v = Vector3::new([-2.0, 4.0, 6.0]);
        let s = Vector3::new([2.0, 2.0, 3.0]);
        assert_eq!(v.component_mul(&s), Vector3::new([-4.0, 8.0, 18.0]));
        assert_eq!(v.component_div(&s), Vector3::new([-1.0, 2.0, 2.0]));
        assert_eq!(v.abs(), Vector3::new([2.0, 4.0, 6.0]));
        assert_eq!(Vector3::from_slice(&v.to_vec()), v);
    }

    #[test]
    fn test_vector_norm_dot() {
        let v = Vector3::new([3.0, 4.0, 0.0]);
        assert!((v.norm() - 5.0).abs() < 1e-12);
        assert_eq!(v.dot(&Vector3::new([1.0, 1.0, 1.0])), 7.0);
    }
}
