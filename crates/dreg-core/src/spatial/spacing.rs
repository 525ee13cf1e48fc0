//! Voxel spacing.

use super::Vector;

/// Physical distance between adjacent voxel centers along each ITK axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing along every axis.
    pub fn uniform(value: f64) -> Self {
        Vector::new([value; D])
    }

    /// True when any component is zero.
    pub fn has_zero(&self) -> bool {
        self.0.iter().any(|s| *s == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing::<3>::uniform(1.5);
        assert_eq!(s, Spacing::<3>::new([1.5, 1.5, 1.5]));
        assert!(!s.has_zero());
        assert!(Spacing::<2>::new([1.0, 0.0]).has_zero());
    }
}
