//! Discrete voxel regions.

use std::fmt;

/// An axis-aligned block of voxels in ITK index order.
///
/// `index` is the first voxel, `size` the voxel count along each axis. A
/// region with any zero-size axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageRegion<const D: usize> {
    pub index: [i64; D],
    pub size: [usize; D],
}

impl<const D: usize> ImageRegion<D> {
    pub fn new(index: [i64; D], size: [usize; D]) -> Self {
        Self { index, size }
    }

    /// Region starting at index zero.
    pub fn from_size(size: [usize; D]) -> Self {
        Self { index: [0; D], size }
    }

    /// Build from inclusive lower and upper indices. Axes where `upper`
    /// lies below `lower` get size zero.
    pub fn from_bounds(lower: [i64; D], upper: [i64; D]) -> Self {
        let mut size = [0usize; D];
        for k in 0..D {
            size[k] = (upper[k] - lower[k] + 1).max(0) as usize;
        }
        Self { index: lower, size }
    }

    /// Last voxel index along each axis (inclusive).
    pub fn upper_index(&self) -> [i64; D] {
        let mut upper = [0i64; D];
        for k in 0..D {
            upper[k] = self.index[k] + self.size[k] as i64 - 1;
        }
        upper
    }

    pub fn number_of_pixels(&self) -> usize {
        self.size.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.size.iter().any(|s| *s == 0)
    }

    /// Whether `other` lies entirely inside `self`. Empty regions are never
    /// inside.
    pub fn is_inside(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let upper = self.upper_index();
        let other_upper = other.upper_index();
        (0..D).all(|k| other.index[k] >= self.index[k] && other_upper[k] <= upper[k])
    }

    pub fn contains_index(&self, index: &[i64; D]) -> bool {
        let upper = self.upper_index();
        (0..D).all(|k| index[k] >= self.index[k] && index[k] <= upper[k])
    }

    /// Intersect with `bounds`. Returns `false` and leaves `self` untouched
    /// when the two regions do not overlap.
    pub fn crop(&mut self, bounds: &Self) -> bool {
        if self.is_empty() || bounds.is_empty() {
            return false;
        }
        let upper = self.upper_index();
        let bounds_upper = bounds.upper_index();
        let mut lower = [0i64; D];
        let mut new_upper = [0i64; D];
        for k in 0..D {
            lower[k] = self.index[k].max(bounds.index[k]);
            new_upper[k] = upper[k].min(bounds_upper[k]);
            if new_upper[k] < lower[k] {
                return false;
            }
        }
        *self = Self::from_bounds(lower, new_upper);
        true
    }

    /// Grow by `padding[k]` voxels on both sides of axis `k`.
    pub fn padded(&self, padding: [usize; D]) -> Self {
        let mut region = *self;
        for k in 0..D {
            region.index[k] -= padding[k] as i64;
            region.size[k] += 2 * padding[k];
        }
        region
    }

    /// Linear offset of `index` inside this region, ITK axis 0 fastest.
    pub fn offset_of(&self, index: &[i64; D]) -> Option<usize> {
        if !self.contains_index(index) {
            return None;
        }
        let mut offset = 0usize;
        let mut stride = 1usize;
        for k in 0..D {
            offset += (index[k] - self.index[k]) as usize * stride;
            stride *= self.size[k];
        }
        Some(offset)
    }

    /// Size in NumPy order, i.e. the shape of a tensor buffering this region.
    pub fn numpy_shape(&self) -> [usize; D] {
        let mut shape = self.size;
        shape.reverse();
        shape
    }
}

impl<const D: usize> fmt::Display for ImageRegion<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageRegion(index={:?}, size={:?})", self.index, self.size)
    }
}
