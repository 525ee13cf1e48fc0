//! Unbuffered image domains.
//!
//! An [`ImageDomain`] carries the voxel grid of an image (origin, spacing,
//! direction and largest possible region) without any voxel data. It is used
//! to describe oriented bounding boxes in physical space, image metadata read
//! from a file header, and the validity domain of a block transform.

use nalgebra::SMatrix;

use crate::error::{CoreError, Result};
use crate::image::ImageRegion;
use crate::region::{image_to_physical_region, PhysicalRegion};
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Voxel grid metadata with no pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDomain<const D: usize> {
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
    region: ImageRegion<D>,
    /// `Direction · diag(spacing)`.
    index_to_physical: SMatrix<f64, D, D>,
    physical_to_index: SMatrix<f64, D, D>,
}

impl<const D: usize> ImageDomain<D> {
    /// Create a domain. Fails when any spacing is zero or the direction
    /// matrix is singular.
    pub fn new(
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
        region: ImageRegion<D>,
    ) -> Result<Self> {
        if spacing.has_zero() {
            return Err(CoreError::invalid_geometry(format!(
                "spacing must be non-zero, got {:?}",
                spacing.to_vec()
            )));
        }
        let index_to_physical = direction.scaled_by(&spacing);
        let physical_to_index = index_to_physical.try_inverse().ok_or_else(|| {
            CoreError::invalid_geometry("direction matrix is not invertible")
        })?;
        Ok(Self {
            origin,
            spacing,
            direction,
            region,
            index_to_physical,
            physical_to_index,
        })
    }

    /// Unit spacing, identity direction, zero origin.
    pub fn with_size(size: [usize; D]) -> Self {
        let identity = SMatrix::identity();
        Self {
            origin: Point::origin(),
            spacing: Spacing::uniform(1.0),
            direction: Direction::identity(),
            region: ImageRegion::from_size(size),
            index_to_physical: identity,
            physical_to_index: identity,
        }
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Largest possible region.
    pub fn region(&self) -> &ImageRegion<D> {
        &self.region
    }

    pub fn size(&self) -> [usize; D] {
        self.region.size
    }

    /// `Direction · diag(spacing)`, mapping index offsets to physical offsets.
    pub fn index_to_physical_matrix(&self) -> &SMatrix<f64, D, D> {
        &self.index_to_physical
    }

    pub fn physical_to_index_matrix(&self) -> &SMatrix<f64, D, D> {
        &self.physical_to_index
    }

    /// Same grid over a different region.
    pub fn with_region(&self, region: ImageRegion<D>) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }

    /// Same grid with a different origin.
    pub fn with_origin(&self, origin: Point<D>) -> Self {
        Self {
            origin,
            ..self.clone()
        }
    }

    /// `p = origin + Direction · (index ⊙ spacing)`.
    pub fn continuous_index_to_physical(&self, index: &Point<D>) -> Point<D> {
        Point(self.origin.0 + self.index_to_physical * index.0.coords)
    }

    pub fn index_to_physical(&self, index: &[i64; D]) -> Point<D> {
        let mut continuous = Point::origin();
        for k in 0..D {
            continuous[k] = index[k] as f64;
        }
        self.continuous_index_to_physical(&continuous)
    }

    pub fn physical_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        Point(nalgebra::Point::from(
            self.physical_to_index * (point.0 - self.origin.0),
        ))
    }

    /// Nearest voxel index, rounding halves up.
    pub fn physical_to_index(&self, point: &Point<D>) -> [i64; D] {
        let continuous = self.physical_to_continuous_index(point);
        let mut index = [0i64; D];
        for k in 0..D {
            index[k] = (continuous[k] + 0.5).floor() as i64;
        }
        index
    }

    /// Axis-aligned physical box sampled by the largest possible region.
    pub fn sample_bounds(&self) -> PhysicalRegion<D> {
        image_to_physical_region(&self.region, self, None)
    }

    pub fn physical_midpoint(&self) -> Point<D> {
        self.sample_bounds().center()
    }

    /// Signed voxel distance from `point` to the nearest side of the sampled
    /// box along each index axis. Negative values lie outside.
    pub fn pixel_distance_from_edge(&self, point: &Point<D>) -> Vector<D> {
        let continuous = self.physical_to_continuous_index(point);
        let mut distances = Vector::zeros();
        for k in 0..D {
            let to_lower = continuous[k] - (self.region.index[k] as f64 - 0.5);
            let to_upper = self.region.size[k] as f64 - to_lower;
            distances[k] = if to_lower.abs() <= to_upper.abs() {
                to_lower
            } else {
                to_upper
            };
        }
        distances
    }

    /// Minimum over axes of the physical distance to the nearest side of the
    /// sampled box, together with the axis it was found on.
    pub fn physical_distance_from_edge(&self, point: &Point<D>) -> (f64, usize) {
        let pixel = self.pixel_distance_from_edge(point);
        let mut best = (f64::INFINITY, 0);
        for k in 0..D {
            let distance = (pixel[k] * self.spacing[k]).abs();
            if distance < best.0 {
                best = (distance, k);
            }
        }
        best
    }

    /// Describe a physical box with a voxel grid of the given spacing and
    /// direction.
    ///
    /// The direction must be a signed axis permutation up to
    /// `AXIS_TOLERANCE`; the grid uses the exactly snapped permutation. When the box cannot
    /// be divided evenly, `extend_beyond` lets the grid overhang the box by
    /// up to one voxel; otherwise the grid stays inside it. The grid is
    /// centred on the box and its region index is always zero.
    pub fn from_physical_region(
        region: &PhysicalRegion<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
        extend_beyond: bool,
    ) -> Result<Self> {
        if spacing.0.iter().any(|s| s.abs() < 1e-12) {
            return Err(CoreError::invalid_geometry(format!(
                "invalid spacing {:?}",
                spacing.to_vec()
            )));
        }
        let direction = direction.snapped_to_axes().ok_or_else(|| {
            CoreError::invalid_geometry("direction entries must be 0, 1 or -1")
        })?;

        let step_matrix = direction.scaled_by(&spacing);
        let mut physical_step = Vector::<D>::zeros();
        for r in 0..D {
            let row = step_matrix.row(r);
            let (_, c) = row.iamax_full();
            physical_step[r] = step_matrix[(r, c)];
        }
        if physical_step.0.iter().any(|s| *s == 0.0) {
            return Err(CoreError::invalid_geometry(
                "direction does not map every physical axis",
            ));
        }

        let extent = region.upper.0 - region.lower.0;
        let center = region.center();
        let mut low_corner = Point::<D>::origin();
        let mut high_corner = Point::<D>::origin();
        for k in 0..D {
            let steps = snap_to_integer(extent[k] / physical_step[k].abs());
            let steps = if extend_beyond { steps.ceil() } else { steps.floor() };
            low_corner[k] = center[k] - steps / 2.0 * physical_step[k];
            high_corner[k] = center[k] + steps / 2.0 * physical_step[k];
        }

        let mut voxel_zero_corner = Point::<D>::origin();
        for k in 0..D {
            voxel_zero_corner[k] = if physical_step[k] > 0.0 {
                low_corner[k].min(high_corner[k])
            } else {
                low_corner[k].max(high_corner[k])
            };
        }
        let origin = voxel_zero_corner + physical_step * 0.5;

        let inverse = step_matrix.try_inverse().ok_or_else(|| {
            CoreError::invalid_geometry("direction matrix is not invertible")
        })?;
        let voxel_extent = inverse * (high_corner.0 - voxel_zero_corner.0);
        let mut size = [0usize; D];
        for k in 0..D {
            size[k] = voxel_extent[k].round().max(0.0) as usize;
        }

        Self::new(origin, spacing, direction, ImageRegion::from_size(size))
    }
}

/// Snap values within 1e-6 of an integer onto it.
pub(crate) fn snap_to_integer(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 {
        rounded
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotated_domain() -> ImageDomain<3> {
        ImageDomain::new(
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::from_rows([[0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]]),
            ImageRegion::from_size([100; 3]),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_spacing_is_rejected() {
        let result = ImageDomain::<2>::new(
            Point::origin(),
            Spacing::new([1.0, 0.0]),
            Direction::identity(),
            ImageRegion::from_size([4, 4]),
        );
        assert!(matches!(result, Err(CoreError::InvalidGeometry(_))));
    }

    #[test]
    fn test_index_physical_roundtrip_with_direction() {
        let domain = rotated_domain();
        assert_eq!(domain.index_to_physical(&[25, 25, 25]), Point::new([-25.0, 25.0, -25.0]));
        assert_eq!(domain.physical_to_index(&Point::new([-25.0, 25.0, -25.0])), [25, 25, 25]);

        let idx = Point::new([1.25, 7.5, 3.0]);
        let back = domain.physical_to_continuous_index(&domain.continuous_index_to_physical(&idx));
        assert!((back - idx).norm() < 1e-12);
    }

    #[test]
    fn test_sample_bounds() {
        let domain = ImageDomain::<3>::with_size([10, 10, 10]);
        let bounds = domain.sample_bounds();
        assert_eq!(bounds.lower, Point::splat(-0.5));
        assert_eq!(bounds.upper, Point::splat(9.5));
        assert_eq!(domain.physical_midpoint(), Point::splat(4.5));
    }

    #[test]
    fn test_distance_from_edge() {
        let domain = ImageDomain::new(
            Point::origin(),
            Spacing::new([2.0, 1.0, 1.0]),
            Direction::identity(),
            ImageRegion::from_size([10, 10, 10]),
        )
        .unwrap();
        // continuous index (1, 2, 8): distances 1.5 from lower, 2.5 from lower, 1.5 from upper
        let p = Point::new([2.0, 2.0, 8.0]);
        let pixel = domain.pixel_distance_from_edge(&p);
        assert_eq!(pixel.to_array(), [1.5, 2.5, 1.5]);
        let (distance, axis) = domain.physical_distance_from_edge(&p);
        assert_eq!(distance, 1.5);
        assert_eq!(axis, 2);
    }

    #[test]
    fn test_from_physical_region_same_grid() {
        let input = ImageDomain::<3>::with_size([10, 10, 10]);
        let out = ImageDomain::from_physical_region(
            &input.sample_bounds(),
            Spacing::uniform(1.0),
            Direction::identity(),
            false,
        )
        .unwrap();
        assert_eq!(out.size(), [10, 10, 10]);
        assert_eq!(out.origin(), input.origin());
        assert_eq!(out.sample_bounds(), input.sample_bounds());
    }

    #[test]
    fn test_from_physical_region_downscale() {
        let input = ImageDomain::<3>::with_size([10, 10, 10]);
        let out = ImageDomain::from_physical_region(
            &input.sample_bounds(),
            Spacing::uniform(2.0),
            Direction::identity(),
            false,
        )
        .unwrap();
        assert_eq!(out.size(), [5, 5, 5]);
        assert_eq!(out.origin(), &Point::splat(0.5));
    }

    #[test]
    fn test_from_physical_region_with_direction() {
        let input = rotated_domain();
        let requested = ImageRegion::new([25; 3], [15; 3]);
        let bounds = image_to_physical_region(&requested, &input, None);
        assert_eq!(bounds.lower, Point::new([-39.5, 24.5, -39.5]));
        assert_eq!(bounds.upper, Point::new([-24.5, 39.5, -24.5]));

        let out = ImageDomain::from_physical_region(
            &bounds,
            Spacing::uniform(2.0),
            *input.direction(),
            true,
        )
        .unwrap();
        assert_eq!(out.size(), [8, 8, 8]);
        assert_eq!(out.origin(), &Point::new([-25.0, 25.0, -25.0]));
        assert_eq!(out.direction(), input.direction());
        let sampled = out.sample_bounds();
        assert_eq!(sampled.lower, Point::new([-40.0, 24.0, -40.0]));
        assert_eq!(sampled.upper, Point::new([-24.0, 40.0, -24.0]));
    }

    #[test]
    fn test_from_physical_region_rejects_oblique_direction() {
        let c = std::f64::consts::FRAC_1_SQRT_2;
        let result = ImageDomain::<2>::from_physical_region(
            &PhysicalRegion::new(Point::origin(), Point::splat(4.0)),
            Spacing::uniform(1.0),
            Direction::from_rows([[c, -c], [c, c]]),
            true,
        );
        assert!(result.is_err());
    }
}
