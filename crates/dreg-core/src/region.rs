//! Conversions between voxel regions and physical regions.
//!
//! Three representations of an axis-aligned box are used:
//!
//! * [`BlockRegion`]: continuous `[lower, upper)` voxel bounds in ITK order.
//!   The lower bound is the first voxel index, the upper bound is one past the
//!   last voxel.
//! * [`ImageRegion`]: discrete index + size.
//! * [`PhysicalRegion`]: inclusive physical bounds.
//!
//! A voxel samples the space within half a voxel of its center, so converting
//! a voxel block to physical space shifts its bounds by half a voxel.

use crate::image::domain::snap_to_integer;
use crate::image::{ImageDomain, ImageRegion};
use crate::spatial::{Point, Vector};
use crate::transform::Transform;

const HALF_VOXEL_STEP: f64 = 0.5;

/// Continuous `[lower, upper)` voxel bounds, ITK order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRegion<const D: usize> {
    pub lower: [f64; D],
    pub upper: [f64; D],
}

impl<const D: usize> BlockRegion<D> {
    /// Create from two corners; bounds are sorted per axis.
    pub fn new(a: [f64; D], b: [f64; D]) -> Self {
        let mut lower = [0.0; D];
        let mut upper = [0.0; D];
        for k in 0..D {
            lower[k] = a[k].min(b[k]);
            upper[k] = a[k].max(b[k]);
        }
        Self { lower, upper }
    }
}

/// Inclusive axis-aligned bounds in physical space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalRegion<const D: usize> {
    pub lower: Point<D>,
    pub upper: Point<D>,
}

impl<const D: usize> PhysicalRegion<D> {
    /// Create from two corners; bounds are sorted per axis.
    pub fn new(a: Point<D>, b: Point<D>) -> Self {
        Self {
            lower: a.inf(&b),
            upper: a.sup(&b),
        }
    }

    /// Smallest region containing every point. `None` for an empty input.
    pub fn bounding(points: &[Point<D>]) -> Option<Self> {
        let first = points.first()?;
        let (lower, upper) = points
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        Some(Self { lower, upper })
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &Point<D>) -> bool {
        (0..D).all(|k| self.lower[k] <= point[k] && point[k] <= self.upper[k])
    }

    pub fn center(&self) -> Point<D> {
        Point(nalgebra::center(&self.lower.0, &self.upper.0))
    }

    pub fn extent(&self) -> Vector<D> {
        self.upper - self.lower
    }

    /// All `2^D` corners of the box.
    pub fn corners(&self) -> Vec<Point<D>> {
        box_corners(&self.lower.to_array(), &self.upper.to_array())
            .into_iter()
            .map(Point::new)
            .collect()
    }
}

fn box_corners<const D: usize>(lower: &[f64; D], upper: &[f64; D]) -> Vec<[f64; D]> {
    (0..1usize << D)
        .map(|mask| {
            let mut corner = [0.0; D];
            for k in 0..D {
                corner[k] = if mask >> k & 1 == 1 { upper[k] } else { lower[k] };
            }
            corner
        })
        .collect()
}

/// Axis-aligned box around the corners of `region` after `transform`.
///
/// Deformable transforms may move interior points outside the result.
pub fn estimate_bounding_box<const D: usize>(
    region: &PhysicalRegion<D>,
    transform: &dyn Transform<D>,
) -> PhysicalRegion<D> {
    let mapped: Vec<Point<D>> = region
        .corners()
        .iter()
        .map(|corner| transform.transform_point(corner))
        .collect();
    // corners() is never empty
    PhysicalRegion::bounding(&mapped).unwrap_or(*region)
}

/// Physical box sampled by a voxel block, optionally mapped through a
/// transform.
pub fn block_to_physical_region<const D: usize>(
    block: &BlockRegion<D>,
    reference: &ImageDomain<D>,
    transform: Option<&dyn Transform<D>>,
) -> PhysicalRegion<D> {
    let mut lower = block.lower;
    let mut upper = block.upper;
    for k in 0..D {
        lower[k] -= HALF_VOXEL_STEP;
        upper[k] -= HALF_VOXEL_STEP;
    }
    let physical: Vec<Point<D>> = box_corners(&lower, &upper)
        .into_iter()
        .map(|corner| reference.continuous_index_to_physical(&Point::new(corner)))
        .collect();
    let region = PhysicalRegion::bounding(&physical)
        .unwrap_or_else(|| PhysicalRegion::new(Point::origin(), Point::origin()));

    match transform {
        Some(transform) => estimate_bounding_box(&region, transform),
        None => region,
    }
}

/// Continuous voxel block covering a physical box.
pub fn physical_to_block_region<const D: usize>(
    region: &PhysicalRegion<D>,
    reference: &ImageDomain<D>,
) -> BlockRegion<D> {
    let mut lower = [f64::INFINITY; D];
    let mut upper = [f64::NEG_INFINITY; D];
    for corner in region.corners() {
        let index = reference.physical_to_continuous_index(&corner);
        for k in 0..D {
            lower[k] = lower[k].min(index[k]);
            upper[k] = upper[k].max(index[k]);
        }
    }
    for k in 0..D {
        lower[k] += HALF_VOXEL_STEP;
        upper[k] += HALF_VOXEL_STEP;
    }
    BlockRegion { lower, upper }
}

/// Discrete region for a continuous block: `index = floor(lower)`, last
/// voxel `floor(upper) - 1`.
pub fn block_to_image_region<const D: usize>(block: &BlockRegion<D>) -> ImageRegion<D> {
    let mut lower = [0i64; D];
    let mut upper = [0i64; D];
    for k in 0..D {
        let lo = block.lower[k].min(block.upper[k]);
        let hi = block.lower[k].max(block.upper[k]);
        lower[k] = snap_to_integer(lo).floor() as i64;
        upper[k] = snap_to_integer(hi).floor() as i64 - 1;
    }
    ImageRegion::from_bounds(lower, upper)
}

/// `[index, upper_index + 1)`.
pub fn image_to_block_region<const D: usize>(region: &ImageRegion<D>) -> BlockRegion<D> {
    let upper_index = region.upper_index();
    let mut lower = [0.0; D];
    let mut upper = [0.0; D];
    for k in 0..D {
        lower[k] = region.index[k] as f64;
        upper[k] = (upper_index[k] + 1) as f64;
    }
    BlockRegion { lower, upper }
}

pub fn physical_to_image_region<const D: usize>(
    region: &PhysicalRegion<D>,
    reference: &ImageDomain<D>,
) -> ImageRegion<D> {
    block_to_image_region(&physical_to_block_region(region, reference))
}

pub fn image_to_physical_region<const D: usize>(
    region: &ImageRegion<D>,
    reference: &ImageDomain<D>,
    transform: Option<&dyn Transform<D>>,
) -> PhysicalRegion<D> {
    block_to_physical_region(&image_to_block_region(region), reference, transform)
}

/// Map a voxel block in `source` space to the physically corresponding
/// voxel block in `target` space.
///
/// `source_transform` maps source physical points into target physical
/// space. With `crop_to_target` the result is cropped to the target's
/// largest region; a block entirely outside the target is returned uncropped.
pub fn get_target_block_region<const D: usize>(
    block: &BlockRegion<D>,
    source: &ImageDomain<D>,
    target: &ImageDomain<D>,
    source_transform: Option<&dyn Transform<D>>,
    crop_to_target: bool,
) -> BlockRegion<D> {
    let target_block = physical_to_block_region(
        &block_to_physical_region(block, source, source_transform),
        target,
    );
    if !crop_to_target {
        return target_block;
    }
    let mut image_region = block_to_image_region(&target_block);
    image_region.crop(target.region());
    image_to_block_region(&image_region)
}

/// Physical extent of a voxel block size, measured from index zero.
pub fn block_to_physical_size<const D: usize>(
    size: [usize; D],
    reference: &ImageDomain<D>,
    transform: Option<&dyn Transform<D>>,
) -> Vector<D> {
    let mut corner = [0i64; D];
    for k in 0..D {
        corner[k] = size[k] as i64;
    }
    let far = reference.index_to_physical(&corner);
    let near = *reference.origin();
    match transform {
        Some(t) => (t.transform_point(&far) - t.transform_point(&near)).abs(),
        None => (far - near).abs(),
    }
}

/// Voxel count spanned by a physical size, measured from the origin.
pub fn physical_to_block_size<const D: usize>(
    size: &Vector<D>,
    reference: &ImageDomain<D>,
) -> [usize; D] {
    let index = reference.physical_to_index(&(*reference.origin() + *size));
    let mut out = [0usize; D];
    for k in 0..D {
        out[k] = index[k].unsigned_abs() as usize;
    }
    out
}

/// Voxel size in `target` space of a block of `size` voxels in `source`
/// space.
pub fn get_target_block_size<const D: usize>(
    size: [usize; D],
    source: &ImageDomain<D>,
    target: &ImageDomain<D>,
) -> [usize; D] {
    physical_to_block_size(&block_to_physical_size(size, source, None), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Direction, Spacing};
    use crate::transform::TranslationTransform;

    fn domain(spacing: [f64; 3], size: [usize; 3]) -> ImageDomain<3> {
        ImageDomain::new(
            Point::origin(),
            Spacing::new(spacing),
            Direction::identity(),
            ImageRegion::from_size(size),
        )
        .unwrap()
    }

    #[test]
    fn test_block_physical_roundtrip() {
        let reference = domain([2.0, 1.0, 0.5], [20, 20, 20]);
        let block = BlockRegion::new([2.0, 4.0, 6.0], [5.0, 8.0, 12.0]);
        let physical = block_to_physical_region(&block, &reference, None);
        assert_eq!(physical.lower, Point::new([3.0, 3.5, 2.75]));
        assert_eq!(physical.upper, Point::new([9.0, 7.5, 5.75]));

        let back = physical_to_block_region(&physical, &reference);
        assert_eq!(back, block);
        assert_eq!(
            block_to_image_region(&back),
            ImageRegion::new([2, 4, 6], [3, 4, 6])
        );
    }

    #[test]
    fn test_image_block_region_conversion() {
        let region = ImageRegion::new([1, 2, 3], [4, 5, 6]);
        let block = image_to_block_region(&region);
        assert_eq!(block.lower, [1.0, 2.0, 3.0]);
        assert_eq!(block.upper, [5.0, 7.0, 9.0]);
        assert_eq!(block_to_image_region(&block), region);
    }

    #[test]
    fn test_block_to_image_region_snaps_near_integers() {
        let block = BlockRegion::new([0.9999999, 2.0], [4.0000001, 5.5]);
        assert_eq!(block_to_image_region(&block), ImageRegion::new([1, 2], [3, 3]));
    }

    #[test]
    fn test_bounding_box_through_translation() {
        let region = PhysicalRegion::new(Point::new([0.0, 0.0]), Point::new([2.0, 3.0]));
        let shifted = estimate_bounding_box(&region, &TranslationTransform::new(Vector::new([1.0, -1.0])));
        assert_eq!(shifted.lower, Point::new([1.0, -1.0]));
        assert_eq!(shifted.upper, Point::new([3.0, 2.0]));
        assert_eq!(region.corners().len(), 4);
        assert!(region.contains(&Point::new([2.0, 0.0])));
        assert!(!region.contains(&Point::new([2.0001, 0.0])));
    }

    #[test]
    fn test_target_block_region_between_grids() {
        let fixed = domain([1.0, 1.0, 1.0], [100, 100, 100]);
        let moving = domain([2.0, 2.0, 2.0], [50, 50, 50]);
        let block = image_to_block_region(&ImageRegion::new([10, 10, 10], [20, 20, 20]));
        let target = get_target_block_region(&block, &fixed, &moving, None, false);
        // physical [9.5, 29.5] -> moving continuous [4.75, 14.75] + 0.5
        assert_eq!(target.lower, [5.25; 3]);
        assert_eq!(target.upper, [15.25; 3]);
        assert_eq!(block_to_image_region(&target), ImageRegion::new([5; 3], [10; 3]));
    }

    #[test]
    fn test_target_block_region_cropped() {
        let fixed = domain([1.0, 1.0, 1.0], [100, 100, 100]);
        let moving = domain([1.0, 1.0, 1.0], [20, 20, 20]);
        let block = image_to_block_region(&ImageRegion::new([10, 10, 10], [20, 20, 20]));
        let target = get_target_block_region(&block, &fixed, &moving, None, true);
        assert_eq!(block_to_image_region(&target), ImageRegion::new([10; 3], [10; 3]));
    }

    #[test]
    fn test_target_block_size() {
        let fixed = domain([1.0, 1.0, 1.0], [100, 100, 100]);
        let moving = domain([2.0, 4.0, 1.0], [50, 50, 50]);
        assert_eq!(get_target_block_size([8, 8, 8], &fixed, &moving), [4, 2, 8]);
        assert_eq!(
            block_to_physical_size([3, 3, 3], &moving, None),
            Vector::new([6.0, 12.0, 3.0])
        );
    }
}
