//! Rescaling a physical region onto a new voxel grid.

use dreg_core::image::{ImageDomain, ImageRegion};
use dreg_core::region::image_to_physical_region;
use dreg_core::spatial::{Direction, Point, Spacing};

const SCALE: f64 = 2.0;

fn unit_domain(region: ImageRegion<3>) -> ImageDomain<3> {
    ImageDomain::new(Point::origin(), Spacing::uniform(1.0), Direction::identity(), region).unwrap()
}

#[test]
fn test_rescale_physical_region_norescale() {
    let input = unit_domain(ImageRegion::from_size([10; 3]));
    let physical = image_to_physical_region(input.region(), &input, None);

    let output = ImageDomain::from_physical_region(&physical, *input.spacing(), *input.direction(), false).unwrap();

    assert_eq!(output.size(), input.size());
    assert_eq!(output.origin(), input.origin());
    assert_eq!(output.spacing(), input.spacing());
    assert_eq!(output.sample_bounds(), input.sample_bounds());
}

#[test]
fn test_rescale_physical_region_downscale() {
    let input = unit_domain(ImageRegion::from_size([10; 3]));
    let physical = image_to_physical_region(input.region(), &input, None);

    let output = ImageDomain::from_physical_region(&physical, Spacing::uniform(SCALE), *input.direction(), false)
        .unwrap();

    assert_eq!(output.size(), [5; 3]);
    assert_eq!(output.spacing(), &Spacing::uniform(2.0));
    assert_eq!(output.origin(), &Point::splat(0.5));
}

#[test]
fn test_rescale_physical_region_offset() {
    let input = unit_domain(ImageRegion::new([10; 3], [10; 3]));
    assert_eq!(input.index_to_physical(&[10; 3]), Point::splat(10.0));
    let physical = image_to_physical_region(input.region(), &input, None);

    let output = ImageDomain::from_physical_region(&physical, Spacing::uniform(SCALE), *input.direction(), false)
        .unwrap();

    assert_eq!(output.size(), [5; 3]);
    assert_eq!(output.spacing(), &Spacing::uniform(2.0));
    assert_eq!(output.origin(), &Point::splat(10.5));
}

#[test]
fn test_rescale_physical_region_requested() {
    let input = unit_domain(ImageRegion::from_size([100; 3]));
    let requested = ImageRegion::new([1; 3], [10; 3]);
    assert!(input.region().is_inside(&requested));
    let physical = image_to_physical_region(&requested, &input, None);

    let output = ImageDomain::from_physical_region(&physical, Spacing::uniform(SCALE), *input.direction(), false)
        .unwrap();

    assert_eq!(output.size(), [5; 3]);
    assert_eq!(output.origin(), &Point::splat(1.5));
    assert_eq!(output.sample_bounds(), physical);
}

#[test]
fn test_rescale_physical_region_with_direction() {
    let direction = Direction::from_rows([[0.0, 0.0, -1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]]);
    let input = ImageDomain::new(
        Point::origin(),
        Spacing::uniform(1.0),
        direction,
        ImageRegion::from_size([100; 3]),
    )
    .unwrap();
    assert_eq!(input.index_to_physical(&[25; 3]), Point::new([-25.0, 25.0, -25.0]));

    let requested = ImageRegion::new([25; 3], [15; 3]);
    assert!(input.region().is_inside(&requested));
    let physical = image_to_physical_region(&requested, &input, None);
    assert_eq!(physical.lower, Point::new([-39.5, 24.5, -39.5]));
    assert_eq!(physical.upper, Point::new([-24.5, 39.5, -24.5]));

    // 15 voxels cannot be split into steps of 2, so the grid overhangs
    let output = ImageDomain::from_physical_region(&physical, Spacing::uniform(SCALE), direction, true).unwrap();

    assert_eq!(output.size(), [8; 3]);
    assert_eq!(output.spacing(), &Spacing::uniform(2.0));
    assert_eq!(output.origin(), &Point::new([-25.0, 25.0, -25.0]));
    assert_eq!(output.direction(), &direction);

    let bounds = output.sample_bounds();
    assert_eq!(bounds.lower, Point::new([-40.0, 24.0, -40.0]));
    assert_eq!(bounds.upper, Point::new([-24.0, 40.0, -24.0]));
}
