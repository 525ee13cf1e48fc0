use std::sync::Arc;

use dreg_core::image::{ImageDomain, ImageRegion};
use dreg_core::region::{estimate_bounding_box, PhysicalRegion};
use dreg_core::spatial::{Direction, Point, Spacing, Vector};
use dreg_core::transform::{
    CompositeTransform, DisplacementFieldTransform, Euler3DTransform, Transform, TranslationTransform,
};

#[test]
fn test_initial_then_result_order() {
    let initial = Euler3DTransform::from_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2, Vector::zeros());
    let result = TranslationTransform::new(Vector::new([1.0, 0.0, 0.0]));
    let composite = CompositeTransform::new()
        .then(Arc::new(initial))
        .then(Arc::new(result));

    // rotate (1,0,0) -> (0,1,0), then shift
    let q = composite.transform_point(&Point::new([1.0, 0.0, 0.0]));
    assert!((q - Point::new([1.0, 1.0, 0.0])).norm() < 1e-12);
}

#[test]
fn test_displacement_field_composes_with_translation() {
    let domain = ImageDomain::new(
        Point::origin(),
        Spacing::uniform(1.0),
        Direction::identity(),
        ImageRegion::from_size([4, 4, 4]),
    )
    .unwrap();
    let n = domain.region().number_of_pixels();
    let field = DisplacementFieldTransform::new(domain, vec![Vector::new([0.5, 0.0, 0.0]); n]).unwrap();

    let composite = CompositeTransform::new()
        .then(Arc::new(TranslationTransform::new(Vector::new([1.0, 1.0, 1.0]))))
        .then(Arc::new(field));

    assert_eq!(
        composite.transform_point(&Point::new([0.0, 0.0, 0.0])),
        Point::new([1.5, 1.0, 1.0])
    );
    // leaves the field domain after translation
    assert_eq!(
        composite.transform_point(&Point::new([5.0, 0.0, 0.0])),
        Point::new([6.0, 1.0, 1.0])
    );
    assert!(composite.inverse().is_none());
    assert!(composite.matrix_offset().is_none());
}

#[test]
fn test_bounding_box_of_rotated_cube() {
    let cube = PhysicalRegion::new(Point::splat(-1.0), Point::splat(1.0));
    let rotation = Euler3DTransform::from_angles(0.0, 0.0, std::f64::consts::FRAC_PI_4, Vector::zeros());
    let bounds = estimate_bounding_box(&cube, &rotation);
    let r = std::f64::consts::SQRT_2;
    assert!((bounds.upper[0] - r).abs() < 1e-12);
    assert!((bounds.lower[1] + r).abs() < 1e-12);
    assert!((bounds.upper[2] - 1.0).abs() < 1e-12);
}
