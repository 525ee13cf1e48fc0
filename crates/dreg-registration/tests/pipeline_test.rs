//! End-to-end block registration of synthetic images with known shifts.

mod common;

use std::sync::Arc;

use burn_ndarray::NdArray;
use common::{identity, reader_ctor, sample, unit_domain};
use dreg_core::spatial::Point;
use dreg_core::Transform;
use dreg_registration::method::{TranslationSearchConfig, TranslationSearchMethod};
use dreg_registration::reduce::{EulerConsensusReduceMethod, ReduceToDisplacementFieldMethod};
use dreg_registration::{register_images, RegistrationConfig};

type B = NdArray<f32>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn texture_2d(x: f64, y: f64) -> f32 {
    (2.0 + (0.35 * x + 0.2 * y).sin() * (0.3 * y - 0.1 * x).cos()) as f32
}

fn texture_3d(x: f64, y: f64, z: f64) -> f32 {
    (2.0 + (0.5 * x + 0.3 * y).sin() * (0.4 * z - 0.2 * x).cos() + 0.3 * (0.7 * y).sin()) as f32
}

#[test]
fn test_translation_search_to_displacement_field() {
    init_tracing();
    let size = [32, 24];
    let shift = [2.0, 1.0];
    let fixed = sample(size, |[x, y]| texture_2d(x as f64, y as f64));
    // moving(p) = fixed(p - shift), so fixed(x) lines up with moving(x + shift)
    let moving = sample(size, |[x, y]| texture_2d(x as f64 - shift[0], y as f64 - shift[1]));

    let method = TranslationSearchMethod::new(
        TranslationSearchConfig::new()
            .with_radius(3)
            .with_min_correlation(0.9),
    )
    .unwrap();
    let schedule = register_images::<B, 2>(
        reader_ctor(fixed, unit_domain(size)),
        reader_ctor(moving, unit_domain(size)),
        Arc::new(method),
        Arc::new(ReduceToDisplacementFieldMethod::<2>::new()),
        identity(),
        RegistrationConfig::new()
            .with_chunk_size(vec![12, 16])
            .with_overlap_factors(vec![0.5, 0.5])
            .parallel(2),
        Default::default(),
    )
    .unwrap();

    let result = schedule.compute().unwrap();
    assert_eq!(result.num_successful(), 4);

    for p in [[5.0, 5.0], [20.0, 12.0], [28.0, 3.0], [10.0, 18.0]] {
        let mapped = result.transforms.transform.transform_point(&Point::new(p));
        assert!((mapped[0] - p[0] - shift[0]).abs() < 1e-4, "{:?} -> {:?}", p, mapped);
        assert!((mapped[1] - p[1] - shift[1]).abs() < 1e-4, "{:?} -> {:?}", p, mapped);
    }
}

#[test]
fn test_translation_search_to_rigid_consensus() {
    init_tracing();
    let size = [12, 12, 12];
    let shift = [1.0, 0.0, -1.0];
    let fixed = sample(size, |[x, y, z]| texture_3d(x as f64, y as f64, z as f64));
    let moving = sample(size, |[x, y, z]| {
        texture_3d(x as f64 - shift[0], y as f64 - shift[1], z as f64 - shift[2])
    });

    let method = TranslationSearchMethod::new(
        TranslationSearchConfig::new()
            .with_radius(1)
            .with_min_correlation(0.9),
    )
    .unwrap();
    let schedule = register_images::<B, 3>(
        reader_ctor(fixed, unit_domain(size)),
        reader_ctor(moving, unit_domain(size)),
        Arc::new(method),
        Arc::new(EulerConsensusReduceMethod::new()),
        identity(),
        RegistrationConfig::new()
            .with_chunk_size(vec![6, 6, 6])
            .with_overlap_factors(vec![0.5, 0.5, 0.5]),
        Default::default(),
    )
    .unwrap();

    let result = schedule.compute().unwrap();
    assert_eq!(result.status.shape(), &[2, 2, 2]);
    assert_eq!(result.num_successful(), 8);

    let (matrix, offset) = result.transforms.transform.matrix_offset().unwrap();
    assert!((matrix - nalgebra::Matrix3::identity()).norm() < 1e-9);
    for k in 0..3 {
        assert!((offset[k] - shift[k]).abs() < 1e-6, "offset {:?}", offset.to_vec());
    }
}

#[test]
fn test_reduce_fails_when_no_block_succeeds() {
    let size = [16, 16];
    let fixed = sample(size, |[x, y]| texture_2d(x as f64, y as f64));
    let empty = vec![0.0; 256];

    let schedule = register_images::<B, 2>(
        reader_ctor(fixed, unit_domain(size)),
        reader_ctor(empty, unit_domain(size)),
        Arc::new(TranslationSearchMethod::default()),
        Arc::new(ReduceToDisplacementFieldMethod::<2>::new()),
        identity(),
        RegistrationConfig::new().with_chunk_size(vec![8, 8]),
        Default::default(),
    )
    .unwrap();
    assert!(schedule.compute().is_err());
}
