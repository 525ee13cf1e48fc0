//! Sampling a transform collection into a dense displacement field.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use dreg_core::region::image_to_physical_region;
use dreg_core::spatial::Vector;
use dreg_core::transform::DisplacementFieldTransform;
use dreg_core::{ImageDomain, Transform, TransformRef};
use rayon::prelude::*;
use tracing::{debug, info};

use super::collection::{BlendMethod, TransformCollection, TransformEntry};
use super::successful_entries;
use crate::base::{ConstructReaderMethod, LocatedBlockResult, ReduceResultsMethod, RegistrationTransformResult};
use crate::error::{RegistrationError, Result};
use crate::validation::validate_scale_factors;

/// Discretise `collection` into a displacement field.
///
/// The field covers the sampled box of `reference` mapped through
/// `initial_transform`, with the reference direction and the reference
/// spacing multiplied by `scale_factors` (ITK order). The grid may overhang
/// the box by up to one voxel per side. Each voxel holds `collection(p) - p`,
/// or zero where no collection domain contains `p`.
///
/// The result is meant to be applied after `initial_transform`.
pub fn collection_to_displacement_field<const D: usize>(
    collection: &TransformCollection<D>,
    reference: &ImageDomain<D>,
    initial_transform: &dyn Transform<D>,
    scale_factors: &[f64; D],
) -> Result<DisplacementFieldTransform<D>> {
    validate_scale_factors(scale_factors, D)?;
    let physical = image_to_physical_region(reference.region(), reference, Some(initial_transform));
    let spacing = reference.spacing().component_mul(&Vector::new(*scale_factors));
    let field_domain = ImageDomain::from_physical_region(&physical, spacing, *reference.direction(), true)?;
    info!(
        "Output field has size {:?} and domain {:?} to {:?}",
        field_domain.size(),
        field_domain.sample_bounds().lower.to_vec(),
        field_domain.sample_bounds().upper.to_vec()
    );

    let region = *field_domain.region();
    let displacements: Vec<Vector<D>> = (0..region.number_of_pixels())
        .into_par_iter()
        .map(|offset| {
            let mut index = region.index;
            let mut rest = offset;
            for k in 0..D {
                index[k] += (rest % region.size[k]) as i64;
                rest /= region.size[k];
            }
            let point = field_domain.index_to_physical(&index);
            collection
                .try_transform_point(&point)
                .map(|mapped| mapped - point)
                .unwrap_or_else(|_| Vector::zeros())
        })
        .collect();

    Ok(DisplacementFieldTransform::new(field_domain, displacements)?)
}

/// Reduce block results into a displacement field over the fixed image.
///
/// Successful results are collected into a [`TransformCollection`] and
/// sampled with [`collection_to_displacement_field`]. The returned transform
/// does not include the initial transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceToDisplacementFieldMethod<const D: usize> {
    /// Field spacing relative to the fixed spacing, ITK order.
    pub scale_factors: [f64; D],
    pub blend: BlendMethod,
}

impl<const D: usize> Default for ReduceToDisplacementFieldMethod<D> {
    fn default() -> Self {
        Self {
            scale_factors: [1.0; D],
            blend: BlendMethod::DistanceWeightedMean,
        }
    }
}

impl<const D: usize> ReduceToDisplacementFieldMethod<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale_factors(mut self, scale_factors: [f64; D]) -> Self {
        self.scale_factors = scale_factors;
        self
    }

    pub fn with_blend(mut self, blend: BlendMethod) -> Self {
        self.blend = blend;
        self
    }
}

impl<B: Backend, const D: usize> ReduceResultsMethod<B, D> for ReduceToDisplacementFieldMethod<D> {
    fn reduce(
        &self,
        block_results: &[LocatedBlockResult<D>],
        fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
        initial_transform: &TransformRef<D>,
    ) -> Result<RegistrationTransformResult<D>> {
        let entries: Vec<TransformEntry<D>> = successful_entries(block_results).collect();
        if entries.is_empty() {
            return Err(RegistrationError::reduction(
                "Failed to compose at least one transform for sampling",
            ));
        }
        debug!("Sampling {} block transforms into a displacement field", entries.len());
        let collection = TransformCollection::from_entries(entries, self.blend);

        let reference = fixed_reader_ctor.construct()?;
        let field = collection_to_displacement_field(
            &collection,
            reference.domain(),
            initial_transform.as_ref(),
            &self.scale_factors,
        )?;
        Ok(RegistrationTransformResult::new(Arc::new(field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreg_core::image::ImageRegion;
    use dreg_core::spatial::{Direction, Point, Spacing};
    use dreg_core::transform::{IdentityTransform, TranslationTransform};

    #[test]
    fn test_collection_to_displacement_field() {
        let collection = TransformCollection::from_entries(
            vec![TransformEntry::unbounded(Arc::new(TranslationTransform::new(Vector::new([1.0; 3]))))],
            BlendMethod::DistanceWeightedMean,
        );
        let reference = ImageDomain::<3>::with_size([10, 10, 10]);

        let field =
            collection_to_displacement_field(&collection, &reference, &IdentityTransform::<3>::new(), &[2.0; 3]).unwrap();

        assert_eq!(field.domain().size(), [5, 5, 5]);
        assert_eq!(field.domain().spacing(), &Spacing::uniform(2.0));
        assert!(field
            .displacements()
            .iter()
            .all(|v| (*v - Vector::new([1.0; 3])).norm() < 1e-12));
    }

    #[test]
    fn test_field_follows_initial_transform() {
        let bounded = ImageDomain::new(
            Point::splat(20.0),
            Spacing::uniform(1.0),
            Direction::identity(),
            ImageRegion::from_size([4, 4]),
        )
        .unwrap();
        let collection = TransformCollection::from_entries(
            vec![TransformEntry::new(
                Arc::new(TranslationTransform::new(Vector::new([0.5, 0.0]))),
                Some(bounded),
            )],
            BlendMethod::SimpleMean,
        );
        let reference = ImageDomain::<2>::with_size([4, 4]);
        let initial = TranslationTransform::new(Vector::new([20.0, 20.0]));

        let field = collection_to_displacement_field(&collection, &reference, &initial, &[1.0, 1.0]).unwrap();

        assert_eq!(field.domain().origin(), &Point::splat(20.0));
        assert_eq!(field.domain().size(), [4, 4]);
        assert!(field.displacements().iter().all(|v| *v == Vector::new([0.5, 0.0])));
    }

    #[test]
    fn test_uncovered_voxels_are_zero() {
        let bounded = ImageDomain::<2>::with_size([2, 4]);
        let collection = TransformCollection::from_entries(
            vec![TransformEntry::new(
                Arc::new(TranslationTransform::new(Vector::new([1.0, 1.0]))),
                Some(bounded),
            )],
            BlendMethod::DistanceWeightedMean,
        );
        let reference = ImageDomain::<2>::with_size([4, 4]);
        let field =
            collection_to_displacement_field(&collection, &reference, &IdentityTransform::<2>::new(), &[1.0, 1.0]).unwrap();

        assert_eq!(field.displacement_at_index(&[1, 2]), Some(&Vector::new([1.0, 1.0])));
        assert_eq!(field.displacement_at_index(&[3, 2]), Some(&Vector::zeros()));
    }

    #[test]
    fn test_invalid_scale_factors() {
        let collection = TransformCollection::<2>::default();
        let reference = ImageDomain::<2>::with_size([4, 4]);
        assert!(
            collection_to_displacement_field(&collection, &reference, &IdentityTransform::<2>::new(), &[0.0, 1.0])
                .is_err()
        );
    }
}
