//! Exhaustive translation search between a fixed and a moving block.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use dreg_core::filter::ResampleImageFilter;
use dreg_core::region::image_to_physical_region;
use dreg_core::spatial::Vector;
use dreg_core::transform::{CompositeTransform, TranslationTransform};
use dreg_core::{Image, ImageDomain, TransformRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{BlockInfo, BlockPairRegistrationMethod, BlockPairRegistrationResult};
use crate::error::{RegistrationError, Result};
use crate::validation::validate_correlation_threshold;

/// Translation search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSearchConfig {
    /// Physical distance between candidate translations along each axis,
    /// ITK order. Defaults to the moving image spacing.
    pub step: Option<Vec<f64>>,
    /// Number of steps searched on each side of zero along every axis.
    pub radius: usize,
    /// Best correlation required for the block to succeed.
    pub min_correlation: f64,
}

impl Default for TranslationSearchConfig {
    fn default() -> Self {
        Self {
            step: None,
            radius: 2,
            min_correlation: 0.5,
        }
    }
}

impl TranslationSearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: Vec<f64>) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_min_correlation(mut self, min_correlation: f64) -> Self {
        self.min_correlation = min_correlation;
        self
    }
}

/// Registers a block pair by trying every translation on a regular grid and
/// keeping the one with the highest normalized cross correlation.
///
/// The moving block is sampled at `initial(x) + t` for every fixed voxel `x`
/// of the requested (unpadded) fixed region. Only voxels that map inside the
/// moving buffer take part in the correlation. The resulting
/// [`TranslationTransform`] is valid over the padded fixed block mapped
/// through the initial transform.
#[derive(Debug, Clone, Default)]
pub struct TranslationSearchMethod {
    config: TranslationSearchConfig,
}

impl TranslationSearchMethod {
    pub fn new(config: TranslationSearchConfig) -> Result<Self> {
        validate_correlation_threshold(config.min_correlation)?;
        if let Some(step) = &config.step {
            if step.iter().any(|s| !s.is_finite() || *s <= 0.0) {
                return Err(RegistrationError::invalid_configuration(format!(
                    "Search step must be positive, got {:?}",
                    step
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &TranslationSearchConfig {
        &self.config
    }

    fn step<const D: usize>(&self, moving_spacing: &Vector<D>) -> Result<[f64; D]> {
        match &self.config.step {
            Some(step) if step.len() == D => Ok(std::array::from_fn(|k| step[k])),
            Some(step) => Err(RegistrationError::dimension_mismatch(format!(
                "Search step {:?} does not match image dimension {}",
                step, D
            ))),
            None => Ok(moving_spacing.to_array()),
        }
    }

    /// Grid offsets ordered by distance from zero, so ties keep the
    /// smallest translation.
    fn candidate_offsets<const D: usize>(&self) -> Vec<[i64; D]> {
        let radius = self.config.radius as i64;
        let width = (2 * radius + 1) as usize;
        let mut offsets: Vec<[i64; D]> = (0..width.pow(D as u32))
            .map(|flat| {
                let mut rest = flat;
                std::array::from_fn(|_| {
                    let value = (rest % width) as i64 - radius;
                    rest /= width;
                    value
                })
            })
            .collect();
        offsets.sort_by_key(|o| o.iter().map(|v| v * v).sum::<i64>());
        offsets
    }
}

/// Normalized cross correlation over voxels where `mask` is 1.
///
/// `None` when fewer than two voxels overlap or either side is constant.
fn masked_ncc<B: Backend>(fixed: Tensor<B, 1>, moving: Tensor<B, 1>, mask: Tensor<B, 1>) -> Option<f64> {
    let count = mask.clone().sum().into_scalar().elem::<f64>();
    if count < 2.0 {
        return None;
    }
    let mean_f = (fixed.clone() * mask.clone()).sum().into_scalar().elem::<f64>() / count;
    let mean_m = (moving.clone() * mask.clone()).sum().into_scalar().elem::<f64>() / count;

    let df = fixed.sub_scalar(mean_f) * mask.clone();
    let dm = moving.sub_scalar(mean_m) * mask;

    let numerator = (df.clone() * dm.clone()).sum().into_scalar().elem::<f64>();
    let denom_f = df.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
    let denom_m = dm.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
    let denominator = (denom_f * denom_m).sqrt();
    if denominator < 1e-12 {
        return None;
    }
    Some(numerator / denominator)
}

impl<B: Backend, const D: usize> BlockPairRegistrationMethod<B, D> for TranslationSearchMethod {
    fn register(
        &self,
        fixed_subimage: &Image<B, D>,
        moving_subimage: &Image<B, D>,
        initial_transform: &TransformRef<D>,
        block_info: &BlockInfo<D>,
    ) -> Result<BlockPairRegistrationResult<D>> {
        let chunk = block_info.chunk_index;
        let step = self.step(moving_subimage.spacing())?;

        let fixed_roi = fixed_subimage.extract_region(fixed_subimage.requested_region())?;
        let n = fixed_roi.requested_region().number_of_pixels();
        let fixed_values = fixed_roi.data().clone().reshape([n]);

        let mut best: Option<(f64, Vector<D>)> = None;
        for offset in self.candidate_offsets::<D>() {
            let translation = Vector::new(std::array::from_fn(|k| offset[k] as f64 * step[k]));
            let candidate: TransformRef<D> = Arc::new(
                CompositeTransform::new()
                    .then(initial_transform.clone())
                    .then(Arc::new(TranslationTransform::new(translation))),
            );
            let (sampled, mask) =
                ResampleImageFilter::new(fixed_roi.domain().clone(), candidate).apply_with_mask(moving_subimage)?;
            let score = masked_ncc(
                fixed_values.clone(),
                sampled.into_data().reshape([n]),
                mask.into_data().reshape([n]),
            );
            if let Some(score) = score {
                if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                    best = Some((score, translation));
                }
            }
        }

        let (score, translation) = best.ok_or_else(|| {
            RegistrationError::block_registration("fixed and moving blocks do not overlap")
        })?;
        debug!(
            "{:?} -> Best translation {:?} with correlation {:.4}",
            chunk,
            translation.to_vec(),
            score
        );
        if score < self.config.min_correlation {
            return Err(RegistrationError::block_registration(format!(
                "best correlation {:.4} is below {}",
                score, self.config.min_correlation
            )));
        }

        let valid_region = image_to_physical_region(
            fixed_subimage.buffered_region(),
            fixed_subimage.domain(),
            Some(initial_transform.as_ref()),
        );
        let domain = ImageDomain::from_physical_region(
            &valid_region,
            *fixed_subimage.spacing(),
            *fixed_subimage.direction(),
            true,
        )?;
        BlockPairRegistrationResult::success(Arc::new(TranslationTransform::new(translation)), domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use dreg_core::image::ImageRegion;
    use dreg_core::spatial::{Direction, Point, Spacing};
    use dreg_core::transform::IdentityTransform;
    use dreg_core::Transform;

    type B = NdArray<f32>;

    /// Gaussian blob centred at `center`, ITK order.
    fn blob(size: [usize; 2], center: [f64; 2]) -> Image<B, 2> {
        let mut voxels = Vec::with_capacity(size[0] * size[1]);
        for j in 0..size[1] {
            for i in 0..size[0] {
                let dx = i as f64 - center[0];
                let dy = j as f64 - center[1];
                voxels.push((-(dx * dx + dy * dy) / 8.0).exp() as f32);
            }
        }
        let domain = ImageDomain::new(
            Point::origin(),
            Spacing::uniform(1.0),
            Direction::identity(),
            ImageRegion::from_size(size),
        )
        .unwrap();
        Image::from_voxels(voxels, domain, &Default::default()).unwrap()
    }

    fn identity() -> TransformRef<2> {
        Arc::new(IdentityTransform::<2>::new())
    }

    #[test]
    fn test_candidates_start_at_zero() {
        let method = TranslationSearchMethod::new(TranslationSearchConfig::new().with_radius(1)).unwrap();
        let offsets = method.candidate_offsets::<2>();
        assert_eq!(offsets.len(), 9);
        assert_eq!(offsets[0], [0, 0]);
        assert_eq!(offsets[8].iter().map(|v| v * v).sum::<i64>(), 2);
    }

    #[test]
    fn test_recovers_translation() {
        let fixed = blob([16, 16], [7.0, 8.0]);
        let moving = blob([16, 16], [9.0, 7.0]);
        let info = BlockInfo::new([0, 0], [0..16, 0..16]);

        let method = TranslationSearchMethod::new(TranslationSearchConfig::new().with_radius(3)).unwrap();
        let result = method.register(&fixed, &moving, &identity(), &info).unwrap();

        assert!(result.is_success());
        let transform = result.transform().unwrap();
        let q = transform.transform_point(&Point::origin());
        assert_eq!(q, Point::new([2.0, -1.0]));
        assert_eq!(result.transform_domain().unwrap().size(), [16, 16]);
    }

    #[test]
    fn test_low_correlation_fails() {
        let fixed = blob([8, 8], [3.0, 3.0]);
        let moving = blob([8, 8], [3.0, 3.0]);
        let info = BlockInfo::new([0, 0], [0..8, 0..8]);

        // the search never reaches the aligned position
        let method = TranslationSearchMethod::new(
            TranslationSearchConfig::new()
                .with_radius(0)
                .with_step(vec![1.0, 1.0])
                .with_min_correlation(1.0),
        )
        .unwrap();
        let shifted: TransformRef<2> = Arc::new(TranslationTransform::new(Vector::new([3.0, 0.0])));
        assert!(method.register(&fixed, &moving, &shifted, &info).is_err());
    }

    #[test]
    fn test_invalid_config() {
        assert!(TranslationSearchMethod::new(TranslationSearchConfig::new().with_min_correlation(2.0)).is_err());
        assert!(TranslationSearchMethod::new(TranslationSearchConfig::new().with_step(vec![0.0, 1.0])).is_err());
    }
}
