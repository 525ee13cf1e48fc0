//! Rigid consensus of block results.

use std::sync::Arc;

use burn::tensor::backend::Backend;
use dreg_core::spatial::Vector;
use dreg_core::transform::Euler3DTransform;
use dreg_core::TransformRef;
use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector4};
use tracing::debug;

use crate::base::{ConstructReaderMethod, LocatedBlockResult, ReduceResultsMethod, RegistrationTransformResult};
use crate::error::{RegistrationError, Result};

const RIGID_TOLERANCE: f64 = 1e-5;

/// Average a set of rigid transforms `p' = R·p + t`.
///
/// Translations are averaged linearly. Rotations are averaged as unit
/// quaternions: each quaternion is flipped into the hemisphere of the
/// running sum before it is added, and the sum is normalised.
pub fn estimate_euler_transform_consensus(samples: &[(Matrix3<f64>, Vector<3>)]) -> Result<Euler3DTransform> {
    if samples.is_empty() {
        return Err(RegistrationError::reduction("no rigid transforms to average"));
    }

    let mut quaternion_sum = Vector4::<f64>::zeros();
    let mut translation_sum = Vector::<3>::zeros();
    for (index, (rotation, translation)) in samples.iter().enumerate() {
        let orthogonal = (rotation * rotation.transpose() - Matrix3::identity())
            .iter()
            .all(|v| v.abs() <= RIGID_TOLERANCE);
        if !orthogonal || rotation.determinant() <= 0.0 {
            return Err(RegistrationError::transform(format!(
                "Matrix {} is not a rigid rotation matrix",
                index
            )));
        }
        let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
        let coords = q.into_inner().coords;
        quaternion_sum += if quaternion_sum.dot(&coords) < 0.0 { -coords } else { coords };
        translation_sum += *translation;
    }

    let mean_rotation = UnitQuaternion::from_quaternion(Quaternion::from(quaternion_sum))
        .to_rotation_matrix()
        .into_inner();
    let mean_translation = translation_sum / samples.len() as f64;
    Ok(Euler3DTransform::from_matrix(mean_rotation, mean_translation)?)
}

/// Reduce rigid block results into one [`Euler3DTransform`].
///
/// Every successful result must be affine and rigid.
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerConsensusReduceMethod;

impl EulerConsensusReduceMethod {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> ReduceResultsMethod<B, 3> for EulerConsensusReduceMethod {
    fn reduce(
        &self,
        block_results: &[LocatedBlockResult<3>],
        _fixed_reader_ctor: &dyn ConstructReaderMethod<B, 3>,
        _initial_transform: &TransformRef<3>,
    ) -> Result<RegistrationTransformResult<3>> {
        let mut samples = Vec::new();
        for located in block_results.iter().filter(|r| r.result.is_success()) {
            let Some(transform) = located.result.transform() else {
                continue;
            };
            debug!("Attempting to reduce transform {:?}", transform);
            let (matrix, offset) = transform.matrix_offset().ok_or_else(|| {
                RegistrationError::transform(format!(
                    "Could not get rigid consensus with transform type {}",
                    transform.name()
                ))
            })?;
            samples.push((matrix, offset));
        }
        if samples.is_empty() {
            return Err(RegistrationError::reduction("no block registration succeeded"));
        }

        let consensus = estimate_euler_transform_consensus(&samples)?;
        Ok(RegistrationTransformResult::new(Arc::new(consensus)))
    }
}
