//! Reduction of block results into a transform valid over the whole fixed
//! image.

pub mod collection;
pub mod consensus;
pub mod dfield;

use std::sync::Arc;

use burn::tensor::backend::Backend;
use dreg_core::TransformRef;

use crate::base::{ConstructReaderMethod, LocatedBlockResult, ReduceResultsMethod, RegistrationTransformResult};
use crate::error::Result;

pub use collection::{BlendMethod, TransformCollection, TransformEntry};
pub use consensus::{estimate_euler_transform_consensus, EulerConsensusReduceMethod};
pub use dfield::{collection_to_displacement_field, ReduceToDisplacementFieldMethod};

/// Bounded entries for every successful block result.
pub(crate) fn successful_entries<const D: usize>(
    block_results: &[LocatedBlockResult<D>],
) -> impl Iterator<Item = TransformEntry<D>> + '_ {
    block_results
        .iter()
        .filter(|located| located.result.is_success())
        .filter_map(|located| {
            let transform = located.result.transform()?.clone();
            Some(TransformEntry::new(transform, located.result.transform_domain().cloned()))
        })
}

/// Return the block results themselves as a [`TransformCollection`].
///
/// Points outside every block domain are left unmoved by the collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformCollectionReduceMethod {
    pub blend: BlendMethod,
}

impl TransformCollectionReduceMethod {
    pub fn new(blend: BlendMethod) -> Self {
        Self { blend }
    }
}

impl<B: Backend, const D: usize> ReduceResultsMethod<B, D> for TransformCollectionReduceMethod {
    fn reduce(
        &self,
        block_results: &[LocatedBlockResult<D>],
        _fixed_reader_ctor: &dyn ConstructReaderMethod<B, D>,
        _initial_transform: &TransformRef<D>,
    ) -> Result<RegistrationTransformResult<D>> {
        let collection = TransformCollection::from_entries(successful_entries(block_results).collect(), self.blend);
        Ok(RegistrationTransformResult::new(Arc::new(collection)))
    }
}
