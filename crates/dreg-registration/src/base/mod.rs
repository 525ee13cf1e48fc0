//! Framework contracts shared by the scheduler, block registration methods
//! and reduction methods.

pub mod interface;
pub mod result;

pub use interface::{
    BlockPairRegistrationMethod, BoxedImageReader, ConstructReaderMethod, ImageReader, ReduceResultsMethod,
};
pub use result::{
    BlockInfo, BlockPairRegistrationResult, BlockRegStatus, LocatedBlockResult, RegistrationResult,
    RegistrationTransformResult,
};
