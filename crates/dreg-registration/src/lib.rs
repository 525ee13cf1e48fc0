//! Block-wise registration of images too large to hold in memory.
//!
//! Registration is expressed as map-reduce over blocks of the fixed image:
//!
//! 1. [`scheduler::register_images`] subdivides the fixed image into
//!    (optionally overlapping) blocks.
//! 2. Every fixed block and the physically corresponding moving block are
//!    streamed into memory and registered by a
//!    [`base::BlockPairRegistrationMethod`].
//! 3. A [`base::ReduceResultsMethod`] combines the block transforms into one
//!    transform valid over the whole fixed image.

pub mod base;
pub mod block;
pub mod config;
pub mod error;
pub mod method;
pub mod progress;
pub mod reduce;
pub mod scheduler;
pub mod validation;

pub use base::{
    BlockInfo, BlockPairRegistrationMethod, BlockPairRegistrationResult, BlockRegStatus, ConstructReaderMethod,
    ImageReader, LocatedBlockResult, ReduceResultsMethod, RegistrationResult, RegistrationTransformResult,
};
pub use block::BlockGrid;
pub use config::{ExecutionMode, RegistrationConfig};
pub use error::{RegistrationError, Result};
pub use progress::{ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use scheduler::{register_images, RegistrationSchedule};
