//! Core types for block-wise registration of large images.
//!
//! * [`spatial`]: points, vectors, spacing and direction matrices.
//! * [`image`]: voxel regions, unbuffered image domains and buffered images.
//! * [`region`]: conversions between voxel blocks and physical boxes.
//! * [`transform`]: spatial transforms shared between worker threads.
//! * [`interpolation`] and [`filter`]: sampling and resampling.
//!
//! Voxel tensors use NumPy axis order (`[z, y, x]`); indices, regions,
//! spacing and physical points use ITK order (`x` first).

pub mod error;
pub mod spatial;
pub mod image;
pub mod region;
pub mod transform;
pub mod interpolation;
pub mod filter;

pub use error::{CoreError, Result};
pub use image::{Image, ImageDomain, ImageRegion};
pub use region::{BlockRegion, PhysicalRegion};
pub use spatial::{Direction, Point, Spacing, Vector};
pub use transform::{Transform, TransformRef};
