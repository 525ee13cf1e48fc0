//! Image readers for block-wise registration.
//!
//! Readers stream one region at a time into a burn tensor. Both factories
//! implement [`dreg_registration::ConstructReaderMethod`], so every block
//! task can open its own reader.

pub mod memory;
pub mod nifti_io;

pub use memory::{MemoryReader, MemoryReaderFactory};
pub use nifti_io::{
    make_reader, read_nifti, read_nifti_domain, write_buffered_region, write_nifti, NiftiReader,
    NiftiReaderFactory,
};
