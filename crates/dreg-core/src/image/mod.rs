//! Images, voxel regions and unbuffered image domains.

pub mod image;
pub mod region;
pub mod domain;
pub mod grid;

pub use image::Image;
pub use region::ImageRegion;
pub use domain::ImageDomain;
pub use grid::generate_grid;
