//! Spatial transforms.
//!
//! All transforms implement [`Transform`] and map physical points in double
//! precision. [`transform_points_tensor`] applies any transform to a batch of
//! points held in a burn tensor.

pub mod trait_;
pub mod identity;
pub mod translation;
pub mod affine;
pub mod euler;
pub mod displacement_field;
pub mod composite;

pub use trait_::{transform_points_tensor, Transform, TransformRef};
pub use identity::IdentityTransform;
pub use translation::TranslationTransform;
pub use affine::AffineTransform;
pub use euler::Euler3DTransform;
pub use displacement_field::DisplacementFieldTransform;
pub use composite::CompositeTransform;
