#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Depth image representation.
pub mod depth;

/// Error types for the image module.
pub mod error;

/// Semantics of a decoded depth buffer.
pub mod metadata;

pub use crate::depth::DepthImage;
pub use crate::error::ImageError;
pub use crate::metadata::{
    Convention, DepthClamp, DepthKind, DepthMetadata, DepthUnit, ProjectionModel,
};
