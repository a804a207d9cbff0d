#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for projection and vertex decoding.
pub mod error;

/// A single projected point.
pub mod point;

/// Point cloud container.
pub mod pointcloud;

/// Depth image to point back-projection.
pub mod projection;

/// Interleaved vertex buffer decoding.
pub mod vertex;

pub use crate::error::{ProjectionError, VertexError};
pub use crate::point::Point3;
pub use crate::pointcloud::PointCloud;
pub use crate::projection::{apply_calibration, project_depth, project_depth_with_colors};
pub use crate::vertex::{
    decode_vertices, DecodedVertices, ScalarType, VertexLayout, VertexProperty,
};
