#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Sequential little/big endian reader over byte slices.
pub mod cursor;

/// Error types for the io module.
pub mod error;

/// OpenEXR scanline decoder for depth channels.
///
/// Supports single-part scanline images stored uncompressed or with ZIP/ZIPS
/// compression. Tiled, deep and multi-part files are rejected.
pub mod exr;

/// NumPy `.npy` array decoder.
pub mod npy;

/// NumPy `.npz` archive decoder.
pub mod npz;

/// TIFF depth decoding.
pub mod tiff;

/// PNG depth decoding.
pub mod png;

/// Portable float map decoding.
pub mod pfm;

/// HDF5 placeholder decoder.
pub mod hdf5;

pub mod color;

/// Format detection and dispatch to the depth decoders.
///
/// See [`registry::decode_depth`] for decoding a file of unknown format.
pub mod registry;

/// JSON sidecar files carrying depth metadata.
pub mod sidecar;

pub use crate::error::IoError;
pub use crate::registry::{decode_depth, DepthDecoder, DepthRead};
pub use crate::sidecar::read_depth_file;
