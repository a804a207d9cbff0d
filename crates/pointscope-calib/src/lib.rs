#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// COLMAP `cameras.txt` reader.
pub mod colmap;

/// Diagnostics collected by the line oriented readers.
pub mod diagnostics;

/// Error types for the calibration module.
pub mod error;

/// Dialect detection and the common reader interface.
pub mod format;

/// Canonical camera intrinsics.
pub mod intrinsics;

pub mod realsense;

pub mod stereo;

/// TUM RGB-D `camera.txt` reader.
pub mod tum;

pub mod zed;

pub use crate::diagnostics::{Diagnostic, Parsed};
pub use crate::error::CalibError;
pub use crate::format::{detect, load_calibration, read_calibration_file, CalibrationFormat};
pub use crate::intrinsics::{CameraFormat, CameraIntrinsics, CameraModel};
