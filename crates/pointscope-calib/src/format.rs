use std::path::Path;

use crate::colmap::ColmapFormat;
use crate::diagnostics::Parsed;
use crate::error::CalibError;
use crate::intrinsics::CameraFormat;
use crate::realsense::RealSenseFormat;
use crate::stereo::StereoCalibFormat;
use crate::tum::TumFormat;
use crate::zed::ZedFormat;

/// A calibration dialect that can be recognized and normalized.
pub trait CalibrationFormat {
    /// Human readable name of the dialect.
    fn name(&self) -> &'static str;

    /// Whether the file name alone identifies the dialect.
    fn matches_file_name(&self, file_name: &str) -> bool;

    /// Whether the content looks like this dialect.
    fn looks_like(&self, content: &str) -> bool;

    /// Parse the content and convert it to canonical cameras.
    fn load(&self, content: &str) -> Result<Parsed<CameraFormat>, CalibError>;
}

/// Every known dialect, in content sniffing order.
pub fn formats() -> [&'static dyn CalibrationFormat; 5] {
    [
        &RealSenseFormat,
        &ZedFormat,
        &StereoCalibFormat,
        &ColmapFormat,
        &TumFormat,
    ]
}

/// Find the dialect of a calibration file.
///
/// The file name is tried first, then the content.
pub fn detect(file_name: &str, content: &str) -> Option<&'static dyn CalibrationFormat> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    formats()
        .into_iter()
        .find(|f| f.matches_file_name(base))
        .or_else(|| formats().into_iter().find(|f| f.looks_like(content)))
}

/// Detect, parse and normalize a calibration file.
///
/// Diagnostics collected while parsing are emitted with `log::warn!`.
///
/// # Arguments
///
/// * `file_name` - Name of the file, used to detect the dialect.
/// * `content` - The text content of the file.
///
/// # Errors
///
/// [`CalibError::UnknownFormat`] when no dialect is recognized, or the error
/// of the dialect's reader.
pub fn load_calibration(file_name: &str, content: &str) -> Result<CameraFormat, CalibError> {
    let format =
        detect(file_name, content).ok_or_else(|| CalibError::UnknownFormat(file_name.to_string()))?;
    log::debug!("reading {file_name} as {}", format.name());
    Ok(format.load(content)?.log_diagnostics(file_name))
}

/// Read and normalize a calibration file from disk.
pub fn read_calibration_file(path: impl AsRef<Path>) -> Result<CameraFormat, CalibError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    load_calibration(&path.to_string_lossy(), &content)
}
