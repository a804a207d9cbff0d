use pointscope_image::{DepthKind, DepthMetadata};

use crate::diagnostics::{Diagnostic, Parsed};
use crate::error::CalibError;
use crate::format::CalibrationFormat;
use crate::intrinsics::{CameraFormat, CameraIntrinsics};

/// Raw value of a TUM depth PNG that corresponds to one meter.
pub const TUM_DEPTH_FACTOR: f32 = 5000.0;

/// Pinhole intrinsics of a TUM RGB-D `camera.txt` file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TumIntrinsics {
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
}

impl TumIntrinsics {
    /// Metadata of the 16-bit depth PNGs of the TUM RGB-D dataset: optical
    /// axis distance scaled by [`TUM_DEPTH_FACTOR`].
    pub fn depth_metadata(&self) -> DepthMetadata {
        DepthMetadata {
            kind: Some(DepthKind::Z),
            scale: Some(1.0 / TUM_DEPTH_FACTOR),
            fx: Some(self.fx as f32),
            fy: Some(self.fy as f32),
            cx: Some(self.cx as f32),
            cy: Some(self.cy as f32),
            ..Default::default()
        }
    }
}

fn parse_line(line: &str) -> Option<TumIntrinsics> {
    let values = line
        .split_whitespace()
        .map(|v| v.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        &[fx, fy, cx, cy] => Some(TumIntrinsics { fx, fy, cx, cy }),
        _ => None,
    }
}

/// Parse a TUM `camera.txt` file: the first line made of exactly four
/// numbers `fx fy cx cy` wins.
///
/// # Errors
///
/// [`CalibError::NoValidIntrinsics`] when no such line exists.
pub fn parse(content: &str) -> Result<Parsed<TumIntrinsics>, CalibError> {
    let mut diagnostics = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Some(intrinsics) => return Ok(Parsed::new(intrinsics, diagnostics)),
            None => diagnostics.push(Diagnostic::at_line(
                idx + 1,
                format!("expected 'fx fy cx cy', got '{line}'"),
            )),
        }
    }

    Err(CalibError::NoValidIntrinsics)
}

/// Map the intrinsics to a single pinhole camera named `camera`.
pub fn to_camera_format(intrinsics: &TumIntrinsics) -> Result<CameraFormat, CalibError> {
    let camera = CameraIntrinsics::new(
        "camera",
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
    )?;
    Ok(CameraFormat::from_iter([camera]))
}

/// Whether the content looks like a TUM `camera.txt` file.
pub fn looks_like(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .any(|l| parse_line(l).is_some())
}

/// TUM RGB-D `camera.txt` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct TumFormat;

impl CalibrationFormat for TumFormat {
    fn name(&self) -> &'static str {
        "TUM camera.txt"
    }

    fn matches_file_name(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case("camera.txt")
    }

    fn looks_like(&self, content: &str) -> bool {
        looks_like(content)
    }

    fn load(&self, content: &str) -> Result<Parsed<CameraFormat>, CalibError> {
        let parsed = parse(content)?;
        let format = to_camera_format(&parsed.value)?;
        Ok(Parsed::new(format, parsed.diagnostics))
    }
}
