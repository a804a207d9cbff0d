//! Middlebury style stereo `calib.txt` files.
//!
//! ```text
//! cam0=[3997.684 0 1176.728; 0 3997.684 1011.728; 0 0 1]
//! cam1=[3997.684 0 1307.839; 0 3997.684 1011.728; 0 0 1]
//! doffs=131.111
//! baseline=193.001
//! width=2964
//! height=1988
//! ndisp=280
//! ```

use std::collections::BTreeMap;

use pointscope_image::{DepthKind, DepthMetadata, DepthUnit};

use crate::diagnostics::{Diagnostic, Parsed};
use crate::error::CalibError;
use crate::format::CalibrationFormat;
use crate::intrinsics::{CameraFormat, CameraIntrinsics};

/// Tolerance of the check between `doffs` and the principal point offset.
pub const DOFFS_TOLERANCE: f64 = 1e-3;

/// A 3x3 camera matrix, row-major.
pub type CameraMatrix = [[f64; 3]; 3];

/// The content of a stereo `calib.txt` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoCalibration {
    /// Camera matrices keyed by name (`cam0`, `cam1`).
    pub cameras: BTreeMap<String, CameraMatrix>,
    /// Disparity offset, `cx1 - cx0`.
    pub doffs: Option<f64>,
    /// Camera baseline, in millimeters for Middlebury data.
    pub baseline: Option<f64>,
    /// Image width in pixels.
    pub width: Option<u32>,
    /// Image height in pixels.
    pub height: Option<u32>,
    /// Upper bound of the disparity range.
    pub ndisp: Option<u32>,
    /// Whether the disparities are integers.
    pub isint: Option<u32>,
    /// Minimum disparity for visualization.
    pub vmin: Option<f64>,
    /// Maximum disparity for visualization.
    pub vmax: Option<f64>,
    /// Average vertical disparity.
    pub dyavg: Option<f64>,
    /// Maximum vertical disparity.
    pub dymax: Option<f64>,
}

impl StereoCalibration {
    /// Focal length of the reference camera.
    pub fn focal_length(&self) -> Option<f64> {
        self.cameras.values().next().map(|m| m[0][0])
    }

    /// Convert a disparity to depth with `baseline * f / (d + doffs)`.
    ///
    /// Returns NaN when `d + doffs <= 0` or when the baseline or the focal
    /// length is unknown. The depth has the unit of the baseline.
    pub fn disparity_to_depth(&self, disparity: f64) -> f64 {
        let (Some(baseline), Some(focal)) = (self.baseline, self.focal_length()) else {
            return f64::NAN;
        };
        let shifted = disparity + self.doffs.unwrap_or(0.0);
        if shifted <= 0.0 {
            return f64::NAN;
        }
        baseline * focal / shifted
    }

    /// Metadata to project a disparity map of this stereo pair.
    ///
    /// The baseline of Middlebury files is in millimeters, so the depth unit
    /// is millimeter.
    pub fn depth_metadata(&self) -> DepthMetadata {
        let reference = self.cameras.values().next();
        DepthMetadata {
            kind: Some(DepthKind::Disparity),
            unit: Some(DepthUnit::Millimeter),
            fx: reference.map(|m| m[0][0] as f32),
            fy: reference.map(|m| m[1][1] as f32),
            cx: reference.map(|m| m[0][2] as f32),
            cy: reference.map(|m| m[1][2] as f32),
            baseline: self.baseline.map(|b| b as f32),
            disparity_offset: self.doffs.map(|d| d as f32),
            ..Default::default()
        }
    }

    fn validate(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<(), CalibError> {
        if self.cameras.is_empty() {
            return Err(CalibError::NoValidCameras);
        }
        let baseline = self.baseline.ok_or(CalibError::MissingField("baseline"))?;
        if baseline.is_nan() || baseline <= 0.0 {
            return Err(CalibError::NonPositive {
                name: "baseline".to_string(),
                value: baseline,
            });
        }
        for (name, m) in &self.cameras {
            for (axis, f) in [("fx", m[0][0]), ("fy", m[1][1])] {
                if f.is_nan() || f <= 0.0 {
                    return Err(CalibError::NonPositive {
                        name: format!("{name}.{axis}"),
                        value: f,
                    });
                }
            }
        }

        if let (Some(doffs), Some(cam0), Some(cam1)) =
            (self.doffs, self.cameras.get("cam0"), self.cameras.get("cam1"))
        {
            let expected = cam1[0][2] - cam0[0][2];
            if (doffs - expected).abs() > DOFFS_TOLERANCE {
                diagnostics.push(Diagnostic::global(format!(
                    "doffs {doffs} differs from cx1 - cx0 = {expected}"
                )));
            }
        }
        Ok(())
    }
}

/// Parse a `[a b c; d e f; g h i]` matrix literal.
pub fn parse_matrix(camera: &str, literal: &str) -> Result<CameraMatrix, CalibError> {
    let invalid = |reason: String| CalibError::InvalidMatrix {
        camera: camera.to_string(),
        reason,
    };

    let inner = literal
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| invalid("expected a [..] literal".to_string()))?;

    let rows = inner.split(';').collect::<Vec<_>>();
    if rows.len() != 3 {
        return Err(invalid(format!("expected 3 rows, got {}", rows.len())));
    }

    let mut matrix = [[0.0; 3]; 3];
    for (r, row) in rows.iter().enumerate() {
        let values = row
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(format!("row {r}: {e}")))?;
        matrix[r] = values.try_into().map_err(|v: Vec<f64>| {
            invalid(format!("row {r} has {} values, expected 3", v.len()))
        })?;
    }

    if matrix[2] != [0.0, 0.0, 1.0] {
        return Err(invalid(format!(
            "third row must be [0 0 1], got {:?}",
            matrix[2]
        )));
    }
    Ok(matrix)
}

fn parse_number<T: std::str::FromStr>(
    line: usize,
    key: &str,
    value: &str,
) -> Result<T, CalibError> {
    value.parse::<T>().map_err(|_| CalibError::ParseError {
        line,
        message: format!("invalid value '{value}' for {key}"),
    })
}

fn is_camera_key(key: &str) -> bool {
    key.strip_prefix("cam")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Parse the content of a stereo `calib.txt` file.
///
/// Unknown keys and lines without `=` are reported as diagnostics. A malformed
/// matrix, a missing or non-positive baseline and non-positive focal lengths
/// are errors. A `doffs` that disagrees with the principal points only yields
/// a diagnostic.
pub fn parse(content: &str) -> Result<Parsed<StereoCalibration>, CalibError> {
    let mut calib = StereoCalibration::default();
    let mut diagnostics = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            diagnostics.push(Diagnostic::at_line(
                line_no,
                format!("expected key=value, got '{line}'"),
            ));
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            k if is_camera_key(k) => {
                calib.cameras.insert(k.to_string(), parse_matrix(k, value)?);
            }
            "doffs" => calib.doffs = Some(parse_number(line_no, key, value)?),
            "baseline" => calib.baseline = Some(parse_number(line_no, key, value)?),
            "width" => calib.width = Some(parse_number(line_no, key, value)?),
            "height" => calib.height = Some(parse_number(line_no, key, value)?),
            "ndisp" => calib.ndisp = Some(parse_number(line_no, key, value)?),
            "isint" => calib.isint = Some(parse_number(line_no, key, value)?),
            "vmin" => calib.vmin = Some(parse_number(line_no, key, value)?),
            "vmax" => calib.vmax = Some(parse_number(line_no, key, value)?),
            "dyavg" => calib.dyavg = Some(parse_number(line_no, key, value)?),
            "dymax" => calib.dymax = Some(parse_number(line_no, key, value)?),
            _ => diagnostics.push(Diagnostic::at_line(line_no, format!("unknown key '{key}'"))),
        }
    }

    calib.validate(&mut diagnostics)?;
    Ok(Parsed::new(calib, diagnostics))
}

/// Map the cameras to canonical pinhole intrinsics carrying the baseline, the
/// disparity offset and the image size.
pub fn to_camera_format(calib: &StereoCalibration) -> Result<CameraFormat, CalibError> {
    calib
        .cameras
        .iter()
        .map(|(name, m)| {
            Ok(CameraIntrinsics::new(name.as_str(), m[0][0], m[1][1], m[0][2], m[1][2])?
                .with_baseline(calib.baseline)
                .with_disparity_offset(calib.doffs)
                .with_size(calib.width, calib.height))
        })
        .collect()
}

/// Whether the content looks like a stereo `calib.txt` file.
pub fn looks_like(content: &str) -> bool {
    content.lines().any(|line| {
        line.split_once('=')
            .is_some_and(|(k, v)| is_camera_key(k.trim()) && v.trim_start().starts_with('['))
    })
}

/// Stereo `calib.txt` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoCalibFormat;

impl CalibrationFormat for StereoCalibFormat {
    fn name(&self) -> &'static str {
        "stereo calib.txt"
    }

    fn matches_file_name(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case("calib.txt")
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
