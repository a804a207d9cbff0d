use std::path::Path;

use crate::diagnostics::{Diagnostic, Parsed};
use crate::error::CalibError;
use crate::format::CalibrationFormat;
use crate::intrinsics::{CameraFormat, CameraIntrinsics, CameraModel};

/// The COLMAP camera models understood by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModelId {
    /// `f, cx, cy`
    CameraModelSimplePinhole,
    /// `fx, fy, cx, cy`
    CameraModelPinhole,
    /// `f, cx, cy, k`
    CameraModelSimplifiedRadial,
    /// `f, cx, cy, k1`
    CameraModelRadial,
    /// `fx, fy, cx, cy, k1, k2, p1, p2`
    CameraModelOpenCV,
    /// `fx, fy, cx, cy, k1, k2, k3, k4`
    CameraModelOpenCVFisheye,
}

impl CameraModelId {
    /// Model of a COLMAP model name such as `PINHOLE`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SIMPLE_PINHOLE" => Some(Self::CameraModelSimplePinhole),
            "PINHOLE" => Some(Self::CameraModelPinhole),
            "SIMPLE_RADIAL" => Some(Self::CameraModelSimplifiedRadial),
            "RADIAL" => Some(Self::CameraModelRadial),
            "OPENCV" => Some(Self::CameraModelOpenCV),
            "OPENCV_FISHEYE" => Some(Self::CameraModelOpenCVFisheye),
            _ => None,
        }
    }

    /// Exact number of parameters the model takes.
    pub fn num_params(&self) -> usize {
        match self {
            Self::CameraModelSimplePinhole => 3,
            Self::CameraModelPinhole
            | Self::CameraModelSimplifiedRadial
            | Self::CameraModelRadial => 4,
            Self::CameraModelOpenCV | Self::CameraModelOpenCVFisheye => 8,
        }
    }
}

/// One line of a COLMAP `cameras.txt` file.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera identifier.
    pub camera_id: u32,
    /// Camera model.
    pub model_id: CameraModelId,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Model parameters, see [`CameraModelId`].
    pub params: Vec<f64>,
}

impl ColmapCamera {
    /// Canonical intrinsics of the camera, named `camera_{id}`.
    pub fn to_intrinsics(&self) -> Result<CameraIntrinsics, CalibError> {
        let name = format!("camera_{}", self.camera_id);
        let p = &self.params;
        let camera = match self.model_id {
            CameraModelId::CameraModelSimplePinhole => {
                CameraIntrinsics::new(name, p[0], p[0], p[1], p[2])?
            }
            CameraModelId::CameraModelPinhole => {
                CameraIntrinsics::new(name, p[0], p[1], p[2], p[3])?
            }
            CameraModelId::CameraModelSimplifiedRadial | CameraModelId::CameraModelRadial => {
                let mut camera = CameraIntrinsics::new(name, p[0], p[0], p[1], p[2])?
                    .with_model(CameraModel::PinholeOpencv);
                camera.k1 = Some(p[3]);
                camera
            }
            CameraModelId::CameraModelOpenCV => {
                let mut camera = CameraIntrinsics::new(name, p[0], p[1], p[2], p[3])?
                    .with_model(CameraModel::PinholeOpencv);
                camera.k1 = Some(p[4]);
                camera.k2 = Some(p[5]);
                camera.p1 = Some(p[6]);
                camera.p2 = Some(p[7]);
                camera
            }
            CameraModelId::CameraModelOpenCVFisheye => {
                let mut camera = CameraIntrinsics::new(name, p[0], p[1], p[2], p[3])?
                    .with_model(CameraModel::FisheyeOpencv);
                camera.k1 = Some(p[4]);
                camera.k2 = Some(p[5]);
                camera.k3 = Some(p[6]);
                camera.k4 = Some(p[7]);
                camera
            }
        };
        Ok(camera.with_size(Some(self.width), Some(self.height)))
    }
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>().map_err(|e| format!("{}: {}", s, e))
}

/// Parse a camera line.
/// NOTE: CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, String> {
    // split the line into parts by whitespace
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 4 {
        return Err(format!("Invalid number of parts: {}", parts.len()));
    }

    let model_id = CameraModelId::from_name(parts[1])
        .ok_or_else(|| format!("unsupported camera model {}", parts[1]))?;

    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<f64>, _>>()?;
    if params.len() != model_id.num_params() {
        return Err(format!(
            "{} expects {} parameters, got {}",
            parts[1],
            model_id.num_params(),
            params.len()
        ));
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model_id,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// Parse the content of a COLMAP `cameras.txt` file.
///
/// Malformed lines, unknown models, wrong parameter counts and cameras with
/// non-positive focal lengths are skipped with a diagnostic.
///
/// # Errors
///
/// [`CalibError::NoValidCameras`] when no line holds a usable camera.
pub fn parse(content: &str) -> Result<Parsed<Vec<ColmapCamera>>, CalibError> {
    let mut cameras = Vec::new();
    let mut diagnostics = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_camera_line(line).and_then(|camera| {
            camera
                .to_intrinsics()
                .map(|_| camera)
                .map_err(|e| e.to_string())
        }) {
            Ok(camera) => cameras.push(camera),
            Err(reason) => diagnostics.push(Diagnostic::at_line(
                idx + 1,
                format!("skipping camera: {reason}"),
            )),
        }
    }

    if cameras.is_empty() {
        return Err(CalibError::NoValidCameras);
    }
    Ok(Parsed::new(cameras, diagnostics))
}

/// Map the cameras to canonical intrinsics named `camera_{id}`.
pub fn to_camera_format(cameras: &[ColmapCamera]) -> Result<CameraFormat, CalibError> {
    cameras.iter().map(ColmapCamera::to_intrinsics).collect()
}

/// Whether the content looks like a COLMAP `cameras.txt` file.
pub fn looks_like(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .any(|l| {
            let mut parts = l.split_whitespace();
            parts.next().is_some_and(|id| id.parse::<u32>().is_ok())
                && parts.next().and_then(CameraModelId::from_name).is_some()
        })
}

/// Read the cameras.txt file and return the cameras it holds.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
pub fn read_cameras_txt(
    path: impl AsRef<Path>,
) -> Result<Parsed<Vec<ColmapCamera>>, CalibError> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// COLMAP `cameras.txt` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColmapFormat;

impl CalibrationFormat for ColmapFormat {
    fn name(&self) -> &'static str {
        "COLMAP cameras.txt"
    }

    fn matches_file_name(&self, file_name: &str) -> bool {
        file_name.eq_ignore_ascii_case("cameras.txt")
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
