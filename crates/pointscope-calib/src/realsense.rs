//! Intel RealSense calibration dumps in JSON.
//!
//! ```json
//! {
//!   "color_stream": { "intrinsics": { "fx": 615.0, "fy": 615.0, "ppx": 320.0, "ppy": 240.0,
//!                                      "coeffs": [0, 0, 0, 0, 0] } },
//!   "depth_stream": { "fx": 385.0, "fy": 385.0, "ppx": 320.0, "ppy": 240.0 },
//!   "extrinsics": { "translation": [0.015, 0.0, 0.0] },
//!   "depth_scale": 0.001
//! }
//! ```

use pointscope_image::DepthMetadata;
use serde::Deserialize;

use crate::diagnostics::{Diagnostic, Parsed};
use crate::error::CalibError;
use crate::format::CalibrationFormat;
use crate::intrinsics::{CameraFormat, CameraIntrinsics, CameraModel};

/// Intrinsics of one RealSense stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RealSenseIntrinsics {
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub ppx: f64,
    /// Principal point y in pixels.
    pub ppy: f64,
    /// Brown-Conrady coefficients `k1, k2, p1, p2, k3`.
    #[serde(default)]
    pub coeffs: Vec<f64>,
    /// Image width in pixels.
    pub width: Option<u32>,
    /// Image height in pixels.
    pub height: Option<u32>,
}

/// A stream entry, with the intrinsics nested or inline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RealSenseStream {
    /// `{ "intrinsics": { ... } }`
    Nested {
        /// The stream intrinsics.
        intrinsics: RealSenseIntrinsics,
    },
    /// `{ "fx": ..., "fy": ..., ... }`
    Inline(RealSenseIntrinsics),
}

impl RealSenseStream {
    /// The intrinsics, wherever they are stored.
    pub fn intrinsics(&self) -> &RealSenseIntrinsics {
        match self {
            RealSenseStream::Nested { intrinsics } | RealSenseStream::Inline(intrinsics) => {
                intrinsics
            }
        }
    }
}

/// Extrinsics between the depth and the color sensors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RealSenseExtrinsics {
    /// Translation in meters.
    pub translation: Vec<f64>,
}

/// The content of a RealSense calibration JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RealSenseCalibration {
    /// The color stream.
    pub color_stream: Option<RealSenseStream>,
    /// The depth stream.
    pub depth_stream: Option<RealSenseStream>,
    /// Extrinsics from depth to color.
    pub extrinsics: Option<RealSenseExtrinsics>,
    /// Meters per raw depth unit.
    pub depth_scale: Option<f64>,
}

impl RealSenseCalibration {
    /// Norm of the extrinsic translation, converted from meters to
    /// millimeters.
    pub fn baseline_mm(&self) -> Option<f64> {
        self.extrinsics
            .as_ref()
            .map(|e| e.translation.iter().map(|t| t * t).sum::<f64>().sqrt() * 1000.0)
    }

    /// Metadata of the depth stream: intrinsics and depth scale.
    pub fn depth_metadata(&self) -> DepthMetadata {
        let depth = self.depth_stream.as_ref().map(RealSenseStream::intrinsics);
        DepthMetadata {
            scale: self.depth_scale.map(|s| s as f32),
            fx: depth.map(|i| i.fx as f32),
            fy: depth.map(|i| i.fy as f32),
            cx: depth.map(|i| i.ppx as f32),
            cy: depth.map(|i| i.ppy as f32),
            ..Default::default()
        }
    }
}

/// Parse a RealSense calibration JSON document.
///
/// Distortion arrays that are not 5 elements long are reported as
/// diagnostics and ignored.
pub fn parse(content: &str) -> Result<Parsed<RealSenseCalibration>, CalibError> {
    let calib: RealSenseCalibration = serde_json::from_str(content)?;

    let mut diagnostics = Vec::new();
    let streams = [
        ("color_stream", &calib.color_stream),
        ("depth_stream", &calib.depth_stream),
    ];
    for (name, stream) in streams {
        if let Some(stream) = stream {
            let n = stream.intrinsics().coeffs.len();
            if n != 0 && n != 5 {
                diagnostics.push(Diagnostic::global(format!(
                    "{name}: ignoring coeffs with {n} elements, expected 5"
                )));
            }
        }
    }
    Ok(Parsed::new(calib, diagnostics))
}

fn camera_from_stream(
    name: &str,
    stream: &RealSenseStream,
) -> Result<CameraIntrinsics, CalibError> {
    let i = stream.intrinsics();
    let mut camera =
        CameraIntrinsics::new(name, i.fx, i.fy, i.ppx, i.ppy)?.with_size(i.width, i.height);
    if let &[k1, k2, p1, p2, k3] = i.coeffs.as_slice() {
        if [k1, k2, p1, p2, k3].iter().any(|c| *c != 0.0) {
            camera = camera.with_model(CameraModel::PinholeOpencv);
            camera.k1 = Some(k1);
            camera.k2 = Some(k2);
            camera.p1 = Some(p1);
            camera.p2 = Some(p2);
            camera.k3 = Some(k3);
        }
    }
    Ok(camera)
}

/// Map the streams to cameras named `color` and `depth`. The depth camera
/// carries the baseline in millimeters.
///
/// # Errors
///
/// [`CalibError::NoValidCameras`] when neither stream is present.
pub fn to_camera_format(calib: &RealSenseCalibration) -> Result<CameraFormat, CalibError> {
    let mut format = CameraFormat::default();
    if let Some(stream) = &calib.color_stream {
        format.insert(camera_from_stream("color", stream)?);
    }
    if let Some(stream) = &calib.depth_stream {
        let camera = camera_from_stream("depth", stream)?;
        format.insert(camera.with_baseline(calib.baseline_mm()));
    }
    if format.is_empty() {
        return Err(CalibError::NoValidCameras);
    }
    Ok(format)
}

/// Whether the content looks like a RealSense calibration file.
pub fn looks_like(content: &str) -> bool {
    content.trim_start().starts_with('{')
        && (content.contains("\"color_stream\"") || content.contains("\"depth_stream\""))
}

/// RealSense JSON reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealSenseFormat;

impl CalibrationFormat for RealSenseFormat {
    fn name(&self) -> &'static str {
        "RealSense JSON"
    }

    fn matches_file_name(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"))
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const D435: &str = r#"{
        "color_stream": {
            "intrinsics": {
                "fx": 615.0, "fy": 616.0, "ppx": 320.5, "ppy": 240.5,
                "coeffs": [0.1, -0.2, 0.001, 0.002, 0.05],
                "width": 640, "height": 480
            }
        },
        "depth_stream": {
            "fx": 385.0, "fy": 385.0, "ppx": 318.0, "ppy": 238.0,
            "coeffs": [0, 0, 0, 0, 0]
        },
        "extrinsics": { "translation": [0.03, 0.04, 0.0], "rotation": [1, 0, 0, 0, 1, 0, 0, 0, 1] },
        "depth_scale": 0.001
    }"#;

    #[test]
    fn streams_and_baseline() -> Result<(), CalibError> {
        let parsed = parse(D435)?;
        assert!(parsed.diagnostics.is_empty());

        let format = to_camera_format(&parsed.value)?;
        let color = format.get("color").unwrap();
        assert_eq!(color.camera_model, CameraModel::PinholeOpencv);
        assert_eq!(color.k3, Some(0.05));
        assert_eq!(color.p1, Some(0.001));
        assert_eq!(color.width, Some(640));
        assert_eq!(color.baseline, None);

        let depth = format.get("depth").unwrap();
        assert_eq!(depth.camera_model, CameraModel::Pinhole);
        assert!(!depth.has_distortion());
        assert_relative_eq!(depth.baseline.unwrap(), 50.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn depth_scale_metadata() -> Result<(), CalibError> {
        let meta = parse(D435)?.value.depth_metadata();
        assert_relative_eq!(meta.scale.unwrap(), 0.001);
        assert_eq!(meta.fx, Some(385.0));
        assert_eq!(meta.cx, Some(318.0));
        Ok(())
    }

    #[test]
    fn short_coeffs_are_ignored() -> Result<(), CalibError> {
        let content =
            r#"{"color_stream": {"fx": 1, "fy": 1, "ppx": 0, "ppy": 0, "coeffs": [0.1, 0.2]}}"#;
        let parsed = parse(content)?;
        assert_eq!(parsed.diagnostics.len(), 1);
        let format = to_camera_format(&parsed.value)?;
        assert!(!format.get("color").unwrap().has_distortion());
        Ok(())
    }

    #[test]
    fn no_streams() {
        let parsed = parse(r#"{"depth_scale": 0.001}"#).unwrap();
        assert!(matches!(
            to_camera_format(&parsed.value),
            Err(CalibError::NoValidCameras)
        ));
        assert!(matches!(parse("{"), Err(CalibError::JsonError(_))));
    }
}
