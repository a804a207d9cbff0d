use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CalibError;

/// Projection and distortion model of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraModel {
    /// Ideal pinhole without distortion.
    #[default]
    Pinhole,
    /// Pinhole with Brown-Conrady distortion `k1, k2, p1, p2[, k3]`.
    PinholeOpencv,
    /// Equidistant fisheye with distortion `k1..k4`.
    FisheyeOpencv,
}

/// Canonical intrinsics of one camera.
///
/// Every calibration reader maps its native fields to this record.
/// Distortion coefficients are only set when the source encodes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Name of the camera, unique within a [`CameraFormat`].
    pub name: String,
    /// Focal length along x in pixels.
    pub fx: f64,
    /// Focal length along y in pixels.
    pub fy: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
    /// Projection model.
    pub camera_model: CameraModel,
    /// First radial distortion coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k1: Option<f64>,
    /// Second radial distortion coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k2: Option<f64>,
    /// Third radial distortion coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k3: Option<f64>,
    /// Fourth radial distortion coefficient, fisheye only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k4: Option<f64>,
    /// First tangential distortion coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    /// Second tangential distortion coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2: Option<f64>,
    /// Stereo baseline in millimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    /// Constant added to disparities before converting them to depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disparity_offset: Option<f64>,
    /// Image width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

fn check_positive(name: &str, value: f64) -> Result<(), CalibError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CalibError::NonPositive {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

impl CameraIntrinsics {
    /// Create a pinhole camera without distortion.
    ///
    /// # Errors
    ///
    /// [`CalibError::NonPositive`] when `fx` or `fy` is not strictly positive.
    ///
    /// # Example
    ///
    /// ```
    /// use pointscope_calib::CameraIntrinsics;
    ///
    /// let camera = CameraIntrinsics::new("cam0", 500.0, 500.0, 320.0, 240.0).unwrap();
    /// assert_eq!(camera.fx, 500.0);
    /// assert!(CameraIntrinsics::new("cam0", 0.0, 500.0, 320.0, 240.0).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<Self, CalibError> {
        let name = name.into();
        check_positive(&format!("{name}.fx"), fx)?;
        check_positive(&format!("{name}.fy"), fy)?;
        Ok(Self {
            name,
            fx,
            fy,
            cx,
            cy,
            camera_model: CameraModel::Pinhole,
            k1: None,
            k2: None,
            k3: None,
            k4: None,
            p1: None,
            p2: None,
            baseline: None,
            disparity_offset: None,
            width: None,
            height: None,
        })
    }

    /// Set the projection model.
    pub fn with_model(mut self, camera_model: CameraModel) -> Self {
        self.camera_model = camera_model;
        self
    }

    /// Set the stereo baseline, in millimeters.
    pub fn with_baseline(mut self, baseline: Option<f64>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Set the disparity offset.
    pub fn with_disparity_offset(mut self, disparity_offset: Option<f64>) -> Self {
        self.disparity_offset = disparity_offset;
        self
    }

    /// Set the image size.
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether any distortion coefficient is set.
    pub fn has_distortion(&self) -> bool {
        [self.k1, self.k2, self.k3, self.k4, self.p1, self.p2]
            .iter()
            .any(Option::is_some)
    }
}

/// A set of cameras keyed by name, the common output of every reader.
///
/// Serializes to `{ "cameras": { name: { ... } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraFormat {
    /// The cameras, ordered by name.
    pub cameras: BTreeMap<String, CameraIntrinsics>,
}

impl CameraFormat {
    /// Add a camera, replacing any camera with the same name.
    pub fn insert(&mut self, camera: CameraIntrinsics) {
        self.cameras.insert(camera.name.clone(), camera);
    }

    /// Look a camera up by name.
    pub fn get(&self, name: &str) -> Option<&CameraIntrinsics> {
        self.cameras.get(name)
    }

    /// Number of cameras.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// Whether there is no camera.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// The first camera by name, used when a single camera is needed.
    pub fn primary(&self) -> Option<&CameraIntrinsics> {
        self.cameras.values().next()
    }
}

impl FromIterator<CameraIntrinsics> for CameraFormat {
    fn from_iter<I: IntoIterator<Item = CameraIntrinsics>>(iter: I) -> Self {
        let mut format = CameraFormat::default();
        for camera in iter {
            format.insert(camera);
        }
        format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_focal() {
        assert!(CameraIntrinsics::new("c", 1.0, 1.0, 0.0, 0.0).is_ok());
        assert!(matches!(
            CameraIntrinsics::new("c", -1.0, 1.0, 0.0, 0.0),
            Err(CalibError::NonPositive { name, .. }) if name == "c.fx"
        ));
        assert!(CameraIntrinsics::new("c", 1.0, f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn serializes_without_absent_fields() -> Result<(), Box<dyn std::error::Error>> {
        let mut camera = CameraIntrinsics::new("camera_1", 500.0, 501.0, 320.0, 240.0)?
            .with_model(CameraModel::PinholeOpencv)
            .with_size(Some(640), Some(480));
        camera.k1 = Some(0.1);

        let format = CameraFormat::from_iter([camera]);
        let json = serde_json::to_value(&format)?;
        let expected = serde_json::json!({
            "cameras": {
                "camera_1": {
                    "name": "camera_1",
                    "fx": 500.0,
                    "fy": 501.0,
                    "cx": 320.0,
                    "cy": 240.0,
                    "camera_model": "pinhole-opencv",
                    "k1": 0.1,
                    "width": 640,
                    "height": 480
                }
            }
        });
        assert_eq!(json, expected);

        let back: CameraFormat = serde_json::from_value(json)?;
        assert_eq!(back, format);
        Ok(())
    }
}
