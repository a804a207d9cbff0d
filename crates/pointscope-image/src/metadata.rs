use serde::{Deserialize, Serialize};

/// Physical meaning of a depth sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthKind {
    /// Range distance from the camera center along the pixel ray.
    #[default]
    Depth,
    /// Stereo disparity in pixels.
    Disparity,
    /// Reciprocal of the range distance.
    #[serde(alias = "inverse", alias = "inverseDepth")]
    InverseDepth,
    /// Distance along the optical axis.
    Z,
}

impl DepthKind {
    /// Whether samples of this kind measure distance along the optical axis
    /// rather than along the pixel ray.
    pub fn is_axial(&self) -> bool {
        matches!(self, DepthKind::Z | DepthKind::Disparity)
    }
}

/// Unit of the depth samples after kind conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthUnit {
    /// Meters.
    #[serde(alias = "m", alias = "meters")]
    Meter,
    /// Millimeters.
    #[serde(alias = "mm", alias = "millimeters")]
    Millimeter,
}

/// Camera projection model used to back-project pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionModel {
    /// Pinhole model.
    #[default]
    Pinhole,
    /// Equidistant fisheye model.
    #[serde(alias = "equidistant")]
    Fisheye,
}

/// Axis convention of projected points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// X right, Y down, Z forward.
    #[default]
    OpenCv,
    /// X right, Y up, Z backward.
    OpenGl,
}

/// Range of accepted depth values in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthClamp {
    /// Smallest accepted depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    /// Largest accepted depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
}

impl DepthClamp {
    /// Whether `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Describes what the samples of a [`crate::DepthImage`] mean.
///
/// Every field is optional so that metadata from several sources can be
/// layered with [`DepthMetadata::layered`]. The JSON form uses camelCase keys
/// and is what a sidecar file contains:
///
/// ```
/// use pointscope_image::{DepthKind, DepthMetadata};
///
/// let meta: DepthMetadata =
///     serde_json::from_str(r#"{"kind": "disparity", "fx": 525.0, "baseline": 0.1}"#).unwrap();
///
/// assert_eq!(meta.kind(), DepthKind::Disparity);
/// assert_eq!(meta.fy, None);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthMetadata {
    /// Physical meaning of the samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DepthKind>,
    /// Unit of the converted samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<DepthUnit>,
    /// Multiplier that brings the converted samples to meters.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "depthScale",
        alias = "depth_scale"
    )]
    pub scale: Option<f32>,
    /// Focal length along x in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f32>,
    /// Focal length along y in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f32>,
    /// Principal point x in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<f32>,
    /// Principal point y in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cy: Option<f32>,
    /// Stereo baseline, in the unit of the resulting depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f32>,
    /// Constant added to the disparity before conversion.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "disparity_offset",
        alias = "doffs"
    )]
    pub disparity_offset: Option<f32>,
    /// Projection model.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "camera_model")]
    pub camera_model: Option<ProjectionModel>,
    /// Axis convention of the output points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convention: Option<Convention>,
    /// Range of accepted depth values in meters.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "depth_clamp")]
    pub depth_clamp: Option<DepthClamp>,
}

impl DepthMetadata {
    /// Metadata that only sets the kind.
    pub fn with_kind(kind: DepthKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// The effective kind, [`DepthKind::Depth`] when unset.
    pub fn kind(&self) -> DepthKind {
        self.kind.unwrap_or_default()
    }

    /// The effective projection model, pinhole when unset.
    pub fn camera_model(&self) -> ProjectionModel {
        self.camera_model.unwrap_or_default()
    }

    /// The effective convention, OpenCV when unset.
    pub fn convention(&self) -> Convention {
        self.convention.unwrap_or_default()
    }

    /// Return a copy where every field set in `overrides` replaces ours.
    pub fn merged_with(&self, overrides: &DepthMetadata) -> DepthMetadata {
        DepthMetadata {
            kind: overrides.kind.or(self.kind),
            unit: overrides.unit.or(self.unit),
            scale: overrides.scale.or(self.scale),
            fx: overrides.fx.or(self.fx),
            fy: overrides.fy.or(self.fy),
            cx: overrides.cx.or(self.cx),
            cy: overrides.cy.or(self.cy),
            baseline: overrides.baseline.or(self.baseline),
            disparity_offset: overrides.disparity_offset.or(self.disparity_offset),
            camera_model: overrides.camera_model.or(self.camera_model),
            convention: overrides.convention.or(self.convention),
            depth_clamp: overrides.depth_clamp.or(self.depth_clamp),
        }
    }

    /// Return a copy where only our unset fields are taken from `other`.
    pub fn fill_missing_from(&self, other: &DepthMetadata) -> DepthMetadata {
        other.merged_with(self)
    }

    /// Fold layers from lowest to highest precedence.
    ///
    /// The usual order is format default, then decoder inferred, then sidecar.
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a DepthMetadata>) -> DepthMetadata {
        layers
            .into_iter()
            .fold(DepthMetadata::default(), |acc, layer| acc.merged_with(layer))
    }

    /// Whether all pinhole intrinsics are present.
    pub fn has_intrinsics(&self) -> bool {
        self.fx.is_some() && self.fy.is_some() && self.cx.is_some() && self.cy.is_some()
    }

    /// Factor that converts kind-converted samples to meters.
    ///
    /// An explicit scale wins over the unit.
    pub fn meters_per_unit(&self) -> f32 {
        match (self.scale, self.unit) {
            (Some(scale), _) => scale,
            (None, Some(DepthUnit::Millimeter)) => 1e-3,
            (None, _) => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_overrides() {
        let base = DepthMetadata {
            kind: Some(DepthKind::Depth),
            fx: Some(500.0),
            cx: Some(320.0),
            ..Default::default()
        };
        let overrides = DepthMetadata {
            fx: Some(525.0),
            unit: Some(DepthUnit::Millimeter),
            ..Default::default()
        };
        let merged = base.merged_with(&overrides);
        assert_eq!(merged.fx, Some(525.0));
        assert_eq!(merged.cx, Some(320.0));
        assert_eq!(merged.kind, Some(DepthKind::Depth));
        assert_eq!(merged.unit, Some(DepthUnit::Millimeter));
    }

    #[test]
    fn fill_missing_keeps_own_values() {
        let own = DepthMetadata {
            fx: Some(600.0),
            ..Default::default()
        };
        let calib = DepthMetadata {
            fx: Some(500.0),
            fy: Some(501.0),
            ..Default::default()
        };
        let filled = own.fill_missing_from(&calib);
        assert_eq!(filled.fx, Some(600.0));
        assert_eq!(filled.fy, Some(501.0));
    }

    #[test]
    fn layered_order() {
        let format_default = DepthMetadata {
            unit: Some(DepthUnit::Millimeter),
            kind: Some(DepthKind::Depth),
            ..Default::default()
        };
        let inferred = DepthMetadata::with_kind(DepthKind::Disparity);
        let sidecar = DepthMetadata {
            unit: Some(DepthUnit::Meter),
            ..Default::default()
        };
        let meta = DepthMetadata::layered([&format_default, &inferred, &sidecar]);
        assert_eq!(meta.kind(), DepthKind::Disparity);
        assert_eq!(meta.unit, Some(DepthUnit::Meter));
    }

    #[test]
    fn meters_per_unit() {
        let mut meta = DepthMetadata::default();
        assert_eq!(meta.meters_per_unit(), 1.0);
        meta.unit = Some(DepthUnit::Millimeter);
        assert_eq!(meta.meters_per_unit(), 1e-3);
        meta.scale = Some(0.0002);
        assert_eq!(meta.meters_per_unit(), 0.0002);
    }

    #[test]
    fn sidecar_json_keys() {
        let json = r#"{
            "kind": "inverse_depth",
            "unit": "mm",
            "disparityOffset": 1.5,
            "cameraModel": "fisheye",
            "convention": "opengl",
            "depthClamp": {"max": 10.0}
        }"#;
        let meta: DepthMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.kind(), DepthKind::InverseDepth);
        assert_eq!(meta.unit, Some(DepthUnit::Millimeter));
        assert_eq!(meta.disparity_offset, Some(1.5));
        assert_eq!(meta.camera_model(), ProjectionModel::Fisheye);
        assert_eq!(meta.convention(), Convention::OpenGl);
        assert_eq!(
            meta.depth_clamp,
            Some(DepthClamp {
                min: None,
                max: Some(10.0)
            })
        );

        let snake: DepthMetadata = serde_json::from_str(r#"{"doffs": 131.111}"#).unwrap();
        assert_eq!(snake.disparity_offset, Some(131.111));
    }

    #[test]
    fn clamp_contains() {
        let clamp = DepthClamp {
            min: Some(0.5),
            max: None,
        };
        assert!(!clamp.contains(0.4));
        assert!(clamp.contains(100.0));
    }
}
