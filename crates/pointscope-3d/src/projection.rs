use pointscope_calib::{CameraIntrinsics, CameraModel};
use pointscope_image::{
    Convention, DepthClamp, DepthImage, DepthKind, DepthMetadata, ProjectionModel,
};

use crate::error::ProjectionError;
use crate::point::Point3;

/// Fill the intrinsics, baseline, disparity offset and projection model
/// missing from `meta` with the values of a calibrated camera.
///
/// Values already present in `meta` are kept. The calibrated baseline is in
/// millimeters and is converted to the depth unit of `meta`, so a disparity
/// map decoded with a meter unit yields depths in meters.
pub fn apply_calibration(meta: &DepthMetadata, camera: &CameraIntrinsics) -> DepthMetadata {
    let camera_model = match camera.camera_model {
        CameraModel::FisheyeOpencv => ProjectionModel::Fisheye,
        CameraModel::Pinhole | CameraModel::PinholeOpencv => ProjectionModel::Pinhole,
    };
    let meters_per_unit = f64::from(meta.meters_per_unit());
    let baseline = camera
        .baseline
        .filter(|_| meters_per_unit.is_finite() && meters_per_unit > 0.0)
        .map(|mm| (mm * 1e-3 / meters_per_unit) as f32);
    let calibrated = DepthMetadata {
        fx: Some(camera.fx as f32),
        fy: Some(camera.fy as f32),
        cx: Some(camera.cx as f32),
        cy: Some(camera.cy as f32),
        baseline,
        disparity_offset: camera.disparity_offset.map(|d| d as f32),
        camera_model: Some(camera_model),
        ..Default::default()
    };
    meta.fill_missing_from(&calibrated)
}

fn check_positive(name: &'static str, value: f32) -> Result<f32, ProjectionError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ProjectionError::NonPositive { name, value });
    }
    Ok(value)
}

// Parameters resolved once per image.
struct Projector {
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
    kind: DepthKind,
    baseline: f32,
    disparity_offset: f32,
    meters_per_unit: f32,
    clamp: Option<DepthClamp>,
    model: ProjectionModel,
    convention: Convention,
}

impl Projector {
    fn resolve(image: &DepthImage, meta: &DepthMetadata) -> Result<Self, ProjectionError> {
        let fx = check_positive("fx", meta.fx.ok_or(ProjectionError::MissingIntrinsics)?)?;
        let fy = match meta.fy {
            Some(fy) => check_positive("fy", fy)?,
            None => fx,
        };
        let kind = meta.kind();
        let baseline = match (kind, meta.baseline) {
            (DepthKind::Disparity, None) => return Err(ProjectionError::MissingBaseline),
            (DepthKind::Disparity, Some(baseline)) => check_positive("baseline", baseline)?,
            (_, baseline) => baseline.unwrap_or_default(),
        };

        Ok(Self {
            fx,
            fy,
            cx: meta.cx.unwrap_or(image.width() as f32 / 2.0),
            cy: meta.cy.unwrap_or(image.height() as f32 / 2.0),
            kind,
            baseline,
            disparity_offset: meta.disparity_offset.unwrap_or_default(),
            meters_per_unit: meta.meters_per_unit(),
            clamp: meta.depth_clamp,
            model: meta.camera_model(),
            convention: meta.convention(),
        })
    }

    /// Distance in meters encoded by a raw sample.
    fn distance(&self, raw: f32) -> Option<f32> {
        if !DepthImage::is_valid_sample(raw) {
            return None;
        }

        let value = match self.kind {
            DepthKind::Disparity => {
                let shifted = raw + self.disparity_offset;
                if shifted <= 0.0 {
                    return None;
                }
                self.baseline * self.fx / shifted
            }
            DepthKind::InverseDepth => 1.0 / raw,
            DepthKind::Depth | DepthKind::Z => raw,
        };

        let meters = value * self.meters_per_unit;
        if !meters.is_finite() {
            return None;
        }
        match &self.clamp {
            Some(clamp) if !clamp.contains(meters) => None,
            _ => Some(meters),
        }
    }

    /// Unit ray of pixel `(u, v)` and the scale an axial distance needs to
    /// become a range along it.
    fn ray(&self, u: f32, v: f32) -> Option<([f32; 3], f32)> {
        match self.model {
            ProjectionModel::Pinhole => {
                let x = (u - self.cx) / self.fx;
                let y = (v - self.cy) / self.fy;
                let norm = (x * x + y * y + 1.0).sqrt();
                Some(([x / norm, y / norm, 1.0 / norm], norm))
            }
            ProjectionModel::Fisheye => {
                let du = u - self.cx;
                let dv = v - self.cy;
                let r = (du * du + dv * dv).sqrt();
                if r == 0.0 {
                    return Some(([0.0, 0.0, 1.0], 1.0));
                }
                let theta = r / self.fx;
                let (sin, cos) = theta.sin_cos();
                let ray = [sin * du / r, sin * dv / r, cos];
                if self.kind.is_axial() && cos <= 0.0 {
                    // the ray never reaches the image plane
                    return None;
                }
                Some((ray, 1.0 / cos))
            }
        }
    }

    fn project(&self, u: usize, v: usize, raw: f32) -> Option<[f32; 3]> {
        let distance = self.distance(raw)?;
        let (ray, axial_scale) = self.ray(u as f32, v as f32)?;
        let range = if self.kind.is_axial() {
            distance * axial_scale
        } else {
            distance
        };

        let [x, y, z] = ray.map(|c| c * range);
        Some(match self.convention {
            Convention::OpenCv => [x, y, z],
            Convention::OpenGl => [x, -y, -z],
        })
    }
}

fn project_impl(
    image: &DepthImage,
    meta: &DepthMetadata,
    colors: Option<&[[u8; 3]]>,
) -> Result<Vec<Point3>, ProjectionError> {
    let projector = Projector::resolve(image, meta)?;
    if let Some(colors) = colors {
        if colors.len() != image.num_pixels() {
            return Err(ProjectionError::DimensionMismatch {
                expected: image.num_pixels(),
                actual: colors.len(),
            });
        }
    }

    let mut points = Vec::with_capacity(image.num_valid());
    for (idx, (u, v, raw)) in image.pixels().enumerate() {
        let Some([x, y, z]) = projector.project(u, v, raw) else {
            continue;
        };
        let point = Point3::new(x, y, z);
        points.push(match colors {
            Some(colors) => point.with_color(colors[idx]),
            None => point,
        });
    }

    log::debug!(
        "projected {} of {} pixels as {:?}",
        points.len(),
        image.num_pixels(),
        projector.kind
    );
    Ok(points)
}

/// Back-project every valid depth sample to a 3D point in meters.
///
/// Samples that are not finite or not positive, disparities whose shifted
/// value is not positive, and distances outside the depth clamp produce no
/// point.
///
/// # Arguments
///
/// * `image` - The depth samples.
/// * `meta` - The semantics of the samples and the camera intrinsics.
///
/// # Errors
///
/// [`ProjectionError::MissingIntrinsics`] without `fx`,
/// [`ProjectionError::MissingBaseline`] for a disparity map without baseline,
/// and [`ProjectionError::NonPositive`] when the focal lengths or the
/// baseline of a disparity map are not strictly positive.
///
/// # Examples
///
/// ```
/// use pointscope_3d::projection::project_depth;
/// use pointscope_image::{DepthImage, DepthKind, DepthMetadata};
///
/// let image = DepthImage::new(2, 2, vec![1.0, 0.0, 2.0, f32::NAN]).unwrap();
/// let meta = DepthMetadata {
///     kind: Some(DepthKind::Z),
///     fx: Some(100.0),
///     ..Default::default()
/// };
///
/// let points = project_depth(&image, &meta).unwrap();
/// assert_eq!(points.len(), 2);
/// ```
pub fn project_depth(
    image: &DepthImage,
    meta: &DepthMetadata,
) -> Result<Vec<Point3>, ProjectionError> {
    project_impl(image, meta, None)
}

/// Same as [`project_depth`], tinting each point with the color of its pixel.
///
/// # Errors
///
/// [`ProjectionError::DimensionMismatch`] when `colors` does not hold one
/// entry per depth pixel.
pub fn project_depth_with_colors(
    image: &DepthImage,
    meta: &DepthMetadata,
    colors: &[[u8; 3]],
) -> Result<Vec<Point3>, ProjectionError> {
    project_impl(image, meta, Some(colors))
}
