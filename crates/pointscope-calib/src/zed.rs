//! Stereolabs ZED `SN<serial>.conf` calibration files.
//!
//! The files are INI documents with one section per camera and resolution
//! (`[LEFT_CAM_HD]`, `[RIGHT_CAM_2K]`, ...) and a `[STEREO]` section holding
//! the baseline in millimeters.

use crate::diagnostics::{Diagnostic, Parsed};
use crate::error::CalibError;
use crate::format::CalibrationFormat;
use crate::intrinsics::{CameraFormat, CameraIntrinsics, CameraModel};

/// A `[NAME]` section of an INI document and its `key=value` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IniSection {
    /// Section name without brackets, empty for entries before any section.
    pub name: String,
    /// Entries in file order.
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    /// Value of a key, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn get_f64(&self, key: &str) -> Result<Option<f64>, CalibError> {
        self.get(key)
            .map(|v| {
                v.parse::<f64>().map_err(|_| CalibError::InvalidValue {
                    key: format!("{}.{key}", self.name),
                    value: v.to_string(),
                })
            })
            .transpose()
    }
}

/// The sections of a ZED calibration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZedCalibration {
    /// Sections in file order.
    pub sections: Vec<IniSection>,
}

impl ZedCalibration {
    /// Look a section up by name, case-insensitively.
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Baseline of the `[STEREO]` section.
    pub fn baseline(&self) -> Result<Option<f64>, CalibError> {
        match self.section("STEREO") {
            Some(stereo) => stereo.get_f64("Baseline"),
            None => Ok(None),
        }
    }
}

/// Image size of the ZED resolution suffixes.
pub fn resolution_size(suffix: &str) -> Option<(u32, u32)> {
    match suffix.to_ascii_uppercase().as_str() {
        "2K" => Some((2208, 1242)),
        "FHD" => Some((1920, 1080)),
        "HD" => Some((1280, 720)),
        "VGA" => Some((672, 376)),
        _ => None,
    }
}

/// Parse an INI document.
///
/// `#` and `;` start comment lines. Lines that are neither a section header
/// nor a `key=value` pair are reported as diagnostics.
pub fn parse(content: &str) -> Result<Parsed<ZedCalibration>, CalibError> {
    let mut sections = vec![IniSection::default()];
    let mut diagnostics = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push(IniSection {
                name: name.trim().to_string(),
                entries: Vec::new(),
            });
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                if let Some(section) = sections.last_mut() {
                    section
                        .entries
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
            }
            _ => diagnostics.push(Diagnostic::at_line(
                idx + 1,
                format!("expected [section] or key=value, got '{line}'"),
            )),
        }
    }

    // drop the implicit global section when nothing precedes the first header
    sections.retain(|s| !(s.name.is_empty() && s.entries.is_empty()));
    Ok(Parsed::new(ZedCalibration { sections }, diagnostics))
}

fn camera_from_section(section: &IniSection) -> Result<Option<CameraIntrinsics>, CalibError> {
    let lower = section.name.to_ascii_lowercase();
    if !lower.contains("left") && !lower.contains("right") {
        return Ok(None);
    }
    let (Some(fx), Some(fy), Some(cx), Some(cy)) = (
        section.get_f64("fx")?,
        section.get_f64("fy")?,
        section.get_f64("cx")?,
        section.get_f64("cy")?,
    ) else {
        return Ok(None);
    };

    let mut camera = CameraIntrinsics::new(lower.as_str(), fx, fy, cx, cy)?;
    camera.k1 = section.get_f64("k1")?;
    camera.k2 = section.get_f64("k2")?;
    camera.k3 = section.get_f64("k3")?;
    camera.p1 = section.get_f64("p1")?;
    camera.p2 = section.get_f64("p2")?;
    if camera.has_distortion() {
        camera = camera.with_model(CameraModel::PinholeOpencv);
    }

    if let Some((width, height)) = lower.rsplit('_').next().and_then(resolution_size) {
        camera = camera.with_size(Some(width), Some(height));
    }
    Ok(Some(camera))
}

/// Map every left or right camera section to canonical intrinsics.
///
/// Cameras are named after their lower-cased section and all carry the
/// `[STEREO]` baseline.
///
/// # Errors
///
/// [`CalibError::NoValidCameras`] when no section describes a camera.
pub fn to_camera_format(calib: &ZedCalibration) -> Result<CameraFormat, CalibError> {
    let baseline = calib.baseline()?;
    let mut format = CameraFormat::default();
    for section in &calib.sections {
        if let Some(camera) = camera_from_section(section)? {
            format.insert(camera.with_baseline(baseline));
        }
    }
    if format.is_empty() {
        return Err(CalibError::NoValidCameras);
    }
    Ok(format)
}

/// Whether the content looks like a ZED calibration file.
pub fn looks_like(content: &str) -> bool {
    content.lines().map(str::trim).any(|l| {
        l.strip_prefix('[')
            .and_then(|l| l.strip_suffix(']'))
            .is_some_and(|name| {
                let name = name.to_ascii_lowercase();
                name.contains("left_cam") || name.contains("right_cam") || name == "stereo"
            })
    })
}

/// ZED `.conf` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZedFormat;

impl CalibrationFormat for ZedFormat {
    fn name(&self) -> &'static str {
        "ZED conf"
    }

    fn matches_file_name(&self, file_name: &str) -> bool {
        file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("conf"))
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
