use approx::assert_relative_eq;
use pointscope::calib::{load_calibration, read_calibration_file};
use pointscope::image::{DepthKind, DepthUnit};
use pointscope::io::{decode_depth, read_depth_file};
use pointscope::p3d::{apply_calibration, project_depth};

const MIDDLEBURY: &str = "\
cam0=[3997.684 0 1176.728; 0 3997.684 1011.728; 0 0 1]
cam1=[3997.684 0 1307.839; 0 3997.684 1011.728; 0 0 1]
doffs=131.111
baseline=193.001
width=2964
height=1988
ndisp=280
";

// little-endian gray PFM, rows stored bottom to top
fn pfm(width: usize, rows_top_down: &[Vec<f32>]) -> Vec<u8> {
    let mut out = format!("Pf\n{width} {}\n-1.0\n", rows_top_down.len()).into_bytes();
    for row in rows_top_down.iter().rev() {
        for v in row {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

#[test]
fn decoded_disparity_with_calib_txt() -> Result<(), Box<dyn std::error::Error>> {
    let depth = decode_depth("disp0.pfm", None, &pfm(1, &[vec![200.0]]))?;
    assert_eq!(depth.meta.kind, Some(DepthKind::Disparity));
    assert_eq!(depth.meta.unit, Some(DepthUnit::Meter));

    let cameras = load_calibration("calib.txt", MIDDLEBURY)?;
    let camera = cameras.primary().ok_or("no camera")?;
    let meta = apply_calibration(&depth.meta, camera);
    assert_relative_eq!(meta.baseline.unwrap_or_default(), 0.193001, epsilon = 1e-6);
    assert_relative_eq!(meta.disparity_offset.unwrap_or_default(), 131.111, epsilon = 1e-4);

    let points = project_depth(&depth.image, &meta)?;
    assert_eq!(points.len(), 1);
    assert_relative_eq!(points[0].z, 2.3302065, epsilon = 1e-4);
    Ok(())
}

#[test]
fn disparity_files_on_disk() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let depth_path = dir.path().join("disp0.pfm");
    let calib_path = dir.path().join("calib.txt");
    std::fs::write(&depth_path, pfm(2, &[vec![200.0, 0.0], vec![f32::INFINITY, 200.0]]))?;
    std::fs::write(&calib_path, MIDDLEBURY)?;

    let depth = read_depth_file(&depth_path)?;
    let cameras = read_calibration_file(&calib_path)?;
    let camera = cameras.get("cam0").ok_or("cam0 missing")?;
    let points = project_depth(&depth.image, &apply_calibration(&depth.meta, camera))?;

    assert_eq!(points.len(), 2);
    for p in &points {
        // axial: both pixels land on the same plane
        assert_relative_eq!(p.z, 2.3302065, epsilon = 1e-4);
    }
    Ok(())
}
