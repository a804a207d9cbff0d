use approx::assert_relative_eq;
use pointscope_calib::{detect, load_calibration, read_calibration_file, CalibError, CameraModel};

const CALIB_TXT: &str = "\
cam0=[525.5 0 319.5; 0 525.5 239.5; 0 0 1]
cam1=[525.5 0 329.5; 0 525.5 239.5; 0 0 1]
doffs=10
baseline=75.0
width=640
height=480
";

const COLMAP_TXT: &str = "\
# Camera list with one line of data per camera:
1 PINHOLE 640 480 525.5 525.5 319.5 239.5
";

const TUM_TXT: &str = "525.5 525.5 319.5 239.5\n";

#[test]
fn equivalent_intrinsics_across_formats() -> Result<(), CalibError> {
    let stereo = load_calibration("calib.txt", CALIB_TXT)?;
    let colmap = load_calibration("cameras.txt", COLMAP_TXT)?;
    let tum = load_calibration("camera.txt", TUM_TXT)?;

    let cameras = [
        stereo.get("cam0").unwrap(),
        colmap.get("camera_1").unwrap(),
        tum.get("camera").unwrap(),
    ];
    for camera in cameras {
        assert_eq!(camera.camera_model, CameraModel::Pinhole);
        assert_relative_eq!(camera.fx, 525.5);
        assert_relative_eq!(camera.fy, 525.5);
        assert_relative_eq!(camera.cx, 319.5);
        assert_relative_eq!(camera.cy, 239.5);
    }
    Ok(())
}

#[test]
fn detection_by_name_then_content() {
    let by_name = |name: &str, content: &str| detect(name, content).map(|f| f.name());

    assert_eq!(by_name("data/calib.txt", ""), Some("stereo calib.txt"));
    assert_eq!(by_name("sparse/0/cameras.txt", ""), Some("COLMAP cameras.txt"));
    assert_eq!(by_name("SN12345.conf", ""), Some("ZED conf"));
    assert_eq!(by_name("d435.json", ""), Some("RealSense JSON"));

    assert_eq!(by_name("a.txt", CALIB_TXT), Some("stereo calib.txt"));
    assert_eq!(by_name("a.txt", COLMAP_TXT), Some("COLMAP cameras.txt"));
    assert_eq!(by_name("a.txt", TUM_TXT), Some("TUM camera.txt"));
    assert_eq!(by_name("a.txt", "[LEFT_CAM_HD]\nfx=1\n"), Some("ZED conf"));
    assert_eq!(
        by_name("a", r#"{"depth_stream": {"fx": 1, "fy": 1, "ppx": 0, "ppy": 0}}"#),
        Some("RealSense JSON")
    );
    assert_eq!(by_name("a.txt", "hello world"), None);
}

#[test]
fn unknown_format() {
    assert!(matches!(
        load_calibration("notes.md", "nothing to see"),
        Err(CalibError::UnknownFormat(name)) if name == "notes.md"
    ));
}

#[test]
fn read_from_disk() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("SN1000.conf");
    std::fs::write(
        &path,
        "[LEFT_CAM_FHD]\nfx=1400\nfy=1400\ncx=960\ncy=540\n[STEREO]\nBaseline=120\n",
    )?;

    let format = read_calibration_file(&path)?;
    let left = format.get("left_cam_fhd").unwrap();
    assert_eq!(left.baseline, Some(120.0));
    assert_eq!((left.width, left.height), (Some(1920), Some(1080)));
    Ok(())
}
