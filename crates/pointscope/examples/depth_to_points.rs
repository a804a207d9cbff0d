use std::io::Write;
use std::path::{Path, PathBuf};

use argh::FromArgs;

use pointscope::calib;
use pointscope::io::{color, read_depth_file};
use pointscope::p3d::{
    apply_calibration, project_depth, project_depth_with_colors, PointCloud,
};

#[derive(FromArgs, Debug)]
/// Decode a depth map and back-project it to a point cloud.
struct Args {
    /// path to the depth file (EXR, NPY, NPZ, TIFF, PNG or PFM)
    #[argh(option, short = 'd')]
    depth: PathBuf,

    /// path to a calibration file (calib.txt, cameras.txt, camera.txt, .conf, .json)
    #[argh(option, short = 'c')]
    calib: Option<PathBuf>,

    /// name of the calibrated camera to use, the first one by default
    #[argh(option)]
    camera: Option<String>,

    /// path to a color image (TIFF or ASCII PPM) with the size of the depth map
    #[argh(option)]
    colors: Option<PathBuf>,

    /// path of an ASCII PLY file to write the points to
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

fn write_ply(path: &Path, cloud: &PointCloud) -> std::io::Result<()> {
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(writer, "ply\nformat ascii 1.0\nelement vertex {}", cloud.len())?;
    writeln!(writer, "property float x\nproperty float y\nproperty float z")?;
    if cloud.colors().is_some() {
        writeln!(writer, "property uchar red\nproperty uchar green\nproperty uchar blue")?;
    }
    writeln!(writer, "end_header")?;

    for (i, [x, y, z]) in cloud.points().iter().enumerate() {
        match cloud.colors().and_then(|c| c.get(i)) {
            Some([r, g, b]) => writeln!(writer, "{x} {y} {z} {r} {g} {b}")?,
            None => writeln!(writer, "{x} {y} {z}")?,
        }
    }
    writer.flush()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let depth = read_depth_file(&args.depth)?;
    let mut meta = depth.meta;
    log::info!(
        "decoded {}x{} {:?} map with {} valid samples",
        depth.image.width(),
        depth.image.height(),
        meta.kind(),
        depth.image.num_valid()
    );

    if let Some(calib_path) = &args.calib {
        let cameras = calib::read_calibration_file(calib_path)?;
        let camera = match &args.camera {
            Some(name) => cameras.get(name),
            None => cameras.primary(),
        }
        .ok_or("camera not found in the calibration file")?;
        log::info!("using calibrated camera {}", camera.name);
        meta = apply_calibration(&meta, camera);
    }

    let points = match &args.colors {
        Some(colors_path) => {
            let bytes = std::fs::read(colors_path)?;
            let size = [depth.image.width(), depth.image.height()];
            let is_tiff = colors_path.extension().is_some_and(|ext| {
                ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff")
            });
            let colors = if is_tiff {
                color::read_tiff_colors(&bytes, size)?
            } else {
                color::read_ppm_colors(&bytes, size)?
            };
            project_depth_with_colors(&depth.image, &meta, &colors)?
        }
        None => project_depth(&depth.image, &meta)?,
    };

    let cloud = PointCloud::from(points);
    println!(
        "🔥 {} points, bounds {:?} .. {:?}",
        cloud.len(),
        cloud.get_min_bound(),
        cloud.get_max_bound()
    );

    if let Some(output) = &args.output {
        write_ply(output, &cloud)?;
        println!("wrote {}", output.display());
    }

    Ok(())
}
