use std::io::{Cursor, Read};

use pointscope_image::{DepthKind, DepthMetadata};

use crate::error::IoError;
use crate::npy::{self, NpyArray};
use crate::registry::DepthRead;

/// The array picked from an NPZ archive, together with the scalar camera
/// parameters stored next to it.
#[derive(Debug, Clone)]
pub struct NpzDepth {
    /// Name of the selected entry inside the archive.
    pub entry_name: String,
    /// The decoded array.
    pub array: NpyArray,
    /// Metadata collected from scalar entries such as `fx` or `baseline`.
    pub meta: DepthMetadata,
}

fn array_name(entry_name: &str) -> &str {
    let file_name = entry_name.rsplit('/').next().unwrap_or(entry_name);
    file_name.strip_suffix(".npy").unwrap_or(file_name)
}

/// Pick the entry whose name ends with `depth.npy` (case-insensitive), or
/// else the first `.npy` entry.
pub fn select_entry<'a>(names: &[&'a str]) -> Option<&'a str> {
    let ends_with = |name: &str, suffix: &str| name.to_ascii_lowercase().ends_with(suffix);
    names
        .iter()
        .copied()
        .find(|n| ends_with(n, "depth.npy"))
        .or_else(|| names.iter().copied().find(|n| ends_with(n, ".npy")))
}

/// Parse an NPZ archive and decode its depth array.
///
/// # Errors
///
/// [`IoError::NpzArrayNotFound`] when the archive holds no `.npy` entry, and
/// any error of [`npy::parse`] for the selected entry.
pub fn parse(bytes: &[u8]) -> Result<NpzDepth, IoError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let names = archive
        .file_names()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let name_refs = names.iter().map(String::as_str).collect::<Vec<_>>();
    let entry_name = select_entry(&name_refs)
        .ok_or(IoError::NpzArrayNotFound)?
        .to_string();
    log::debug!("using NPZ entry {entry_name}");

    let mut meta = DepthMetadata::default();
    let mut selected = None;

    for name in &names {
        let is_selected = *name == entry_name;
        let key = array_name(name).to_ascii_lowercase();
        let is_parameter = matches!(
            key.as_str(),
            "fx" | "fy" | "cx" | "cy" | "baseline" | "doffs" | "scale" | "depth_scale"
        );
        if !is_selected && !is_parameter {
            continue;
        }

        let mut buf = Vec::new();
        archive.by_name(name)?.read_to_end(&mut buf)?;

        if is_selected {
            selected = Some(npy::parse(&buf)?);
            continue;
        }

        // a parameter that does not parse as a scalar is ignored, it is
        // not the array the caller asked for
        let value = match npy::parse(&buf) {
            Ok(array) if array.data.len() == 1 => array.data[0],
            _ => {
                log::warn!("ignoring NPZ entry {name}, expected a scalar");
                continue;
            }
        };
        match key.as_str() {
            "fx" => meta.fx = Some(value),
            "fy" => meta.fy = Some(value),
            "cx" => meta.cx = Some(value),
            "cy" => meta.cy = Some(value),
            "baseline" => meta.baseline = Some(value),
            "doffs" => meta.disparity_offset = Some(value),
            _ => meta.scale = Some(value),
        }
    }

    let array = selected.ok_or(IoError::NpzArrayNotFound)?;
    if array_name(&entry_name).eq_ignore_ascii_case("disparity") {
        meta.kind = Some(DepthKind::Disparity);
    }

    Ok(NpzDepth {
        entry_name,
        array,
        meta,
    })
}

/// Decode an NPZ archive holding a depth map.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let npz = parse(bytes)?;
    let meta = npy::dtype_metadata(&npz.array.dtype).merged_with(&npz.meta);
    Ok(DepthRead {
        image: npy::depth_image_from_array(npz.array)?,
        meta,
    })
}
