use std::path::Path;

use pointscope_image::DepthMetadata;

use crate::error::IoError;
use crate::registry::{decode_depth, DepthRead};

/// Names of the JSON files that may describe `file_name`, in lookup order.
///
/// For `scene/depth.exr` these are `scene/depth.json` and
/// `scene/depth.exr.json`.
pub fn sidecar_candidates(file_name: &str) -> [String; 2] {
    let split = file_name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let stem = match file_name[split..].rfind('.') {
        Some(dot) if dot > 0 => &file_name[..split + dot],
        _ => file_name,
    };
    [format!("{stem}.json"), format!("{file_name}.json")]
}

/// Load the sidecar metadata of a depth file.
///
/// `read_text` is called with each candidate of [`sidecar_candidates`] and
/// returns its content when the file exists. The first present candidate is
/// parsed; a sidecar that is not valid metadata JSON is logged and ignored.
///
/// # Arguments
///
/// * `file_name` - Name of the depth file.
/// * `read_text` - Callback reading a sibling file, `None` when it is absent.
pub fn load_sidecar(
    file_name: &str,
    mut read_text: impl FnMut(&str) -> Option<String>,
) -> Option<DepthMetadata> {
    let (candidate, text) = sidecar_candidates(file_name)
        .into_iter()
        .find_map(|candidate| read_text(&candidate).map(|text| (candidate, text)))?;

    match serde_json::from_str::<DepthMetadata>(&text) {
        Ok(meta) => {
            log::debug!("using sidecar {candidate} for {file_name}");
            Some(meta)
        }
        Err(err) => {
            log::warn!("ignoring sidecar {candidate}: {err}");
            None
        }
    }
}

/// Layer the sidecar of `file_name` over the metadata a decoder produced.
///
/// The decoder metadata is expected to already include the format defaults,
/// as returned by [`decode_depth`].
pub fn resolve_metadata(
    decoder_meta: &DepthMetadata,
    file_name: &str,
    read_text: impl FnMut(&str) -> Option<String>,
) -> DepthMetadata {
    match load_sidecar(file_name, read_text) {
        Some(sidecar) => decoder_meta.merged_with(&sidecar),
        None => decoder_meta.clone(),
    }
}

/// Read a depth file and its sidecar from disk.
///
/// # Arguments
///
/// * `file_path` - The path to the depth file.
///
/// # Returns
///
/// The depth image and its fully resolved metadata.
pub fn read_depth_file(file_path: impl AsRef<Path>) -> Result<DepthRead, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let bytes = std::fs::read(file_path)?;
    let file_name = file_path.to_string_lossy();
    let read = decode_depth(&file_name, None, &bytes)?;
    let meta = resolve_metadata(&read.meta, &file_name, |candidate| {
        std::fs::read_to_string(candidate).ok()
    });

    Ok(DepthRead {
        image: read.image,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointscope_image::{DepthKind, DepthUnit};

    #[test]
    fn candidates() {
        assert_eq!(
            sidecar_candidates("scene/depth.exr"),
            ["scene/depth.json", "scene/depth.exr.json"]
        );
        assert_eq!(sidecar_candidates("depth"), ["depth.json", "depth.json"]);
        assert_eq!(
            sidecar_candidates("a.b/.hidden"),
            ["a.b/.hidden.json", "a.b/.hidden.json"]
        );
    }

    #[test]
    fn first_present_candidate_wins() {
        let mut asked = Vec::new();
        let meta = load_sidecar("d.npy", |name| {
            asked.push(name.to_string());
            (name == "d.npy.json").then(|| r#"{"kind": "z", "fx": 500}"#.to_string())
        })
        .unwrap();
        assert_eq!(asked, ["d.json", "d.npy.json"]);
        assert_eq!(meta.kind, Some(DepthKind::Z));
        assert_eq!(meta.fx, Some(500.0));
    }

    #[test]
    fn invalid_sidecar_is_ignored() {
        assert!(load_sidecar("d.npy", |_| Some("{ not json".to_string())).is_none());
        assert!(load_sidecar("d.npy", |_| None).is_none());
    }

    #[test]
    fn sidecar_overrides_decoder() {
        let decoder = DepthMetadata {
            kind: Some(DepthKind::Depth),
            unit: Some(DepthUnit::Millimeter),
            fx: Some(100.0),
            ..Default::default()
        };
        let meta = resolve_metadata(&decoder, "d.png", |_| {
            Some(r#"{"kind": "disparity", "baseline": 0.1, "doffs": 2.5}"#.to_string())
        });
        assert_eq!(meta.kind, Some(DepthKind::Disparity));
        assert_eq!(meta.unit, Some(DepthUnit::Millimeter));
        assert_eq!(meta.fx, Some(100.0));
        assert_eq!(meta.baseline, Some(0.1));
        assert_eq!(meta.disparity_offset, Some(2.5));
    }
}
