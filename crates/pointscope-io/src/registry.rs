use pointscope_image::{DepthImage, DepthKind, DepthMetadata, DepthUnit};

use crate::error::IoError;
use crate::{exr, hdf5, npy, npz, pfm, png, tiff};

/// A decoded depth image and the metadata its decoder could infer.
#[derive(Debug, Clone)]
pub struct DepthRead {
    /// The depth samples.
    pub image: DepthImage,
    /// Metadata inferred from the file content, e.g. the EXR channel name.
    pub meta: DepthMetadata,
}

/// The depth decoders known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthDecoder {
    /// OpenEXR scanline images.
    Exr,
    /// NumPy `.npy` arrays.
    Npy,
    /// NumPy `.npz` archives.
    Npz,
    /// Single channel TIFF images.
    Tiff,
    /// 8 or 16 bit grayscale PNG images.
    Png,
    /// Portable float maps.
    Pfm,
    /// HDF5 files, recognized but not decoded.
    Hdf5,
}

impl DepthDecoder {
    /// Every decoder, in probe order.
    pub const ALL: [DepthDecoder; 7] = [
        DepthDecoder::Exr,
        DepthDecoder::Npy,
        DepthDecoder::Npz,
        DepthDecoder::Tiff,
        DepthDecoder::Png,
        DepthDecoder::Pfm,
        DepthDecoder::Hdf5,
    ];

    /// Short name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            DepthDecoder::Exr => "exr",
            DepthDecoder::Npy => "npy",
            DepthDecoder::Npz => "npz",
            DepthDecoder::Tiff => "tiff",
            DepthDecoder::Png => "png",
            DepthDecoder::Pfm => "pfm",
            DepthDecoder::Hdf5 => "hdf5",
        }
    }

    /// File extensions handled by the decoder, lower case and without dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DepthDecoder::Exr => &["exr"],
            DepthDecoder::Npy => &["npy"],
            DepthDecoder::Npz => &["npz"],
            DepthDecoder::Tiff => &["tif", "tiff"],
            DepthDecoder::Png => &["png"],
            DepthDecoder::Pfm => &["pfm"],
            DepthDecoder::Hdf5 => &["h5", "hdf5", "hdf"],
        }
    }

    /// MIME types handled by the decoder.
    pub fn mime_types(&self) -> &'static [&'static str] {
        match self {
            DepthDecoder::Exr => &["image/x-exr", "image/aces"],
            DepthDecoder::Npy => &["application/x-npy"],
            DepthDecoder::Npz => &["application/x-npz"],
            DepthDecoder::Tiff => &["image/tiff", "image/tiff-fx"],
            DepthDecoder::Png => &["image/png"],
            DepthDecoder::Pfm => &["image/x-portable-floatmap"],
            DepthDecoder::Hdf5 => &["application/x-hdf5", "application/x-hdf"],
        }
    }

    /// Whether the decoder accepts a file, by extension or by MIME type.
    ///
    /// # Arguments
    ///
    /// * `file_name` - The file name or path, only the extension is used.
    /// * `mime` - The MIME type reported by the host, if any.
    pub fn can_read(&self, file_name: &str, mime: Option<&str>) -> bool {
        let by_extension = extension(file_name)
            .map(|ext| self.extensions().iter().any(|e| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        let by_mime = mime
            .map(|m| {
                let m = m.split(';').next().unwrap_or(m).trim();
                self.mime_types().iter().any(|t| m.eq_ignore_ascii_case(t))
            })
            .unwrap_or(false);
        by_extension || by_mime
    }

    /// Decode the bytes of a file.
    pub fn read(&self, bytes: &[u8]) -> Result<DepthRead, IoError> {
        match self {
            DepthDecoder::Exr => exr::read_depth(bytes),
            DepthDecoder::Npy => npy::read_depth(bytes),
            DepthDecoder::Npz => npz::read_depth(bytes),
            DepthDecoder::Tiff => tiff::read_depth(bytes),
            DepthDecoder::Png => png::read_depth(bytes),
            DepthDecoder::Pfm => pfm::read_depth(bytes),
            DepthDecoder::Hdf5 => hdf5::read_depth(bytes),
        }
    }

    /// Metadata assumed for the format before looking at the content.
    pub fn format_defaults(&self) -> DepthMetadata {
        DepthMetadata {
            kind: Some(DepthKind::Depth),
            unit: Some(DepthUnit::Meter),
            ..Default::default()
        }
    }

    /// Guess the decoder from the leading bytes of a file.
    pub fn probe(bytes: &[u8]) -> Option<DepthDecoder> {
        const HDF5_MAGIC: &[u8] = b"\x89HDF\r\n\x1a\n";
        const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

        if bytes.starts_with(&exr::EXR_MAGIC.to_le_bytes()) {
            Some(DepthDecoder::Exr)
        } else if bytes.starts_with(npy::NPY_MAGIC) {
            Some(DepthDecoder::Npy)
        } else if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
            Some(DepthDecoder::Npz)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(DepthDecoder::Tiff)
        } else if bytes.starts_with(PNG_MAGIC) {
            Some(DepthDecoder::Png)
        } else if bytes.starts_with(b"Pf") || bytes.starts_with(b"PF") {
            Some(DepthDecoder::Pfm)
        } else if bytes.starts_with(HDF5_MAGIC) {
            Some(DepthDecoder::Hdf5)
        } else {
            None
        }
    }
}

fn extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.').map(|(_, ext)| ext)
}

/// The decoders accepting a file, in probe order.
pub fn decoders_for(file_name: &str, mime: Option<&str>) -> Vec<DepthDecoder> {
    DepthDecoder::ALL
        .into_iter()
        .filter(|d| d.can_read(file_name, mime))
        .collect()
}

/// Metadata suggested by the file name.
///
/// Names containing `disp` hold disparity, names containing both `inv` and
/// `depth` hold inverse depth.
pub fn file_name_hints(file_name: &str) -> DepthMetadata {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .to_ascii_lowercase();
    let kind = if base.contains("disp") {
        Some(DepthKind::Disparity)
    } else if base.contains("inv") && base.contains("depth") {
        Some(DepthKind::InverseDepth)
    } else {
        None
    };
    DepthMetadata {
        kind,
        ..Default::default()
    }
}

/// Decode a depth file with the first decoder that accepts it.
///
/// Decoders are tried in [`DepthDecoder::ALL`] order. A decoder that finds no
/// depth data in the file hands over to the next one; any other error is
/// returned as is. The returned metadata layers the format defaults, the
/// decoder's inferences and the file name hints, later layers winning.
///
/// # Arguments
///
/// * `file_name` - Name of the file, used for the extension and the hints.
/// * `mime` - MIME type of the file, if known.
/// * `bytes` - The file content.
///
/// # Errors
///
/// [`IoError::UnsupportedFormat`] when no decoder accepts the file.
pub fn decode_depth(
    file_name: &str,
    mime: Option<&str>,
    bytes: &[u8],
) -> Result<DepthRead, IoError> {
    let mut last_not_found = None;

    for decoder in decoders_for(file_name, mime) {
        match decoder.read(bytes) {
            Ok(read) => {
                log::debug!("decoded {file_name} as {}", decoder.name());
                let meta = DepthMetadata::layered([
                    &decoder.format_defaults(),
                    &read.meta,
                    &file_name_hints(file_name),
                ]);
                return Ok(DepthRead {
                    image: read.image,
                    meta,
                });
            }
            Err(err) if err.is_not_found() => {
                log::debug!(
                    "{} decoder found no depth in {file_name}: {err}",
                    decoder.name()
                );
                last_not_found = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_not_found.unwrap_or_else(|| IoError::UnsupportedFormat(file_name.to_string())))
}
