use std::io::Read;

use pointscope_image::{DepthImage, DepthKind, DepthMetadata};

use crate::cursor::BinaryCursor;
use crate::error::IoError;
use crate::registry::DepthRead;

/// Magic number at the start of every EXR file, read as a little-endian u32.
pub const EXR_MAGIC: u32 = 0x0131_2f76;

const TILED_FLAG: u32 = 0x200;
const NON_IMAGE_FLAG: u32 = 0x800;
const MULTI_PART_FLAG: u32 = 0x1000;

// upper bound of the deflate compression ratio
const MAX_DEFLATE_RATIO: usize = 1032;

/// Channel names tried, in order, when looking for depth.
///
/// This is a heuristic: renderers and depth sensors name their channels
/// inconsistently and `R` is only a last resort for single channel exports.
pub const DEPTH_CHANNEL_PRIORITY: [&str; 7] =
    ["Depth.V", "Depth", "Z", "Depth.Z", "Disparity", "Disp", "R"];

/// Storage type of the samples of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExrPixelType {
    /// 32-bit unsigned integer.
    Uint,
    /// 16-bit float.
    Half,
    /// 32-bit float.
    Float,
}

impl ExrPixelType {
    fn from_code(code: i32) -> Result<Self, IoError> {
        match code {
            0 => Ok(ExrPixelType::Uint),
            1 => Ok(ExrPixelType::Half),
            2 => Ok(ExrPixelType::Float),
            _ => Err(IoError::InvalidHeader {
                format: "EXR",
                reason: format!("unknown pixel type {code}"),
            }),
        }
    }

    /// Size of one sample in bytes.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ExrPixelType::Half => 2,
            ExrPixelType::Uint | ExrPixelType::Float => 4,
        }
    }
}

/// Compression method of the scanline blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExrCompression {
    /// Uncompressed, one scanline per block.
    None,
    /// Run length encoding.
    Rle,
    /// zlib, one scanline per block.
    Zips,
    /// zlib, 16 scanlines per block.
    Zip,
    /// Wavelet compression.
    Piz,
    /// Lossy 24-bit float compression.
    Pxr24,
    /// Lossy 4x4 block compression.
    B44,
    /// B44 with flat-field optimization.
    B44a,
    /// Lossy DCT compression, 32 scanlines.
    Dwaa,
    /// Lossy DCT compression, 256 scanlines.
    Dwab,
    /// Any other code.
    Unknown(u8),
}

impl ExrCompression {
    fn from_code(code: u8) -> Self {
        match code {
            0 => ExrCompression::None,
            1 => ExrCompression::Rle,
            2 => ExrCompression::Zips,
            3 => ExrCompression::Zip,
            4 => ExrCompression::Piz,
            5 => ExrCompression::Pxr24,
            6 => ExrCompression::B44,
            7 => ExrCompression::B44a,
            8 => ExrCompression::Dwaa,
            9 => ExrCompression::Dwab,
            other => ExrCompression::Unknown(other),
        }
    }

    fn code(&self) -> u8 {
        match self {
            ExrCompression::None => 0,
            ExrCompression::Rle => 1,
            ExrCompression::Zips => 2,
            ExrCompression::Zip => 3,
            ExrCompression::Piz => 4,
            ExrCompression::Pxr24 => 5,
            ExrCompression::B44 => 6,
            ExrCompression::B44a => 7,
            ExrCompression::Dwaa => 8,
            ExrCompression::Dwab => 9,
            ExrCompression::Unknown(code) => *code,
        }
    }

    /// Human readable name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            ExrCompression::None => "NONE",
            ExrCompression::Rle => "RLE",
            ExrCompression::Zips => "ZIPS",
            ExrCompression::Zip => "ZIP",
            ExrCompression::Piz => "PIZ",
            ExrCompression::Pxr24 => "PXR24",
            ExrCompression::B44 => "B44",
            ExrCompression::B44a => "B44A",
            ExrCompression::Dwaa => "DWAA",
            ExrCompression::Dwab => "DWAB",
            ExrCompression::Unknown(_) => "unknown",
        }
    }

    /// Number of scanlines per block for the supported methods.
    fn lines_per_block(&self) -> Result<usize, IoError> {
        match self {
            ExrCompression::None | ExrCompression::Zips => Ok(1),
            ExrCompression::Zip => Ok(16),
            other => Err(IoError::UnsupportedCompression {
                code: other.code(),
                name: other.name(),
            }),
        }
    }
}

/// One entry of the EXR channel list.
#[derive(Debug, Clone, PartialEq)]
pub struct ExrChannel {
    /// Channel name, e.g. `Z` or `Depth.V`.
    pub name: String,
    /// Sample storage type.
    pub pixel_type: ExrPixelType,
    /// Bytes per sample.
    pub bytes_per_pixel: usize,
    /// Byte offset of this channel inside one pixel of the interleaved layout.
    pub offset: usize,
}

/// The parsed content of an EXR file.
#[derive(Debug, Clone)]
pub struct ExrImage {
    /// Width of the data window.
    pub width: u32,
    /// Height of the data window.
    pub height: u32,
    /// Compression of the scanline blocks.
    pub compression: ExrCompression,
    /// Channels sorted by name.
    pub channels: Vec<ExrChannel>,
    /// Samples of the selected depth channel, `None` when no channel matched.
    pub depth_data: Option<Vec<f32>>,
    /// Name of the selected depth channel.
    pub depth_channel_name: Option<String>,
}

struct ExrHeader {
    channels: Vec<ExrChannel>,
    compression: ExrCompression,
    // xmin, ymin, xmax, ymax
    data_window: [i32; 4],
}

fn invalid(reason: String) -> IoError {
    IoError::InvalidHeader {
        format: "EXR",
        reason,
    }
}

impl ExrHeader {
    fn size(&self) -> Result<(u32, u32), IoError> {
        let [xmin, ymin, xmax, ymax] = self.data_window;
        let width = i64::from(xmax) - i64::from(xmin) + 1;
        let height = i64::from(ymax) - i64::from(ymin) + 1;
        if width <= 0 || height <= 0 {
            return Err(invalid(format!("empty data window {:?}", self.data_window)));
        }
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(width), Ok(height)) => Ok((width, height)),
            _ => Err(invalid(format!(
                "data window {:?} is too large",
                self.data_window
            ))),
        }
    }

    /// Check that `remaining` bytes can hold the offset table and the
    /// scanline blocks of the data window.
    fn check_data_size(&self, remaining: usize) -> Result<(), IoError> {
        let (width, height) = self.size()?;
        let (width, height) = (width as usize, height as usize);
        let too_large = || {
            invalid(format!(
                "data window {:?} needs more data than the {remaining} bytes left",
                self.data_window
            ))
        };

        let num_blocks = height.div_ceil(self.compression.lines_per_block()?);
        // offset table entry plus block row and byte count
        let block_overhead = num_blocks.checked_mul(16).ok_or_else(too_large)?;
        if block_overhead > remaining {
            return Err(too_large());
        }

        let pixel_bytes = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(self.bytes_per_pixel()))
            .ok_or_else(too_large)?;
        let stored_bytes = remaining - block_overhead;
        let capacity = match self.compression {
            ExrCompression::None => stored_bytes,
            _ => stored_bytes.saturating_mul(MAX_DEFLATE_RATIO),
        };
        if pixel_bytes > capacity {
            return Err(too_large());
        }
        Ok(())
    }

    fn bytes_per_pixel(&self) -> usize {
        self.channels.iter().map(|c| c.bytes_per_pixel).sum()
    }
}

/// Parse an EXR file and extract its depth channel.
///
/// A file without any channel from [`DEPTH_CHANNEL_PRIORITY`] is not an
/// error: the result has `depth_data: None`.
///
/// # Errors
///
/// Bad magic, a version other than 2, tiled/deep/multi-part files,
/// unsupported compression, a data window larger than the file can hold and
/// scanline blocks of the wrong size. The compression is checked before the
/// channels, so an unsupported method is reported even without depth.
pub fn parse(bytes: &[u8]) -> Result<ExrImage, IoError> {
    let mut cursor = BinaryCursor::new(bytes);

    if cursor.read_u32()? != EXR_MAGIC {
        return Err(IoError::InvalidMagic("EXR"));
    }

    let version = cursor.read_u32()?;
    if version & 0xff != 2 {
        return Err(IoError::UnsupportedExrVersion((version & 0xff) as u8));
    }
    if version & TILED_FLAG != 0 {
        return Err(IoError::UnsupportedExrVariant("tiled"));
    }
    if version & NON_IMAGE_FLAG != 0 {
        return Err(IoError::UnsupportedExrVariant("deep"));
    }
    if version & MULTI_PART_FLAG != 0 {
        return Err(IoError::UnsupportedExrVariant("multi-part"));
    }

    let header = parse_header(&mut cursor)?;
    let (width, height) = header.size()?;
    header.compression.lines_per_block()?;

    let selected = select_depth_channel(&header.channels);
    let depth_data = match selected {
        Some(index) => {
            log::debug!("using EXR channel {}", header.channels[index].name);
            Some(read_channel(&mut cursor, &header, index)?)
        }
        None => {
            log::debug!(
                "no depth channel among {:?}",
                header.channels.iter().map(|c| &c.name).collect::<Vec<_>>()
            );
            None
        }
    };

    Ok(ExrImage {
        width,
        height,
        compression: header.compression,
        depth_channel_name: selected.map(|i| header.channels[i].name.clone()),
        channels: header.channels,
        depth_data,
    })
}

/// Decode an EXR file into a depth image and the metadata implied by the
/// channel name.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let exr = parse(bytes)?;
    let (Some(data), Some(name)) = (exr.depth_data, exr.depth_channel_name) else {
        return Err(IoError::DepthChannelNotFound(
            exr.channels.into_iter().map(|c| c.name).collect(),
        ));
    };
    Ok(DepthRead {
        image: DepthImage::new(exr.width, exr.height, data)?,
        meta: DepthMetadata::with_kind(infer_kind(&name)),
    })
}

/// Guess what a depth channel measures from its name.
pub fn infer_kind(channel_name: &str) -> DepthKind {
    match channel_name.to_ascii_lowercase().as_str() {
        "z" | "depth.z" => DepthKind::Z,
        "disparity" | "disp" => DepthKind::Disparity,
        _ => DepthKind::Depth,
    }
}

/// Index of the best depth channel, trying exact names before
/// case-insensitive ones.
pub fn select_depth_channel(channels: &[ExrChannel]) -> Option<usize> {
    DEPTH_CHANNEL_PRIORITY
        .iter()
        .find_map(|wanted| channels.iter().position(|c| c.name == *wanted))
        .or_else(|| {
            DEPTH_CHANNEL_PRIORITY.iter().find_map(|wanted| {
                channels
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(wanted))
            })
        })
}

fn parse_header(cursor: &mut BinaryCursor) -> Result<ExrHeader, IoError> {
    let mut channels = None;
    let mut compression = ExrCompression::None;
    let mut data_window = None;

    loop {
        let name = cursor.read_cstr()?;
        if name.is_empty() {
            break;
        }
        let attr_type = cursor.read_cstr()?;
        let size = cursor.read_u32()? as usize;
        let payload = cursor.take(size)?;

        match (name.as_str(), attr_type.as_str()) {
            ("channels", "chlist") => channels = Some(parse_channel_list(payload)?),
            ("compression", "compression") => {
                let code = *payload.first().ok_or_else(|| IoError::InvalidHeader {
                    format: "EXR",
                    reason: "empty compression attribute".to_string(),
                })?;
                compression = ExrCompression::from_code(code);
            }
            ("dataWindow", "box2i") => {
                let mut box_cursor = BinaryCursor::new(payload);
                data_window = Some([
                    box_cursor.read_i32()?,
                    box_cursor.read_i32()?,
                    box_cursor.read_i32()?,
                    box_cursor.read_i32()?,
                ]);
            }
            _ => {}
        }
    }

    let channels = channels.ok_or_else(|| IoError::InvalidHeader {
        format: "EXR",
        reason: "missing channels attribute".to_string(),
    })?;
    let data_window = data_window.ok_or_else(|| IoError::InvalidHeader {
        format: "EXR",
        reason: "missing dataWindow attribute".to_string(),
    })?;

    Ok(ExrHeader {
        channels,
        compression,
        data_window,
    })
}

fn parse_channel_list(payload: &[u8]) -> Result<Vec<ExrChannel>, IoError> {
    let mut cursor = BinaryCursor::new(payload);
    let mut channels = Vec::new();

    loop {
        let name = cursor.read_cstr()?;
        if name.is_empty() {
            break;
        }
        let pixel_type = ExrPixelType::from_code(cursor.read_i32()?)?;
        // pLinear (1) + reserved (3) + xSampling (4) + ySampling (4)
        cursor.skip(12)?;
        channels.push(ExrChannel {
            name,
            pixel_type,
            bytes_per_pixel: pixel_type.bytes_per_pixel(),
            offset: 0,
        });
    }

    // the file stores channels sorted, sort again in case the writer did not
    channels.sort_by(|a, b| a.name.cmp(&b.name));
    let mut offset = 0;
    for channel in channels.iter_mut() {
        channel.offset = offset;
        offset += channel.bytes_per_pixel;
    }

    Ok(channels)
}

fn read_channel(
    cursor: &mut BinaryCursor,
    header: &ExrHeader,
    channel_index: usize,
) -> Result<Vec<f32>, IoError> {
    header.check_data_size(cursor.remaining())?;
    let (width, height) = header.size()?;
    let (width, height) = (width as usize, height as usize);
    let lines_per_block = header.compression.lines_per_block()?;
    let num_blocks = height.div_ceil(lines_per_block);
    let line_bytes = width * header.bytes_per_pixel();
    let channel = &header.channels[channel_index];
    let ymin = header.data_window[1];

    // the offset table is not needed for sequential reads
    for _ in 0..num_blocks {
        cursor.read_u64()?;
    }

    let mut out = vec![f32::NAN; width * height];

    for _ in 0..num_blocks {
        let row = cursor.read_i32()?;
        let byte_count = cursor.read_u32()? as usize;
        let payload = cursor.take(byte_count)?;

        let first_line = i64::from(row) - i64::from(ymin);
        if first_line < 0 || first_line as usize >= height {
            return Err(invalid(format!(
                "scanline block row {row} is outside the data window"
            )));
        }
        let first_line = first_line as usize;
        let lines = lines_per_block.min(height - first_line);
        let expected = lines * line_bytes;

        let block = decompress_block(header.compression, payload, expected, row)?;
        if block.len() != expected {
            return Err(IoError::ScanlineSizeMismatch {
                row,
                expected,
                actual: block.len(),
            });
        }

        for line in 0..lines {
            let start = line * line_bytes + channel.offset * width;
            let mut samples =
                BinaryCursor::new(&block[start..start + width * channel.bytes_per_pixel]);
            let dst = &mut out[(first_line + line) * width..(first_line + line + 1) * width];
            for value in dst.iter_mut() {
                *value = match channel.pixel_type {
                    ExrPixelType::Uint => samples.read_u32()? as f32,
                    ExrPixelType::Half => samples.read_f16()?,
                    ExrPixelType::Float => samples.read_f32()?,
                };
            }
        }
    }

    Ok(out)
}

fn decompress_block(
    compression: ExrCompression,
    payload: &[u8],
    expected: usize,
    row: i32,
) -> Result<Vec<u8>, IoError> {
    match compression {
        ExrCompression::None => Ok(payload.to_vec()),
        // blocks that do not shrink are stored raw
        ExrCompression::Zips | ExrCompression::Zip if payload.len() == expected => {
            Ok(payload.to_vec())
        }
        ExrCompression::Zips | ExrCompression::Zip => {
            let mut inflated = Vec::with_capacity(expected);
            flate2::read::ZlibDecoder::new(payload)
                .take(expected as u64 + 1)
                .read_to_end(&mut inflated)
                .map_err(IoError::InflateError)?;
            if inflated.len() != expected {
                return Err(IoError::ScanlineSizeMismatch {
                    row,
                    expected,
                    actual: inflated.len(),
                });
            }
            Ok(reconstruct_zip_block(inflated))
        }
        other => Err(IoError::UnsupportedCompression {
            code: other.code(),
            name: other.name(),
        }),
    }
}

/// Undo the delta predictor and the even/odd byte split applied by ZIP
/// compression before deflating.
fn reconstruct_zip_block(mut data: Vec<u8>) -> Vec<u8> {
    for i in 1..data.len() {
        data[i] = data[i - 1].wrapping_add(data[i]).wrapping_sub(128);
    }

    let half = data.len().div_ceil(2);
    let (first, second) = data.split_at(half);
    let mut out = Vec::with_capacity(data.len());
    for i in 0..half {
        out.push(first[i]);
        if let Some(&b) = second.get(i) {
            out.push(b);
        }
    }
    out
}
