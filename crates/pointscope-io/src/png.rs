use std::io::Cursor;

use pointscope_image::{DepthImage, DepthMetadata, DepthUnit};
use png::{BitDepth, ColorType, Decoder, Transformations};

use crate::error::IoError;
use crate::registry::DepthRead;

/// Decode a grayscale PNG depth map.
///
/// 8 and 16 bit grayscale images are accepted, with or without alpha (the
/// alpha channel is dropped). 16-bit maps are assumed to hold millimeters,
/// the usual encoding of RGB-D sensors.
///
/// # Errors
///
/// [`IoError::Unsupported`] for color images and bit depths below 8.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let mut decoder = Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;

    let samples_per_pixel = match info.color_type {
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        _ => {
            return Err(IoError::Unsupported {
                variant: "color PNG depth map",
                suggestion: "save the depth as a single channel 8 or 16 bit PNG",
            })
        }
    };
    let bytes_per_sample = match info.bit_depth {
        BitDepth::Eight => 1,
        BitDepth::Sixteen => 2,
        _ => {
            return Err(IoError::Unsupported {
                variant: "PNG bit depth below 8",
                suggestion: "save the depth as an 8 or 16 bit PNG",
            })
        }
    };

    let width = info.width as usize;
    let pixel_stride = samples_per_pixel * bytes_per_sample;
    let mut data = Vec::with_capacity(width * info.height as usize);
    for row in buf.chunks_exact(info.line_size).take(info.height as usize) {
        for pixel in row[..width * pixel_stride].chunks_exact(pixel_stride) {
            let value = match bytes_per_sample {
                // 16 bit samples are stored big-endian
                2 => u16::from_be_bytes([pixel[0], pixel[1]]) as f32,
                _ => pixel[0] as f32,
            };
            data.push(value);
        }
    }

    let meta = DepthMetadata {
        unit: (bytes_per_sample == 2).then_some(DepthUnit::Millimeter),
        ..Default::default()
    };

    Ok(DepthRead {
        image: DepthImage::new(info.width, info.height, data)?,
        meta,
    })
}
