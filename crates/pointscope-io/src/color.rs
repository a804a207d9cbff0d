//! Color images loaded next to a depth map to tint the projected points.

use crate::error::IoError;
use crate::tiff::decode_samples;

fn check_size(expected: [u32; 2], actual: [u32; 2]) -> Result<(), IoError> {
    if expected != actual {
        return Err(IoError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Read a TIFF color image as one RGB triplet per pixel.
///
/// Grayscale images are replicated to the three channels and alpha is
/// dropped. Samples are rescaled from the full range of their type to 8 bits.
///
/// # Arguments
///
/// * `bytes` - The TIFF file content.
/// * `expected_size` - Size of the depth image as `[width, height]`.
///
/// # Errors
///
/// [`IoError::DimensionMismatch`] when the image size differs from
/// `expected_size`.
pub fn read_tiff_colors(
    bytes: &[u8],
    expected_size: [u32; 2],
) -> Result<Vec<[u8; 3]>, IoError> {
    let samples = decode_samples(bytes)?;
    check_size(expected_size, [samples.width, samples.height])?;

    let to_u8 = |v: f32| (v / samples.sample_max * 255.0).round().clamp(0.0, 255.0) as u8;
    Ok(samples
        .data
        .chunks_exact(samples.channels)
        .map(|px| match px {
            [g] | [g, _] => [to_u8(*g); 3],
            [r, g, b, ..] => [to_u8(*r), to_u8(*g), to_u8(*b)],
            [] => [0; 3],
        })
        .collect())
}

/// Read a PPM color image as one RGB triplet per pixel.
///
/// Only the ASCII `P3` variant is decoded. `#` comments are allowed anywhere
/// in the header or the samples.
///
/// # Errors
///
/// [`IoError::Unsupported`] for binary `P6` files and
/// [`IoError::DimensionMismatch`] when the image size differs from
/// `expected_size`.
pub fn read_ppm_colors(
    bytes: &[u8],
    expected_size: [u32; 2],
) -> Result<Vec<[u8; 3]>, IoError> {
    let invalid = |reason: &str| IoError::InvalidHeader {
        format: "PPM",
        reason: reason.to_string(),
    };

    if bytes.starts_with(b"P6") {
        return Err(IoError::Unsupported {
            variant: "binary PPM (P6)",
            suggestion: "convert the color image to ASCII PPM (P3) or TIFF",
        });
    }
    if !bytes.starts_with(b"P3") {
        return Err(IoError::InvalidMagic("PPM"));
    }

    let text = std::str::from_utf8(bytes).map_err(|_| invalid("P3 file is not ASCII"))?;
    let mut tokens = text
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
        .skip(1);

    let mut header = [0u32; 3];
    for (field, name) in header.iter_mut().zip(["width", "height", "max value"]) {
        *field = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| invalid(&format!("missing or invalid {name}")))?;
    }
    let [width, height, max_value] = header;
    if max_value == 0 || max_value > u16::MAX as u32 {
        return Err(invalid("max value must be in 1..=65535"));
    }
    check_size(expected_size, [width, height])?;

    let num_pixels = width as usize * height as usize;
    let mut colors = Vec::with_capacity(num_pixels);
    for _ in 0..num_pixels {
        let mut rgb = [0u8; 3];
        for channel in rgb.iter_mut() {
            let value = tokens
                .next()
                .and_then(|t| t.parse::<u32>().ok())
                .ok_or_else(|| invalid("missing or invalid sample"))?;
            *channel = (value.min(max_value) * 255 / max_value) as u8;
        }
        colors.push(rgb);
    }
    Ok(colors)
}
