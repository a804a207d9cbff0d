use std::io::Cursor;

use pointscope_image::{DepthImage, DepthMetadata, DepthUnit};
use tiff::decoder::{Decoder, DecodingResult};

use crate::error::IoError;
use crate::registry::DepthRead;

/// A decoded TIFF with its samples widened to `f32`.
pub(crate) struct TiffSamples {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: Vec<f32>,
    pub is_u16: bool,
    /// Value of a fully saturated sample, 1.0 for floats.
    pub sample_max: f32,
}

pub(crate) fn decode_samples(bytes: &[u8]) -> Result<TiffSamples, IoError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    let channels = extract_channels_from_tiff_colortype(&decoder.colortype()?).ok_or(
        IoError::Unsupported {
            variant: "TIFF color type",
            suggestion: "use a grayscale, RGB or RGBA TIFF",
        },
    )?;

    let result = decoder.read_image()?;
    let is_u16 = matches!(result, DecodingResult::U16(_));
    let sample_max = match &result {
        DecodingResult::U8(_) => u8::MAX as f32,
        DecodingResult::U16(_) => u16::MAX as f32,
        DecodingResult::U32(_) => u32::MAX as f32,
        DecodingResult::U64(_) => u64::MAX as f32,
        DecodingResult::I8(_) => i8::MAX as f32,
        DecodingResult::I16(_) => i16::MAX as f32,
        DecodingResult::I32(_) => i32::MAX as f32,
        DecodingResult::I64(_) => i64::MAX as f32,
        DecodingResult::F32(_) | DecodingResult::F64(_) => 1.0,
    };
    let data = match result {
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
    };

    Ok(TiffSamples {
        width,
        height,
        channels,
        data,
        is_u16,
        sample_max,
    })
}

fn extract_channels_from_tiff_colortype(colortype: &tiff::ColorType) -> Option<usize> {
    match colortype {
        tiff::ColorType::Gray(_) => Some(1),
        tiff::ColorType::GrayA(_) => Some(2),
        tiff::ColorType::RGB(_) => Some(3),
        tiff::ColorType::RGBA(_) => Some(4),
        _ => None,
    }
}

/// Decode a TIFF depth map.
///
/// Integer and float sample formats are widened to `f32`. 16-bit unsigned
/// maps are assumed to hold millimeters. For images with several channels
/// only the first one is kept.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let samples = decode_samples(bytes)?;

    let data = if samples.channels > 1 {
        log::warn!(
            "TIFF depth map has {} channels, using the first one",
            samples.channels
        );
        samples
            .data
            .iter()
            .step_by(samples.channels)
            .copied()
            .collect()
    } else {
        samples.data
    };

    let meta = DepthMetadata {
        unit: samples.is_u16.then_some(DepthUnit::Millimeter),
        ..Default::default()
    };

    Ok(DepthRead {
        image: DepthImage::new(samples.width, samples.height, data)?,
        meta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn encode<C: colortype::ColorType>(width: u32, height: u32, data: &[C::Inner]) -> Vec<u8>
    where
        [C::Inner]: tiff::encoder::TiffValue,
    {
        let mut buf = Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut buf).unwrap();
        encoder.write_image::<C>(width, height, data).unwrap();
        buf.into_inner()
    }

    #[test]
    fn read_float_depth() -> Result<(), IoError> {
        let bytes = encode::<colortype::Gray32Float>(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.5]);
        let read = read_depth(&bytes)?;
        assert_eq!(read.image.width(), 3);
        assert_eq!(read.image.height(), 2);
        assert_eq!(read.image.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.5]);
        assert_eq!(read.meta.unit, None);
        Ok(())
    }

    #[test]
    fn read_u16_depth_in_millimeters() -> Result<(), IoError> {
        let bytes = encode::<colortype::Gray16>(2, 2, &[0, 500, 1000, 65535]);
        let read = read_depth(&bytes)?;
        assert_eq!(read.image.as_slice(), &[0.0, 500.0, 1000.0, 65535.0]);
        assert_eq!(read.meta.unit, Some(DepthUnit::Millimeter));
        Ok(())
    }

    #[test]
    fn read_rgb_keeps_first_channel() -> Result<(), IoError> {
        let bytes = encode::<colortype::RGB8>(2, 1, &[10, 20, 30, 40, 50, 60]);
        let read = read_depth(&bytes)?;
        assert_eq!(read.image.as_slice(), &[10.0, 40.0]);
        Ok(())
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(read_depth(b"not a tiff").is_err());
    }
}
