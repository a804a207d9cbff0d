use pointscope_image::{DepthImage, DepthMetadata};

use crate::cursor::{BinaryCursor, Endian};
use crate::error::IoError;
use crate::registry::DepthRead;

/// Header of a portable float map.
#[derive(Debug, Clone, PartialEq)]
pub struct PfmHeader {
    /// Number of channels, 1 for `Pf` and 3 for `PF`.
    pub channels: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Byte order of the samples, little-endian when the scale is negative.
    pub endian: Endian,
    /// Absolute value of the scale field.
    pub scale: f32,
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

// whitespace separated ASCII token
fn next_token<'a>(cursor: &mut BinaryCursor<'a>) -> Result<&'a str, IoError> {
    while cursor.rest().first().is_some_and(|&b| is_space(b)) {
        cursor.skip(1)?;
    }
    let len = cursor
        .rest()
        .iter()
        .position(|&b| is_space(b))
        .unwrap_or(cursor.remaining());
    let token = cursor.take(len)?;
    std::str::from_utf8(token).map_err(|_| invalid("header is not ASCII"))
}

fn invalid(reason: impl Into<String>) -> IoError {
    IoError::InvalidHeader {
        format: "PFM",
        reason: reason.into(),
    }
}

/// Parse the text header, leaving the cursor on the first sample.
pub fn parse_header(cursor: &mut BinaryCursor) -> Result<PfmHeader, IoError> {
    let channels = match next_token(cursor)? {
        "Pf" => 1,
        "PF" => 3,
        _ => return Err(IoError::InvalidMagic("PFM")),
    };
    let width = next_token(cursor)?
        .parse::<u32>()
        .map_err(|_| invalid("width is not an integer"))?;
    let height = next_token(cursor)?
        .parse::<u32>()
        .map_err(|_| invalid("height is not an integer"))?;
    let scale = next_token(cursor)?
        .parse::<f32>()
        .map_err(|_| invalid("scale is not a number"))?;
    if scale == 0.0 || !scale.is_finite() {
        return Err(invalid("scale must be finite and non-zero"));
    }
    // a single whitespace byte separates the header from the samples
    cursor.skip(1)?;

    Ok(PfmHeader {
        channels,
        width,
        height,
        endian: if scale < 0.0 {
            Endian::Little
        } else {
            Endian::Big
        },
        scale: scale.abs(),
    })
}

/// Decode a PFM depth map.
///
/// Rows are stored bottom to top and are flipped so that row 0 is the top of
/// the image. Color maps keep their first channel.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let mut cursor = BinaryCursor::new(bytes);
    let header = parse_header(&mut cursor)?;
    cursor.set_endian(header.endian);

    let width = header.width as usize;
    let height = header.height as usize;
    let needed = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(header.channels * 4));
    if !needed.is_some_and(|n| n <= cursor.remaining()) {
        return Err(invalid(format!(
            "{}x{} samples do not fit the {} bytes left",
            header.width,
            header.height,
            cursor.remaining()
        )));
    }

    let mut rows = Vec::with_capacity(height);
    for _ in 0..height {
        let mut row = Vec::with_capacity(width);
        for _ in 0..width {
            row.push(cursor.read_f32()?);
            cursor.skip((header.channels - 1) * 4)?;
        }
        rows.push(row);
    }
    let data = rows.into_iter().rev().flatten().collect();

    Ok(DepthRead {
        image: DepthImage::new(header.width, header.height, data)?,
        meta: DepthMetadata::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pfm_bytes(magic: &str, width: usize, rows_top_down: &[Vec<f32>], little: bool) -> Vec<u8> {
        let scale = if little { "-1.0" } else { "1.0" };
        let mut out = format!("{magic}\n{width} {}\n{scale}\n", rows_top_down.len()).into_bytes();
        for row in rows_top_down.iter().rev() {
            for v in row {
                if little {
                    out.extend_from_slice(&v.to_le_bytes());
                } else {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
        }
        out
    }

    #[test]
    fn reads_gray_bottom_to_top() -> Result<(), IoError> {
        let rows = vec![vec![1.0, 1.5, 2.0], vec![2.5, 3.0, 3.5]];
        let read = read_depth(&pfm_bytes("Pf", 3, &rows, true))?;
        assert_eq!(read.image.width(), 3);
        assert_eq!(read.image.height(), 2);
        assert_eq!(read.image.as_slice(), &[1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        Ok(())
    }

    #[test]
    fn reads_big_endian_color() -> Result<(), IoError> {
        let rows = vec![vec![1.0, 9.0, 9.0, 2.0, 9.0, 9.0]];
        let read = read_depth(&pfm_bytes("PF", 2, &rows, false))?;
        assert_eq!(read.image.as_slice(), &[1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn header_fields() -> Result<(), IoError> {
        let bytes = b"Pf\n4 3\n-0.5\n";
        let mut cursor = BinaryCursor::new(bytes);
        let header = parse_header(&mut cursor)?;
        assert_eq!(header.channels, 1);
        assert_eq!((header.width, header.height), (4, 3));
        assert_eq!(header.endian, Endian::Little);
        assert_eq!(header.scale, 0.5);
        assert!(cursor.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            read_depth(b"P5\n1 1\n255\n\0"),
            Err(IoError::InvalidMagic("PFM"))
        ));
        assert!(matches!(
            read_depth(b"Pf\n1 x\n-1.0\n"),
            Err(IoError::InvalidHeader { .. })
        ));
        // one sample missing
        let mut bytes = pfm_bytes("Pf", 2, &[vec![1.0, 2.0]], true);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(
            read_depth(&bytes),
            Err(IoError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn rejects_size_larger_than_data() {
        let bytes = b"Pf\n4294967295 4294967295\n-1.0\n\0\0\0\0";
        assert!(matches!(
            read_depth(bytes),
            Err(IoError::InvalidHeader { .. })
        ));
        let bytes = b"PF\n2 1\n-1.0\n\0\0\0\0\0\0\0\0\0\0\0\0";
        assert!(matches!(
            read_depth(bytes),
            Err(IoError::InvalidHeader { .. })
        ));
    }
}
