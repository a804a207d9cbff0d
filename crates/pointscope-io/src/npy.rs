use pointscope_image::{DepthImage, DepthMetadata, DepthUnit};

use crate::cursor::{BinaryCursor, Endian};
use crate::error::IoError;
use crate::registry::DepthRead;

/// Magic bytes at the start of every NPY file.
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// The header dictionary of an NPY file.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    /// The dtype descriptor, e.g. `<f4`.
    pub descr: String,
    /// Whether the data is stored column-major.
    pub fortran_order: bool,
    /// The array shape, empty for a scalar.
    pub shape: Vec<usize>,
}

/// An NPY array with its samples widened or narrowed to `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    /// The array shape.
    pub shape: Vec<usize>,
    /// The dtype descriptor found in the file.
    pub dtype: String,
    /// Row-major samples.
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    Float,
    Int,
    Uint,
}

#[derive(Debug, Clone, Copy)]
struct Dtype {
    endian: Endian,
    kind: ScalarKind,
    size: usize,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, IoError> {
        let unsupported = || IoError::UnsupportedDtype(descr.to_string());
        let mut chars = descr.chars();
        let endian = match chars.next() {
            Some('<') | Some('|') | Some('=') => Endian::Little,
            Some('>') => Endian::Big,
            _ => return Err(unsupported()),
        };
        let kind = match chars.next() {
            Some('f') => ScalarKind::Float,
            Some('i') => ScalarKind::Int,
            Some('u') => ScalarKind::Uint,
            _ => return Err(unsupported()),
        };
        let size = chars
            .as_str()
            .parse::<usize>()
            .map_err(|_| unsupported())?;

        match (kind, size) {
            (ScalarKind::Float, 2 | 4 | 8)
            | (ScalarKind::Int | ScalarKind::Uint, 1 | 2 | 4 | 8) => Ok(Self { endian, kind, size }),
            _ => Err(unsupported()),
        }
    }

    fn read(&self, cursor: &mut BinaryCursor) -> Result<f32, IoError> {
        Ok(match (self.kind, self.size) {
            (ScalarKind::Float, 2) => cursor.read_f16()?,
            (ScalarKind::Float, 4) => cursor.read_f32()?,
            (ScalarKind::Float, _) => cursor.read_f64()? as f32,
            (ScalarKind::Int, 1) => cursor.read_u8()? as i8 as f32,
            (ScalarKind::Uint, 1) => cursor.read_u8()? as f32,
            (ScalarKind::Int, 2) => cursor.read_u16()? as i16 as f32,
            (ScalarKind::Uint, 2) => cursor.read_u16()? as f32,
            (ScalarKind::Int, 4) => cursor.read_i32()? as f32,
            (ScalarKind::Uint, 4) => cursor.read_u32()? as f32,
            // 64-bit integers go through f64 to keep the large magnitudes
            (ScalarKind::Int, _) => cursor.read_u64()? as i64 as f64 as f32,
            (ScalarKind::Uint, _) => cursor.read_u64()? as f64 as f32,
        })
    }
}

fn header_error(reason: impl Into<String>) -> IoError {
    IoError::InvalidHeader {
        format: "NPY",
        reason: reason.into(),
    }
}

/// Return the text following `'key':` in the header dictionary.
fn dict_value<'a>(dict: &'a str, key: &str) -> Result<&'a str, IoError> {
    let start = [format!("'{key}'"), format!("\"{key}\"")]
        .iter()
        .find_map(|quoted| dict.find(quoted.as_str()).map(|i| i + quoted.len()))
        .ok_or_else(|| header_error(format!("missing '{key}' key")))?;
    let rest = dict[start..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| header_error(format!("missing ':' after '{key}'")))?;
    Ok(rest.trim_start())
}

fn parse_dict(dict: &str) -> Result<NpyHeader, IoError> {
    let descr_value = dict_value(dict, "descr")?;
    let quote = descr_value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| header_error("'descr' is not a string"))?;
    let descr = descr_value[1..]
        .split(quote)
        .next()
        .ok_or_else(|| header_error("unterminated 'descr'"))?
        .to_string();

    let fortran_value = dict_value(dict, "fortran_order")?;
    let fortran_order = if fortran_value.starts_with("True") {
        true
    } else if fortran_value.starts_with("False") {
        false
    } else {
        return Err(header_error("'fortran_order' is not a boolean"));
    };

    let shape_value = dict_value(dict, "shape")?;
    let inner = shape_value
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or_else(|| header_error("'shape' is not a tuple"))?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| header_error(format!("invalid dimension '{s}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

/// Parse the magic, version and header dictionary, leaving the cursor at the
/// start of the array data.
pub fn parse_header(cursor: &mut BinaryCursor) -> Result<NpyHeader, IoError> {
    if cursor.take(NPY_MAGIC.len())? != NPY_MAGIC {
        return Err(IoError::InvalidMagic("NPY"));
    }

    let major = cursor.read_u8()?;
    let minor = cursor.read_u8()?;
    let header_len = match major {
        1 => cursor.read_u16()? as usize,
        2 => cursor.read_u32()? as usize,
        _ => return Err(IoError::UnsupportedNpyVersion(major, minor)),
    };

    // the dictionary is ASCII, decode as Latin-1 to never fail
    let dict = cursor
        .take(header_len)?
        .iter()
        .map(|&b| b as char)
        .collect::<String>();
    parse_dict(&dict)
}

/// Parse an NPY file and convert its samples to `f32`.
///
/// # Errors
///
/// Bad magic, versions other than 1 and 2, Fortran ordered arrays, dtypes
/// other than floats and integers, and truncated data.
///
/// # Example
///
/// ```
/// let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
/// let dict = "{'descr': '<f4', 'fortran_order': False, 'shape': (2,), }";
/// bytes.extend_from_slice(&(dict.len() as u16).to_le_bytes());
/// bytes.extend_from_slice(dict.as_bytes());
/// bytes.extend_from_slice(&1.5f32.to_le_bytes());
/// bytes.extend_from_slice(&2.5f32.to_le_bytes());
///
/// let array = pointscope_io::npy::parse(&bytes)?;
/// assert_eq!(array.shape, vec![2]);
/// assert_eq!(array.data, vec![1.5, 2.5]);
/// # Ok::<(), pointscope_io::error::IoError>(())
/// ```
pub fn parse(bytes: &[u8]) -> Result<NpyArray, IoError> {
    let mut cursor = BinaryCursor::new(bytes);
    let header = parse_header(&mut cursor)?;

    if header.fortran_order {
        return Err(IoError::FortranOrderUnsupported);
    }

    let dtype = Dtype::parse(&header.descr)?;
    cursor.set_endian(dtype.endian);

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| header_error(format!("shape {:?} overflows", header.shape)))?;
    let needed = count
        .checked_mul(dtype.size)
        .ok_or_else(|| header_error(format!("shape {:?} overflows", header.shape)))?;
    if cursor.remaining() < needed {
        return Err(header_error(format!(
            "array data truncated: {} bytes present, {needed} expected",
            cursor.remaining()
        )));
    }

    let data = (0..count)
        .map(|_| dtype.read(&mut cursor))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NpyArray {
        shape: header.shape,
        dtype: header.descr,
        data,
    })
}

/// Interpret a 2-D array, or a 3-D array with a singleton channel axis, as a
/// depth image.
pub fn depth_image_from_array(array: NpyArray) -> Result<DepthImage, IoError> {
    let (height, width) = match array.shape.as_slice() {
        [h, w] | [h, w, 1] | [1, h, w] => (*h, *w),
        _ => {
            return Err(IoError::InvalidShape(
                array.shape,
                "expected (H, W), (H, W, 1) or (1, H, W)",
            ))
        }
    };
    Ok(DepthImage::new(width as u32, height as u32, array.data)?)
}

/// Metadata implied by the dtype: integer arrays hold millimeters.
pub fn dtype_metadata(dtype: &str) -> DepthMetadata {
    let is_integer = matches!(dtype.chars().nth(1), Some('u') | Some('i'));
    DepthMetadata {
        unit: is_integer.then_some(DepthUnit::Millimeter),
        ..Default::default()
    }
}

/// Decode an NPY file holding a depth map.
pub fn read_depth(bytes: &[u8]) -> Result<DepthRead, IoError> {
    let array = parse(bytes)?;
    let meta = dtype_metadata(&array.dtype);
    Ok(DepthRead {
        image: depth_image_from_array(array)?,
        meta,
    })
}

/// Decode an NPY file holding XYZ points.
///
/// Any array whose last axis is 3 is accepted; leading axes are flattened.
pub fn read_points(bytes: &[u8]) -> Result<Vec<[f32; 3]>, IoError> {
    let array = parse(bytes)?;
    if array.shape.last() != Some(&3) {
        return Err(IoError::InvalidShape(
            array.shape,
            "the last axis must hold XYZ coordinates",
        ));
    }
    Ok(array
        .data
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npy_bytes(descr: &str, shape: &str, fortran: bool, payload: &[u8], major: u8) -> Vec<u8> {
        let mut dict = format!(
            "{{'descr': '{descr}', 'fortran_order': {}, 'shape': {shape}, }}",
            if fortran { "True" } else { "False" }
        );
        // pad so the data starts 64-byte aligned, like numpy does
        let prefix = 6 + 2 + if major == 1 { 2 } else { 4 };
        while (prefix + dict.len() + 1) % 64 != 0 {
            dict.push(' ');
        }
        dict.push('\n');

        let mut out = NPY_MAGIC.to_vec();
        out.extend_from_slice(&[major, 0]);
        if major == 1 {
            out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        } else {
            out.extend_from_slice(&(dict.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn float32_round_trip() -> Result<(), IoError> {
        let values = [0.5f32, -1.25, 3.0, 1e-3, 42.0, 7.5];
        let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        let array = parse(&npy_bytes("<f4", "(2, 3)", false, &payload, 1))?;
        assert_eq!(array.shape, vec![2, 3]);
        assert_eq!(array.dtype, "<f4");
        assert_eq!(array.data, values);
        Ok(())
    }

    #[test]
    fn float64_big_endian_version2() -> Result<(), IoError> {
        let values = [0.1f64, 2.5, -3.75];
        let payload = values.iter().flat_map(|v| v.to_be_bytes()).collect::<Vec<_>>();
        let array = parse(&npy_bytes(">f8", "(3,)", false, &payload, 2))?;
        for (a, b) in array.data.iter().zip(values.iter()) {
            approx::assert_relative_eq!(*a, *b as f32);
        }
        Ok(())
    }

    #[test]
    fn integer_dtypes() -> Result<(), IoError> {
        let cases: Vec<(&str, Vec<u8>, Vec<f32>)> = vec![
            ("|u1", vec![0, 255], vec![0.0, 255.0]),
            ("|i1", vec![0xff, 0x7f], vec![-1.0, 127.0]),
            (
                "<u2",
                [1000u16, 65535].iter().flat_map(|v| v.to_le_bytes()).collect(),
                vec![1000.0, 65535.0],
            ),
            (
                "<i2",
                [-5i16, 300].iter().flat_map(|v| v.to_le_bytes()).collect(),
                vec![-5.0, 300.0],
            ),
            (
                "<i4",
                [-70000i32, 70000].iter().flat_map(|v| v.to_le_bytes()).collect(),
                vec![-70000.0, 70000.0],
            ),
            (
                "<u4",
                [0u32, 4_000_000_000].iter().flat_map(|v| v.to_le_bytes()).collect(),
                vec![0.0, 4.0e9],
            ),
            (
                "<i8",
                [-(1i64 << 40), 12].iter().flat_map(|v| v.to_le_bytes()).collect(),
                vec![-(2f32.powi(40)), 12.0],
            ),
            (
                ">u8",
                [1u64 << 50, 3].iter().flat_map(|v| v.to_be_bytes()).collect(),
                vec![2f32.powi(50), 3.0],
            ),
        ];
        for (descr, payload, expected) in cases {
            let array = parse(&npy_bytes(descr, "(2,)", false, &payload, 1))?;
            assert_eq!(array.data, expected, "dtype {descr}");
        }
        Ok(())
    }

    #[test]
    fn half_dtype() -> Result<(), IoError> {
        let payload = [0x3c00u16, 0xc000].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        let array = parse(&npy_bytes("<f2", "(2,)", false, &payload, 1))?;
        assert_eq!(array.data, vec![1.0, -2.0]);
        Ok(())
    }

    #[test]
    fn rejects_fortran_order() {
        let payload = vec![0u8; 16];
        assert!(matches!(
            parse(&npy_bytes("<f4", "(2, 2)", true, &payload, 1)),
            Err(IoError::FortranOrderUnsupported)
        ));
    }

    #[test]
    fn rejects_unknown_dtype_and_version() {
        let payload = vec![0u8; 16];
        match parse(&npy_bytes("<c8", "(2,)", false, &payload, 1)) {
            Err(IoError::UnsupportedDtype(descr)) => assert_eq!(descr, "<c8"),
            other => panic!("unexpected result {other:?}"),
        }
        let mut bytes = npy_bytes("<f4", "(2,)", false, &payload, 1);
        bytes[6] = 3;
        assert!(matches!(
            parse(&bytes),
            Err(IoError::UnsupportedNpyVersion(3, 0))
        ));
        bytes[0] = b'X';
        assert!(matches!(parse(&bytes), Err(IoError::InvalidMagic("NPY"))));
    }

    #[test]
    fn rejects_truncated_data() {
        let payload = vec![0u8; 12];
        assert!(matches!(
            parse(&npy_bytes("<f4", "(2, 2)", false, &payload, 1)),
            Err(IoError::InvalidHeader { format: "NPY", .. })
        ));
    }

    #[test]
    fn scalar_shape() -> Result<(), IoError> {
        let array = parse(&npy_bytes("<f8", "()", false, &525.0f64.to_le_bytes(), 1))?;
        assert!(array.shape.is_empty());
        assert_eq!(array.data, vec![525.0]);
        Ok(())
    }

    #[test]
    fn depth_views() -> Result<(), IoError> {
        let payload = [1.0f32; 6].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        for shape in ["(2, 3)", "(2, 3, 1)", "(1, 2, 3)"] {
            let read = read_depth(&npy_bytes("<f4", shape, false, &payload, 1))?;
            assert_eq!((read.image.width(), read.image.height()), (3, 2), "{shape}");
        }
        assert!(matches!(
            read_depth(&npy_bytes("<f4", "(6,)", false, &payload, 1)),
            Err(IoError::InvalidShape(..))
        ));
        Ok(())
    }

    #[test]
    fn integer_depth_is_millimeters() -> Result<(), IoError> {
        let payload = [1500u16; 4].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        let read = read_depth(&npy_bytes("<u2", "(2, 2)", false, &payload, 1))?;
        assert_eq!(read.meta.unit, Some(DepthUnit::Millimeter));
        Ok(())
    }

    #[test]
    fn points_from_any_rank() -> Result<(), IoError> {
        let values = (0..12).map(|v| v as f32).collect::<Vec<_>>();
        let payload = values.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>();
        let points = read_points(&npy_bytes("<f4", "(2, 2, 3)", false, &payload, 1))?;
        assert_eq!(points.len(), 4);
        assert_eq!(points[3], [9.0, 10.0, 11.0]);

        assert!(read_points(&npy_bytes("<f4", "(3, 4)", false, &payload, 1)).is_err());
        Ok(())
    }
}
