use crate::error::IoError;

/// Byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// A sequential reader over a byte slice.
///
/// Every read advances the position and fails with
/// [`IoError::UnexpectedEof`] instead of panicking when the slice is too short.
///
/// # Example
///
/// ```
/// use pointscope_io::cursor::{BinaryCursor, Endian};
///
/// let data = [0x01, 0x00, 0x00, 0x02];
/// let mut cursor = BinaryCursor::new(&data);
/// assert_eq!(cursor.read_u16()?, 1);
///
/// cursor.set_endian(Endian::Big);
/// assert_eq!(cursor.read_u16()?, 2);
/// assert!(cursor.read_u8().is_err());
/// # Ok::<(), pointscope_io::error::IoError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> BinaryCursor<'a> {
    /// Create a little-endian cursor at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_endian(buf, Endian::Little)
    }

    /// Create a cursor with the given byte order.
    pub fn with_endian(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
        }
    }

    /// Change the byte order of subsequent reads.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], IoError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(IoError::UnexpectedEof {
                needed: n,
                offset: self.pos,
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Advance `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> Result<(), IoError> {
        self.take(n).map(|_| ())
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], IoError> {
        let slice = self.take(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, IoError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, IoError> {
        let bytes = self.read_array()?;
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        })
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32, IoError> {
        let bytes = self.read_array()?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Read a signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32, IoError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read an unsigned 64-bit integer, used for file offsets.
    pub fn read_u64(&mut self) -> Result<u64, IoError> {
        let bytes = self.read_array()?;
        Ok(match self.endian {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        })
    }

    /// Read a half precision float and widen it to `f32`.
    pub fn read_f16(&mut self) -> Result<f32, IoError> {
        Ok(half_to_f32(self.read_u16()?))
    }

    /// Read a single precision float.
    pub fn read_f32(&mut self) -> Result<f32, IoError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read a double precision float.
    pub fn read_f64(&mut self) -> Result<f64, IoError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read a NUL terminated string, consuming the terminator.
    pub fn read_cstr(&mut self) -> Result<String, IoError> {
        let rest = self.rest();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(IoError::UnexpectedEof {
                needed: rest.len() + 1,
                offset: self.pos,
            })?;
        let bytes = self.take(len + 1)?;
        Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }

    /// Read a line terminated by `\n`, without the terminator.
    pub fn read_line(&mut self) -> Result<&'a str, IoError> {
        let rest = self.rest();
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(IoError::UnexpectedEof {
                needed: rest.len() + 1,
                offset: self.pos,
            })?;
        let bytes = self.take(len + 1)?;
        std::str::from_utf8(&bytes[..len]).map_err(|_| IoError::InvalidHeader {
            format: "text",
            reason: format!("line at offset {} is not valid UTF-8", self.pos - len - 1),
        })
    }
}

/// Convert the bits of an IEEE 754 half precision float to `f32`.
///
/// Exponent 0 gives a signed zero, exponent 31 gives an infinity when the
/// mantissa is zero and NaN otherwise.
///
/// ```
/// use pointscope_io::cursor::half_to_f32;
///
/// assert_eq!(half_to_f32(0x3c00), 1.0);
/// assert_eq!(half_to_f32(0xc000), -2.0);
/// assert!(half_to_f32(0x7e00).is_nan());
/// ```
pub fn half_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0f32 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let fraction = (bits & 0x03ff) as f32;

    match exponent {
        0 => sign * 0.0,
        31 if fraction == 0.0 => sign * f32::INFINITY,
        31 => f32::NAN,
        _ => sign * 2f32.powi(exponent - 15) * (1.0 + fraction / 1024.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reads_both_endians() -> Result<(), IoError> {
        let data = [0x78, 0x56, 0x34, 0x12, 0x12, 0x34, 0x56, 0x78];
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_u32()?, 0x12345678);
        cursor.set_endian(Endian::Big);
        assert_eq!(cursor.read_u32()?, 0x12345678);
        assert!(cursor.is_empty());
        Ok(())
    }

    #[test]
    fn eof_reports_offset() {
        let data = [1u8, 2, 3];
        let mut cursor = BinaryCursor::new(&data);
        cursor.skip(2).unwrap();
        match cursor.read_u32() {
            Err(IoError::UnexpectedEof { needed, offset }) => {
                assert_eq!(needed, 4);
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
        // a failed read does not move the cursor
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn reads_strings_and_floats() -> Result<(), IoError> {
        let mut data = b"channels\0chlist\0".to_vec();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-0.25f64).to_le_bytes());
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_cstr()?, "channels");
        assert_eq!(cursor.read_cstr()?, "chlist");
        assert_eq!(cursor.read_f32()?, 1.5);
        assert_eq!(cursor.read_f64()?, -0.25);
        Ok(())
    }

    #[test]
    fn missing_terminator() {
        let mut cursor = BinaryCursor::new(b"abc");
        assert!(cursor.read_cstr().is_err());
        assert!(cursor.read_line().is_err());
    }

    #[test]
    fn half_float_values() {
        assert_eq!(half_to_f32(0x0000), 0.0);
        assert!(half_to_f32(0x8000).is_sign_negative());
        assert_eq!(half_to_f32(0x3c00), 1.0);
        assert_eq!(half_to_f32(0xc000), -2.0);
        assert_relative_eq!(half_to_f32(0x7bff), 65504.0, max_relative = 1e-3);
        assert_eq!(half_to_f32(0x7c00), f32::INFINITY);
        assert_eq!(half_to_f32(0xfc00), f32::NEG_INFINITY);
        assert!(half_to_f32(0x7c01).is_nan());
        // subnormals are flushed
        assert_eq!(half_to_f32(0x0001), 0.0);
    }
}
