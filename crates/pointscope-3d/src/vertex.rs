use crate::error::VertexError;

/// Scalar type of a vertex property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
}

impl ScalarType {
    /// Parse a PLY type name, either the legacy (`uchar`, `float`) or the
    /// sized (`uint8`, `float32`) spelling.
    pub fn from_ply_name(name: &str) -> Result<Self, VertexError> {
        match name {
            "char" | "int8" => Ok(Self::Int8),
            "uchar" | "uint8" => Ok(Self::UInt8),
            "short" | "int16" => Ok(Self::Int16),
            "ushort" | "uint16" => Ok(Self::UInt16),
            "int" | "int32" => Ok(Self::Int32),
            "uint" | "uint32" => Ok(Self::UInt32),
            "float" | "float32" => Ok(Self::Float32),
            "double" | "float64" => Ok(Self::Float64),
            _ => Err(VertexError::UnknownScalarType(name.to_string())),
        }
    }

    /// Size of the scalar in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Largest value of an integer type, `None` for floats.
    pub fn integer_max(&self) -> Option<f64> {
        match self {
            Self::Int8 => Some(i8::MAX as f64),
            Self::UInt8 => Some(u8::MAX as f64),
            Self::Int16 => Some(i16::MAX as f64),
            Self::UInt16 => Some(u16::MAX as f64),
            Self::Int32 => Some(i32::MAX as f64),
            Self::UInt32 => Some(u32::MAX as f64),
            Self::Float32 | Self::Float64 => None,
        }
    }

    /// Read one value from `bytes`, which holds at least [`ScalarType::size`] bytes.
    fn read(&self, bytes: &[u8], little_endian: bool) -> f64 {
        macro_rules! read_as {
            ($ty:ty) => {{
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                if little_endian {
                    <$ty>::from_le_bytes(buf) as f64
                } else {
                    <$ty>::from_be_bytes(buf) as f64
                }
            }};
        }
        match self {
            Self::Int8 => bytes[0] as i8 as f64,
            Self::UInt8 => bytes[0] as f64,
            Self::Int16 => read_as!(i16),
            Self::UInt16 => read_as!(u16),
            Self::Int32 => read_as!(i32),
            Self::UInt32 => read_as!(u32),
            Self::Float32 => read_as!(f32),
            Self::Float64 => read_as!(f64),
        }
    }
}

/// A named scalar at a fixed offset inside every vertex record.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexProperty {
    /// Property name, such as `x` or `red`.
    pub name: String,
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Scalar type of the property.
    pub scalar_type: ScalarType,
}

impl VertexProperty {
    /// Create a property.
    pub fn new(name: impl Into<String>, offset: usize, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            offset,
            scalar_type,
        }
    }

    fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.scalar_type.size())
    }
}

/// Describes how vertices are laid out in an interleaved buffer.
///
/// # Examples
///
/// ```
/// use pointscope_3d::vertex::{ScalarType, VertexLayout, VertexProperty};
///
/// let layout = VertexLayout::new(
///     15,
///     vec![
///         VertexProperty::new("x", 0, ScalarType::Float32),
///         VertexProperty::new("y", 4, ScalarType::Float32),
///         VertexProperty::new("z", 8, ScalarType::Float32),
///         VertexProperty::new("red", 12, ScalarType::UInt8),
///         VertexProperty::new("green", 13, ScalarType::UInt8),
///         VertexProperty::new("blue", 14, ScalarType::UInt8),
///     ],
///     true,
/// )
/// .unwrap();
///
/// assert_eq!(layout.stride(), 15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    stride: usize,
    properties: Vec<VertexProperty>,
    little_endian: bool,
}

impl VertexLayout {
    /// Create a validated layout.
    ///
    /// # Errors
    ///
    /// [`VertexError::ZeroStride`] for an empty record,
    /// [`VertexError::PropertyOutOfBounds`] when a property ends after the
    /// stride, and [`VertexError::OverlappingProperties`] when two properties
    /// share bytes.
    pub fn new(
        stride: usize,
        properties: Vec<VertexProperty>,
        little_endian: bool,
    ) -> Result<Self, VertexError> {
        if stride == 0 {
            return Err(VertexError::ZeroStride);
        }

        for prop in &properties {
            if !prop.end().is_some_and(|end| end <= stride) {
                return Err(VertexError::PropertyOutOfBounds {
                    name: prop.name.clone(),
                    offset: prop.offset,
                    size: prop.scalar_type.size(),
                    stride,
                });
            }
        }

        let mut sorted = properties.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|p| p.offset);
        for pair in sorted.windows(2) {
            if pair[0].end().is_some_and(|end| end > pair[1].offset) {
                return Err(VertexError::OverlappingProperties {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }

        Ok(Self {
            stride,
            properties,
            little_endian,
        })
    }

    /// Size of one record in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The properties, in declaration order.
    pub fn properties(&self) -> &[VertexProperty] {
        &self.properties
    }

    /// Whether multi-byte scalars are little-endian.
    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    /// Look a property up by name.
    pub fn property(&self, name: &str) -> Option<&VertexProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn find_all<'a>(&'a self, names: &[&str]) -> Option<Vec<&'a VertexProperty>> {
        names.iter().map(|name| self.property(name)).collect()
    }
}

/// Vertex attributes decoded from an interleaved buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedVertices {
    /// `x, y, z` per vertex.
    pub positions: Vec<f32>,
    /// `r, g, b` per vertex, in `[0, 1]` for integer sources.
    pub colors: Option<Vec<f32>>,
    /// `nx, ny, nz` per vertex.
    pub normals: Option<Vec<f32>>,
}

impl DecodedVertices {
    /// Number of decoded vertices.
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    /// Whether no vertex was decoded.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

fn sanitize(value: f64) -> f32 {
    let value = value as f32;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn decode_attribute(
    buffer: &[u8],
    layout: &VertexLayout,
    props: &[&VertexProperty],
    normalize: bool,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(buffer.len() / layout.stride * props.len());
    for record in buffer.chunks_exact(layout.stride) {
        for prop in props {
            let raw = prop
                .scalar_type
                .read(
                    &record[prop.offset..prop.offset + prop.scalar_type.size()],
                    layout.little_endian,
                );
            let value = match (normalize, prop.scalar_type.integer_max()) {
                (true, Some(max)) => (raw / max).clamp(0.0, 1.0),
                _ => raw,
            };
            out.push(sanitize(value));
        }
    }
    out
}

/// Decode positions, colors and normals from an interleaved vertex buffer.
///
/// Trailing bytes shorter than a stride are ignored. Colors are read from
/// `red green blue` or `r g b`, normals from `nx ny nz`; both are `None` when
/// the layout lacks them. NaN and infinite values are replaced with `0.0`.
///
/// # Errors
///
/// [`VertexError::MissingBuffer`] when `buffer` is `None` and
/// [`VertexError::MissingPosition`] when `x`, `y` or `z` is not in the layout.
pub fn decode_vertices(
    buffer: Option<&[u8]>,
    layout: &VertexLayout,
) -> Result<DecodedVertices, VertexError> {
    let buffer = buffer.ok_or(VertexError::MissingBuffer)?;

    let mut positions = Vec::with_capacity(3);
    for name in ["x", "y", "z"] {
        positions.push(layout.property(name).ok_or(VertexError::MissingPosition(name))?);
    }

    let trailing = buffer.len() % layout.stride;
    if trailing != 0 {
        log::debug!("ignoring {trailing} trailing bytes of the vertex buffer");
    }

    let colors = layout
        .find_all(&["red", "green", "blue"])
        .or_else(|| layout.find_all(&["r", "g", "b"]));
    let normals = layout.find_all(&["nx", "ny", "nz"]);

    Ok(DecodedVertices {
        positions: decode_attribute(buffer, layout, &positions, false),
        colors: colors.map(|props| decode_attribute(buffer, layout, &props, true)),
        normals: normals.map(|props| decode_attribute(buffer, layout, &props, false)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xyz_rgb_layout() -> Result<VertexLayout, VertexError> {
        VertexLayout::new(
            16,
            vec![
                VertexProperty::new("x", 0, ScalarType::Float32),
                VertexProperty::new("y", 4, ScalarType::Float32),
                VertexProperty::new("z", 8, ScalarType::Float32),
                VertexProperty::new("red", 12, ScalarType::UInt8),
                VertexProperty::new("green", 13, ScalarType::UInt8),
                VertexProperty::new("blue", 14, ScalarType::UInt8),
            ],
            true,
        )
    }

    fn record(xyz: [f32; 3], rgb: [u8; 3]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for v in xyz {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&rgb);
        bytes.push(0);
        bytes
    }

    #[test]
    fn decode_positions_and_colors() -> Result<(), VertexError> {
        let layout = xyz_rgb_layout()?;
        let mut buffer = record([1.0, 2.0, 3.0], [255, 0, 51]);
        buffer.extend(record([-1.0, 0.5, 10.0], [0, 255, 0]));
        // partial trailing record
        buffer.extend_from_slice(&[1, 2, 3]);

        let decoded = decode_vertices(Some(buffer.as_slice()), &layout)?;
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.positions, vec![1.0, 2.0, 3.0, -1.0, 0.5, 10.0]);
        assert_eq!(decoded.colors, Some(vec![1.0, 0.0, 0.2, 0.0, 1.0, 0.0]));
        assert_eq!(decoded.normals, None);
        Ok(())
    }

    #[test]
    fn non_finite_values_become_zero() -> Result<(), VertexError> {
        let layout = xyz_rgb_layout()?;
        let mut buffer = record([1.5, f32::NAN, -2.0], [0, 0, 0]);
        buffer.extend(record([f32::INFINITY, 3.0, f32::NEG_INFINITY], [0, 0, 0]));
        let decoded = decode_vertices(Some(buffer.as_slice()), &layout)?;
        assert_eq!(decoded.positions, vec![1.5, 0.0, -2.0, 0.0, 3.0, 0.0]);
        Ok(())
    }

    #[test]
    fn offset_overflow_is_out_of_bounds() {
        let layout = VertexLayout::new(
            4,
            vec![VertexProperty::new("x", usize::MAX, ScalarType::Float32)],
            true,
        );
        assert!(matches!(
            layout,
            Err(VertexError::PropertyOutOfBounds { offset: usize::MAX, .. })
        ));
    }

    #[test]
    fn missing_buffer() -> Result<(), VertexError> {
        let layout = xyz_rgb_layout()?;
        assert_eq!(
            decode_vertices(None, &layout),
            Err(VertexError::MissingBuffer)
        );
        Ok(())
    }

    #[test]
    fn missing_position() -> Result<(), VertexError> {
        let layout = VertexLayout::new(
            8,
            vec![
                VertexProperty::new("x", 0, ScalarType::Float32),
                VertexProperty::new("y", 4, ScalarType::Float32),
            ],
            true,
        )?;
        assert_eq!(
            decode_vertices(Some(&[0u8; 8][..]), &layout),
            Err(VertexError::MissingPosition("z"))
        );
        Ok(())
    }

    #[test]
    fn big_endian_doubles_and_short_color_names() -> Result<(), VertexError> {
        let layout = VertexLayout::new(
            32,
            vec![
                VertexProperty::new("x", 0, ScalarType::Float64),
                VertexProperty::new("y", 8, ScalarType::Float64),
                VertexProperty::new("z", 16, ScalarType::Float64),
                VertexProperty::new("r", 24, ScalarType::UInt16),
                VertexProperty::new("g", 26, ScalarType::UInt16),
                VertexProperty::new("b", 28, ScalarType::Float32),
            ],
            false,
        )?;
        let mut buffer = Vec::new();
        for v in [1.5f64, -2.0, 4.25] {
            buffer.extend_from_slice(&v.to_be_bytes());
        }
        buffer.extend_from_slice(&u16::MAX.to_be_bytes());
        buffer.extend_from_slice(&0u16.to_be_bytes());
        buffer.extend_from_slice(&0.75f32.to_be_bytes());

        let decoded = decode_vertices(Some(buffer.as_slice()), &layout)?;
        assert_eq!(decoded.positions, vec![1.5, -2.0, 4.25]);
        assert_eq!(decoded.colors, Some(vec![1.0, 0.0, 0.75]));
        Ok(())
    }

    #[test]
    fn normals() -> Result<(), VertexError> {
        let props = ["x", "y", "z", "nx", "ny", "nz"]
            .iter()
            .enumerate()
            .map(|(i, name)| VertexProperty::new(*name, i * 2, ScalarType::Int16))
            .collect();
        let layout = VertexLayout::new(12, props, true)?;
        let buffer = [1i16, 2, 3, 0, -1, 0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<_>>();

        let decoded = decode_vertices(Some(buffer.as_slice()), &layout)?;
        assert_eq!(decoded.positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(decoded.normals, Some(vec![0.0, -1.0, 0.0]));
        assert_eq!(decoded.colors, None);
        Ok(())
    }

    #[test]
    fn layout_validation() {
        let overlap = VertexLayout::new(
            8,
            vec![
                VertexProperty::new("x", 0, ScalarType::Float32),
                VertexProperty::new("y", 2, ScalarType::Float32),
            ],
            true,
        );
        assert_eq!(
            overlap,
            Err(VertexError::OverlappingProperties {
                first: "x".to_string(),
                second: "y".to_string(),
            })
        );

        let out_of_bounds = VertexLayout::new(
            8,
            vec![VertexProperty::new("z", 4, ScalarType::Float64)],
            true,
        );
        assert!(matches!(
            out_of_bounds,
            Err(VertexError::PropertyOutOfBounds { name, .. }) if name == "z"
        ));

        assert_eq!(VertexLayout::new(0, vec![], true), Err(VertexError::ZeroStride));
    }

    #[test]
    fn ply_names() {
        assert_eq!(ScalarType::from_ply_name("uchar"), Ok(ScalarType::UInt8));
        assert_eq!(ScalarType::from_ply_name("float32"), Ok(ScalarType::Float32));
        assert_eq!(ScalarType::from_ply_name("double"), Ok(ScalarType::Float64));
        assert_eq!(
            ScalarType::from_ply_name("half"),
            Err(VertexError::UnknownScalarType("half".to_string()))
        );
    }
}
