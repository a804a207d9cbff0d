/// An error type for depth projection.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ProjectionError {
    /// No focal length could be resolved.
    #[error("Missing intrinsics: fx is required to project depth")]
    MissingIntrinsics,

    /// Disparity samples need a baseline to be converted to depth.
    #[error("Missing baseline: disparity maps need a stereo baseline")]
    MissingBaseline,

    /// A focal length or the baseline is zero, negative or not finite.
    #[error("{name} must be finite and greater than zero, got {value}")]
    NonPositive {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// The color buffer does not cover the depth image.
    #[error("Color buffer has {actual} pixels but the depth image has {expected}")]
    DimensionMismatch {
        /// Number of depth pixels.
        expected: usize,
        /// Number of color pixels.
        actual: usize,
    },
}

/// An error type for interleaved vertex decoding.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VertexError {
    /// No buffer was provided.
    #[error("Missing vertex buffer")]
    MissingBuffer,

    /// The record stride is zero.
    #[error("Vertex stride must be greater than zero")]
    ZeroStride,

    /// A property ends after the record.
    #[error("Property {name} at offset {offset} with size {size} exceeds the stride {stride}")]
    PropertyOutOfBounds {
        /// Name of the property.
        name: String,
        /// Byte offset of the property.
        offset: usize,
        /// Size of the property in bytes.
        size: usize,
        /// Size of a record in bytes.
        stride: usize,
    },

    /// Two properties share bytes.
    #[error("Property {second} overlaps property {first}")]
    OverlappingProperties {
        /// The property with the lower offset.
        first: String,
        /// The property that starts inside `first`.
        second: String,
    },

    /// A position component is not described by the layout.
    #[error("Layout has no {0} property, positions require x, y and z")]
    MissingPosition(&'static str),

    /// The scalar type name is not known.
    #[error("Unknown scalar type {0}")]
    UnknownScalarType(String),
}
