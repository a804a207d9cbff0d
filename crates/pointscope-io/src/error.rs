/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Error to open or read the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// A read went past the end of the buffer.
    #[error("Unexpected end of data: needed {needed} bytes at offset {offset}")]
    UnexpectedEof {
        /// Number of bytes requested.
        needed: usize,
        /// Cursor position at the time of the read.
        offset: usize,
    },

    /// The file does not start with the magic bytes of the format.
    #[error("Invalid {0} magic number")]
    InvalidMagic(&'static str),

    /// The header is malformed.
    #[error("Invalid {format} header: {reason}")]
    InvalidHeader {
        /// Name of the format.
        format: &'static str,
        /// The violated constraint.
        reason: String,
    },

    /// The EXR version byte is not 2.
    #[error("Unsupported EXR version {0}, only version 2 is supported")]
    UnsupportedExrVersion(u8),

    /// A structurally valid EXR variant that is not implemented.
    #[error("Unsupported EXR variant: {0} images are not supported, convert to a single-part scanline EXR")]
    UnsupportedExrVariant(&'static str),

    /// The EXR compression method is not implemented.
    #[error("Unsupported EXR compression {name} ({code}), use NONE, ZIPS or ZIP")]
    UnsupportedCompression {
        /// Numeric compression code.
        code: u8,
        /// Name of the compression method.
        name: &'static str,
    },

    /// A scanline block does not hold the expected number of bytes.
    #[error("Scanline block at row {row} has {actual} bytes, expected {expected}")]
    ScanlineSizeMismatch {
        /// First row of the block.
        row: i32,
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        actual: usize,
    },

    /// Error while inflating compressed data.
    #[error("Failed to inflate compressed data. {0}")]
    InflateError(std::io::Error),

    /// The NPY version is not 1.x or 2.x.
    #[error("Unsupported NPY version {0}.{1}, only versions 1 and 2 are supported")]
    UnsupportedNpyVersion(u8, u8),

    /// Fortran ordered arrays are rejected.
    #[error("Fortran ordered NPY arrays are not supported, save the array in C order")]
    FortranOrderUnsupported,

    /// The NPY dtype descriptor is not supported.
    #[error("Unsupported NPY dtype '{0}'")]
    UnsupportedDtype(String),

    /// The array shape cannot be interpreted.
    #[error("Invalid array shape {0:?}: {1}")]
    InvalidShape(Vec<usize>, &'static str),

    /// The NPZ archive has no `.npy` entry.
    #[error("No .npy array found in the NPZ archive")]
    NpzArrayNotFound,

    /// The EXR file has no channel that looks like depth.
    #[error("No depth channel found in the EXR file, channels: {0:?}")]
    DepthChannelNotFound(Vec<String>),

    /// A structurally valid input that is deliberately not implemented.
    #[error("{variant} is not supported, {suggestion}")]
    Unsupported {
        /// The unsupported variant.
        variant: &'static str,
        /// What to use instead.
        suggestion: &'static str,
    },

    /// A companion image does not match the depth image.
    #[error("Image size {actual:?} does not match the depth image size {expected:?}")]
    DimensionMismatch {
        /// Size of the depth image as `[width, height]`.
        expected: [u32; 2],
        /// Size of the companion image.
        actual: [u32; 2],
    },

    /// No registered decoder accepts the file.
    #[error("No depth decoder accepts {0}")]
    UnsupportedFormat(String),

    /// Error to create the image.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] pointscope_image::ImageError),

    /// Error to decode the TIFF image.
    #[error("Error with Tiff decoding. {0}")]
    TiffDecodingError(#[from] tiff::TiffError),

    /// Error to decode the PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(#[from] png::DecodingError),

    /// Error to read the NPZ archive.
    #[error("Failed to read the zip archive. {0}")]
    ZipError(#[from] zip::result::ZipError),
}

impl IoError {
    /// Whether the error means the file holds no depth data the decoder
    /// recognizes, so another decoder may be tried.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IoError::DepthChannelNotFound(_) | IoError::NpzArrayNotFound
        )
    }
}
