/// Error types for the calibration readers.
#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    /// Error reading the file.
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// The JSON document is malformed.
    #[error("Failed to parse JSON. {0}")]
    JsonError(#[from] serde_json::Error),

    /// A line could not be parsed and the format does not allow skipping it.
    #[error("Parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// A value could not be converted to a number.
    #[error("Invalid value '{value}' for key '{key}'")]
    InvalidValue {
        /// The key holding the value.
        key: String,
        /// The raw value.
        value: String,
    },

    /// A camera matrix literal is malformed.
    #[error("Invalid camera matrix for {camera}: {reason}")]
    InvalidMatrix {
        /// Name of the camera, e.g. `cam0`.
        camera: String,
        /// The violated constraint.
        reason: String,
    },

    /// A quantity that must be strictly positive is not.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Name of the quantity.
        name: String,
        /// The offending value.
        value: f64,
    },

    /// A required field is missing.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// The file holds no usable camera.
    #[error("No valid cameras found")]
    NoValidCameras,

    /// The file holds no line of valid intrinsics.
    #[error("No valid intrinsics line found, expected 'fx fy cx cy'")]
    NoValidIntrinsics,

    /// The calibration dialect could not be detected.
    #[error("Unknown calibration format for {0}")]
    UnknownFormat(String),
}
