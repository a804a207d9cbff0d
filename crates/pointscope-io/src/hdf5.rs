use crate::error::IoError;
use crate::registry::DepthRead;

/// HDF5 depth maps are recognized but not decoded.
///
/// # Errors
///
/// Always [`IoError::Unsupported`], pointing to NPY or EXR instead.
pub fn read_depth(_bytes: &[u8]) -> Result<DepthRead, IoError> {
    Err(IoError::Unsupported {
        variant: "HDF5",
        suggestion: "export the depth map as NPY or EXR",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_unsupported() {
        let err = read_depth(b"\x89HDF\r\n\x1a\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "HDF5 is not supported, export the depth map as NPY or EXR"
        );
    }
}
