use crate::error::ImageError;

/// A single channel depth image stored row-major as `f32`.
///
/// Samples that are `<= 0`, NaN or infinite carry no depth. Use
/// [`DepthImage::is_valid_sample`] to test them uniformly.
///
/// # Examples
///
/// ```
/// use pointscope_image::DepthImage;
///
/// let image = DepthImage::new(2, 1, vec![1.0, f32::NAN]).unwrap();
///
/// assert_eq!(image.width(), 2);
/// assert_eq!(image.height(), 1);
/// assert_eq!(image.num_valid(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthImage {
    /// Create a new depth image from row-major samples.
    ///
    /// # Errors
    ///
    /// If the length of `data` is not `width * height`, an error is returned.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(ImageError::InvalidDataLength(data.len(), expected));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width of the image in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the image in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels in the image.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    /// The row-major samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the image and return its samples.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Get the sample at column `x` and row `y`.
    pub fn get(&self, x: usize, y: usize) -> Result<f32, ImageError> {
        if x >= self.width as usize || y >= self.height as usize {
            return Err(ImageError::PixelOutOfBounds(x, y));
        }
        Ok(self.data[y * self.width as usize + x])
    }

    /// Whether a raw sample carries depth.
    #[inline]
    pub fn is_valid_sample(value: f32) -> bool {
        value.is_finite() && value > 0.0
    }

    /// Count the samples that carry depth.
    pub fn num_valid(&self) -> usize {
        self.data
            .iter()
            .filter(|&&v| Self::is_valid_sample(v))
            .count()
    }

    /// Iterate over `(x, y, value)` for every pixel.
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        let width = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % width, i / width, v))
    }
}
