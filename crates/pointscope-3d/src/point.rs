/// A projected 3D point with an optional color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    /// X coordinate in meters.
    pub x: f32,
    /// Y coordinate in meters.
    pub y: f32,
    /// Z coordinate in meters.
    pub z: f32,
    /// RGB color of the point.
    pub color: Option<[u8; 3]>,
}

impl Point3 {
    /// Create an uncolored point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            color: None,
        }
    }

    /// Return the point tinted with `color`.
    pub fn with_color(self, color: [u8; 3]) -> Self {
        Self {
            color: Some(color),
            ..self
        }
    }

    /// The coordinates as an array.
    #[inline]
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}
