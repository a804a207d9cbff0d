use crate::point::Point3;
use crate::vertex::DecodedVertices;

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f32; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f32; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f32; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f32; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Collect projected points. Colors are kept only when every point has one.
    pub fn from_points(points: &[Point3]) -> Self {
        let colors = points.iter().map(|p| p.color).collect::<Option<Vec<_>>>();
        Self {
            points: points.iter().map(Point3::position).collect(),
            colors: colors.filter(|c| !c.is_empty()),
            normals: None,
        }
    }

    /// Build a point cloud from decoded vertex attributes.
    ///
    /// Normalized colors are scaled back to `0..=255`.
    pub fn from_vertices(vertices: &DecodedVertices) -> Self {
        let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            points: triples(&vertices.positions),
            colors: vertices.colors.as_ref().map(|colors| {
                colors
                    .chunks_exact(3)
                    .map(|c| [to_u8(c[0]), to_u8(c[1]), to_u8(c[2])])
                    .collect()
            }),
            normals: vertices.normals.as_deref().map(triples),
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    fn fold_points(&self, f: impl Fn(f32, f32) -> f32) -> [f32; 3] {
        let Some(first) = self.points.first() else {
            return [0.0; 3];
        };
        self.points.iter().fold(*first, |acc, p| {
            [f(acc[0], p[0]), f(acc[1], p[1]), f(acc[2], p[2])]
        })
    }

    /// Get the minimum bound of the point cloud, zero when empty.
    pub fn get_min_bound(&self) -> [f32; 3] {
        self.fold_points(f32::min)
    }

    /// Get the maximum bound of the point cloud, zero when empty.
    pub fn get_max_bound(&self) -> [f32; 3] {
        self.fold_points(f32::max)
    }
}

impl From<Vec<Point3>> for PointCloud {
    fn from(points: Vec<Point3>) -> Self {
        Self::from_points(&points)
    }
}

fn triples(values: &[f32]) -> Vec<[f32; 3]> {
    values
        .chunks_exact(3)
        .map(|v| [v[0], v[1], v[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(
            vec![[0.0, 0.0, 0.0], [1.0, -2.0, 3.0]],
            Some(vec![[255, 0, 0], [0, 255, 0]]),
            Some(vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]),
        );

        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.colors().map(|c| c.len()), Some(2));
        assert_eq!(pointcloud.normals().map(|n| n.len()), Some(2));
        assert_eq!(pointcloud.get_min_bound(), [0.0, -2.0, 0.0]);
        assert_eq!(pointcloud.get_max_bound(), [1.0, 0.0, 3.0]);
    }

    #[test]
    fn empty_bounds() {
        let pointcloud = PointCloud::default();
        assert!(pointcloud.is_empty());
        assert_eq!(pointcloud.get_min_bound(), [0.0; 3]);
    }

    #[test]
    fn colors_need_every_point() {
        let colored = vec![
            Point3::new(0.0, 0.0, 1.0).with_color([1, 2, 3]),
            Point3::new(1.0, 0.0, 1.0).with_color([4, 5, 6]),
        ];
        let pointcloud = PointCloud::from(colored);
        assert_eq!(pointcloud.colors(), Some(&[[1, 2, 3], [4, 5, 6]][..]));

        let mixed = [Point3::new(0.0, 0.0, 1.0).with_color([1, 2, 3]), Point3::new(1.0, 0.0, 1.0)];
        assert_eq!(PointCloud::from_points(&mixed).colors(), None);
    }

    #[test]
    fn from_vertices() {
        let vertices = DecodedVertices {
            positions: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            colors: Some(vec![1.0, 0.0, 0.5, 0.0, 1.0, 0.0]),
            normals: None,
        };
        let pointcloud = PointCloud::from_vertices(&vertices);
        assert_eq!(pointcloud.points(), &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(pointcloud.colors(), Some(&[[255, 0, 128], [0, 255, 0]][..]));
        assert!(pointcloud.normals().is_none());
    }
}
