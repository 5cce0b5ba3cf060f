use nalgebra::{Point3, RealField, Vector3};

/// Minimal access to the coordinates of a 3D point.
///
/// Coordinates are read as `f64` and converted to the precision of the estimator.
pub trait Point {
    /// The x coordinate.
    fn x(&self) -> f64;
    /// The y coordinate.
    fn y(&self) -> f64;
    /// The z coordinate.
    fn z(&self) -> f64;

    /// Check that all the coordinates are finite, i.e. not a sensor dropout.
    #[inline]
    fn is_finite(&self) -> bool {
        self.x().is_finite() && self.y().is_finite() && self.z().is_finite()
    }
}

impl Point for [f64; 3] {
    #[inline]
    fn x(&self) -> f64 {
        self[0]
    }
    #[inline]
    fn y(&self) -> f64 {
        self[1]
    }
    #[inline]
    fn z(&self) -> f64 {
        self[2]
    }
}

impl Point for [f32; 3] {
    #[inline]
    fn x(&self) -> f64 {
        self[0] as f64
    }
    #[inline]
    fn y(&self) -> f64 {
        self[1] as f64
    }
    #[inline]
    fn z(&self) -> f64 {
        self[2] as f64
    }
}

impl Point for Point3<f64> {
    #[inline]
    fn x(&self) -> f64 {
        self.x
    }
    #[inline]
    fn y(&self) -> f64 {
        self.y
    }
    #[inline]
    fn z(&self) -> f64 {
        self.z
    }
}

impl Point for Point3<f32> {
    #[inline]
    fn x(&self) -> f64 {
        self.x as f64
    }
    #[inline]
    fn y(&self) -> f64 {
        self.y as f64
    }
    #[inline]
    fn z(&self) -> f64 {
        self.z as f64
    }
}

/// Convert a point into a column vector of the estimator precision.
#[inline]
pub(crate) fn point_to_vector3<T: RealField + Copy, P: Point>(point: &P) -> Vector3<T> {
    Vector3::new(
        nalgebra::convert(point.x()),
        nalgebra::convert(point.y()),
        nalgebra::convert(point.z()),
    )
}

/// An ordered set of 3D points.
///
/// A dense point cloud guarantees that every point is finite, so the estimators
/// skip the per point validity checks.
#[derive(Debug, Clone)]
pub struct PointCloud<P> {
    // The points in the point cloud.
    points: Vec<P>,
    // Whether all the points are finite.
    is_dense: bool,
}

impl<P: Point> PointCloud<P> {
    /// Create a new point cloud, marking it dense if all the points are finite.
    pub fn new(points: Vec<P>) -> Self {
        let is_dense = points.iter().all(Point::is_finite);
        Self { points, is_dense }
    }

    /// Create a new point cloud declared dense without checking the points.
    ///
    /// PRECONDITION: all the points are finite.
    pub fn new_dense(points: Vec<P>) -> Self {
        Self {
            points,
            is_dense: true,
        }
    }

    /// Override the dense flag of the point cloud.
    pub fn with_dense(mut self, is_dense: bool) -> Self {
        self.is_dense = is_dense;
        self
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

    /// Whether the point cloud is declared to contain only finite points.
    #[inline]
    pub fn is_dense(&self) -> bool {
        self.is_dense
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[P] {
        &self.points
    }

    /// Get a point by index.
    pub fn get(&self, index: usize) -> Option<&P> {
        self.points.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);

        assert_eq!(pointcloud.len(), 2);
        assert!(!pointcloud.is_empty());
        assert!(pointcloud.is_dense());

        if let Some(p1) = pointcloud.get(1) {
            assert_eq!(p1.x(), 1.0);
            assert_eq!(p1.y(), 0.0);
            assert_eq!(p1.z(), 0.0);
        }
        assert!(pointcloud.get(2).is_none());
    }

    #[test]
    fn test_pointcloud_not_dense() {
        let pointcloud = PointCloud::new(vec![[0.0f32, 0.0, 0.0], [f32::NAN, 1.0, 0.0]]);
        assert!(!pointcloud.is_dense());
        assert!(!pointcloud.points()[1].is_finite());

        let pointcloud = pointcloud.with_dense(true);
        assert!(pointcloud.is_dense());
    }

    #[test]
    fn test_point_to_vector3() {
        let p = Point3::new(1.0f32, 2.0, 3.0);
        let v: Vector3<f64> = point_to_vector3(&p);
        assert_eq!(v, Vector3::new(1.0, 2.0, 3.0));
        assert!(!Point::is_finite(&Point3::new(0.0, f64::INFINITY, 0.0)));
    }
}
