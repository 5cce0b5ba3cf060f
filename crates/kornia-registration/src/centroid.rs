use nalgebra::{Matrix3xX, RealField, Vector3, Vector4};

use crate::pointcloud::{point_to_vector3, Point};

/// Compute the weighted 3D centroid of a set of points.
///
/// Points with a zero weight, and non finite points when `is_dense` is false, do not
/// contribute to the centroid.
///
/// # Arguments
///
/// * `points` - The input points.
/// * `weights` - The weight of each point, aligned by position with `points`.
///   PRECONDITION: `points` yields exactly `weights.len()` items.
/// * `is_dense` - Whether all the points are known to be finite.
/// * `centroid` - The output centroid in homogeneous coordinates. The last component is
///   set to 1 so that it can be transformed with 4x4 matrices.
///
/// # Returns
///
/// The number of points used to compute the centroid. If zero, `centroid` is left
/// unchanged and must not be used.
pub fn compute_weighted_centroid<'a, P, T>(
    points: impl IntoIterator<Item = &'a P>,
    weights: &[T],
    is_dense: bool,
    centroid: &mut Vector4<T>,
) -> usize
where
    P: Point + 'a,
    T: RealField + Copy,
{
    let mut accumulator = Vector3::<T>::zeros();
    let mut weight_sum = T::zero();
    let mut num_valid = 0;
    let mut num_points = 0;

    for (i, point) in points.into_iter().enumerate() {
        num_points = i + 1;
        let Some(&weight) = weights.get(i) else {
            break;
        };
        if weight <= T::zero() || (!is_dense && !point.is_finite()) {
            continue;
        }
        accumulator += point_to_vector3::<T, _>(point) * weight;
        weight_sum += weight;
        num_valid += 1;
    }
    debug_assert_eq!(num_points, weights.len(), "one weight per point expected");

    if num_valid == 0 || weight_sum <= T::zero() {
        return 0;
    }

    accumulator /= weight_sum;
    *centroid = Vector4::new(accumulator.x, accumulator.y, accumulator.z, T::one());

    num_valid
}

/// Subtract a centroid from a set of points.
///
/// # Arguments
///
/// * `points` - The input points.
/// * `centroid` - The centroid in homogeneous coordinates.
/// * `is_dense` - Whether all the points are known to be finite.
///
/// # Returns
///
/// A 3xN matrix with one demeaned point per column. Non finite points of a non dense
/// set are written as zero columns.
pub fn demean_points<'a, P, T>(
    points: impl IntoIterator<Item = &'a P>,
    centroid: &Vector4<T>,
    is_dense: bool,
) -> Matrix3xX<T>
where
    P: Point + 'a,
    T: RealField + Copy,
{
    let center = centroid.xyz();
    let columns = points
        .into_iter()
        .map(|point| {
            if !is_dense && !point.is_finite() {
                Vector3::zeros()
            } else {
                point_to_vector3::<T, _>(point) - center
            }
        })
        .collect::<Vec<_>>();

    if columns.is_empty() {
        return Matrix3xX::zeros(0);
    }
    Matrix3xX::from_columns(&columns)
}
