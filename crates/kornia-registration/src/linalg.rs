use nalgebra::{Matrix4, RealField};

use crate::{
    error::RegistrationError,
    pointcloud::{point_to_vector3, Point},
};

/// Transform a set of points using a 4x4 rigid transformation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_t_src` - The homogeneous transformation from the source to the destination frame.
/// * `dst_points` - A pre-allocated slice to store the transformed points.
///
/// PRECONDITION: dst_points is a pre-allocated slice of the same size as source.
///
/// Example:
///
/// ```
/// use kornia_registration::linalg::transform_points;
/// use nalgebra::Matrix4;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let dst_t_src = Matrix4::<f64>::new_translation(&nalgebra::Vector3::new(1.0, 0.0, 0.0));
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points(&src_points, &dst_t_src, &mut dst_points).unwrap();
/// assert_eq!(dst_points[0], [3.0, 2.0, 2.0]);
/// ```
pub fn transform_points<P: Point, T: RealField + Copy>(
    src_points: &[P],
    dst_t_src: &Matrix4<T>,
    dst_points: &mut [[T; 3]],
) -> Result<(), RegistrationError> {
    if src_points.len() != dst_points.len() {
        return Err(RegistrationError::SizeMismatch(
            src_points.len(),
            dst_points.len(),
        ));
    }

    let dst_r_src = dst_t_src.fixed_view::<3, 3>(0, 0);
    let dst_t_src = dst_t_src.fixed_view::<3, 1>(0, 3);

    for (point_dst, point_src) in dst_points.iter_mut().zip(src_points.iter()) {
        let p = dst_r_src * point_to_vector3::<T, _>(point_src) + dst_t_src;
        *point_dst = [p.x, p.y, p.z];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};

    #[test]
    fn test_transform_points_identity() -> Result<(), RegistrationError> {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points(&src_points, &Matrix4::<f64>::identity(), &mut dst_points)?;

        assert_eq!(dst_points, src_points);
        Ok(())
    }

    #[test]
    fn test_transform_points_roundtrip() -> Result<(), RegistrationError> {
        let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
        let rotation = Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0);
        let translation = Vector3::new(1.0, 2.0, 3.0);
        let dst_t_src = crate::estimation::compose_rigid_transform(&rotation, &translation);

        let mut dst_points = vec![[0.0; 3]; src_points.len()];
        transform_points(&src_points, &dst_t_src, &mut dst_points)?;
        assert_eq!(dst_points[0], [3.0, 0.0, 5.0]);

        // invert the transformation
        let src_t_dst = crate::estimation::compose_rigid_transform(
            &rotation.transpose(),
            &(-rotation.transpose() * translation),
        );
        let mut dst_points_src = vec![[0.0; 3]; dst_points.len()];
        transform_points(&dst_points, &src_t_dst, &mut dst_points_src)?;

        for (res, exp) in dst_points_src.iter().zip(src_points.iter()) {
            for (r, e) in res.iter().zip(exp.iter()) {
                assert_relative_eq!(r, e, epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_transform_points_size_mismatch() {
        let src_points = vec![[0.0f32, 0.0, 0.0]];
        let mut dst_points = vec![[0.0f32; 3]; 2];
        let res = transform_points(&src_points, &Matrix4::identity(), &mut dst_points);
        assert_eq!(res, Err(RegistrationError::SizeMismatch(1, 2)));
    }
}
