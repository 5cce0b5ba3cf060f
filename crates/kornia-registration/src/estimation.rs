use nalgebra::{Matrix3, Matrix3xX, Matrix4, RealField, Vector3, Vector4, SVD};

use crate::{
    centroid::{compute_weighted_centroid, demean_points},
    correspondence::Correspondence,
    error::RegistrationError,
    pointcloud::{Point, PointCloud},
    weights::{compute_weights, RobustScale},
};

/// Obtain a rigid transformation from demeaned and weighted point pairs.
///
/// This is the last step of the estimation and can be replaced to change how the
/// rotation and translation are computed from the correlation of the two point sets.
/// Closures with the same signature as [`TransformFromCorrelation::transform_from_correlation`]
/// implement this trait.
pub trait TransformFromCorrelation<T: RealField + Copy> {
    /// Compute the 4x4 transformation that maps the source onto the target.
    ///
    /// # Arguments
    ///
    /// * `src_demean` - The source points minus their centroid, one point per column.
    /// * `centroid_src` - The weighted source centroid in homogeneous coordinates.
    /// * `tgt_demean` - The target points minus their centroid, one point per column.
    /// * `centroid_tgt` - The weighted target centroid in homogeneous coordinates.
    /// * `weights` - The weight of each column.
    fn transform_from_correlation(
        &self,
        src_demean: &Matrix3xX<T>,
        centroid_src: &Vector4<T>,
        tgt_demean: &Matrix3xX<T>,
        centroid_tgt: &Vector4<T>,
        weights: &[T],
    ) -> Result<Matrix4<T>, RegistrationError>;
}

impl<T, F> TransformFromCorrelation<T> for F
where
    T: RealField + Copy,
    F: Fn(
        &Matrix3xX<T>,
        &Vector4<T>,
        &Matrix3xX<T>,
        &Vector4<T>,
        &[T],
    ) -> Result<Matrix4<T>, RegistrationError>,
{
    fn transform_from_correlation(
        &self,
        src_demean: &Matrix3xX<T>,
        centroid_src: &Vector4<T>,
        tgt_demean: &Matrix3xX<T>,
        centroid_tgt: &Vector4<T>,
        weights: &[T],
    ) -> Result<Matrix4<T>, RegistrationError> {
        self(src_demean, centroid_src, tgt_demean, centroid_tgt, weights)
    }
}

/// Assemble a 4x4 homogeneous matrix `[R t; 0 0 0 1]`.
pub fn compose_rigid_transform<T: RealField + Copy>(
    rotation: &Matrix3<T>,
    translation: &Vector3<T>,
) -> Matrix4<T> {
    let mut transformation = Matrix4::identity();
    transformation
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(rotation);
    transformation
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(translation);
    transformation
}

/// Weighted Kabsch/Umeyama solver based on the SVD of the cross-covariance matrix.
///
/// For more details, see: Arun, K., Huang, T. S., and Blostein, S. D.
/// "Least-squares fitting of two 3-D point sets." IEEE PAMI, 1987.
#[derive(Debug, Clone, Copy)]
pub struct WeightedSvd {
    /// Maximum number of iterations of the SVD before reporting a failure.
    pub max_iterations: usize,
}

impl Default for WeightedSvd {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

impl<T: RealField + Copy> TransformFromCorrelation<T> for WeightedSvd {
    /// The algorithm:
    /// 1. Compute the weighted cross-covariance H = Σ wᵢ · srcᵢ · tgtᵢᵀ
    /// 2. Compute the SVD of H = U * S * Vᵀ
    /// 3. Calculate the rotation R = V * diag(1, 1, det(V * Uᵀ)) * Uᵀ
    /// 4. Calculate the translation t = c_tgt - R * c_src
    fn transform_from_correlation(
        &self,
        src_demean: &Matrix3xX<T>,
        centroid_src: &Vector4<T>,
        tgt_demean: &Matrix3xX<T>,
        centroid_tgt: &Vector4<T>,
        weights: &[T],
    ) -> Result<Matrix4<T>, RegistrationError> {
        if src_demean.ncols() != tgt_demean.ncols() {
            return Err(RegistrationError::SizeMismatch(
                src_demean.ncols(),
                tgt_demean.ncols(),
            ));
        }
        if src_demean.ncols() != weights.len() {
            return Err(RegistrationError::SizeMismatch(
                src_demean.ncols(),
                weights.len(),
            ));
        }

        let mut h = Matrix3::<T>::zeros();
        for ((src, tgt), &weight) in src_demean
            .column_iter()
            .zip(tgt_demean.column_iter())
            .zip(weights.iter())
        {
            h += (src * weight) * tgt.transpose();
        }

        let svd = SVD::try_new(h, true, true, T::default_epsilon(), self.max_iterations)
            .ok_or(RegistrationError::NumericFailure("SVD did not converge"))?;

        let sv = svd.singular_values;
        if !(sv[0].is_finite() && sv[1].is_finite() && sv[2].is_finite()) {
            return Err(RegistrationError::NumericFailure(
                "covariance matrix has non finite singular values",
            ));
        }

        // a unique rotation needs at least two non vanishing singular values
        let mut sorted = [sv[0], sv[1], sv[2]];
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let tolerance =
            sorted[0] * T::default_epsilon() * nalgebra::convert::<f64, T>(weights.len() as f64);
        if sorted[0] <= T::zero() || sorted[1] <= tolerance {
            return Err(RegistrationError::DegenerateInput(
                "covariance matrix has insufficient rank",
            ));
        }
        log::debug!("singular values: {:?}", sorted);

        let u = svd
            .u
            .ok_or(RegistrationError::NumericFailure("failed to compute U in SVD"))?;
        let v = svd
            .v_t
            .ok_or(RegistrationError::NumericFailure("failed to compute Vᵀ in SVD"))?
            .transpose();

        // flip the last axis if V * Uᵀ is a reflection
        let d = if (v * u.transpose()).determinant() < T::zero() {
            -T::one()
        } else {
            T::one()
        };
        let correction = Matrix3::from_diagonal(&Vector3::new(T::one(), T::one(), d));
        let rotation = v * correction * u.transpose();

        let translation = centroid_tgt.xyz() - rotation * centroid_src.xyz();

        Ok(compose_rigid_transform(&rotation, &translation))
    }
}

/// Robust point to point rigid transformation estimation.
///
/// Estimates the rotation and translation aligning pairs of source and target points
/// by minimizing the Welsch function of the residuals instead of their squared norm.
/// Each estimation computes one weight per pair from the current residual and the
/// scale `sigma`, then solves the weighted least squares problem in closed form.
/// With `sigma` unset, all the pairs have the same weight and the estimation is the
/// ordinary least squares solution.
///
/// For additional details, see "Fast and Robust Iterative Closest Point",
/// Juyong Zhang, Yuxin Yao, Bailin Deng, 2022.
///
/// Example:
///
/// ```
/// use kornia_registration::{PointCloud, RobustPointToPoint};
///
/// let src = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
/// let tgt = PointCloud::new(vec![[2.0, 0.0, 0.0], [2.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
///
/// let estimator = RobustPointToPoint::<f64>::new();
/// let dst_t_src = estimator.estimate(&src, &tgt).unwrap();
/// assert!((dst_t_src[(0, 3)] - 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct RobustPointToPoint<T: RealField + Copy = f32, S = WeightedSvd> {
    sigma: RobustScale<T>,
    strategy: S,
}

impl<T: RealField + Copy> RobustPointToPoint<T, WeightedSvd> {
    /// Create a new estimator with `sigma` unset and the weighted SVD solver.
    pub fn new() -> Self {
        Self {
            sigma: RobustScale::Unset,
            strategy: WeightedSvd::default(),
        }
    }
}

impl<T: RealField + Copy> Default for RobustPointToPoint<T, WeightedSvd> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> RobustPointToPoint<T, S>
where
    T: RealField + Copy,
    S: TransformFromCorrelation<T>,
{
    /// Replace the strategy used to obtain the transformation from the correlation.
    pub fn with_strategy<S2: TransformFromCorrelation<T>>(
        self,
        strategy: S2,
    ) -> RobustPointToPoint<T, S2> {
        RobustPointToPoint {
            sigma: self.sigma,
            strategy,
        }
    }

    /// Set the scale of the Welsch function, consuming the estimator.
    pub fn with_sigma(mut self, sigma: T) -> Result<Self, RegistrationError> {
        self.set_sigma(sigma)?;
        Ok(self)
    }

    /// Set the scale of the Welsch function.
    ///
    /// Fails with [`RegistrationError::InvalidParameter`] if `sigma` is not positive and
    /// finite, in which case the previous value is kept.
    pub fn set_sigma(&mut self, sigma: T) -> Result<(), RegistrationError> {
        self.sigma = RobustScale::new(sigma)?;
        Ok(())
    }

    /// Go back to uniform weights.
    pub fn unset_sigma(&mut self) {
        self.sigma = RobustScale::Unset;
    }

    /// Get the scale of the Welsch function.
    pub fn sigma(&self) -> RobustScale<T> {
        self.sigma
    }

    /// Get as reference the strategy used to assemble the transformation.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Estimate the rigid transformation between two point clouds paired by position.
    ///
    /// # Arguments
    ///
    /// * `cloud_src` - The source point cloud.
    /// * `cloud_tgt` - The target point cloud, with the same number of points.
    ///
    /// # Returns
    ///
    /// The 4x4 transformation from the source to the target frame.
    pub fn estimate<PS: Point, PT: Point>(
        &self,
        cloud_src: &PointCloud<PS>,
        cloud_tgt: &PointCloud<PT>,
    ) -> Result<Matrix4<T>, RegistrationError> {
        self.sigma.validate()?;
        if cloud_src.len() != cloud_tgt.len() {
            return Err(RegistrationError::SizeMismatch(
                cloud_src.len(),
                cloud_tgt.len(),
            ));
        }

        let source = cloud_src.points().iter().collect::<Vec<_>>();
        let target = cloud_tgt.points().iter().collect::<Vec<_>>();

        self.estimate_pairs(&source, cloud_src.is_dense(), &target, cloud_tgt.is_dense())
    }

    /// Estimate the rigid transformation between a subset of the source cloud and the
    /// target cloud, paired by position.
    ///
    /// # Arguments
    ///
    /// * `cloud_src` - The source point cloud.
    /// * `indices_src` - The indices of the source points of interest.
    /// * `cloud_tgt` - The target point cloud, with as many points as `indices_src`.
    pub fn estimate_with_source_indices<PS: Point, PT: Point>(
        &self,
        cloud_src: &PointCloud<PS>,
        indices_src: &[usize],
        cloud_tgt: &PointCloud<PT>,
    ) -> Result<Matrix4<T>, RegistrationError> {
        self.sigma.validate()?;
        if indices_src.len() != cloud_tgt.len() {
            return Err(RegistrationError::SizeMismatch(
                indices_src.len(),
                cloud_tgt.len(),
            ));
        }

        let source = select_points(cloud_src, indices_src)?;
        let target = cloud_tgt.points().iter().collect::<Vec<_>>();

        self.estimate_pairs(&source, cloud_src.is_dense(), &target, cloud_tgt.is_dense())
    }

    /// Estimate the rigid transformation between subsets of the source and target
    /// clouds, paired by position in the index lists.
    ///
    /// # Arguments
    ///
    /// * `cloud_src` - The source point cloud.
    /// * `indices_src` - The indices of the source points of interest.
    /// * `cloud_tgt` - The target point cloud.
    /// * `indices_tgt` - The indices of the target points matching `indices_src`.
    pub fn estimate_with_indices<PS: Point, PT: Point>(
        &self,
        cloud_src: &PointCloud<PS>,
        indices_src: &[usize],
        cloud_tgt: &PointCloud<PT>,
        indices_tgt: &[usize],
    ) -> Result<Matrix4<T>, RegistrationError> {
        self.sigma.validate()?;
        if indices_src.len() != indices_tgt.len() {
            return Err(RegistrationError::SizeMismatch(
                indices_src.len(),
                indices_tgt.len(),
            ));
        }

        let source = select_points(cloud_src, indices_src)?;
        let target = select_points(cloud_tgt, indices_tgt)?;

        self.estimate_pairs(&source, cloud_src.is_dense(), &target, cloud_tgt.is_dense())
    }

    /// Estimate the rigid transformation from an explicit list of correspondences.
    ///
    /// # Arguments
    ///
    /// * `cloud_src` - The source point cloud.
    /// * `cloud_tgt` - The target point cloud, its size may differ from the source.
    /// * `correspondences` - The pairs of source and target indices.
    pub fn estimate_with_correspondences<PS: Point, PT: Point>(
        &self,
        cloud_src: &PointCloud<PS>,
        cloud_tgt: &PointCloud<PT>,
        correspondences: &[Correspondence],
    ) -> Result<Matrix4<T>, RegistrationError> {
        self.sigma.validate()?;

        let mut source = Vec::with_capacity(correspondences.len());
        let mut target = Vec::with_capacity(correspondences.len());
        for c in correspondences {
            source.push(select_point(cloud_src, c.index_query)?);
            target.push(select_point(cloud_tgt, c.index_match)?);
        }

        self.estimate_pairs(&source, cloud_src.is_dense(), &target, cloud_tgt.is_dense())
    }

    // shared pipeline: weights, centroids, demeaning and the final assembly
    fn estimate_pairs<PS: Point, PT: Point>(
        &self,
        source: &[&PS],
        src_is_dense: bool,
        target: &[&PT],
        tgt_is_dense: bool,
    ) -> Result<Matrix4<T>, RegistrationError> {
        debug_assert_eq!(source.len(), target.len());
        log::debug!(
            "Estimating rigid transformation from {} pairs with sigma {:?}",
            source.len(),
            self.sigma
        );

        let weights = compute_weights(
            source.iter().copied().zip(target.iter().copied()),
            &self.sigma,
            src_is_dense && tgt_is_dense,
        )?;

        let mut centroid_src = Vector4::<T>::zeros();
        let mut centroid_tgt = Vector4::<T>::zeros();
        let num_valid_src = compute_weighted_centroid(
            source.iter().copied(),
            &weights,
            src_is_dense,
            &mut centroid_src,
        );
        let num_valid_tgt = compute_weighted_centroid(
            target.iter().copied(),
            &weights,
            tgt_is_dense,
            &mut centroid_tgt,
        );
        log::debug!("Num valid points: {}-{}", num_valid_src, num_valid_tgt);

        if num_valid_src == 0 || num_valid_tgt == 0 {
            log::warn!("No valid weighted points to estimate the transformation");
            return Err(RegistrationError::DegenerateInput(
                "no valid weighted points to compute the centroid",
            ));
        }

        let src_demean = demean_points(source.iter().copied(), &centroid_src, src_is_dense);
        let tgt_demean = demean_points(target.iter().copied(), &centroid_tgt, tgt_is_dense);

        self.strategy
            .transform_from_correlation(
                &src_demean,
                &centroid_src,
                &tgt_demean,
                &centroid_tgt,
                &weights,
            )
            .inspect_err(|e| log::warn!("Failed to estimate the transformation: {}", e))
    }
}

fn select_point<P>(cloud: &PointCloud<P>, index: usize) -> Result<&P, RegistrationError>
where
    P: Point,
{
    cloud
        .get(index)
        .ok_or(RegistrationError::IndexOutOfBounds(index, cloud.len()))
}

fn select_points<'a, P: Point>(
    cloud: &'a PointCloud<P>,
    indices: &[usize],
) -> Result<Vec<&'a P>, RegistrationError> {
    indices.iter().map(|&i| select_point(cloud, i)).collect()
}
