use nalgebra::RealField;

use crate::{
    error::RegistrationError,
    pointcloud::{point_to_vector3, Point},
};

/// Scale parameter `sigma` of the Welsch function.
///
/// `Unset` falls back to uniform weights, i.e. ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RobustScale<T> {
    /// Every correspondence gets the same weight.
    Unset,
    /// Residuals are weighted by `exp(-d² / (2·sigma²))`.
    Value(T),
}

impl<T> Default for RobustScale<T> {
    fn default() -> Self {
        RobustScale::Unset
    }
}

impl<T: RealField + Copy> RobustScale<T> {
    /// Create a scale from a sigma value, checking that it is positive and finite.
    pub fn new(sigma: T) -> Result<Self, RegistrationError> {
        let scale = RobustScale::Value(sigma);
        scale.validate()?;
        Ok(scale)
    }

    /// Check that the scale describes a valid Welsch function.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        match self {
            RobustScale::Unset => Ok(()),
            RobustScale::Value(sigma) if sigma.is_finite() && *sigma > T::zero() => Ok(()),
            RobustScale::Value(sigma) => Err(RegistrationError::InvalidParameter(format!(
                "sigma must be positive and finite, got {:?}",
                sigma
            ))),
        }
    }

    /// Weight of a squared residual under this scale.
    #[inline]
    pub fn weight(&self, squared_distance: T) -> T {
        match self {
            RobustScale::Unset => T::one(),
            RobustScale::Value(sigma) => welsch_weight(squared_distance, *sigma),
        }
    }
}

/// Welsch weight `exp(-d² / (2·sigma²))` of a squared residual `d²`.
///
/// PRECONDITION: sigma is positive.
#[inline]
pub fn welsch_weight<T: RealField + Copy>(squared_distance: T, sigma: T) -> T {
    let two = T::one() + T::one();
    (-squared_distance / (two * sigma * sigma)).exp()
}

/// Compute the weight of each point pair from its residual distance.
///
/// The residual is the euclidean distance between the source point and its target
/// point as given, no transformation is applied before. When `is_dense` is false,
/// pairs with a non finite point get a zero weight.
///
/// # Arguments
///
/// * `pairs` - The (source, target) point pairs.
/// * `scale` - The Welsch scale, uniform weights if unset.
/// * `is_dense` - Whether both point sets are dense.
///
/// # Returns
///
/// One weight per pair, in the same order.
pub fn compute_weights<'a, PS, PT, T>(
    pairs: impl IntoIterator<Item = (&'a PS, &'a PT)>,
    scale: &RobustScale<T>,
    is_dense: bool,
) -> Result<Vec<T>, RegistrationError>
where
    PS: Point + 'a,
    PT: Point + 'a,
    T: RealField + Copy,
{
    scale.validate()?;

    let weights = pairs
        .into_iter()
        .map(|(p_src, p_tgt)| {
            if !is_dense && !(p_src.is_finite() && p_tgt.is_finite()) {
                return T::zero();
            }
            let residual = point_to_vector3::<T, _>(p_src) - point_to_vector3::<T, _>(p_tgt);
            scale.weight(residual.norm_squared())
        })
        .collect();

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_welsch_weight() {
        assert_eq!(welsch_weight(0.0f64, 1.0), 1.0);
        assert_relative_eq!(welsch_weight(1.0f64, 1.0), (-0.5f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(welsch_weight(4.0f64, 2.0), (-0.5f64).exp(), epsilon = 1e-12);
        // large residuals are attenuated but never negative
        let w = welsch_weight(100.0f32, 0.5);
        assert!((0.0..1e-6).contains(&w));
    }

    #[test]
    fn test_robust_scale_validation() {
        assert!(RobustScale::<f64>::Unset.validate().is_ok());
        assert!(RobustScale::new(0.1f64).is_ok());
        assert!(matches!(
            RobustScale::new(0.0f64),
            Err(RegistrationError::InvalidParameter(_))
        ));
        assert!(matches!(
            RobustScale::new(-1.0f32),
            Err(RegistrationError::InvalidParameter(_))
        ));
        assert!(matches!(
            RobustScale::new(f64::NAN),
            Err(RegistrationError::InvalidParameter(_))
        ));
        assert_eq!(RobustScale::<f32>::default(), RobustScale::Unset);
    }

    #[test]
    fn test_compute_weights_unset() -> Result<(), RegistrationError> {
        let src = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let tgt = [[0.0, 0.0, 5.0], [1.0, 0.0, 0.0]];
        let weights = compute_weights(src.iter().zip(tgt.iter()), &RobustScale::<f64>::Unset, true)?;
        assert_eq!(weights, vec![1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_compute_weights_welsch() -> Result<(), RegistrationError> {
        let src = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let tgt = [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [3.0, 0.0, 4.0]];
        let scale = RobustScale::new(1.0f64)?;
        let weights = compute_weights(src.iter().zip(tgt.iter()), &scale, true)?;
        assert_eq!(weights.len(), 3);
        assert_relative_eq!(weights[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(weights[1], (-0.5f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(weights[2], (-12.5f64).exp(), epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_compute_weights_not_dense() -> Result<(), RegistrationError> {
        let src = [[0.0f32, 0.0, 0.0], [f32::NAN, 0.0, 0.0]];
        let tgt = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let weights = compute_weights(src.iter().zip(tgt.iter()), &RobustScale::<f32>::Unset, false)?;
        assert_eq!(weights, vec![1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_compute_weights_invalid_sigma() {
        let src = [[0.0, 0.0, 0.0]];
        let tgt = [[0.0, 0.0, 0.0]];
        let res = compute_weights(src.iter().zip(tgt.iter()), &RobustScale::Value(0.0f64), true);
        assert!(matches!(res, Err(RegistrationError::InvalidParameter(_))));
    }
}
