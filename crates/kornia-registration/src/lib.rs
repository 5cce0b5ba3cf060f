#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Weighted centroids and demeaning of point sets.
pub mod centroid;

/// Point correspondences and index lists.
pub mod correspondence;

mod error;
pub use error::RegistrationError;

/// Rigid transformation estimators.
pub mod estimation;

/// Linear algebra utilities.
pub mod linalg;

/// Point types and point clouds.
pub mod pointcloud;

/// Robust weighting of point correspondences with the Welsch function.
pub mod weights;

pub use correspondence::{Correspondence, Correspondences, Indices};
pub use estimation::{RobustPointToPoint, TransformFromCorrelation, WeightedSvd};
pub use pointcloud::{Point, PointCloud};
pub use weights::RobustScale;
