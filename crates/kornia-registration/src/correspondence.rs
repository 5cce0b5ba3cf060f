/// An ordered list of point indices selecting a subset of a point cloud.
pub type Indices = Vec<usize>;

/// A claimed match between a point in the source and a point in the target cloud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Index of the point in the source cloud.
    pub index_query: usize,
    /// Index of the matched point in the target cloud.
    pub index_match: usize,
    /// Distance reported by the correspondence search.
    ///
    /// Informative only, the estimators recompute the residual from the points.
    pub distance: f64,
}

impl Correspondence {
    /// Create a new correspondence.
    pub fn new(index_query: usize, index_match: usize, distance: f64) -> Self {
        Self {
            index_query,
            index_match,
            distance,
        }
    }
}

/// An ordered list of correspondences. Duplicated indices are allowed.
pub type Correspondences = Vec<Correspondence>;
