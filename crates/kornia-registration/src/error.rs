/// An error type for the rigid transformation estimation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegistrationError {
    /// The robust scale is zero, negative or not finite.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The lengths of the point clouds, index lists or weights do not agree.
    #[error("Size mismatch: expected {0} elements, got {1}")]
    SizeMismatch(usize, usize),

    /// An index list or a correspondence refers past the end of a point cloud.
    #[error("Index {0} is out of bounds for a point cloud with {1} points")]
    IndexOutOfBounds(usize, usize),

    /// Not enough valid data to determine a unique rigid transformation.
    #[error("Degenerate input: {0}")]
    DegenerateInput(&'static str),

    /// The singular value decomposition failed.
    #[error("Numeric failure: {0}")]
    NumericFailure(&'static str),
}
