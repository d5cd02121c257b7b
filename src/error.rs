use thiserror::Error;

use crate::OutputMode;

/// Reasons why a coordinate cannot be used for exact predicates.
///
/// *See [validate_coordinate](crate::validate_coordinate)*
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum CoordinateError {
    /// A coordinate value was too small.
    ///
    /// The absolute value of any coordinate must either be zero or greater
    /// than or equal to [crate::MIN_ALLOWED_VALUE].
    #[error("coordinate is too small")]
    TooSmall,
    /// A coordinate value was too large.
    ///
    /// The absolute value of any coordinate must be less than or equal to
    /// [crate::MAX_ALLOWED_VALUE].
    #[error("coordinate is too large")]
    TooLarge,
    /// A coordinate value was NaN.
    #[error("coordinate is NaN")]
    NAN,
}

/// Errors reported by [triangulate](crate::triangulate) and [Cdt](crate::Cdt).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CdtError {
    /// The input arrays are inconsistent with each other or a parameter is out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// An input vertex cannot be used for exact predicates.
    #[error("vertex {index} has an invalid coordinate")]
    InvalidCoordinate {
        /// Index of the offending input vertex.
        index: usize,
        /// What is wrong with the coordinate.
        #[source]
        source: CoordinateError,
    },
    /// A position lies outside of the padded frame of the triangulation.
    #[error("position lies outside of the triangulation frame")]
    OutsideOfFrame,
    /// A vertex handle does not refer to a vertex of this triangulation.
    #[error("vertex handle {0} is out of range")]
    InvalidVertexHandle(usize),
    /// The triangulation was already shaped for output and can no longer change.
    #[error("triangulation was already prepared for output as {0:?}")]
    OutputAlreadyPrepared(OutputMode),
}
