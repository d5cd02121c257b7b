//! # delaunay2d
//!
//! A two dimensional constrained Delaunay triangulation which keeps track of where every
//! output element came from.
//!
//! Input consists of points, segments that must appear in the triangulation and polygons
//! whose interior is tagged with the polygon's index. Every output vertex, edge and face
//! lists the ids of the input elements it originates from.
//!
//! # Features
//! * Exact orientation and in-circle predicates (via the `robust` crate)
//! * Merging of vertices closer than a configurable epsilon
//! * Crossing segments are split at their intersection
//! * Segments passing next to a vertex are routed through it and tiny edges are collapsed
//! * Five output modes, see [OutputMode]
//! * An incremental API ([Cdt]) and a one shot driver ([triangulate])
//!
//! # Cargo features
//! * `serde`: Serialization of inputs and results
//! * `validation`: Exhaustive invariant checks on [Dcel]
//! * `svg`: Debug rendering of a triangulation into an SVG document
//!
//! # Example
//! ```
//! use delaunay2d::{triangulate, CdtInput, OutputMode, Point2};
//!
//! # fn main() -> Result<(), delaunay2d::CdtError> {
//! let input = CdtInput::new(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(2.0, 0.0),
//!     Point2::new(2.0, 2.0),
//!     Point2::new(0.0, 2.0),
//!     Point2::new(1.0, 1.0),
//! ])
//! .with_faces(vec![vec![0, 1, 2, 3]]);
//!
//! let result = triangulate(&input, OutputMode::Full)?;
//! assert_eq!(result.num_faces(), 4);
//! assert!(result.face_original_ids.iter().all(|ids| ids == &[0]));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]

mod cdt;
mod delaunay_core;
mod error;
mod flood_fill;
mod input;
mod input_split;
mod output;
mod point;
mod triangulate;

#[cfg(feature = "svg")]
pub mod svg_dump;

#[cfg(any(test, feature = "validation"))]
mod validation;

#[cfg(test)]
mod test_utilities;

pub use cdt::{padded_frame, Cdt, FRAME_MARGIN_FACTOR};
pub use error::{CdtError, CoordinateError};
pub use input::{CdtInput, DEFAULT_EPSILON};
pub use output::{CdtResult, OutputMode};
pub use point::{CdtNum, Point2};
pub use triangulate::triangulate;

pub use delaunay_core::math::{
    validate_coordinate, validate_position, MAX_ALLOWED_VALUE, MIN_ALLOWED_VALUE,
};

pub use delaunay_core::{
    Dcel, FixedEdgeHandle, FixedFaceHandle, FixedSymEdgeHandle, FixedVertexHandle,
    HintGenerator, InputIds, LastUsedVertexHintGenerator,
    PositionInTriangulation, RandomSampleHintGenerator,
};

pub use delaunay_core::constraint::CROSSING_ITERATION_CAP;
pub use delaunay_core::insertion::FLIP_ITERATION_CAP;
pub use delaunay_core::locate::LOCATE_ITERATION_CAP;

/// Low level operations on the mesh of a [Dcel].
pub use delaunay_core::dcel_operations;
