#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delaunay_core::hint_generator::DEFAULT_SEED;
use crate::{CdtError, Point2};

/// Epsilon used if none or zero is given.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Vertices, edges and faces to triangulate.
///
/// Edges and faces refer to vertices by their index. Edge and face ids reported in a
/// [CdtResult](crate::CdtResult) are derived from the order given here.
///
/// # Example
/// ```
/// use delaunay2d::{CdtInput, Point2};
///
/// let input = CdtInput::new(vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.0, 1.0),
/// ])
/// .with_edges(vec![[0, 1]])
/// .with_faces(vec![vec![0, 1, 2]])
/// .with_epsilon(1e-6);
///
/// assert_eq!(input.face_edge_origin(1), Some((0, 0)));
/// assert_eq!(input.face_edge_origin(3), Some((0, 2)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct CdtInput {
    vertices: Vec<Point2<f64>>,
    edges: Vec<[usize; 2]>,
    faces: Vec<Vec<usize>>,
    epsilon: f64,
    seed: u64,
}

impl CdtInput {
    /// Creates an input consisting of isolated vertices.
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        Self {
            vertices,
            edges: Vec::new(),
            faces: Vec::new(),
            epsilon: DEFAULT_EPSILON,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the segments that must appear in the triangulation.
    pub fn with_edges(mut self, edges: Vec<[usize; 2]>) -> Self {
        self.edges = edges;
        self
    }

    /// Sets the polygons whose boundaries must appear in the triangulation and whose
    /// interior is tagged with the face index.
    ///
    /// Polygons may be given in either orientation.
    pub fn with_faces(mut self, faces: Vec<Vec<usize>>) -> Self {
        self.faces = faces;
        self
    }

    /// Sets the faces from a flat vertex table.
    ///
    /// Face `i` consists of `lengths[i]` vertices beginning at `face_vertices[starts[i]]`.
    pub fn with_flat_faces(
        mut self,
        face_vertices: &[usize],
        starts: &[usize],
        lengths: &[usize],
    ) -> Result<Self, CdtError> {
        if starts.len() != lengths.len() {
            return Err(CdtError::InvalidInput(format!(
                "{} face starts but {} face lengths",
                starts.len(),
                lengths.len()
            )));
        }
        let mut faces = Vec::with_capacity(starts.len());
        for (face, (&start, &length)) in starts.iter().zip(lengths).enumerate() {
            let range = start.checked_add(length).map(|end| start..end);
            let Some(vertices) = range.and_then(|range| face_vertices.get(range)) else {
                return Err(CdtError::InvalidInput(format!(
                    "face {} exceeds the face vertex table",
                    face
                )));
            };
            faces.push(vertices.to_vec());
        }
        self.faces = faces;
        Ok(self)
    }

    /// Sets the distance below which vertices are merged and points are considered
    /// to lie on an edge.
    ///
    /// Zero selects [DEFAULT_EPSILON]. Negative or NaN values are rejected by
    /// [triangulate](crate::triangulate).
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the seed of the random generator used to find starting points for point
    /// location.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The input vertices.
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// The constraint segments as pairs of vertex indices.
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// The polygons as lists of vertex indices.
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// The seed for point location sampling.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the epsilon which will be used for triangulation.
    pub fn epsilon(&self) -> Result<f64, CdtError> {
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            Err(CdtError::InvalidInput(format!(
                "epsilon must be a non negative number, got {}",
                self.epsilon
            )))
        } else if self.epsilon == 0.0 {
            Ok(DEFAULT_EPSILON)
        } else {
            Ok(self.epsilon)
        }
    }

    /// The first id given to a face boundary edge.
    pub fn face_edge_offset(&self) -> usize {
        self.edges.len()
    }

    /// Returns the id of the first boundary edge of `face`, or `None` if there is no
    /// such face.
    ///
    /// The boundary edge from `faces[face][i]` to its successor has id
    /// `face_edge_start(face) + i`.
    pub fn face_edge_start(&self, face: usize) -> Option<usize> {
        if face >= self.faces.len() {
            return None;
        }
        Some(self.face_edge_offset() + self.faces[..face].iter().map(Vec::len).sum::<usize>())
    }

    /// Maps a face boundary edge id back to the face index and the position of the
    /// edge's first vertex within that face.
    ///
    /// Returns `None` for input edge ids and for ids beyond the last face.
    pub fn face_edge_origin(&self, id: usize) -> Option<(usize, usize)> {
        let mut start = self.face_edge_offset();
        if id < start {
            return None;
        }
        for (face, vertices) in self.faces.iter().enumerate() {
            if id < start + vertices.len() {
                return Some((face, id - start));
            }
            start += vertices.len();
        }
        None
    }

    /// Checks that edges and faces can refer to vertices at all.
    pub(crate) fn validate_shape(&self) -> Result<(), CdtError> {
        if self.vertices.is_empty() && !(self.edges.is_empty() && self.faces.is_empty()) {
            return Err(CdtError::InvalidInput(
                "edges or faces given without any vertices".to_string(),
            ));
        }
        Ok(())
    }
}
