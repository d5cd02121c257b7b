use tracing::trace;

use crate::delaunay_core::constraint::insert_constraint;
use crate::delaunay_core::dcel::add_input_id;
use crate::delaunay_core::dcel_operations::{new_with_frame, FRAME_VERTEX_COUNT};
use crate::delaunay_core::insertion::{insert_vertex, InsertionOutcome};
use crate::delaunay_core::math::{self, validate_position, MAX_ALLOWED_VALUE};
use crate::delaunay_core::small_features;
use crate::delaunay_core::{
    Dcel, FixedEdgeHandle, FixedSymEdgeHandle, FixedVertexHandle, HintGenerator,
    RandomSampleHintGenerator,
};
use crate::flood_fill::add_face_ids;
use crate::output::{self, CdtResult, OutputMode};
use crate::{CdtError, Point2};

/// The frame around the input is larger than the input's bounding box by this factor
/// times the box's larger side, on every side.
pub const FRAME_MARGIN_FACTOR: f64 = 4.0;

/// Returns the corners of the frame enclosing the bounding box `min..max`.
///
/// A box without extent is padded by its distance from the origin, but at least by one.
/// The corners never exceed [MAX_ALLOWED_VALUE] in magnitude, so a box close to that
/// limit is padded by less than [FRAME_MARGIN_FACTOR] on the affected sides.
pub fn padded_frame(min: Point2<f64>, max: Point2<f64>) -> (Point2<f64>, Point2<f64>) {
    let span = (max.x - min.x).max(max.y - min.y);
    let margin = if span > 0.0 {
        FRAME_MARGIN_FACTOR * span
    } else {
        min.x.abs().max(min.y.abs()).max(1.0)
    };
    let clamp = |value: f64| value.clamp(-MAX_ALLOWED_VALUE, MAX_ALLOWED_VALUE);
    (
        Point2::new(clamp(min.x - margin), clamp(min.y - margin)),
        Point2::new(clamp(max.x + margin), clamp(max.y + margin)),
    )
}

/// An incrementally built constrained Delaunay triangulation.
///
/// All vertices must lie within the bounding box given on construction. Internally, the
/// triangulation is enclosed by a padded frame of four additional vertices which never
/// appear in a [CdtResult].
///
/// Vertices should be inserted before constraints and constraints before faces, as
/// [triangulate](crate::triangulate) does. Once [Cdt::prepare_for_output] has been
/// called, the triangulation cannot be changed anymore.
///
/// # Example
/// ```
/// use delaunay2d::{Cdt, OutputMode, Point2};
///
/// # fn main() -> Result<(), delaunay2d::CdtError> {
/// let (min, max) = (Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
/// let mut cdt: Cdt = Cdt::new(min, max, 1e-8, Default::default())?;
/// let v0 = cdt.insert_vertex(Point2::new(0.0, 0.0), 0)?;
/// let v1 = cdt.insert_vertex(Point2::new(1.0, 0.0), 1)?;
/// let v2 = cdt.insert_vertex(Point2::new(1.0, 1.0), 2)?;
/// cdt.add_face(&[v0, v1, v2], 0, 0)?;
/// cdt.prepare_for_output(OutputMode::Full)?;
///
/// let result = cdt.result();
/// assert_eq!(result.num_faces(), 1);
/// assert_eq!(result.face_original_ids, vec![vec![0]]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Cdt<L: HintGenerator = RandomSampleHintGenerator> {
    dcel: Dcel,
    hint_generator: L,
    epsilon: f64,
    frame: (Point2<f64>, Point2<f64>),
    face_edge_offset: usize,
    output_mode: Option<OutputMode>,
}

impl<L: HintGenerator> Cdt<L> {
    /// Creates a triangulation which can hold vertices within `min..max`.
    pub fn new(
        min: Point2<f64>,
        max: Point2<f64>,
        epsilon: f64,
        hint_generator: L,
    ) -> Result<Self, CdtError> {
        if !(epsilon > 0.0) {
            return Err(CdtError::InvalidInput(format!(
                "epsilon must be positive, got {}",
                epsilon
            )));
        }
        for (index, corner) in [min, max].into_iter().enumerate() {
            validate_position(corner)
                .map_err(|source| CdtError::InvalidCoordinate { index, source })?;
        }
        if min.x > max.x || min.y > max.y {
            return Err(CdtError::InvalidInput(
                "bounding box minimum exceeds its maximum".to_string(),
            ));
        }

        let frame = padded_frame(min, max);
        Ok(Cdt {
            dcel: new_with_frame(frame.0, frame.1),
            hint_generator,
            epsilon,
            frame,
            face_edge_offset: 0,
            output_mode: None,
        })
    }

    fn check_mutable(&self) -> Result<(), CdtError> {
        match self.output_mode {
            Some(mode) => Err(CdtError::OutputAlreadyPrepared(mode)),
            None => Ok(()),
        }
    }

    /// Checks that `vertex` belongs to the triangulation and is not part of the frame.
    ///
    /// Returns the vertex which took over `vertex` if it was removed as a small feature.
    fn check_vertex(&self, vertex: FixedVertexHandle) -> Result<FixedVertexHandle, CdtError> {
        let index = vertex.index();
        if index < FRAME_VERTEX_COUNT || index >= self.dcel.num_vertices() {
            return Err(CdtError::InvalidVertexHandle(index));
        }
        let mut current = vertex;
        while let Some(next) = self.dcel.vertex(current).merged_into {
            current = next;
        }
        Ok(current)
    }

    /// Inserts a vertex and attaches `input_id` to it.
    ///
    /// If an existing vertex lies within epsilon of `position`, no vertex is created.
    /// The id is attached to the existing vertex instead and its handle is returned.
    pub fn insert_vertex(
        &mut self,
        position: Point2<f64>,
        input_id: usize,
    ) -> Result<FixedVertexHandle, CdtError> {
        self.check_mutable()?;
        validate_position(position).map_err(|source| CdtError::InvalidCoordinate {
            index: input_id,
            source,
        })?;
        let (min, max) = self.frame;
        if !(position.x > min.x && position.x < max.x && position.y > min.y && position.y < max.y)
        {
            return Err(CdtError::OutsideOfFrame);
        }

        let outcome = insert_vertex(
            &mut self.dcel,
            &mut self.hint_generator,
            position,
            self.epsilon,
        );
        let vertex = outcome.vertex();
        if let InsertionOutcome::Merged(existing) = outcome {
            trace!(input_id, vertex = existing.index(), "Merged input vertex");
        }
        add_input_id(&mut self.dcel.vertex_mut(vertex).input_ids, input_id);
        Ok(vertex)
    }

    /// Inserts a constraint edge between two vertices and attaches `input_id` to every
    /// edge on its path.
    ///
    /// Returns the edges from `from` to `to` in path order. The path is empty if both
    /// handles refer to the same vertex.
    pub fn add_constraint(
        &mut self,
        from: FixedVertexHandle,
        to: FixedVertexHandle,
        input_id: usize,
    ) -> Result<Vec<FixedEdgeHandle>, CdtError> {
        self.check_mutable()?;
        let from = self.check_vertex(from)?;
        let to = self.check_vertex(to)?;
        Ok(insert_constraint(
            &mut self.dcel,
            from,
            to,
            input_id,
            self.epsilon,
        ))
    }

    /// Inserts the boundary of a polygon and tags its interior with `face_id`.
    ///
    /// The boundary edge starting at `vertices[i]` receives the id `first_edge_id + i`.
    /// The polygon may be given in either orientation.
    pub fn add_face(
        &mut self,
        vertices: &[FixedVertexHandle],
        face_id: usize,
        first_edge_id: usize,
    ) -> Result<(), CdtError> {
        let edge_ids: Vec<_> = (first_edge_id..first_edge_id + vertices.len()).collect();
        self.add_face_with_edge_ids(vertices, face_id, &edge_ids)
    }

    /// Like [Cdt::add_face], but the boundary edge starting at `vertices[i]` receives the
    /// id `edge_ids[i]`.
    ///
    /// Several boundary edges may share an id. Tagging stops at every edge carrying one
    /// of the ids between the smallest and the largest of `edge_ids`.
    pub fn add_face_with_edge_ids(
        &mut self,
        vertices: &[FixedVertexHandle],
        face_id: usize,
        edge_ids: &[usize],
    ) -> Result<(), CdtError> {
        self.check_mutable()?;
        if vertices.len() < 3 {
            return Err(CdtError::InvalidInput(format!(
                "face {} has fewer than three vertices",
                face_id
            )));
        }
        if edge_ids.len() != vertices.len() {
            return Err(CdtError::InvalidInput(format!(
                "face {} has {} vertices but {} edge ids",
                face_id,
                vertices.len(),
                edge_ids.len()
            )));
        }
        let vertices = vertices
            .iter()
            .map(|vertex| self.check_vertex(*vertex))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, &from) in vertices.iter().enumerate() {
            let to = vertices[(i + 1) % vertices.len()];
            insert_constraint(&mut self.dcel, from, to, edge_ids[i], self.epsilon);
        }

        let Some(mut symedge) = self.first_boundary_symedge(&vertices, edge_ids) else {
            trace!(face_id, "Face has no boundary edges");
            return Ok(());
        };
        let positions: Vec<_> = vertices.iter().map(|v| self.dcel.position(*v)).collect();
        if math::signed_area(&positions) < 0.0 {
            symedge = symedge.sym();
        }

        let (Some(&lowest), Some(&highest)) = (edge_ids.iter().min(), edge_ids.iter().max())
        else {
            return Ok(());
        };
        let tagged = add_face_ids(&mut self.dcel, symedge, face_id, lowest..=highest);
        trace!(face_id, tagged, "Tagged face");
        Ok(())
    }

    /// Finds the symedge leaving the start vertex of the first non empty boundary segment
    /// along that segment.
    fn first_boundary_symedge(
        &self,
        vertices: &[FixedVertexHandle],
        edge_ids: &[usize],
    ) -> Option<FixedSymEdgeHandle> {
        for (i, &from) in vertices.iter().enumerate() {
            let to = vertices[(i + 1) % vertices.len()];
            if from == to {
                continue;
            }
            let id = edge_ids[i];
            let direction = self.dcel.position(to).sub(self.dcel.position(from));
            let found = self.dcel.vertex_fan(from).find(|symedge| {
                let edge_direction = self
                    .dcel
                    .dest_position(*symedge)
                    .sub(self.dcel.origin_position(*symedge));
                self.dcel.edge(symedge.as_edge()).input_ids.contains(&id)
                    && edge_direction.dot(direction) > 0.0
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Collapses every edge not longer than epsilon, unless doing so would fold over a
    /// triangle or merge an input vertex into a vertex created by a crossing.
    ///
    /// The input ids of a removed vertex move to the vertex it was merged into, as do the
    /// ids of its edges. Handles of removed vertices stay usable and refer to that vertex.
    /// Returns the number of collapsed edges.
    pub fn remove_small_features(&mut self) -> Result<usize, CdtError> {
        self.check_mutable()?;
        Ok(small_features::remove_small_features(
            &mut self.dcel,
            self.epsilon,
        ))
    }

    /// Removes edges according to `mode`.
    ///
    /// Calling this again with the same mode has no effect. Any other mode is rejected,
    /// as is any further insertion.
    pub fn prepare_for_output(&mut self, mode: OutputMode) -> Result<(), CdtError> {
        match self.output_mode {
            Some(prepared) if prepared == mode => Ok(()),
            Some(prepared) => Err(CdtError::OutputAlreadyPrepared(prepared)),
            None => {
                output::prepare_for_output(&mut self.dcel, mode);
                self.output_mode = Some(mode);
                Ok(())
            }
        }
    }

    /// Returns the output mode this triangulation was prepared for, if any.
    pub fn output_mode(&self) -> Option<OutputMode> {
        self.output_mode
    }

    /// Sets the value reported as [CdtResult::face_edge_offset] by [Cdt::result].
    ///
    /// Use the number of input edges if face boundary ids follow the edge ids, as with
    /// [CdtInput::face_edge_offset](crate::CdtInput::face_edge_offset). Defaults to zero.
    pub fn set_face_edge_offset(&mut self, offset: usize) {
        self.face_edge_offset = offset;
    }

    /// Serializes the triangulation.
    ///
    /// Without a prior call to [Cdt::prepare_for_output], elements connected to the
    /// frame are left out but nothing else is removed.
    pub fn result(&self) -> CdtResult {
        output::collect_result(&self.dcel, self.face_edge_offset)
    }

    /// Number of vertices, not counting the frame and vertices removed as small features.
    pub fn num_vertices(&self) -> usize {
        (FRAME_VERTEX_COUNT..self.dcel.num_vertices())
            .filter(|index| {
                let vertex = FixedVertexHandle::new(*index);
                self.dcel.vertex(vertex).merged_into.is_none()
            })
            .count()
    }

    /// Number of edges that were not removed, including edges of the frame.
    pub fn num_live_edges(&self) -> usize {
        self.dcel.live_edges().count()
    }

    /// Number of faces that were not removed, not counting the outer face.
    pub fn num_live_faces(&self) -> usize {
        self.dcel.inner_faces().count()
    }

    pub fn vertex_position(&self, vertex: FixedVertexHandle) -> Option<Point2<f64>> {
        self.check_vertex(vertex)
            .ok()
            .map(|vertex| self.dcel.position(vertex))
    }

    /// The input ids attached to a vertex.
    ///
    /// Panics if the handle does not belong to this triangulation.
    pub fn vertex_input_ids(&self, vertex: FixedVertexHandle) -> &[usize] {
        &self.dcel.vertex(vertex).input_ids
    }

    /// The input ids attached to an edge.
    ///
    /// Panics if the handle does not belong to this triangulation.
    pub fn edge_input_ids(&self, edge: FixedEdgeHandle) -> &[usize] {
        &self.dcel.edge(edge).input_ids
    }

    /// Lower left and upper right corner of the padded frame.
    pub fn frame(&self) -> (Point2<f64>, Point2<f64>) {
        self.frame
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Gives access to the underlying mesh.
    pub fn dcel(&self) -> &Dcel {
        &self.dcel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delaunay_core::LastUsedVertexHintGenerator;
    use crate::CoordinateError;

    const EPSILON: f64 = 1e-8;

    fn unit_cdt() -> Cdt {
        Cdt::new(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            EPSILON,
            RandomSampleHintGenerator::default(),
        )
        .unwrap()
    }

    fn insert_square(cdt: &mut Cdt) -> Vec<FixedVertexHandle> {
        [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .enumerate()
            .map(|(id, (x, y))| cdt.insert_vertex(Point2::new(*x, *y), id).unwrap())
            .collect()
    }

    #[test]
    fn test_padded_frame() {
        let (min, max) = padded_frame(Point2::new(0.0, 0.0), Point2::new(2.0, 1.0));
        assert_eq!(min, Point2::new(-8.0, -8.0));
        assert_eq!(max, Point2::new(10.0, 9.0));

        let (min, max) = padded_frame(Point2::new(3.0, 3.0), Point2::new(3.0, 3.0));
        assert_eq!(min, Point2::new(0.0, 0.0));
        assert_eq!(max, Point2::new(6.0, 6.0));

        let (min, max) = padded_frame(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0));
        assert_eq!(min, Point2::new(-1.0, -1.0));
        assert_eq!(max, Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_padded_frame_is_clamped() {
        let (min, max) = padded_frame(Point2::new(-1e60, -1e60), Point2::new(1e60, 1e60));
        assert_eq!(min, Point2::new(-MAX_ALLOWED_VALUE, -MAX_ALLOWED_VALUE));
        assert_eq!(max, Point2::new(MAX_ALLOWED_VALUE, MAX_ALLOWED_VALUE));

        let (min, max) = padded_frame(Point2::new(1e60, 1e60), Point2::new(1e60, 1e60));
        assert_eq!(min, Point2::new(0.0, 0.0));
        assert_eq!(max, Point2::new(2e60, 2e60));
    }

    #[test]
    fn test_huge_coordinates() {
        let corners = [(-1e60, -1e60), (1e60, -1e60), (1e60, 1e60), (-1e60, 1e60)];
        let (min, max) = (Point2::new(-1e60, -1e60), Point2::new(1e60, 1e60));
        let mut cdt: Cdt = Cdt::new(min, max, EPSILON, Default::default()).unwrap();
        let vertices: Vec<_> = corners
            .iter()
            .enumerate()
            .map(|(id, (x, y))| cdt.insert_vertex(Point2::new(*x, *y), id).unwrap())
            .collect();
        cdt.add_constraint(vertices[0], vertices[2], 0).unwrap();
        cdt.dcel().sanity_check();
        cdt.prepare_for_output(OutputMode::Triangles).unwrap();
        let result = cdt.result();
        assert_eq!(result.num_vertices(), 4);
        assert_eq!(result.num_faces(), 2);
        assert_eq!(result.edges_for_input(0).count(), 1);
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        let min = Point2::new(0.0, 0.0);
        let max = Point2::new(1.0, 1.0);
        let generator = LastUsedVertexHintGenerator::default();
        assert!(matches!(
            Cdt::new(min, max, 0.0, generator),
            Err(CdtError::InvalidInput(_))
        ));
        assert!(matches!(
            Cdt::new(max, min, EPSILON, generator),
            Err(CdtError::InvalidInput(_))
        ));
        assert_eq!(
            Cdt::new(Point2::new(f64::NAN, 0.0), max, EPSILON, generator).err(),
            Some(CdtError::InvalidCoordinate {
                index: 0,
                source: CoordinateError::NAN
            })
        );
    }

    #[test]
    fn test_insert_vertex() {
        let mut cdt = unit_cdt();
        let vertices = insert_square(&mut cdt);
        assert_eq!(cdt.num_vertices(), 4);
        assert_eq!(cdt.vertex_position(vertices[2]), Some(Point2::new(1.0, 1.0)));
        assert_eq!(cdt.vertex_input_ids(vertices[3]), &[3]);
        cdt.dcel().sanity_check();
        cdt.dcel().check_delaunay(EPSILON);
    }

    #[test]
    fn test_insert_merges_vertices() {
        let mut cdt = unit_cdt();
        let first = cdt.insert_vertex(Point2::new(0.5, 0.5), 0).unwrap();
        let second = cdt.insert_vertex(Point2::new(0.5, 0.5 + 1e-10), 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(cdt.num_vertices(), 1);
        assert_eq!(cdt.vertex_input_ids(first), &[0, 1]);
    }

    #[test]
    fn test_insert_outside_of_frame() {
        let mut cdt = unit_cdt();
        let (_, max) = cdt.frame();
        assert_eq!(
            cdt.insert_vertex(Point2::new(max.x + 1.0, 0.0), 0),
            Err(CdtError::OutsideOfFrame)
        );
        assert_eq!(cdt.insert_vertex(max, 0), Err(CdtError::OutsideOfFrame));
        assert!(matches!(
            cdt.insert_vertex(Point2::new(f64::INFINITY, 0.0), 7),
            Err(CdtError::InvalidCoordinate { index: 7, .. })
        ));
    }

    #[test]
    fn test_invalid_vertex_handles() {
        let mut cdt = unit_cdt();
        let vertices = insert_square(&mut cdt);
        let frame_corner = FixedVertexHandle::new(0);
        let unknown = FixedVertexHandle::new(100);
        assert_eq!(
            cdt.add_constraint(frame_corner, vertices[0], 0),
            Err(CdtError::InvalidVertexHandle(0))
        );
        assert_eq!(
            cdt.add_constraint(vertices[0], unknown, 0),
            Err(CdtError::InvalidVertexHandle(100))
        );
        assert_eq!(cdt.vertex_position(unknown), None);
    }

    #[test]
    fn test_add_constraint() {
        let mut cdt = unit_cdt();
        let vertices = insert_square(&mut cdt);
        let edges = cdt.add_constraint(vertices[0], vertices[2], 5).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(cdt.edge_input_ids(edges[0]), &[5]);
        assert!(cdt.add_constraint(vertices[1], vertices[1], 6).unwrap().is_empty());
        cdt.dcel().sanity_check();
    }

    #[test]
    fn test_add_face_in_both_orientations() {
        for reversed in [false, true] {
            let mut cdt = unit_cdt();
            let mut vertices = insert_square(&mut cdt);
            if reversed {
                vertices.reverse();
            }
            cdt.add_face(&vertices, 0, 10).unwrap();
            cdt.prepare_for_output(OutputMode::Full).unwrap();
            let result = cdt.result();
            assert_eq!(result.num_faces(), 2);
            assert!(result.face_original_ids.iter().all(|ids| ids == &[0]));
            let boundary_ids: Vec<_> = result
                .edge_original_ids
                .iter()
                .filter(|ids| !ids.is_empty())
                .map(|ids| ids[0])
                .collect();
            assert_eq!(boundary_ids.len(), 4);
            assert!(boundary_ids.iter().all(|id| (10..14).contains(id)));
        }
    }

    #[test]
    fn test_add_face_rejects_degenerate_faces() {
        let mut cdt = unit_cdt();
        let vertices = insert_square(&mut cdt);
        assert!(matches!(
            cdt.add_face(&vertices[..2], 0, 0),
            Err(CdtError::InvalidInput(_))
        ));
        assert!(matches!(
            cdt.add_face_with_edge_ids(&vertices, 0, &[0, 1, 2]),
            Err(CdtError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_add_face_with_shared_edge_ids() {
        let mut cdt = unit_cdt();
        let vertices = insert_square(&mut cdt);
        // Two boundary edges stem from the same input edge
        cdt.add_face_with_edge_ids(&vertices, 0, &[7, 7, 8, 9]).unwrap();
        cdt.set_face_edge_offset(7);
        cdt.prepare_for_output(OutputMode::Full).unwrap();
        let result = cdt.result();
        assert_eq!(result.face_edge_offset, 7);
        assert_eq!(result.num_faces(), 2);
        assert!(result.face_original_ids.iter().all(|ids| ids == &[0]));
        assert_eq!(result.edges_for_input(7).count(), 2);
        assert_eq!(result.edges_for_input(8).count(), 1);
        assert_eq!(result.edges_for_input(9).count(), 1);
    }

    #[test]
    fn test_merged_vertices_stay_usable() {
        let mut cdt = unit_cdt();
        let hexagon: Vec<_> = (0..6)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::PI / 3.0 + 0.1;
                let position = Point2::new(0.5 + 0.4 * angle.cos(), 0.5 + 0.4 * angle.sin());
                cdt.insert_vertex(position, i).unwrap()
            })
            .collect();
        let center = cdt.insert_vertex(Point2::new(0.5, 0.5), 6).unwrap();
        let close = cdt.insert_vertex(Point2::new(0.5 + 1e-6, 0.5), 7).unwrap();
        assert_ne!(center, close);
        assert_eq!(cdt.remove_small_features(), Ok(0));

        // Edges are collapsed up to the epsilon of the triangulation
        cdt.epsilon = 1e-5;
        assert_eq!(cdt.remove_small_features(), Ok(1));
        cdt.epsilon = EPSILON;
        assert_eq!(cdt.num_vertices(), 7);
        assert_eq!(cdt.vertex_input_ids(center), &[6, 7]);
        assert_eq!(cdt.vertex_position(close), Some(Point2::new(0.5, 0.5)));

        let path = cdt.add_constraint(hexagon[0], close, 0).unwrap();
        assert_eq!(path.len(), 1);
        cdt.dcel().sanity_check();
        cdt.prepare_for_output(OutputMode::Triangles).unwrap();
        assert_eq!(
            cdt.remove_small_features(),
            Err(CdtError::OutputAlreadyPrepared(OutputMode::Triangles))
        );
        let result = cdt.result();
        assert_eq!(result.num_vertices(), 7);
        assert_eq!(result.num_faces(), 6);
        assert_eq!(result.edges_for_input(0).count(), 1);
    }

    #[test]
    fn test_prepare_for_output() {
        let mut cdt = unit_cdt();
        insert_square(&mut cdt);
        assert_eq!(cdt.output_mode(), None);
        cdt.prepare_for_output(OutputMode::Triangles).unwrap();
        let first = cdt.result();
        cdt.prepare_for_output(OutputMode::Triangles).unwrap();
        assert_eq!(cdt.result(), first);
        assert_eq!(
            cdt.prepare_for_output(OutputMode::Full),
            Err(CdtError::OutputAlreadyPrepared(OutputMode::Triangles))
        );
        assert_eq!(
            cdt.insert_vertex(Point2::new(0.5, 0.5), 4),
            Err(CdtError::OutputAlreadyPrepared(OutputMode::Triangles))
        );
        assert_eq!(first.num_faces(), 2);
        assert_eq!(first.num_edges(), 5);
        assert_eq!(first.face_edge_offset, 0);
    }
}
