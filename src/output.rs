#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use smallvec::SmallVec;
use tracing::trace;

use crate::delaunay_core::dcel_operations::{delete_edge, FRAME_VERTEX_COUNT};
use crate::delaunay_core::math;
use crate::delaunay_core::{
    Dcel, FixedEdgeHandle, FixedFaceHandle, FixedSymEdgeHandle, FixedVertexHandle,
};
use crate::Point2;

/// Selects which edges of the triangulation are kept in the result.
///
/// Every mode removes the four corners of the padded frame and all edges connected to
/// them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub enum OutputMode {
    /// Keeps the complete triangulation of the convex hull of all input vertices.
    #[default]
    Triangles,
    /// Keeps only edges that belong to an input edge or an input face boundary.
    ConstraintsOnly,
    /// Like [OutputMode::ConstraintsOnly], but keeps enough unconstrained edges to make
    /// every face with an input face id a simple polygon without holes.
    ConstraintsOnlyValidMesh,
    /// Removes the triangles between the convex hull and the outermost constraints.
    Full,
    /// Like [OutputMode::Full], but additionally merges all triangles that are not
    /// part of any input face.
    InsideOnly,
}

/// Flat description of a triangulation together with the input ids of each element.
///
/// Vertex ids are input vertex indices. Edge ids below `face_edge_offset` are input edge
/// indices. Larger edge ids belong to face boundaries, see
/// [CdtInput::face_edge_origin](crate::CdtInput::face_edge_origin). Face ids are input
/// face indices.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde")
)]
pub struct CdtResult {
    /// Vertex positions, narrowed to single precision.
    pub vertex_coords: Vec<Point2<f32>>,
    /// Input vertex ids per output vertex. Empty for vertices created at intersections.
    pub vertex_original_ids: Vec<Vec<usize>>,
    /// Pairs of indices into `vertex_coords`.
    pub edges: Vec<[usize; 2]>,
    /// Input edge ids per output edge.
    pub edge_original_ids: Vec<Vec<usize>>,
    /// Counterclockwise vertex loops, as indices into `vertex_coords`.
    ///
    /// A loop visits a vertex twice where an edge dangles into the face.
    pub faces: Vec<Vec<usize>>,
    /// Inner boundary loops per output face, clockwise. Only faces of the constraint only
    /// modes can have holes.
    pub face_holes: Vec<Vec<Vec<usize>>>,
    /// Input face ids per output face.
    pub face_original_ids: Vec<Vec<usize>>,
    /// The first edge id belonging to a face boundary.
    pub face_edge_offset: usize,
}

impl CdtResult {
    pub fn num_vertices(&self) -> usize {
        self.vertex_coords.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns the output vertex carrying the given input vertex id.
    pub fn vertex_for_input(&self, input_vertex: usize) -> Option<usize> {
        self.vertex_original_ids
            .iter()
            .position(|ids| ids.contains(&input_vertex))
    }

    /// Returns all output edges carrying the given input edge id.
    pub fn edges_for_input(&self, input_edge: usize) -> impl Iterator<Item = usize> + '_ {
        self.edge_original_ids
            .iter()
            .enumerate()
            .filter(move |(_, ids)| ids.contains(&input_edge))
            .map(|(index, _)| index)
    }

    /// Returns all output faces carrying the given input face id.
    pub fn faces_for_input(&self, input_face: usize) -> impl Iterator<Item = usize> + '_ {
        self.face_original_ids
            .iter()
            .enumerate()
            .filter(move |(_, ids)| ids.contains(&input_face))
            .map(|(index, _)| index)
    }
}

fn touches_frame(dcel: &Dcel, edge: FixedEdgeHandle) -> bool {
    let symedge = edge.symedge(0);
    dcel.origin(symedge).index() < FRAME_VERTEX_COUNT
        || dcel.dest(symedge).index() < FRAME_VERTEX_COUNT
}

/// Dissolves edges into the outer face, starting at the outer face and walking inwards.
///
/// Only edges for which `dissolvable` returns `true` are crossed or removed. Every removal
/// merges a face into the outer face, which keeps inner faces free of holes.
pub(crate) fn dissolve_from_outer<F>(dcel: &mut Dcel, dissolvable: F)
where
    F: Fn(&Dcel, FixedEdgeHandle) -> bool,
{
    let epoch = dcel.next_visit_epoch();
    let outer = dcel.outer_face();
    dcel.face_mut(outer).visit_index = epoch;

    // The outer face may have several boundary components
    let mut stack: Vec<FixedFaceHandle> = Vec::new();
    for edge in dcel.live_edges() {
        if !dissolvable(dcel, edge) {
            continue;
        }
        for side in 0..2 {
            let symedge = edge.symedge(side);
            if dcel.face_of(symedge) == outer {
                stack.push(dcel.face_of(symedge.sym()));
            }
        }
    }

    while let Some(face) = stack.pop() {
        let entry = dcel.face(face);
        if entry.deleted || entry.visit_index == epoch {
            continue;
        }
        let Some(start) = entry.symedge else {
            continue;
        };
        dcel.face_mut(face).visit_index = epoch;

        let mut to_dissolve: SmallVec<[FixedSymEdgeHandle; 8]> = SmallVec::new();
        for symedge in dcel.face_cycle(start) {
            if !dissolvable(dcel, symedge.as_edge()) {
                continue;
            }
            let other = dcel.face_of(symedge.sym());
            if dcel.face(other).visit_index != epoch {
                stack.push(other);
            } else {
                to_dissolve.push(symedge);
            }
        }
        for symedge in to_dissolve {
            if !dcel.is_deleted(symedge.as_edge()) {
                delete_edge(dcel, symedge);
            }
        }
    }
}

/// Removes all edges which are connected to a corner of the frame.
pub(crate) fn strip_frame(dcel: &mut Dcel) {
    dissolve_from_outer(dcel, touches_frame);
}

fn remove_non_constraint_edges(dcel: &mut Dcel) {
    let edges: Vec<_> = dcel
        .live_edges()
        .filter(|edge| !dcel.is_constrained(*edge))
        .collect();
    for edge in edges {
        if !dcel.is_deleted(edge) {
            delete_edge(dcel, edge.symedge(0));
        }
    }
}

/// Returns `true` if removing the edge of `symedge` would merge two faces into a face
/// that touches itself.
fn is_needed_for_valid_face(dcel: &Dcel, symedge: FixedSymEdgeHandle) -> bool {
    let left = dcel.face_of(symedge);
    let right = dcel.face_of(symedge.sym());
    if dcel.is_outer(left) || dcel.is_outer(right) {
        return false;
    }
    if dcel.face(left).input_ids.is_empty() && dcel.face(right).input_ids.is_empty() {
        return false;
    }
    let dest = dcel.dest(symedge);
    dcel.face_cycle(symedge).skip(1).any(|other| {
        dcel.face_of(other.sym()) == right
            || (dcel.origin(other) != dest && dcel.vertex_touches_face(dcel.origin(other), right))
    })
}

/// Removes unconstrained edges longest first, keeping those without which a face with an
/// input face id would touch itself.
///
/// Removing an edge can make a previously needed edge removable, so passes repeat until
/// nothing changes.
fn remove_non_constraint_edges_leave_valid_mesh(dcel: &mut Dcel) {
    let mut pass = 0;
    loop {
        let mut edges: Vec<_> = dcel
            .live_edges()
            .filter(|edge| !dcel.is_constrained(*edge))
            .map(|edge| (dcel.edge_length_2(edge), edge))
            .collect();
        edges.sort_by(|(l0, _), (l1, _)| l1.total_cmp(l0));

        let mut removed = 0;
        for (_, edge) in edges {
            if dcel.is_deleted(edge) {
                continue;
            }
            let symedge = edge.symedge(0);
            if is_needed_for_valid_face(dcel, symedge) {
                trace!(edge = edge.index(), "Keeping edge to avoid an invalid face");
                continue;
            }
            delete_edge(dcel, symedge);
            removed += 1;
        }
        pass += 1;
        trace!(pass, removed, "Removed unconstrained edges");
        if removed == 0 {
            break;
        }
    }
}

/// Removes unconstrained edges between faces without input face ids.
fn remove_edges_outside_of_faces(dcel: &mut Dcel) {
    let edges: Vec<_> = dcel
        .live_edges()
        .filter(|edge| {
            let symedge = edge.symedge(0);
            !dcel.is_constrained(*edge)
                && dcel.face(dcel.face_of(symedge)).input_ids.is_empty()
                && dcel.face(dcel.face_of(symedge.sym())).input_ids.is_empty()
        })
        .collect();
    for edge in edges {
        if !dcel.is_deleted(edge) {
            delete_edge(dcel, edge.symedge(0));
        }
    }
}

/// Removes edges according to `mode`. The frame is always removed.
pub(crate) fn prepare_for_output(dcel: &mut Dcel, mode: OutputMode) {
    strip_frame(dcel);
    match mode {
        OutputMode::Triangles => {}
        OutputMode::ConstraintsOnly => remove_non_constraint_edges(dcel),
        OutputMode::ConstraintsOnlyValidMesh => {
            remove_non_constraint_edges_leave_valid_mesh(dcel)
        }
        OutputMode::Full => dissolve_from_outer(dcel, |dcel, edge| !dcel.is_constrained(edge)),
        OutputMode::InsideOnly => {
            dissolve_from_outer(dcel, |dcel, edge| !dcel.is_constrained(edge));
            remove_edges_outside_of_faces(dcel);
        }
    }
}

/// Serializes all vertices, live edges and inner faces except for the frame.
///
/// Each face is written as its counterclockwise outer loop plus the loops of its holes.
pub(crate) fn collect_result(dcel: &Dcel, face_edge_offset: usize) -> CdtResult {
    let mut result = CdtResult {
        face_edge_offset,
        ..CdtResult::default()
    };

    // Vertices merged away by a collapse are left out
    let mut output_indices = vec![usize::MAX; dcel.num_vertices()];
    for (index, vertex) in dcel.vertices.iter().enumerate().skip(FRAME_VERTEX_COUNT) {
        if vertex.merged_into.is_some() {
            continue;
        }
        output_indices[index] = result.vertex_coords.len();
        result.vertex_coords.push(vertex.position.to_f32());
        result.vertex_original_ids.push(vertex.input_ids.to_vec());
    }
    let output_index = |vertex: FixedVertexHandle| output_indices[vertex.index()];

    for edge in dcel.live_edges() {
        if touches_frame(dcel, edge) {
            continue;
        }
        let symedge = edge.symedge(0);
        result.edges.push([
            output_index(dcel.origin(symedge)),
            output_index(dcel.dest(symedge)),
        ]);
        result
            .edge_original_ids
            .push(dcel.edge(edge).input_ids.to_vec());
    }

    let cycles = boundary_cycles(dcel);
    for face in dcel.inner_faces() {
        let loops = &cycles[face.index()];
        if loops.is_empty() || loops.iter().flatten().any(|v| v.index() < FRAME_VERTEX_COUNT) {
            continue;
        }
        let area = |cycle: &Vec<FixedVertexHandle>| {
            let positions: Vec<_> = cycle.iter().map(|v| dcel.position(*v)).collect();
            math::signed_area(&positions)
        };
        let outer = (0..loops.len())
            .max_by(|a, b| area(&loops[*a]).total_cmp(&area(&loops[*b])))
            .unwrap_or(0);
        let to_output = |cycle: &Vec<FixedVertexHandle>| {
            cycle.iter().map(|v| output_index(*v)).collect::<Vec<_>>()
        };
        result.faces.push(to_output(&loops[outer]));
        result.face_holes.push(
            loops
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != outer)
                .map(|(_, cycle)| to_output(cycle))
                .collect(),
        );
        result
            .face_original_ids
            .push(dcel.face(face).input_ids.to_vec());
    }
    result
}

/// Groups the vertex loops of all boundary cycles by the face they enclose.
///
/// Cycles are ordered by their lowest symedge index.
fn boundary_cycles(dcel: &Dcel) -> Vec<Vec<Vec<FixedVertexHandle>>> {
    let mut cycles = vec![Vec::new(); dcel.num_faces()];
    let mut visited = vec![false; dcel.num_edges() * 2];
    for edge in dcel.live_edges() {
        for symedge in [edge.symedge(0), edge.symedge(1)] {
            if visited[symedge.index()] {
                continue;
            }
            let mut cycle = Vec::new();
            for s in dcel.face_cycle(symedge) {
                visited[s.index()] = true;
                cycle.push(dcel.origin(s));
            }
            cycles[dcel.face_of(symedge).index()].push(cycle);
        }
    }
    cycles
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delaunay_core::RandomSampleHintGenerator;
    use crate::test_utilities::{random_points_in_range, SEED};
    use crate::{triangulate, Cdt, CdtInput};

    const ALL_MODES: [OutputMode; 5] = [
        OutputMode::Triangles,
        OutputMode::ConstraintsOnly,
        OutputMode::ConstraintsOnlyValidMesh,
        OutputMode::Full,
        OutputMode::InsideOnly,
    ];

    /// Random points and segments around a tagged square with a tagged square hole.
    fn random_annulus() -> Dcel {
        let mut cdt: Cdt = Cdt::new(
            Point2::new(-2.0, -2.0),
            Point2::new(2.0, 2.0),
            1e-8,
            RandomSampleHintGenerator::with_seed(5),
        )
        .unwrap();
        let ring: Vec<_> = [
            (-1.8, -1.8),
            (1.8, -1.8),
            (1.8, 1.8),
            (-1.8, 1.8),
            (-0.6, -0.6),
            (0.6, -0.6),
            (0.6, 0.6),
            (-0.6, 0.6),
        ]
        .into_iter()
        .enumerate()
        .map(|(id, (x, y))| cdt.insert_vertex(Point2::new(x, y), id).unwrap())
        .collect();
        let points: Vec<_> = random_points_in_range(1.9, 60, SEED)
            .into_iter()
            .enumerate()
            .map(|(index, p)| cdt.insert_vertex(p, ring.len() + index).unwrap())
            .collect();
        for (id, pair) in points.chunks_exact(2).take(6).enumerate() {
            cdt.add_constraint(pair[0], pair[1], id).unwrap();
        }
        cdt.add_face(&ring[..4], 0, 6).unwrap();
        cdt.add_face(&ring[4..], 1, 10).unwrap();
        cdt.dcel().clone()
    }

    fn square_with_hole() -> CdtInput {
        CdtInput::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(3.0, 3.0),
            Point2::new(1.0, 3.0),
            Point2::new(6.0, 2.0),
        ])
        .with_faces(vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]])
    }

    fn face_count_with_id(result: &CdtResult, id: usize) -> usize {
        result.faces_for_input(id).count()
    }

    #[test]
    fn test_triangles_keeps_hull() {
        let result = triangulate(&square_with_hole(), OutputMode::Triangles).unwrap();
        assert_eq!(result.num_vertices(), 9);
        assert!(result.faces.iter().all(|f| f.len() == 3));
        // Euler for a triangulated convex hull with 9 points, 5 of them on the hull
        assert_eq!(result.num_faces(), 2 * 9 - 2 - 5);
        assert_eq!(result.num_edges(), 3 * 9 - 3 - 5);
    }

    #[test]
    fn test_full_removes_outside_triangles() {
        let result = triangulate(&square_with_hole(), OutputMode::Full).unwrap();
        // The isolated vertex at (6, 2) has no edges left
        let lonely = result.vertex_for_input(8).unwrap();
        assert!(result.edges.iter().all(|e| !e.contains(&lonely)));
        assert!(result.faces.iter().all(|f| f.len() == 3));
        assert!(result
            .face_original_ids
            .iter()
            .all(|ids| ids.contains(&0)));
        assert_eq!(face_count_with_id(&result, 1), 2);
        assert_eq!(face_count_with_id(&result, 0), 10);
    }

    #[test]
    fn test_inside_only_merges_untagged_triangles() {
        let input = CdtInput::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
            Point2::new(3.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(3.0, 2.0),
        ])
        .with_edges(vec![[4, 5], [5, 6], [6, 7], [7, 4]])
        .with_faces(vec![vec![0, 1, 2, 3]]);
        let result = triangulate(&input, OutputMode::InsideOnly).unwrap();
        // The tagged square keeps its diagonal, the untagged one becomes a single face
        assert_eq!(face_count_with_id(&result, 0), 2);
        let untagged: Vec<_> = result
            .face_original_ids
            .iter()
            .zip(&result.faces)
            .filter(|(ids, _)| ids.is_empty())
            .collect();
        assert_eq!(untagged.len(), 1);
        assert_eq!(untagged[0].1.len(), 4);
    }

    #[test]
    fn test_constraints_only() {
        let result = triangulate(&square_with_hole(), OutputMode::ConstraintsOnly).unwrap();
        assert_eq!(result.num_edges(), 8);
        assert!(result.edge_original_ids.iter().all(|ids| !ids.is_empty()));
        assert_eq!(face_count_with_id(&result, 1), 1);
        assert_eq!(result.face_holes.len(), result.num_faces());

        // The annulus between both squares keeps the inner square as a hole
        let annulus = (0..result.num_faces())
            .find(|face| result.face_original_ids[*face] == [0])
            .unwrap();
        let mut outer = result.faces[annulus].clone();
        outer.sort_unstable();
        let expected: Vec<_> = (0..4).map(|id| result.vertex_for_input(id).unwrap()).collect();
        assert_eq!(outer, expected);
        assert_eq!(result.face_holes[annulus].len(), 1);
        let mut hole = result.face_holes[annulus][0].clone();
        hole.sort_unstable();
        let expected: Vec<_> = (4..8).map(|id| result.vertex_for_input(id).unwrap()).collect();
        assert_eq!(hole, expected);

        let inner = result.faces_for_input(1).next().unwrap();
        assert!(result.face_holes[inner].is_empty());
    }

    #[test]
    fn test_constraints_only_valid_mesh_keeps_bridge() {
        let result =
            triangulate(&square_with_hole(), OutputMode::ConstraintsOnlyValidMesh).unwrap();
        let unconstrained = result
            .edge_original_ids
            .iter()
            .filter(|ids| ids.is_empty())
            .count();
        assert!(unconstrained > 0);
        assert_eq!(face_count_with_id(&result, 1), 1);
        for (face, ids) in result.faces.iter().zip(&result.face_original_ids) {
            if ids.is_empty() {
                continue;
            }
            // No face visits a vertex twice
            let mut sorted = face.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), face.len());
        }
    }

    #[test]
    fn test_collect_result_skips_frame() {
        let input = CdtInput::new(vec![Point2::new(0.0, 0.0)]);
        let result = triangulate(&input, OutputMode::Triangles).unwrap();
        assert_eq!(result.num_vertices(), 1);
        assert_eq!(result.vertex_original_ids, vec![vec![0]]);
        assert_eq!(result.num_edges(), 0);
        assert_eq!(result.num_faces(), 0);
    }

    #[test]
    fn test_prepare_twice_changes_nothing() {
        let dcel = random_annulus();
        dcel.sanity_check();
        for mode in ALL_MODES {
            let mut dcel = dcel.clone();
            prepare_for_output(&mut dcel, mode);
            dcel.sanity_check();
            let once = collect_result(&dcel, 6);
            let edges = dcel.live_edges().count();

            prepare_for_output(&mut dcel, mode);
            dcel.sanity_check();
            assert_eq!(dcel.live_edges().count(), edges, "Mode {:?}", mode);
            assert_eq!(collect_result(&dcel, 6), once, "Mode {:?}", mode);
        }
    }

    #[test]
    fn test_every_mode_keeps_constraints() {
        let dcel = random_annulus();
        for mode in ALL_MODES {
            let mut dcel = dcel.clone();
            prepare_for_output(&mut dcel, mode);
            let result = collect_result(&dcel, 6);
            for id in 0..14 {
                assert!(result.edges_for_input(id).next().is_some(), "Mode {:?}, id {}", mode, id);
            }
            assert_eq!(result.face_holes.len(), result.num_faces());
            let hole_count: usize = result.face_holes.iter().map(Vec::len).sum();
            if matches!(mode, OutputMode::Triangles | OutputMode::Full) {
                assert_eq!(hole_count, 0, "Mode {:?}", mode);
            }
        }
    }
}
