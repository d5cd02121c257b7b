use smallvec::SmallVec;
use tracing::{trace, warn};

use super::dcel::Dcel;
use super::dcel_operations::{
    add_diagonal, add_vertex, add_vertex_to_symedge_edge, flip, split_edge,
};
use super::handles::*;
use super::hint_generator::HintGenerator;
use super::locate::{locate, PositionInTriangulation};
use super::math;
use crate::Point2;

/// Upper bound for the number of edges checked by a single restoration run.
pub const FLIP_ITERATION_CAP: usize = 10_000;

/// Result of inserting a position into the triangulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionOutcome {
    /// A new vertex was created.
    Created(FixedVertexHandle),
    /// The position was within `epsilon` of this existing vertex.
    Merged(FixedVertexHandle),
}

impl InsertionOutcome {
    pub fn vertex(&self) -> FixedVertexHandle {
        match self {
            InsertionOutcome::Created(vertex) | InsertionOutcome::Merged(vertex) => *vertex,
        }
    }
}

/// Locates `position` and inserts it, restoring the Delaunay property afterwards.
pub fn insert_vertex<L: HintGenerator>(
    dcel: &mut Dcel,
    hint_generator: &mut L,
    position: Point2<f64>,
    epsilon: f64,
) -> InsertionOutcome {
    let hint = hint_generator.get_hint(dcel, position);
    let outcome = match locate(dcel, hint, position, epsilon) {
        PositionInTriangulation::OnVertex(vertex) => InsertionOutcome::Merged(vertex),
        PositionInTriangulation::OnEdge(symedge, lambda) => {
            InsertionOutcome::Created(insert_point_in_edge(dcel, symedge, lambda, epsilon))
        }
        PositionInTriangulation::OnFace(symedge) => {
            InsertionOutcome::Created(insert_point_in_face(dcel, symedge, position, epsilon))
        }
    };
    hint_generator.notify_vertex_inserted(outcome.vertex());
    outcome
}

/// Inserts a new vertex into the triangle left of `triangle` and connects it to all corners.
///
/// ```text
///          c                      c
///         / \                    /|\
///        /   \                  / | \
///       /     \       =>       /  v  \
///      /       \              / /   \ \
///     a -------> b           a ------> b
/// ```
pub fn insert_point_in_face(
    dcel: &mut Dcel,
    triangle: FixedSymEdgeHandle,
    position: Point2<f64>,
    epsilon: f64,
) -> FixedVertexHandle {
    let s0 = triangle;
    let s1 = dcel.next(s0);
    let s2 = dcel.next(s1);
    debug_assert_eq!(dcel.next(s2), s0);

    let v = add_vertex(dcel, position);
    let spoke = add_vertex_to_symedge_edge(dcel, v, s0);
    let to_b = add_diagonal(dcel, s1, spoke.symedge(0));
    add_diagonal(dcel, s2, to_b.symedge(1));

    let mut stack: SmallVec<[FixedSymEdgeHandle; 16]> = SmallVec::new();
    stack.extend([s0, s1, s2]);
    flip_edges(dcel, &mut stack, epsilon);
    v
}

/// Splits the edge of `symedge` at `lambda` and connects the new vertex to the opposite
/// corners of both adjacent triangles.
pub fn insert_point_in_edge(
    dcel: &mut Dcel,
    symedge: FixedSymEdgeHandle,
    lambda: f64,
    epsilon: f64,
) -> FixedVertexHandle {
    let se = symedge;
    let sesym = se.sym();
    let new_edge = split_edge(dcel, se, lambda);
    let newse = new_edge.symedge(0);
    let v = dcel.origin(newse);

    let mut stack: SmallVec<[FixedSymEdgeHandle; 16]> = SmallVec::new();
    if !dcel.is_outer(dcel.face_of(se)) {
        let senext = dcel.next(newse);
        let opposite = dcel.next(senext);
        stack.extend([senext, opposite]);
        add_diagonal(dcel, newse, opposite);
    }
    if !dcel.is_outer(dcel.face_of(sesym)) {
        let sesymnext = dcel.next(sesym);
        let opposite = dcel.next(sesymnext);
        stack.extend([sesymnext, opposite]);
        add_diagonal(dcel, sesym, opposite);
    }
    flip_edges(dcel, &mut stack, epsilon);
    v
}

/// Restores the Delaunay property around a newly inserted vertex.
///
/// Every symedge on the stack must have the new vertex as apex of its left triangle.
/// Constrained edges and edges bordering the outer face are never flipped.
///
/// ```text
///        c                c
///      /   \            / | \
///    /   v   \        /   |   \
///  a --edge--> b    a  v  |    b
///    \       /        \   |   /
///      \   /            \ | /
///        d                d
/// ```
/// If `d` lies inside the circumcircle of `a b c`, the edge is flipped and the two
/// edges `a d` and `d b` are checked next.
pub fn flip_edges<A>(dcel: &mut Dcel, stack: &mut SmallVec<A>, epsilon: f64)
where
    A: smallvec::Array<Item = FixedSymEdgeHandle>,
{
    let mut iterations = 0;
    while let Some(symedge) = stack.pop() {
        iterations += 1;
        if iterations > FLIP_ITERATION_CAP {
            warn!(
                remaining = stack.len(),
                "Edge flipping exceeded its iteration cap, triangulation may not be Delaunay"
            );
            stack.clear();
            break;
        }

        if let Some([_, _, tn, tn2]) = try_flip(dcel, symedge, epsilon) {
            stack.push(tn);
            stack.push(tn2);
        }
    }
}

/// Restores the Delaunay property for an arbitrary set of edges.
///
/// Unlike [flip_edges], the edges may lie anywhere in the triangulation. Each flip pushes
/// all four edges of the surrounding quadrilateral, so violations spread until every
/// reachable unconstrained edge is locally Delaunay.
pub fn legalize_edges(dcel: &mut Dcel, edges: &mut Vec<FixedEdgeHandle>, epsilon: f64) {
    let cap = FLIP_ITERATION_CAP + edges.len();
    let mut iterations = 0;
    while let Some(edge) = edges.pop() {
        iterations += 1;
        if iterations > cap {
            warn!(
                remaining = edges.len(),
                "Edge legalization exceeded its iteration cap, triangulation may not be Delaunay"
            );
            edges.clear();
            break;
        }
        if let Some(quad) = try_flip(dcel, edge.symedge(0), epsilon) {
            edges.extend(quad.iter().map(|s| s.as_edge()));
        }
    }
}

/// Flips the edge of `symedge` if the apex of the triangle right of it lies inside the
/// circumcircle of the triangle left of it.
///
/// Returns the four outer edges of the quadrilateral around the flipped edge, in the
/// order `s.next, s.next.next, t.next, t.next.next` with `t` being `s.sym()` before the
/// flip.
fn try_flip(
    dcel: &mut Dcel,
    symedge: FixedSymEdgeHandle,
    epsilon: f64,
) -> Option<[FixedSymEdgeHandle; 4]> {
    let edge = symedge.as_edge();
    if dcel.is_deleted(edge) || dcel.is_constrained(edge) || dcel.is_border_edge(edge) {
        return None;
    }

    let t = symedge.sym();
    let sn = dcel.next(symedge);
    let sn2 = dcel.next(sn);
    let tn = dcel.next(t);
    let tn2 = dcel.next(tn);
    if dcel.next(sn2) != symedge || dcel.next(tn2) != t {
        // Not a pair of triangles
        return None;
    }

    let a = dcel.origin_position(symedge);
    let b = dcel.origin_position(t);
    let c = dcel.origin_position(sn2);
    let d = dcel.origin_position(tn2);
    if !math::in_circumcircle(a, b, c, d, epsilon) {
        return None;
    }
    trace!(edge = edge.index(), "Flipping edge");
    flip(dcel, symedge);
    Some([sn, sn2, tn, tn2])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delaunay_core::dcel_operations::new_with_frame;
    use crate::delaunay_core::hint_generator::RandomSampleHintGenerator;
    use crate::test_utilities::{random_points_in_range, SEED, SEED2};

    const EPSILON: f64 = 1e-8;

    fn frame() -> Dcel {
        new_with_frame(Point2::new(-2.0, -2.0), Point2::new(2.0, 2.0))
    }

    #[test]
    fn test_insert_point_in_face() {
        let mut dcel = frame();
        let triangle = dcel.face(dcel.inner_faces().next().unwrap()).symedge.unwrap();
        let [a, b, c] = dcel.triangle_positions(triangle);
        let center = a.add(b).add(c).mul(1.0 / 3.0);
        let v = insert_point_in_face(&mut dcel, triangle, center, EPSILON);
        dcel.sanity_check();
        dcel.check_triangles();
        assert_eq!(dcel.vertex_fan(v).count(), 4);
        assert_eq!(dcel.inner_faces().count(), 4);
        assert_eq!(dcel.euler_characteristic(), 2);
        dcel.check_delaunay(EPSILON);
    }

    #[test]
    fn test_insert_point_in_edge() {
        let mut dcel = frame();
        let diagonal = dcel
            .find_symedge_between(new_fixed_vertex_handle(0), new_fixed_vertex_handle(2))
            .unwrap();
        let v = insert_point_in_edge(&mut dcel, diagonal, 0.5, EPSILON);
        dcel.sanity_check();
        dcel.check_triangles();
        assert_eq!(dcel.position(v), Point2::new(0.0, 0.0));
        assert_eq!(dcel.vertex_fan(v).count(), 4);
        assert_eq!(dcel.inner_faces().count(), 4);
        assert_eq!(dcel.euler_characteristic(), 2);
    }

    #[test]
    fn test_insert_merges_close_vertices() {
        let mut dcel = frame();
        let mut hint_generator = RandomSampleHintGenerator::default();
        let first = insert_vertex(&mut dcel, &mut hint_generator, Point2::new(0.3, 0.1), EPSILON);
        let second = insert_vertex(
            &mut dcel,
            &mut hint_generator,
            Point2::new(0.3 + 1e-10, 0.1),
            EPSILON,
        );
        assert!(matches!(first, InsertionOutcome::Created(_)));
        assert_eq!(second, InsertionOutcome::Merged(first.vertex()));
        assert_eq!(dcel.num_vertices(), 5);
    }

    #[test]
    fn test_insert_random_points_is_delaunay() {
        let mut dcel = frame();
        let mut hint_generator = RandomSampleHintGenerator::default();
        for point in random_points_in_range(1.5, 300, SEED) {
            insert_vertex(&mut dcel, &mut hint_generator, point, EPSILON);
        }
        dcel.sanity_check();
        dcel.check_triangles();
        dcel.check_delaunay(EPSILON);
        assert_eq!(dcel.num_vertices(), 304);
        assert_eq!(dcel.euler_characteristic(), 2);
    }

    #[test]
    fn test_insert_grid_points() {
        // Many cocircular and collinear points
        let mut dcel = frame();
        let mut hint_generator = RandomSampleHintGenerator::default();
        for x in -5..=5 {
            for y in -5..=5 {
                let position = Point2::new(x as f64 * 0.3, y as f64 * 0.3);
                insert_vertex(&mut dcel, &mut hint_generator, position, EPSILON);
            }
        }
        dcel.sanity_check();
        dcel.check_triangles();
        dcel.check_delaunay(EPSILON);
        assert_eq!(dcel.num_vertices(), 4 + 121);
    }

    #[test]
    fn test_insertion_is_deterministic() {
        let points = random_points_in_range(1.0, 100, SEED2);
        let build = || {
            let mut dcel = frame();
            let mut hint_generator = RandomSampleHintGenerator::with_seed(3);
            for point in &points {
                insert_vertex(&mut dcel, &mut hint_generator, *point, EPSILON);
            }
            dcel.live_edges()
                .map(|edge| {
                    let symedge = edge.symedge(0);
                    (dcel.origin(symedge), dcel.dest(symedge))
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
