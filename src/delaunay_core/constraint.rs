use smallvec::SmallVec;
use tracing::{trace, warn};

use super::dcel::Dcel;
use super::dcel_operations::{add_diagonal, add_edge_input_id, delete_edge, split_edge};
use super::handles::*;
use super::insertion::legalize_edges;
use super::math::{self, SegmentIntersection};
use crate::Point2;

/// Upper bound for the number of crossings recorded while walking a single constraint.
pub const CROSSING_ITERATION_CAP: usize = 100_000;

/// A point on the path of a constraint edge.
///
/// A crossing either lands on a vertex (`lambda == 0`) or passes through the interior of
/// an edge at `lambda` along `in_edge`.
///
/// For a vertex crossing, `in_edge` is the symedge leaving the vertex into the face the
/// path came through. It is `None` for the first crossing and whenever the path arrived
/// along an existing edge. `out_edge` leaves the vertex into the face the path continues
/// through, or leads directly to the next vertex crossing.
///
/// For an edge crossing, `in_edge` is the crossed symedge as seen from the face before
/// the crossing. `vertex` is filled in once a constrained edge is split at the crossing.
#[derive(Clone, Copy, Debug)]
struct Crossing {
    lambda: f64,
    vertex: Option<FixedVertexHandle>,
    in_edge: Option<FixedSymEdgeHandle>,
    out_edge: Option<FixedSymEdgeHandle>,
    deleted: bool,
}

impl Crossing {
    fn at_vertex(vertex: FixedVertexHandle, in_edge: Option<FixedSymEdgeHandle>) -> Self {
        Crossing {
            lambda: 0.0,
            vertex: Some(vertex),
            in_edge,
            out_edge: None,
            deleted: false,
        }
    }

    fn through_edge(lambda: f64, in_edge: FixedSymEdgeHandle) -> Self {
        Crossing {
            lambda,
            vertex: None,
            in_edge: Some(in_edge),
            out_edge: None,
            deleted: false,
        }
    }

    fn is_vertex(&self) -> bool {
        self.lambda == 0.0
    }
}

/// Inserts a constraint edge from `from` to `to`, tagging every edge on the path with
/// `input_id`.
///
/// Edges crossed by the new segment are removed, unless they are constrained themselves.
/// Constrained edges are split at the intersection instead. The regions left open on
/// both sides of the path are re-triangulated.
///
/// Returns the edges from `from` to `to` in path order. Existing edges that lie on the
/// path are reused and returned as well.
pub fn insert_constraint(
    dcel: &mut Dcel,
    from: FixedVertexHandle,
    to: FixedVertexHandle,
    input_id: usize,
    epsilon: f64,
) -> Vec<FixedEdgeHandle> {
    if from == to {
        return Vec::new();
    }
    if let Some(existing) = dcel.find_symedge_between(from, to) {
        let edge = existing.as_edge();
        add_edge_input_id(dcel, edge, input_id);
        return vec![edge];
    }

    let Some(mut crossings) = find_crossings(dcel, from, to, epsilon) else {
        warn!(
            from = from.index(),
            to = to.index(),
            input_id,
            "Could not trace constraint edge, skipping it"
        );
        return Vec::new();
    };
    trace!(input_id, crossings = crossings.len(), "Found constraint crossings");

    if !remove_detours(dcel, &mut crossings) {
        warn!(
            from = from.index(),
            to = to.index(),
            input_id,
            "Could not clean up constraint crossings, skipping it"
        );
        return Vec::new();
    }

    // Every triangle of the re-triangulated region has its corners in this set
    let mut touched: Vec<FixedVertexHandle> = Vec::with_capacity(crossings.len() * 2);
    for crossing in crossings.iter_mut() {
        if crossing.deleted {
            continue;
        }
        if crossing.is_vertex() {
            touched.extend(crossing.vertex);
            continue;
        }
        let Some(in_edge) = crossing.in_edge else {
            continue;
        };
        touched.push(dcel.origin(in_edge));
        touched.push(dcel.dest(in_edge));
        if dcel.is_constrained(in_edge.as_edge()) {
            let new_edge = split_edge(dcel, in_edge, crossing.lambda);
            let vertex = dcel.origin(new_edge.symedge(0));
            crossing.vertex = Some(vertex);
            touched.push(vertex);
        }
    }

    for crossing in &crossings {
        if crossing.is_vertex() || crossing.deleted {
            continue;
        }
        let Some(in_edge) = crossing.in_edge else {
            continue;
        };
        if !dcel.is_constrained(in_edge.as_edge()) {
            delete_edge(dcel, in_edge);
        }
    }

    let result = connect_crossings(dcel, &crossings, input_id);
    legalize_around(dcel, touched, epsilon);
    result
}

/// Flips unconstrained edges near `vertices` until they are Delaunay again.
///
/// All edges of the triangles around each vertex are checked, which includes the
/// boundary of any region that was re-triangulated.
fn legalize_around(dcel: &mut Dcel, mut vertices: Vec<FixedVertexHandle>, epsilon: f64) {
    vertices.sort_unstable();
    vertices.dedup();
    let mut edges = Vec::new();
    for vertex in vertices {
        for symedge in dcel.vertex_fan(vertex) {
            edges.push(symedge.as_edge());
            edges.push(dcel.next(symedge).as_edge());
        }
    }
    edges.sort_unstable();
    edges.dedup();
    trace!(edges = edges.len(), "Legalizing edges around constraint");
    legalize_edges(dcel, &mut edges, epsilon);
}

/// Walks from `from` to `to` and records every vertex and edge the segment passes.
///
/// Returns `None` if the walk gets stuck or revisits a vertex.
fn find_crossings(
    dcel: &mut Dcel,
    from: FixedVertexHandle,
    to: FixedVertexHandle,
    epsilon: f64,
) -> Option<Vec<Crossing>> {
    let epoch = dcel.next_visit_epoch();
    let mut crossings = vec![Crossing::at_vertex(from, None)];

    loop {
        let last_index = crossings.len() - 1;
        let last = crossings[last_index];
        if last.is_vertex() && last.vertex == Some(to) {
            return Some(crossings);
        }
        if crossings.len() >= CROSSING_ITERATION_CAP {
            warn!(
                cap = CROSSING_ITERATION_CAP,
                "Constraint walk exceeded its iteration cap"
            );
            return None;
        }

        let next = if last.is_vertex() {
            next_crossing_from_vertex(dcel, &mut crossings[last_index], to, epsilon)?
        } else {
            next_crossing_from_edge(dcel, &mut crossings[last_index], to, epsilon)?
        };

        if next.is_vertex() {
            let vertex = next.vertex?;
            let entry = dcel.vertex_mut(vertex);
            if entry.visit_index == epoch {
                trace!(vertex = vertex.index(), "Constraint walk revisited a vertex");
                return None;
            }
            entry.visit_index = epoch;
        }
        crossings.push(next);
    }
}

/// Rotates around the vertex of `current` to find the wedge or edge the segment leaves
/// through.
fn next_crossing_from_vertex(
    dcel: &Dcel,
    current: &mut Crossing,
    to: FixedVertexHandle,
    epsilon: f64,
) -> Option<Crossing> {
    let vertex = current.vertex?;
    let origin = dcel.position(vertex);
    let target = dcel.position(to);

    for t in dcel.vertex_fan(vertex) {
        let a = dcel.next(t);
        let va = dcel.origin(a);
        let vb = dcel.origin(dcel.next(a));
        let orient_a = math::orient2d(origin, dcel.position(va), target);
        if orient_a == 0.0 && math::in_line(origin, dcel.position(va), target) {
            return Some(through_vertex(dcel, va, t, current));
        }
        if !dcel.is_outer(dcel.face_of(t)) {
            // The ray lying exactly on `vb` is handled by the next rotation
            let orient_b = math::orient2d(origin, dcel.position(vb), target);
            if orient_a > 0.0 && orient_b < 0.0 {
                return Some(intersect(dcel, origin, target, a, current, epsilon));
            }
        }
    }
    None
}

/// Continues a walk that passed through the interior of an edge into the triangle on the
/// other side.
///
/// ```text
///            vc
///          /    \
///        /        \
///      va --------> vb
///           ^ in_edge.sym
/// ```
fn next_crossing_from_edge(
    dcel: &Dcel,
    current: &mut Crossing,
    to: FixedVertexHandle,
    epsilon: f64,
) -> Option<Crossing> {
    let in_edge = current.in_edge?;
    let va = dcel.origin_position(in_edge);
    let vb = dcel.dest_position(in_edge);
    let position = va.lerp(vb, current.lambda);
    let target = dcel.position(to);

    let se_ac = dcel.next(in_edge.sym());
    let se_cb = dcel.next(se_ac);
    let vc = dcel.origin(se_cb);
    let orientation = math::orient2d(position, target, dcel.position(vc));
    let next = if orientation < 0.0 {
        intersect(dcel, position, target, se_cb, current, epsilon)
    } else if orientation > 0.0 {
        intersect(dcel, position, target, se_ac, current, epsilon)
    } else {
        Crossing::at_vertex(vc, Some(se_cb))
    };
    Some(next)
}

/// Records that the path continues through vertex `vertex`.
///
/// `out_edge` leads from the current vertex to `vertex` and is only used if the current
/// crossing is a vertex crossing.
fn through_vertex(
    dcel: &Dcel,
    vertex: FixedVertexHandle,
    out_edge: FixedSymEdgeHandle,
    current: &mut Crossing,
) -> Crossing {
    if current.is_vertex() {
        current.out_edge = Some(out_edge);
        return Crossing::at_vertex(vertex, None);
    }
    // One edge of the triangle behind the crossed edge starts at `vertex`
    let in_edge = current.in_edge.map(|in_edge| {
        dcel.face_cycle(in_edge.sym())
            .find(|s| dcel.origin(*s) == vertex)
            .unwrap_or(in_edge.sym())
    });
    Crossing::at_vertex(vertex, in_edge)
}

/// Intersects the path from `position` to `target` with the edge of symedge `t` and
/// records the result.
///
/// Intersections within `epsilon` of an edge endpoint snap to that endpoint.
fn intersect(
    dcel: &Dcel,
    position: Point2<f64>,
    target: Point2<f64>,
    t: FixedSymEdgeHandle,
    current: &mut Crossing,
    epsilon: f64,
) -> Crossing {
    let t_next = dcel.next(t);
    let se_vcva = dcel.next(t_next);
    let se_vcvb = t_next.sym();
    let va = dcel.origin(t);
    let vb = dcel.origin(t_next);
    let pa = dcel.position(va);
    let pb = dcel.position(vb);

    let through_edge = |lambda: f64, current: &mut Crossing| {
        if current.is_vertex() {
            current.out_edge = Some(se_vcva);
        }
        Crossing::through_edge(lambda, t)
    };

    match math::segment_intersection(pa, pb, position, target) {
        SegmentIntersection::Cross { lambda, .. } => {
            let length = pa.distance_2(pb).sqrt();
            if lambda * length <= epsilon {
                through_vertex(dcel, va, se_vcva, current)
            } else if (1.0 - lambda) * length <= epsilon {
                through_vertex(dcel, vb, se_vcvb, current)
            } else {
                through_edge(lambda, current)
            }
        }
        SegmentIntersection::Exact { lambda, .. } => {
            if lambda == 0.0 {
                through_vertex(dcel, va, se_vcva, current)
            } else if lambda == 1.0 {
                through_vertex(dcel, vb, se_vcvb, current)
            } else {
                through_edge(lambda, current)
            }
        }
        SegmentIntersection::None { lambda, .. } => {
            // Numerically the path must pass very close to one of the endpoints
            if lambda <= 0.5 {
                through_vertex(dcel, va, se_vcva, current)
            } else {
                through_vertex(dcel, vb, se_vcvb, current)
            }
        }
        SegmentIntersection::Collinear => {
            if pa.distance_2(target) <= pb.distance_2(target) {
                through_vertex(dcel, va, se_vcva, current)
            } else {
                through_vertex(dcel, vb, se_vcvb, current)
            }
        }
    }
}

/// Removes edge crossings that are directly followed by one of the crossed edge's
/// endpoints. The path then goes straight from the previous crossing to that vertex.
///
/// Returns `false` if the entering or exiting symedges around a removed stretch cannot
/// be re-derived.
fn remove_detours(dcel: &Dcel, crossings: &mut [Crossing]) -> bool {
    for i in 2..crossings.len() {
        if !crossings[i].is_vertex() {
            continue;
        }
        let Some(vertex) = crossings[i].vertex else {
            continue;
        };

        let mut j = i - 1;
        while j > 0 {
            let previous = crossings[j];
            let keep = if previous.is_vertex() {
                previous.vertex != Some(vertex)
            } else {
                previous.in_edge.map_or(true, |in_edge| {
                    dcel.origin(in_edge) != vertex && dcel.dest(in_edge) != vertex
                })
            };
            if keep {
                break;
            }
            crossings[j].deleted = true;
            trace!(crossing = j, "Removed constraint crossing");
            j -= 1;
        }

        if j < i - 1 {
            let previous = crossings[j];
            if previous.is_vertex() {
                let Some(from) = previous.vertex else {
                    return false;
                };
                let Some(symedge) = dcel.find_symedge_between(from, vertex) else {
                    return false;
                };
                crossings[j].out_edge = Some(symedge);
                crossings[i].in_edge = None;
            } else {
                let Some(in_edge) = previous.in_edge else {
                    return false;
                };
                let face = dcel.face_of(in_edge.sym());
                let Some(symedge) = dcel.find_symedge_with_face(vertex, face) else {
                    return false;
                };
                crossings[i].in_edge = Some(symedge);
            }
        }
    }
    true
}

/// Inserts the diagonals between consecutive crossings once all crossed edges have been
/// removed or split.
fn connect_crossings(
    dcel: &mut Dcel,
    crossings: &[Crossing],
    input_id: usize,
) -> Vec<FixedEdgeHandle> {
    let mut result = Vec::new();
    let mut start = crossings[0].out_edge;

    for (i, crossing) in crossings.iter().enumerate().skip(1) {
        if crossing.deleted {
            continue;
        }

        let mut target = None;
        let mut next_start = None;
        if !crossing.is_vertex() {
            let split = crossing
                .in_edge
                .map_or(false, |in_edge| dcel.is_constrained(in_edge.as_edge()));
            if split {
                target = crossing.vertex.and_then(|v| dcel.vertex(v).symedge);
                next_start = target.map(|t| dcel.next(t.sym()));
            }
        } else {
            target = crossing.in_edge;
            next_start = crossing.out_edge;
            if target.is_none() {
                // The path arrived along an existing edge
                let previous = crossings[..i].iter().rev().find(|c| !c.deleted);
                if let Some(out_edge) = previous.and_then(|c| c.out_edge) {
                    let edge = out_edge.as_edge();
                    add_edge_input_id(dcel, edge, input_id);
                    result.push(edge);
                }
            }
        }

        if let Some(target) = target {
            let Some(from) = start else {
                warn!(input_id, "Constraint path lost its start edge");
                return result;
            };
            let Some(edge) = connect(dcel, from, target) else {
                warn!(input_id, "Could not insert constraint diagonal");
                return result;
            };
            add_edge_input_id(dcel, edge, input_id);
            result.push(edge);
            re_delaunay_triangulate(dcel, edge.symedge(0));
            re_delaunay_triangulate(dcel, edge.symedge(1));
        }

        if i < crossings.len() - 1 && next_start.is_some() {
            start = next_start;
        }
    }
    result
}

fn connect(
    dcel: &mut Dcel,
    from: FixedSymEdgeHandle,
    to: FixedSymEdgeHandle,
) -> Option<FixedEdgeHandle> {
    if dcel.dest(from) == dcel.origin(to) {
        return Some(from.as_edge());
    }
    if let Some(existing) = dcel.find_symedge_between(dcel.origin(from), dcel.origin(to)) {
        return Some(existing.as_edge());
    }
    if dcel.face_of(from) != dcel.face_of(to) || dcel.next(to) == from {
        return None;
    }
    Some(add_diagonal(dcel, from, to))
}

/// Triangulates the polygon left of `base` such that its triangles are as close to
/// Delaunay as the polygon boundary allows.
///
/// For a base edge `a b`, the apex `c` is the polygon vertex whose circumcircle with `a b`
/// contains no other polygon vertex. The sub-polygons between `b c` and `c a` are
/// triangulated the same way.
pub fn re_delaunay_triangulate(dcel: &mut Dcel, base: FixedSymEdgeHandle) {
    let mut stack: SmallVec<[FixedSymEdgeHandle; 8]> = SmallVec::new();
    stack.push(base);

    while let Some(se) = stack.pop() {
        if dcel.is_outer(dcel.face_of(se)) || dcel.is_outer(dcel.face_of(se.sym())) {
            continue;
        }
        if dcel.face_cycle(se).nth(3).is_none() {
            continue;
        }

        let se_next = dcel.next(se);
        let first = dcel.next(se_next);
        let a = dcel.origin(se);
        let b = dcel.origin(se_next);
        let [pa, pb] = [dcel.position(a), dcel.position(b)];
        let mut c = dcel.origin(first);
        let mut apex = first;

        let mut current = dcel.next(first);
        while current != se {
            let v = dcel.origin(current);
            if math::incircle(pa, pb, dcel.position(c), dcel.position(v)) > 0.0 {
                c = v;
                apex = current;
            }
            current = dcel.next(current);
        }

        let bc = if dcel.find_symedge_between(b, c).is_none() {
            Some(add_diagonal(dcel, se_next, apex))
        } else {
            None
        };
        let ca = if dcel.find_symedge_between(c, a).is_none() {
            Some(add_diagonal(dcel, apex, se))
        } else {
            None
        };

        if let Some(ca) = ca {
            stack.push(ca.symedge(1));
        }
        if let Some(bc) = bc {
            stack.push(bc.symedge(1));
        }
    }
}
