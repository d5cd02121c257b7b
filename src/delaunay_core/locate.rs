use tracing::warn;

use super::dcel::Dcel;
use super::handles::*;
use super::math::{self, SegmentIntersection};
use crate::Point2;

/// Upper bound for the number of triangles visited by a single walk.
pub const LOCATE_ITERATION_CAP: usize = 1_000_000;

/// Describes a position in a triangulation.
///
/// The position is set in relation to the triangulation's vertices, edges and faces.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PositionInTriangulation {
    /// A position lies within `epsilon` of an existing vertex.
    OnVertex(FixedVertexHandle),

    /// A position lies within `epsilon` of the interior of an edge. The value is the
    /// parametric position along the given symedge, strictly between 0 and 1.
    OnEdge(FixedSymEdgeHandle, f64),

    /// A position lies in the interior of the triangle left of the given symedge.
    OnFace(FixedSymEdgeHandle),
}

/// Finds the triangle, edge or vertex at `position`, starting the walk at `start`.
///
/// `position` must lie inside of the frame.
pub fn locate(
    dcel: &mut Dcel,
    start: FixedVertexHandle,
    position: Point2<f64>,
    epsilon: f64,
) -> PositionInTriangulation {
    let Some(mut current) = start_symedge(dcel, start) else {
        warn!(?start, "Walk start vertex is not connected, scanning all faces");
        return desperation_fallback(dcel, None, position, epsilon);
    };

    let epoch = dcel.next_visit_epoch();
    for _ in 0..LOCATE_ITERATION_CAP {
        let face = dcel.face_of(current);
        dcel.face_mut(face).visit_index = epoch;
        let centroid = dcel.face(face).centroid;

        let mut any_violated = false;
        let mut chosen = None;
        for symedge in triangle_symedges(dcel, current) {
            if !is_violated(dcel, symedge, position) {
                continue;
            }
            any_violated = true;
            let neighbor = dcel.face_of(symedge.sym());
            if dcel.is_outer(neighbor) || dcel.face(neighbor).visit_index == epoch {
                continue;
            }
            // Prefer the edge that the line from the centroid to the target passes through
            let crossed = matches!(
                math::segment_intersection(
                    centroid,
                    position,
                    dcel.origin_position(symedge),
                    dcel.dest_position(symedge),
                ),
                SegmentIntersection::Cross { .. } | SegmentIntersection::Exact { .. }
            );
            if crossed {
                chosen = Some(symedge);
                break;
            }
            if chosen.is_none() {
                chosen = Some(symedge);
            }
        }

        if !any_violated {
            return classify(dcel, current, position, epsilon);
        }

        match chosen {
            Some(symedge) => current = symedge.sym(),
            None => return neighbor_fallback(dcel, current, position, epsilon),
        }
    }

    warn!(
        x = position.x,
        y = position.y,
        "Point location exceeded its iteration cap"
    );
    desperation_fallback(dcel, Some(current), position, epsilon)
}

fn start_symedge(dcel: &Dcel, start: FixedVertexHandle) -> Option<FixedSymEdgeHandle> {
    if start.index() >= dcel.num_vertices() {
        return None;
    }
    dcel.vertex_fan(start)
        .find(|symedge| !dcel.is_outer(dcel.face_of(*symedge)))
}

fn triangle_symedges(dcel: &Dcel, symedge: FixedSymEdgeHandle) -> [FixedSymEdgeHandle; 3] {
    let next = dcel.next(symedge);
    [symedge, next, dcel.next(next)]
}

/// Returns `true` if `position` lies strictly right of `symedge`.
fn is_violated(dcel: &Dcel, symedge: FixedSymEdgeHandle, position: Point2<f64>) -> bool {
    math::orient2d(
        dcel.origin_position(symedge),
        dcel.dest_position(symedge),
        position,
    ) < 0.0
}

fn contains(dcel: &Dcel, symedge: FixedSymEdgeHandle, position: Point2<f64>) -> bool {
    triangle_symedges(dcel, symedge)
        .into_iter()
        .all(|s| !is_violated(dcel, s, position))
}

/// Classifies a position that lies inside or on the border of a triangle.
pub(crate) fn classify(
    dcel: &Dcel,
    symedge: FixedSymEdgeHandle,
    position: Point2<f64>,
    epsilon: f64,
) -> PositionInTriangulation {
    let epsilon_2 = epsilon * epsilon;
    let corners = triangle_symedges(dcel, symedge);
    for corner in corners {
        if dcel.origin_position(corner).distance_2(position) <= epsilon_2 {
            return PositionInTriangulation::OnVertex(dcel.origin(corner));
        }
    }
    for edge in corners {
        let from = dcel.origin_position(edge);
        let to = dcel.dest_position(edge);
        if math::line_distance_2(from, to, position) <= epsilon_2 {
            let lambda = math::project_point(from, to, position).relative_position();
            if lambda > 0.0 && lambda < 1.0 {
                return PositionInTriangulation::OnEdge(edge, lambda);
            }
        }
    }
    PositionInTriangulation::OnFace(symedge)
}

/// Used when the walk got stuck because every violated edge leads to a visited face.
fn neighbor_fallback(
    dcel: &Dcel,
    current: FixedSymEdgeHandle,
    position: Point2<f64>,
    epsilon: f64,
) -> PositionInTriangulation {
    for symedge in triangle_symedges(dcel, current) {
        let neighbor = symedge.sym();
        if dcel.is_outer(dcel.face_of(neighbor)) {
            continue;
        }
        if contains(dcel, neighbor, position) {
            return classify(dcel, neighbor, position, epsilon);
        }
    }
    desperation_fallback(dcel, Some(current), position, epsilon)
}

/// Last resort for a walk that did not find its target.
///
/// First, all triangles are scanned. If none contains `position` (which only happens for
/// a broken triangulation), the closest edge or vertex of `current` is returned. This is
/// deliberately approximate.
pub(crate) fn desperation_fallback(
    dcel: &Dcel,
    current: Option<FixedSymEdgeHandle>,
    position: Point2<f64>,
    epsilon: f64,
) -> PositionInTriangulation {
    warn!(
        x = position.x,
        y = position.y,
        "Point location fell back to an exhaustive search"
    );
    if let Some(found) = locate_exhaustive(dcel, position) {
        return classify(dcel, found, position, epsilon);
    }

    let current = current.or_else(|| {
        dcel.inner_faces()
            .find_map(|face| dcel.face(face).symedge)
    });
    let Some(current) = current else {
        return PositionInTriangulation::OnVertex(new_fixed_vertex_handle(0));
    };
    least_bad_position(dcel, current, position)
}

fn locate_exhaustive(dcel: &Dcel, position: Point2<f64>) -> Option<FixedSymEdgeHandle> {
    dcel.inner_faces()
        .filter_map(|face| dcel.face(face).symedge)
        .find(|symedge| contains(dcel, *symedge, position))
}

/// Picks the closest edge of a triangle. The position is projected onto the edge's interior,
/// or snapped to the closest endpoint if its projection falls outside.
pub(crate) fn least_bad_position(
    dcel: &Dcel,
    current: FixedSymEdgeHandle,
    position: Point2<f64>,
) -> PositionInTriangulation {
    let mut best_edge = current;
    let mut best_distance = f64::INFINITY;
    for symedge in triangle_symedges(dcel, current) {
        let distance = math::distance_2(
            dcel.origin_position(symedge),
            dcel.dest_position(symedge),
            position,
        );
        if distance < best_distance {
            best_distance = distance;
            best_edge = symedge;
        }
    }

    let lambda = math::project_point(
        dcel.origin_position(best_edge),
        dcel.dest_position(best_edge),
        position,
    )
    .relative_position();
    if lambda <= 0.0 {
        PositionInTriangulation::OnVertex(dcel.origin(best_edge))
    } else if lambda >= 1.0 {
        PositionInTriangulation::OnVertex(dcel.dest(best_edge))
    } else {
        PositionInTriangulation::OnEdge(best_edge, lambda)
    }
}
