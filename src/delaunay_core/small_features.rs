use std::collections::VecDeque;

use tracing::{debug, trace};

use super::dcel::Dcel;
use super::dcel_operations::collapse_edge;
use super::handles::*;
use super::math;

/// Collapses all edges not longer than `epsilon`, as long as this keeps every triangle
/// positively oriented.
///
/// Of the two endpoints, the one with the lower index is kept if possible. A vertex
/// carrying input ids is never merged into a vertex without any. Edges around a kept
/// vertex are checked again after each collapse.
///
/// Returns the number of collapsed edges.
pub fn remove_small_features(dcel: &mut Dcel, epsilon: f64) -> usize {
    let epsilon_2 = epsilon * epsilon;
    let mut queued = vec![false; dcel.num_edges()];
    let mut queue = VecDeque::new();

    let enqueue = |dcel: &Dcel,
                   queue: &mut VecDeque<FixedEdgeHandle>,
                   queued: &mut Vec<bool>,
                   edge: FixedEdgeHandle| {
        if dcel.is_deleted(edge) || queued[edge.index()] {
            return;
        }
        if dcel.edge_length_2(edge) <= epsilon_2 {
            queued[edge.index()] = true;
            queue.push_back(edge);
        }
    };

    for edge in dcel.live_edges() {
        enqueue(dcel, &mut queue, &mut queued, edge);
    }
    if queue.is_empty() {
        return 0;
    }
    debug!(tiny_edges = queue.len(), "Found tiny edges");

    let mut collapsed = 0;
    while let Some(edge) = queue.pop_front() {
        queued[edge.index()] = false;
        if dcel.is_deleted(edge) {
            continue;
        }
        let Some(kept) = collapse_tiny_edge(dcel, edge) else {
            continue;
        };
        collapsed += 1;
        let spokes: Vec<_> = dcel.vertex_fan(kept).map(|s| s.as_edge()).collect();
        for spoke in spokes {
            enqueue(dcel, &mut queue, &mut queued, spoke);
        }
    }
    collapsed
}

fn has_input_ids(dcel: &Dcel, vertex: FixedVertexHandle) -> bool {
    !dcel.vertex(vertex).input_ids.is_empty()
}

/// Collapses `edge` in the first allowed direction and returns the remaining vertex.
fn collapse_tiny_edge(dcel: &mut Dcel, edge: FixedEdgeHandle) -> Option<FixedVertexHandle> {
    let s = edge.symedge(0);
    let candidates = if dcel.origin(s) < dcel.dest(s) {
        [s, s.sym()]
    } else {
        [s.sym(), s]
    };
    for candidate in candidates {
        let kept = dcel.origin(candidate);
        let removed = dcel.dest(candidate);
        if has_input_ids(dcel, removed) && !has_input_ids(dcel, kept) {
            continue;
        }
        if !can_collapse(dcel, candidate) {
            continue;
        }
        trace!(
            kept = kept.index(),
            removed = removed.index(),
            "Collapsing tiny edge"
        );
        return Some(collapse_edge(dcel, candidate));
    }
    trace!(edge = edge.index(), "Tiny edge cannot be collapsed");
    None
}

/// Returns `true` if the destination of `symedge` can be merged into its origin.
///
/// ```text
///        c
///      /   \
///    a --s--> b
///      \   /
///        d
/// ```
/// Both triangles next to `s` must be inner triangles, `b` must not touch the outer
/// face and `a` and `b` may only share the neighbors `c` and `d`. Every triangle around
/// `b` except the two removed ones must stay positively oriented once `b` is moved onto
/// `a`.
pub(crate) fn can_collapse(dcel: &Dcel, symedge: FixedSymEdgeHandle) -> bool {
    let s = symedge;
    let t = s.sym();
    if dcel.is_deleted(s.as_edge()) {
        return false;
    }
    for side in [s, t] {
        if dcel.is_outer(dcel.face_of(side)) || dcel.face_cycle(side).count() != 3 {
            return false;
        }
    }

    let b = dcel.origin(t);
    if dcel.vertex_fan(b).any(|spoke| dcel.is_outer(dcel.face_of(spoke))) {
        return false;
    }

    let a = dcel.origin(s);
    let c = dcel.origin(dcel.next(dcel.next(s)));
    let d = dcel.origin(dcel.next(dcel.next(t)));
    let shares_other_neighbor = dcel.vertex_fan(b).any(|spoke| {
        let neighbor = dcel.dest(spoke);
        neighbor != a
            && neighbor != c
            && neighbor != d
            && dcel.find_symedge_between(a, neighbor).is_some()
    });
    if shares_other_neighbor {
        return false;
    }

    let target = dcel.position(a);
    let mut spoke = dcel.rot(t);
    while spoke != t && dcel.rot(spoke) != t {
        let next = dcel.rot(spoke);
        let orientation = math::orient2d(
            target,
            dcel.dest_position(spoke),
            dcel.dest_position(next),
        );
        if orientation <= 0.0 {
            return false;
        }
        spoke = next;
    }
    true
}
