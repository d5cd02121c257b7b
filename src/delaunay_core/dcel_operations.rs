use super::dcel::{
    add_input_id, merge_input_ids, Dcel, EdgeEntry, FaceEntry, InputIds, SymEdgeEntry,
    VertexEntry,
};
use super::handles::*;
use crate::Point2;

pub const OUTER_FACE_HANDLE: FixedFaceHandle = new_fixed_face_handle(0);

/// The corners of the frame are always the first vertices of a mesh.
pub const FRAME_VERTEX_COUNT: usize = 4;

/// Creates a mesh consisting of the rectangle `min..max` split into two triangles.
///
/// ```text
/// v3 <----------- v2
///  |  f2        / ^
///  |          /   |
///  |        /     |
///  |      /       |
///  V    /      f1 |
/// v0 -----------> v1
/// ```
/// The corners become vertices 0 to 3. The diagonal `v0 -> v2` is the last edge.
pub fn new_with_frame(min: Point2<f64>, max: Point2<f64>) -> Dcel {
    let mut dcel = Dcel::empty();
    let v0 = add_vertex(&mut dcel, min);
    let v1 = add_vertex(&mut dcel, Point2::new(max.x, min.y));
    let v2 = add_vertex(&mut dcel, max);
    let v3 = add_vertex(&mut dcel, Point2::new(min.x, max.y));

    let outer = OUTER_FACE_HANDLE;
    let f1 = add_face(&mut dcel);
    let f2 = add_face(&mut dcel);

    let e0 = add_edge(&mut dcel, v0, v1, f1, outer);
    let e1 = add_edge(&mut dcel, v1, v2, f1, outer);
    let e2 = add_edge(&mut dcel, v2, v3, f2, outer);
    let e3 = add_edge(&mut dcel, v3, v0, f2, outer);
    let diagonal = add_edge(&mut dcel, v0, v2, f2, f1);

    let cycles: [&[FixedSymEdgeHandle]; 3] = [
        // f1
        &[e0.symedge(0), e1.symedge(0), diagonal.symedge(1)],
        // f2
        &[diagonal.symedge(0), e2.symedge(0), e3.symedge(0)],
        // Outer face, clockwise when seen from inside the rectangle
        &[e0.symedge(1), e3.symedge(1), e2.symedge(1), e1.symedge(1)],
    ];

    for cycle in cycles {
        for (index, symedge) in cycle.iter().enumerate() {
            let next = cycle[(index + 1) % cycle.len()];
            dcel.symedge_mut(*symedge).next = next;
        }
    }

    // rot(next(s)) == sym(s) fully determines the vertex fans
    for edge in 0..dcel.num_edges() {
        for side in 0..2 {
            let symedge = FixedEdgeHandle::new(edge).symedge(side);
            let next = dcel.next(symedge);
            dcel.symedge_mut(next).rot = symedge.sym();
        }
    }

    dcel.face_mut(outer).symedge = Some(e0.symedge(1));
    dcel.face_mut(f1).symedge = Some(e0.symedge(0));
    dcel.face_mut(f2).symedge = Some(diagonal.symedge(0));
    dcel.recompute_centroid(f1);
    dcel.recompute_centroid(f2);
    dcel
}

pub fn add_vertex(dcel: &mut Dcel, position: Point2<f64>) -> FixedVertexHandle {
    let handle = FixedVertexHandle::new(dcel.vertices.len());
    dcel.vertices.push(VertexEntry {
        position,
        symedge: None,
        input_ids: InputIds::new(),
        visit_index: 0,
        merged_into: None,
    });
    handle
}

pub fn add_face(dcel: &mut Dcel) -> FixedFaceHandle {
    let handle = FixedFaceHandle::new(dcel.faces.len());
    dcel.faces.push(FaceEntry::new());
    handle
}

/// Creates an edge from `v1` to `v2`.
///
/// The `next` and `rot` links of both symedges are left unset, linking them is the
/// caller's responsibility. Each vertex without a representative symedge receives
/// the new symedge starting at it.
pub fn add_edge(
    dcel: &mut Dcel,
    v1: FixedVertexHandle,
    v2: FixedVertexHandle,
    left_face: FixedFaceHandle,
    right_face: FixedFaceHandle,
) -> FixedEdgeHandle {
    let handle = FixedEdgeHandle::new(dcel.edges.len());
    dcel.edges.push(EdgeEntry {
        symedges: [
            SymEdgeEntry::unlinked(v1, left_face),
            SymEdgeEntry::unlinked(v2, right_face),
        ],
        input_ids: InputIds::new(),
        deleted: false,
    });
    for (side, vertex) in [v1, v2].into_iter().enumerate() {
        let entry = dcel.vertex_mut(vertex);
        if entry.symedge.is_none() {
            entry.symedge = Some(handle.symedge(side));
        }
    }
    handle
}

/// Splits the face left of `s1` and `s2` by connecting their origins.
///
/// Both symedges must be part of the same face cycle and must not follow each other.
/// The returned edge starts at `s1`'s origin. Its first symedge borders the new face
/// which contains `s2`, the second one borders the old face which keeps `s1`.
///
/// ```text
/// Before:               After:
///  <---- s2 -----        <---- s2 -----
///  |            ^        |   fnew     ^
///  |    fold    |        +---diag---->+
///  V            |        |   fold     |
///  ----- s1 ---->        ----- s1 ---->
/// ```
pub fn add_diagonal(
    dcel: &mut Dcel,
    s1: FixedSymEdgeHandle,
    s2: FixedSymEdgeHandle,
) -> FixedEdgeHandle {
    debug_assert_ne!(s1, s2);
    debug_assert_eq!(dcel.face_of(s1), dcel.face_of(s2));
    debug_assert_ne!(dcel.next(s1), s2);
    debug_assert_ne!(dcel.next(s2), s1);

    let fold = dcel.face_of(s1);
    let fnew = add_face(dcel);
    let s1prev = dcel.prev(s1);
    let s2prev = dcel.prev(s2);
    let v1 = dcel.origin(s1);
    let v2 = dcel.origin(s2);

    let diagonal = add_edge(dcel, v1, v2, fnew, fold);
    let sdiag = diagonal.symedge(0);
    let sdiagsym = diagonal.symedge(1);

    dcel.symedge_mut(sdiag).next = s2;
    dcel.symedge_mut(sdiagsym).next = s1;
    dcel.symedge_mut(s2prev).next = sdiagsym;
    dcel.symedge_mut(s1prev).next = sdiag;
    dcel.symedge_mut(s1).rot = sdiag;
    dcel.symedge_mut(sdiag).rot = s1prev.sym();
    dcel.symedge_mut(s2).rot = sdiagsym;
    dcel.symedge_mut(sdiagsym).rot = s2prev.sym();

    let mut current = s2;
    while current != sdiag {
        dcel.symedge_mut(current).face = fnew;
        current = dcel.next(current);
    }

    let fold_ids = dcel.face(fold).input_ids.clone();
    merge_input_ids(&mut dcel.face_mut(fnew).input_ids, &fold_ids);
    dcel.face_mut(fnew).symedge = Some(sdiag);
    dcel.face_mut(fold).symedge = Some(sdiagsym);
    dcel.recompute_centroid(fnew);
    dcel.recompute_centroid(fold);
    diagonal
}

/// Splits the edge of `symedge` at `lambda` (`0` being its origin).
///
/// Returns the new edge which leads from the new vertex to the old destination. The old
/// edge now ends at the new vertex and keeps its handle. Input ids are copied to the new
/// edge.
///
/// ```text
/// Before:                 After:
///  a ---- se ----> b       a -- se --> v -- newse --> b
///  a <--- sesym --- b      a <-sesym-- v <-newsesym-- b
/// ```
pub fn split_edge(dcel: &mut Dcel, symedge: FixedSymEdgeHandle, lambda: f64) -> FixedEdgeHandle {
    let se = symedge;
    let sesym = se.sym();
    debug_assert_ne!(dcel.next(se), sesym, "Cannot split dangling edges");

    let a = dcel.origin_position(se);
    let b = dcel.origin_position(sesym);
    let v = add_vertex(dcel, a.lerp(b, lambda));
    let b_handle = dcel.origin(sesym);

    let senext = dcel.next(se);
    let sesymprev = dcel.prev(sesym);

    let left_face = dcel.face_of(se);
    let right_face = dcel.face_of(sesym);
    let new_edge = add_edge(dcel, v, b_handle, left_face, right_face);
    let newse = new_edge.symedge(0);
    let newsesym = new_edge.symedge(1);
    dcel.symedge_mut(sesym).vert = v;

    dcel.symedge_mut(se).next = newse;
    dcel.symedge_mut(newsesym).next = sesym;
    dcel.symedge_mut(newse).next = senext;
    dcel.symedge_mut(newse).rot = sesym;
    dcel.symedge_mut(sesym).rot = newse;
    dcel.symedge_mut(senext).rot = newsesym;
    dcel.symedge_mut(newsesym).rot = sesymprev.sym();
    dcel.symedge_mut(sesymprev).next = newsesym;

    if dcel.vertex(b_handle).symedge == Some(sesym) {
        dcel.vertex_mut(b_handle).symedge = Some(newsesym);
    }

    let ids = dcel.edge(se.as_edge()).input_ids.clone();
    dcel.edge_mut(new_edge).input_ids = ids;

    for face in [dcel.face_of(se), dcel.face_of(sesym)] {
        if !dcel.is_outer(face) {
            dcel.recompute_centroid(face);
        }
    }
    new_edge
}

/// Removes an edge and merges its two faces.
///
/// If one side is the outer face, the outer face survives. Otherwise the face left of
/// `symedge` survives and the other face is tombstoned. Endpoints that lose their last
/// edge become isolated.
///
/// All boundary cycles of the tombstoned face are handed to the survivor. Removing an
/// edge with the same face on both sides and no dangling endpoint disconnects the
/// boundary and adds a hole to that face.
pub fn delete_edge(dcel: &mut Dcel, symedge: FixedSymEdgeHandle) {
    let mut e = symedge;
    if dcel.is_outer(dcel.face_of(e.sym())) {
        e = e.sym();
    }
    let esym = e.sym();
    let aface = dcel.face_of(e);
    let bface = dcel.face_of(esym);
    let f = dcel.next(e);
    let h = dcel.prev(e);
    let i = dcel.next(esym);
    let j = dcel.prev(esym);
    let v1 = dcel.origin(e);
    let v2 = dcel.origin(esym);
    let v1_isolated = i == e;
    let v2_isolated = f == esym;

    if !v1_isolated {
        dcel.symedge_mut(h).next = i;
        dcel.symedge_mut(i).rot = h.sym();
    }
    if !v2_isolated {
        dcel.symedge_mut(j).next = f;
        dcel.symedge_mut(f).rot = j.sym();
    }

    let merged = !v1_isolated && !v2_isolated && aface != bface;
    if merged {
        let mut k = i;
        while k != f {
            dcel.symedge_mut(k).face = aface;
            k = dcel.next(k);
        }
        let bface_holes = dcel.face(bface).holes;
        if bface_holes > 0 {
            // The other boundary components of `bface` move over as well
            for entry in dcel.edges.iter_mut().filter(|entry| !entry.deleted) {
                for symedge in &mut entry.symedges {
                    if symedge.face == bface {
                        symedge.face = aface;
                    }
                }
            }
            dcel.face_mut(aface).holes += bface_holes;
        }
    } else if !v1_isolated && !v2_isolated {
        // Removing a bridge splits its boundary cycle in two
        dcel.face_mut(aface).holes += 1;
    } else if v1_isolated && v2_isolated {
        let entry = dcel.face_mut(aface);
        entry.holes = entry.holes.saturating_sub(1);
    }

    if dcel.vertex(v1).symedge == Some(e) {
        dcel.vertex_mut(v1).symedge = if v1_isolated { None } else { Some(i) };
    }
    if dcel.vertex(v2).symedge == Some(esym) {
        dcel.vertex_mut(v2).symedge = if v2_isolated { None } else { Some(f) };
    }

    dcel.edge_mut(e.as_edge()).deleted = true;

    if merged {
        let bface_ids = std::mem::take(&mut dcel.face_mut(bface).input_ids);
        if !dcel.is_outer(aface) {
            merge_input_ids(&mut dcel.face_mut(aface).input_ids, &bface_ids);
        }
        let bface_entry = dcel.face_mut(bface);
        bface_entry.deleted = true;
        bface_entry.symedge = None;
        bface_entry.holes = 0;
        if dcel.outer_face == bface {
            dcel.outer_face = aface;
        }
    }

    let face_symedge = dcel.face(aface).symedge;
    if face_symedge.is_none() || face_symedge == Some(e) || face_symedge == Some(esym) {
        let replacement = if !v1_isolated {
            Some(i)
        } else if !v2_isolated {
            Some(f)
        } else {
            dcel.find_any_symedge_of_face(aface)
        };
        dcel.face_mut(aface).symedge = replacement;
    }

    if !dcel.is_outer(aface) {
        dcel.recompute_centroid(aface);
    }
}

/// Replaces the edge of `symedge` with the other diagonal of its quadrilateral.
///
/// Both adjacent faces must be triangles.
///
/// ```text
/// Before:            After:
///        c                 c
///      /   \             / ^ \
///    /   F1  \         /  |   \
///  a --- s ---> b    a  F1 | F2 b
///    \   F2  /         \  s   /
///      \   /             \ | /
///        d                 d
/// ```
/// After flipping, `symedge` leads from `d` to `c` and still borders `F1`.
pub fn flip(dcel: &mut Dcel, symedge: FixedSymEdgeHandle) {
    let s = symedge;
    let t = s.sym();
    let sn = dcel.next(s);
    let sn2 = dcel.next(sn);
    let tn = dcel.next(t);
    let tn2 = dcel.next(tn);
    debug_assert_eq!(dcel.next(sn2), s);
    debug_assert_eq!(dcel.next(tn2), t);

    let a = dcel.origin(s);
    let b = dcel.origin(t);
    let c = dcel.origin(sn2);
    let d = dcel.origin(tn2);
    let f1 = dcel.face_of(s);
    let f2 = dcel.face_of(t);

    for (from, to) in [(s, sn2), (sn2, tn), (tn, s), (t, tn2), (tn2, sn), (sn, t)] {
        dcel.symedge_mut(from).next = to;
    }
    dcel.symedge_mut(s).vert = d;
    dcel.symedge_mut(t).vert = c;
    dcel.symedge_mut(tn).face = f1;
    dcel.symedge_mut(sn).face = f2;

    dcel.symedge_mut(s).rot = tn.sym();
    dcel.symedge_mut(t).rot = sn.sym();
    dcel.symedge_mut(sn2).rot = t;
    dcel.symedge_mut(tn).rot = sn2.sym();
    dcel.symedge_mut(tn2).rot = s;
    dcel.symedge_mut(sn).rot = tn2.sym();

    if dcel.vertex(a).symedge == Some(s) {
        dcel.vertex_mut(a).symedge = Some(tn);
    }
    if dcel.vertex(b).symedge == Some(t) {
        dcel.vertex_mut(b).symedge = Some(sn);
    }

    dcel.face_mut(f1).symedge = Some(s);
    dcel.face_mut(f2).symedge = Some(t);
    dcel.recompute_centroid(f1);
    dcel.recompute_centroid(f2);
}

/// Merges the destination `b` of `symedge` into its origin `a`.
///
/// Both faces next to the edge must be inner triangles `a b c` and `b a d`. The edge and
/// both triangles are removed, `b c` and `b d` are merged into `a c` and `a d`, and all
/// other edges of `b` are attached to `a`. `b` keeps its position but becomes isolated
/// and remembers `a` as the vertex it was merged into.
///
/// ```text
/// Before:               After:
///        c-----e              c-----e
///      /  \   / \           /     /  \
///    /     \ /   \        /     /     \
///  a --s--> b-----f      a-----------f
///    \     / \   /        \      \    /
///      \  /   \ /           \      \  /
///        d-----g              d-----g
/// ```
/// The caller is responsible for checking that no triangle flips its orientation and
/// that `a` and `b` have no common neighbors besides `c` and `d`.
pub fn collapse_edge(dcel: &mut Dcel, symedge: FixedSymEdgeHandle) -> FixedVertexHandle {
    let s = symedge;
    let t = s.sym();
    let bc = dcel.next(s);
    let ca = dcel.next(bc);
    let ad = dcel.next(t);
    let db = dcel.next(ad);
    debug_assert_eq!(dcel.next(ca), s);
    debug_assert_eq!(dcel.next(db), t);

    let a = dcel.origin(s);
    let b = dcel.origin(t);
    let c = dcel.origin(ca);
    let d = dcel.origin(db);
    let bd = db.sym();
    let cb = bc.sym();
    let f1 = dcel.face_of(s);
    let f2 = dcel.face_of(t);
    let g_face = dcel.face_of(bd);
    let h_face = dcel.face_of(cb);

    let first_spoke = dcel.rot(bd);
    let mut spoke = first_spoke;
    while spoke != bc {
        dcel.symedge_mut(spoke).vert = a;
        spoke = dcel.rot(spoke);
    }

    if first_spoke != bc {
        // b g, ..., b e now start at a
        let gb = first_spoke.sym();
        let dg = dcel.next(bd);
        let be = dcel.next(cb);
        let ec = dcel.next(be);
        dcel.symedge_mut(gb).next = ad;
        dcel.symedge_mut(ad).next = dg;
        dcel.symedge_mut(ad).face = g_face;
        dcel.symedge_mut(ec).next = ca;
        dcel.symedge_mut(ca).next = be;
        dcel.symedge_mut(ca).face = h_face;

        dcel.symedge_mut(ad).rot = first_spoke;
        dcel.symedge_mut(dg).rot = ad.sym();
        dcel.symedge_mut(be).rot = ca.sym();
        dcel.symedge_mut(ca).rot = ec.sym();
    } else {
        // b only has the neighbors a, c and d, triangle b d c becomes a d c
        let dc = dcel.next(bd);
        dcel.symedge_mut(ad).next = dc;
        dcel.symedge_mut(dc).next = ca;
        dcel.symedge_mut(ca).next = ad;
        dcel.symedge_mut(ad).face = g_face;
        dcel.symedge_mut(ca).face = g_face;

        dcel.symedge_mut(ad).rot = ca.sym();
        dcel.symedge_mut(dc).rot = ad.sym();
        dcel.symedge_mut(ca).rot = dc.sym();
    }

    let bd_ids = dcel.edge(bd.as_edge()).input_ids.clone();
    merge_input_ids(&mut dcel.edge_mut(ad.as_edge()).input_ids, &bd_ids);
    let bc_ids = dcel.edge(bc.as_edge()).input_ids.clone();
    merge_input_ids(&mut dcel.edge_mut(ca.as_edge()).input_ids, &bc_ids);
    for edge in [s.as_edge(), bd.as_edge(), bc.as_edge()] {
        dcel.edge_mut(edge).deleted = true;
    }
    for face in [f1, f2] {
        let entry = dcel.face_mut(face);
        entry.deleted = true;
        entry.symedge = None;
        entry.holes = 0;
    }

    dcel.vertex_mut(a).symedge = Some(ad);
    if dcel.vertex(c).symedge == Some(cb) {
        dcel.vertex_mut(c).symedge = Some(ca);
    }
    if dcel.vertex(d).symedge == Some(db) {
        dcel.vertex_mut(d).symedge = Some(ad.sym());
    }
    let b_ids = std::mem::take(&mut dcel.vertex_mut(b).input_ids);
    merge_input_ids(&mut dcel.vertex_mut(a).input_ids, &b_ids);
    let b_entry = dcel.vertex_mut(b);
    b_entry.symedge = None;
    b_entry.merged_into = Some(a);

    dcel.face_mut(g_face).symedge = Some(ad);
    dcel.face_mut(h_face).symedge = Some(ca);
    for face in [g_face, h_face] {
        if !dcel.is_outer(face) {
            dcel.recompute_centroid(face);
        }
    }
    a
}

/// Connects the isolated vertex `v` to the origin of `symedge` with a dangling edge.
///
/// The new edge lies in the face left of `symedge`, its first symedge starts at `v`.
pub fn add_vertex_to_symedge_edge(
    dcel: &mut Dcel,
    v: FixedVertexHandle,
    symedge: FixedSymEdgeHandle,
) -> FixedEdgeHandle {
    debug_assert!(dcel.vertex(v).symedge.is_none());
    let se_rot = dcel.rot(symedge);
    let se_rotsym = se_rot.sym();
    let face = dcel.face_of(symedge);
    let target = dcel.origin(symedge);

    let edge = add_edge(dcel, v, target, face, face);
    let new_se = edge.symedge(0);
    let new_se_sym = edge.symedge(1);
    dcel.symedge_mut(new_se).next = symedge;
    dcel.symedge_mut(new_se_sym).next = new_se;
    dcel.symedge_mut(new_se).rot = new_se;
    dcel.symedge_mut(new_se_sym).rot = se_rot;
    dcel.symedge_mut(symedge).rot = new_se_sym;
    dcel.symedge_mut(se_rotsym).next = new_se_sym;
    edge
}

/// Connects the origins of two symedges that bound the same face but belong to
/// different components of its boundary.
///
/// The face is not split since the two components were not connected before.
pub fn connect_separate_parts(
    dcel: &mut Dcel,
    s1: FixedSymEdgeHandle,
    s2: FixedSymEdgeHandle,
) -> FixedEdgeHandle {
    debug_assert_eq!(dcel.face_of(s1), dcel.face_of(s2));
    let s1_rot = dcel.rot(s1);
    let s1_rotsym = s1_rot.sym();
    let s2_rot = dcel.rot(s2);
    let s2_rotsym = s2_rot.sym();
    let face = dcel.face_of(s1);
    let v1 = dcel.origin(s1);
    let v2 = dcel.origin(s2);

    let edge = add_edge(dcel, v1, v2, face, face);
    let new_se = edge.symedge(0);
    let new_se_sym = edge.symedge(1);
    dcel.symedge_mut(new_se).rot = s1_rot;
    dcel.symedge_mut(new_se).next = s2;
    dcel.symedge_mut(new_se_sym).rot = s2_rot;
    dcel.symedge_mut(new_se_sym).next = s1;
    dcel.symedge_mut(s1).rot = new_se;
    dcel.symedge_mut(s2).rot = new_se_sym;
    dcel.symedge_mut(s1_rotsym).next = new_se;
    dcel.symedge_mut(s2_rotsym).next = new_se_sym;
    let entry = dcel.face_mut(face);
    entry.holes = entry.holes.saturating_sub(1);
    edge
}

/// Adds `id` to the input ids of `edge`, marking it as constrained.
pub fn add_edge_input_id(dcel: &mut Dcel, edge: FixedEdgeHandle, id: usize) {
    add_input_id(&mut dcel.edge_mut(edge).input_ids, id);
}
