use super::handles::*;
use crate::Point2;

use smallvec::SmallVec;

/// Set of input ids attached to a vertex, edge or face.
///
/// Ids are kept in insertion order without duplicates.
pub type InputIds = SmallVec<[usize; 2]>;

pub(crate) fn add_input_id(ids: &mut InputIds, id: usize) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

pub(crate) fn merge_input_ids(target: &mut InputIds, source: &[usize]) {
    for &id in source {
        add_input_id(target, id);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SymEdgeEntry {
    /// Next symedge counterclockwise around the face to the left.
    pub next: FixedSymEdgeHandle,
    /// Next symedge counterclockwise around the origin vertex.
    pub rot: FixedSymEdgeHandle,
    pub vert: FixedVertexHandle,
    pub face: FixedFaceHandle,
}

impl SymEdgeEntry {
    pub(crate) fn unlinked(vert: FixedVertexHandle, face: FixedFaceHandle) -> Self {
        Self {
            next: FixedSymEdgeHandle::max(),
            rot: FixedSymEdgeHandle::max(),
            vert,
            face,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VertexEntry {
    pub position: Point2<f64>,
    /// Some symedge with this vertex as origin, `None` for isolated vertices.
    pub symedge: Option<FixedSymEdgeHandle>,
    pub input_ids: InputIds,
    pub visit_index: u32,
    /// Set once a tiny edge collapse merged this vertex into another one.
    pub merged_into: Option<FixedVertexHandle>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EdgeEntry {
    pub symedges: [SymEdgeEntry; 2],
    pub input_ids: InputIds,
    pub deleted: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FaceEntry {
    pub symedge: Option<FixedSymEdgeHandle>,
    pub centroid: Point2<f64>,
    pub input_ids: InputIds,
    pub visit_index: u32,
    /// Number of boundary cycles besides the one containing `symedge`.
    pub holes: u32,
    pub deleted: bool,
}

impl FaceEntry {
    pub(crate) fn new() -> Self {
        FaceEntry {
            symedge: None,
            centroid: Point2::new(0.0, 0.0),
            input_ids: InputIds::new(),
            visit_index: 0,
            holes: 0,
            deleted: false,
        }
    }
}

/// Arena owning all vertices, edges and faces of a triangulation.
///
/// Nothing is freed before the whole arena is dropped: removed edges and faces are
/// tombstoned with their `deleted` flag.
#[derive(Clone, Debug)]
pub struct Dcel {
    pub(crate) vertices: Vec<VertexEntry>,
    pub(crate) edges: Vec<EdgeEntry>,
    pub(crate) faces: Vec<FaceEntry>,
    pub(crate) outer_face: FixedFaceHandle,
    visit_count: u32,
}

impl Dcel {
    pub(crate) fn empty() -> Self {
        Dcel {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: vec![FaceEntry::new()],
            outer_face: new_fixed_face_handle(0),
            visit_count: 0,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of edges including tombstoned ones.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of faces including tombstoned ones and the outer face.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn outer_face(&self) -> FixedFaceHandle {
        self.outer_face
    }

    pub fn is_outer(&self, face: FixedFaceHandle) -> bool {
        face == self.outer_face
    }

    pub(crate) fn vertex(&self, handle: FixedVertexHandle) -> &VertexEntry {
        &self.vertices[handle.index()]
    }

    pub(crate) fn vertex_mut(&mut self, handle: FixedVertexHandle) -> &mut VertexEntry {
        &mut self.vertices[handle.index()]
    }

    pub(crate) fn edge(&self, handle: FixedEdgeHandle) -> &EdgeEntry {
        &self.edges[handle.index()]
    }

    pub(crate) fn edge_mut(&mut self, handle: FixedEdgeHandle) -> &mut EdgeEntry {
        &mut self.edges[handle.index()]
    }

    pub(crate) fn face(&self, handle: FixedFaceHandle) -> &FaceEntry {
        &self.faces[handle.index()]
    }

    pub(crate) fn face_mut(&mut self, handle: FixedFaceHandle) -> &mut FaceEntry {
        &mut self.faces[handle.index()]
    }

    pub(crate) fn symedge(&self, handle: FixedSymEdgeHandle) -> &SymEdgeEntry {
        &self.edges[handle.as_edge().index()].symedges[handle.side()]
    }

    pub(crate) fn symedge_mut(&mut self, handle: FixedSymEdgeHandle) -> &mut SymEdgeEntry {
        &mut self.edges[handle.as_edge().index()].symedges[handle.side()]
    }

    #[inline]
    pub fn next(&self, handle: FixedSymEdgeHandle) -> FixedSymEdgeHandle {
        self.symedge(handle).next
    }

    #[inline]
    pub fn rot(&self, handle: FixedSymEdgeHandle) -> FixedSymEdgeHandle {
        self.symedge(handle).rot
    }

    #[inline]
    pub fn sym(&self, handle: FixedSymEdgeHandle) -> FixedSymEdgeHandle {
        handle.sym()
    }

    /// The symedge whose `next` is `handle`, found as the `sym` of `rot`.
    #[inline]
    pub fn prev(&self, handle: FixedSymEdgeHandle) -> FixedSymEdgeHandle {
        self.rot(handle).sym()
    }

    #[inline]
    pub fn origin(&self, handle: FixedSymEdgeHandle) -> FixedVertexHandle {
        self.symedge(handle).vert
    }

    #[inline]
    pub fn dest(&self, handle: FixedSymEdgeHandle) -> FixedVertexHandle {
        self.symedge(handle.sym()).vert
    }

    #[inline]
    pub fn face_of(&self, handle: FixedSymEdgeHandle) -> FixedFaceHandle {
        self.symedge(handle).face
    }

    #[inline]
    pub fn position(&self, vertex: FixedVertexHandle) -> Point2<f64> {
        self.vertices[vertex.index()].position
    }

    pub fn origin_position(&self, handle: FixedSymEdgeHandle) -> Point2<f64> {
        self.position(self.origin(handle))
    }

    pub fn dest_position(&self, handle: FixedSymEdgeHandle) -> Point2<f64> {
        self.position(self.dest(handle))
    }

    /// An edge is constrained if it carries at least one input id.
    pub fn is_constrained(&self, edge: FixedEdgeHandle) -> bool {
        !self.edges[edge.index()].input_ids.is_empty()
    }

    pub fn is_deleted(&self, edge: FixedEdgeHandle) -> bool {
        self.edges[edge.index()].deleted
    }

    /// Returns `true` if either side of the edge is the outer face.
    pub fn is_border_edge(&self, edge: FixedEdgeHandle) -> bool {
        let [s0, s1] = &self.edges[edge.index()].symedges;
        self.is_outer(s0.face) || self.is_outer(s1.face)
    }

    pub(crate) fn next_visit_epoch(&mut self) -> u32 {
        self.visit_count += 1;
        self.visit_count
    }

    /// Iterates the `next` cycle starting at `start`.
    pub fn face_cycle(&self, start: FixedSymEdgeHandle) -> CircularIterator<'_> {
        CircularIterator::new(self, Some(start), Dcel::next)
    }

    /// Iterates all symedges with `vertex` as origin, counterclockwise.
    pub fn vertex_fan(&self, vertex: FixedVertexHandle) -> CircularIterator<'_> {
        CircularIterator::new(self, self.vertex(vertex).symedge, Dcel::rot)
    }

    pub fn face_vertices(&self, face: FixedFaceHandle) -> SmallVec<[FixedVertexHandle; 4]> {
        match self.face(face).symedge {
            Some(start) => self.face_cycle(start).map(|s| self.origin(s)).collect(),
            None => SmallVec::new(),
        }
    }

    /// Returns the three corner positions of the face left of `handle`, starting at its origin.
    pub fn triangle_positions(&self, handle: FixedSymEdgeHandle) -> [Point2<f64>; 3] {
        let next = self.next(handle);
        let next_next = self.next(next);
        [
            self.origin_position(handle),
            self.origin_position(next),
            self.origin_position(next_next),
        ]
    }

    pub fn find_symedge_between(
        &self,
        from: FixedVertexHandle,
        to: FixedVertexHandle,
    ) -> Option<FixedSymEdgeHandle> {
        self.vertex_fan(from).find(|s| self.dest(*s) == to)
    }

    pub fn find_symedge_with_face(
        &self,
        vertex: FixedVertexHandle,
        face: FixedFaceHandle,
    ) -> Option<FixedSymEdgeHandle> {
        self.vertex_fan(vertex).find(|s| self.face_of(*s) == face)
    }

    pub fn vertex_touches_face(&self, vertex: FixedVertexHandle, face: FixedFaceHandle) -> bool {
        self.find_symedge_with_face(vertex, face).is_some()
    }

    /// Finds any live symedge bordering `face` by scanning all edges.
    pub(crate) fn find_any_symedge_of_face(
        &self,
        face: FixedFaceHandle,
    ) -> Option<FixedSymEdgeHandle> {
        self.live_edges()
            .flat_map(|edge| [edge.symedge(0), edge.symedge(1)])
            .find(|s| self.face_of(*s) == face)
    }

    pub(crate) fn recompute_centroid(&mut self, face: FixedFaceHandle) {
        let Some(start) = self.face(face).symedge else {
            return;
        };
        let mut sum = Point2::new(0.0, 0.0);
        let mut count = 0usize;
        for symedge in self.face_cycle(start) {
            sum = sum.add(self.origin_position(symedge));
            count += 1;
        }
        if count > 0 {
            self.face_mut(face).centroid = sum.mul(1.0 / count as f64);
        }
    }

    pub fn live_edges(&self) -> impl Iterator<Item = FixedEdgeHandle> + '_ {
        (0..self.edges.len())
            .map(FixedEdgeHandle::new)
            .filter(move |e| !self.is_deleted(*e))
    }

    /// All non-deleted faces except the outer face.
    pub fn inner_faces(&self) -> impl Iterator<Item = FixedFaceHandle> + '_ {
        (0..self.faces.len())
            .map(FixedFaceHandle::new)
            .filter(move |f| !self.face(*f).deleted && !self.is_outer(*f))
    }

    pub fn edge_length_2(&self, edge: FixedEdgeHandle) -> f64 {
        let symedge = edge.symedge(0);
        self.origin_position(symedge)
            .distance_2(self.dest_position(symedge))
    }
}

/// Iterates a `next` or `rot` cycle until it returns to its start.
pub struct CircularIterator<'a> {
    dcel: &'a Dcel,
    start: Option<FixedSymEdgeHandle>,
    current: Option<FixedSymEdgeHandle>,
    step: fn(&Dcel, FixedSymEdgeHandle) -> FixedSymEdgeHandle,
}

impl<'a> CircularIterator<'a> {
    fn new(
        dcel: &'a Dcel,
        start: Option<FixedSymEdgeHandle>,
        step: fn(&Dcel, FixedSymEdgeHandle) -> FixedSymEdgeHandle,
    ) -> Self {
        CircularIterator {
            dcel,
            start,
            current: start,
            step,
        }
    }
}

impl<'a> Iterator for CircularIterator<'a> {
    type Item = FixedSymEdgeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        let next = (self.step)(self.dcel, current);
        self.current = if Some(next) == self.start {
            None
        } else {
            Some(next)
        };
        Some(current)
    }
}
