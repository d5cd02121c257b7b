use std::convert::TryInto;

/// Handle types used to address vertices, edges, symedges and faces of a triangulation.
///
/// A fixed handle is a plain index into one of the arenas of the triangulation. Elements are
/// never freed while the triangulation lives, so a handle stays valid (possibly pointing
/// to a tombstoned element) until the triangulation is dropped.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedHandleImpl<Type> {
    index: u32,
    ty: Type,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct VertexTag;
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct EdgeTag;
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SymEdgeTag;
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct FaceTag;

/// Fixed handle to a vertex.
pub type FixedVertexHandle = FixedHandleImpl<VertexTag>;
/// Fixed handle to an undirected edge.
pub type FixedEdgeHandle = FixedHandleImpl<EdgeTag>;
/// Fixed handle to one of the two directed halves ("symedges") of an edge.
pub type FixedSymEdgeHandle = FixedHandleImpl<SymEdgeTag>;
/// Fixed handle to a face.
pub type FixedFaceHandle = FixedHandleImpl<FaceTag>;

impl<Type> std::fmt::Debug for FixedHandleImpl<Type> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedHandle")
            .field("index", &self.index)
            .finish()
    }
}

impl<Type: Default> FixedHandleImpl<Type> {
    pub(crate) fn new(index: usize) -> Self {
        Self::new_internal(
            index
                .try_into()
                .expect("Index too big - at most 2^32 elements supported"),
        )
    }

    /// Placeholder for links that are set right after creation.
    pub(crate) fn max() -> Self {
        Self::new_internal(u32::MAX)
    }

    /// Returns the index of this element in its arena.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    fn new_internal(index: u32) -> Self {
        Self {
            index,
            ty: Type::default(),
        }
    }
}

pub const fn new_fixed_face_handle(index: usize) -> FixedFaceHandle {
    FixedHandleImpl {
        index: index as u32,
        ty: FaceTag,
    }
}

pub const fn new_fixed_vertex_handle(index: usize) -> FixedVertexHandle {
    FixedHandleImpl {
        index: index as u32,
        ty: VertexTag,
    }
}

impl FixedSymEdgeHandle {
    /// Returns the symedge pointing in the opposite direction.
    #[inline]
    pub fn sym(self) -> Self {
        Self::new_internal(self.index ^ 1)
    }

    /// Returns the undirected edge this symedge belongs to.
    #[inline]
    pub fn as_edge(self) -> FixedEdgeHandle {
        FixedEdgeHandle::new_internal(self.index >> 1)
    }

    /// Returns `0` for the first and `1` for the second symedge of an edge.
    #[inline]
    pub(crate) fn side(self) -> usize {
        (self.index & 0x1) as usize
    }
}

impl FixedEdgeHandle {
    /// Returns the symedge starting at the edge's first vertex (`side == 0`) or its
    /// second vertex (`side == 1`).
    #[inline]
    pub fn symedge(self, side: usize) -> FixedSymEdgeHandle {
        debug_assert!(side < 2);
        FixedSymEdgeHandle::new_internal(self.index * 2 + side as u32)
    }
}
