use hashbrown::HashSet;

use crate::delaunay_core::math;
use crate::delaunay_core::Dcel;

impl Dcel {
    /// Panics if any topological invariant of the symedge mesh is violated.
    pub fn sanity_check(&self) {
        let limit = self.num_edges() * 2 + 1;
        let mut seen = HashSet::new();

        for edge in self.live_edges() {
            let first = edge.symedge(0);
            let from = self.origin(first);
            let to = self.dest(first);
            assert_ne!(from, to, "Edge {:?} is a loop", edge);
            let key = if from < to { (from, to) } else { (to, from) };
            assert!(seen.insert(key), "Duplicate edge between {:?} and {:?}", from, to);

            for symedge in [first, first.sym()] {
                let next = self.next(symedge);
                let rot = self.rot(symedge);
                assert!(!self.is_deleted(next.as_edge()));
                assert!(!self.is_deleted(rot.as_edge()));
                assert_eq!(self.rot(next), symedge.sym());
                assert_eq!(self.next(self.prev(symedge)), symedge);
                assert_eq!(self.origin(rot), self.origin(symedge));
                assert_eq!(self.origin(next), self.dest(symedge));
                assert_eq!(self.face_of(next), self.face_of(symedge));
                assert!(!self.face(self.face_of(symedge)).deleted);
                assert!(self.face_cycle(symedge).take(limit).count() < limit);
            }
        }

        for (index, vertex) in self.vertices.iter().enumerate() {
            if let Some(target) = vertex.merged_into {
                assert!(vertex.symedge.is_none(), "Merged vertex {} has edges", index);
                assert_ne!(target.index(), index);
            }
            if let Some(symedge) = vertex.symedge {
                assert!(!self.is_deleted(symedge.as_edge()));
                assert_eq!(self.origin(symedge).index(), index);
                let fan: Vec<_> = self
                    .vertex_fan(self.origin(symedge))
                    .take(limit)
                    .collect();
                assert!(fan.len() < limit);
                assert!(fan.iter().all(|s| self.origin(*s).index() == index));
            }
        }

        // Boundary cycles per face
        let mut cycles = vec![0u32; self.faces.len()];
        let mut visited = vec![false; self.num_edges() * 2];
        for edge in self.live_edges() {
            for symedge in [edge.symedge(0), edge.symedge(1)] {
                if visited[symedge.index()] {
                    continue;
                }
                for s in self.face_cycle(symedge).take(limit) {
                    visited[s.index()] = true;
                }
                cycles[self.face_of(symedge).index()] += 1;
            }
        }

        for (index, face) in self.faces.iter().enumerate() {
            if face.deleted {
                assert_eq!(cycles[index], 0, "Deleted face {} is still referenced", index);
                continue;
            }
            match face.symedge {
                Some(symedge) => {
                    assert!(!self.is_deleted(symedge.as_edge()));
                    assert_eq!(self.face_of(symedge).index(), index);
                    assert_eq!(
                        cycles[index],
                        face.holes + 1,
                        "Face {} has an unexpected number of boundary cycles",
                        index
                    );
                }
                None => {
                    assert!(
                        self.is_outer(crate::delaunay_core::FixedFaceHandle::new(index)),
                        "Face {} has no symedge",
                        index
                    );
                    assert_eq!(cycles[index], 0);
                }
            }
        }
    }

    /// Panics if any inner face is not a triangle.
    pub fn check_triangles(&self) {
        for face in self.inner_faces() {
            assert_eq!(self.face_vertices(face).len(), 3, "Face {:?} is no triangle", face);
        }
    }

    /// Panics if an unconstrained edge between two triangles violates the circumcircle test.
    pub fn check_delaunay(&self, epsilon: f64) {
        for edge in self.live_edges() {
            if self.is_constrained(edge) || self.is_border_edge(edge) {
                continue;
            }
            let s = edge.symedge(0);
            let t = s.sym();
            if self.face_cycle(s).count() != 3 || self.face_cycle(t).count() != 3 {
                continue;
            }
            let [a, b, c] = self.triangle_positions(s);
            let d = self.origin_position(self.next(self.next(t)));
            assert!(
                !math::in_circumcircle(a, b, c, d, epsilon),
                "Edge {:?} is not Delaunay",
                edge
            );
        }
    }

    /// `V - E + F` counting connected vertices, live edges and live faces including the outer face.
    pub fn euler_characteristic(&self) -> i64 {
        let vertices = self.vertices.iter().filter(|v| v.symedge.is_some()).count() as i64;
        let edges = self.live_edges().count() as i64;
        let faces = self.faces.iter().filter(|f| !f.deleted).count() as i64;
        vertices - edges + faces
    }
}
