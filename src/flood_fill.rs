use std::ops::RangeInclusive;

use smallvec::SmallVec;

use crate::delaunay_core::dcel::add_input_id;
use crate::delaunay_core::{Dcel, FixedSymEdgeHandle};

/// Tags every face reachable from the face left of `start` with `face_id`.
///
/// The fill never crosses an edge carrying an input id within `boundary` and never enters
/// the outer face. Returns the number of faces that were tagged.
///
/// For self intersecting boundaries only the region containing `start` is tagged.
pub fn add_face_ids(
    dcel: &mut Dcel,
    start: FixedSymEdgeHandle,
    face_id: usize,
    boundary: RangeInclusive<usize>,
) -> usize {
    let epoch = dcel.next_visit_epoch();
    let mut stack: SmallVec<[FixedSymEdgeHandle; 16]> = SmallVec::new();
    stack.push(start);
    let mut tagged = 0;

    while let Some(symedge) = stack.pop() {
        let face = dcel.face_of(symedge);
        if dcel.is_outer(face) || dcel.face(face).visit_index == epoch {
            continue;
        }
        let entry = dcel.face_mut(face);
        entry.visit_index = epoch;
        add_input_id(&mut entry.input_ids, face_id);
        tagged += 1;

        for current in dcel.face_cycle(symedge) {
            let crosses_boundary = dcel
                .edge(current.as_edge())
                .input_ids
                .iter()
                .any(|id| boundary.contains(id));
            if crosses_boundary {
                continue;
            }
            let other = current.sym();
            let other_face = dcel.face_of(other);
            if !dcel.is_outer(other_face) && dcel.face(other_face).visit_index != epoch {
                stack.push(other);
            }
        }
    }
    tagged
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::delaunay_core::constraint::insert_constraint;
    use crate::delaunay_core::dcel_operations::new_with_frame;
    use crate::delaunay_core::hint_generator::RandomSampleHintGenerator;
    use crate::delaunay_core::insertion::insert_vertex;
    use crate::delaunay_core::FixedVertexHandle;
    use crate::Point2;

    const EPSILON: f64 = 1e-8;

    /// A unit square inside of a larger frame with its boundary inserted as constraints
    /// with ids `10..=13`.
    fn square() -> (Dcel, Vec<FixedVertexHandle>) {
        let mut dcel = new_with_frame(Point2::new(-3.0, -3.0), Point2::new(4.0, 4.0));
        let mut hint_generator = RandomSampleHintGenerator::default();
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.4),
        ];
        let vertices: Vec<_> = corners
            .iter()
            .map(|p| insert_vertex(&mut dcel, &mut hint_generator, *p, EPSILON).vertex())
            .collect();
        for i in 0..4 {
            insert_constraint(&mut dcel, vertices[i], vertices[(i + 1) % 4], 10 + i, EPSILON);
        }
        (dcel, vertices)
    }

    #[test]
    fn test_fill_stays_inside_boundary() {
        let (mut dcel, vertices) = square();
        let start = dcel.find_symedge_between(vertices[0], vertices[1]).unwrap();
        let tagged = add_face_ids(&mut dcel, start, 3, 10..=13);
        // The inner vertex splits the square into four triangles
        assert_eq!(tagged, 4);
        for face in dcel.inner_faces() {
            let inside = dcel
                .face_vertices(face)
                .iter()
                .all(|v| vertices[..].contains(v));
            let ids = &dcel.face(face).input_ids;
            assert_eq!(ids.contains(&3), inside, "Face {:?}", face);
        }
    }

    #[test]
    fn test_fill_ignores_other_boundaries() {
        let (mut dcel, vertices) = square();
        let start = dcel.find_symedge_between(vertices[0], vertices[1]).unwrap();
        // Edges with ids outside the range do not stop the fill
        let tagged = add_face_ids(&mut dcel, start, 3, 20..=23);
        assert_eq!(tagged, dcel.inner_faces().count());
    }

    #[test]
    fn test_fill_never_tags_outer_face() {
        let (mut dcel, vertices) = square();
        let start = dcel.find_symedge_between(vertices[1], vertices[0]).unwrap();
        add_face_ids(&mut dcel, start, 5, 10..=13);
        assert!(dcel.face(dcel.outer_face()).input_ids.is_empty());
        let inner_tagged = dcel
            .inner_faces()
            .filter(|f| dcel.face(*f).input_ids.contains(&5))
            .count();
        assert_eq!(inner_tagged, dcel.inner_faces().count() - 4);
    }
}
