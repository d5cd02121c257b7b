use smallvec::SmallVec;
use tracing::{debug, debug_span, warn};

use crate::delaunay_core::{FixedVertexHandle, RandomSampleHintGenerator};
use crate::input_split::split_edges_at_near_vertices;
use crate::output::{CdtResult, OutputMode};
use crate::{validate_position, Cdt, CdtError, CdtInput, Point2};

/// Computes the constrained Delaunay triangulation of `input` and shapes it according
/// to `mode`.
///
/// Input vertices closer than the input's epsilon are merged into one output vertex
/// which carries the ids of all of them. Edges and faces referring to vertices that do
/// not exist are skipped with a warning, as are faces with fewer than three distinct
/// vertices.
///
/// A segment passing within epsilon of another segment's endpoint is routed through
/// that endpoint. Output edges not longer than epsilon are collapsed afterwards where
/// this keeps all triangles intact, see [Cdt::remove_small_features].
///
/// # Example
/// ```
/// use delaunay2d::{triangulate, CdtInput, OutputMode, Point2};
///
/// # fn main() -> Result<(), delaunay2d::CdtError> {
/// let input = CdtInput::new(vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(1.0, 1.0),
///     Point2::new(0.0, 1.0),
/// ])
/// .with_edges(vec![[0, 2]]);
///
/// let result = triangulate(&input, OutputMode::Triangles)?;
/// assert_eq!(result.num_vertices(), 4);
/// assert_eq!(result.num_edges(), 5);
/// assert_eq!(result.num_faces(), 2);
/// assert_eq!(result.edges_for_input(0).count(), 1);
/// # Ok(())
/// # }
/// ```
pub fn triangulate(input: &CdtInput, mode: OutputMode) -> Result<CdtResult, CdtError> {
    let span = debug_span!(
        "triangulate",
        vertices = input.vertices().len(),
        edges = input.edges().len(),
        faces = input.faces().len(),
        ?mode
    );
    let _enter = span.enter();

    input.validate_shape()?;
    let epsilon = input.epsilon()?;
    for (index, position) in input.vertices().iter().enumerate() {
        validate_position(*position)
            .map_err(|source| CdtError::InvalidCoordinate { index, source })?;
    }

    let Some((min, max)) = bounding_box(input.vertices()) else {
        return Ok(CdtResult {
            face_edge_offset: input.face_edge_offset(),
            ..Default::default()
        });
    };

    let hint_generator = RandomSampleHintGenerator::with_seed(input.seed());
    let mut cdt = Cdt::new(min, max, epsilon, hint_generator)?;
    cdt.set_face_edge_offset(input.face_edge_offset());

    let mut handles = Vec::with_capacity(input.vertices().len());
    for (index, position) in input.vertices().iter().enumerate() {
        handles.push(cdt.insert_vertex(*position, index)?);
    }
    debug!(
        inserted = handles.len(),
        distinct = cdt.num_vertices(),
        "Inserted vertices"
    );

    let split = split_edges_at_near_vertices(input, epsilon);
    let segments = split.as_ref().map_or(input, |split| &split.input);
    let input_edge_id = |id: usize| split.as_ref().map_or(id, |split| split.input_edge_id(id));

    let mut constraints = 0;
    for (id, &[from, to]) in segments.edges().iter().enumerate() {
        let (Some(&from), Some(&to)) = (handles.get(from), handles.get(to)) else {
            warn!(
                edge = input_edge_id(id),
                from,
                to,
                "Skipping edge with an invalid vertex index"
            );
            continue;
        };
        cdt.add_constraint(from, to, input_edge_id(id))?;
        constraints += 1;
    }
    debug!(constraints, "Inserted edges");

    let mut first_edge_id = segments.face_edge_offset();
    let mut faces = 0;
    for (face_id, face) in segments.faces().iter().enumerate() {
        let edge_ids: Vec<_> = (first_edge_id..first_edge_id + face.len())
            .map(input_edge_id)
            .collect();
        first_edge_id += face.len();
        if let Some((vertices, edge_ids)) = face_vertices(&handles, face_id, face, &edge_ids) {
            cdt.add_face_with_edge_ids(&vertices, face_id, &edge_ids)?;
            faces += 1;
        }
    }
    debug!(faces, "Inserted faces");

    let collapsed = cdt.remove_small_features()?;
    debug!(collapsed, "Removed small features");

    cdt.prepare_for_output(mode)?;
    let result = cdt.result();
    debug!(
        vertices = result.num_vertices(),
        edges = result.num_edges(),
        faces = result.num_faces(),
        "Collected result"
    );
    Ok(result)
}

/// Maps the vertex indices of a face to handles, together with the id of the boundary
/// edge starting at each vertex.
///
/// Invalid indices are dropped along with their edge ids. Returns `None` if fewer than
/// three distinct vertices remain.
fn face_vertices(
    handles: &[FixedVertexHandle],
    face_id: usize,
    face: &[usize],
    edge_ids: &[usize],
) -> Option<(Vec<FixedVertexHandle>, Vec<usize>)> {
    let mut vertices = Vec::with_capacity(face.len());
    let mut ids = Vec::with_capacity(face.len());
    for (&index, &id) in face.iter().zip(edge_ids) {
        match handles.get(index) {
            Some(handle) => {
                vertices.push(*handle);
                ids.push(id);
            }
            None => warn!(face = face_id, index, "Skipping invalid face vertex index"),
        }
    }

    let mut distinct: SmallVec<[FixedVertexHandle; 8]> = vertices.iter().copied().collect();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 3 {
        warn!(
            face = face_id,
            distinct = distinct.len(),
            "Skipping face with fewer than three vertices"
        );
        return None;
    }
    Some((vertices, ids))
}

fn bounding_box(vertices: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = *vertices.first()?;
    Some(vertices.iter().fold((first, first), |(min, max), p| {
        (
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

#[cfg(test)]
mod test {
    use anyhow::Context;
    use approx::assert_abs_diff_eq;
    use hashbrown::HashMap;
    use rand::distributions::{Distribution, Uniform};
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::delaunay_core::math::orient2d;
    use crate::test_utilities::{init_tracing, random_points_with_seed, SEED, SEED2};
    use crate::CoordinateError;

    fn unit_square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    /// Random points connected by random, possibly crossing constraints.
    fn random_input(seed: &[u8; 32], num_points: usize, num_edges: usize) -> CdtInput {
        let vertices = random_points_with_seed(num_points, seed);
        let mut rng = rand::rngs::StdRng::from_seed(*seed);
        let range = Uniform::new(0, num_points);
        let edges = (0..num_edges)
            .map(|_| [range.sample(&mut rng), range.sample(&mut rng)])
            .collect();
        CdtInput::new(vertices)
            .with_edges(edges)
            .with_seed(rng.gen())
    }

    fn euler(result: &CdtResult) -> i64 {
        // Counts the outer face
        result.num_vertices() as i64 - result.num_edges() as i64 + result.num_faces() as i64 + 1
    }

    fn to_f64(point: Point2<f32>) -> Point2<f64> {
        Point2::new(point.x as f64, point.y as f64)
    }

    #[test]
    fn test_square_gives_two_triangles() {
        init_tracing();
        let result = triangulate(&CdtInput::new(unit_square()), OutputMode::Triangles).unwrap();
        assert_eq!(result.num_vertices(), 4);
        assert_eq!(result.num_edges(), 5);
        assert_eq!(result.num_faces(), 2);
        assert_eq!(euler(&result), 2);
        assert!(result.faces.iter().all(|f| f.len() == 3));
    }

    #[test]
    fn test_square_with_center_fans() {
        let mut vertices = unit_square();
        vertices.push(Point2::new(0.5, 0.5));
        let result = triangulate(&CdtInput::new(vertices), OutputMode::Triangles).unwrap();
        assert_eq!(result.num_faces(), 4);
        assert_eq!(result.num_edges(), 8);
        let center = result.vertex_for_input(4).unwrap();
        assert!(result.faces.iter().all(|f| f.contains(&center)));
    }

    #[test]
    fn test_diagonal_constraint_only() {
        let input = CdtInput::new(unit_square()).with_edges(vec![[1, 3]]);
        let result = triangulate(&input, OutputMode::ConstraintsOnly).unwrap();
        assert_eq!(result.num_vertices(), 4);
        assert_eq!(result.num_edges(), 1);
        assert_eq!(result.num_faces(), 0);
        assert_eq!(result.edge_original_ids, vec![vec![0]]);
        let mut edge = result.edges[0];
        edge.sort_unstable();
        let mut expected = [
            result.vertex_for_input(1).unwrap(),
            result.vertex_for_input(3).unwrap(),
        ];
        expected.sort_unstable();
        assert_eq!(edge, expected);
    }

    #[test]
    fn test_hourglass_face() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let input = CdtInput::new(vertices).with_faces(vec![vec![0, 1, 2, 3]]);
        let result = triangulate(&input, OutputMode::Full).unwrap();
        // The crossing of both diagonals creates an additional vertex
        assert_eq!(result.num_vertices(), 5);
        let center = (0..result.num_vertices())
            .find(|v| result.vertex_original_ids[*v].is_empty())
            .unwrap();
        assert_abs_diff_eq!(result.vertex_coords[center].x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.vertex_coords[center].y, 1.0, epsilon = 1e-6);

        let tagged: Vec<_> = result.faces_for_input(0).collect();
        assert!(!tagged.is_empty());
        assert!(tagged.len() < result.num_faces() || result.num_faces() == 1);
        for face in tagged {
            assert!(result.faces[face].contains(&center));
        }
    }

    #[test]
    fn test_nearly_identical_constraint_endpoints() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
            Point2::new(0.5, 1.0 + 1e-10),
        ];
        let input = CdtInput::new(vertices).with_edges(vec![[2, 3], [0, 3]]);
        let result = triangulate(&input, OutputMode::Triangles).unwrap();
        assert_eq!(result.num_vertices(), 3);
        let merged = result.vertex_for_input(2).unwrap();
        assert_eq!(result.vertex_for_input(3), Some(merged));
        assert_eq!(result.vertex_original_ids[merged], vec![2, 3]);
        assert_eq!(result.edges_for_input(0).count(), 0);
        assert_eq!(result.edges_for_input(1).count(), 1);
    }

    #[test]
    fn test_edges_pass_through_near_vertices() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(1.0, 5e-4),
            Point2::new(1.0, 1.0),
        ];
        let input = CdtInput::new(vertices)
            .with_edges(vec![[0, 1], [2, 3]])
            .with_epsilon(1e-3);
        let result = triangulate(&input, OutputMode::ConstraintsOnly).unwrap();
        let near = result.vertex_for_input(2).unwrap();
        let path: Vec<_> = result.edges_for_input(0).collect();
        assert_eq!(path.len(), 2);
        assert!(path.iter().all(|edge| result.edges[*edge].contains(&near)));
        assert_eq!(result.edges_for_input(1).count(), 1);
        assert_eq!(result.num_edges(), 3);
        // The vertex keeps its position
        assert_abs_diff_eq!(to_f64(result.vertex_coords[near]).y, 5e-4, epsilon = 1e-9);
    }

    #[test]
    fn test_face_boundaries_pass_through_near_vertices() {
        let vertices = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(1.0, 5e-4),
            Point2::new(1.0, 1.0),
        ];
        let input = CdtInput::new(vertices)
            .with_edges(vec![[2, 3]])
            .with_faces(vec![vec![0, 1, 3]])
            .with_epsilon(1e-3);
        let result = triangulate(&input, OutputMode::Full).unwrap();
        assert_eq!(result.face_edge_offset, 1);
        let near = result.vertex_for_input(2).unwrap();
        let bottom: Vec<_> = result.edges_for_input(1).collect();
        assert_eq!(bottom.len(), 2);
        assert!(bottom.iter().all(|edge| result.edges[*edge].contains(&near)));
        assert_eq!(result.edges_for_input(2).count(), 1);
        assert_eq!(result.edges_for_input(3).count(), 1);

        let inside: Vec<_> = result.faces_for_input(0).collect();
        assert_eq!(inside.len(), 2);
        assert!(inside.iter().all(|face| result.faces[*face].contains(&near)));
    }

    #[test]
    fn test_empty_input() {
        let input = CdtInput::new(Vec::new());
        let result = triangulate(&input, OutputMode::Full).unwrap();
        assert_eq!(result, CdtResult::default());
    }

    #[test]
    fn test_invalid_input() {
        let dangling = CdtInput::new(Vec::new()).with_faces(vec![vec![0, 1, 2]]);
        assert!(matches!(
            triangulate(&dangling, OutputMode::Triangles),
            Err(CdtError::InvalidInput(_))
        ));

        let negative = CdtInput::new(unit_square()).with_epsilon(-1.0);
        assert!(matches!(
            triangulate(&negative, OutputMode::Triangles),
            Err(CdtError::InvalidInput(_))
        ));

        let mut vertices = unit_square();
        vertices[2].y = f64::NAN;
        assert_eq!(
            triangulate(&CdtInput::new(vertices), OutputMode::Triangles),
            Err(CdtError::InvalidCoordinate {
                index: 2,
                source: CoordinateError::NAN
            })
        );
    }

    #[test]
    fn test_out_of_range_references_are_skipped() {
        let input = CdtInput::new(unit_square())
            .with_edges(vec![[0, 7], [0, 2]])
            .with_faces(vec![vec![0, 1, 9], vec![0, 1, 2, 3]]);
        let result = triangulate(&input, OutputMode::Full).unwrap();
        assert_eq!(result.face_edge_offset, 2);
        assert_eq!(result.edges_for_input(0).count(), 0);
        assert_eq!(result.edges_for_input(1).count(), 1);
        assert_eq!(result.faces_for_input(0).count(), 0);
        assert_eq!(result.faces_for_input(1).count(), 2);
        // Boundary ids of the second face start after the three slots of the first one
        for id in 5..9 {
            assert_eq!(result.edges_for_input(id).count(), 1, "Edge id {}", id);
            assert_eq!(input.face_edge_origin(id), Some((1, id - 5)));
        }
    }

    #[test]
    fn test_face_edge_offset() {
        let input = CdtInput::new(unit_square())
            .with_edges(vec![[0, 1], [1, 2], [2, 3]])
            .with_faces(vec![vec![0, 1, 2, 3]]);
        let result = triangulate(&input, OutputMode::Triangles).unwrap();
        assert_eq!(result.face_edge_offset, 3);
        // The first boundary edge coincides with input edge 0
        let shared = result.edges_for_input(3).next().unwrap();
        assert_eq!(result.edge_original_ids[shared], vec![0, 3]);
    }

    #[test]
    fn test_euler_characteristic() {
        for (seed, num_edges) in [(SEED, 0), (SEED2, 20)] {
            let input = random_input(seed, 200, num_edges);
            let result = triangulate(&input, OutputMode::Triangles).unwrap();
            assert_eq!(euler(&result), 2);
            assert!(result.faces.iter().all(|f| f.len() == 3));
        }
    }

    #[test]
    fn test_every_input_vertex_is_included() {
        let input = random_input(SEED, 300, 30);
        let result = triangulate(&input, OutputMode::Full).unwrap();
        for (index, position) in input.vertices().iter().enumerate() {
            let vertex = result.vertex_for_input(index).unwrap();
            assert!(result.vertex_original_ids[vertex].contains(&index));
            let output = to_f64(result.vertex_coords[vertex]);
            assert_abs_diff_eq!(output.x, position.x, epsilon = 1e-6);
            assert_abs_diff_eq!(output.y, position.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_constraints_are_included() {
        let input = random_input(SEED2, 150, 25);
        let result = triangulate(&input, OutputMode::ConstraintsOnly).unwrap();

        for (id, &[from, to]) in input.edges().iter().enumerate() {
            let from = result.vertex_for_input(from).unwrap();
            let to = result.vertex_for_input(to).unwrap();
            let path: Vec<_> = result.edges_for_input(id).collect();
            if from == to {
                assert!(path.is_empty());
                continue;
            }
            assert!(!path.is_empty(), "Constraint {} is missing", id);

            // A path has odd degree exactly at its two ends
            let mut degrees: HashMap<usize, usize> = HashMap::new();
            for edge in &path {
                for vertex in result.edges[*edge] {
                    *degrees.entry(vertex).or_default() += 1;
                }
            }
            let mut ends: Vec<_> = degrees
                .iter()
                .filter(|(_, degree)| **degree % 2 == 1)
                .map(|(vertex, _)| *vertex)
                .collect();
            ends.sort_unstable();
            let mut expected = vec![from, to];
            expected.sort_unstable();
            assert_eq!(ends, expected, "Constraint {}", id);

            let a = to_f64(result.vertex_coords[from]);
            let b = to_f64(result.vertex_coords[to]);
            let length = a.distance_2(b).sqrt();
            for vertex in degrees.keys() {
                let p = to_f64(result.vertex_coords[*vertex]);
                assert_abs_diff_eq!(orient2d(a, b, p) / length, 0.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_unconstrained_edges_are_delaunay() -> anyhow::Result<()> {
        let input = random_input(SEED, 250, 15);
        let epsilon = input.epsilon()?;
        let vertices = input.vertices();
        let (min, max) = bounding_box(vertices).context("no vertices")?;
        let mut cdt = Cdt::new(min, max, epsilon, RandomSampleHintGenerator::default())?;
        let mut handles = Vec::with_capacity(vertices.len());
        for (index, position) in vertices.iter().enumerate() {
            handles.push(cdt.insert_vertex(*position, index)?);
        }
        cdt.dcel().check_delaunay(epsilon);
        for (id, [from, to]) in input.edges().iter().enumerate() {
            cdt.add_constraint(handles[*from], handles[*to], id)
                .with_context(|| format!("inserting constraint {}", id))?;
        }
        cdt.dcel().sanity_check();
        cdt.dcel().check_triangles();
        cdt.dcel().check_delaunay(epsilon);
        Ok(())
    }

    #[test]
    fn test_determinism() {
        let input = random_input(SEED, 200, 20).with_faces(vec![vec![3, 4, 5, 6]]);
        for mode in [OutputMode::Triangles, OutputMode::InsideOnly] {
            let first = triangulate(&input, mode).unwrap();
            let second = triangulate(&input, mode).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_other_seeds_keep_invariants() {
        for seed in [1, 2, 3] {
            let input = random_input(SEED2, 120, 0).with_seed(seed);
            let result = triangulate(&input, OutputMode::Triangles).unwrap();
            assert_eq!(euler(&result), 2);
            assert_eq!(result.num_vertices(), 120);
        }
    }
}
