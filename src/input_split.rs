use tracing::{debug, trace};

use crate::delaunay_core::math;
use crate::{CdtInput, Point2};

/// A copy of an input whose segments are split at vertices lying next to them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SplitInput {
    pub input: CdtInput,
    /// Maps every edge id of `input` to the id of the segment it was cut from.
    pub edge_map: Vec<usize>,
}

impl SplitInput {
    pub fn input_edge_id(&self, id: usize) -> usize {
        self.edge_map[id]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct NearVertex {
    segment: usize,
    vertex: usize,
    lambda: f64,
}

/// Returns the position of `p` along `a b` if `p` lies within `epsilon` of the segment's
/// interior while being farther than `epsilon` from both of its ends.
fn near_segment_interior(
    a: Point2<f64>,
    b: Point2<f64>,
    p: Point2<f64>,
    epsilon: f64,
) -> Option<f64> {
    let epsilon_2 = epsilon * epsilon;
    let lambda = math::project_point(a, b, p).relative_position();
    if !(lambda > 0.0 && lambda < 1.0) {
        return None;
    }
    if p.distance_2(a.lerp(b, lambda)) > epsilon_2 {
        return None;
    }
    if p.distance_2(a) <= epsilon_2 || p.distance_2(b) <= epsilon_2 {
        return None;
    }
    Some(lambda)
}

/// Collects every constraint segment of `input` as a pair of vertex indices.
///
/// Explicit edges come first, followed by the boundary edges of all faces in face edge
/// id order. Segments which cannot be inserted are `None`.
fn segments(input: &CdtInput) -> Vec<Option<[usize; 2]>> {
    let num_vertices = input.vertices().len();
    let valid = |[from, to]: [usize; 2]| from < num_vertices && to < num_vertices && from != to;

    let mut segments: Vec<_> = input
        .edges()
        .iter()
        .map(|edge| Some(*edge).filter(|edge| valid(*edge)))
        .collect();
    for face in input.faces() {
        let skip = face.len() < 3;
        for (i, from) in face.iter().enumerate() {
            let edge = [*from, face[(i + 1) % face.len()]];
            segments.push(Some(edge).filter(|edge| !skip && valid(*edge)));
        }
    }
    segments
}

/// Splits every segment of `input` that passes within `epsilon` of an endpoint of
/// another segment at that endpoint.
///
/// Vertex positions are left unchanged. Returns `None` if no segment needs to be split.
pub(crate) fn split_edges_at_near_vertices(input: &CdtInput, epsilon: f64) -> Option<SplitInput> {
    let vertices = input.vertices();
    let segments = segments(input);

    let mut near = Vec::new();
    for (i, first) in segments.iter().enumerate() {
        let Some(first) = first else { continue };
        for (j, second) in segments.iter().enumerate().skip(i + 1) {
            let Some(second) = second else { continue };
            for (segment, [a, b], endpoints) in [(j, second, first), (i, first, second)] {
                for vertex in *endpoints {
                    if let Some(lambda) =
                        near_segment_interior(vertices[*a], vertices[*b], vertices[vertex], epsilon)
                    {
                        near.push(NearVertex {
                            segment,
                            vertex,
                            lambda,
                        });
                    }
                }
            }
        }
    }
    if near.is_empty() {
        return None;
    }

    near.sort_by(|l, r| {
        l.segment
            .cmp(&r.segment)
            .then_with(|| l.lambda.total_cmp(&r.lambda))
            .then_with(|| l.vertex.cmp(&r.vertex))
    });

    let epsilon_2 = epsilon * epsilon;
    let mut splits: Vec<Vec<usize>> = vec![Vec::new(); segments.len()];
    for entry in &near {
        let cuts = &mut splits[entry.segment];
        let duplicate = cuts.last().map_or(false, |last: &usize| {
            *last == entry.vertex
                || vertices[*last].distance_2(vertices[entry.vertex]) <= epsilon_2
        });
        if !duplicate {
            trace!(
                segment = entry.segment,
                vertex = entry.vertex,
                lambda = entry.lambda,
                "Splitting segment at near vertex"
            );
            cuts.push(entry.vertex);
        }
    }
    debug!(
        split_segments = splits.iter().filter(|cuts| !cuts.is_empty()).count(),
        "Split segments at near vertices"
    );

    let mut edges = Vec::with_capacity(input.edges().len());
    let mut edge_map = Vec::with_capacity(input.edges().len());
    for (id, &[from, to]) in input.edges().iter().enumerate() {
        let mut previous = from;
        for &next in splits[id].iter().chain(std::iter::once(&to)) {
            edges.push([previous, next]);
            edge_map.push(id);
            previous = next;
        }
    }

    let mut faces = Vec::with_capacity(input.faces().len());
    let mut old_id = input.face_edge_offset();
    for face in input.faces() {
        let mut split_face = Vec::with_capacity(face.len());
        for vertex in face {
            split_face.push(*vertex);
            split_face.extend_from_slice(&splits[old_id]);
            edge_map.extend(std::iter::repeat(old_id).take(1 + splits[old_id].len()));
            old_id += 1;
        }
        faces.push(split_face);
    }

    let split = CdtInput::new(vertices.to_vec())
        .with_edges(edges)
        .with_faces(faces)
        .with_epsilon(epsilon)
        .with_seed(input.seed());
    Some(SplitInput {
        input: split,
        edge_map,
    })
}
