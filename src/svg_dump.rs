//! Debug rendering of a triangulation's mesh.
//!
//! Constrained edges are drawn thick, faces carrying input ids are filled. The frame
//! is included so that intermediate states can be inspected as well.

use svg::node::element::path::Data;
use svg::node::element::{Circle, Group, Line, Path, Rectangle};
use svg::Document;

use crate::{Dcel, Point2};

const MARGIN: f64 = 0.05;

/// Converts the live part of `dcel` into an SVG document.
///
/// The y axis points up as in the triangulation's coordinate system.
pub fn to_svg(dcel: &Dcel) -> Document {
    let (min, max) = bounding_box(dcel);
    let span = (max.x - min.x).max(max.y - min.y).max(f64::MIN_POSITIVE);
    let margin = span * MARGIN;
    let stroke = span * 0.002;

    // Flips y so that counterclockwise stays counterclockwise on screen.
    let convert = |p: Point2<f64>| (p.x, min.y + max.y - p.y);

    let mut faces = Group::new().set("fill", "#88aadd").set("fill-opacity", 0.4);
    for face in dcel.inner_faces() {
        if dcel.face(face).input_ids.is_empty() {
            continue;
        }
        let mut vertices = dcel.face_vertices(face).into_iter();
        let Some(first) = vertices.next() else {
            continue;
        };
        let mut data = Data::new().move_to(convert(dcel.position(first)));
        for vertex in vertices {
            data = data.line_to(convert(dcel.position(vertex)));
        }
        faces = faces.add(Path::new().set("d", data.close()));
    }

    let mut edges = Group::new().set("stroke", "black");
    for edge in dcel.live_edges() {
        let symedge = edge.symedge(0);
        let (x1, y1) = convert(dcel.origin_position(symedge));
        let (x2, y2) = convert(dcel.dest_position(symedge));
        let width = if dcel.is_constrained(edge) {
            stroke * 3.0
        } else {
            stroke
        };
        edges = edges.add(
            Line::new()
                .set("x1", x1)
                .set("y1", y1)
                .set("x2", x2)
                .set("y2", y2)
                .set("stroke-width", width),
        );
    }

    let mut vertices = Group::new().set("fill", "#cc3333");
    for vertex in &dcel.vertices {
        if vertex.symedge.is_none() && vertex.input_ids.is_empty() {
            continue;
        }
        let (cx, cy) = convert(vertex.position);
        vertices = vertices.add(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", stroke * 4.0),
        );
    }

    let background = Rectangle::new()
        .set("x", min.x - margin)
        .set("y", min.y - margin)
        .set("width", max.x - min.x + 2.0 * margin)
        .set("height", max.y - min.y + 2.0 * margin)
        .set("fill", "white");

    Document::new()
        .set(
            "viewBox",
            format!(
                "{} {} {} {}",
                min.x - margin,
                min.y - margin,
                max.x - min.x + 2.0 * margin,
                max.y - min.y + 2.0 * margin
            ),
        )
        .add(background)
        .add(faces)
        .add(edges)
        .add(vertices)
}

fn bounding_box(dcel: &Dcel) -> (Point2<f64>, Point2<f64>) {
    let mut positions = dcel.vertices.iter().map(|v| v.position);
    let Some(first) = positions.next() else {
        return (Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
    };
    positions.fold((first, first), |(min, max), p| {
        (
            Point2::new(min.x.min(p.x), min.y.min(p.y)),
            Point2::new(max.x.max(p.x), max.y.max(p.y)),
        )
    })
}
