use crate::{CoordinateError, Point2};

/// The smallest allowed coordinate value greater than zero that can be inserted into a
/// triangulation. This value is equal to 2<sup>-142</sup>.
///
/// The *absolute value* of any inserted vertex coordinate must be either zero or greater
/// than or equal to this value.
/// This is a requirement for preventing floating point underflow when calculating exact
/// geometric predicates.
// Implementation note: These numbers come from the paper of Jonathan Richard Shewchuk:
// "The four predicates implemented for this report will not overflow nor underflow if
// their inputs have exponents in the range -[142, 201] and IEEE-745 double precision
// arithmetic is used."
// Source: Adaptive Precision Floating-Point Arithmetic and Fast Robust Geometric Predicates
pub const MIN_ALLOWED_VALUE: f64 = 1.793662034335766e-43; // 1.0 * 2^-142

/// The largest allowed coordinate value that can be inserted into a triangulation.
/// This value is equal to 2<sup>201</sup>.
pub const MAX_ALLOWED_VALUE: f64 = 3.2138760885179806e60; // 1.0 * 2^201

/// Checks if a coordinate value is suitable for triangulation.
///
/// Will return an error if and only if
///  - The absolute value of the coordinate is too small (See [MIN_ALLOWED_VALUE])
///  - The absolute value of the coordinate is too large (See [MAX_ALLOWED_VALUE])
///  - The coordinate is NaN (not a number)
///
/// Passing in any non-finite floating point number (e.g. `f64::NEG_INFINITY`) will
/// result in `Err(CoordinateError::TooLarge)`.
pub fn validate_coordinate(value: f64) -> Result<(), CoordinateError> {
    if value.is_nan() {
        Err(CoordinateError::NAN)
    } else if value.abs() < MIN_ALLOWED_VALUE && value != 0.0 {
        Err(CoordinateError::TooSmall)
    } else if value.abs() > MAX_ALLOWED_VALUE {
        Err(CoordinateError::TooLarge)
    } else {
        Ok(())
    }
}

/// Checks both coordinates of a position with [validate_coordinate].
pub fn validate_position(position: Point2<f64>) -> Result<(), CoordinateError> {
    validate_coordinate(position.x)?;
    validate_coordinate(position.y)
}

/// Projection of a point onto the line through an edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointProjection {
    factor: f64,
    length_2: f64,
}

impl PointProjection {
    fn new(factor: f64, length_2: f64) -> Self {
        Self { factor, length_2 }
    }

    pub fn is_before_edge(&self) -> bool {
        self.factor < 0.0
    }

    pub fn is_behind_edge(&self) -> bool {
        self.factor > self.length_2
    }

    pub fn is_on_edge(&self) -> bool {
        !self.is_before_edge() && !self.is_behind_edge()
    }

    /// Parametric position along the edge, `0.0` at its start and `1.0` at its end.
    pub fn relative_position(&self) -> f64 {
        if self.length_2 == 0.0 {
            0.0
        } else {
            self.factor / self.length_2
        }
    }
}

pub fn project_point(
    p1: Point2<f64>,
    p2: Point2<f64>,
    query_point: Point2<f64>,
) -> PointProjection {
    let dir = p2.sub(p1);
    PointProjection::new(query_point.sub(p1).dot(dir), dir.length2())
}

pub fn nearest_point(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> Point2<f64> {
    let dir = p2.sub(p1);
    let s = project_point(p1, p2, query_point);
    if s.is_on_edge() {
        p1.add(dir.mul(s.relative_position()))
    } else if s.is_before_edge() {
        p1
    } else {
        p2
    }
}

/// Squared distance of `query_point` to the segment `p1 p2`.
pub fn distance_2(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> f64 {
    let nn = nearest_point(p1, p2, query_point);
    query_point.sub(nn).length2()
}

/// Squared distance of `query_point` to the infinite line through `p1` and `p2`.
pub fn line_distance_2(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> f64 {
    let length_2 = p1.distance_2(p2);
    if length_2 == 0.0 {
        return p1.distance_2(query_point);
    }
    let det = orient2d(p1, p2, query_point);
    det * det / length_2
}

fn to_robust_coord(point: Point2<f64>) -> robust::Coord<f64> {
    robust::Coord {
        x: point.x,
        y: point.y,
    }
}

/// Exact orientation determinant. Positive if `query_point` lies left of `p1 -> p2`.
pub fn orient2d(p1: Point2<f64>, p2: Point2<f64>, query_point: Point2<f64>) -> f64 {
    robust::orient2d(
        to_robust_coord(p1),
        to_robust_coord(p2),
        to_robust_coord(query_point),
    )
}

/// Exact incircle determinant for the ccw triangle `v1 v2 v3`.
///
/// Positive if `p` lies inside the circumcircle.
pub fn incircle(v1: Point2<f64>, v2: Point2<f64>, v3: Point2<f64>, p: Point2<f64>) -> f64 {
    // robust::incircle returns a positive value for points inside the circle of a
    // counterclockwise triangle.
    robust::incircle(
        to_robust_coord(v1),
        to_robust_coord(v2),
        to_robust_coord(v3),
        to_robust_coord(p),
    )
}

/// Returns `true` if `p` lies strictly inside the circumcircle of the ccw triangle
/// `v1 v2 v3`, by more than `epsilon`.
pub fn in_circumcircle(
    v1: Point2<f64>,
    v2: Point2<f64>,
    v3: Point2<f64>,
    p: Point2<f64>,
    epsilon: f64,
) -> bool {
    if incircle(v1, v2, v3, p) <= 0.0 {
        return false;
    }
    if epsilon <= 0.0 {
        return true;
    }
    let (center, radius_2) = circumcenter([v1, v2, v3]);
    if !center.is_finite() {
        // Nearly degenerate triangle, trust the exact predicate
        return true;
    }
    let distance = center.distance_2(p).sqrt();
    distance < radius_2.sqrt() - epsilon
}

/// Returns `true` if `b` lies between `a` and `c`, assuming the three points are collinear.
pub fn in_line(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let ab = b.sub(a);
    let bc = c.sub(b);
    let ac = c.sub(a);
    if ab.dot(ac) < 0.0 {
        return false;
    }
    bc.dot(ac) >= 0.0
}

/// Classification of the intersection between two segments.
///
/// `lambda` is the parametric position along the first segment, `mu` along the second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentIntersection {
    /// The segments are parallel or collinear.
    Collinear,
    /// The lines intersect outside of at least one segment.
    None { lambda: f64, mu: f64 },
    /// The segments touch at an endpoint of at least one of them.
    Exact { lambda: f64, mu: f64 },
    /// The segments cross at an interior point of both.
    Cross { lambda: f64, mu: f64 },
}

impl SegmentIntersection {
    pub fn lambda(&self) -> Option<f64> {
        match self {
            SegmentIntersection::Collinear => None,
            SegmentIntersection::None { lambda, .. }
            | SegmentIntersection::Exact { lambda, .. }
            | SegmentIntersection::Cross { lambda, .. } => Some(*lambda),
        }
    }
}

/// Intersects the segments `v1 v2` and `v3 v4`.
pub fn segment_intersection(
    v1: Point2<f64>,
    v2: Point2<f64>,
    v3: Point2<f64>,
    v4: Point2<f64>,
) -> SegmentIntersection {
    let div = (v2.x - v1.x) * (v4.y - v3.y) - (v2.y - v1.y) * (v4.x - v3.x);
    if div.abs() < f64::EPSILON {
        return SegmentIntersection::Collinear;
    }
    let lambda = ((v1.y - v3.y) * (v4.x - v3.x) - (v1.x - v3.x) * (v4.y - v3.y)) / div;
    let mu = ((v1.y - v3.y) * (v2.x - v1.x) - (v1.x - v3.x) * (v2.y - v1.y)) / div;
    if (0.0..=1.0).contains(&lambda) && (0.0..=1.0).contains(&mu) {
        if lambda == 0.0 || lambda == 1.0 || mu == 0.0 || mu == 1.0 {
            SegmentIntersection::Exact { lambda, mu }
        } else {
            SegmentIntersection::Cross { lambda, mu }
        }
    } else {
        SegmentIntersection::None { lambda, mu }
    }
}

/// Returns the circumcenter and the squared circumradius of a triangle.
pub fn circumcenter(positions: [Point2<f64>; 3]) -> (Point2<f64>, f64) {
    let [v0, v1, v2] = positions;
    let b = v1.sub(v0);
    let c = v2.sub(v0);

    let d = 2.0 * (b.x * c.y - c.x * b.y);
    let len_b = b.dot(b);
    let len_c = c.dot(c);
    let d_inv = 1.0 / d;

    let x = (len_b * c.y - len_c * b.y) * d_inv;
    let y = (-len_b * c.x + len_c * b.x) * d_inv;
    let result = Point2::new(x, y);
    (result.add(v0), x * x + y * y)
}

/// Signed area of a closed polygon, positive for counterclockwise loops.
pub fn signed_area(polygon: &[Point2<f64>]) -> f64 {
    let mut sum = 0.0;
    for (index, p) in polygon.iter().enumerate() {
        let q = polygon[(index + 1) % polygon.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}
