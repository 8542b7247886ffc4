//! Planar geometry on the local scene plane.
//!
//! Every component of the engine speaks in `Point = (x, y)` tuples.
//! Rendering engines that work in 3D use the XZ ground plane with Y up;
//! `point_from_xz` / `point_to_xz` are the only places that know about
//! that convention.

/// A point on the local plane.
pub type Point = (f64, f64);

/// A line segment between two points.
pub type Segment = (Point, Point);

/// Below this magnitude a cross product is treated as zero
/// (parallel, collinear or zero-length segments).
const PARALLEL_EPSILON: f64 = 1e-12;

#[inline]
pub fn sub(a: Point, b: Point) -> Point {
    (a.0 - b.0, a.1 - b.1)
}

#[inline]
pub fn add(a: Point, b: Point) -> Point {
    (a.0 + b.0, a.1 + b.1)
}

#[inline]
pub fn scale(a: Point, k: f64) -> Point {
    (a.0 * k, a.1 * k)
}

/// 2D cross product: a.x·b.y − a.y·b.x
#[inline]
pub fn cross(a: Point, b: Point) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

#[inline]
pub fn distance_squared(a: Point, b: Point) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    dx * dx + dy * dy
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    distance_squared(a, b).sqrt()
}

/// Ground-plane point of an engine `[x, y, z]` vector (Y up).
pub fn point_from_xz(v: [f64; 3]) -> Point {
    (v[0], v[2])
}

/// Engine `[x, y, z]` vector for a plane point at the given height.
pub fn point_to_xz(p: Point, height: f64) -> [f64; 3] {
    [p.0, height, p.1]
}

/// Intersection point of two closed segments.
///
/// Touching at an endpoint counts as an intersection. Parallel,
/// collinear and zero-length segments never intersect.
pub fn segment_intersection(a: &Segment, b: &Segment) -> Option<Point> {
    segment_intersection_params(a, b).map(|(t, _)| add(a.0, scale(sub(a.1, a.0), t)))
}

/// Parameters `(t, u)` along `a` and `b` where the two segments cross.
pub fn segment_intersection_params(a: &Segment, b: &Segment) -> Option<(f64, f64)> {
    let r = sub(a.1, a.0);
    let s = sub(b.1, b.0);
    let denom = cross(r, s);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }
    let qp = sub(b.0, a.0);
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Find parameter t where ray (origin + t·dir) hits the segment.
/// Returns Some(t) if hit (t >= 0), None if miss or parallel.
pub fn ray_segment_intersection(origin: Point, dir: Point, seg: &Segment) -> Option<f64> {
    let ((x1, y1), (x2, y2)) = *seg;
    let sx = x2 - x1;
    let sy = y2 - y1;
    let denom = dir.0 * sy - dir.1 * sx;
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let dx1 = x1 - origin.0;
    let dy1 = y1 - origin.1;
    let t = (dx1 * sy - dy1 * sx) / denom;
    let u = (dx1 * dir.1 - dy1 * dir.0) / denom;

    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Ray-casting point-in-polygon test (even-odd rule).
///
/// Result does not depend on the polygon's winding order.
pub fn point_in_polygon(p: Point, vertices: &[Point]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let (px, py) = p;
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > py) != (yj > py) {
            let intersect_x = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Edges of an implicitly closed polygon.
///
/// A two-point "polygon" is a single wall; fewer points produce nothing.
pub fn polygon_edges(vertices: &[Point]) -> Vec<Segment> {
    match vertices.len() {
        0 | 1 => Vec::new(),
        2 => vec![(vertices[0], vertices[1])],
        n => (0..n).map(|i| (vertices[i], vertices[(i + 1) % n])).collect(),
    }
}

/// Shoelace signed area: positive for counter-clockwise winding.
pub fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += vertices[i].0 * vertices[j].1;
        area -= vertices[j].0 * vertices[i].1;
    }
    area / 2.0
}

/// Reorder a polygon in place so it winds counter-clockwise.
pub fn normalize_winding(vertices: &mut [Point]) {
    if signed_area(vertices) < 0.0 {
        vertices.reverse();
    }
}

/// Segment shifted sideways by `offset` (positive = left of travel).
pub fn parallel_at_distance(seg: &Segment, offset: f64) -> Option<Segment> {
    let d = sub(seg.1, seg.0);
    let len = (d.0 * d.0 + d.1 * d.1).sqrt();
    if len < PARALLEL_EPSILON {
        return None;
    }
    let normal = (-d.1 / len * offset, d.0 / len * offset);
    Some((add(seg.0, normal), add(seg.1, normal)))
}
