//! Visibility polygon around an observer.
//!
//! Every obstacle vertex (plus the vertices of a bounding circle) is
//! sampled with a ray from the observer; the nearest segment hit along
//! that ray is how far the observer can see in that direction. Sorting
//! the hits by angle gives a star-shaped approximation of the visible
//! region. Cost is O(V²) in the total vertex count.

use std::f64::consts::TAU;

use rayon::prelude::*;

use crate::geometry::{
    distance_squared, point_in_polygon, ray_segment_intersection, signed_area, sub, Point, Segment,
};
use crate::types::{Building, VisionParams, VisionPoint};

/// Angular offset of the extra rays cast beside each building vertex.
const CORNER_RAY_EPSILON: f64 = 1e-5;

/// Below this squared distance the observer sits on a vertex.
const COINCIDENT_SQ: f64 = 1e-18;

/// One sampled vertex, keyed by (polygon index, vertex index).
/// Polygon 0 is the bounding circle.
#[derive(Debug, Clone)]
struct VertexRecord {
    key: (usize, usize),
    point: Point,
    square_distance: f64,
    /// Edge to the next vertex of the same polygon.
    segment: Option<Segment>,
}

/// Regular `segments`-gon of radius `radius` around `centre`.
fn bounding_circle(centre: Point, radius: f64, segments: usize) -> Vec<Point> {
    (0..segments)
        .map(|k| {
            let theta = TAU * k as f64 / segments as f64;
            (centre.0 + radius * theta.cos(), centre.1 + radius * theta.sin())
        })
        .collect()
}

fn vertex_records(observer: Point, polygons: &[&[Point]]) -> Vec<VertexRecord> {
    let mut records = Vec::new();
    for (p, poly) in polygons.iter().enumerate() {
        let n = poly.len();
        for (v, &point) in poly.iter().enumerate() {
            records.push(VertexRecord {
                key: (p, v),
                point,
                square_distance: distance_squared(observer, point),
                segment: (n >= 2).then(|| (point, poly[(v + 1) % n])),
            });
        }
    }
    records
}

/// Nearest hit along `observer + t·dir`, limited to `t <= max_t`.
fn cast(observer: Point, dir: Point, segments: &[Segment], max_t: f64) -> f64 {
    segments
        .iter()
        .filter_map(|seg| ray_segment_intersection(observer, dir, seg))
        .fold(max_t, f64::min)
}

fn vision_point(observer: Point, dir: Point, t: f64) -> VisionPoint {
    let point = (observer.0 + t * dir.0, observer.1 + t * dir.1);
    VisionPoint {
        angle: dir.1.atan2(dir.0),
        square_distance: distance_squared(observer, point),
        point,
    }
}

#[inline]
fn rotate(d: Point, angle: f64) -> Point {
    let (s, c) = angle.sin_cos();
    (d.0 * c - d.1 * s, d.0 * s + d.1 * c)
}

/// Visible region around `observer`, sorted by angle.
///
/// With no buildings the result is the bounding circle itself, one
/// point per circle segment.
pub fn compute_visibility(
    observer: Point,
    buildings: &[Building],
    params: &VisionParams,
) -> Vec<VisionPoint> {
    let circle = bounding_circle(observer, params.radius, params.segments);
    let polygons: Vec<&[Point]> = std::iter::once(circle.as_slice())
        .chain(buildings.iter().map(|b| b.points.as_slice()))
        .collect();

    let records = vertex_records(observer, &polygons);
    let segments: Vec<Segment> = records.iter().filter_map(|r| r.segment).collect();

    let mut result: Vec<VisionPoint> = records
        .par_iter()
        .flat_map_iter(|r| {
            let mut out = Vec::with_capacity(3);
            if r.square_distance < COINCIDENT_SQ {
                return out;
            }
            let dir = sub(r.point, observer);
            // t = 1 is the vertex itself.
            let t = cast(observer, dir, &segments, 1.0);
            out.push(vision_point(observer, dir, t));

            if params.corner_rays && r.key.0 > 0 {
                for eps in [-CORNER_RAY_EPSILON, CORNER_RAY_EPSILON] {
                    let side = rotate(dir, eps);
                    let t = cast(observer, side, &segments, f64::INFINITY);
                    if t.is_finite() {
                        out.push(vision_point(observer, side, t));
                    }
                }
            }
            out
        })
        .collect();

    result.sort_by(|a, b| a.angle.total_cmp(&b.angle));
    result
}

/// Whether `point` lies inside a visibility polygon.
pub fn is_point_visible(point: Point, polygon: &[VisionPoint]) -> bool {
    let vertices: Vec<Point> = polygon.iter().map(|v| v.point).collect();
    point_in_polygon(point, &vertices)
}

pub fn visible_area(polygon: &[VisionPoint]) -> f64 {
    let vertices: Vec<Point> = polygon.iter().map(|v| v.point).collect();
    signed_area(&vertices).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    fn params(segments: usize) -> VisionParams {
        VisionParams {
            radius: 100.0,
            segments,
            corner_rays: false,
        }
    }

    #[test]
    fn empty_world_gives_bounding_circle() {
        let observer = (3.0, -2.0);
        let poly = compute_visibility(observer, &[], &params(50));
        assert_eq!(poly.len(), 50);
        for v in &poly {
            assert!((v.square_distance - 10_000.0).abs() < 1e-6);
        }
        for w in poly.windows(2) {
            assert!(w[0].angle <= w[1].angle);
        }
        // Regular 50-gon of radius 100.
        let expected = 0.5 * 50.0 * 100.0f64.powi(2) * (TAU / 50.0).sin();
        assert!((visible_area(&poly) - expected).abs() < 1e-4);
    }

    #[test]
    fn wall_occludes_what_is_behind_it() {
        let wall = Building::new(vec![(5.0, -5.0), (5.0, 5.0)]);
        let poly = compute_visibility((0.0, 0.0), &[wall], &params(50));
        // 50 circle vertices plus the two wall ends.
        assert_eq!(poly.len(), 52);

        let straight = poly
            .iter()
            .find(|v| v.angle.abs() < 1e-9)
            .expect("ray along +x");
        assert!((straight.point.0 - 5.0).abs() < 1e-9);

        for v in &poly {
            if v.angle.abs() < FRAC_PI_4 - 1e-6 {
                assert!(v.point.0 <= 5.0 + 1e-9, "{v:?}");
            } else if v.angle.abs() > FRAC_PI_4 + 1e-6 {
                assert!((v.square_distance - 10_000.0).abs() < 1e-6);
            }
        }

        assert!(is_point_visible((-50.0, 0.0), &poly));
        assert!(is_point_visible((4.0, 0.0), &poly));
        assert!(!is_point_visible((50.0, 0.0), &poly));
    }

    #[test]
    fn corner_rays_see_past_building_edges() {
        let block = Building::new(vec![(10.0, -2.0), (12.0, -2.0), (12.0, 2.0), (10.0, 2.0)]);
        let plain = compute_visibility((0.0, 0.0), &[block.clone()], &params(8));
        let with_corners = compute_visibility(
            (0.0, 0.0),
            &[block],
            &VisionParams {
                corner_rays: true,
                ..params(8)
            },
        );
        assert_eq!(with_corners.len(), plain.len() + 8);

        let far_ahead = |poly: &[VisionPoint]| {
            poly.iter()
                .any(|v| v.angle.abs() < 0.3 && v.square_distance > 2_500.0)
        };
        assert!(!far_ahead(&plain));
        assert!(far_ahead(&with_corners));
    }

    #[test]
    fn observer_on_vertex_and_degenerate_polygons() {
        let lone = Building::new(vec![(1.0, 1.0)]);
        let touching = Building::new(vec![(0.0, 0.0), (0.0, 3.0), (-3.0, 3.0)]);
        let poly = compute_visibility((0.0, 0.0), &[lone, touching], &params(12));
        assert!(poly.iter().all(|v| v.square_distance.is_finite()));
        // The observer's own vertex is skipped; the lone point is sampled.
        assert_eq!(poly.len(), 12 + 1 + 2);
    }
}
