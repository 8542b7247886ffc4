//! Constant-speed resampling of waypoint paths.

use log::debug;

use crate::geometry::{add, distance, scale, sub, Point};
use crate::types::Waypoint;

/// Segments shorter than this carry no movement.
const MIN_SEGMENT: f64 = 1e-9;

/// One position per movement tick along `waypoints`.
///
/// Each segment is walked at the speed of its source waypoint: a
/// segment of length `L` walked at speed `S` yields `⌈L/S⌉` points, all
/// `S` apart except the last, which lands exactly on the segment end.
/// The first waypoint itself is not emitted.
pub fn generate_speed_pathway(waypoints: &[Waypoint]) -> Vec<Point> {
    let mut steps = Vec::new();
    for pair in waypoints.windows(2) {
        let (from, to) = (pair[0].point, pair[1].point);
        let speed = pair[0].speed;
        let length = distance(from, to);
        if length < MIN_SEGMENT || speed <= 0.0 || !speed.is_finite() {
            debug!(
                "skipping segment of length {length:.3} at speed {speed} from ({:.2}, {:.2})",
                from.0, from.1
            );
            continue;
        }

        let dir = scale(sub(to, from), speed / length);
        let count = (length / speed - 1e-9).ceil().max(1.0) as usize;
        for k in 1..count {
            steps.push(add(from, scale(dir, k as f64)));
        }
        steps.push(to);
    }
    steps
}
