//! Line-of-sight driven path search over the occupancy grid.
//!
//! The search walks straight at the goal until a wall is in the way,
//! steps back from the obstruction by the agent radius, snaps to the
//! nearest grid node and fans out from there. Frontier entries are
//! expanded cheapest first; the first one with a clear sightline to the
//! goal wins, so results are not globally optimal.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace};

use crate::geometry::{
    add, cross, distance, parallel_at_distance, scale, segment_intersection_params, sub, Point,
    Segment,
};
use crate::grid::ObstacleGrid;

/// Sightlines shorter than this are always clear.
const MIN_SIGHTLINE: f64 = 1e-9;

// -- Sightline -----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sightline {
    Clear {
        distance: f64,
    },
    Blocked {
        /// Nearest obstruction, projected onto the centre line.
        hit: Point,
        /// Distance from the start to `hit`.
        distance: f64,
        /// `hit` moved back towards the start by the agent radius.
        inset: Point,
    },
}

impl Sightline {
    pub fn is_clear(&self) -> bool {
        matches!(self, Sightline::Clear { .. })
    }
}

/// Sweep a corridor of half-width `radius` from `from` to `to`.
///
/// The centre line and both parallels at ±`radius` are tested against
/// every wall, and wall endpoints lying inside the corridor count as hits
/// too; the nearest hit decides the outcome. The parallels mark the
/// agent's edges, so they sit at one radius from the centre, not two.
pub fn sightline(from: Point, to: Point, walls: &[Segment], radius: f64) -> Sightline {
    let length = distance(from, to);
    if length < MIN_SIGHTLINE {
        return Sightline::Clear { distance: length };
    }

    let centre: Segment = (from, to);
    let mut lines = vec![centre];
    if radius > 0.0 {
        lines.extend(parallel_at_distance(&centre, radius));
        lines.extend(parallel_at_distance(&centre, -radius));
    }

    let mut nearest_t = f64::INFINITY;
    for line in &lines {
        for wall in walls {
            if let Some((t, _)) = segment_intersection_params(line, wall) {
                nearest_t = nearest_t.min(t);
            }
        }
    }

    let dir = scale(sub(to, from), 1.0 / length);
    for &(a, b) in walls {
        for end in [a, b] {
            if let Some(t) = corridor_param(from, dir, length, radius, end) {
                nearest_t = nearest_t.min(t);
            }
        }
    }

    if !nearest_t.is_finite() {
        return Sightline::Clear { distance: length };
    }

    let distance = nearest_t * length;
    let inset = if distance > radius {
        add(from, scale(dir, distance - radius))
    } else {
        from
    };
    Sightline::Blocked {
        hit: add(from, scale(dir, distance)),
        distance,
        inset,
    }
}

/// Position of `p` along the corridor as a fraction of `length`, when `p`
/// projects onto the centre line and lies within `radius` of it.
fn corridor_param(from: Point, dir: Point, length: f64, radius: f64, p: Point) -> Option<f64> {
    let rel = sub(p, from);
    let along = rel.0 * dir.0 + rel.1 * dir.1;
    let t = along / length;
    ((0.0..=1.0).contains(&t) && cross(dir, rel).abs() <= radius).then_some(t)
}

// -- Greedy search -------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Grid nodes from the start node to the last node before the goal.
    /// The goal itself is reached by a clear sightline from the last node.
    Found { path: Vec<usize>, weight: f64 },
    NotFound,
}

/// Frontier entry ordered as a min-heap on `weight`.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    weight: f64,
    step: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.step.cmp(&self.step))
    }
}

/// One visited node and the step it was reached from.
#[derive(Debug, Clone, Copy)]
struct Step {
    node: usize,
    parent: Option<usize>,
}

/// Mutable state of a single search.
///
/// The visited set is shared by every branch of the search: once a node
/// has been queued by one branch no other branch may queue it again.
pub struct SearchSession<'a> {
    grid: &'a ObstacleGrid,
    walls: &'a [Segment],
    radius: f64,
    passed: Vec<bool>,
    steps: Vec<Step>,
    expansions: usize,
    max_expansions: usize,
}

impl<'a> SearchSession<'a> {
    pub fn new(
        grid: &'a ObstacleGrid,
        walls: &'a [Segment],
        radius: f64,
        max_expansions: usize,
    ) -> Self {
        Self {
            grid,
            walls,
            radius,
            passed: vec![false; grid.len()],
            steps: Vec::new(),
            expansions: 0,
            max_expansions,
        }
    }

    /// Frontier entries popped so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    pub fn search(&mut self, start: Point, goal: Point) -> SearchOutcome {
        let start_node = self.grid.point_to_node(start);
        self.passed[start_node] = true;
        self.steps.push(Step {
            node: start_node,
            parent: None,
        });

        let mut frontier = BinaryHeap::new();
        frontier.push(Frontier {
            weight: 0.0,
            step: 0,
        });

        while let Some(Frontier { weight, step }) = frontier.pop() {
            if self.expansions >= self.max_expansions {
                debug!(
                    "search budget of {} expansions exhausted",
                    self.max_expansions
                );
                return SearchOutcome::NotFound;
            }
            self.expansions += 1;

            let node = self.steps[step].node;
            // The agent itself stands at `start`, not at its cell centre.
            let from = if step == 0 {
                start
            } else {
                self.grid.node_to_point(node)
            };

            let inset = match sightline(from, goal, self.walls, self.radius) {
                Sightline::Clear { distance } => {
                    trace!("goal in sight after {} expansions", self.expansions);
                    return SearchOutcome::Found {
                        path: self.trace_back(step),
                        weight: weight + distance,
                    };
                }
                Sightline::Blocked { inset, .. } => inset,
            };

            let mut tangent = self.grid.point_to_node(inset);
            if self.grid.is_blocked(tangent) {
                tangent = node;
            }
            let tangent_step = if tangent == node {
                step
            } else {
                self.passed[tangent] = true;
                self.steps.push(Step {
                    node: tangent,
                    parent: Some(step),
                });
                self.steps.len() - 1
            };

            let tangent_point = self.grid.node_to_point(tangent);
            let base = weight + distance(from, tangent_point);
            let grid = self.grid;
            for next in grid.neighbors4(tangent) {
                if self.passed[next] || grid.is_blocked(next) {
                    continue;
                }
                self.passed[next] = true;
                self.steps.push(Step {
                    node: next,
                    parent: Some(tangent_step),
                });
                frontier.push(Frontier {
                    weight: base + distance(tangent_point, grid.node_to_point(next)),
                    step: self.steps.len() - 1,
                });
            }
        }

        SearchOutcome::NotFound
    }

    fn trace_back(&self, mut step: usize) -> Vec<usize> {
        let mut path = vec![self.steps[step].node];
        while let Some(parent) = self.steps[step].parent {
            path.push(self.steps[parent].node);
            step = parent;
        }
        path.reverse();
        path
    }
}

// -- String pulling ------------------------------------------------

/// Drop every point that can be skipped without losing line of sight.
///
/// From each kept point the farthest later point with a clear sightline
/// becomes the next one kept. When none is clear the next point is
/// kept regardless. The last point is always kept.
pub fn optimize_pathway(points: &[Point], walls: &[Segment], radius: f64) -> Vec<Point> {
    let Some(last) = points.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut kept = Vec::new();
    let mut i = 0;
    while i < last {
        kept.push(points[i]);
        i = (i + 1..=last)
            .rev()
            .find(|&j| sightline(points[i], points[j], walls, radius).is_clear())
            .unwrap_or(i + 1);
    }
    kept.push(points[last]);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Building;

    fn boxed(x0: f64, y0: f64, x1: f64, y1: f64) -> Building {
        Building::new(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    fn walls(buildings: &[Building]) -> Vec<Segment> {
        crate::grid::walls_from_buildings(buildings)
    }

    #[test]
    fn sightline_without_walls_is_clear() {
        let s = sightline((0.0, 0.0), (3.0, 4.0), &[], 1.0);
        assert_eq!(s, Sightline::Clear { distance: 5.0 });
    }

    #[test]
    fn sightline_reports_nearest_hit_and_inset() {
        let walls = vec![((5.0, -5.0), (5.0, 5.0)), ((8.0, -5.0), (8.0, 5.0))];
        match sightline((0.0, 0.0), (10.0, 0.0), &walls, 1.0) {
            Sightline::Blocked {
                hit,
                distance,
                inset,
            } => {
                assert!((hit.0 - 5.0).abs() < 1e-9);
                assert!((distance - 5.0).abs() < 1e-9);
                assert!((inset.0 - 4.0).abs() < 1e-9);
            }
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn corridor_edges_catch_walls_beside_the_centre_line() {
        // Short wall just off the centre line, inside the agent radius.
        let walls = vec![((4.0, 0.5), (4.0, 0.9))];
        assert!(!sightline((0.0, 0.0), (10.0, 0.0), &walls, 1.0).is_clear());
        assert!(sightline((0.0, 0.0), (10.0, 0.0), &walls, 0.2).is_clear());
    }

    #[test]
    fn inset_clamps_to_start() {
        let walls = vec![((0.5, -5.0), (0.5, 5.0))];
        match sightline((0.0, 0.0), (10.0, 0.0), &walls, 1.0) {
            Sightline::Blocked { inset, .. } => assert_eq!(inset, (0.0, 0.0)),
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn direct_sight_needs_no_detour() {
        let grid = ObstacleGrid::build(40.0, 40.0, 2.0, &[]);
        let mut session = SearchSession::new(&grid, &[], 1.0, 1000);
        let a = (-12.3, 4.1);
        let b = (9.7, -6.2);
        match session.search(a, b) {
            SearchOutcome::Found { path, weight } => {
                assert_eq!(path, vec![grid.point_to_node(a)]);
                assert!((weight - distance(a, b)).abs() < 1e-9);
            }
            SearchOutcome::NotFound => panic!("expected a path"),
        }
        assert_eq!(session.expansions(), 1);
    }

    #[test]
    fn search_goes_around_a_wall() {
        let buildings = vec![boxed(-1.0, -10.0, 1.0, 10.0)];
        let grid = ObstacleGrid::build(40.0, 40.0, 2.0, &buildings);
        let walls = walls(&buildings);
        let mut session = SearchSession::new(&grid, &walls, 1.0, 10_000);
        let (start, goal) = ((-10.0, 0.0), (10.0, 0.0));
        match session.search(start, goal) {
            SearchOutcome::Found { path, weight } => {
                assert!(path.len() > 1);
                assert!(path.iter().skip(1).all(|&n| !grid.is_blocked(n)));
                assert!(weight > distance(start, goal));
                let last = grid.node_to_point(*path.last().unwrap());
                assert!(sightline(last, goal, &walls, 1.0).is_clear());
            }
            SearchOutcome::NotFound => panic!("expected a path"),
        }
    }

    #[test]
    fn enclosed_goal_is_not_found() {
        let buildings = vec![boxed(4.0, -6.0, 16.0, 6.0)];
        let grid = ObstacleGrid::build(40.0, 40.0, 2.0, &buildings);
        let walls = walls(&buildings);
        let mut session = SearchSession::new(&grid, &walls, 1.0, 100_000);
        assert_eq!(
            session.search((-10.0, 0.0), (10.0, 0.0)),
            SearchOutcome::NotFound
        );
    }

    #[test]
    fn enclosed_start_and_goal_are_not_found() {
        let buildings = vec![boxed(-16.0, -6.0, -4.0, 6.0), boxed(4.0, -6.0, 16.0, 6.0)];
        let grid = ObstacleGrid::build(40.0, 40.0, 2.0, &buildings);
        let walls = walls(&buildings);
        let mut session = SearchSession::new(&grid, &walls, 1.0, 100_000);
        assert_eq!(
            session.search((-10.0, 0.0), (10.0, 0.0)),
            SearchOutcome::NotFound
        );
        assert_eq!(session.expansions(), 1);
    }

    #[test]
    fn exhausted_budget_gives_up() {
        let buildings = vec![boxed(-1.0, -15.0, 1.0, 15.0)];
        let grid = ObstacleGrid::build(40.0, 40.0, 2.0, &buildings);
        let walls = walls(&buildings);
        let mut session = SearchSession::new(&grid, &walls, 1.0, 2);
        assert_eq!(
            session.search((-10.0, 0.0), (10.0, 0.0)),
            SearchOutcome::NotFound
        );
        assert_eq!(session.expansions(), 2);
    }

    #[test]
    fn optimize_keeps_only_needed_corners() {
        let walls = vec![((5.0, -5.0), (5.0, 5.0))];
        let raw = vec![
            (0.0, 0.0),
            (2.0, 3.0),
            (3.0, 7.0),
            (5.0, 7.0),
            (7.0, 7.0),
            (8.0, 3.0),
            (10.0, 0.0),
        ];
        let opt = optimize_pathway(&raw, &walls, 0.5);
        assert_eq!(opt.first(), Some(&(0.0, 0.0)));
        assert_eq!(opt.last(), Some(&(10.0, 0.0)));
        assert!(opt.len() < raw.len());
        for pair in opt.windows(2) {
            assert!(sightline(pair[0], pair[1], &walls, 0.5).is_clear());
        }
    }

    #[test]
    fn optimize_keeps_detour_around_wall_inside_agent_width() {
        // Neither wall end reaches the corridor edge at y = 1.
        let walls = vec![((5.0, 0.3), (5.0, 0.8))];
        let raw = [(0.0, 0.0), (5.0, 3.0), (10.0, 0.0)];
        assert_eq!(optimize_pathway(&raw, &walls, 1.0), raw.to_vec());
        assert_eq!(
            optimize_pathway(&raw, &walls, 0.2),
            vec![(0.0, 0.0), (10.0, 0.0)]
        );
    }

    #[test]
    fn optimize_handles_short_inputs() {
        assert!(optimize_pathway(&[], &[], 1.0).is_empty());
        assert_eq!(optimize_pathway(&[(1.0, 1.0)], &[], 1.0), vec![(1.0, 1.0)]);
        let straight = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        assert_eq!(
            optimize_pathway(&straight, &[], 1.0),
            vec![(0.0, 0.0), (3.0, 0.0)]
        );
    }
}
