//! The navigable world: bounds, buildings and the cached grid.

use log::{debug, info, warn};
use rand::Rng;

use crate::astar::{astar, path_length};
use crate::error::NavError;
use crate::geometry::{distance, normalize_winding, Point, Segment};
use crate::grid::{walls_from_buildings, ObstacleGrid};
use crate::pacer::generate_speed_pathway;
use crate::pathfinding::{optimize_pathway, SearchOutcome, SearchSession};
use crate::types::{
    Building, NavParams, NavigationPath, VisionParams, VisionPoint, Waypoint, WorldBounds,
    WorldDescription,
};
use crate::visibility::{compute_visibility, is_point_visible};

/// Requests shorter than this are already at their goal.
const ARRIVED: f64 = 1e-9;

/// Cells tried for the grid fallback: the start cell, then N, E, S, W.
const FALLBACK_OFFSETS: [(isize, isize); 5] = [(0, 0), (0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Debug, Clone)]
pub struct World {
    bounds: WorldBounds,
    buildings: Vec<Building>,
    nav: NavParams,
    vision: VisionParams,
    grid: ObstacleGrid,
    walls: Vec<Segment>,
}

fn check_bounds(bounds: &WorldBounds) -> Result<(), NavError> {
    let positive = [
        ("x_bounds", bounds.x_bounds),
        ("z_bounds", bounds.z_bounds),
        ("x_delta", bounds.x_delta),
        ("z_delta", bounds.z_delta),
    ];
    for (name, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(NavError::InvalidParams(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }
    Ok(())
}

fn check_nav(nav: &NavParams) -> Result<(), NavError> {
    if !(nav.agent_radius.is_finite() && nav.agent_radius >= 0.0) {
        return Err(NavError::InvalidParams(format!(
            "agent_radius must be non-negative, got {}",
            nav.agent_radius
        )));
    }
    if !(nav.speed.is_finite() && nav.speed > 0.0) {
        return Err(NavError::InvalidParams(format!(
            "speed must be positive, got {}",
            nav.speed
        )));
    }
    let cell = nav.cell_size();
    if !(cell.is_finite() && cell > 0.0) {
        return Err(NavError::InvalidParams(format!(
            "cell size must be positive, got {cell}"
        )));
    }
    Ok(())
}

fn check_vision(vision: &VisionParams) -> Result<(), NavError> {
    if !(vision.radius.is_finite() && vision.radius > 0.0) {
        return Err(NavError::InvalidParams(format!(
            "vision radius must be positive, got {}",
            vision.radius
        )));
    }
    if vision.segments < 3 {
        return Err(NavError::InvalidParams(format!(
            "vision needs at least 3 segments, got {}",
            vision.segments
        )));
    }
    Ok(())
}

fn normalized(mut buildings: Vec<Building>) -> Vec<Building> {
    for b in &mut buildings {
        normalize_winding(&mut b.points);
    }
    buildings
}

/// Reject points outside the local plane `[-x/2, x/2] × [-z/2, z/2]`.
fn check_inside(bounds: &WorldBounds, name: &str, p: Point) -> Result<(), NavError> {
    let (hx, hz) = (bounds.x_bounds / 2.0, bounds.z_bounds / 2.0);
    let inside = p.0.is_finite() && p.1.is_finite() && p.0.abs() <= hx && p.1.abs() <= hz;
    if !inside {
        return Err(NavError::InvalidParams(format!(
            "{name} ({}, {}) lies outside the world extent ±{hx} × ±{hz}",
            p.0, p.1
        )));
    }
    Ok(())
}

/// Drop points that coincide with their predecessor.
fn dedup_points(points: &mut Vec<Point>) {
    points.dedup_by(|b, a| distance(*a, *b) < ARRIVED);
}

impl World {
    pub fn new(desc: WorldDescription) -> Result<Self, NavError> {
        check_bounds(&desc.bounds)?;
        check_nav(&desc.nav)?;
        check_vision(&desc.vision)?;

        let buildings = normalized(desc.buildings);
        let grid = ObstacleGrid::build(
            desc.bounds.x_bounds,
            desc.bounds.z_bounds,
            desc.nav.cell_size(),
            &buildings,
        );
        let walls = walls_from_buildings(&buildings);
        info!(
            "world ready: {} buildings, {} walls, {}x{} grid with {} blocked cells",
            buildings.len(),
            walls.len(),
            grid.width(),
            grid.height(),
            grid.blocked_count()
        );

        Ok(Self {
            bounds: desc.bounds,
            buildings,
            nav: desc.nav,
            vision: desc.vision,
            grid,
            walls,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let desc: WorldDescription = serde_json::from_str(json)?;
        Self::new(desc)
    }

    pub fn description(&self) -> WorldDescription {
        WorldDescription {
            bounds: self.bounds.clone(),
            buildings: self.buildings.clone(),
            nav: self.nav.clone(),
            vision: self.vision.clone(),
        }
    }

    pub fn bounds(&self) -> &WorldBounds {
        &self.bounds
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn nav(&self) -> &NavParams {
        &self.nav
    }

    pub fn vision(&self) -> &VisionParams {
        &self.vision
    }

    pub fn grid(&self) -> &ObstacleGrid {
        &self.grid
    }

    pub fn walls(&self) -> &[Segment] {
        &self.walls
    }

    pub fn set_buildings(&mut self, buildings: Vec<Building>) {
        self.buildings = normalized(buildings);
        self.walls = walls_from_buildings(&self.buildings);
        self.rebuild_grid();
    }

    pub fn set_bounds(&mut self, bounds: WorldBounds) -> Result<(), NavError> {
        check_bounds(&bounds)?;
        self.bounds = bounds;
        self.rebuild_grid();
        Ok(())
    }

    /// Only a change of radius or cell size rebuilds the grid.
    pub fn set_nav_params(&mut self, nav: NavParams) -> Result<(), NavError> {
        check_nav(&nav)?;
        let regrid = nav.cell_size() != self.nav.cell_size();
        self.nav = nav;
        if regrid {
            self.rebuild_grid();
        }
        Ok(())
    }

    pub fn set_vision_params(&mut self, vision: VisionParams) -> Result<(), NavError> {
        check_vision(&vision)?;
        self.vision = vision;
        Ok(())
    }

    fn rebuild_grid(&mut self) {
        self.grid = ObstacleGrid::build(
            self.bounds.x_bounds,
            self.bounds.z_bounds,
            self.nav.cell_size(),
            &self.buildings,
        );
        debug!(
            "grid rebuilt: {}x{}, {} blocked",
            self.grid.width(),
            self.grid.height(),
            self.grid.blocked_count()
        );
    }

    /// Walkable route from `start` to `goal`, simplified and paced.
    pub fn find_path(&self, start: Point, goal: Point) -> Result<NavigationPath, NavError> {
        check_inside(&self.bounds, "start", start)?;
        check_inside(&self.bounds, "goal", goal)?;
        if distance(start, goal) < ARRIVED {
            return Ok(NavigationPath::stationary(start, self.nav.speed));
        }

        let radius = self.nav.agent_radius;
        let start_node = self.grid.point_to_node(start);

        let mut session =
            SearchSession::new(&self.grid, &self.walls, radius, self.nav.max_expansions);
        let (nodes, weight) = match session.search(start, goal) {
            SearchOutcome::Found { path, weight } => {
                debug!(
                    "line-of-sight search: {} nodes after {} expansions",
                    path.len(),
                    session.expansions()
                );
                (path, weight)
            }
            SearchOutcome::NotFound => {
                info!(
                    "line-of-sight search failed after {} expansions, trying grid search",
                    session.expansions()
                );
                self.grid_fallback(start, start_node, goal)
                    .ok_or(NavError::NoPath { start, goal })?
            }
        };

        let mut raw = Vec::with_capacity(nodes.len() + 2);
        raw.push(start);
        raw.extend(
            nodes
                .iter()
                .skip_while(|&&n| n == start_node)
                .map(|&n| self.grid.node_to_point(n)),
        );
        raw.push(goal);
        dedup_points(&mut raw);

        let waypoints: Vec<Waypoint> = optimize_pathway(&raw, &self.walls, radius)
            .into_iter()
            .map(|point| Waypoint {
                point,
                speed: self.nav.speed,
            })
            .collect();
        let steps = generate_speed_pathway(&waypoints);

        Ok(NavigationPath {
            waypoints,
            steps,
            weight,
        })
    }

    /// Node path and its weight, including the legs from `start` to the
    /// first cell centre and from the last cell centre to `goal`.
    fn grid_fallback(
        &self,
        start: Point,
        start_node: usize,
        goal: Point,
    ) -> Option<(Vec<usize>, f64)> {
        let goal_node = self.grid.point_to_node(goal);
        for (di, dj) in FALLBACK_OFFSETS {
            let from = self.grid.offset_node(start_node, di, dj);
            if let Some(path) = astar(&self.grid, from, goal_node) {
                debug!("grid search from offset ({di}, {dj}): {} nodes", path.len());
                let (first, last) = match (path.first(), path.last()) {
                    (Some(&first), Some(&last)) => (first, last),
                    _ => continue,
                };
                let weight = distance(start, self.grid.node_to_point(first))
                    + path_length(&self.grid, &path)
                    + distance(self.grid.node_to_point(last), goal);
                return Some((path, weight));
            }
        }
        warn!(
            "no path to ({:.2}, {:.2}) from any cell around node {start_node}",
            goal.0, goal.1
        );
        None
    }

    pub fn compute_visibility(&self, observer: Point) -> Vec<VisionPoint> {
        compute_visibility(observer, &self.buildings, &self.vision)
    }

    pub fn can_see(&self, observer: Point, target: Point) -> bool {
        is_point_visible(target, &self.compute_visibility(observer))
    }

    /// Centre of a random free cell, or `None` when every cell is blocked.
    pub fn random_walkable_point<R: Rng>(&self, rng: &mut R) -> Option<Point> {
        let free = self.grid.len() - self.grid.blocked_count();
        if free == 0 {
            return None;
        }
        let pick = rng.gen_range(0..free);
        self.grid
            .free_nodes()
            .nth(pick)
            .map(|n| self.grid.node_to_point(n))
    }
}
