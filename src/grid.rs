//! Occupancy grid rasterized from building footprints.
//!
//! The grid covers `x_extent × z_extent` centred on the origin. Cell
//! `(i, j)` spans `[-W/2 + i·cw, -W/2 + (i+1)·cw] × [-H/2 + j·ch, ...]`
//! and is stored row-major at `i + j·width`.

use rayon::prelude::*;

use crate::geometry::{point_in_polygon, polygon_edges, segment_intersection, Point, Segment};
use crate::types::Building;

/// Axis-aligned bounding box: (min_x, min_y, max_x, max_y).
type Aabb = (f64, f64, f64, f64);

fn aabb(points: &[Point]) -> Aabb {
    points.iter().fold(
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
    )
}

#[inline]
fn aabbs_touch(a: &Aabb, b: &Aabb) -> bool {
    a.0 <= b.2 && b.0 <= a.2 && a.1 <= b.3 && b.1 <= a.3
}

/// Footprint prepared for cell tests.
struct Footprint<'a> {
    points: &'a [Point],
    edges: Vec<Segment>,
    bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleGrid {
    width: usize,
    height: usize,
    cell_width: f64,
    cell_height: f64,
    x_extent: f64,
    z_extent: f64,
    cells: Vec<bool>,
}

impl ObstacleGrid {
    /// Rasterize `buildings` into a grid of roughly `cell_size` cells.
    ///
    /// A cell is blocked when a building contains one of its corners,
    /// has a vertex inside it, or has an edge crossing one of its
    /// edges. Buildings with fewer than 3 points are ignored.
    pub fn build(x_extent: f64, z_extent: f64, cell_size: f64, buildings: &[Building]) -> Self {
        let width = ((x_extent / cell_size).round() as usize).max(1);
        let height = ((z_extent / cell_size).round() as usize).max(1);
        let cell_width = x_extent / width as f64;
        let cell_height = z_extent / height as f64;

        let footprints: Vec<Footprint> = buildings
            .iter()
            .filter(|b| b.points.len() >= 3)
            .map(|b| Footprint {
                points: &b.points,
                edges: polygon_edges(&b.points),
                bounds: aabb(&b.points),
            })
            .collect();

        let min_x = -x_extent / 2.0;
        let min_y = -z_extent / 2.0;
        let cells = (0..width * height)
            .into_par_iter()
            .map(|idx| {
                let (i, j) = (idx % width, idx / width);
                let x0 = min_x + i as f64 * cell_width;
                let y0 = min_y + j as f64 * cell_height;
                cell_blocked((x0, y0, x0 + cell_width, y0 + cell_height), &footprints)
            })
            .collect();

        Self {
            width,
            height,
            cell_width,
            cell_height,
            x_extent,
            z_extent,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    #[inline]
    pub fn node_to_ij(&self, node: usize) -> (usize, usize) {
        (node % self.width, node / self.width)
    }

    #[inline]
    pub fn ij_to_node(&self, i: usize, j: usize) -> usize {
        i + j * self.width
    }

    /// Centre of the node's cell.
    pub fn node_to_point(&self, node: usize) -> Point {
        let (i, j) = self.node_to_ij(node);
        (
            -self.x_extent / 2.0 + (i as f64 + 0.5) * self.cell_width,
            -self.z_extent / 2.0 + (j as f64 + 0.5) * self.cell_height,
        )
    }

    /// Node whose cell contains `p`; points outside the grid snap to
    /// the nearest border cell.
    pub fn point_to_node(&self, p: Point) -> usize {
        let fi = ((p.0 + self.x_extent / 2.0) / self.cell_width).floor();
        let fj = ((p.1 + self.z_extent / 2.0) / self.cell_height).floor();
        let i = clamp_index(fi, self.width);
        let j = clamp_index(fj, self.height);
        self.ij_to_node(i, j)
    }

    /// Node at `(i + di, j + dj)` clamped to the grid.
    pub fn offset_node(&self, node: usize, di: isize, dj: isize) -> usize {
        let (i, j) = self.node_to_ij(node);
        let i = (i as isize + di).clamp(0, self.width as isize - 1) as usize;
        let j = (j as isize + dj).clamp(0, self.height as isize - 1) as usize;
        self.ij_to_node(i, j)
    }

    #[inline]
    pub fn is_blocked(&self, node: usize) -> bool {
        self.cells[node]
    }

    /// North, east, south and west neighbours that exist.
    pub fn neighbors4(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        let (i, j) = self.node_to_ij(node);
        let candidates = [
            (j + 1 < self.height).then(|| self.ij_to_node(i, j + 1)),
            (i + 1 < self.width).then(|| self.ij_to_node(i + 1, j)),
            (j > 0).then(|| self.ij_to_node(i, j - 1)),
            (i > 0).then(|| self.ij_to_node(i - 1, j)),
        ];
        candidates.into_iter().flatten()
    }

    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }

    pub fn free_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &b)| !b)
            .map(|(n, _)| n)
    }

    /// `#` for blocked and `.` for free cells, north row first.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for j in (0..self.height).rev() {
            for i in 0..self.width {
                out.push(if self.cells[self.ij_to_node(i, j)] { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

#[inline]
fn clamp_index(f: f64, len: usize) -> usize {
    if f <= 0.0 {
        0
    } else {
        (f as usize).min(len - 1)
    }
}

fn cell_blocked(cell: Aabb, footprints: &[Footprint]) -> bool {
    let (x0, y0, x1, y1) = cell;
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    let cell_edges: [Segment; 4] = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[3]),
        (corners[3], corners[0]),
    ];

    footprints.iter().any(|fp| {
        if !aabbs_touch(&cell, &fp.bounds) {
            return false;
        }
        corners.iter().any(|&c| point_in_polygon(c, fp.points))
            || fp
                .points
                .iter()
                .any(|&(x, y)| x >= x0 && x <= x1 && y >= y0 && y <= y1)
            || fp.edges.iter().any(|edge| {
                cell_edges
                    .iter()
                    .any(|ce| segment_intersection(ce, edge).is_some())
            })
    })
}

/// Every building edge, including two-point walls.
pub fn walls_from_buildings(buildings: &[Building]) -> Vec<Segment> {
    buildings
        .iter()
        .flat_map(|b| polygon_edges(&b.points))
        .collect()
}
