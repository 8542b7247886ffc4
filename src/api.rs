//! JSON request handling shared by the CLI and the Python bindings.

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::geometry::Point;
use crate::projection::{geo_to_local, geo_to_projected, geo_to_tile_pixel};
use crate::types::{GeoPoint, NavigationPath, ProjectedPoint, TilePixel, VisionPoint};
use crate::visibility::visible_area;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Path { start: Point, goal: Point },
    Visibility { observer: Point },
    Project { latitude: f64, longitude: f64 },
    Grid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityResult {
    pub polygon: Vec<VisionPoint>,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub projected: ProjectedPoint,
    pub tile: TilePixel,
    pub local: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub width: usize,
    pub height: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    /// Indices of blocked cells, row-major.
    pub blocked: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Path(NavigationPath),
    Visibility(VisibilityResult),
    Project(ProjectionResult),
    Grid(GridSummary),
}

pub fn handle_request(world: &World, request: &Request) -> Result<Response, NavError> {
    Ok(match *request {
        Request::Path { start, goal } => Response::Path(world.find_path(start, goal)?),
        Request::Visibility { observer } => {
            let polygon = world.compute_visibility(observer);
            let area = visible_area(&polygon);
            Response::Visibility(VisibilityResult { polygon, area })
        }
        Request::Project {
            latitude,
            longitude,
        } => {
            let bounds = world.bounds();
            Response::Project(ProjectionResult {
                projected: geo_to_projected(latitude, longitude),
                tile: geo_to_tile_pixel(latitude, longitude, bounds.zoom),
                local: geo_to_local(
                    GeoPoint {
                        latitude,
                        longitude,
                    },
                    bounds,
                ),
            })
        }
        Request::Grid => {
            let grid = world.grid();
            Response::Grid(GridSummary {
                width: grid.width(),
                height: grid.height(),
                cell_width: grid.cell_width(),
                cell_height: grid.cell_height(),
                blocked: (0..grid.len()).filter(|&n| grid.is_blocked(n)).collect(),
            })
        }
    })
}

/// Build a world from `world_json`, answer `request_json` against it and
/// return the response as JSON.
pub fn handle_request_json(world_json: &str, request_json: &str) -> Result<String, NavError> {
    let world = World::from_json(world_json)?;
    let request: Request = serde_json::from_str(request_json)?;
    let response = handle_request(&world, &request)?;
    Ok(serde_json::to_string(&response)?)
}
