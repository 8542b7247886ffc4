//! Data types of the world description and engine results.
//!
//! Every struct here derives Serialize + Deserialize so it can
//! round-trip through the JSON interchange format shared with the
//! scene loader.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

// -- Coordinates ---------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Swiss LV95 (EPSG:2056) coordinates in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub easting: f64,
    pub northing: f64,
}

/// Fractional slippy-map tile coordinates at some zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePixel {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

/// Mapping between the tile range loaded by the scene and the local
/// plane, which is centred on the origin and spans
/// `x_bounds × z_bounds`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub zoom: u32,
    pub x_bounds: f64,
    pub z_bounds: f64,
    pub x_delta: f64,
    pub z_delta: f64,
    pub xmin: f64,
    pub zmax: f64,
    /// Geographic area actually covered once snapped to whole tiles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covered: Option<GeoBox>,
}

// -- Buildings -----------------------------------------------------

fn default_building_height() -> f64 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    #[serde(default = "default_building_height")]
    pub height: f64,
    pub points: Vec<Point>,
}

impl Building {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            height: default_building_height(),
            points,
        }
    }
}

// -- Parameters ----------------------------------------------------

fn default_agent_radius() -> f64 {
    1.0
}
fn default_speed() -> f64 {
    1.0
}
fn default_max_expansions() -> usize {
    20_000
}
fn default_vision_radius() -> f64 {
    100.0
}
fn default_vision_segments() -> usize {
    50
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavParams {
    #[serde(default = "default_agent_radius")]
    pub agent_radius: f64,
    /// Distance covered per step of a paced path.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Grid cell edge length. Twice the agent radius when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<f64>,
    /// Frontier pops allowed before the line-of-sight search gives up.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
}

impl NavParams {
    pub fn cell_size(&self) -> f64 {
        self.cell_size.unwrap_or(self.agent_radius * 2.0)
    }
}

impl Default for NavParams {
    fn default() -> Self {
        Self {
            agent_radius: default_agent_radius(),
            speed: default_speed(),
            cell_size: None,
            max_expansions: default_max_expansions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionParams {
    #[serde(default = "default_vision_radius")]
    pub radius: f64,
    /// Number of segments of the circle bounding the visible area.
    #[serde(default = "default_vision_segments")]
    pub segments: usize,
    /// Also cast rays just beside every vertex so the area behind
    /// building corners is captured.
    #[serde(default)]
    pub corner_rays: bool,
}

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            radius: default_vision_radius(),
            segments: default_vision_segments(),
            corner_rays: false,
        }
    }
}

// -- World ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldDescription {
    pub bounds: WorldBounds,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub nav: NavParams,
    #[serde(default)]
    pub vision: VisionParams,
}

// -- Results -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub point: Point,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionPoint {
    pub angle: f64,
    pub square_distance: f64,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationPath {
    /// Simplified route, starting at the requested start point.
    pub waypoints: Vec<Waypoint>,
    /// One position per movement tick.
    pub steps: Vec<Point>,
    /// Accumulated search weight of the raw grid path.
    pub weight: f64,
}

impl NavigationPath {
    /// Path of a request whose start and goal coincide.
    pub fn stationary(at: Point, speed: f64) -> Self {
        Self {
            waypoints: vec![Waypoint { point: at, speed }],
            steps: Vec::new(),
            weight: 0.0,
        }
    }
}

// -- Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_defaults() {
        let json = r#"{
            "bounds": {
                "zoom": 17,
                "x_bounds": 200.0,
                "z_bounds": 150.0,
                "x_delta": 4.0,
                "z_delta": 3.0,
                "xmin": 68190.0,
                "zmax": 45820.0
            },
            "buildings": [
                {"points": [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]}
            ]
        }"#;

        let desc: WorldDescription = serde_json::from_str(json).expect("deserialize");
        assert_eq!(desc.bounds.zoom, 17);
        assert!(desc.bounds.covered.is_none());
        assert_eq!(desc.buildings[0].height, 10.0);
        assert_eq!(desc.buildings[0].points[1], (10.0, 0.0));
        assert_eq!(desc.nav, NavParams::default());
        assert_eq!(desc.nav.cell_size(), 2.0);
        assert_eq!(desc.vision.segments, 50);
        assert_eq!(desc.vision.radius, 100.0);

        // Re-serialize and verify it's valid JSON
        let out = serde_json::to_string(&desc).expect("serialize");
        let _: WorldDescription = serde_json::from_str(&out).expect("re-deserialize");
    }

    #[test]
    fn explicit_cell_size_wins() {
        let nav: NavParams =
            serde_json::from_str(r#"{"agent_radius": 0.5, "cell_size": 3.0}"#).expect("deserialize");
        assert_eq!(nav.cell_size(), 3.0);
        assert_eq!(nav.speed, 1.0);
    }

    #[test]
    fn stationary_path_has_no_steps() {
        let path = NavigationPath::stationary((1.0, 2.0), 1.0);
        let json = serde_json::to_string(&path).expect("serialize");
        assert!(json.contains("\"steps\":[]"));
        assert_eq!(path.waypoints.len(), 1);
    }
}
