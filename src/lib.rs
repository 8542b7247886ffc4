//! Navigation and visibility engine for walkable worlds built from
//! OpenStreetMap buildings.
//!
//! Geographic coordinates are projected onto a bounded local plane,
//! building footprints are rasterized into an occupancy grid, and paths
//! across that grid are searched with line of sight, simplified and
//! paced at constant speed. Visibility polygons are computed against the
//! same footprints.
//!
//! With the `python` feature the crate also builds a Python extension
//! exposing JSON-in/JSON-out functions.

pub mod agent;
pub mod api;
pub mod astar;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod pacer;
pub mod pathfinding;
pub mod projection;
pub mod requests;
pub mod types;
pub mod visibility;
pub mod world;

pub use error::NavError;
pub use world::World;

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    use crate::geometry::Point;
    use crate::world::World;

    fn value_error(e: impl std::fmt::Display) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
    }

    /// Find a path through the world described by `world_json`.
    ///
    /// Returns the navigation path as a JSON string.
    #[pyfunction]
    fn find_path_json(world_json: &str, start: Point, goal: Point) -> PyResult<String> {
        let world = World::from_json(world_json).map_err(value_error)?;
        let path = world.find_path(start, goal).map_err(value_error)?;
        serde_json::to_string(&path).map_err(|e| {
            value_error(format!("Failed to serialize navigation path: {e}"))
        })
    }

    /// Visibility polygon around `observer` as a JSON string.
    #[pyfunction]
    fn compute_visibility_json(world_json: &str, observer: Point) -> PyResult<String> {
        let world = World::from_json(world_json).map_err(value_error)?;
        let polygon = world.compute_visibility(observer);
        serde_json::to_string(&polygon).map_err(|e| {
            value_error(format!("Failed to serialize visibility polygon: {e}"))
        })
    }

    /// Answer a tagged JSON request (`path`, `visibility`, `project` or
    /// `grid`) against the world described by `world_json`.
    #[pyfunction]
    fn handle_request_json(world_json: &str, request_json: &str) -> PyResult<String> {
        crate::api::handle_request_json(world_json, request_json).map_err(value_error)
    }

    #[pymodule]
    fn osm_navigator(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(find_path_json, m)?)?;
        m.add_function(wrap_pyfunction!(compute_visibility_json, m)?)?;
        m.add_function(wrap_pyfunction!(handle_request_json, m)?)?;
        Ok(())
    }
}
