//! Error type shared by the world façade, the JSON API and the CLI.

use thiserror::Error;

use crate::geometry::Point;

#[derive(Debug, Error)]
pub enum NavError {
    /// Start and goal are not connected through walkable cells.
    #[error("no path from ({:.2}, {:.2}) to ({:.2}, {:.2})", .start.0, .start.1, .goal.0, .goal.1)]
    NoPath { start: Point, goal: Point },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
