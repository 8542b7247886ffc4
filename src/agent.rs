//! A walking agent that follows paced paths one step per tick.

use std::collections::VecDeque;

use log::debug;
use rand::Rng;

use crate::error::NavError;
use crate::geometry::Point;
use crate::requests::{RequestTicket, RequestTracker};
use crate::types::{NavigationPath, VisionPoint};
use crate::visibility::is_point_visible;
use crate::world::World;

/// Random destinations tried before a wander gives up.
const WANDER_ATTEMPTS: usize = 8;

#[derive(Debug)]
pub struct Walker {
    position: Point,
    steps: VecDeque<Point>,
    /// Keep picking random destinations whenever the path runs out.
    wandering: bool,
    /// Whether another observer currently sees this walker.
    visible: bool,
    requests: RequestTracker,
}

impl Walker {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            steps: VecDeque::new(),
            wandering: false,
            visible: true,
            requests: RequestTracker::new(),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Teleport, dropping any pending path.
    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        self.stop();
    }

    pub fn is_idle(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    /// Ticket for a path computed elsewhere, e.g. on a worker thread.
    pub fn begin_move(&self) -> RequestTicket {
        self.requests.begin()
    }

    /// Install a computed path unless a newer request has started since
    /// `ticket` was issued. Returns whether the path was accepted.
    pub fn deliver(&mut self, ticket: RequestTicket, path: NavigationPath) -> bool {
        if !self.requests.is_current(ticket) {
            debug!(
                "discarding stale path from request {}",
                ticket.generation()
            );
            return false;
        }
        self.steps = path.steps.into();
        true
    }

    /// Replace the current path with one to `goal`.
    pub fn move_to(&mut self, world: &World, goal: Point) -> Result<usize, NavError> {
        let ticket = self.begin_move();
        let path = world.find_path(self.position, goal)?;
        self.deliver(ticket, path);
        Ok(self.steps.len())
    }

    /// Drop the pending path and any request in flight.
    pub fn stop(&mut self) {
        self.requests.cancel();
        self.steps.clear();
    }

    /// Advance one step and return the new position.
    pub fn tick(&mut self) -> Point {
        if let Some(next) = self.steps.pop_front() {
            self.position = next;
        }
        self.position
    }

    /// Like `tick`, but a wandering walker that runs out of path picks a
    /// new random destination first.
    pub fn tick_in<R: Rng>(&mut self, world: &World, rng: &mut R) -> Point {
        if self.wandering && self.is_idle() {
            self.wander(world, rng);
        }
        self.tick()
    }

    pub fn set_wandering(&mut self, wandering: bool) {
        self.wandering = wandering;
    }

    pub fn is_wandering(&self) -> bool {
        self.wandering
    }

    /// Head for a random walkable cell. Returns the destination, or
    /// `None` when no reachable one was found.
    pub fn wander<R: Rng>(&mut self, world: &World, rng: &mut R) -> Option<Point> {
        for _ in 0..WANDER_ATTEMPTS {
            let goal = world.random_walkable_point(rng)?;
            match self.move_to(world, goal) {
                Ok(_) => return Some(goal),
                Err(e) => debug!("wander target rejected: {e}"),
            }
        }
        None
    }

    pub fn vision(&self, world: &World) -> Vec<VisionPoint> {
        world.compute_visibility(self.position)
    }

    pub fn can_see(&self, world: &World, point: Point) -> bool {
        is_point_visible(point, &self.vision(world))
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide this walker depending on whether it lies inside an
    /// observer's visibility polygon.
    pub fn update_visibility(&mut self, observer_vision: &[VisionPoint]) -> bool {
        self.visible = is_point_visible(self.position, observer_vision);
        self.visible
    }
}
