//! Classical 4-connected A* over the occupancy grid.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::distance;
use crate::grid::ObstacleGrid;

#[derive(Debug, Clone, Copy)]
struct Open {
    f: f64,
    node: usize,
}

impl PartialEq for Open {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Open {}

impl PartialOrd for Open {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Open {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Shortest 4-connected node path from `start` to `goal`, both included.
///
/// Returns `None` when either end is blocked or the two are not
/// connected. The heuristic is the Euclidean distance between cell
/// centres.
pub fn astar(grid: &ObstacleGrid, start: usize, goal: usize) -> Option<Vec<usize>> {
    if grid.is_blocked(start) || grid.is_blocked(goal) {
        return None;
    }

    let goal_point = grid.node_to_point(goal);
    let h = |n: usize| distance(grid.node_to_point(n), goal_point);

    let mut g = vec![f64::INFINITY; grid.len()];
    let mut came_from = vec![usize::MAX; grid.len()];
    let mut closed = vec![false; grid.len()];
    let mut open = BinaryHeap::new();

    g[start] = 0.0;
    open.push(Open {
        f: h(start),
        node: start,
    });

    while let Some(Open { node, .. }) = open.pop() {
        if node == goal {
            let mut path = vec![goal];
            let mut cur = goal;
            while cur != start {
                cur = came_from[cur];
                path.push(cur);
            }
            path.reverse();
            return Some(path);
        }
        if closed[node] {
            continue;
        }
        closed[node] = true;

        let here = grid.node_to_point(node);
        for next in grid.neighbors4(node) {
            if closed[next] || grid.is_blocked(next) {
                continue;
            }
            let tentative = g[node] + distance(here, grid.node_to_point(next));
            if tentative < g[next] {
                g[next] = tentative;
                came_from[next] = node;
                open.push(Open {
                    f: tentative + h(next),
                    node: next,
                });
            }
        }
    }

    None
}

/// Length of a node path measured between cell centres.
pub fn path_length(grid: &ObstacleGrid, path: &[usize]) -> f64 {
    path.windows(2)
        .map(|w| distance(grid.node_to_point(w[0]), grid.node_to_point(w[1])))
        .sum()
}
