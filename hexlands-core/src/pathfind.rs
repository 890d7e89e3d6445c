//! Pathfinding over the hex board
//!
//! Side-effect free: the authoritative engine and the client-side move
//! preview both call into this module, so the two never disagree about
//! which tiles a unit can reach or strike.

use crate::board::{Board, GridPosition};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Frontier entry ordered so the BinaryHeap pops the lowest f = g + h first
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    pos: GridPosition,
    cost: u32,
    heuristic: u32,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.cost + other.heuristic)
            .cmp(&(self.cost + self.heuristic))
            .then_with(|| other.heuristic.cmp(&self.heuristic))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `end` costing at most `max_move` steps
///
/// Returns the full path including both endpoints, or `None` when `end` is
/// off the board, blocked, or not reachable within the budget. The start
/// tile itself is never tested against `is_blocked`.
pub fn find_path<F>(
    board: &Board,
    start: GridPosition,
    end: GridPosition,
    max_move: u32,
    is_blocked: F,
) -> Option<Vec<GridPosition>>
where
    F: Fn(GridPosition) -> bool,
{
    if start == end {
        return Some(vec![start]);
    }
    if !board.contains(end) || is_blocked(end) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut came_from: FxHashMap<GridPosition, GridPosition> = FxHashMap::default();
    let mut g_score: FxHashMap<GridPosition, u32> = FxHashMap::default();

    open.push(Node {
        pos: start,
        cost: 0,
        heuristic: start.distance_to(end),
    });
    g_score.insert(start, 0);

    while let Some(current) = open.pop() {
        if current.pos == end {
            let mut path = vec![end];
            let mut curr = end;
            while let Some(&prev) = came_from.get(&curr) {
                path.push(prev);
                curr = prev;
            }
            path.reverse();
            return Some(path);
        }

        // Stale heap entry
        if current.cost > g_score.get(&current.pos).copied().unwrap_or(u32::MAX) {
            continue;
        }

        let tentative_g = current.cost + 1;
        if tentative_g > max_move {
            continue;
        }

        for neighbor in board.neighbors(current.pos) {
            if is_blocked(neighbor) {
                continue;
            }
            if tentative_g < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                came_from.insert(neighbor, current.pos);
                g_score.insert(neighbor, tentative_g);
                open.push(Node {
                    pos: neighbor,
                    cost: tentative_g,
                    heuristic: neighbor.distance_to(end),
                });
            }
        }
    }

    None
}

/// Every tile reachable from `start` within `max_move` steps, start included
///
/// Results are sorted by position.
pub fn reachable_tiles<F>(
    board: &Board,
    start: GridPosition,
    max_move: u32,
    is_blocked: F,
) -> Vec<GridPosition>
where
    F: Fn(GridPosition) -> bool,
{
    let mut cost: FxHashMap<GridPosition, u32> = FxHashMap::default();
    let mut queue = VecDeque::new();
    cost.insert(start, 0);
    queue.push_back(start);

    // Edge cost is uniform, so breadth-first order is cost order
    while let Some(pos) = queue.pop_front() {
        let next_cost = cost[&pos] + 1;
        if next_cost > max_move {
            continue;
        }
        for neighbor in board.neighbors(pos) {
            if cost.contains_key(&neighbor) || is_blocked(neighbor) {
                continue;
            }
            cost.insert(neighbor, next_cost);
            queue.push_back(neighbor);
        }
    }

    let mut tiles: Vec<GridPosition> = cost.into_keys().collect();
    tiles.sort();
    tiles
}

/// Every board tile whose distance from `start` is within [range_min, range_max]
///
/// Attack range is not a path: occupancy and terrain are ignored.
pub fn attackable_tiles(
    board: &Board,
    start: GridPosition,
    range_min: u32,
    range_max: u32,
) -> Vec<GridPosition> {
    board
        .hexes_within(start, range_max)
        .into_iter()
        .filter(|pos| start.distance_to(*pos) >= range_min)
        .collect()
}
