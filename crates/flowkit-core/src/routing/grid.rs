//! Bounded A* search over a Hanan grid.
//!
//! Grid lines run through the endpoints, their stub points and every obstacle
//! border pushed out by the clearance margin. Moves go between neighbouring
//! grid points and may not cross an obstacle interior or reverse direction.

use super::candidates::dedup_coordinates;
use super::segment_crosses;
use crate::EPSILON;
use crate::anchor::Direction;
use kurbo::{Point, Rect};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Fixed-point scale for path costs.
const COST_SCALE: f64 = 100.0;

/// Grid search parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GridSearch<'a> {
    pub start: Point,
    pub start_direction: Direction,
    pub goal: Point,
    /// Arriving at the goal moving this way would force a reversal.
    pub forbidden_arrival: Direction,
    pub obstacles: &'a [Rect],
    pub margin: f64,
    pub turn_penalty: f64,
    pub max_expansions: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridState {
    x: usize,
    y: usize,
    dir: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u64,
    cost: u64,
    state: GridState,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.state.y.cmp(&other.state.y))
            .then_with(|| self.state.x.cmp(&other.state.x))
            .then_with(|| self.state.dir.cmp(&other.state.dir))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dir_index(direction: Direction) -> u8 {
    match direction {
        Direction::Left => 0,
        Direction::Right => 1,
        Direction::Up => 2,
        Direction::Down => 3,
    }
}

fn scaled(length: f64) -> u64 {
    (length * COST_SCALE).round().max(0.0) as u64
}

fn index_of(values: &[f64], value: f64) -> Option<usize> {
    values.iter().position(|v| (v - value).abs() <= EPSILON)
}

impl GridSearch<'_> {
    /// Find a path from `start` to `goal`, including both.
    pub fn run(&self) -> Option<Vec<Point>> {
        let mut xs = vec![self.start.x, self.goal.x];
        let mut ys = vec![self.start.y, self.goal.y];
        for obstacle in self.obstacles {
            xs.extend([obstacle.x0 - self.margin, obstacle.x1 + self.margin]);
            ys.extend([obstacle.y0 - self.margin, obstacle.y1 + self.margin]);
        }
        let xs = dedup_coordinates(xs);
        let ys = dedup_coordinates(ys);

        let start = (index_of(&xs, self.start.x)?, index_of(&ys, self.start.y)?);
        let goal = (index_of(&xs, self.goal.x)?, index_of(&ys, self.goal.y)?);
        let forbidden = dir_index(self.forbidden_arrival);

        let cols = xs.len();
        let rows = ys.len();
        let state_index = |s: GridState| (s.y * cols + s.x) * 4 + s.dir as usize;
        let point_of = |x: usize, y: usize| Point::new(xs[x], ys[y]);

        let mut best_cost = vec![u64::MAX; cols * rows * 4];
        let mut prev: Vec<Option<GridState>> = vec![None; cols * rows * 4];
        let mut heap = BinaryHeap::new();
        let turn_cost = scaled(self.turn_penalty);

        let initial = GridState {
            x: start.0,
            y: start.1,
            dir: dir_index(self.start_direction),
        };
        best_cost[state_index(initial)] = 0;
        heap.push(GridEntry {
            est: 0,
            cost: 0,
            state: initial,
        });

        let mut end_state = None;
        let mut expansions = 0usize;

        while let Some(GridEntry { cost, state, .. }) = heap.pop() {
            expansions += 1;
            if expansions > self.max_expansions {
                log::debug!("Grid search gave up after {} expansions", self.max_expansions);
                break;
            }
            if cost != best_cost[state_index(state)] {
                continue;
            }
            if (state.x, state.y) == goal && state.dir != forbidden {
                end_state = Some(state);
                break;
            }

            let here = point_of(state.x, state.y);
            for direction in Direction::ALL {
                let dir = dir_index(direction);
                if dir == dir_index(Direction::ALL[state.dir as usize].opposite()) {
                    continue;
                }
                let next = match direction {
                    Direction::Left if state.x > 0 => (state.x - 1, state.y),
                    Direction::Right if state.x + 1 < cols => (state.x + 1, state.y),
                    Direction::Up if state.y > 0 => (state.x, state.y - 1),
                    Direction::Down if state.y + 1 < rows => (state.x, state.y + 1),
                    _ => continue,
                };
                let there = point_of(next.0, next.1);
                if self
                    .obstacles
                    .iter()
                    .any(|obstacle| segment_crosses(here, there, *obstacle))
                {
                    continue;
                }

                let mut next_cost = cost.saturating_add(scaled(here.distance(there)));
                if dir != state.dir {
                    next_cost = next_cost.saturating_add(turn_cost);
                }
                let next_state = GridState {
                    x: next.0,
                    y: next.1,
                    dir,
                };
                let next_idx = state_index(next_state);
                if next_cost >= best_cost[next_idx] {
                    continue;
                }
                best_cost[next_idx] = next_cost;
                prev[next_idx] = Some(state);
                let remaining = (there.x - self.goal.x).abs() + (there.y - self.goal.y).abs();
                heap.push(GridEntry {
                    est: next_cost.saturating_add(scaled(remaining)),
                    cost: next_cost,
                    state: next_state,
                });
            }
        }

        let mut cur = end_state?;
        let mut points = vec![point_of(cur.x, cur.y)];
        while let Some(before) = prev[state_index(cur)] {
            points.push(point_of(before.x, before.y));
            cur = before;
        }
        points.reverse();
        Some(points)
    }
}
