//! Orthogonal connector routing.
//!
//! A route leaves the source port along its outward normal, travels only in
//! axis-aligned segments and arrives at the target port against its normal.
//! Short candidates through a handful of channel coordinates are tried first;
//! a grid search handles the cases where every candidate hits an obstacle.

mod candidates;
mod grid;

use crate::EPSILON;
use crate::anchor::{AnchorId, Direction};
use crate::config::RouterConfig;
use candidates::{Candidate, honors_ports};
use grid::GridSearch;
use kurbo::{BezPath, Point, Rect};
use std::cmp::Ordering;

/// A connection point: where an edge attaches and which way it leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Port {
    pub point: Point,
    /// Outward normal.
    pub normal: Direction,
    /// Bounds of the node owning this port, kept clear by preference.
    pub bounds: Option<Rect>,
}

impl Port {
    pub fn new(point: Point, normal: Direction) -> Self {
        Self {
            point,
            normal,
            bounds: None,
        }
    }

    /// Port at an anchor of a node.
    pub fn on_node(bounds: Rect, anchor: AnchorId) -> Self {
        Self {
            point: anchor.point_on(bounds),
            normal: anchor.normal(),
            bounds: Some(bounds),
        }
    }

    /// Point reached after leaving the port for `length`.
    pub fn stub_point(&self, length: f64) -> Point {
        self.point + self.normal.vector() * length
    }
}

/// Input to [`ConnectorRouter::route`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub source: Port,
    pub target: Port,
    /// Bounding boxes of other nodes. Must not include the endpoint nodes.
    pub obstacles: Vec<Rect>,
}

/// A routed connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Waypoints from source to target, no two consecutive ones equal.
    pub points: Vec<Point>,
    /// Obstacles were ignored because no clear path was found.
    pub fallback: bool,
}

impl Route {
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Number of direction changes.
    pub fn turns(&self) -> usize {
        let directions: Vec<Option<Direction>> = self
            .segments()
            .map(|(a, b)| Direction::between(a, b))
            .collect();
        directions.windows(2).filter(|pair| pair[0] != pair[1]).count()
    }

    /// Total path length.
    pub fn length(&self) -> f64 {
        self.segments().map(|(a, b)| a.distance(b)).sum()
    }

    /// Every segment is horizontal or vertical.
    pub fn is_orthogonal(&self) -> bool {
        self.segments()
            .all(|(a, b)| (a.x - b.x).abs() <= EPSILON || (a.y - b.y).abs() <= EPSILON)
    }

    /// Point at a fraction of the path length (0.5 = midpoint label location).
    pub fn point_at(&self, fraction: f64) -> Option<Point> {
        let first = *self.points.first()?;
        let mut remaining = self.length() * fraction.clamp(0.0, 1.0);
        for (a, b) in self.segments() {
            let len = a.distance(b);
            if remaining <= len {
                if len <= EPSILON {
                    return Some(a);
                }
                return Some(a.lerp(b, remaining / len));
            }
            remaining -= len;
        }
        Some(self.points.last().copied().unwrap_or(first))
    }

    /// Polyline as a path for rendering.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut points = self.points.iter();
        if let Some(&first) = points.next() {
            path.move_to(first);
            for &point in points {
                path.line_to(point);
            }
        }
        path
    }
}

/// Ranking of a candidate. Lower is better, fields compared in order.
#[derive(Debug, Clone, Copy)]
struct Score {
    crossings: usize,
    body_crossings: usize,
    segments: usize,
    axis_penalty: usize,
    length: f64,
    balance: f64,
}

impl Score {
    fn compare(&self, other: &Self) -> Ordering {
        self.crossings
            .cmp(&other.crossings)
            .then(self.body_crossings.cmp(&other.body_crossings))
            .then(self.segments.cmp(&other.segments))
            .then(self.axis_penalty.cmp(&other.axis_penalty))
            .then(self.length.total_cmp(&other.length))
            .then(self.balance.total_cmp(&other.balance))
    }
}

/// Computes orthogonal connector paths.
#[derive(Debug, Clone, Default)]
pub struct ConnectorRouter {
    config: RouterConfig,
}

impl ConnectorRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route a connector. Always produces a path; see [`Route::fallback`].
    pub fn route(&self, request: &RouteRequest) -> Route {
        let source = &request.source;
        let target = &request.target;
        let stub = self.config.stub_length.max(EPSILON);

        if source.point.distance(target.point) <= EPSILON {
            return Route {
                points: self_loop(source, stub),
                fallback: false,
            };
        }

        let obstacles: &[Rect] = if self.config.avoid_vertices {
            &request.obstacles
        } else {
            &[]
        };
        let bodies: Vec<Rect> = [source.bounds, target.bounds]
            .into_iter()
            .flatten()
            .collect();

        let best = candidates::enumerate(source, target, stub)
            .into_iter()
            .map(|candidate| (self.score(&candidate, request, obstacles, &bodies), candidate))
            .min_by(|(a, _), (b, _)| a.compare(b));

        match best {
            Some((score, candidate)) if score.crossings == 0 => Route {
                points: candidate.points,
                fallback: false,
            },
            best => {
                if let Some(points) = self.grid_route(request, obstacles, &bodies, stub) {
                    return Route {
                        points,
                        fallback: false,
                    };
                }
                log::warn!(
                    "No obstacle-free route from {:?} to {:?}, ignoring {} obstacles",
                    source.point,
                    target.point,
                    obstacles.len()
                );
                let points = match best {
                    Some((_, candidate)) => candidate.points,
                    None => compress_path(&[
                        source.point,
                        source.stub_point(stub),
                        target.stub_point(stub),
                        target.point,
                    ]),
                };
                Route {
                    points,
                    fallback: true,
                }
            }
        }
    }

    fn score(
        &self,
        candidate: &Candidate,
        request: &RouteRequest,
        obstacles: &[Rect],
        bodies: &[Rect],
    ) -> Score {
        let points = &candidate.points;
        Score {
            crossings: count_crossings(points, obstacles),
            body_crossings: count_crossings(points, bodies),
            segments: points.len() - 1,
            axis_penalty: axis_penalty(points, request.source.point, request.target.point),
            length: points.windows(2).map(|w| w[0].distance(w[1])).sum(),
            balance: candidate.balance,
        }
    }

    /// Grid search between the stub points, keeping endpoint bodies clear when possible.
    fn grid_route(
        &self,
        request: &RouteRequest,
        obstacles: &[Rect],
        bodies: &[Rect],
        stub: f64,
    ) -> Option<Vec<Point>> {
        let source = &request.source;
        let target = &request.target;
        let with_bodies: Vec<Rect> = obstacles.iter().chain(bodies).copied().collect();

        for blockers in [with_bodies.as_slice(), obstacles] {
            let search = GridSearch {
                start: source.stub_point(stub),
                start_direction: source.normal,
                goal: target.stub_point(stub),
                forbidden_arrival: target.normal,
                obstacles: blockers,
                margin: self.config.obstacle_margin,
                turn_penalty: stub,
                max_expansions: self.config.max_expansions,
            };
            let Some(middle) = search.run() else {
                continue;
            };
            let mut points = Vec::with_capacity(middle.len() + 2);
            points.push(source.point);
            points.extend(middle);
            points.push(target.point);
            let points = compress_path(&points);
            if count_crossings(&points, obstacles) == 0
                && honors_ports(&points, source, target, stub)
            {
                return Some(points);
            }
        }
        None
    }
}

/// Square detour of side `stub` leaving and re-entering the same port.
fn self_loop(port: &Port, stub: f64) -> Vec<Point> {
    let out = port.normal.vector() * stub;
    let side = match port.normal {
        Direction::Right => Direction::Down,
        Direction::Down => Direction::Left,
        Direction::Left => Direction::Up,
        Direction::Up => Direction::Right,
    }
    .vector()
        * stub;
    let start = port.point;
    vec![start, start + out, start + out + side, start + side, start]
}

/// Index of the first segment heading toward the target along the axis of
/// greatest displacement.
fn axis_penalty(points: &[Point], from: Point, to: Point) -> usize {
    let delta = to - from;
    let toward = if delta.x.abs() >= delta.y.abs() {
        if delta.x >= 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if delta.y >= 0.0 {
        Direction::Down
    } else {
        Direction::Up
    };
    points
        .windows(2)
        .position(|pair| Direction::between(pair[0], pair[1]) == Some(toward))
        .unwrap_or(points.len())
}

fn count_crossings(points: &[Point], rects: &[Rect]) -> usize {
    points
        .windows(2)
        .map(|pair| {
            rects
                .iter()
                .filter(|rect| segment_crosses(pair[0], pair[1], **rect))
                .count()
        })
        .sum()
}

/// Whether an axis-aligned segment passes through the interior of a rectangle.
///
/// Touching or running along the border does not count.
pub(crate) fn segment_crosses(a: Point, b: Point, rect: Rect) -> bool {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    x1 > rect.x0 + EPSILON
        && x0 < rect.x1 - EPSILON
        && y1 > rect.y0 + EPSILON
        && y0 < rect.y1 - EPSILON
}

/// Drop repeated points and interior points that continue straight on.
pub(crate) fn compress_path(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if out.last().is_some_and(|last| last.distance(point) <= EPSILON) {
            continue;
        }
        if let [.., a, b] = out.as_slice() {
            let incoming = Direction::between(*a, *b);
            if incoming.is_some() && incoming == Direction::between(*b, point) {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}
