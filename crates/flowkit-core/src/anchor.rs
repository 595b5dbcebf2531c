//! Fixed catalog of node attachment points.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Unit vector (y grows downwards).
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// Direction of travel from `a` to `b`, if the two points are axis-aligned and distinct.
    pub fn between(a: Point, b: Point) -> Option<Self> {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        if dx.abs() <= crate::EPSILON && dy.abs() <= crate::EPSILON {
            return None;
        }
        if dy.abs() <= crate::EPSILON {
            Some(if dx > 0.0 { Direction::Right } else { Direction::Left })
        } else if dx.abs() <= crate::EPSILON {
            Some(if dy > 0.0 { Direction::Down } else { Direction::Up })
        } else {
            None
        }
    }
}

/// A named attachment point on a node's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorId {
    Left,
    Right,
    Top,
    Bottom,
}

impl AnchorId {
    pub const ALL: [AnchorId; 4] = [
        AnchorId::Left,
        AnchorId::Right,
        AnchorId::Top,
        AnchorId::Bottom,
    ];

    /// Fractional position on the node, in [0,1]^2.
    pub fn position(self) -> (f64, f64) {
        match self {
            AnchorId::Left => (0.0, 0.5),
            AnchorId::Right => (1.0, 0.5),
            AnchorId::Top => (0.5, 0.0),
            AnchorId::Bottom => (0.5, 1.0),
        }
    }

    /// Outward normal.
    pub fn normal(self) -> Direction {
        match self {
            AnchorId::Left => Direction::Left,
            AnchorId::Right => Direction::Right,
            AnchorId::Top => Direction::Up,
            AnchorId::Bottom => Direction::Down,
        }
    }

    /// Absolute position of this anchor on a node's bounds.
    pub fn point_on(self, bounds: Rect) -> Point {
        let (fx, fy) = self.position();
        Point::new(
            bounds.x0 + fx * bounds.width(),
            bounds.y0 + fy * bounds.height(),
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorId::Left => "left",
            AnchorId::Right => "right",
            AnchorId::Top => "top",
            AnchorId::Bottom => "bottom",
        }
    }

    /// Pick the anchor pair that faces between two nodes.
    ///
    /// Used for edges stored without explicit anchors. Horizontal anchors win
    /// when the horizontal displacement is at least the vertical one.
    pub fn facing(from: Rect, to: Rect) -> (AnchorId, AnchorId) {
        let delta = to.center() - from.center();
        if delta.x.abs() >= delta.y.abs() {
            if delta.x >= 0.0 {
                (AnchorId::Right, AnchorId::Left)
            } else {
                (AnchorId::Left, AnchorId::Right)
            }
        } else if delta.y >= 0.0 {
            (AnchorId::Bottom, AnchorId::Top)
        } else {
            (AnchorId::Top, AnchorId::Bottom)
        }
    }
}
