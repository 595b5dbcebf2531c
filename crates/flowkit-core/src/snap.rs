//! Grid snapping for node placement.

use kurbo::{Point, Size};

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap a point to the nearest grid intersection.
///
/// Axes with a non-positive grid spacing are left alone.
pub fn snap_to_grid(point: Point, grid: Size) -> SnapResult {
    let snap_axis = |value: f64, spacing: f64| {
        if spacing > 0.0 {
            ((value / spacing).round() * spacing, true)
        } else {
            (value, false)
        }
    };
    let (x, snapped_x) = snap_axis(point.x, grid.width);
    let (y, snapped_y) = snap_axis(point.y, grid.height);
    SnapResult {
        point: Point::new(x, y),
        snapped_x,
        snapped_y,
    }
}

/// Snap a point when snapping is enabled.
pub fn snap_point(point: Point, enabled: bool, grid: Size) -> SnapResult {
    if enabled {
        snap_to_grid(point, grid)
    } else {
        SnapResult::none(point)
    }
}
