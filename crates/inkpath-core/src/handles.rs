//! Transform bounds and the handles drawn around them.

use crate::config::EditorConfig;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds of a selection with non-negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center: Point,
}

impl TransformBounds {
    /// Build from any rectangle, normalizing inverted extents.
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self {
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            center: rect.center(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner (the scale origin).
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Position of this corner on `rect`.
    pub fn of(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }
}

/// Type of transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Scale handle.
    Corner(Corner),
    /// Rotation handle above the top edge.
    Rotate,
}

/// A transform handle in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
    /// Side length in document units.
    pub size: f64,
}

impl Handle {
    /// Check if a point (in document coordinates) hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        (point - self.position).hypot2() <= tolerance * tolerance
    }
}

/// Four corner handles and one rotation handle, sized to stay constant on
/// screen at the given zoom.
pub fn handles_for(bounds: &TransformBounds, zoom: f64, config: &EditorConfig) -> Vec<Handle> {
    let rect = bounds.rect();
    let size = config.handle_size_px / zoom;
    let mut handles: Vec<Handle> = Corner::ALL
        .iter()
        .map(|&corner| Handle {
            position: corner.of(rect),
            kind: HandleKind::Corner(corner),
            size,
        })
        .collect();
    handles.push(Handle {
        position: Point::new(
            bounds.center.x,
            rect.y0 - config.rotate_handle_offset_px / zoom,
        ),
        kind: HandleKind::Rotate,
        size,
    });
    handles
}

/// Find which handle (if any) is under `point`. The pick radius is half the
/// handle size.
pub fn hit_test_handles(handles: &[Handle], point: Point) -> Option<Handle> {
    handles
        .iter()
        .find(|h| h.hit_test(point, h.size / 2.0))
        .copied()
}
