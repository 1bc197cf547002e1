//! Document entities for the path editor.

mod command;
mod group;
mod image;
mod path;
mod symbol;
mod text;

pub use command::{Command, CommandKind, ControlSlot, Segment};
pub use group::{Group, GroupChild};
pub use image::Image;
pub use path::{Path, PathStyle, SubPath};
pub use symbol::SymbolUse;
pub use text::Text;

pub(crate) use path::bounds_of_points;

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for every entity in a document.
pub type EntityId = Uuid;

/// The closed set of entity kinds the editor can select and move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Command,
    SubPath,
    Text,
    Image,
    Group,
    SymbolUse,
}

impl EntityKind {
    /// All kinds, in selection-registry order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Command,
        EntityKind::SubPath,
        EntityKind::Text,
        EntityKind::Image,
        EntityKind::Group,
        EntityKind::SymbolUse,
    ];
}

/// A typed reference to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn command(id: EntityId) -> Self {
        Self::new(EntityKind::Command, id)
    }

    pub fn subpath(id: EntityId) -> Self {
        Self::new(EntityKind::SubPath, id)
    }

    pub fn text(id: EntityId) -> Self {
        Self::new(EntityKind::Text, id)
    }

    pub fn image(id: EntityId) -> Self {
        Self::new(EntityKind::Image, id)
    }

    pub fn group(id: EntityId) -> Self {
        Self::new(EntityKind::Group, id)
    }

    pub fn symbol_use(id: EntityId) -> Self {
        Self::new(EntityKind::SymbolUse, id)
    }
}

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Behaviour shared by the free-standing elements (text, images, symbol uses).
pub trait Element {
    /// Get the unique identifier.
    fn id(&self) -> EntityId;

    /// Anchor position used for moving and grid snapping.
    fn position(&self) -> Point;

    /// Axis-aligned bounding box in document coordinates.
    fn bounds(&self) -> Rect;

    /// Translate the element.
    fn translate(&mut self, delta: Vec2);

    /// Check if a point (in document coordinates) hits this element.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    point.distance(proj)
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_to_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-10);
        assert!((point_to_segment_dist(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-10);
        // Degenerate segment
        assert!((point_to_segment_dist(Point::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_polyline_dist() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        assert!((point_to_polyline_dist(Point::new(12.0, 5.0), &pts) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_color_roundtrip() {
        let color = SerializableColor::new(10, 20, 30, 255);
        let peniko: Color = color.into();
        assert_eq!(SerializableColor::from(peniko), color);
    }
}
