//! Path commands.

use super::EntityId;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Command type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    MoveTo,
    LineTo,
    CubicCurveTo,
    ClosePath,
}

/// Which control point of a cubic segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlSlot {
    /// Outgoing handle of the previous anchor (`x1, y1`).
    First,
    /// Incoming handle of this command's anchor (`x2, y2`).
    Second,
}

/// Geometry of a single command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    CubicTo { ctrl1: Point, ctrl2: Point, end: Point },
    ClosePath,
}

impl Segment {
    pub fn kind(&self) -> CommandKind {
        match self {
            Segment::MoveTo(_) => CommandKind::MoveTo,
            Segment::LineTo(_) => CommandKind::LineTo,
            Segment::CubicTo { .. } => CommandKind::CubicCurveTo,
            Segment::ClosePath => CommandKind::ClosePath,
        }
    }

    /// The end anchor, if the command has one.
    pub fn anchor(&self) -> Option<Point> {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => Some(p),
            Segment::CubicTo { end, .. } => Some(end),
            Segment::ClosePath => None,
        }
    }

    pub fn control(&self, slot: ControlSlot) -> Option<Point> {
        match (*self, slot) {
            (Segment::CubicTo { ctrl1, .. }, ControlSlot::First) => Some(ctrl1),
            (Segment::CubicTo { ctrl2, .. }, ControlSlot::Second) => Some(ctrl2),
            _ => None,
        }
    }

    /// Anchor followed by control points.
    pub fn points(&self) -> Vec<Point> {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => vec![p],
            Segment::CubicTo { ctrl1, ctrl2, end } => vec![end, ctrl1, ctrl2],
            Segment::ClosePath => Vec::new(),
        }
    }

    /// Apply `f` to every point of the segment.
    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Segment {
        match *self {
            Segment::MoveTo(p) => Segment::MoveTo(f(p)),
            Segment::LineTo(p) => Segment::LineTo(f(p)),
            Segment::CubicTo { ctrl1, ctrl2, end } => Segment::CubicTo {
                ctrl1: f(ctrl1),
                ctrl2: f(ctrl2),
                end: f(end),
            },
            Segment::ClosePath => Segment::ClosePath,
        }
    }
}

/// One step of a subpath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub(crate) id: EntityId,
    pub segment: Segment,
    /// Structurally locked commands cannot be selected.
    #[serde(default)]
    pub locked: bool,
}

impl Command {
    pub fn new(segment: Segment) -> Self {
        Self {
            id: Uuid::new_v4(),
            segment,
            locked: false,
        }
    }

    /// Create a command with a specific ID.
    pub fn with_id(id: EntityId, segment: Segment) -> Self {
        Self {
            id,
            segment,
            locked: false,
        }
    }

    pub fn move_to(p: Point) -> Self {
        Self::new(Segment::MoveTo(p))
    }

    pub fn line_to(p: Point) -> Self {
        Self::new(Segment::LineTo(p))
    }

    pub fn cubic_to(ctrl1: Point, ctrl2: Point, end: Point) -> Self {
        Self::new(Segment::CubicTo { ctrl1, ctrl2, end })
    }

    pub fn close() -> Self {
        Self::new(Segment::ClosePath)
    }

    /// Mark the command as structurally locked.
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.segment.kind()
    }

    pub fn anchor(&self) -> Option<Point> {
        self.segment.anchor()
    }

    pub fn control(&self, slot: ControlSlot) -> Option<Point> {
        self.segment.control(slot)
    }

    /// Move the end anchor only. Returns false for ClosePath.
    pub fn translate_anchor(&mut self, delta: Vec2) -> bool {
        match &mut self.segment {
            Segment::MoveTo(p) | Segment::LineTo(p) => *p += delta,
            Segment::CubicTo { end, .. } => *end += delta,
            Segment::ClosePath => return false,
        }
        true
    }

    /// Move one control point. Returns false if the command has no such point.
    pub fn translate_control(&mut self, slot: ControlSlot, delta: Vec2) -> bool {
        match (&mut self.segment, slot) {
            (Segment::CubicTo { ctrl1, .. }, ControlSlot::First) => *ctrl1 += delta,
            (Segment::CubicTo { ctrl2, .. }, ControlSlot::Second) => *ctrl2 += delta,
            _ => return false,
        }
        true
    }

    /// Translate every point of the command.
    pub fn translate(&mut self, delta: Vec2) {
        self.segment = self.segment.map_points(|p| p + delta);
    }
}
