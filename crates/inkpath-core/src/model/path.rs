//! Paths and subpaths.

use super::{Command, EntityId, Segment, SerializableColor};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered sequence of commands. The first command is always a MoveTo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPath {
    pub(crate) id: EntityId,
    pub(crate) commands: Vec<Command>,
}

impl SubPath {
    /// Create a subpath, repairing the leading command if needed.
    pub fn new(commands: Vec<Command>) -> Self {
        let mut subpath = Self {
            id: Uuid::new_v4(),
            commands,
        };
        subpath.normalize();
        subpath
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Index of a command within this subpath.
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.commands.iter().position(|c| c.id == id)
    }

    pub fn command(&self, id: EntityId) -> Option<&Command> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// Enforce the leading-MoveTo invariant.
    ///
    /// Leading ClosePath commands are dropped; a leading LineTo or curve is
    /// rewritten as a MoveTo at its anchor (keeping its id). Returns true if
    /// anything was repaired.
    pub fn normalize(&mut self) -> bool {
        let mut repaired = false;
        while matches!(self.commands.first(), Some(c) if c.segment == Segment::ClosePath) {
            self.commands.remove(0);
            repaired = true;
        }
        if let Some(first) = self.commands.first_mut() {
            if !matches!(first.segment, Segment::MoveTo(_)) {
                if let Some(anchor) = first.anchor() {
                    first.segment = Segment::MoveTo(anchor);
                    repaired = true;
                }
            }
        }
        if repaired {
            log::debug!("Repaired leading command of subpath {}", self.id);
        }
        repaired
    }

    /// Index of the last command that carries an anchor.
    pub fn last_anchor_index(&self) -> Option<usize> {
        self.commands.iter().rposition(|c| c.anchor().is_some())
    }

    /// The first and last anchor-bearing commands when they coincide
    /// within `tolerance` (a closed outline drawn back to its start).
    pub fn dual_endpoints(&self, tolerance: f64) -> Option<(EntityId, EntityId)> {
        let first = self.commands.first()?;
        let last_idx = self.last_anchor_index()?;
        if last_idx == 0 {
            return None;
        }
        let last = &self.commands[last_idx];
        let (a, b) = (first.anchor()?, last.anchor()?);
        (a.distance(b) <= tolerance).then_some((first.id, last.id))
    }

    /// Whether the subpath ends where it starts.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.dual_endpoints(tolerance).is_some()
    }

    /// Every anchor and control point.
    pub fn points(&self) -> Vec<Point> {
        self.commands.iter().flat_map(|c| c.segment.points()).collect()
    }

    /// Min/max box over anchors and control points.
    pub fn control_bounds(&self) -> Option<Rect> {
        bounds_of_points(self.points())
    }

    /// Geometry for exact measurement and hit testing.
    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for command in &self.commands {
            match command.segment {
                Segment::MoveTo(p) => path.move_to(p),
                Segment::LineTo(p) => path.line_to(p),
                Segment::CubicTo { ctrl1, ctrl2, end } => path.curve_to(ctrl1, ctrl2, end),
                Segment::ClosePath => path.close_path(),
            }
        }
        path
    }
}

/// Style record attached to a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub fill: Option<SerializableColor>,
    pub stroke: Option<SerializableColor>,
    pub stroke_width: f64,
    /// Reference to a filter definition.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: Some(SerializableColor::black()),
            stroke_width: 1.0,
            filter: None,
        }
    }
}

/// A styled sequence of subpaths. Later subpaths paint on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub(crate) id: EntityId,
    pub(crate) subpaths: Vec<SubPath>,
    pub style: PathStyle,
}

impl Path {
    pub fn new(subpaths: Vec<SubPath>) -> Self {
        Self {
            id: Uuid::new_v4(),
            subpaths,
            style: PathStyle::default(),
        }
    }

    pub fn with_style(mut self, style: PathStyle) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn subpath_ids(&self) -> Vec<EntityId> {
        self.subpaths.iter().map(|s| s.id).collect()
    }

    pub fn to_bez_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for subpath in &self.subpaths {
            path.extend(subpath.to_bez_path());
        }
        path
    }
}

/// Min/max box over a set of points; None when empty.
pub(crate) fn bounds_of_points(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut iter = points.into_iter();
    let first = iter.next()?;
    Some(iter.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)))
}
