//! Snap functionality: grid, coincident points and alignment guides.

use crate::config::EditorConfig;
use crate::schedule::{Instant, RateLimiter};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
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

/// Snap an angle to the nearest increment.
/// Returns the snapped angle in degrees (0-360).
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    let snapped = (angle_degrees / increment).round() * increment;
    snapped.rem_euclid(360.0)
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    SnapResult {
        point: Point::new(
            (point.x / grid_size).round() * grid_size,
            (point.y / grid_size).round() * grid_size,
        ),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Snap to the nearest target within `radius`, exactly.
pub fn snap_sticky(point: Point, targets: &[Point], radius: f64) -> SnapResult {
    let mut best: Option<Point> = None;
    let mut best_dist_sq = radius * radius;

    for target in targets {
        let dist_sq = (*target - point).hypot2();
        if dist_sq <= best_dist_sq {
            best_dist_sq = dist_sq;
            best = Some(*target);
        }
    }

    match best {
        Some(point) => SnapResult {
            point,
            snapped_x: true,
            snapped_y: true,
        },
        None => SnapResult::none(point),
    }
}

/// Orientation of a guideline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideAxis {
    /// A vertical line at a fixed x.
    Vertical,
    /// A horizontal line at a fixed y.
    Horizontal,
}

/// An alignment line to draw while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guideline {
    pub axis: GuideAxis,
    /// x for vertical guides, y for horizontal guides.
    pub position: f64,
    /// Extent along the other axis.
    pub start: f64,
    pub end: f64,
}

/// Which line of a box was aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Min,
    Center,
    Max,
}

impl Line {
    const ALL: [Line; 3] = [Line::Min, Line::Center, Line::Max];

    fn x(self, r: Rect) -> f64 {
        match self {
            Line::Min => r.x0,
            Line::Center => (r.x0 + r.x1) / 2.0,
            Line::Max => r.x1,
        }
    }

    fn y(self, r: Rect) -> f64 {
        match self {
            Line::Min => r.y0,
            Line::Center => (r.y0 + r.y1) / 2.0,
            Line::Max => r.y1,
        }
    }
}

/// A remembered per-axis guide match: which line of the moving box aligned
/// to which coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisMatch {
    line: Line,
    value: f64,
}

/// Result of aligning a box against its siblings.
#[derive(Debug, Clone, Default)]
pub struct GuideSnap {
    /// Correction to add to the box position.
    pub offset: Vec2,
    pub snapped_x: bool,
    pub snapped_y: bool,
    pub guides: Vec<Guideline>,
    x_match: Option<AxisMatch>,
    y_match: Option<AxisMatch>,
}

fn best_match(
    target: Rect,
    others: &[Rect],
    tolerance: f64,
    coord: fn(Line, Rect) -> f64,
) -> Option<AxisMatch> {
    let mut best: Option<(f64, AxisMatch)> = None;
    for other in others {
        for other_line in Line::ALL {
            let value = coord(other_line, *other);
            for line in Line::ALL {
                let dist = (value - coord(line, target)).abs();
                if dist <= tolerance && best.is_none_or(|(d, _)| dist < d) {
                    best = Some((dist, AxisMatch { line, value }));
                }
            }
        }
    }
    best.map(|(_, m)| m)
}

/// Guidelines for every sibling line that coincides with a line of `target`.
fn collect_guides(target: Rect, others: &[Rect], axis: GuideAxis, value: f64) -> Vec<Guideline> {
    const EPS: f64 = 1e-9;
    let mut guide: Option<Guideline> = None;
    for other in others {
        let aligned = Line::ALL.iter().any(|l| match axis {
            GuideAxis::Vertical => (l.x(*other) - value).abs() < EPS,
            GuideAxis::Horizontal => (l.y(*other) - value).abs() < EPS,
        });
        if !aligned {
            continue;
        }
        let (lo, hi) = match axis {
            GuideAxis::Vertical => (target.y0.min(other.y0), target.y1.max(other.y1)),
            GuideAxis::Horizontal => (target.x0.min(other.x0), target.x1.max(other.x1)),
        };
        let g = guide.get_or_insert(Guideline {
            axis,
            position: value,
            start: lo,
            end: hi,
        });
        g.start = g.start.min(lo);
        g.end = g.end.max(hi);
    }
    guide.into_iter().collect()
}

/// Align `target` against the left/center/right and top/middle/bottom lines
/// of `others`. The nearest match within `tolerance` wins on each axis.
pub fn snap_bounds_to_guides(target: Rect, others: &[Rect], tolerance: f64) -> GuideSnap {
    let x_match = best_match(target, others, tolerance, Line::x);
    let y_match = best_match(target, others, tolerance, Line::y);
    guide_snap_from_matches(target, others, x_match, y_match)
}

fn guide_snap_from_matches(
    target: Rect,
    others: &[Rect],
    x_match: Option<AxisMatch>,
    y_match: Option<AxisMatch>,
) -> GuideSnap {
    let offset = Vec2::new(
        x_match.map_or(0.0, |m| m.value - m.line.x(target)),
        y_match.map_or(0.0, |m| m.value - m.line.y(target)),
    );
    let moved = target + offset;
    let mut guides = Vec::new();
    if let Some(m) = x_match {
        guides.extend(collect_guides(moved, others, GuideAxis::Vertical, m.value));
    }
    if let Some(m) = y_match {
        guides.extend(collect_guides(moved, others, GuideAxis::Horizontal, m.value));
    }
    GuideSnap {
        offset,
        snapped_x: x_match.is_some(),
        snapped_y: y_match.is_some(),
        guides,
        x_match,
        y_match,
    }
}

/// Snap tolerances resolved to document units for one zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapSettings {
    pub sticky_radius: f64,
    pub guide_tolerance: f64,
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub guides_enabled: bool,
}

impl SnapSettings {
    pub fn from_config(config: &EditorConfig, zoom: f64) -> Self {
        Self {
            sticky_radius: config.sticky_radius_px / zoom,
            guide_tolerance: config.guide_tolerance_px / zoom,
            grid_size: config.grid.size,
            snap_to_grid: config.grid.snap_to_grid,
            guides_enabled: true,
        }
    }
}

/// Per-drag snap state: precomputed targets plus the throttled guide search.
#[derive(Debug, Clone)]
pub struct DragSnapper {
    settings: SnapSettings,
    /// Anchor of the grabbed command and the anchors it may stick to.
    sticky: Option<(Point, Vec<Point>)>,
    /// Selection bounds at drag start and the sibling boxes to align with.
    start_bounds: Option<Rect>,
    siblings: Vec<Rect>,
    limiter: RateLimiter,
    last: Option<GuideSnap>,
}

impl DragSnapper {
    pub fn new(settings: SnapSettings, debounce_ms: u64) -> Self {
        Self {
            settings,
            sticky: None,
            start_bounds: None,
            siblings: Vec::new(),
            limiter: RateLimiter::from_millis(debounce_ms),
            last: None,
        }
    }

    /// Enable coincident-point snapping for a grabbed anchor.
    pub fn with_sticky(mut self, grabbed: Point, targets: Vec<Point>) -> Self {
        self.sticky = Some((grabbed, targets));
        self
    }

    /// Enable guide snapping of the selection bounds against siblings.
    pub fn with_guides(mut self, start_bounds: Rect, siblings: Vec<Rect>) -> Self {
        if self.settings.guides_enabled {
            self.start_bounds = Some(start_bounds);
            self.siblings = siblings;
        }
        self
    }

    pub fn settings(&self) -> &SnapSettings {
        &self.settings
    }

    /// Guides matched by the most recent resolve.
    pub fn guides(&self) -> &[Guideline] {
        self.last.as_ref().map_or(&[], |g| g.guides.as_slice())
    }

    /// Map a raw drag delta to a snapped delta. Sticky points take
    /// precedence over guides; grid snapping is left to the end of the drag.
    pub fn resolve(&mut self, raw: Vec2, now: Instant) -> Vec2 {
        if let Some(delta) = self.sticky_delta(raw) {
            self.last = None;
            return delta;
        }

        let Some(start) = self.start_bounds else {
            return raw;
        };
        let target = start + raw;
        let tolerance = self.settings.guide_tolerance;

        let snap = if self.limiter.request(now) {
            snap_bounds_to_guides(target, &self.siblings, tolerance)
        } else {
            // Throttled: keep the previous lines while they still fit.
            let keep = |m: Option<AxisMatch>, coord: fn(Line, Rect) -> f64| {
                m.filter(|m| (m.value - coord(m.line, target)).abs() <= tolerance)
            };
            let (x, y) = match &self.last {
                Some(last) => (keep(last.x_match, Line::x), keep(last.y_match, Line::y)),
                None => (None, None),
            };
            guide_snap_from_matches(target, &self.siblings, x, y)
        };

        let delta = raw + snap.offset;
        self.last = Some(snap);
        delta
    }

    /// Serve a guide search that was throttled on the latest move, so the
    /// drag comes to rest on a fresh match. Returns None if nothing was
    /// pending.
    pub fn settle(&mut self, raw: Vec2) -> Option<Vec2> {
        if !self.limiter.is_pending() {
            return None;
        }
        self.limiter.cancel();
        if let Some(delta) = self.sticky_delta(raw) {
            self.last = None;
            return Some(delta);
        }
        let start = self.start_bounds?;
        let snap = snap_bounds_to_guides(start + raw, &self.siblings, self.settings.guide_tolerance);
        let delta = raw + snap.offset;
        self.last = Some(snap);
        Some(delta)
    }

    fn sticky_delta(&self, raw: Vec2) -> Option<Vec2> {
        let (grabbed, targets) = self.sticky.as_ref()?;
        let hit = snap_sticky(*grabbed + raw, targets, self.settings.sticky_radius);
        hit.is_snapped().then(|| hit.point - *grabbed)
    }

    /// Stop throttling and forget matched guides.
    pub fn finish(&mut self) {
        self.limiter.cancel();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_snap_to_grid() {
        let result = snap_to_grid(Point::new(23.0, 47.0), 20.0);
        assert!((result.point.x - 20.0).abs() < f64::EPSILON);
        assert!((result.point.y - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_grid_snap_idempotent() {
        let once = snap_to_grid(Point::new(-33.3, 71.9), 20.0).point;
        let twice = snap_to_grid(once, 20.0).point;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_snap_angle() {
        assert!((snap_angle(7.0, 15.0) - 0.0).abs() < f64::EPSILON);
        assert!((snap_angle(8.0, 15.0) - 15.0).abs() < f64::EPSILON);
        assert!((snap_angle(-10.0, 15.0) - 345.0).abs() < f64::EPSILON);
        assert!((snap_angle(358.0, 15.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sticky_snaps_exactly_and_is_idempotent() {
        let targets = [Point::new(100.0, 100.0), Point::new(200.0, 0.0)];
        let once = snap_sticky(Point::new(103.0, 98.0), &targets, 5.0);
        assert!(once.is_snapped());
        assert_eq!(once.point, Point::new(100.0, 100.0));
        let twice = snap_sticky(once.point, &targets, 5.0);
        assert_eq!(twice.point, once.point);
        assert!(!snap_sticky(Point::new(110.0, 100.0), &targets, 5.0).is_snapped());
    }

    #[test]
    fn test_guides_align_nearest_line() {
        let other = Rect::new(100.0, 200.0, 150.0, 250.0);
        // Left edge 3 units right of the other's left edge.
        let target = Rect::new(103.0, 0.0, 113.0, 20.0);
        let snap = snap_bounds_to_guides(target, &[other], 5.0);
        assert!(snap.snapped_x);
        assert!(!snap.snapped_y);
        assert!((snap.offset.x + 3.0).abs() < 1e-10);
        assert_eq!(snap.guides.len(), 1);
        let guide = snap.guides[0];
        assert_eq!(guide.axis, GuideAxis::Vertical);
        assert!((guide.position - 100.0).abs() < 1e-10);
        assert!((guide.start - 0.0).abs() < 1e-10);
        assert!((guide.end - 250.0).abs() < 1e-10);
    }

    #[test]
    fn test_guides_center_alignment() {
        let other = Rect::new(0.0, 0.0, 100.0, 100.0);
        let target = Rect::new(300.0, 38.0, 340.0, 58.0);
        let snap = snap_bounds_to_guides(target, &[other], 3.0);
        // Middle of target (48) is 2 away from the other's middle (50).
        assert!(snap.snapped_y);
        assert!((snap.offset.y - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_guide_snap_idempotent() {
        let others = [Rect::new(0.0, 0.0, 50.0, 50.0), Rect::new(80.0, 120.0, 90.0, 160.0)];
        let target = Rect::new(82.0, 3.0, 102.0, 23.0);
        let first = snap_bounds_to_guides(target, &others, 4.0);
        let snapped = target + first.offset;
        let second = snap_bounds_to_guides(snapped, &others, 4.0);
        assert!(second.offset.hypot() < 1e-10);
    }

    #[test]
    fn test_snapper_sticky_precedes_guides() {
        let settings = SnapSettings {
            sticky_radius: 5.0,
            guide_tolerance: 5.0,
            grid_size: 20.0,
            snap_to_grid: false,
            guides_enabled: true,
        };
        let mut snapper = DragSnapper::new(settings, 16)
            .with_sticky(Point::new(0.0, 0.0), vec![Point::new(50.0, 50.0)])
            .with_guides(
                Rect::new(-10.0, -10.0, 0.0, 0.0),
                vec![Rect::new(43.0, 43.0, 60.0, 60.0)],
            );
        let delta = snapper.resolve(Vec2::new(48.0, 49.0), Instant::now());
        assert_eq!(delta, Vec2::new(50.0, 50.0));
        assert!(snapper.guides().is_empty());
    }

    #[test]
    fn test_snapper_reuses_guides_while_throttled() {
        let settings = SnapSettings {
            sticky_radius: 0.0,
            guide_tolerance: 5.0,
            grid_size: 20.0,
            snap_to_grid: false,
            guides_enabled: true,
        };
        let mut snapper = DragSnapper::new(settings, 16).with_guides(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            vec![Rect::new(100.0, 200.0, 120.0, 220.0)],
        );
        let t0 = Instant::now();
        let d = snapper.resolve(Vec2::new(98.0, 0.0), t0);
        assert!((d.x - 100.0).abs() < 1e-10);

        // Within the interval the last match is re-applied if still in range.
        let d = snapper.resolve(Vec2::new(97.0, 0.0), t0 + Duration::from_millis(4));
        assert!((d.x - 100.0).abs() < 1e-10);
        assert_eq!(snapper.guides().len(), 1);

        // Out of range: the stale match is dropped.
        let d = snapper.resolve(Vec2::new(60.0, 0.0), t0 + Duration::from_millis(8));
        assert!((d.x - 60.0).abs() < 1e-10);
        assert!(snapper.guides().is_empty());

        snapper.finish();
        assert!(snapper.guides().is_empty());
    }

    #[test]
    fn test_settle_serves_throttled_search() {
        let settings = SnapSettings {
            sticky_radius: 0.0,
            guide_tolerance: 5.0,
            grid_size: 20.0,
            snap_to_grid: false,
            guides_enabled: true,
        };
        let mut snapper = DragSnapper::new(settings, 16).with_guides(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            vec![Rect::new(100.0, 200.0, 120.0, 220.0)],
        );
        let t0 = Instant::now();
        assert_eq!(snapper.settle(Vec2::new(1.0, 1.0)), None);
        snapper.resolve(Vec2::new(40.0, 0.0), t0);

        // Throttled with no previous match: the raw delta passes through.
        let raw = Vec2::new(40.0, 198.0);
        let d = snapper.resolve(raw, t0 + Duration::from_millis(4));
        assert_eq!(d, raw);

        let settled = snapper.settle(raw).unwrap();
        assert!((settled.y - 200.0).abs() < 1e-10);
        assert_eq!(snapper.guides().len(), 1);
        // Served once.
        assert_eq!(snapper.settle(raw), None);
    }

    #[test]
    fn test_disabled_guides_pass_through() {
        let settings = SnapSettings {
            sticky_radius: 0.0,
            guide_tolerance: 5.0,
            grid_size: 20.0,
            snap_to_grid: false,
            guides_enabled: false,
        };
        let mut snapper = DragSnapper::new(settings, 16).with_guides(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            vec![Rect::new(12.0, 0.0, 20.0, 10.0)],
        );
        let raw = Vec2::new(1.0, 0.5);
        assert_eq!(snapper.resolve(raw, Instant::now()), raw);
    }
}
