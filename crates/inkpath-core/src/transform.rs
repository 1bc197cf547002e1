//! Affine transform gestures: scale from a corner and rotate about the
//! selection center.
//!
//! Every frame is applied from the snapshot taken when the gesture began, so
//! error never accumulates and the pointer can be moved back to undo a step.
//! Text is previewed through a live transform and baked once at the end.

use crate::config::EditorConfig;
use crate::document::Document;
use crate::handles::{Corner, HandleKind, TransformBounds};
use crate::input::Modifiers;
use crate::model::{EntityId, EntityKind, EntityRef, Segment, bounds_of_points};
use crate::selection::Selection;
use crate::snap::snap_angle;
use kurbo::{Affine, BezPath, Point, Rect, Shape as _, Vec2};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Capability for measuring the tight bounds of a path.
pub trait BoundsMeasure: Debug {
    /// Exact bounds of `path`, or None to fall back to anchors and control
    /// points.
    fn exact_bounds(&self, path: &BezPath) -> Option<Rect>;
}

/// Tight bounds from kurbo's curve extrema.
#[derive(Debug, Default, Clone, Copy)]
pub struct KurboMeasure;

impl BoundsMeasure for KurboMeasure {
    fn exact_bounds(&self, path: &BezPath) -> Option<Rect> {
        if path.elements().is_empty() {
            return None;
        }
        Some(path.bounding_box())
    }
}

/// Always falls back to the control-point box.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointsMeasure;

impl BoundsMeasure for PointsMeasure {
    fn exact_bounds(&self, _path: &BezPath) -> Option<Rect> {
        None
    }
}

/// Bounds of the current selection in document coordinates.
///
/// Returns None when the selection spans fewer than two distinct points.
pub fn selection_bounds(
    doc: &Document,
    selection: &Selection,
    measure: &dyn BoundsMeasure,
) -> Option<TransformBounds> {
    fn push_rect(points: &mut Vec<Point>, r: Rect) {
        points.push(Point::new(r.x0, r.y0));
        points.push(Point::new(r.x1, r.y1));
    }

    let mut points: Vec<Point> = Vec::new();

    for entity in selection.top_level(doc) {
        let parent = doc.ancestor_transform(entity);
        match entity.kind {
            EntityKind::Command => {
                if let Some(cmd) = doc.command(entity.id) {
                    points.extend(cmd.segment.points().into_iter().map(|p| parent * p));
                }
            }
            EntityKind::SubPath => {
                let Some(sub) = doc.subpath(entity.id) else {
                    continue;
                };
                match measure.exact_bounds(&sub.to_bez_path()) {
                    Some(r) => push_rect(&mut points, parent.transform_rect_bbox(r)),
                    None => points.extend(sub.points().into_iter().map(|p| parent * p)),
                }
            }
            _ => {
                if let Some(r) = doc.entity_bounds(entity) {
                    push_rect(&mut points, r);
                }
            }
        }
    }

    let first = *points.first()?;
    if points.iter().all(|p| *p == first) {
        return None;
    }
    bounds_of_points(points).map(TransformBounds::from_rect)
}

/// One frame of an affine gesture, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AffineEdit {
    Scale { origin: Point, sx: f64, sy: f64 },
    Rotate { center: Point, angle: f64 },
}

impl AffineEdit {
    pub fn matrix(&self) -> Affine {
        match *self {
            AffineEdit::Scale { origin, sx, sy } => {
                Affine::translate(origin.to_vec2())
                    * Affine::scale_non_uniform(sx, sy)
                    * Affine::translate(-origin.to_vec2())
            }
            AffineEdit::Rotate { center, angle } => Affine::rotate_about(angle, center),
        }
    }

    fn is_mirroring(&self) -> bool {
        matches!(*self, AffineEdit::Scale { sx, sy, .. } if sx * sy < 0.0)
    }
}

/// Scale factors for moving the `start` corner to `pointer` with `origin`
/// fixed. Degenerate axes keep a factor of one.
pub fn scale_factors(
    origin: Point,
    start: Point,
    pointer: Point,
    lock_aspect: bool,
    min_scale: f64,
) -> (f64, f64) {
    let axis = |o: f64, s: f64, p: f64| {
        let span = s - o;
        if span.abs() < f64::EPSILON {
            1.0
        } else {
            (p - o) / span
        }
    };
    let mut sx = axis(origin.x, start.x, pointer.x);
    let mut sy = axis(origin.y, start.y, pointer.y);
    if lock_aspect {
        let m = sx.abs().min(sy.abs());
        sx = m.copysign(sx);
        sy = m.copysign(sy);
    }
    let clamp = |s: f64| {
        if s.abs() < min_scale {
            min_scale.copysign(s)
        } else {
            s
        }
    };
    (clamp(sx), clamp(sy))
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    position: Point,
    font_size: f64,
    rotation: f64,
}

/// Pre-gesture state of everything the gesture touches. Each entry keeps the
/// combined transform of its enclosing groups.
#[derive(Debug, Clone, Default)]
struct TransformSnapshot {
    commands: BTreeMap<EntityId, (Segment, Affine)>,
    texts: BTreeMap<EntityId, (TextState, Affine)>,
    frames: BTreeMap<EntityRef, (Rect, f64, Affine)>,
    groups: BTreeMap<EntityId, (Affine, Affine)>,
}

impl TransformSnapshot {
    fn capture(doc: &Document, selection: &Selection) -> Self {
        let mut snap = Self::default();
        for entity in selection.top_level(doc) {
            let parent = doc.ancestor_transform(entity);
            match entity.kind {
                EntityKind::Command => {
                    if let Some(cmd) = doc.command(entity.id) {
                        snap.commands.insert(entity.id, (cmd.segment, parent));
                    }
                }
                EntityKind::SubPath => {
                    for cmd in doc.subpath(entity.id).map(|s| s.commands()).unwrap_or(&[]) {
                        snap.commands.insert(cmd.id(), (cmd.segment, parent));
                    }
                }
                EntityKind::Text => {
                    if let Some(t) = doc.text(entity.id) {
                        let state = TextState {
                            position: t.position,
                            font_size: t.font_size,
                            rotation: t.rotation,
                        };
                        snap.texts.insert(entity.id, (state, parent));
                    }
                }
                EntityKind::Image => {
                    if let Some(i) = doc.image(entity.id) {
                        snap.frames.insert(entity, (i.rect(), i.rotation, parent));
                    }
                }
                EntityKind::SymbolUse => {
                    if let Some(u) = doc.symbol_use(entity.id) {
                        snap.frames.insert(entity, (u.rect(), u.rotation, parent));
                    }
                }
                EntityKind::Group => {
                    if let Some(g) = doc.group(entity.id) {
                        snap.groups.insert(entity.id, (g.transform, parent));
                    }
                }
            }
        }
        snap
    }
}

/// `m` expressed in the local space under `parent`.
fn local(m: Affine, parent: Affine) -> Affine {
    parent.inverse() * m * parent
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Scale { origin: Point, start: Point },
    Rotate { center: Point, start_angle: f64 },
}

#[derive(Debug, Clone)]
struct Gesture {
    mode: Mode,
    start_bounds: TransformBounds,
    bounds: TransformBounds,
    snapshot: TransformSnapshot,
    skipped: BTreeSet<EntityRef>,
    last: Option<AffineEdit>,
    min_scale: f64,
    angle_snap_degrees: f64,
}

/// Runs scale and rotate gestures over the selection.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    gesture: Option<Gesture>,
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Bounds as of the latest frame (normalized).
    pub fn bounds(&self) -> Option<TransformBounds> {
        self.gesture.as_ref().map(|g| g.bounds)
    }

    /// Start a gesture from a handle. Pushes one history checkpoint.
    pub fn begin(
        &mut self,
        doc: &mut Document,
        selection: &Selection,
        bounds: TransformBounds,
        handle: HandleKind,
        pointer: Point,
        config: &EditorConfig,
    ) -> bool {
        if self.gesture.is_some() {
            log::debug!("Ignoring transform start while a gesture is active");
            return false;
        }
        let rect = bounds.rect();
        let mode = match handle {
            HandleKind::Corner(corner) => Mode::Scale {
                origin: corner.opposite().of(rect),
                start: corner.of(rect),
            },
            HandleKind::Rotate => {
                let v = pointer - bounds.center;
                Mode::Rotate {
                    center: bounds.center,
                    start_angle: v.y.atan2(v.x),
                }
            }
        };
        doc.push_to_history();
        log::debug!("Transform gesture started: {:?}", handle);
        self.gesture = Some(Gesture {
            mode,
            start_bounds: bounds,
            bounds,
            snapshot: TransformSnapshot::capture(doc, selection),
            skipped: BTreeSet::new(),
            last: None,
            min_scale: config.min_scale,
            angle_snap_degrees: config.angle_snap_degrees,
        });
        true
    }

    /// Apply the gesture for the current pointer position.
    pub fn update(
        &mut self,
        doc: &mut Document,
        pointer: Point,
        modifiers: Modifiers,
    ) -> Option<AffineEdit> {
        let gesture = self.gesture.as_mut()?;
        let edit = match gesture.mode {
            Mode::Scale { origin, start } => {
                let (sx, sy) =
                    scale_factors(origin, start, pointer, modifiers.shift, gesture.min_scale);
                AffineEdit::Scale { origin, sx, sy }
            }
            Mode::Rotate {
                center,
                start_angle,
            } => {
                let v = pointer - center;
                let mut angle = v.y.atan2(v.x) - start_angle;
                if modifiers.shift {
                    let mut deg = snap_angle(angle.to_degrees(), gesture.angle_snap_degrees);
                    if deg > 180.0 {
                        deg -= 360.0;
                    }
                    angle = deg.to_radians();
                }
                AffineEdit::Rotate { center, angle }
            }
        };
        apply(doc, gesture, &edit);
        gesture.bounds = TransformBounds::from_rect(
            edit.matrix().transform_rect_bbox(gesture.start_bounds.rect()),
        );
        gesture.last = Some(edit);
        Some(edit)
    }

    /// Finish the gesture, baking text previews into their permanent fields.
    pub fn end(&mut self, doc: &mut Document) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        let edit = gesture.last;
        for (id, (state, parent)) in &gesture.snapshot.texts {
            if gesture.skipped.contains(&EntityRef::text(*id)) {
                continue;
            }
            let (position, font_size, rotation) = match edit {
                Some(edit @ AffineEdit::Scale { sx, sy, .. }) => {
                    let m = local(edit.matrix(), *parent);
                    let rotation = if edit.is_mirroring() {
                        -state.rotation
                    } else {
                        state.rotation
                    };
                    (
                        m * state.position,
                        state.font_size * (sx.abs() + sy.abs()) / 2.0,
                        rotation,
                    )
                }
                Some(edit @ AffineEdit::Rotate { angle, .. }) => {
                    let m = local(edit.matrix(), *parent);
                    (m * state.position, state.font_size, state.rotation + angle)
                }
                None => (state.position, state.font_size, state.rotation),
            };
            doc.bake_text(*id, position, font_size, rotation);
        }
        log::debug!("Transform gesture ended");
        true
    }
}

fn skip(skipped: &mut BTreeSet<EntityRef>, entity: EntityRef) {
    log::trace!("Transform skipping missing {:?} {}", entity.kind, entity.id);
    skipped.insert(entity);
}

fn apply(doc: &mut Document, gesture: &mut Gesture, edit: &AffineEdit) {
    let m = edit.matrix();
    let snapshot = &gesture.snapshot;
    let skipped = &mut gesture.skipped;

    for (id, (segment, parent)) in &snapshot.commands {
        let r = EntityRef::command(*id);
        if skipped.contains(&r) {
            continue;
        }
        let local_m = local(m, *parent);
        if !doc.update_command(*id, segment.map_points(|p| local_m * p)) {
            skip(skipped, r);
        }
    }

    for (id, (_, parent)) in &snapshot.texts {
        let r = EntityRef::text(*id);
        if !skipped.contains(&r) && !doc.set_text_preview(*id, Some(local(m, *parent))) {
            skip(skipped, r);
        }
    }

    for (entity, (rect, rotation, parent)) in &snapshot.frames {
        if skipped.contains(entity) {
            continue;
        }
        let local_m = local(m, *parent);
        let (new_rect, new_rotation) = match *edit {
            AffineEdit::Scale { .. } => {
                let r = Rect::from_points(local_m * rect.origin(), local_m * Point::new(rect.x1, rect.y1));
                let rotation = if edit.is_mirroring() { -rotation } else { *rotation };
                (r, rotation)
            }
            AffineEdit::Rotate { angle, .. } => {
                let center = rect.center();
                let offset: Vec2 = local_m * center - center;
                (*rect + offset, rotation + angle)
            }
        };
        let ok = match entity.kind {
            EntityKind::Image => doc.set_image_frame(entity.id, new_rect, new_rotation),
            _ => doc.set_use_frame(entity.id, new_rect, new_rotation),
        };
        if !ok {
            skip(skipped, *entity);
        }
    }

    for (id, (transform, parent)) in &snapshot.groups {
        let r = EntityRef::group(*id);
        if !skipped.contains(&r) && !doc.set_group_transform(*id, local(m, *parent) * *transform) {
            skip(skipped, r);
        }
    }
}
