//! Drag orchestration: moving selections, control points and area selection.

use crate::config::EditorConfig;
use crate::document::{Document, HitTarget};
use crate::input::Modifiers;
use crate::model::{Command, ControlSlot, Element, EntityId, EntityKind, EntityRef, GroupChild};
use crate::schedule::Instant;
use crate::selection::Selection;
use crate::snap::{DragSnapper, Guideline, SnapSettings, snap_to_grid};
use kurbo::{Affine, Point, Rect, Vec2};
use std::collections::{BTreeMap, BTreeSet};

/// What the active drag is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Moving a selection grabbed by one of its command anchors.
    Command,
    /// Moving a selection grabbed by a whole entity.
    Element,
    /// Moving a single control point.
    ControlPoint,
    /// Rubber-band selection.
    Area,
}

/// Selection rectangle state for marquee selection.
#[derive(Debug, Clone, Copy)]
pub struct SelectionRect {
    /// Starting point in document coordinates.
    pub start: Point,
    /// Current point in document coordinates.
    pub current: Point,
    /// Add to the selection instead of replacing it.
    pub additive: bool,
}

impl SelectionRect {
    pub fn to_rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// Pre-drag state of every entity the drag may move.
#[derive(Debug, Clone, Default)]
pub struct DragSnapshot {
    subpaths: BTreeMap<EntityId, Vec<Command>>,
    texts: BTreeMap<EntityId, Point>,
    frames: BTreeMap<EntityRef, (Rect, f64)>,
    groups: BTreeMap<EntityId, Affine>,
}

impl DragSnapshot {
    fn capture(doc: &Document, targets: &[EntityRef]) -> Self {
        let mut snap = Self::default();
        for entity in targets {
            match entity.kind {
                EntityKind::Command | EntityKind::SubPath => {
                    let sub_id = match entity.kind {
                        EntityKind::Command => doc.subpath_of_command(entity.id),
                        _ => Some(entity.id),
                    };
                    if let Some(sub) = sub_id.and_then(|id| doc.subpath(id)) {
                        snap.subpaths
                            .entry(sub.id())
                            .or_insert_with(|| sub.commands().to_vec());
                    }
                }
                EntityKind::Text => {
                    if let Some(t) = doc.text(entity.id) {
                        snap.texts.insert(entity.id, t.position);
                    }
                }
                EntityKind::Image => {
                    if let Some(i) = doc.image(entity.id) {
                        snap.frames.insert(*entity, (i.rect(), i.rotation));
                    }
                }
                EntityKind::SymbolUse => {
                    if let Some(u) = doc.symbol_use(entity.id) {
                        snap.frames.insert(*entity, (u.rect(), u.rotation));
                    }
                }
                EntityKind::Group => {
                    if let Some(g) = doc.group(entity.id) {
                        snap.groups.insert(entity.id, g.transform);
                    }
                }
            }
        }
        snap
    }

    /// Put every captured entity back where it was.
    fn restore(&self, doc: &mut Document) {
        for (id, commands) in &self.subpaths {
            doc.replace_subpath_commands(*id, commands.clone());
        }
        for (id, position) in &self.texts {
            if let Some(current) = doc.text(*id).map(|t| t.position) {
                doc.move_text(*id, *position - current);
            }
        }
        for (entity, (rect, rotation)) in &self.frames {
            match entity.kind {
                EntityKind::Image => doc.set_image_frame(entity.id, *rect, *rotation),
                _ => doc.set_use_frame(entity.id, *rect, *rotation),
            };
        }
        for (id, transform) in &self.groups {
            doc.set_group_transform(*id, *transform);
        }
    }
}

#[derive(Debug, Clone)]
struct MoveSession {
    kind: DragKind,
    start: Point,
    last_raw: Vec2,
    last_applied: Vec2,
    targets: Vec<EntityRef>,
    snapshot: DragSnapshot,
    snapper: DragSnapper,
    dual: bool,
}

impl MoveSession {
    /// Move every target from the last applied delta to `snapped`.
    fn apply(&mut self, doc: &mut Document, snapped: Vec2) {
        let increment = snapped - self.last_applied;
        if increment == Vec2::ZERO {
            return;
        }
        for target in &self.targets {
            if !target.kind.mover()(doc, target.id, increment) {
                log::trace!("Skipping missing {:?} {}", target.kind, target.id);
            }
        }
        self.last_applied = snapped;
    }
}

#[derive(Debug, Clone)]
struct ControlSession {
    command: EntityId,
    slot: ControlSlot,
    start: Point,
    last_applied: Vec2,
    snapshot: DragSnapshot,
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    Moving(Box<MoveSession>),
    Control(ControlSession),
    Area(SelectionRect),
}

/// Pointer-driven state machine for moving entities.
#[derive(Debug, Clone, Default)]
pub struct DragOrchestrator {
    state: DragState,
}

impl DragOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn kind(&self) -> Option<DragKind> {
        match &self.state {
            DragState::Idle => None,
            DragState::Moving(s) => Some(s.kind),
            DragState::Control(_) => Some(DragKind::ControlPoint),
            DragState::Area(_) => Some(DragKind::Area),
        }
    }

    /// Whether the active drag is moving a coincident first/last point.
    pub fn is_dual(&self) -> bool {
        matches!(&self.state, DragState::Moving(s) if s.dual)
    }

    /// Alignment guides to render.
    pub fn guides(&self) -> &[Guideline] {
        match &self.state {
            DragState::Moving(s) => s.snapper.guides(),
            _ => &[],
        }
    }

    /// The rubber-band rectangle, while area selecting.
    pub fn area(&self) -> Option<Rect> {
        match &self.state {
            DragState::Area(r) => Some(r.to_rect()),
            _ => None,
        }
    }

    /// Handle a press at `point` (document coordinates) over `hit`.
    ///
    /// Returns true if a drag started. Presses while a drag is active are
    /// ignored. Shift on an entity toggles it and starts nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_down(
        &mut self,
        doc: &mut Document,
        selection: &mut Selection,
        hit: Option<HitTarget>,
        point: Point,
        modifiers: Modifiers,
        config: &EditorConfig,
        zoom: f64,
    ) -> bool {
        if self.is_dragging() {
            log::debug!("Ignoring pointer down during an active drag");
            return false;
        }

        let entity = match hit {
            None => {
                if !modifiers.shift {
                    selection.clear();
                }
                self.state = DragState::Area(SelectionRect {
                    start: point,
                    current: point,
                    additive: modifiers.shift,
                });
                return true;
            }
            Some(HitTarget::ControlPoint { command, slot }) => {
                let Some(sub) = doc.subpath_of_command(command) else {
                    return false;
                };
                let snapshot = DragSnapshot::capture(doc, &[EntityRef::subpath(sub)]);
                doc.push_to_history();
                log::debug!("Control point drag started on {command}");
                self.state = DragState::Control(ControlSession {
                    command,
                    slot,
                    start: point,
                    last_applied: Vec2::ZERO,
                    snapshot,
                });
                return true;
            }
            Some(HitTarget::Anchor(id)) => EntityRef::command(id),
            Some(HitTarget::Entity(entity)) => entity,
        };

        if modifiers.shift {
            selection.toggle(doc, entity);
            return false;
        }
        selection.select_single(doc, entity);
        if !selection.contains(entity) && !selection.is_covered(doc, entity) {
            // Locked or missing.
            return false;
        }

        let kind = if entity.kind == EntityKind::Command {
            DragKind::Command
        } else {
            DragKind::Element
        };
        let dual = is_dual_selection(doc, selection, config.dual_point_tolerance);
        let targets = selection.top_level(doc);
        let snapshot = DragSnapshot::capture(doc, &targets);
        doc.push_to_history();

        let mut settings = SnapSettings::from_config(config, zoom);
        if dual {
            settings.snap_to_grid = false;
            settings.guides_enabled = false;
        }
        if guides_suppressed(selection) {
            settings.guides_enabled = false;
        }

        let moving = moving_points(doc, selection);
        let mut snapper = DragSnapper::new(settings, config.guide_debounce_ms);
        if kind == DragKind::Command {
            if let Some(grabbed) = doc.command(entity.id).and_then(|c| c.anchor()) {
                snapper = snapper.with_sticky(grabbed, sticky_targets(doc, &moving));
            }
        }
        if let Some(bounds) = union_bounds(doc, &targets) {
            snapper = snapper.with_guides(bounds, sibling_bounds(doc, selection, &moving));
        }

        log::debug!(
            "Drag started: {:?} with {} target(s){}",
            kind,
            targets.len(),
            if dual { " (dual point)" } else { "" }
        );
        self.state = DragState::Moving(Box::new(MoveSession {
            kind,
            start: point,
            last_raw: Vec2::ZERO,
            last_applied: Vec2::ZERO,
            targets,
            snapshot,
            snapper,
            dual,
        }));
        true
    }

    /// Handle pointer motion to `point` (document coordinates).
    pub fn pointer_move(&mut self, doc: &mut Document, point: Point, now: Instant) {
        match &mut self.state {
            DragState::Idle => {}
            DragState::Area(rect) => rect.current = point,
            DragState::Control(session) => {
                let raw = point - session.start;
                let increment = raw - session.last_applied;
                if doc.move_control_point(session.command, session.slot, increment) {
                    session.last_applied = raw;
                } else {
                    log::trace!("Control point {} no longer resolves", session.command);
                }
            }
            DragState::Moving(session) => {
                let raw = point - session.start;
                let snapped = session.snapper.resolve(raw, now);
                session.last_raw = raw;
                session.apply(doc, snapped);
            }
        }
    }

    /// Finish the drag. Applies the grid pass for moves and resolves area
    /// selection. Returns the kind of drag that ended.
    pub fn pointer_up(&mut self, doc: &mut Document, selection: &mut Selection) -> Option<DragKind> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Area(rect) => {
                selection.select_in_box(doc, rect.to_rect(), rect.additive);
                Some(DragKind::Area)
            }
            DragState::Control(_) => {
                log::debug!("Control point drag ended");
                Some(DragKind::ControlPoint)
            }
            DragState::Moving(mut session) => {
                let raw = session.last_raw;
                if let Some(settled) = session.snapper.settle(raw) {
                    session.apply(doc, settled);
                }
                let settings = *session.snapper.settings();
                if settings.snap_to_grid && !session.dual {
                    for target in &session.targets {
                        let Some(reference) = reference_position(doc, *target) else {
                            continue;
                        };
                        let snapped = snap_to_grid(reference, settings.grid_size).point;
                        let correction = snapped - reference;
                        if correction != Vec2::ZERO {
                            target.kind.mover()(doc, target.id, correction);
                        }
                    }
                }
                session.snapper.finish();
                log::debug!("Drag ended: {:?}", session.kind);
                Some(session.kind)
            }
        }
    }

    /// Abort the drag and restore every moved entity from the snapshot.
    pub fn cancel(&mut self, doc: &mut Document) -> bool {
        match std::mem::take(&mut self.state) {
            DragState::Idle => false,
            DragState::Area(_) => true,
            DragState::Control(session) => {
                session.snapshot.restore(doc);
                true
            }
            DragState::Moving(mut session) => {
                session.snapshot.restore(doc);
                session.snapper.finish();
                log::debug!("Drag cancelled");
                true
            }
        }
    }
}

/// One or two selected commands forming the coincident first/last pair of
/// the same subpath, and nothing else selected.
fn is_dual_selection(doc: &Document, selection: &Selection, tolerance: f64) -> bool {
    let commands: Vec<EntityId> = selection.ids(EntityKind::Command).collect();
    if commands.is_empty() || commands.len() > 2 || commands.len() != selection.len() {
        return false;
    }
    let Some(sub_id) = doc.subpath_of_command(commands[0]) else {
        return false;
    };
    if commands
        .iter()
        .any(|id| doc.subpath_of_command(*id) != Some(sub_id))
    {
        return false;
    }
    let Some((first, last)) = doc.subpath(sub_id).and_then(|s| s.dual_endpoints(tolerance)) else {
        return false;
    };
    commands.iter().all(|id| *id == first || *id == last)
}

/// Guides are off when a group is selected together with more than one
/// other entity.
fn guides_suppressed(selection: &Selection) -> bool {
    let groups = selection.ids(EntityKind::Group).count();
    groups > 0 && selection.len() - groups > 1
}

/// Ids of commands that move with the selection, and the subpaths they
/// belong to.
struct MovingPoints {
    commands: BTreeSet<EntityId>,
    subpaths: BTreeSet<EntityId>,
}

fn moving_points(doc: &Document, selection: &Selection) -> MovingPoints {
    let commands: BTreeSet<EntityId> = selection.effective_commands(doc).into_iter().collect();
    let subpaths = commands
        .iter()
        .filter_map(|id| doc.subpath_of_command(*id))
        .collect();
    MovingPoints { commands, subpaths }
}

/// Anchors a dragged command may stick to.
fn sticky_targets(doc: &Document, moving: &MovingPoints) -> Vec<Point> {
    doc.paths()
        .iter()
        .flat_map(|p| p.subpaths())
        .flat_map(|s| s.commands())
        .filter(|c| !moving.commands.contains(&c.id()))
        .filter_map(|c| c.anchor())
        .collect()
}

/// Union of the document bounds of `targets`.
fn union_bounds(doc: &Document, targets: &[EntityRef]) -> Option<Rect> {
    targets
        .iter()
        .filter_map(|t| doc.entity_bounds(*t))
        .reduce(|a, b| a.union(b))
}

/// Bounds of unselected top-level siblings to align against.
fn sibling_bounds(doc: &Document, selection: &Selection, moving: &MovingPoints) -> Vec<Rect> {
    let mut out = Vec::new();
    let free = |child: GroupChild| doc.parent_group(child).is_none();
    let unselected = |r: EntityRef| !selection.contains(r) && !selection.is_covered(doc, r);

    for path in doc.paths() {
        if !free(GroupChild::Path(path.id())) {
            continue;
        }
        for sub in path.subpaths() {
            let r = EntityRef::subpath(sub.id());
            if unselected(r) && !moving.subpaths.contains(&sub.id()) {
                out.extend(doc.entity_bounds(r));
            }
        }
    }
    let candidates = doc
        .texts()
        .iter()
        .filter(|t| free(GroupChild::Text(t.id())))
        .map(|t| EntityRef::text(t.id()))
        .chain(
            doc.images()
                .iter()
                .filter(|i| free(GroupChild::Image(i.id())))
                .map(|i| EntityRef::image(i.id())),
        )
        .chain(
            doc.uses()
                .iter()
                .filter(|u| free(GroupChild::SymbolUse(u.id())))
                .map(|u| EntityRef::symbol_use(u.id())),
        )
        .chain(
            doc.groups()
                .iter()
                .filter(|g| free(GroupChild::Group(g.id())))
                .map(|g| EntityRef::group(g.id())),
        );
    for r in candidates {
        if unselected(r) {
            out.extend(doc.entity_bounds(r));
        }
    }
    out
}

/// The point the grid pass rounds for an entity.
fn reference_position(doc: &Document, entity: EntityRef) -> Option<Point> {
    match entity.kind {
        EntityKind::Command => doc.command(entity.id)?.anchor(),
        EntityKind::SubPath => doc
            .subpath(entity.id)?
            .commands()
            .iter()
            .find_map(|c| c.anchor()),
        EntityKind::Text => Some(doc.text(entity.id)?.position),
        EntityKind::Image => Some(doc.image(entity.id)?.position),
        EntityKind::SymbolUse => Some(doc.symbol_use(entity.id)?.position),
        EntityKind::Group => doc.entity_bounds(entity).map(|b| b.origin()),
    }
}
