//! The document aggregate: entity collections, named mutations and history.

use crate::model::{
    Command, ControlSlot, Element, EntityId, EntityKind, EntityRef, Group, GroupChild, Image,
    Path, Segment, SubPath, SymbolUse, Text, bounds_of_points, point_to_polyline_dist,
};
use crate::Error;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape as _, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Group nesting deeper than this is treated as a cycle.
const MAX_GROUP_DEPTH: usize = 32;

/// Flattening tolerance for curve hit testing, in document units.
const FLATTEN_TOLERANCE: f64 = 0.1;

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone)]
struct DocumentSnapshot {
    paths: Vec<Path>,
    texts: Vec<Text>,
    images: Vec<Image>,
    groups: Vec<Group>,
    uses: Vec<SymbolUse>,
}

/// Position of a command inside the path hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLocation {
    pub path: usize,
    pub subpath: usize,
    pub index: usize,
}

/// What a pointer is over, as classified by [`Document::hit_test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTarget {
    /// The anchor of a command.
    Anchor(EntityId),
    /// One control point of a cubic command.
    ControlPoint { command: EntityId, slot: ControlSlot },
    /// A whole entity (subpath outline, text, image, symbol use).
    Entity(EntityRef),
}

/// A vector document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier.
    pub id: String,
    /// Document name.
    pub name: String,
    /// Paths in paint order (back to front).
    pub(crate) paths: Vec<Path>,
    #[serde(default)]
    pub(crate) texts: Vec<Text>,
    #[serde(default)]
    pub(crate) images: Vec<Image>,
    #[serde(default)]
    pub(crate) groups: Vec<Group>,
    #[serde(default)]
    pub(crate) uses: Vec<SymbolUse>,
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
    /// Number of history checkpoints pushed since load.
    #[serde(skip)]
    checkpoints: usize,
    /// Bumped on every mutation; used to invalidate derived caches.
    #[serde(skip)]
    generation: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Signature of the per-kind move operations.
pub type Mover = fn(&mut Document, EntityId, Vec2) -> bool;

impl EntityKind {
    /// The document operation that translates an entity of this kind.
    pub fn mover(self) -> Mover {
        match self {
            EntityKind::Command => Document::move_command,
            EntityKind::SubPath => Document::move_subpath,
            EntityKind::Text => Document::move_text,
            EntityKind::Image => Document::move_image,
            EntityKind::Group => Document::move_group,
            EntityKind::SymbolUse => Document::move_use,
        }
    }
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            paths: Vec::new(),
            texts: Vec::new(),
            images: Vec::new(),
            groups: Vec::new(),
            uses: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            checkpoints: 0,
            generation: 0,
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a document, repairing any subpath that does not start with a MoveTo.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut doc: Document = serde_json::from_str(json)?;
        for subpath in doc.paths.iter_mut().flat_map(|p| p.subpaths.iter_mut()) {
            subpath.normalize();
        }
        Ok(doc)
    }

    // --- History ---

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            paths: self.paths.clone(),
            texts: self.texts.clone(),
            images: self.images.clone(),
            groups: self.groups.clone(),
            uses: self.uses.clone(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.paths = snapshot.paths;
        self.texts = snapshot.texts;
        self.images = snapshot.images;
        self.groups = snapshot.groups;
        self.uses = snapshot.uses;
        self.touch();
    }

    /// Record a history checkpoint (call before making changes).
    pub fn push_to_history(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
        self.checkpoints += 1;
    }

    /// Undo the last change. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Total checkpoints pushed so far.
    pub fn checkpoints(&self) -> usize {
        self.checkpoints
    }

    /// Mutation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    // --- Collections ---

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn uses(&self) -> &[SymbolUse] {
        &self.uses
    }

    pub fn add_path(&mut self, path: Path) -> EntityId {
        let id = path.id;
        self.paths.push(path);
        self.touch();
        id
    }

    pub fn add_text(&mut self, text: Text) -> EntityId {
        let id = text.id;
        self.texts.push(text);
        self.touch();
        id
    }

    pub fn add_image(&mut self, image: Image) -> EntityId {
        let id = image.id;
        self.images.push(image);
        self.touch();
        id
    }

    pub fn add_group(&mut self, group: Group) -> EntityId {
        let id = group.id;
        self.groups.push(group);
        self.touch();
        id
    }

    pub fn add_use(&mut self, symbol_use: SymbolUse) -> EntityId {
        let id = symbol_use.id;
        self.uses.push(symbol_use);
        self.touch();
        id
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
            && self.texts.is_empty()
            && self.images.is_empty()
            && self.groups.is_empty()
            && self.uses.is_empty()
    }

    // --- Lookups ---

    pub fn locate_command(&self, id: EntityId) -> Option<CommandLocation> {
        self.paths.iter().enumerate().find_map(|(pi, path)| {
            path.subpaths.iter().enumerate().find_map(|(si, sub)| {
                sub.position_of(id).map(|index| CommandLocation {
                    path: pi,
                    subpath: si,
                    index,
                })
            })
        })
    }

    fn locate_subpath(&self, id: EntityId) -> Option<(usize, usize)> {
        self.paths.iter().enumerate().find_map(|(pi, path)| {
            path.subpaths
                .iter()
                .position(|s| s.id == id)
                .map(|si| (pi, si))
        })
    }

    pub fn command(&self, id: EntityId) -> Option<&Command> {
        let loc = self.locate_command(id)?;
        Some(&self.paths[loc.path].subpaths[loc.subpath].commands[loc.index])
    }

    pub fn subpath(&self, id: EntityId) -> Option<&SubPath> {
        let (pi, si) = self.locate_subpath(id)?;
        Some(&self.paths[pi].subpaths[si])
    }

    pub fn path(&self, id: EntityId) -> Option<&Path> {
        self.paths.iter().find(|p| p.id == id)
    }

    pub fn subpath_of_command(&self, id: EntityId) -> Option<EntityId> {
        let loc = self.locate_command(id)?;
        Some(self.paths[loc.path].subpaths[loc.subpath].id)
    }

    pub fn path_of_subpath(&self, id: EntityId) -> Option<EntityId> {
        let (pi, _) = self.locate_subpath(id)?;
        Some(self.paths[pi].id)
    }

    pub fn text(&self, id: EntityId) -> Option<&Text> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn image(&self, id: EntityId) -> Option<&Image> {
        self.images.iter().find(|i| i.id == id)
    }

    pub fn group(&self, id: EntityId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn symbol_use(&self, id: EntityId) -> Option<&SymbolUse> {
        self.uses.iter().find(|u| u.id == id)
    }

    fn text_mut(&mut self, id: EntityId) -> Option<&mut Text> {
        self.texts.iter_mut().find(|t| t.id == id)
    }

    fn image_mut(&mut self, id: EntityId) -> Option<&mut Image> {
        self.images.iter_mut().find(|i| i.id == id)
    }

    fn group_mut(&mut self, id: EntityId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    fn use_mut(&mut self, id: EntityId) -> Option<&mut SymbolUse> {
        self.uses.iter_mut().find(|u| u.id == id)
    }

    /// Whether the referenced entity exists.
    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity.kind {
            EntityKind::Command => self.locate_command(entity.id).is_some(),
            EntityKind::SubPath => self.locate_subpath(entity.id).is_some(),
            EntityKind::Text => self.text(entity.id).is_some(),
            EntityKind::Image => self.image(entity.id).is_some(),
            EntityKind::Group => self.group(entity.id).is_some(),
            EntityKind::SymbolUse => self.symbol_use(entity.id).is_some(),
        }
    }

    // --- Group hierarchy ---

    /// The group child that represents `entity` (commands and subpaths are
    /// represented by their path).
    pub fn as_group_child(&self, entity: EntityRef) -> Option<GroupChild> {
        match entity.kind {
            EntityKind::Command => {
                let loc = self.locate_command(entity.id)?;
                Some(GroupChild::Path(self.paths[loc.path].id))
            }
            EntityKind::SubPath => {
                let (pi, _) = self.locate_subpath(entity.id)?;
                Some(GroupChild::Path(self.paths[pi].id))
            }
            EntityKind::Text => Some(GroupChild::Text(entity.id)),
            EntityKind::Image => Some(GroupChild::Image(entity.id)),
            EntityKind::SymbolUse => Some(GroupChild::SymbolUse(entity.id)),
            EntityKind::Group => Some(GroupChild::Group(entity.id)),
        }
    }

    /// The first group listing `child` as a member.
    pub fn parent_group(&self, child: GroupChild) -> Option<EntityId> {
        self.groups.iter().find(|g| g.contains(child)).map(|g| g.id)
    }

    /// Chain of enclosing groups, innermost first.
    pub fn ancestors(&self, entity: EntityRef) -> Vec<EntityId> {
        self.as_group_child(entity)
            .map(|child| self.child_ancestors(child))
            .unwrap_or_default()
    }

    fn child_ancestors(&self, mut child: GroupChild) -> Vec<EntityId> {
        let mut chain = Vec::new();
        while let Some(parent) = self.parent_group(child) {
            if chain.contains(&parent) || chain.len() >= MAX_GROUP_DEPTH {
                break;
            }
            chain.push(parent);
            child = GroupChild::Group(parent);
        }
        chain
    }

    fn child_transform(&self, child: GroupChild) -> Affine {
        self.child_ancestors(child)
            .iter()
            .filter_map(|id| self.group(*id))
            .fold(Affine::IDENTITY, |acc, g| g.transform * acc)
    }

    /// The outermost group enclosing `entity`, if any.
    pub fn outermost_group(&self, entity: EntityRef) -> Option<EntityId> {
        self.ancestors(entity).last().copied()
    }

    /// Combined transform of every enclosing group.
    pub fn ancestor_transform(&self, entity: EntityRef) -> Affine {
        self.as_group_child(entity)
            .map_or(Affine::IDENTITY, |child| self.child_transform(child))
    }

    // --- Geometry ---

    /// Bounds of an entity in its own coordinate space (before the
    /// transforms of enclosing groups). A group's own transform is included.
    pub fn local_bounds(&self, entity: EntityRef) -> Option<Rect> {
        match entity.kind {
            EntityKind::Command => {
                let p = self.command(entity.id)?.anchor()?;
                Some(Rect::from_points(p, p))
            }
            EntityKind::SubPath => self.subpath(entity.id)?.control_bounds(),
            EntityKind::Text => self.text(entity.id).map(Element::bounds),
            EntityKind::Image => self.image(entity.id).map(Element::bounds),
            EntityKind::SymbolUse => self.symbol_use(entity.id).map(Element::bounds),
            EntityKind::Group => self.group_bounds(entity.id, 0),
        }
    }

    fn group_bounds(&self, id: EntityId, depth: usize) -> Option<Rect> {
        if depth > MAX_GROUP_DEPTH {
            return None;
        }
        let group = self.group(id)?;
        let mut bounds: Option<Rect> = None;
        for child in &group.children {
            let child_bounds = match *child {
                GroupChild::Path(pid) => self
                    .path(pid)
                    .and_then(|p| bounds_of_points(p.subpaths.iter().flat_map(|s| s.points()))),
                GroupChild::Text(tid) => self.text(tid).map(Element::bounds),
                GroupChild::Image(iid) => self.image(iid).map(Element::bounds),
                GroupChild::SymbolUse(uid) => self.symbol_use(uid).map(Element::bounds),
                GroupChild::Group(gid) => self.group_bounds(gid, depth + 1),
            };
            if let Some(r) = child_bounds {
                let r = group.transform.transform_rect_bbox(r);
                bounds = Some(bounds.map_or(r, |b| b.union(r)));
            }
        }
        bounds
    }

    /// Bounds of an entity in document coordinates.
    pub fn entity_bounds(&self, entity: EntityRef) -> Option<Rect> {
        let local = self.local_bounds(entity)?;
        Some(self.ancestor_transform(entity).transform_rect_bbox(local))
    }

    /// Classify what lies under `point`. Anchors win over control points,
    /// which win over whole entities; later entities win over earlier ones.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> Option<HitTarget> {
        if let Some(hit) = self.hit_test_points(point, tolerance) {
            return Some(hit);
        }

        for text in self.texts.iter().rev() {
            let r = EntityRef::text(text.id);
            if self.element_hit(text, r, point, tolerance) {
                return Some(HitTarget::Entity(r));
            }
        }
        for image in self.images.iter().rev() {
            let r = EntityRef::image(image.id);
            if self.element_hit(image, r, point, tolerance) {
                return Some(HitTarget::Entity(r));
            }
        }
        for symbol_use in self.uses.iter().rev() {
            let r = EntityRef::symbol_use(symbol_use.id);
            if self.element_hit(symbol_use, r, point, tolerance) {
                return Some(HitTarget::Entity(r));
            }
        }

        for path in self.paths.iter().rev() {
            let local = self.child_transform(GroupChild::Path(path.id)).inverse() * point;
            for subpath in path.subpaths.iter().rev() {
                let r = EntityRef::subpath(subpath.id);
                let bez = subpath.to_bez_path();
                let filled = path.style.fill.is_some_and(|c| c.a > 0);
                if (filled && bez.winding(local) != 0)
                    || outline_distance(&bez, local) <= tolerance
                {
                    return Some(HitTarget::Entity(r));
                }
            }
        }
        None
    }

    /// Every command anchor within `tolerance` of `point`, topmost first.
    /// Closed subpaths report both coincident endpoints.
    pub fn anchors_at(&self, point: Point, tolerance: f64) -> Vec<EntityId> {
        let mut out = Vec::new();
        for path in self.paths.iter().rev() {
            let transform = self.child_transform(GroupChild::Path(path.id));
            for subpath in path.subpaths.iter().rev() {
                for command in subpath.commands.iter().rev() {
                    if command
                        .anchor()
                        .is_some_and(|a| (transform * a).distance(point) <= tolerance)
                    {
                        out.push(command.id);
                    }
                }
            }
        }
        out
    }

    fn hit_test_points(&self, point: Point, tolerance: f64) -> Option<HitTarget> {
        let mut control_hit = None;
        for path in self.paths.iter().rev() {
            let transform = self.child_transform(GroupChild::Path(path.id));
            for subpath in path.subpaths.iter().rev() {
                for command in subpath.commands.iter().rev() {
                    if let Some(anchor) = command.anchor() {
                        if (transform * anchor).distance(point) <= tolerance {
                            return Some(HitTarget::Anchor(command.id));
                        }
                    }
                    if control_hit.is_none() {
                        for slot in [ControlSlot::Second, ControlSlot::First] {
                            if let Some(ctrl) = command.control(slot) {
                                if (transform * ctrl).distance(point) <= tolerance {
                                    control_hit = Some(HitTarget::ControlPoint {
                                        command: command.id,
                                        slot,
                                    });
                                    break;
                                }
                            }
                        }
                    }
                }
            }
        }
        control_hit
    }

    fn element_hit(&self, element: &impl Element, r: EntityRef, point: Point, tol: f64) -> bool {
        let local = self.ancestor_transform(r).inverse() * point;
        element.hit_test(local, tol)
    }

    // --- Named mutations ---

    /// Move a command's anchor together with the control points attached to
    /// it: its own incoming handle and the next command's outgoing handle.
    pub fn move_command(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some(loc) = self.locate_command(id) else {
            return false;
        };
        let commands = &mut self.paths[loc.path].subpaths[loc.subpath].commands;
        if !commands[loc.index].translate_anchor(delta) {
            return false;
        }
        commands[loc.index].translate_control(ControlSlot::Second, delta);
        if let Some(next) = commands.get_mut(loc.index + 1) {
            next.translate_control(ControlSlot::First, delta);
        }
        self.touch();
        true
    }

    /// Move a single control point of a cubic command.
    pub fn move_control_point(&mut self, id: EntityId, slot: ControlSlot, delta: Vec2) -> bool {
        let Some(loc) = self.locate_command(id) else {
            return false;
        };
        let moved = self.paths[loc.path].subpaths[loc.subpath].commands[loc.index]
            .translate_control(slot, delta);
        if moved {
            self.touch();
        }
        moved
    }

    /// Move every point of a subpath.
    pub fn move_subpath(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some((pi, si)) = self.locate_subpath(id) else {
            return false;
        };
        for command in &mut self.paths[pi].subpaths[si].commands {
            command.translate(delta);
        }
        self.touch();
        true
    }

    pub fn move_text(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some(text) = self.text_mut(id) else {
            return false;
        };
        text.translate(delta);
        self.touch();
        true
    }

    pub fn move_image(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some(image) = self.image_mut(id) else {
            return false;
        };
        image.translate(delta);
        self.touch();
        true
    }

    pub fn move_use(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some(symbol_use) = self.use_mut(id) else {
            return false;
        };
        symbol_use.translate(delta);
        self.touch();
        true
    }

    /// Compose a translation into a group's transform.
    pub fn move_group(&mut self, id: EntityId, delta: Vec2) -> bool {
        let Some(group) = self.group_mut(id) else {
            return false;
        };
        group.translate(delta);
        self.touch();
        true
    }

    /// Replace the geometry of a command, keeping its id and lock state.
    pub fn update_command(&mut self, id: EntityId, segment: Segment) -> bool {
        let Some(loc) = self.locate_command(id) else {
            return false;
        };
        let subpath = &mut self.paths[loc.path].subpaths[loc.subpath];
        subpath.commands[loc.index].segment = segment;
        if loc.index == 0 {
            subpath.normalize();
        }
        self.touch();
        true
    }

    /// Replace all commands of a subpath, repairing a missing leading MoveTo.
    pub fn replace_subpath_commands(&mut self, id: EntityId, commands: Vec<Command>) -> bool {
        let Some((pi, si)) = self.locate_subpath(id) else {
            return false;
        };
        let subpath = &mut self.paths[pi].subpaths[si];
        subpath.commands = commands;
        subpath.normalize();
        self.touch();
        true
    }

    /// Reorder the subpaths of a path. `order` must be a permutation of the
    /// path's current subpath ids.
    pub fn set_subpath_order(&mut self, path_id: EntityId, order: &[EntityId]) -> bool {
        let Some(path) = self.paths.iter_mut().find(|p| p.id == path_id) else {
            return false;
        };
        if order.len() != path.subpaths.len() {
            return false;
        }
        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            let Some(sub) = path.subpaths.iter().find(|s| s.id == *id) else {
                return false;
            };
            if reordered.iter().any(|s: &SubPath| s.id == *id) {
                return false;
            }
            reordered.push(sub.clone());
        }
        path.subpaths = reordered;
        self.touch();
        true
    }

    /// Move a path to `index` in paint order (clamped).
    pub fn move_path(&mut self, path_id: EntityId, index: usize) -> bool {
        let Some(from) = self.paths.iter().position(|p| p.id == path_id) else {
            return false;
        };
        let to = index.min(self.paths.len() - 1);
        if from == to {
            return false;
        }
        let path = self.paths.remove(from);
        self.paths.insert(to, path);
        self.touch();
        true
    }

    /// Set or clear the live preview transform of a text.
    pub fn set_text_preview(&mut self, id: EntityId, preview: Option<Affine>) -> bool {
        let Some(text) = self.text_mut(id) else {
            return false;
        };
        text.preview = preview;
        self.touch();
        true
    }

    /// Write the permanent placement of a text and drop its preview.
    pub fn bake_text(&mut self, id: EntityId, position: Point, font_size: f64, rotation: f64) -> bool {
        let Some(text) = self.text_mut(id) else {
            return false;
        };
        text.position = position;
        text.font_size = font_size;
        text.rotation = rotation;
        text.preview = None;
        self.touch();
        true
    }

    /// Set an image's rectangle and rotation.
    pub fn set_image_frame(&mut self, id: EntityId, rect: Rect, rotation: f64) -> bool {
        let Some(image) = self.image_mut(id) else {
            return false;
        };
        image.set_rect(rect);
        image.rotation = rotation;
        self.touch();
        true
    }

    /// Set a symbol use's rectangle and rotation.
    pub fn set_use_frame(&mut self, id: EntityId, rect: Rect, rotation: f64) -> bool {
        let Some(symbol_use) = self.use_mut(id) else {
            return false;
        };
        symbol_use.set_rect(rect);
        symbol_use.rotation = rotation;
        self.touch();
        true
    }

    pub fn set_group_transform(&mut self, id: EntityId, transform: Affine) -> bool {
        let Some(group) = self.group_mut(id) else {
            return false;
        };
        group.transform = transform;
        self.touch();
        true
    }
}

/// Minimum distance from `point` to the flattened outline of `path`.
fn outline_distance(path: &BezPath, point: Point) -> f64 {
    let mut best = f64::INFINITY;
    let mut polyline: Vec<Point> = Vec::new();
    let mut start = Point::ZERO;
    let flush = |polyline: &mut Vec<Point>, best: &mut f64| {
        if polyline.len() == 1 {
            *best = best.min(polyline[0].distance(point));
        } else {
            *best = best.min(point_to_polyline_dist(point, polyline));
        }
        polyline.clear();
    };
    kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            flush(&mut polyline, &mut best);
            start = p;
            polyline.push(p);
        }
        PathEl::LineTo(p) => polyline.push(p),
        PathEl::ClosePath => polyline.push(start),
        // flatten only emits lines
        PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => polyline.push(p),
    });
    if !polyline.is_empty() {
        flush(&mut polyline, &mut best);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SerializableColor;

    fn square(origin: Point, size: f64) -> SubPath {
        SubPath::new(vec![
            Command::move_to(origin),
            Command::line_to(origin + Vec2::new(size, 0.0)),
            Command::line_to(origin + Vec2::new(size, size)),
            Command::line_to(origin + Vec2::new(0.0, size)),
            Command::close(),
        ])
    }

    fn curve() -> SubPath {
        SubPath::new(vec![
            Command::move_to(Point::new(0.0, 0.0)),
            Command::cubic_to(Point::new(10.0, -20.0), Point::new(40.0, -20.0), Point::new(50.0, 0.0)),
            Command::cubic_to(Point::new(60.0, 20.0), Point::new(90.0, 20.0), Point::new(100.0, 0.0)),
        ])
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.checkpoints(), 0);
    }

    #[test]
    fn test_move_command_carries_adjacent_handles() {
        let mut doc = Document::new();
        let sub = curve();
        let mid = sub.commands()[1].id();
        let next = sub.commands()[2].id();
        doc.add_path(Path::new(vec![sub]));

        assert!(doc.move_command(mid, Vec2::new(5.0, 5.0)));
        let cmd = doc.command(mid).unwrap();
        assert_eq!(cmd.anchor(), Some(Point::new(55.0, 5.0)));
        assert_eq!(cmd.control(ControlSlot::Second), Some(Point::new(45.0, -15.0)));
        // The previous anchor's handle stays put.
        assert_eq!(cmd.control(ControlSlot::First), Some(Point::new(10.0, -20.0)));
        let next = doc.command(next).unwrap();
        assert_eq!(next.control(ControlSlot::First), Some(Point::new(65.0, 25.0)));
        assert_eq!(next.control(ControlSlot::Second), Some(Point::new(90.0, 20.0)));
    }

    #[test]
    fn test_move_missing_entity_is_noop() {
        let mut doc = Document::new();
        let generation = doc.generation();
        assert!(!doc.move_command(Uuid::new_v4(), Vec2::new(1.0, 1.0)));
        assert!(!EntityKind::Text.mover()(&mut doc, Uuid::new_v4(), Vec2::new(1.0, 1.0)));
        assert_eq!(doc.generation(), generation);
    }

    #[test]
    fn test_mover_table_dispatch() {
        let mut doc = Document::new();
        let image = doc.add_image(Image::new(Point::new(0.0, 0.0), 10.0, 10.0));
        let group = doc.add_group(Group::new(vec![GroupChild::Image(image)]));
        assert!(EntityKind::Image.mover()(&mut doc, image, Vec2::new(3.0, 0.0)));
        assert!(EntityKind::Group.mover()(&mut doc, group, Vec2::new(0.0, 4.0)));
        assert_eq!(doc.image(image).unwrap().position, Point::new(3.0, 0.0));
        assert_eq!(
            doc.entity_bounds(EntityRef::image(image)),
            Some(Rect::new(3.0, 4.0, 13.0, 14.0))
        );
    }

    #[test]
    fn test_replace_commands_repairs_leading_move() {
        let mut doc = Document::new();
        let sub = square(Point::ZERO, 10.0);
        let sub_id = sub.id();
        doc.add_path(Path::new(vec![sub]));
        let commands = vec![
            Command::line_to(Point::new(1.0, 1.0)),
            Command::line_to(Point::new(2.0, 2.0)),
        ];
        assert!(doc.replace_subpath_commands(sub_id, commands));
        let sub = doc.subpath(sub_id).unwrap();
        assert!(matches!(sub.commands()[0].segment, Segment::MoveTo(_)));
    }

    #[test]
    fn test_undo_redo_move() {
        let mut doc = Document::new();
        let text = doc.add_text(Text::new(Point::new(0.0, 0.0), "hi"));
        doc.push_to_history();
        doc.move_text(text, Vec2::new(10.0, 0.0));
        assert!(doc.undo());
        assert_eq!(doc.text(text).unwrap().position, Point::new(0.0, 0.0));
        assert!(doc.redo());
        assert_eq!(doc.text(text).unwrap().position, Point::new(10.0, 0.0));
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut doc = Document::new();
        for _ in 0..(MAX_UNDO_HISTORY + 10) {
            doc.push_to_history();
        }
        assert_eq!(doc.undo_stack.len(), MAX_UNDO_HISTORY);
        assert_eq!(doc.checkpoints(), MAX_UNDO_HISTORY + 10);
    }

    #[test]
    fn test_set_subpath_order_requires_permutation() {
        let mut doc = Document::new();
        let (a, b) = (square(Point::ZERO, 1.0), square(Point::new(5.0, 0.0), 1.0));
        let (a_id, b_id) = (a.id(), b.id());
        let path = doc.add_path(Path::new(vec![a, b]));
        assert!(!doc.set_subpath_order(path, &[a_id, a_id]));
        assert!(!doc.set_subpath_order(path, &[a_id]));
        assert!(doc.set_subpath_order(path, &[b_id, a_id]));
        assert_eq!(doc.path(path).unwrap().subpath_ids(), vec![b_id, a_id]);
    }

    #[test]
    fn test_hit_test_priority() {
        let mut doc = Document::new();
        let sub = curve();
        let sub_id = sub.id();
        let anchor = sub.commands()[1].id();
        doc.add_path(Path::new(vec![sub]));

        assert_eq!(doc.hit_test(Point::new(50.5, 0.5), 2.0), Some(HitTarget::Anchor(anchor)));
        assert_eq!(
            doc.hit_test(Point::new(40.0, -19.0), 2.0),
            Some(HitTarget::ControlPoint {
                command: anchor,
                slot: ControlSlot::Second
            })
        );
        // On the outline between anchors.
        assert!(matches!(
            doc.hit_test(Point::new(25.0, -14.5), 2.0),
            Some(HitTarget::Entity(r)) if r == EntityRef::subpath(sub_id)
        ));
        assert_eq!(doc.hit_test(Point::new(500.0, 500.0), 2.0), None);
    }

    #[test]
    fn test_hit_test_filled_interior() {
        let mut doc = Document::new();
        let sub = square(Point::ZERO, 100.0);
        let sub_id = sub.id();
        let mut path = Path::new(vec![sub]);
        path.style.fill = Some(SerializableColor::black());
        doc.add_path(path);
        assert_eq!(
            doc.hit_test(Point::new(50.0, 50.0), 1.0),
            Some(HitTarget::Entity(EntityRef::subpath(sub_id)))
        );
    }

    #[test]
    fn test_unfilled_hit_only_near_outline() {
        let mut doc = Document::new();
        let sub = square(Point::ZERO, 100.0);
        let sub_id = sub.id();
        doc.add_path(Path::new(vec![sub]));
        assert_eq!(doc.hit_test(Point::new(50.0, 50.0), 1.0), None);
        assert_eq!(
            doc.hit_test(Point::new(50.0, 100.5), 1.0),
            Some(HitTarget::Entity(EntityRef::subpath(sub_id)))
        );
        // The closing edge back to the start counts as outline.
        assert_eq!(
            doc.hit_test(Point::new(-0.5, 50.0), 1.0),
            Some(HitTarget::Entity(EntityRef::subpath(sub_id)))
        );
    }

    #[test]
    fn test_anchors_at_reports_coincident_endpoints() {
        let mut doc = Document::new();
        let sub = SubPath::new(vec![
            Command::move_to(Point::new(100.0, 100.0)),
            Command::line_to(Point::new(200.0, 100.0)),
            Command::line_to(Point::new(100.0, 100.0)),
        ]);
        let first = sub.commands()[0].id();
        let last = sub.commands()[2].id();
        doc.add_path(Path::new(vec![sub]));

        assert_eq!(doc.anchors_at(Point::new(100.5, 100.0), 2.0), vec![last, first]);
        assert_eq!(doc.hit_test(Point::new(100.5, 100.0), 2.0), Some(HitTarget::Anchor(last)));
        assert!(doc.anchors_at(Point::new(150.0, 150.0), 2.0).is_empty());
    }

    #[test]
    fn test_outermost_group() {
        let mut doc = Document::new();
        let text = doc.add_text(Text::new(Point::ZERO, "a"));
        let inner = doc.add_group(Group::new(vec![GroupChild::Text(text)]));
        let outer = doc.add_group(Group::new(vec![GroupChild::Group(inner)]));
        assert_eq!(doc.outermost_group(EntityRef::text(text)), Some(outer));
        assert_eq!(doc.ancestors(EntityRef::text(text)), vec![inner, outer]);
        assert_eq!(doc.outermost_group(EntityRef::group(outer)), None);
    }

    #[test]
    fn test_group_cycle_terminates() {
        let mut doc = Document::new();
        let mut a = Group::new(Vec::new());
        let mut b = Group::new(Vec::new());
        a.children.push(GroupChild::Group(b.id()));
        b.children.push(GroupChild::Group(a.id()));
        let a_id = doc.add_group(a);
        doc.add_group(b);
        assert!(doc.ancestors(EntityRef::group(a_id)).len() <= 2);
        assert!(doc.entity_bounds(EntityRef::group(a_id)).is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut doc = Document::new();
        doc.add_path(Path::new(vec![square(Point::ZERO, 10.0)]));
        doc.add_text(Text::new(Point::new(1.0, 2.0), "hello"));
        let json = doc.to_json().unwrap();
        let loaded = Document::from_json(&json).unwrap();
        assert_eq!(loaded.paths(), doc.paths());
        assert_eq!(loaded.texts().len(), 1);
    }
}
