//! Selection registry.
//!
//! Selected ids are kept per entity kind in ordered sets so iteration order
//! (and therefore the order in which movers run) is deterministic.

use crate::document::Document;
use crate::model::{Element, EntityId, EntityKind, EntityRef, GroupChild};
use kurbo::Rect;
use std::collections::{BTreeMap, BTreeSet};

/// The set of selected entities.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    sets: BTreeMap<EntityKind, BTreeSet<EntityId>>,
    revision: u64,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter bumped on every change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.sets
            .get(&entity.kind)
            .is_some_and(|set| set.contains(&entity.id))
    }

    /// Selected ids of one kind, in id order.
    pub fn ids(&self, kind: EntityKind) -> impl Iterator<Item = EntityId> + '_ {
        self.sets.get(&kind).into_iter().flatten().copied()
    }

    /// Every selected entity, grouped by kind.
    pub fn refs(&self) -> Vec<EntityRef> {
        self.sets
            .iter()
            .flat_map(|(kind, set)| set.iter().map(|id| EntityRef::new(*kind, *id)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.values().all(BTreeSet::is_empty)
    }

    pub fn len(&self) -> usize {
        self.sets.values().map(BTreeSet::len).sum()
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn insert(&mut self, entity: EntityRef) -> bool {
        let inserted = self.sets.entry(entity.kind).or_default().insert(entity.id);
        if inserted {
            self.bump();
        }
        inserted
    }

    fn remove(&mut self, entity: EntityRef) -> bool {
        let removed = self
            .sets
            .get_mut(&entity.kind)
            .is_some_and(|set| set.remove(&entity.id));
        if removed {
            self.bump();
        }
        removed
    }

    /// Commands can only be selected when they exist and are not locked.
    fn is_selectable(doc: &Document, entity: EntityRef) -> bool {
        match entity.kind {
            EntityKind::Command => doc.command(entity.id).is_some_and(|c| !c.locked),
            _ => doc.contains(entity),
        }
    }

    /// Whether `entity` is implied by a selected parent: its subpath (for a
    /// command) or any group enclosing it.
    pub fn is_covered(&self, doc: &Document, entity: EntityRef) -> bool {
        if entity.kind == EntityKind::Command {
            if let Some(sub) = doc.subpath_of_command(entity.id) {
                if self.contains(EntityRef::subpath(sub)) {
                    return true;
                }
            }
        }
        doc.ancestors(entity)
            .into_iter()
            .any(|g| self.contains(EntityRef::group(g)))
    }

    /// Replace the selection with `entity`.
    ///
    /// If `entity` is already selected or covered by a selected parent the
    /// selection is kept, so that pressing on part of a multi-selection
    /// drags the whole of it. Returns true if the selection changed.
    pub fn select_single(&mut self, doc: &Document, entity: EntityRef) -> bool {
        if !Self::is_selectable(doc, entity) {
            return false;
        }
        if self.contains(entity) || self.is_covered(doc, entity) {
            return false;
        }
        self.sets.clear();
        self.insert(entity);
        true
    }

    /// Add or remove `entity` (shift-click).
    pub fn toggle(&mut self, doc: &Document, entity: EntityRef) -> bool {
        if self.contains(entity) {
            return self.remove(entity);
        }
        if !Self::is_selectable(doc, entity) {
            return false;
        }
        self.insert(entity)
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.sets.clear();
            self.bump();
        }
    }

    /// Drop ids that no longer resolve (after undo or deletion).
    pub fn retain_existing(&mut self, doc: &Document) {
        let before = self.len();
        for (kind, set) in self.sets.iter_mut() {
            set.retain(|id| Self::is_selectable(doc, EntityRef::new(*kind, *id)));
        }
        if self.len() != before {
            self.bump();
        }
    }

    /// Area selection. Replaces the selection, or adds to it when `additive`.
    pub fn select_in_box(&mut self, doc: &Document, rect: Rect, additive: bool) {
        let matches = entities_in_rect(doc, rect.abs());
        if !additive {
            self.clear();
        }
        for entity in matches {
            self.insert(entity);
        }
    }

    /// Selected entities that are not implied by another selected entity.
    /// Moving or transforming exactly these touches each point once.
    pub fn top_level(&self, doc: &Document) -> Vec<EntityRef> {
        self.refs()
            .into_iter()
            .filter(|r| !self.is_covered(doc, *r))
            .collect()
    }

    /// Commands that move point by point: selected commands plus every
    /// command of a selected subpath, without duplicates or locked commands.
    pub fn effective_commands(&self, doc: &Document) -> Vec<EntityId> {
        let mut ids: BTreeSet<EntityId> = self
            .ids(EntityKind::Command)
            .filter(|id| doc.command(*id).is_some_and(|c| !c.locked))
            .collect();
        for sub in self.ids(EntityKind::SubPath).filter_map(|id| doc.subpath(id)) {
            ids.extend(sub.commands().iter().filter(|c| !c.locked).map(|c| c.id()));
        }
        ids.into_iter().collect()
    }
}

/// Entities captured by a selection rectangle. Anything inside a group is
/// represented by its outermost group.
fn entities_in_rect(doc: &Document, rect: Rect) -> Vec<EntityRef> {
    let mut found = Vec::new();

    for group in doc.groups() {
        let r = EntityRef::group(group.id());
        if doc.ancestors(r).is_empty()
            && doc.entity_bounds(r).is_some_and(|b| b.overlaps(rect))
        {
            found.push(r);
        }
    }

    for path in doc.paths() {
        if doc.parent_group(GroupChild::Path(path.id())).is_some() {
            continue;
        }
        for sub in path.subpaths() {
            let anchors: Vec<_> = sub
                .commands()
                .iter()
                .filter_map(|c| c.anchor().map(|p| (c, p)))
                .collect();
            if anchors.is_empty() {
                continue;
            }
            if anchors.iter().all(|(_, p)| rect.contains(*p)) {
                found.push(EntityRef::subpath(sub.id()));
            } else {
                found.extend(
                    anchors
                        .iter()
                        .filter(|(c, p)| !c.locked && rect.contains(*p))
                        .map(|(c, _)| EntityRef::command(c.id())),
                );
            }
        }
    }

    let loose = |child: GroupChild| doc.parent_group(child).is_none();
    found.extend(
        doc.texts()
            .iter()
            .filter(|t| loose(GroupChild::Text(t.id())) && t.bounds().overlaps(rect))
            .map(|t| EntityRef::text(t.id())),
    );
    found.extend(
        doc.images()
            .iter()
            .filter(|i| loose(GroupChild::Image(i.id())) && i.bounds().overlaps(rect))
            .map(|i| EntityRef::image(i.id())),
    );
    found.extend(
        doc.uses()
            .iter()
            .filter(|u| loose(GroupChild::SymbolUse(u.id())) && u.bounds().overlaps(rect))
            .map(|u| EntityRef::symbol_use(u.id())),
    );
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, Group, Path, SubPath, Text};
    use kurbo::Point;

    fn triangle(offset: f64) -> SubPath {
        SubPath::new(vec![
            Command::move_to(Point::new(offset, 0.0)),
            Command::line_to(Point::new(offset + 10.0, 0.0)),
            Command::line_to(Point::new(offset + 5.0, 10.0)),
            Command::close(),
        ])
    }

    #[test]
    fn test_locked_command_is_never_selected() {
        let mut doc = Document::new();
        let locked = Command::move_to(Point::ZERO).locked();
        let locked_id = locked.id();
        doc.add_path(Path::new(vec![SubPath::new(vec![
            locked,
            Command::line_to(Point::new(10.0, 0.0)),
        ])]));

        let mut selection = Selection::new();
        assert!(!selection.select_single(&doc, EntityRef::command(locked_id)));
        assert!(!selection.toggle(&doc, EntityRef::command(locked_id)));
        assert!(selection.is_empty());
        assert_eq!(selection.revision(), 0);
    }

    #[test]
    fn test_select_single_preserves_group_selection() {
        let mut doc = Document::new();
        let a = doc.add_text(Text::new(Point::ZERO, "a"));
        let b = doc.add_text(Text::new(Point::new(50.0, 0.0), "b"));
        let other = doc.add_text(Text::new(Point::new(200.0, 0.0), "c"));
        let group = doc.add_group(Group::new(vec![GroupChild::Text(a), GroupChild::Text(b)]));

        let mut selection = Selection::new();
        selection.select_single(&doc, EntityRef::group(group));
        selection.toggle(&doc, EntityRef::text(other));
        let revision = selection.revision();

        // Pressing on a child of the selected group keeps everything.
        assert!(!selection.select_single(&doc, EntityRef::text(a)));
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.revision(), revision);
        assert!(selection.contains(EntityRef::group(group)));

        // Pressing on an already selected entity keeps everything too.
        assert!(!selection.select_single(&doc, EntityRef::text(other)));
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_select_single_replaces_otherwise() {
        let mut doc = Document::new();
        let a = doc.add_text(Text::new(Point::ZERO, "a"));
        let b = doc.add_text(Text::new(Point::new(50.0, 0.0), "b"));
        let mut selection = Selection::new();
        selection.select_single(&doc, EntityRef::text(a));
        assert!(selection.select_single(&doc, EntityRef::text(b)));
        assert_eq!(selection.refs(), vec![EntityRef::text(b)]);
    }

    #[test]
    fn test_command_covered_by_subpath() {
        let mut doc = Document::new();
        let sub = triangle(0.0);
        let (sub_id, cmd) = (sub.id(), sub.commands()[1].id());
        doc.add_path(Path::new(vec![sub]));
        let mut selection = Selection::new();
        selection.select_single(&doc, EntityRef::subpath(sub_id));
        assert!(selection.is_covered(&doc, EntityRef::command(cmd)));
        assert!(!selection.select_single(&doc, EntityRef::command(cmd)));

        selection.toggle(&doc, EntityRef::command(cmd));
        // Explicit command plus its subpath still yields each command once.
        assert_eq!(selection.effective_commands(&doc).len(), 4);
        assert_eq!(selection.top_level(&doc), vec![EntityRef::subpath(sub_id)]);
    }

    #[test]
    fn test_box_selects_whole_subpaths_and_loose_commands() {
        let mut doc = Document::new();
        let inside = triangle(0.0);
        let partial = triangle(100.0);
        let inside_id = inside.id();
        let partial_first = partial.commands()[0].id();
        doc.add_path(Path::new(vec![inside, partial]));

        let mut selection = Selection::new();
        selection.select_in_box(&doc, Rect::new(-1.0, -1.0, 104.0, 11.0), false);
        assert!(selection.contains(EntityRef::subpath(inside_id)));
        assert!(selection.contains(EntityRef::command(partial_first)));
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_box_promotes_to_outermost_group() {
        let mut doc = Document::new();
        let text = doc.add_text(Text::new(Point::new(10.0, 20.0), "t"));
        let inner = doc.add_group(Group::new(vec![GroupChild::Text(text)]));
        let outer = doc.add_group(Group::new(vec![GroupChild::Group(inner)]));

        let mut selection = Selection::new();
        selection.select_in_box(&doc, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        assert_eq!(selection.refs(), vec![EntityRef::group(outer)]);
    }

    #[test]
    fn test_additive_box_keeps_previous() {
        let mut doc = Document::new();
        let far = doc.add_text(Text::new(Point::new(500.0, 500.0), "far"));
        let near = doc.add_text(Text::new(Point::new(10.0, 20.0), "near"));
        let mut selection = Selection::new();
        selection.select_single(&doc, EntityRef::text(far));
        selection.select_in_box(&doc, Rect::new(0.0, 0.0, 100.0, 100.0), true);
        assert!(selection.contains(EntityRef::text(far)));
        assert!(selection.contains(EntityRef::text(near)));
    }
}
