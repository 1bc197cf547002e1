//! Editor aggregate: routes pointer events to the camera, the drag
//! orchestrator and the transform engine.

use crate::Error;
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::document::{Document, HitTarget};
use crate::drag::DragOrchestrator;
use crate::handles::{Handle, TransformBounds, handles_for, hit_test_handles};
use crate::input::{Modifiers, MouseButton, PointerEvent};
use crate::model::{EntityId, EntityKind, EntityRef};
use crate::schedule::Instant;
use crate::selection::Selection;
use crate::snap::Guideline;
use crate::transform::{BoundsMeasure, KurboMeasure, TransformEngine, selection_bounds};
use crate::zorder::{ZOrder, reorder_selection};
use kurbo::{Point, Rect};
use serde::Serialize;

/// Everything a renderer needs to draw the editing chrome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overlay {
    pub bounds: Option<TransformBounds>,
    pub handles: Vec<Handle>,
    pub guides: Vec<Guideline>,
    /// Rubber-band rectangle in document coordinates.
    pub area: Option<Rect>,
}

/// Owns the document and all interaction state for one canvas.
#[derive(Debug)]
pub struct Editor {
    pub document: Document,
    pub camera: Camera,
    pub selection: Selection,
    config: EditorConfig,
    modifiers: Modifiers,
    drag: DragOrchestrator,
    transform: TransformEngine,
    measure: Box<dyn BoundsMeasure>,
    /// Selection bounds keyed by (selection revision, document generation).
    bounds_cache: Option<((u64, u64), Option<TransformBounds>)>,
    /// Last screen position of an active pan gesture.
    pan_anchor: Option<Point>,
}

impl Editor {
    pub fn new(document: Document, config: EditorConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            document,
            camera: Camera::new(),
            selection: Selection::new(),
            config,
            modifiers: Modifiers::NONE,
            drag: DragOrchestrator::new(),
            transform: TransformEngine::new(),
            measure: Box::new(KurboMeasure),
            bounds_cache: None,
            pan_anchor: None,
        })
    }

    /// Replace the curve measuring capability used for selection bounds.
    pub fn with_measure(mut self, measure: Box<dyn BoundsMeasure>) -> Self {
        self.measure = measure;
        self.bounds_cache = None;
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EditorConfig) -> Result<(), Error> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn drag(&self) -> &DragOrchestrator {
        &self.drag
    }

    /// Whether any pointer gesture is in progress.
    pub fn is_busy(&self) -> bool {
        self.drag.is_dragging() || self.transform.is_active() || self.pan_anchor.is_some()
    }

    /// Feed one pointer event. Returns true if the event was consumed.
    pub fn handle_pointer_event(&mut self, event: PointerEvent, now: Instant) -> bool {
        match event {
            PointerEvent::Scroll { position, delta } => {
                if delta.y == 0.0 {
                    return false;
                }
                let factor = if delta.y > 0.0 { 1.1 } else { 0.9 };
                self.camera.zoom_at(position, factor);
                true
            }
            PointerEvent::Down { position, button } => self.pointer_down(position, button),
            PointerEvent::Move { position } => self.pointer_move(position, now),
            PointerEvent::Up { position, .. } => self.pointer_up(position, now),
        }
    }

    fn pointer_down(&mut self, screen: Point, button: MouseButton) -> bool {
        if self.is_busy() {
            log::debug!("Ignoring pointer down during an active gesture");
            return false;
        }
        if self.modifiers.space || button == MouseButton::Middle {
            self.pan_anchor = Some(screen);
            return true;
        }
        if button != MouseButton::Left {
            return false;
        }

        let point = self.camera.screen_to_document(screen);
        let zoom = self.camera.zoom();

        if let Some(bounds) = self.transform_bounds() {
            let handles = handles_for(&bounds, zoom, &self.config);
            if let Some(handle) = hit_test_handles(&handles, point) {
                return self.transform.begin(
                    &mut self.document,
                    &self.selection,
                    bounds,
                    handle.kind,
                    point,
                    &self.config,
                );
            }
        }

        let tolerance = self.camera.viewport().px_to_document(self.config.hit_tolerance_px);
        let hit = self
            .document
            .hit_test(point, tolerance)
            .map(|hit| self.prefer_selected(hit, point, tolerance))
            .map(|hit| self.promote(hit));
        self.drag.pointer_down(
            &mut self.document,
            &mut self.selection,
            hit,
            point,
            self.modifiers,
            &self.config,
            zoom,
        )
    }

    fn pointer_move(&mut self, screen: Point, now: Instant) -> bool {
        if let Some(last) = self.pan_anchor {
            self.camera.pan(screen - last);
            self.pan_anchor = Some(screen);
            return true;
        }
        let point = self.camera.screen_to_document(screen);
        if self.transform.is_active() {
            return self
                .transform
                .update(&mut self.document, point, self.modifiers)
                .is_some();
        }
        if self.drag.is_dragging() {
            self.drag.pointer_move(&mut self.document, point, now);
            return true;
        }
        false
    }

    fn pointer_up(&mut self, screen: Point, now: Instant) -> bool {
        if self.pan_anchor.take().is_some() {
            return true;
        }
        if self.transform.is_active() {
            self.pointer_move(screen, now);
            return self.transform.end(&mut self.document);
        }
        if self.drag.is_dragging() {
            self.pointer_move(screen, now);
            let ended = self.drag.pointer_up(&mut self.document, &mut self.selection);
            self.bounds_cache = None;
            return ended.is_some();
        }
        false
    }

    /// Among coincident anchors, pick one the selection already holds so a
    /// press on a dual point keeps dragging the point that was selected.
    fn prefer_selected(&self, hit: HitTarget, point: Point, tolerance: f64) -> HitTarget {
        let HitTarget::Anchor(id) = hit else {
            return hit;
        };
        let held = |id: EntityId| {
            let r = EntityRef::command(id);
            self.selection.contains(r) || self.selection.is_covered(&self.document, r)
        };
        if held(id) {
            return hit;
        }
        self.document
            .anchors_at(point, tolerance)
            .into_iter()
            .find(|c| held(*c))
            .map_or(hit, HitTarget::Anchor)
    }

    /// Whole-entity hits inside a group select the outermost group.
    fn promote(&self, hit: HitTarget) -> HitTarget {
        match hit {
            HitTarget::Entity(entity) => match self.document.outermost_group(entity) {
                Some(group) => HitTarget::Entity(EntityRef::group(group)),
                None => hit,
            },
            other => other,
        }
    }

    /// Abort the current gesture, restoring the pre-drag state.
    pub fn cancel_gesture(&mut self) -> bool {
        self.pan_anchor = None;
        let cancelled = self.drag.cancel(&mut self.document);
        self.bounds_cache = None;
        cancelled
    }

    /// Current selection bounds. Cached until the selection or the document
    /// changes.
    pub fn transform_bounds(&mut self) -> Option<TransformBounds> {
        if let Some(bounds) = self.transform.bounds() {
            return Some(bounds);
        }
        let key = (self.selection.revision(), self.document.generation());
        if let Some((cached_key, bounds)) = self.bounds_cache {
            if cached_key == key {
                return bounds;
            }
        }
        let bounds = selection_bounds(&self.document, &self.selection, self.measure.as_ref());
        self.bounds_cache = Some((key, bounds));
        bounds
    }

    /// Snapshot of the chrome to draw this frame.
    pub fn overlay(&mut self) -> Overlay {
        let bounds = self.transform_bounds();
        let handles = match bounds {
            Some(b) if !self.drag.is_dragging() => handles_for(&b, self.camera.zoom(), &self.config),
            _ => Vec::new(),
        };
        Overlay {
            bounds,
            handles,
            guides: self.drag.guides().to_vec(),
            area: self.drag.area(),
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.is_busy() || !self.document.undo() {
            return false;
        }
        self.selection.retain_existing(&self.document);
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.is_busy() || !self.document.redo() {
            return false;
        }
        self.selection.retain_existing(&self.document);
        true
    }

    /// Change the paint order of the selected subpaths.
    pub fn reorder(&mut self, op: ZOrder) -> bool {
        if self.is_busy() {
            return false;
        }
        reorder_selection(&mut self.document, &self.selection, op)
    }

    /// Number of selected entities of `kind`.
    pub fn selected_count(&self, kind: EntityKind) -> usize {
        self.selection.ids(kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Command, Path, SubPath, Text};
    use kurbo::Vec2;

    fn editor_with_square() -> (Editor, crate::model::EntityId, crate::model::EntityId) {
        let mut doc = Document::new();
        let sub = SubPath::new(vec![
            Command::move_to(Point::new(0.0, 0.0)),
            Command::line_to(Point::new(100.0, 0.0)),
            Command::line_to(Point::new(100.0, 100.0)),
            Command::line_to(Point::new(0.0, 100.0)),
            Command::close(),
        ]);
        let sub_id = sub.id();
        let corner = sub.commands()[2].id();
        doc.add_path(Path::new(vec![sub]));
        let editor = Editor::new(doc, EditorConfig::default()).unwrap();
        (editor, sub_id, corner)
    }

    fn down(p: (f64, f64)) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(p.0, p.1),
            button: MouseButton::Left,
        }
    }

    fn up(p: (f64, f64)) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(p.0, p.1),
            button: MouseButton::Left,
        }
    }

    fn mv(p: (f64, f64)) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(p.0, p.1),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EditorConfig::default();
        config.min_scale = 0.0;
        assert!(Editor::new(Document::new(), config).is_err());
    }

    #[test]
    fn test_click_and_drag_text() {
        let mut doc = Document::new();
        let id = doc.add_text(Text::new(Point::new(100.0, 100.0), "hello"));
        let mut editor = Editor::new(doc, EditorConfig::default()).unwrap();
        let now = Instant::now();

        assert!(editor.handle_pointer_event(down((110.0, 95.0)), now));
        assert!(editor.selection.contains(EntityRef::text(id)));
        editor.handle_pointer_event(mv((130.0, 105.0)), now);
        assert!(editor.handle_pointer_event(up((130.0, 105.0)), now));

        let pos = editor.document.text(id).unwrap().position;
        assert!((pos - Point::new(120.0, 110.0)).hypot() < 1e-9);
        assert!(!editor.is_busy());
        assert!(editor.undo());
        assert_eq!(editor.document.text(id).unwrap().position, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_corner_handle_scales_selection() {
        let (mut editor, sub, corner) = editor_with_square();
        editor.selection.select_single(&editor.document, EntityRef::subpath(sub));
        let bounds = editor.transform_bounds().unwrap();
        assert!((bounds.width - 100.0).abs() < 1e-9);

        let now = Instant::now();
        assert!(editor.handle_pointer_event(down((100.0, 100.0)), now));
        editor.handle_pointer_event(mv((200.0, 150.0)), now);
        assert!(editor.handle_pointer_event(up((200.0, 150.0)), now));

        let moved = editor.document.command(corner).unwrap().anchor().unwrap();
        assert!((moved - Point::new(200.0, 150.0)).hypot() < 1e-9);
        assert_eq!(editor.document.checkpoints(), 1);
        let bounds = editor.transform_bounds().unwrap();
        assert!((bounds.width - 200.0).abs() < 1e-9);
        assert!((bounds.height - 150.0).abs() < 1e-9);
    }

    /// Closed triangle whose last LineTo returns to the MoveTo anchor.
    fn editor_with_dual_point() -> (Editor, crate::model::EntityId, crate::model::EntityId) {
        let mut doc = Document::new();
        let sub = SubPath::new(vec![
            Command::move_to(Point::new(100.0, 100.0)),
            Command::line_to(Point::new(200.0, 100.0)),
            Command::line_to(Point::new(200.0, 200.0)),
            Command::line_to(Point::new(100.0, 100.0)),
        ]);
        let first = sub.commands()[0].id();
        let last = sub.commands()[3].id();
        doc.add_path(Path::new(vec![sub]));
        (Editor::new(doc, EditorConfig::default()).unwrap(), first, last)
    }

    fn anchor_of(editor: &Editor, id: crate::model::EntityId) -> Point {
        editor.document.command(id).unwrap().anchor().unwrap()
    }

    #[test]
    fn test_press_on_dual_point_drags_selected_first() {
        let (mut editor, first, last) = editor_with_dual_point();
        editor.selection.select_single(&editor.document, EntityRef::command(first));
        let now = Instant::now();
        editor.handle_pointer_event(down((100.0, 100.0)), now);
        assert!(editor.drag().is_dual());
        assert!(editor.selection.contains(EntityRef::command(first)));
        assert!(!editor.selection.contains(EntityRef::command(last)));
        editor.handle_pointer_event(mv((130.0, 140.0)), now);
        editor.handle_pointer_event(up((130.0, 140.0)), now);

        assert_eq!(anchor_of(&editor, first), Point::new(130.0, 140.0));
        assert_eq!(anchor_of(&editor, last), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_press_on_dual_point_without_selection_takes_topmost() {
        let (mut editor, first, last) = editor_with_dual_point();
        let now = Instant::now();
        editor.handle_pointer_event(down((100.0, 100.0)), now);
        editor.handle_pointer_event(up((120.0, 100.0)), now);
        assert_eq!(anchor_of(&editor, last), Point::new(120.0, 100.0));
        assert_eq!(anchor_of(&editor, first), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_horizontal_scroll_keeps_zoom() {
        let (mut editor, _, _) = editor_with_square();
        let consumed = editor.handle_pointer_event(
            PointerEvent::Scroll {
                position: Point::new(10.0, 10.0),
                delta: Vec2::new(5.0, 0.0),
            },
            Instant::now(),
        );
        assert!(!consumed);
        assert!((editor.camera.zoom() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_space_pans_camera() {
        let (mut editor, _, _) = editor_with_square();
        editor.set_modifiers(Modifiers {
            space: true,
            ..Modifiers::NONE
        });
        let now = Instant::now();
        editor.handle_pointer_event(down((10.0, 10.0)), now);
        editor.handle_pointer_event(mv((40.0, 50.0)), now);
        editor.handle_pointer_event(up((40.0, 50.0)), now);
        assert_eq!(editor.camera.pan_offset(), Vec2::new(30.0, 40.0));
        assert!(editor.selection.is_empty());
        assert_eq!(editor.document.checkpoints(), 0);
    }

    #[test]
    fn test_scroll_zooms_around_pointer() {
        let (mut editor, _, _) = editor_with_square();
        let anchor = Point::new(200.0, 100.0);
        let before = editor.camera.screen_to_document(anchor);
        editor.handle_pointer_event(
            PointerEvent::Scroll {
                position: anchor,
                delta: Vec2::new(0.0, 1.0),
            },
            Instant::now(),
        );
        assert!((editor.camera.zoom() - 1.1).abs() < 1e-9);
        let after = editor.camera.screen_to_document(anchor);
        assert!((before - after).hypot() < 1e-9);
    }

    #[test]
    fn test_overlay_shows_area_rectangle() {
        let (mut editor, _, _) = editor_with_square();
        let now = Instant::now();
        editor.handle_pointer_event(down((300.0, 300.0)), now);
        editor.handle_pointer_event(mv((400.0, 350.0)), now);
        let overlay = editor.overlay();
        assert_eq!(overlay.area, Some(Rect::new(300.0, 300.0, 400.0, 350.0)));
        assert!(overlay.handles.is_empty());
        editor.handle_pointer_event(up((400.0, 350.0)), now);
        assert_eq!(editor.overlay().area, None);
    }

    #[test]
    fn test_cancel_gesture_restores() {
        let mut doc = Document::new();
        let id = doc.add_text(Text::new(Point::new(100.0, 100.0), "hello"));
        let mut editor = Editor::new(doc, EditorConfig::default()).unwrap();
        let now = Instant::now();
        editor.handle_pointer_event(down((110.0, 95.0)), now);
        editor.handle_pointer_event(mv((300.0, 300.0)), now);
        assert!(editor.cancel_gesture());
        assert_eq!(editor.document.text(id).unwrap().position, Point::new(100.0, 100.0));
        assert!(!editor.is_busy());
    }

    #[test]
    fn test_overlay_handles_follow_selection() {
        let (mut editor, sub, _) = editor_with_square();
        assert!(editor.overlay().handles.is_empty());
        editor.selection.select_single(&editor.document, EntityRef::subpath(sub));
        let overlay = editor.overlay();
        assert_eq!(overlay.handles.len(), 5);
        assert_eq!(editor.selected_count(EntityKind::SubPath), 1);
    }
}
