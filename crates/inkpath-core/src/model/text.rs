//! Text element.

use super::{Element, EntityId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A text element.
///
/// Text carries no per-glyph geometry. Rotation is stored separately from the
/// position (around the position), and affine gestures run through a live
/// `preview` transform that is baked into the permanent fields when the
/// gesture ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: EntityId,
    /// Baseline origin of the text.
    pub position: Point,
    pub content: String,
    /// Font size in document units.
    pub font_size: f64,
    /// Rotation in radians around `position`.
    #[serde(default)]
    pub rotation: f64,
    /// Live transform applied on top of the permanent transform mid-gesture.
    #[serde(skip)]
    pub(crate) preview: Option<Affine>,
}

impl Text {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 16.0;

    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            rotation: 0.0,
            preview: None,
        }
    }

    /// Approximate width based on character count.
    pub fn approximate_width(&self) -> f64 {
        let longest = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        (longest as f64 * self.font_size * 0.6).max(self.font_size)
    }

    /// Approximate height based on line count.
    pub fn approximate_height(&self) -> f64 {
        let lines = self.content.lines().count().max(1);
        lines as f64 * self.font_size * 1.2
    }

    /// Permanent transform (rotation around the position).
    pub fn transform(&self) -> Affine {
        Affine::rotate_about(self.rotation, self.position)
    }

    /// Transform used for rendering: the live preview composed over the
    /// permanent transform.
    pub fn render_transform(&self) -> Affine {
        self.preview.unwrap_or(Affine::IDENTITY) * self.transform()
    }

    /// The live preview transform, if a gesture is in progress.
    pub fn preview(&self) -> Option<Affine> {
        self.preview
    }

    /// Unrotated layout box. The position is the baseline origin, so the box
    /// extends upward by the ascent.
    fn layout_rect(&self) -> Rect {
        let ascent = self.font_size;
        Rect::new(
            self.position.x,
            self.position.y - ascent,
            self.position.x + self.approximate_width(),
            self.position.y - ascent + self.approximate_height(),
        )
    }
}

impl Element for Text {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Point {
        self.position
    }

    fn bounds(&self) -> Rect {
        self.render_transform().transform_rect_bbox(self.layout_rect())
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_grow_with_content() {
        let short = Text::new(Point::new(0.0, 20.0), "ab");
        let long = Text::new(Point::new(0.0, 20.0), "abcdefgh");
        assert!(long.bounds().width() > short.bounds().width());
    }

    #[test]
    fn test_multiline_height() {
        let text = Text::new(Point::new(0.0, 20.0), "one\ntwo");
        assert!((text.approximate_height() - 2.0 * 16.0 * 1.2).abs() < 1e-10);
    }

    #[test]
    fn test_preview_affects_bounds_only_while_set() {
        let mut text = Text::new(Point::new(0.0, 20.0), "hello");
        let base = text.bounds();
        text.preview = Some(Affine::translate(Vec2::new(10.0, 0.0)));
        assert!((text.bounds().x0 - base.x0 - 10.0).abs() < 1e-10);
        text.preview = None;
        assert_eq!(text.bounds(), base);
    }

    #[test]
    fn test_translate_moves_position() {
        let mut text = Text::new(Point::new(1.0, 2.0), "x");
        text.translate(Vec2::new(3.0, 4.0));
        assert_eq!(text.position(), Point::new(4.0, 6.0));
    }
}
