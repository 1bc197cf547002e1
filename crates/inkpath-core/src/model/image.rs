//! Raster image element.

use super::{Element, EntityId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An embedded or linked raster image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: EntityId,
    /// Top-left corner (before rotation).
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians around the center.
    #[serde(default)]
    pub rotation: f64,
    /// Image source reference.
    #[serde(default)]
    pub href: String,
}

impl Image {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            rotation: 0.0,
            href: String::new(),
        }
    }

    /// Unrotated rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    /// Replace position and size from a (possibly inverted) rectangle.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.position = rect.origin();
        self.width = rect.width();
        self.height = rect.height();
    }
}

impl Element for Image {
    fn id(&self) -> EntityId {
        self.id
    }

    fn position(&self) -> Point {
        self.position
    }

    fn bounds(&self) -> Rect {
        let rect = self.rect();
        Affine::rotate_about(self.rotation, rect.center()).transform_rect_bbox(rect)
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}
