//! Instances of reusable symbols.

use super::{Element, EntityId};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A placed instance of a symbol definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolUse {
    pub(crate) id: EntityId,
    /// Identifier of the referenced symbol definition.
    pub symbol_id: String,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Rotation in radians around the center.
    #[serde(default)]
    pub rotation: f64,
}

impl SymbolUse {
    pub fn new(symbol_id: impl Into<String>, position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol_id: symbol_id.into(),
            position,
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.position = rect.origin();
        self.width = rect.width();
        self.height = rect.height();
    }
}

impl Element for SymbolUse {
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
