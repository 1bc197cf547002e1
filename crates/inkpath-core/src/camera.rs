//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Pure mapping between screen pixels and document coordinates.
///
/// `screen = document * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Translation in screen pixels.
    pub pan: Vec2,
    /// Screen pixels per document unit. Always positive.
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Document-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Screen-to-document transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    pub fn to_document(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    pub fn to_screen(&self, document: Point) -> Point {
        self.transform() * document
    }

    /// Convert a screen-pixel length to document units.
    pub fn px_to_document(&self, px: f64) -> f64 {
        px / self.zoom
    }
}

/// Camera manages the view transform for the canvas, keeping the zoom
/// inside its limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    viewport: Viewport,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.viewport.pan
    }

    pub fn screen_to_document(&self, screen_point: Point) -> Point {
        self.viewport.to_document(screen_point)
    }

    pub fn document_to_screen(&self, document_point: Point) -> Point {
        self.viewport.to_screen(document_point)
    }

    /// Set the zoom level, clamped to the camera limits.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.viewport.pan += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.viewport.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.viewport.zoom).abs() < f64::EPSILON {
            return;
        }

        let document_point = self.screen_to_document(screen_point);
        self.viewport.zoom = new_zoom;

        // Re-anchor so the document point stays under the cursor.
        let new_screen = self.document_to_screen(document_point);
        self.viewport.pan += screen_point - new_screen;
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        self.viewport = Viewport::default();
    }

    /// Fit the camera to show the given bounding box.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded.width / bounds.width();
        let scale_y = padded.height / bounds.height();
        self.set_zoom(scale_x.min(scale_y));

        let bounds_center = bounds.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.viewport.pan = viewport_center.to_vec2() - bounds_center.to_vec2() * self.viewport.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.pan_offset(), Vec2::ZERO);
        assert!((camera.zoom() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_document_with_pan_and_zoom() {
        let viewport = Viewport {
            pan: Vec2::new(50.0, 100.0),
            zoom: 2.0,
        };
        let doc = viewport.to_document(Point::new(150.0, 300.0));
        assert!((doc.x - 50.0).abs() < f64::EPSILON);
        assert!((doc.y - 100.0).abs() < f64::EPSILON);
        assert!((viewport.px_to_document(8.0) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(30.0, -20.0));
        camera.set_zoom(1.5);

        let original = Point::new(123.0, 456.0);
        let doc = camera.screen_to_document(original);
        let back = camera.document_to_screen(doc);

        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.zoom() - camera.min_zoom).abs() < f64::EPSILON);

        camera.set_zoom(1000.0);
        assert!((camera.zoom() - camera.max_zoom).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_at_keeps_cursor_fixed() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(12.0, 7.0));
        let cursor = Point::new(200.0, 150.0);
        let before = camera.screen_to_document(cursor);
        camera.zoom_at(cursor, 2.5);
        let after = camera.screen_to_document(cursor);
        assert!((before.x - after.x).abs() < 1e-10);
        assert!((before.y - after.y).abs() < 1e-10);
    }

    #[test]
    fn test_fit_to_bounds_centers() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        camera.fit_to_bounds(bounds, Size::new(400.0, 400.0), 0.0);
        assert!((camera.zoom() - 4.0).abs() < 1e-10);
        let center = camera.document_to_screen(bounds.center());
        assert!((center.x - 200.0).abs() < 1e-10);
        assert!((center.y - 200.0).abs() < 1e-10);
    }
}
