//! InkPath Core Library
//!
//! Platform-agnostic manipulation core for an interactive vector path editor:
//! coordinate mapping, selection, dragging with snapping, affine transforms
//! and z-ordering over a single document aggregate.

pub mod camera;
pub mod config;
pub mod document;
pub mod drag;
pub mod editor;
pub mod handles;
pub mod input;
pub mod model;
pub mod schedule;
pub mod selection;
pub mod snap;
pub mod transform;
pub mod zorder;

pub use camera::{Camera, Viewport};
pub use config::{EditorConfig, GridConfig};
pub use document::{Document, HitTarget};
pub use drag::{DragKind, DragOrchestrator};
pub use editor::{Editor, Overlay};
pub use handles::{Corner, Handle, HandleKind, TransformBounds};
pub use input::{Modifiers, MouseButton, PointerEvent};
pub use model::{EntityId, EntityKind, EntityRef};
pub use schedule::RateLimiter;
pub use selection::Selection;
pub use snap::{Guideline, SnapResult, snap_angle, snap_to_grid};
pub use transform::{BoundsMeasure, KurboMeasure, PointsMeasure, TransformEngine};

use thiserror::Error;

/// Errors raised at the fallible edges of the core (loading documents and
/// configuration). Manipulation itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
