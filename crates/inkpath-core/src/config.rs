//! Editor configuration.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Round dragged entities to the grid when a drag ends.
    pub snap_to_grid: bool,
    /// Grid cell size in document units.
    pub size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            snap_to_grid: false,
            size: 20.0,
        }
    }
}

/// Tunables for manipulation. Values suffixed `_px` are screen pixels and
/// are divided by the zoom before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub grid: GridConfig,
    /// Radius within which a dragged command sticks to another anchor.
    pub sticky_radius_px: f64,
    /// Distance within which selection edges align with sibling edges.
    pub guide_tolerance_px: f64,
    /// Minimum interval between guide recomputations.
    pub guide_debounce_ms: u64,
    /// Distance (document units) under which a subpath's first and last
    /// anchors count as one dual point.
    pub dual_point_tolerance: f64,
    pub handle_size_px: f64,
    pub rotate_handle_offset_px: f64,
    pub angle_snap_degrees: f64,
    /// Smallest scale factor magnitude a transform gesture may reach.
    pub min_scale: f64,
    /// Pick radius for anchors, control points and outlines.
    pub hit_tolerance_px: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            sticky_radius_px: 8.0,
            guide_tolerance_px: 6.0,
            guide_debounce_ms: 16,
            dual_point_tolerance: 0.5,
            handle_size_px: 16.0,
            rotate_handle_offset_px: 25.0,
            angle_snap_degrees: 15.0,
            min_scale: 0.01,
            hit_tolerance_px: 6.0,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.grid.size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "grid size must be positive, got {}",
                self.grid.size
            )));
        }
        if !(self.min_scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_scale must be positive, got {}",
                self.min_scale
            )));
        }
        let radii = [
            ("sticky_radius_px", self.sticky_radius_px),
            ("guide_tolerance_px", self.guide_tolerance_px),
            ("dual_point_tolerance", self.dual_point_tolerance),
            ("hit_tolerance_px", self.hit_tolerance_px),
        ];
        if let Some((name, value)) = radii.iter().find(|(_, v)| !(*v >= 0.0)) {
            return Err(Error::InvalidConfig(format!(
                "{name} must not be negative, got {value}"
            )));
        }
        Ok(())
    }
}
