//! Tool parameters for the upstream raster planner.
//!
//! The raster planner that produces the raw segments is not part of this
//! crate, but the parameters it consumes travel with the rest of the job
//! configuration. Blending and scanning jobs derive their raster line
//! spacing differently; see [`ProcessTool::blend`] and [`ProcessTool::scan`].

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Raster lines are never spaced closer than this (metres).
pub const MIN_LINE_SPACING: f64 = 0.01;

/// Raster planner parameters. All distances are in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessTool {
    /// Distance between consecutive samples along a raster line.
    pub pt_spacing: f64,
    /// Distance between adjacent raster lines.
    pub line_spacing: f64,
    /// Offset of the tool tip along the surface normal.
    pub tool_offset: f64,
    /// Height of the slicing planes above the surface.
    pub intersecting_plane_height: f64,
    /// Neighbors considered when estimating surface normals.
    pub nearest_neighbors: u32,
    /// Holes smaller than this are bridged rather than avoided.
    pub min_hole_size: f64,
}

impl ProcessTool {
    /// Default blending tool radius.
    pub const DEFAULT_TOOL_RADIUS: f64 = 0.025;

    /// Default scanner footprint width.
    pub const DEFAULT_SCAN_WIDTH: f64 = 0.025;

    /// Parameters for a blending (sanding) pass.
    ///
    /// Adjacent passes are one tool diameter apart, less `overlap`, and
    /// never closer than [`MIN_LINE_SPACING`].
    #[must_use]
    pub fn blend(tool_radius: f64, overlap: f64, discretization: f64) -> Self {
        Self {
            line_spacing: tool_radius.mul_add(2.0, -overlap).max(MIN_LINE_SPACING),
            pt_spacing: discretization,
            ..Self::default()
        }
    }

    /// Parameters for a scanning pass.
    ///
    /// Adjacent passes are one scan width apart, less `overlap`, and never
    /// closer than [`MIN_LINE_SPACING`].
    #[must_use]
    pub fn scan(scan_width: f64, overlap: f64, discretization: f64) -> Self {
        Self {
            line_spacing: (scan_width - overlap).max(MIN_LINE_SPACING),
            pt_spacing: discretization,
            ..Self::default()
        }
    }

    /// Check that every distance is usable by the raster planner.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is not positive and finite (`tool_offset` may be zero or
    /// negative but must be finite).
    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("pt_spacing", self.pt_spacing),
            ("line_spacing", self.line_spacing),
            ("intersecting_plane_height", self.intersecting_plane_height),
            ("min_hole_size", self.min_hole_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "tool.{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.tool_offset.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "tool.tool_offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProcessTool {
    fn default() -> Self {
        Self {
            pt_spacing: 0.01,
            line_spacing: 0.025,
            tool_offset: 0.0,
            intersecting_plane_height: 0.05,
            nearest_neighbors: 5,
            min_hole_size: 0.01,
        }
    }
}
