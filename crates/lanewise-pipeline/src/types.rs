//! Shared types for the lanewise toolpath pipeline.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::pose::{Pose, flip_about_normal};
use crate::tool::ProcessTool;

/// A directed, non-empty polyline of oriented samples.
///
/// A segment runs from its first pose (endpoint "A") to its last pose
/// (endpoint "B"). Segments are atomic: the pipeline reorders, reverses,
/// and trims them but never splits or merges them. Every operation that
/// changes a segment returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Pose>", into = "Vec<Pose>")]
pub struct Segment(Vec<Pose>);

impl Segment {
    /// Create a segment from its poses, in A-to-B order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptySegment`] if `poses` is empty.
    pub fn new(poses: Vec<Pose>) -> Result<Self, PipelineError> {
        if poses.is_empty() {
            return Err(PipelineError::EmptySegment);
        }
        Ok(Self(poses))
    }

    /// Wrap poses the caller has already proven non-empty.
    pub(crate) fn from_nonempty(poses: Vec<Pose>) -> Self {
        debug_assert!(!poses.is_empty(), "segments must contain at least one pose");
        Self(poses)
    }

    /// Number of poses in the segment (always at least one).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Endpoint A: the first pose.
    #[must_use]
    pub fn first(&self) -> &Pose {
        &self.0[0]
    }

    /// Endpoint B: the last pose.
    #[must_use]
    pub fn last(&self) -> &Pose {
        &self.0[self.0.len() - 1]
    }

    /// All poses in A-to-B order.
    #[must_use]
    pub fn poses(&self) -> &[Pose] {
        &self.0
    }

    /// The same samples traversed B-to-A.
    ///
    /// Pose order is reversed and every orientation is turned 180 degrees
    /// about its own normal so the tool heading stays aligned with the
    /// new direction of travel.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().map(flip_about_normal).collect())
    }
}

impl TryFrom<Vec<Pose>> for Segment {
    type Error = PipelineError;

    fn try_from(poses: Vec<Pose>) -> Result<Self, Self::Error> {
        Self::new(poses)
    }
}

impl From<Segment> for Vec<Pose> {
    fn from(segment: Segment) -> Self {
        segment.0
    }
}

/// Which end of a segment a margin scan started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentEnd {
    /// Scanning forward from the first pose.
    Start,
    /// Scanning backward from the last pose.
    End,
}

impl std::fmt::Display for SegmentEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// When margins are trimmed relative to sequencing.
///
/// Trimming moves segment endpoints, so it can change which endpoint the
/// sequencer considers closer. [`BeforeSequencing`](Self::BeforeSequencing)
/// is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarginOrder {
    /// Trim every segment, then sequence the trimmed segments.
    #[default]
    BeforeSequencing,
    /// Sequence the raw segments, then trim the ordered result.
    AfterSequencing,
}

/// Configuration for one planning run.
///
/// Passed explicitly to [`plan`](crate::plan); the core never reads
/// ambient configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Arc length removed from each end of every segment.
    pub margin_offset: f64,

    /// Whether to trim margins at all.
    pub apply_margins: bool,

    /// Whether margins are trimmed before or after sequencing.
    pub margin_order: MarginOrder,

    /// A margin cut within this distance of a sample snaps to that sample
    /// instead of synthesizing an interpolated pose.
    pub cut_tolerance: f64,

    /// Tool parameters for the upstream raster planner.
    pub tool: ProcessTool,
}

impl PlannerConfig {
    /// Default margin: a quarter inch, in metres.
    pub const DEFAULT_MARGIN_OFFSET: f64 = 0.25 * 0.0254;

    /// Default snap-to-sample tolerance for margin cuts.
    pub const DEFAULT_CUT_TOLERANCE: f64 = 1e-3;

    /// Check the values planning reads.
    ///
    /// `tool` is not checked here; planning never reads it. Use
    /// [`ProcessTool::validate`] before handing it to a raster planner.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidOffset`] for a negative or
    /// non-finite margin, and [`PipelineError::InvalidConfig`] for a
    /// non-positive or non-finite cut tolerance.
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_offset(self.margin_offset)?;
        if !(self.cut_tolerance.is_finite() && self.cut_tolerance > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "cut_tolerance must be positive and finite, got {}",
                self.cut_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            margin_offset: Self::DEFAULT_MARGIN_OFFSET,
            apply_margins: true,
            margin_order: MarginOrder::default(),
            cut_tolerance: Self::DEFAULT_CUT_TOLERANCE,
            tool: ProcessTool::default(),
        }
    }
}

/// Reject negative, NaN, and infinite margin offsets.
pub(crate) fn validate_offset(offset: f64) -> Result<(), PipelineError> {
    if offset.is_finite() && offset >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidOffset(offset))
    }
}

/// Where one output segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Index of the segment in the planner input.
    pub source: usize,
    /// Whether the segment is traversed B-to-A.
    pub reversed: bool,
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Ordered, oriented, and (optionally) trimmed segments.
    pub segments: Vec<Segment>,

    /// Reference rotation the lanes were ordered in. `None` for empty input.
    pub reference_rotation: Option<UnitQuaternion<f64>>,

    /// One entry per output segment, parallel to `segments`.
    pub placements: Vec<Placement>,
}

/// Errors that can occur while planning.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// A segment was constructed from zero poses.
    #[error("segment contains no poses")]
    EmptySegment,

    /// A pose orientation had (near) zero norm and is not a rotation.
    #[error("pose orientation is not a valid rotation")]
    DegenerateOrientation,

    /// The margin offset was negative or not finite.
    #[error("margin offset must be non-negative and finite, got {0}")]
    InvalidOffset(f64),

    /// Planner configuration is invalid.
    #[error("invalid planner configuration: {0}")]
    InvalidConfig(String),

    /// A margin scan found no cut point although the segment is long
    /// enough to trim. This is an internal consistency failure.
    #[error("margin scan from the {end} of segment {segment} found no cut point")]
    MarginInvariant {
        /// Index of the offending segment in the trimmed batch.
        segment: usize,
        /// Which scan failed.
        end: SegmentEnd,
    },
}
