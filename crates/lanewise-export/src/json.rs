//! JSON segment codec.
//!
//! Segments are exchanged as a JSON array of segments, each a non-empty
//! array of poses:
//!
//! ```json
//! [
//!   [
//!     {"position": [0.0, 0.0, 0.0], "orientation": [0.0, 0.0, 0.0, 1.0]},
//!     {"position": [1.0, 0.0, 0.0], "orientation": [0.0, 0.0, 0.0, 1.0]}
//!   ]
//! ]
//! ```
//!
//! Orientations are `(x, y, z, w)` quaternions. Empty segments and
//! zero-norm quaternions are rejected while parsing.

use lanewise_pipeline::{PlanResult, Segment};

/// Errors from the JSON codec.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Input was not a valid segment list.
    #[error("invalid segments JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// Output could not be serialized.
    #[error("failed to serialize JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Parse a JSON array of segments.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] for malformed JSON, an empty segment,
/// or a degenerate orientation.
pub fn segments_from_json(json: &str) -> Result<Vec<Segment>, ExportError> {
    serde_json::from_str(json).map_err(ExportError::Parse)
}

/// Serialize segments as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] if a coordinate cannot be
/// represented in JSON.
pub fn segments_to_json(segments: &[Segment]) -> Result<String, ExportError> {
    serde_json::to_string_pretty(segments).map_err(ExportError::Serialize)
}

/// Serialize a full plan: segments, reference rotation, and placements.
///
/// # Errors
///
/// Returns [`ExportError::Serialize`] if a coordinate cannot be
/// represented in JSON.
pub fn plan_to_json(result: &PlanResult) -> Result<String, ExportError> {
    serde_json::to_string_pretty(result).map_err(ExportError::Serialize)
}
