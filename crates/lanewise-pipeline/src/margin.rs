//! Margin trimming: remove a fixed arc length from both ends of a segment.
//!
//! Keeps the tool from running up to the boundary of the piece. Each end
//! is scanned independently; when the cut lands between two samples a new
//! pose is synthesized by linear interpolation, carrying the orientation
//! of the sample on the discarded side. When the cut lands within a small
//! tolerance of a sample, the cut snaps to that sample instead.
//!
//! Segments shorter than twice the offset are returned untouched: no
//! partial trim, no error.
//!
//! In the default configuration this runs before sequencing.

use log::debug;

use crate::pose::{Pose, interpolate_position};
use crate::types::{PipelineError, PlannerConfig, Segment, SegmentEnd, validate_offset};

/// Where a scan decided to cut.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cut {
    /// Cut exactly at this sample; it is the first one kept.
    AtSample(usize),
    /// Cut `distance` along the edge from `outer` toward `inner`.
    /// `inner` is the first sample kept.
    Between {
        outer: usize,
        inner: usize,
        distance: f64,
    },
}

impl Cut {
    /// Index of the first original sample kept on this side.
    const fn kept(self) -> usize {
        match self {
            Self::AtSample(index) | Self::Between { inner: index, .. } => index,
        }
    }

    /// The synthesized boundary pose, if the cut fell between samples.
    fn synthesized(self, poses: &[Pose]) -> Option<Pose> {
        match self {
            Self::AtSample(_) => None,
            Self::Between {
                outer,
                inner,
                distance,
            } => {
                let from = &poses[outer];
                let position =
                    interpolate_position(from.position(), poses[inner].position(), distance);
                Some(Pose::new(position, from.orientation()))
            }
        }
    }
}

/// Total arc length: the sum of distances between consecutive samples.
#[must_use]
pub fn segment_length(segment: &Segment) -> f64 {
    segment
        .poses()
        .windows(2)
        .map(|pair| pair[0].distance(&pair[1]))
        .sum()
}

/// Walk edges `(outer, inner)` until `offset` of arc length is used up.
fn find_cut(
    poses: &[Pose],
    edges: impl Iterator<Item = (usize, usize)>,
    offset: f64,
    tolerance: f64,
) -> Option<Cut> {
    let mut remaining = offset;
    for (outer, inner) in edges {
        let edge = poses[outer].distance(&poses[inner]);
        if (edge - remaining).abs() < tolerance {
            return Some(Cut::AtSample(inner));
        }
        if remaining > edge {
            remaining -= edge;
        } else {
            return Some(Cut::Between {
                outer,
                inner,
                distance: remaining,
            });
        }
    }
    None
}

/// Trim one segment. `index` only labels the error.
fn trim(
    index: usize,
    segment: &Segment,
    offset: f64,
    tolerance: f64,
) -> Result<Segment, PipelineError> {
    let poses = segment.poses();
    if offset == 0.0 || poses.len() < 2 || segment_length(segment) < 2.0 * offset {
        return Ok(segment.clone());
    }

    let n = poses.len();
    let forward = find_cut(poses, (1..n).map(|i| (i - 1, i)), offset, tolerance).ok_or(
        PipelineError::MarginInvariant {
            segment: index,
            end: SegmentEnd::Start,
        },
    )?;
    let reverse = find_cut(poses, (0..n - 1).rev().map(|i| (i + 1, i)), offset, tolerance)
        .ok_or(PipelineError::MarginInvariant {
            segment: index,
            end: SegmentEnd::End,
        })?;

    let first_kept = forward.kept();
    let last_kept = reverse.kept();

    let mut trimmed = Vec::with_capacity(n + 2);
    trimmed.extend(forward.synthesized(poses));
    if first_kept <= last_kept {
        trimmed.extend_from_slice(&poses[first_kept..=last_kept]);
    }
    trimmed.extend(reverse.synthesized(poses));

    if trimmed.is_empty() {
        // Both cuts snapped to samples that crossed over each other; the
        // trimmed span has no length left. Keep the shared cut sample.
        trimmed.push(poses[first_kept.min(last_kept)]);
    }

    Ok(Segment::from_nonempty(trimmed))
}

/// Trim `offset` of arc length from both ends of a single segment.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOffset`] for a negative or non-finite
/// offset, and [`PipelineError::MarginInvariant`] (with segment index 0)
/// if a scan fails to find its cut point.
pub fn apply_margin(segment: &Segment, offset: f64) -> Result<Segment, PipelineError> {
    validate_offset(offset)?;
    trim(0, segment, offset, PlannerConfig::DEFAULT_CUT_TOLERANCE)
}

/// Trim `offset` of arc length from both ends of every segment.
///
/// Uses the default cut tolerance. See [`apply_margins_with_tolerance`].
///
/// # Errors
///
/// See [`apply_margins_with_tolerance`].
pub fn apply_margins(segments: &[Segment], offset: f64) -> Result<Vec<Segment>, PipelineError> {
    apply_margins_with_tolerance(segments, offset, PlannerConfig::DEFAULT_CUT_TOLERANCE)
}

/// Trim `offset` of arc length from both ends of every segment, snapping
/// cuts within `tolerance` of a sample to that sample.
///
/// Output has the same length and order as the input. Segments shorter
/// than `2 * offset` are returned unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOffset`] for a negative or non-finite
/// offset. Returns [`PipelineError::MarginInvariant`] for the first
/// segment (by index) whose scan fails to find a cut point; no partial
/// result is returned.
pub fn apply_margins_with_tolerance(
    segments: &[Segment],
    offset: f64,
    tolerance: f64,
) -> Result<Vec<Segment>, PipelineError> {
    validate_offset(offset)?;

    let trimmed = trim_all(segments, offset, tolerance)?;

    debug!(
        "margins: offset={offset} trimmed={} untouched={}",
        trimmed
            .iter()
            .zip(segments)
            .filter(|(after, before)| after != before)
            .count(),
        trimmed
            .iter()
            .zip(segments)
            .filter(|(after, before)| after == before)
            .count(),
    );

    Ok(trimmed)
}

#[cfg(not(feature = "parallel"))]
fn trim_all(
    segments: &[Segment],
    offset: f64,
    tolerance: f64,
) -> Result<Vec<Segment>, PipelineError> {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| trim(i, segment, offset, tolerance))
        .collect()
}

#[cfg(feature = "parallel")]
fn trim_all(
    segments: &[Segment],
    offset: f64,
    tolerance: f64,
) -> Result<Vec<Segment>, PipelineError> {
    use rayon::prelude::*;

    let results: Vec<Result<Segment, PipelineError>> = segments
        .par_iter()
        .enumerate()
        .map(|(i, segment)| trim(i, segment, offset, tolerance))
        .collect();
    // Sequential collect so the lowest failing index is the one reported.
    results.into_iter().collect()
}
