//! lanewise-pipeline: Pure toolpath sequencing and margin trimming (sans-IO).
//!
//! Turns an unordered set of raster toolpath segments into an ordered,
//! consistently-directed list through:
//! reference frame -> lateral lane sort -> greedy direction choice ->
//! end margin trimming.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! segments and returns structured data. File formats and the command
//! line live in `lanewise-export` and `lanewise-bench`.

pub mod average;
pub mod diagnostics;
pub mod frame;
pub mod margin;
pub mod pose;
pub mod sequence;
pub mod tool;
pub mod types;

use std::borrow::Cow;

use log::info;

pub use diagnostics::{Clock, PlanDiagnostics, WebClock, plan_with_diagnostics};
pub use margin::{apply_margin, apply_margins, segment_length};
pub use pose::Pose;
pub use sequence::sequence;
pub use tool::ProcessTool;
pub use types::{
    MarginOrder, PipelineError, Placement, PlanResult, PlannerConfig, Segment, SegmentEnd,
};

/// Plan the traversal of a set of raster segments.
///
/// # Pipeline steps
///
/// 1. Validate the configuration
/// 2. Trim end margins (when enabled and ordered before sequencing)
/// 3. Pick the reference frame from the longest segment
/// 4. Sort lanes laterally and choose each lane's direction
/// 5. Trim end margins (when enabled and ordered after sequencing)
///
/// Empty input yields an empty result with no reference rotation.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidOffset`] or
/// [`PipelineError::InvalidConfig`] if `config` fails validation.
/// Returns [`PipelineError::MarginInvariant`] if a margin scan cannot
/// locate a cut point; the whole batch is rejected.
pub fn plan(segments: &[Segment], config: &PlannerConfig) -> Result<PlanResult, PipelineError> {
    // 1. Validate.
    config.validate()?;

    let trim = |input: &[Segment]| {
        margin::apply_margins_with_tolerance(input, config.margin_offset, config.cut_tolerance)
    };

    // 2. Margins first (default order).
    let working: Cow<'_, [Segment]> =
        if config.apply_margins && config.margin_order == MarginOrder::BeforeSequencing {
            Cow::Owned(trim(segments)?)
        } else {
            Cow::Borrowed(segments)
        };

    // 3-4. Reference frame, lane sort, direction choice.
    let Some(sequenced) = sequence::sequence_detailed(&working) else {
        return Ok(PlanResult {
            segments: Vec::new(),
            reference_rotation: None,
            placements: Vec::new(),
        });
    };

    // 5. Margins last.
    let ordered = if config.apply_margins && config.margin_order == MarginOrder::AfterSequencing {
        trim(&sequenced.segments)?
    } else {
        sequenced.segments
    };

    info!(
        "planned {} segments from reference segment {}",
        ordered.len(),
        sequenced.frame.longest,
    );

    Ok(PlanResult {
        segments: ordered,
        reference_rotation: Some(sequenced.frame.rotation),
        placements: sequenced.placements,
    })
}
