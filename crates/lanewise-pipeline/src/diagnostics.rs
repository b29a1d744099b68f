//! Planning diagnostics: timing, counts, and travel metrics per stage.
//!
//! [`plan_with_diagnostics`] runs the same steps as [`crate::plan`] and
//! records what each stage did. Intended for parameter tuning and for
//! comparing margin orderings.
//!
//! Time is read through the [`Clock`] trait so callers pick the source.
//! [`WebClock`] uses the `web-time` crate, which maps to
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::margin::{apply_margins_with_tolerance, segment_length};
use crate::sequence::sequence_detailed;
use crate::types::{MarginOrder, PipelineError, PlanResult, PlannerConfig, Segment};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by `web_time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebClock;

impl Clock for WebClock {
    type Instant = web_time::Instant;

    fn now(&self) -> Self::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDiagnostics {
    /// Margin trimming (`None` when margins are disabled).
    pub margins: Option<StageDiagnostics>,
    /// Lane sequencing.
    pub sequencing: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PlanSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Margin trimming metrics.
    Margins {
        /// Whether trimming ran before or after sequencing.
        order: MarginOrder,
        /// Arc length removed from each end.
        offset: f64,
        /// Segments that were shortened.
        trimmed: usize,
        /// Segments left alone because they were too short.
        untouched: usize,
        /// Total poses before trimming.
        poses_before: usize,
        /// Total poses after trimming.
        poses_after: usize,
        /// Total arc length before trimming.
        length_before: f64,
        /// Total arc length after trimming.
        length_after: f64,
    },
    /// Sequencing metrics.
    Sequencing {
        /// Number of segments ordered.
        segment_count: usize,
        /// Segments traversed B-to-A.
        reversed: usize,
        /// Index of the segment the reference frame came from.
        longest: Option<usize>,
        /// Travel between segments in input order.
        travel_before: f64,
        /// Travel between segments in planned order.
        travel_after: f64,
    },
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    /// Segments in the input.
    pub input_segments: usize,
    /// Poses in the input.
    pub input_poses: usize,
    /// Poses in the output.
    pub output_poses: usize,
    /// Arc length of the output, excluding travel.
    pub cut_length: f64,
    /// Travel between consecutive output segments.
    pub travel_length: f64,
}

impl PlanDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Plan Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Input: {} segments, {} poses",
            self.summary.input_segments, self.summary.input_poses,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages: Vec<(&str, &StageDiagnostics)> = Vec::with_capacity(2);
        if let Some(ref m) = self.margins {
            stages.push(("Margins", m));
        }
        stages.push(("Sequencing", &self.sequencing));
        if let Some(ref m) = self.margins
            && matches!(
                m.metrics,
                StageMetrics::Margins {
                    order: MarginOrder::AfterSequencing,
                    ..
                }
            )
        {
            stages.rotate_left(1);
        }

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Output poses: {}  |  Cut length: {:.4}  |  Travel: {:.4}",
            self.summary.output_poses, self.summary.cut_length, self.summary.travel_length,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Margins {
            offset,
            trimmed,
            untouched,
            poses_before,
            poses_after,
            length_before,
            length_after,
            ..
        } => format!(
            "offset={offset:.4} trimmed={trimmed} untouched={untouched} pts={poses_before}->{poses_after} len={length_before:.4}->{length_after:.4}",
        ),
        StageMetrics::Sequencing {
            segment_count,
            reversed,
            longest,
            travel_before,
            travel_after,
        } => {
            let longest = longest.map_or_else(|| "-".to_string(), |i| i.to_string());
            format!(
                "{segment_count} segs, {reversed} reversed, ref=#{longest} travel={travel_before:.4}->{travel_after:.4}",
            )
        }
    }
}

/// Sum of straight-line gaps from each segment's exit to the next
/// segment's entry.
#[must_use]
pub fn travel_distance(segments: &[Segment]) -> f64 {
    segments
        .windows(2)
        .map(|pair| pair[0].last().distance(pair[1].first()))
        .sum()
}

/// Total arc length over a slice of segments.
fn total_length(segments: &[Segment]) -> f64 {
    segments.iter().map(segment_length).sum()
}

/// Total poses over a slice of segments.
fn total_poses(segments: &[Segment]) -> usize {
    segments.iter().map(Segment::len).sum()
}

/// Run the margin stage and describe it.
fn timed_margins<C: Clock>(
    segments: &[Segment],
    config: &PlannerConfig,
    clock: &C,
) -> Result<(Vec<Segment>, StageDiagnostics), PipelineError> {
    let start = clock.now();
    let trimmed =
        apply_margins_with_tolerance(segments, config.margin_offset, config.cut_tolerance)?;
    let duration = clock.elapsed(&start);

    let changed = trimmed
        .iter()
        .zip(segments)
        .filter(|(after, before)| after != before)
        .count();
    let metrics = StageMetrics::Margins {
        order: config.margin_order,
        offset: config.margin_offset,
        trimmed: changed,
        untouched: segments.len() - changed,
        poses_before: total_poses(segments),
        poses_after: total_poses(&trimmed),
        length_before: total_length(segments),
        length_after: total_length(&trimmed),
    };
    Ok((trimmed, StageDiagnostics { duration, metrics }))
}

/// Plan like [`crate::plan`], collecting per-stage diagnostics.
///
/// # Errors
///
/// Same as [`crate::plan`].
pub fn plan_with_diagnostics<C: Clock>(
    segments: &[Segment],
    config: &PlannerConfig,
    clock: &C,
) -> Result<(PlanResult, PlanDiagnostics), PipelineError> {
    config.validate()?;
    let run_start = clock.now();

    let trim_first = config.apply_margins && config.margin_order == MarginOrder::BeforeSequencing;
    let trim_last = config.apply_margins && config.margin_order == MarginOrder::AfterSequencing;

    let (working, mut margins) = if trim_first {
        let (trimmed, diag) = timed_margins(segments, config, clock)?;
        (trimmed, Some(diag))
    } else {
        (segments.to_vec(), None)
    };

    let start = clock.now();
    let sequenced = sequence_detailed(&working);
    let duration = clock.elapsed(&start);

    let (ordered, reference_rotation, placements, longest) = match sequenced {
        Some(s) => (s.segments, Some(s.frame.rotation), s.placements, Some(s.frame.longest)),
        None => (Vec::new(), None, Vec::new(), None),
    };
    let sequencing = StageDiagnostics {
        duration,
        metrics: StageMetrics::Sequencing {
            segment_count: ordered.len(),
            reversed: placements.iter().filter(|p| p.reversed).count(),
            longest,
            travel_before: travel_distance(&working),
            travel_after: travel_distance(&ordered),
        },
    };

    let ordered = if trim_last {
        let (trimmed, diag) = timed_margins(&ordered, config, clock)?;
        margins = Some(diag);
        trimmed
    } else {
        ordered
    };

    let total_duration = clock.elapsed(&run_start);
    let summary = PlanSummary {
        input_segments: segments.len(),
        input_poses: total_poses(segments),
        output_poses: total_poses(&ordered),
        cut_length: total_length(&ordered),
        travel_length: travel_distance(&ordered),
    };

    let result = PlanResult {
        segments: ordered,
        reference_rotation,
        placements,
    };
    let diagnostics = PlanDiagnostics {
        margins,
        sequencing,
        total_duration,
        summary,
    };
    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn line(from: (f64, f64), to: (f64, f64)) -> Segment {
        Segment::new(vec![
            Pose::from_xyz(from.0, from.1, 0.0),
            Pose::from_xyz(to.0, to.1, 0.0),
        ])
        .unwrap()
    }

    /// A clock that never advances, for deterministic durations.
    struct FrozenClock;

    impl Clock for FrozenClock {
        type Instant = ();

        fn now(&self) -> Self::Instant {}

        fn elapsed(&self, _since: &Self::Instant) -> Duration {
            Duration::ZERO
        }
    }

    fn lanes() -> Vec<Segment> {
        vec![
            line((0.0, 0.0), (10.0, 0.0)),
            line((0.0, 2.0), (10.0, 2.0)),
            line((0.0, 1.0), (10.0, 1.0)),
        ]
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn travel_of_zigzag() {
        let segments = vec![line((0.0, 0.0), (1.0, 0.0)), line((1.0, 1.0), (0.0, 1.0))];
        assert!((travel_distance(&segments) - 1.0).abs() < 1e-12);
        assert!(travel_distance(&segments[..1]).abs() < f64::EPSILON);
        assert!(travel_distance(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_count_reversals_and_travel() {
        let config = PlannerConfig {
            apply_margins: false,
            ..PlannerConfig::default()
        };
        let (result, diag) = plan_with_diagnostics(&lanes(), &config, &FrozenClock).unwrap();
        assert!(diag.margins.is_none());
        assert_eq!(result.segments.len(), 3);
        match diag.sequencing.metrics {
            StageMetrics::Sequencing {
                segment_count,
                reversed,
                longest,
                travel_before,
                travel_after,
            } => {
                assert_eq!(segment_count, 3);
                assert_eq!(reversed, 1);
                assert_eq!(longest, Some(0));
                assert!(travel_after < travel_before);
                assert!((travel_after - 2.0).abs() < 1e-9);
            }
            StageMetrics::Margins { .. } => panic!("wrong metrics variant"),
        }
    }

    #[test]
    fn margins_metrics_recorded() {
        let config = PlannerConfig {
            margin_offset: 1.0,
            ..PlannerConfig::default()
        };
        let (_, diag) = plan_with_diagnostics(&lanes(), &config, &FrozenClock).unwrap();
        let margins = diag.margins.unwrap();
        match margins.metrics {
            StageMetrics::Margins {
                trimmed,
                untouched,
                length_before,
                length_after,
                ..
            } => {
                assert_eq!(trimmed, 3);
                assert_eq!(untouched, 0);
                assert!((length_before - 30.0).abs() < 1e-9);
                assert!((length_after - 24.0).abs() < 1e-9);
            }
            StageMetrics::Sequencing { .. } => panic!("wrong metrics variant"),
        }
        assert!((diag.summary.cut_length - 24.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_produces_empty_diagnostics() {
        let (result, diag) =
            plan_with_diagnostics(&[], &PlannerConfig::default(), &FrozenClock).unwrap();
        assert!(result.segments.is_empty());
        assert!(result.reference_rotation.is_none());
        assert_eq!(diag.summary.input_segments, 0);
    }

    #[test]
    fn invalid_config_rejected() {
        let config = PlannerConfig {
            margin_offset: f64::NAN,
            ..PlannerConfig::default()
        };
        assert!(plan_with_diagnostics(&lanes(), &config, &FrozenClock).is_err());
    }

    #[test]
    fn web_clock_measures_nonnegative_time() {
        let clock = WebClock;
        let start = clock.now();
        assert!(clock.elapsed(&start) >= Duration::ZERO);
    }

    #[test]
    fn report_mentions_each_stage() {
        let (_, diag) =
            plan_with_diagnostics(&lanes(), &PlannerConfig::default(), &FrozenClock).unwrap();
        let report = diag.report();
        assert!(report.contains("Plan Diagnostics Report"));
        assert!(report.contains("Margins"));
        assert!(report.contains("Sequencing"));
        assert!(report.contains("1 reversed"));
    }

    #[test]
    fn report_orders_stages_as_run() {
        let config = PlannerConfig {
            margin_order: MarginOrder::AfterSequencing,
            ..PlannerConfig::default()
        };
        let (_, diag) = plan_with_diagnostics(&lanes(), &config, &FrozenClock).unwrap();
        let report = diag.report();
        let seq = report.find("Sequencing").unwrap();
        let margins = report.find("Margins").unwrap();
        assert!(seq < margins);
    }

    #[test]
    fn diagnostics_serde_round_trip() {
        let (_, diag) =
            plan_with_diagnostics(&lanes(), &PlannerConfig::default(), &FrozenClock).unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let back: PlanDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.input_segments, 3);
        assert!(back.margins.is_some());
    }
}
