//! Segment sequencing: order raster lanes left to right and choose a
//! traversal direction for each.
//!
//! Lanes are sorted once by their lateral position in the reference frame
//! (see [`crate::frame`]). The sorted list is then walked exactly once:
//! for each lane, the endpoint closer to where the previous lane finished
//! becomes its entry point. This is a local two-way decision per lane, not
//! a nearest-neighbor search over all remaining lanes, so the lane order
//! is fixed by the sort and only directions are chosen greedily.
//!
//! This is the final step of planning, after margin trimming in the
//! default configuration.

use log::{debug, trace};
use nalgebra::Vector3;

use crate::frame::{EndpointRecord, ReferenceFrame, project_endpoints, reference_frame};
use crate::types::{Placement, Segment};

/// One step of the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceStep {
    /// Index into the sorted [`EndpointRecord`] list.
    pub record: usize,
    /// `true` to traverse A-to-B, `false` to traverse B-to-A.
    pub started_at_a: bool,
}

/// Output of [`sequence_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sequenced {
    /// The ordered, oriented segments.
    pub segments: Vec<Segment>,
    /// The frame the lanes were sorted in.
    pub frame: ReferenceFrame,
    /// Source index and direction of each output segment.
    pub placements: Vec<Placement>,
}

/// Sort records by lateral position, lowest first.
///
/// The sort is stable: lanes with equal lateral position keep their
/// input order.
pub fn sort_lanes(records: &mut [EndpointRecord]) {
    records.sort_by(|lhs, rhs| lhs.lateral().total_cmp(&rhs.lateral()));
}

/// Where the tool is after completing `step`.
fn exit_position(records: &[EndpointRecord], step: SequenceStep) -> Vector3<f64> {
    let record = &records[step.record];
    if step.started_at_a { record.b } else { record.a }
}

/// Choose a direction for every record of an already sorted list.
///
/// The first lane always starts at A. Each later lane starts at A only
/// if A is strictly closer than B to the previous lane's exit; ties go
/// to B.
#[must_use]
pub fn plan_steps(records: &[EndpointRecord]) -> Vec<SequenceStep> {
    let mut steps = Vec::with_capacity(records.len());
    if records.is_empty() {
        return steps;
    }

    let mut previous = SequenceStep {
        record: 0,
        started_at_a: true,
    };
    steps.push(previous);

    for (i, record) in records.iter().enumerate().skip(1) {
        let current = exit_position(records, previous);
        let dist_a = (record.a - current).norm_squared();
        let dist_b = (record.b - current).norm_squared();
        let step = SequenceStep {
            record: i,
            started_at_a: dist_a < dist_b,
        };
        trace!(
            "lane {i} (segment {}): dist_a={dist_a:.6} dist_b={dist_b:.6} from_a={}",
            record.source, step.started_at_a,
        );
        steps.push(step);
        previous = step;
    }

    steps
}

/// Materialize the traversal: look each step's segment up through its
/// record and reverse it when the step starts at B.
#[must_use]
pub fn rebuild(
    segments: &[Segment],
    records: &[EndpointRecord],
    steps: &[SequenceStep],
) -> (Vec<Segment>, Vec<Placement>) {
    steps
        .iter()
        .map(|step| {
            let source = records[step.record].source;
            let segment = if step.started_at_a {
                segments[source].clone()
            } else {
                segments[source].reversed()
            };
            let placement = Placement {
                source,
                reversed: !step.started_at_a,
            };
            (segment, placement)
        })
        .unzip()
}

/// Order and orient segments for traversal.
///
/// Returns `None` for empty input. See [`sequence`] for the plain form.
#[must_use]
pub fn sequence_detailed(segments: &[Segment]) -> Option<Sequenced> {
    let frame = reference_frame(segments)?;
    let mut records = project_endpoints(segments, &frame);
    sort_lanes(&mut records);
    let steps = plan_steps(&records);
    let (ordered, placements) = rebuild(segments, &records, &steps);

    debug!(
        "sequenced {} segments ({} reversed)",
        ordered.len(),
        placements.iter().filter(|p| p.reversed).count(),
    );

    Some(Sequenced {
        segments: ordered,
        frame,
        placements,
    })
}

/// Order and orient segments for traversal.
///
/// The result is a permutation of the input in which some segments may
/// be reversed; nothing is dropped, duplicated, or otherwise altered.
/// Empty input yields an empty result.
#[must_use]
pub fn sequence(segments: &[Segment]) -> Vec<Segment> {
    sequence_detailed(segments).map_or_else(Vec::new, |s| s.segments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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

    fn record(a: (f64, f64), b: (f64, f64), source: usize) -> EndpointRecord {
        EndpointRecord {
            a: Vector3::new(a.0, a.1, 0.0),
            b: Vector3::new(b.0, b.1, 0.0),
            source,
        }
    }

    /// Sorted, rounded endpoint positions of a segment, for order-free
    /// content comparison.
    fn content_key(segment: &Segment) -> Vec<(i64, i64, i64)> {
        #[allow(clippy::cast_possible_truncation)]
        let mut key: Vec<(i64, i64, i64)> = segment
            .poses()
            .iter()
            .map(|p| {
                let v = p.position() * 1e6;
                (v.x.round() as i64, v.y.round() as i64, v.z.round() as i64)
            })
            .collect();
        key.sort_unstable();
        key
    }

    // --- sort_lanes ---

    #[test]
    fn sort_by_lower_endpoint() {
        let mut records = vec![
            record((0.0, 5.0), (1.0, 5.0), 0),
            record((0.0, 3.0), (1.0, 9.0), 1),
            record((0.0, 4.0), (1.0, 4.0), 2),
        ];
        sort_lanes(&mut records);
        let order: Vec<usize> = records.iter().map(|r| r.source).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn sort_is_stable_for_equal_lanes() {
        let mut records = vec![
            record((0.0, 1.0), (1.0, 1.0), 0),
            record((5.0, 1.0), (6.0, 1.0), 1),
            record((0.0, 0.0), (1.0, 0.0), 2),
        ];
        sort_lanes(&mut records);
        let order: Vec<usize> = records.iter().map(|r| r.source).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }

    // --- plan_steps ---

    #[test]
    fn no_records_no_steps() {
        assert!(plan_steps(&[]).is_empty());
    }

    #[test]
    fn first_step_always_starts_at_a() {
        let records = [record((9.0, 0.0), (0.0, 0.0), 0)];
        assert_eq!(
            plan_steps(&records),
            vec![SequenceStep {
                record: 0,
                started_at_a: true
            }]
        );
    }

    #[test]
    fn three_lane_zigzag() {
        let records = [
            record((0.0, 0.0), (1.0, 0.0), 0),
            record((0.0, 1.0), (1.0, 1.0), 1),
            record((0.0, 2.0), (1.0, 2.0), 2),
        ];
        let steps = plan_steps(&records);
        let directions: Vec<bool> = steps.iter().map(|s| s.started_at_a).collect();
        assert_eq!(directions, vec![true, false, true]);
        let indices: Vec<usize> = steps.iter().map(|s| s.record).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn tie_goes_to_b() {
        // Previous lane exits at (0.5, 0): both ends of the next lane are
        // equally far away.
        let records = [
            record((0.0, 0.0), (0.5, 0.0), 0),
            record((0.0, 1.0), (1.0, 1.0), 1),
        ];
        let steps = plan_steps(&records);
        assert!(!steps[1].started_at_a);
    }

    #[test]
    fn exit_follows_direction_of_previous_step() {
        // Lane 1 is traversed B-to-A, so the tool exits at its A end
        // (0, 1) and lane 2's A end is closer.
        let records = [
            record((0.0, 0.0), (10.0, 0.0), 0),
            record((0.0, 1.0), (10.0, 1.0), 1),
            record((0.0, 2.0), (10.0, 2.0), 2),
        ];
        let steps = plan_steps(&records);
        assert!(!steps[1].started_at_a);
        assert!(steps[2].started_at_a);
    }

    // --- rebuild ---

    #[test]
    fn rebuild_follows_source_indices() {
        let segments = [line((0.0, 5.0), (1.0, 5.0)), line((0.0, 0.0), (1.0, 0.0))];
        let records = [
            record((0.0, 0.0), (1.0, 0.0), 1),
            record((0.0, 5.0), (1.0, 5.0), 0),
        ];
        let steps = [
            SequenceStep {
                record: 0,
                started_at_a: true,
            },
            SequenceStep {
                record: 1,
                started_at_a: false,
            },
        ];
        let (ordered, placements) = rebuild(&segments, &records, &steps);
        assert_eq!(ordered[0], segments[1]);
        assert_eq!(ordered[1], segments[0].reversed());
        assert_eq!(
            placements,
            vec![
                Placement {
                    source: 1,
                    reversed: false
                },
                Placement {
                    source: 0,
                    reversed: true
                },
            ]
        );
    }

    // --- sequence ---

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(sequence(&[]).is_empty());
        assert!(sequence_detailed(&[]).is_none());
    }

    #[test]
    fn single_segment_unchanged() {
        let s = line((3.0, 1.0), (0.0, 1.0));
        assert_eq!(sequence(std::slice::from_ref(&s)), vec![s]);
    }

    #[test]
    fn three_parallel_lines_scenario() {
        let seg0 = line((0.0, 0.0), (1.0, 0.0));
        let seg1 = line((0.0, 1.0), (1.0, 1.0));
        let seg2 = line((0.0, 2.0), (1.0, 2.0));
        let detailed = sequence_detailed(&[seg0.clone(), seg1.clone(), seg2.clone()]).unwrap();

        assert_eq!(detailed.frame.longest, 0);
        assert!(detailed.frame.rotation.angle() < 1e-6);
        assert_eq!(detailed.segments, vec![seg0, seg1.reversed(), seg2]);
        let reversed: Vec<bool> = detailed.placements.iter().map(|p| p.reversed).collect();
        assert_eq!(reversed, vec![false, true, false]);
    }

    #[test]
    fn shuffled_lanes_sorted_left_to_right() {
        let seg0 = line((0.0, 2.0), (1.0, 2.0));
        let seg1 = line((0.0, 0.0), (1.0, 0.0));
        let seg2 = line((0.0, 1.0), (1.0, 1.0));
        let detailed = sequence_detailed(&[seg0, seg1, seg2]).unwrap();
        let sources: Vec<usize> = detailed.placements.iter().map(|p| p.source).collect();
        assert_eq!(sources, vec![1, 2, 0]);
    }

    #[test]
    fn sequence_is_a_permutation() {
        let segments: Vec<Segment> = [3.0, 0.0, 4.0, 1.0, 2.0, 1.5]
            .iter()
            .enumerate()
            .map(|(i, &y)| {
                let (a, b) = if i % 2 == 0 { (0.0, 2.0) } else { (2.0, 0.0) };
                Segment::new(vec![
                    Pose::from_xyz(a, y, 0.0),
                    Pose::from_xyz(1.0, y + 0.1, 0.0),
                    Pose::from_xyz(b, y, 0.0),
                ])
                .unwrap()
            })
            .collect();

        let ordered = sequence(&segments);
        assert_eq!(ordered.len(), segments.len());

        let mut input_keys: Vec<_> = segments.iter().map(content_key).collect();
        let mut output_keys: Vec<_> = ordered.iter().map(content_key).collect();
        input_keys.sort();
        output_keys.sort();
        assert_eq!(input_keys, output_keys);
    }

    #[test]
    fn output_lanes_ascend_in_y() {
        let segments: Vec<Segment> = [4.0, 1.0, 3.0, 0.0, 2.0]
            .iter()
            .map(|&y| line((0.0, y), (5.0, y)))
            .collect();
        let ordered = sequence(&segments);
        let ys: Vec<f64> = ordered.iter().map(|s| s.first().position().y).collect();
        assert_eq!(ys, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn zigzag_minimizes_travel() {
        let segments: Vec<Segment> = (0..4)
            .map(|i| line((0.0, f64::from(i)), (10.0, f64::from(i))))
            .collect();
        let ordered = sequence(&segments);
        for pair in ordered.windows(2) {
            let gap = pair[0].last().distance(pair[1].first());
            assert!((gap - 1.0).abs() < 1e-12, "gap = {gap}");
        }
    }
}
