//! Reference frame selection and endpoint projection.
//!
//! Raster passes over a surface run roughly parallel to one another. The
//! pass with the greatest endpoint-to-endpoint displacement is taken as
//! representative of the nominal cut direction, and the average
//! orientation of its poses becomes the reference frame. In that frame
//! passes run along X and are stacked along Y (the lateral axis), which
//! is what the sequencer sorts on.

use log::debug;
use nalgebra::{UnitQuaternion, Vector3};

use crate::average::average_segment_orientation;
use crate::pose::{Pose, compose, invert};
use crate::types::Segment;

/// The reference rotation lanes are ordered in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    /// Rotation of the reference frame relative to the ambient frame.
    pub rotation: UnitQuaternion<f64>,
    /// Index of the segment the frame was derived from.
    pub longest: usize,
}

/// Endpoint positions of one segment, expressed in the reference frame.
///
/// `a` and `b` are the segment's first and last positions; the labels
/// identify the two ends and say nothing about their spatial layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointRecord {
    /// First pose position, in the reference frame.
    pub a: Vector3<f64>,
    /// Last pose position, in the reference frame.
    pub b: Vector3<f64>,
    /// Index of the source segment in the sequencer input.
    pub source: usize,
}

impl EndpointRecord {
    /// Lowest lateral (Y) coordinate of the two endpoints.
    #[must_use]
    pub fn lateral(&self) -> f64 {
        self.a.y.min(self.b.y)
    }
}

/// Index of the segment with the largest first-to-last displacement.
///
/// Ties go to the earliest segment. Returns `None` for empty input.
#[must_use]
pub fn longest_segment(segments: &[Segment]) -> Option<usize> {
    if segments.is_empty() {
        return None;
    }

    let mut max_index = 0;
    let mut max_dist = 0.0;
    for (i, segment) in segments.iter().enumerate() {
        let dist = segment.first().distance_squared(segment.last());
        if dist > max_dist {
            max_index = i;
            max_dist = dist;
        }
    }
    Some(max_index)
}

/// Build the reference frame from the longest segment's average orientation.
///
/// Returns `None` for empty input.
#[must_use]
pub fn reference_frame(segments: &[Segment]) -> Option<ReferenceFrame> {
    let longest = longest_segment(segments)?;
    let rotation = average_segment_orientation(&segments[longest]);
    debug!(
        "reference frame from segment {longest} ({} poses): {:?}",
        segments[longest].len(),
        rotation.euler_angles(),
    );
    Some(ReferenceFrame { rotation, longest })
}

/// Express every segment's endpoints in `frame`.
///
/// Only positions are changed; this is a pure change of basis by the
/// inverse reference rotation. One record per segment, with `source`
/// set to the segment's index in `segments`.
#[must_use]
pub fn project_endpoints(segments: &[Segment], frame: &ReferenceFrame) -> Vec<EndpointRecord> {
    let to_frame = invert(&Pose::from_rotation(frame.rotation));
    segments
        .iter()
        .enumerate()
        .map(|(source, segment)| EndpointRecord {
            a: compose(&to_frame, segment.first()).position(),
            b: compose(&to_frame, segment.last()).position(),
            source,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    fn line(from: (f64, f64), to: (f64, f64)) -> Segment {
        Segment::new(vec![
            Pose::from_xyz(from.0, from.1, 0.0),
            Pose::from_xyz(to.0, to.1, 0.0),
        ])
        .unwrap()
    }

    fn rotated_line(from: (f64, f64), to: (f64, f64), rotation: UnitQuaternion<f64>) -> Segment {
        Segment::new(vec![
            Pose::new(Vector3::new(from.0, from.1, 0.0), rotation),
            Pose::new(Vector3::new(to.0, to.1, 0.0), rotation),
        ])
        .unwrap()
    }

    // --- longest_segment ---

    #[test]
    fn longest_of_empty_is_none() {
        assert_eq!(longest_segment(&[]), None);
        assert!(reference_frame(&[]).is_none());
    }

    #[test]
    fn longest_picks_largest_displacement() {
        let segments = [
            line((0.0, 0.0), (1.0, 0.0)),
            line((0.0, 1.0), (5.0, 1.0)),
            line((0.0, 2.0), (2.0, 2.0)),
        ];
        assert_eq!(longest_segment(&segments), Some(1));
    }

    #[test]
    fn longest_tie_goes_to_first() {
        let segments = [
            line((0.0, 0.0), (1.0, 0.0)),
            line((0.0, 1.0), (1.0, 1.0)),
            line((0.0, 2.0), (1.0, 2.0)),
        ];
        assert_eq!(longest_segment(&segments), Some(0));
    }

    #[test]
    fn longest_uses_displacement_not_arc_length() {
        // A U-turn has a long path but short endpoint displacement.
        let u_turn = Segment::new(vec![
            Pose::from_xyz(0.0, 0.0, 0.0),
            Pose::from_xyz(10.0, 0.0, 0.0),
            Pose::from_xyz(10.0, 1.0, 0.0),
            Pose::from_xyz(0.0, 1.0, 0.0),
        ])
        .unwrap();
        let segments = [u_turn, line((0.0, 5.0), (3.0, 5.0))];
        assert_eq!(longest_segment(&segments), Some(1));
    }

    #[test]
    fn all_single_pose_segments_pick_first() {
        let segments = [
            Segment::new(vec![Pose::from_xyz(1.0, 0.0, 0.0)]).unwrap(),
            Segment::new(vec![Pose::from_xyz(2.0, 0.0, 0.0)]).unwrap(),
        ];
        assert_eq!(longest_segment(&segments), Some(0));
    }

    // --- reference_frame ---

    #[test]
    fn identity_poses_give_identity_frame() {
        let segments = [line((0.0, 0.0), (1.0, 0.0)), line((0.0, 1.0), (1.0, 1.0))];
        let frame = reference_frame(&segments).unwrap();
        assert_eq!(frame.longest, 0);
        assert!(frame.rotation.angle() < 1e-6);
    }

    #[test]
    fn frame_follows_longest_segment_orientation() {
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let segments = [
            line((0.0, 0.0), (1.0, 0.0)),
            rotated_line((0.0, 0.0), (0.0, 4.0), turn),
        ];
        let frame = reference_frame(&segments).unwrap();
        assert_eq!(frame.longest, 1);
        assert!(frame.rotation.angle_to(&turn) < 1e-6);
    }

    // --- project_endpoints ---

    #[test]
    fn identity_frame_keeps_positions() {
        let segments = [line((0.0, 0.0), (1.0, 0.0)), line((0.0, 1.0), (1.0, 1.0))];
        let frame = ReferenceFrame {
            rotation: UnitQuaternion::identity(),
            longest: 0,
        };
        let records = project_endpoints(&segments, &frame);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].source, 1);
        assert_relative_eq!(records[1].a, Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(records[1].b, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn rotated_frame_maps_paths_onto_x() {
        // Paths run along world Y; the reference frame is a quarter turn
        // about Z, so in that frame they run along X and stack along -Y.
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let segments = [
            rotated_line((0.0, 0.0), (0.0, 1.0), turn),
            rotated_line((2.0, 0.0), (2.0, 1.0), turn),
        ];
        let frame = ReferenceFrame {
            rotation: turn,
            longest: 0,
        };
        let records = project_endpoints(&segments, &frame);
        assert_relative_eq!(records[0].b, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(records[1].a, Vector3::new(0.0, -2.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(records[1].b, Vector3::new(1.0, -2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn lateral_is_minimum_y() {
        let record = EndpointRecord {
            a: Vector3::new(0.0, 3.0, 0.0),
            b: Vector3::new(1.0, 2.5, 0.0),
            source: 0,
        };
        assert!((record.lateral() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn every_source_index_appears_once() {
        let segments: Vec<Segment> = (0..7)
            .map(|i| line((0.0, f64::from(i)), (1.0, f64::from(i))))
            .collect();
        let frame = reference_frame(&segments).unwrap();
        let mut sources: Vec<usize> = project_endpoints(&segments, &frame)
            .iter()
            .map(|r| r.source)
            .collect();
        sources.sort_unstable();
        assert_eq!(sources, (0..7).collect::<Vec<_>>());
    }
}
