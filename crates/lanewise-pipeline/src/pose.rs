//! Oriented sample poses and the rigid-body operations the pipeline needs.
//!
//! A [`Pose`] is a position plus a unit-quaternion orientation. The
//! sequencer and the margin trimmer only ever need a small set of
//! operations on poses: composition, inversion, position interpolation,
//! and a half-turn about the pose's own normal. Those live here as free
//! functions so the algorithms never touch rotation matrices directly.
//!
//! Poses serialize as `{"position": [x, y, z], "orientation": [x, y, z, w]}`.
//! The quaternion component order matches the common `(x, y, z, w)`
//! convention used by robotics message formats.

use std::f64::consts::PI;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Quaternions with a norm at or below this are rejected on deserialization.
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// A single oriented sample: position plus unit-quaternion rotation.
///
/// Immutable value type. The orientation's local Z axis is the surface
/// normal (tool approach axis) at the sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRecord", into = "PoseRecord")]
pub struct Pose {
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Create a pose from a position and an orientation.
    #[must_use]
    pub const fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Create a pose at `(x, y, z)` with the identity orientation.
    #[must_use]
    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// A pure rotation: zero translation, the given orientation.
    #[must_use]
    pub fn from_rotation(orientation: UnitQuaternion<f64>) -> Self {
        Self::new(Vector3::zeros(), orientation)
    }

    /// The sample position.
    #[must_use]
    pub const fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// The sample orientation.
    #[must_use]
    pub const fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Squared Euclidean distance between the two positions.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        (self.position - other.position).norm_squared()
    }

    /// Euclidean distance between the two positions.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.position - other.position).norm()
    }
}

/// Compose two poses: `outer * inner`.
///
/// The result expresses `inner` (given relative to `outer`) in the frame
/// `outer` is expressed in.
#[must_use]
pub fn compose(outer: &Pose, inner: &Pose) -> Pose {
    Pose {
        position: outer.position + outer.orientation * inner.position,
        orientation: outer.orientation * inner.orientation,
    }
}

/// Invert a pose so that `compose(&invert(p), &p)` is the identity.
#[must_use]
pub fn invert(pose: &Pose) -> Pose {
    let inverse = pose.orientation.inverse();
    Pose {
        position: -(inverse * pose.position),
        orientation: inverse,
    }
}

/// Walk `distance` from `from` in the direction of `toward`.
///
/// When the two positions coincide there is no direction to walk in, and
/// `from` is returned unchanged.
#[must_use]
pub fn interpolate_position(from: Vector3<f64>, toward: Vector3<f64>, distance: f64) -> Vector3<f64> {
    let delta = toward - from;
    let length = delta.norm();
    if length == 0.0 {
        return from;
    }
    from + delta * (distance / length)
}

/// Rotate a pose by 180 degrees about its own local Z (normal) axis.
///
/// Position is unchanged. Used when a segment is traversed backwards so
/// the tool keeps a consistent heading relative to the travel direction.
#[must_use]
pub fn flip_about_normal(pose: &Pose) -> Pose {
    let half_turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI);
    compose(pose, &Pose::from_rotation(half_turn))
}

/// Serde representation of a [`Pose`].
#[derive(Serialize, Deserialize)]
struct PoseRecord {
    position: [f64; 3],
    /// `(x, y, z, w)`.
    orientation: [f64; 4],
}

impl From<Pose> for PoseRecord {
    fn from(pose: Pose) -> Self {
        let q = pose.orientation.quaternion();
        Self {
            position: [pose.position.x, pose.position.y, pose.position.z],
            orientation: [q.i, q.j, q.k, q.w],
        }
    }
}

impl TryFrom<PoseRecord> for Pose {
    type Error = PipelineError;

    fn try_from(record: PoseRecord) -> Result<Self, Self::Error> {
        let [x, y, z, w] = record.orientation;
        let orientation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), MIN_QUATERNION_NORM)
            .ok_or(PipelineError::DegenerateOrientation)?;
        let [px, py, pz] = record.position;
        Ok(Self::new(Vector3::new(px, py, pz), orientation))
    }
}
