//! Orientation averaging.
//!
//! The average of a set of unit quaternions `q_i` is taken as the
//! eigenvector of `M = sum(q_i * q_i^T)` with the largest eigenvalue
//! (Markley et al., "Averaging Quaternions", 2007). Because `q` and `-q`
//! contribute the same outer product, the method is insensitive to the
//! sign of each input; the sign of the result is arbitrary.
//!
//! # Limitations
//!
//! When the largest eigenvalue is repeated, any vector in its eigenspace
//! is an equally valid answer and the one returned is whatever the
//! eigen-solver produces. Rotations spread evenly through rotation space
//! yield a well-defined but meaningless average. Neither case is
//! detected.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion};

use crate::types::Segment;

/// Least-squares average of a set of rotations.
///
/// Returns `None` for an empty slice. A single rotation is returned
/// unchanged up to sign.
#[must_use]
pub fn average_orientation(rotations: &[UnitQuaternion<f64>]) -> Option<UnitQuaternion<f64>> {
    if rotations.is_empty() {
        return None;
    }

    let mut scatter = Matrix4::<f64>::zeros();
    for rotation in rotations {
        let coeffs = rotation.quaternion().coords;
        scatter += coeffs * coeffs.transpose();
    }

    let eigen = scatter.symmetric_eigen();

    // Strictly-greater scan: the first of several equal maxima wins.
    let mut best = 0;
    let mut best_value = 0.0;
    for (i, &value) in eigen.eigenvalues.iter().enumerate() {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }

    let coeffs = eigen.eigenvectors.column(best).into_owned();
    Some(UnitQuaternion::new_normalize(Quaternion::from_vector(coeffs)))
}

/// Average orientation over every pose of a segment.
#[must_use]
pub fn average_segment_orientation(segment: &Segment) -> UnitQuaternion<f64> {
    let rotations: Vec<UnitQuaternion<f64>> =
        segment.poses().iter().map(|pose| pose.orientation()).collect();
    // Segments are never empty, so the fallback is unreachable.
    average_orientation(&rotations).unwrap_or_else(UnitQuaternion::identity)
}
