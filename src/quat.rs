//! Weighted quaternion averaging.
//!
//! A weighted mean of rotations is not a linear combination of quaternion
//! components: `q` and `-q` encode the same rotation, so antipodal inputs
//! cancel under naive summation. Inputs are sign-aligned to a common
//! hemisphere first, then the average is taken as the principal eigenvector
//! of the weighted outer-product matrix `Σ wᵢ qᵢ qᵢᵀ`.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector4};

/// Weighted average of unit quaternions. Weights need not be normalized.
///
/// Degenerate input (empty lists, all-zero weights) yields the identity
/// rotation. The shorter of the two input slices bounds the accumulation.
pub fn weighted_average(quats: &[UnitQuaternion<f32>], weights: &[f32]) -> UnitQuaternion<f32> {
    if quats.is_empty() || weights.is_empty() {
        return UnitQuaternion::identity();
    }

    let reference = quats[0].quaternion().coords;
    let mut accu = Matrix4::<f32>::zeros();
    let mut total = 0.0f32;

    for (q, &w) in quats.iter().zip(weights.iter()) {
        if w <= 0.0 {
            continue;
        }
        let mut v: Vector4<f32> = q.quaternion().coords;
        // flip into the reference hemisphere to avoid antipodal cancellation
        if v.dot(&reference) < 0.0 {
            v = -v;
        }
        accu += w * (v * v.transpose());
        total += w;
    }

    if total <= 0.0 {
        return UnitQuaternion::identity();
    }

    let eig = accu.symmetric_eigen();
    let mut best = 0;
    for i in 1..4 {
        if eig.eigenvalues[i] > eig.eigenvalues[best] {
            best = i;
        }
    }
    let v = eig.eigenvectors.column(best).into_owned();
    if v.norm() <= f32::EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::new_normalize(Quaternion::from_vector(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::f32::consts::FRAC_PI_2;

    fn angle_between(a: &UnitQuaternion<f32>, b: &UnitQuaternion<f32>) -> f32 {
        a.angle_to(b)
    }

    #[test]
    fn average_of_identical_rotations_is_that_rotation() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let avg = weighted_average(&[q, q, q], &[1.0, 2.0, 0.5]);
        assert!(
            angle_between(&avg, &q) < 1e-4,
            "average drifted by {} rad",
            angle_between(&avg, &q)
        );
    }

    #[test]
    fn antipodal_representations_do_not_cancel() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.2);
        let flipped = UnitQuaternion::new_unchecked(-q.quaternion());
        let avg = weighted_average(&[q, flipped], &[1.0, 1.0]);
        assert!(
            angle_between(&avg, &q) < 1e-4,
            "sign alignment failed, off by {} rad",
            angle_between(&avg, &q)
        );
    }

    #[test]
    fn weighted_average_leans_toward_heavier_rotation() {
        let a = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.0);
        let b = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let avg = weighted_average(&[a, b], &[3.0, 1.0]);
        let to_a = angle_between(&avg, &a);
        let to_b = angle_between(&avg, &b);
        assert!(
            to_a < to_b,
            "expected bias toward the heavier input: to_a={to_a}, to_b={to_b}"
        );
    }

    #[test]
    fn degenerate_input_yields_identity() {
        assert_eq!(weighted_average(&[], &[]), UnitQuaternion::identity());
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.4);
        assert_eq!(
            weighted_average(&[q], &[0.0]),
            UnitQuaternion::identity(),
            "all-zero weights must not divide by zero"
        );
    }
}
