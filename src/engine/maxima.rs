//! Turning discovered clusters into voting maxima.

use crate::quat;
use crate::types::{Vote, VotingMaximum};
use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Builds a maximum from one cluster, aggregating member bounding boxes.
///
/// Box sizes are averaged with the kernel-discounted member weights
/// (renormalized to sum to one); orientation is the weighted quaternion
/// average when `average_rotation` is set. Returns `None` for empty clusters.
pub(crate) fn build_maximum(
    class_id: u32,
    center: Point3<f32>,
    cluster_weight: f32,
    vote_indices: &[usize],
    reweighted: &[f32],
    votes: &[Vote],
    average_rotation: bool,
) -> Option<VotingMaximum> {
    if vote_indices.is_empty() {
        return None;
    }

    let mut quats: Vec<UnitQuaternion<f32>> = Vec::with_capacity(vote_indices.len());
    let mut weights: Vec<f32> = Vec::with_capacity(vote_indices.len());
    let mut size = Vector3::zeros();
    let mut total = 0.0f32;

    for (&idx, &w) in vote_indices.iter().zip(reweighted.iter()) {
        let vote = &votes[idx];
        quats.push(vote.bounding_box.orientation);
        weights.push(w);
        size += w * vote.bounding_box.size;
        total += w;
    }

    if total <= 0.0 {
        return None;
    }
    for w in &mut weights {
        *w /= total;
    }

    let mut maximum = VotingMaximum {
        class_id,
        position: center,
        weight: cluster_weight,
        vote_indices: vote_indices.to_vec(),
        ..Default::default()
    };
    maximum.bounding_box.position = center;
    maximum.bounding_box.size = size / total;
    if average_rotation {
        maximum.bounding_box.orientation = quat::weighted_average(&quats, &weights);
    }
    Some(maximum)
}
