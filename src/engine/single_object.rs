//! Whole-scene aggregation for scenes declared to contain one object.

use super::merge::merge_maxima;
use super::params::{HypothesisMergePolicy, SingleObjectWindow};
use crate::cluster::gaussian_kernel;
use crate::segment;
use crate::types::{BoundingBox, Vote, VotingMaximum};
use nalgebra::Point3;
use std::collections::BTreeMap;

/// Vote-based strategy: one maximum per class, placed at the scene centroid,
/// weighted by the kernel-weighted density of that class's votes within the
/// chosen search window.
pub(crate) fn compute_single_max_per_class(
    votes_by_class: &BTreeMap<u32, Vec<Vote>>,
    points: &[Point3<f32>],
    window: SingleObjectWindow,
    search_dist: impl Fn(u32) -> f32,
) -> Vec<VotingMaximum> {
    let query = segment::centroid(points);
    let model_radius = segment::max_distance_from(points, query);
    let scene_box = BoundingBox::enclosing(points);

    let mut maxima = Vec::new();
    for (&class_id, votes) in votes_by_class {
        let mut indices: Vec<usize> = Vec::new();
        let mut distances_sqr: Vec<f32> = Vec::new();
        let mut radius;

        match window {
            SingleObjectWindow::CompleteVotingSpace => {
                // use all votes; the window is the farthest vote distance
                let mut max_dist_sqr = 0.0f32;
                for (i, v) in votes.iter().enumerate() {
                    let d_sqr = (v.position - query).norm_squared();
                    max_dist_sqr = max_dist_sqr.max(d_sqr);
                    indices.push(i);
                    distances_sqr.push(d_sqr);
                }
                radius = max_dist_sqr.sqrt();
            }
            SingleObjectWindow::Bandwidth | SingleObjectWindow::ModelRadius => {
                radius = match window {
                    SingleObjectWindow::Bandwidth => search_dist(class_id),
                    _ => model_radius,
                };
                let r_sqr = radius * radius;
                for (i, v) in votes.iter().enumerate() {
                    let d_sqr = (v.position - query).norm_squared();
                    if d_sqr <= r_sqr {
                        indices.push(i);
                        distances_sqr.push(d_sqr);
                    }
                }
            }
        }
        if radius <= 0.0 {
            // all votes coincide with the centroid; any positive radius works
            radius = 1.0;
        }

        let mut density = 0.0f32;
        for (&idx, &d_sqr) in indices.iter().zip(distances_sqr.iter()) {
            density += gaussian_kernel(d_sqr, radius) * votes[idx].weight;
        }

        maxima.push(VotingMaximum {
            class_id,
            position: query,
            weight: density,
            vote_indices: indices,
            bounding_box: scene_box.clone(),
            ..Default::default()
        });
    }
    maxima
}

/// Maxima-based strategy: group already-discovered maxima by class, keep only
/// those inside the search window around the scene centroid (kernel-reweighted)
/// and merge each class's survivors into one.
///
/// The complete-voting-space window merges all maxima of a class
/// unconditionally, without reweighting.
pub(crate) fn merge_maxima_for_each_class(
    maxima: &[VotingMaximum],
    points: &[Point3<f32>],
    window: SingleObjectWindow,
    merge_policy: HypothesisMergePolicy,
    search_dist: impl Fn(u32) -> f32,
) -> Vec<VotingMaximum> {
    let query = segment::centroid(points);
    let model_radius = segment::max_distance_from(points, query);

    let mut used = vec![false; maxima.len()];
    let mut result = Vec::new();

    for i in 0..maxima.len() {
        if used[i] {
            continue;
        }
        let class_id = maxima[i].class_id;
        let radius = match window {
            SingleObjectWindow::CompleteVotingSpace => 0.0,
            SingleObjectWindow::Bandwidth => search_dist(class_id),
            SingleObjectWindow::ModelRadius => model_radius,
        };

        let mut class_maxima: Vec<VotingMaximum> = Vec::new();
        for j in i..maxima.len() {
            if used[j] || maxima[j].class_id != class_id {
                continue;
            }
            if window == SingleObjectWindow::CompleteVotingSpace {
                class_maxima.push(maxima[j].clone());
                used[j] = true;
            } else if (maxima[j].position - query).norm() < radius {
                let mut m = maxima[j].clone();
                m.weight = reweight_maximum(&m, query, radius);
                class_maxima.push(m);
                used[j] = true;
            }
        }
        // even outside the window the reference entry is spent
        used[i] = true;

        if !class_maxima.is_empty() {
            result.push(merge_maxima(&class_maxima, merge_policy));
        }
    }
    result
}

/// Kernel-discounted weight of a maximum relative to the query point.
pub(crate) fn reweight_maximum(
    maximum: &VotingMaximum,
    query: Point3<f32>,
    search_dist: f32,
) -> f32 {
    let d_sqr = (maximum.position - query).norm_squared();
    gaussian_kernel(d_sqr, search_dist) * maximum.weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use nalgebra::Point3;

    fn vote_at(x: f32, class_id: u32) -> Vote {
        Vote {
            position: Point3::new(x, 0.0, 0.0),
            weight: 1.0,
            class_id,
            keypoint: Point3::origin(),
            bounding_box: BoundingBox::default(),
            codeword_id: 0,
        }
    }

    fn max_at(x: f32, weight: f32, class_id: u32) -> VotingMaximum {
        VotingMaximum {
            class_id,
            position: Point3::new(x, 0.0, 0.0),
            weight,
            ..Default::default()
        }
    }

    #[test]
    fn one_maximum_per_class_in_complete_window() {
        let mut votes = BTreeMap::new();
        votes.insert(0u32, vec![vote_at(0.0, 0), vote_at(0.1, 0)]);
        votes.insert(1u32, vec![vote_at(5.0, 1)]);
        let points = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let maxima = compute_single_max_per_class(
            &votes,
            &points,
            SingleObjectWindow::CompleteVotingSpace,
            |_| 1.0,
        );
        assert_eq!(maxima.len(), 2);
        assert!(maxima.iter().all(|m| m.weight > 0.0));
    }

    #[test]
    fn bandwidth_window_excludes_distant_votes() {
        let mut votes = BTreeMap::new();
        votes.insert(0u32, vec![vote_at(0.0, 0), vote_at(100.0, 0)]);
        let points = vec![Point3::origin()];
        let maxima =
            compute_single_max_per_class(&votes, &points, SingleObjectWindow::Bandwidth, |_| 1.0);
        assert_eq!(maxima.len(), 1);
        assert_eq!(
            maxima[0].vote_indices,
            vec![0],
            "distant vote must fall outside the bandwidth window"
        );
    }

    #[test]
    fn complete_window_merges_all_maxima_of_a_class() {
        let maxima = vec![max_at(0.0, 1.0, 0), max_at(3.0, 2.0, 0), max_at(1.0, 1.0, 1)];
        let points = vec![Point3::origin()];
        let merged = merge_maxima_for_each_class(
            &maxima,
            &points,
            SingleObjectWindow::CompleteVotingSpace,
            Default::default(),
            |_| 1.0,
        );
        assert_eq!(merged.len(), 2, "one merged maximum per class expected");
        let class0 = merged.iter().find(|m| m.class_id == 0).unwrap();
        assert!((class0.weight - 3.0).abs() < 1e-6);
    }

    #[test]
    fn windowed_merge_reweights_by_kernel() {
        let maxima = vec![max_at(0.0, 1.0, 0)];
        let points = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)];
        // centroid is the origin; maximum sits exactly on it, kernel = 1
        let merged = merge_maxima_for_each_class(
            &maxima,
            &points,
            SingleObjectWindow::Bandwidth,
            Default::default(),
            |_| 2.0,
        );
        assert_eq!(merged.len(), 1);
        assert!((merged[0].weight - 1.0).abs() < 1e-6);
    }
}
