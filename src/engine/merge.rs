//! Merging maxima into a single combined detection.

use super::params::HypothesisMergePolicy;
use crate::quat;
use crate::types::VotingMaximum;
use nalgebra::Point3;

/// Folds a list of maxima left-to-right into one.
///
/// Position and box size become running weighted averages, orientation is
/// blended pairwise via weighted quaternion averaging, vote-index support
/// lists are concatenated and the weight is the plain sum. The class id is
/// taken from the last entry; callers group by class before merging.
///
/// Hypothesis propagation follows `policy`; the default keeps the last
/// entry's hypotheses, which is an approximation rather than an average.
pub fn merge_maxima(list: &[VotingMaximum], policy: HypothesisMergePolicy) -> VotingMaximum {
    let mut result = VotingMaximum::default();

    for m in list {
        let total = result.weight + m.weight;
        // position and bounding box must be updated before the weight
        if total > 0.0 {
            result.position = Point3::from(
                (result.position.coords * result.weight + m.position.coords * m.weight) / total,
            );
            result.bounding_box.size =
                (result.bounding_box.size * result.weight + m.bounding_box.size * m.weight) / total;
        } else {
            result.position = m.position;
            result.bounding_box.size = m.bounding_box.size;
        }
        result.bounding_box.position = result.position;
        result.bounding_box.orientation = quat::weighted_average(
            &[result.bounding_box.orientation, m.bounding_box.orientation],
            &[result.weight, m.weight],
        );

        result.class_id = m.class_id;
        result.weight += m.weight;
        result.vote_indices.extend_from_slice(&m.vote_indices);

        if policy == HypothesisMergePolicy::LastMerged {
            result.global_hypothesis = m.global_hypothesis;
            result.current_class_hypothesis = m.current_class_hypothesis;
        }
    }

    if policy == HypothesisMergePolicy::HighestWeight {
        if let Some(best) = list
            .iter()
            .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap_or(std::cmp::Ordering::Equal))
        {
            result.global_hypothesis = best.global_hypothesis;
            result.current_class_hypothesis = best.current_class_hypothesis;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hypothesis;

    fn max_at(x: f32, weight: f32, class_id: u32) -> VotingMaximum {
        VotingMaximum {
            class_id,
            position: Point3::new(x, 0.0, 0.0),
            weight,
            vote_indices: vec![0],
            ..Default::default()
        }
    }

    #[test]
    fn merged_weight_is_sum_regardless_of_order() {
        let a = max_at(0.0, 1.0, 1);
        let b = max_at(2.0, 3.0, 1);
        let c = max_at(4.0, 2.0, 1);
        let fwd = merge_maxima(&[a.clone(), b.clone(), c.clone()], Default::default());
        let rev = merge_maxima(&[c, b, a], Default::default());
        assert!((fwd.weight - 6.0).abs() < 1e-6);
        assert!((rev.weight - 6.0).abs() < 1e-6);
    }

    #[test]
    fn merged_position_is_weighted_average() {
        let merged = merge_maxima(
            &[max_at(0.0, 1.0, 1), max_at(4.0, 3.0, 1)],
            Default::default(),
        );
        assert!((merged.position.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn support_lists_concatenate() {
        let mut a = max_at(0.0, 1.0, 1);
        a.vote_indices = vec![0, 1];
        let mut b = max_at(1.0, 1.0, 1);
        b.vote_indices = vec![2];
        let merged = merge_maxima(&[a, b], Default::default());
        assert_eq!(merged.vote_indices, vec![0, 1, 2]);
    }

    #[test]
    fn hypothesis_policy_last_vs_highest() {
        let mut light = max_at(0.0, 1.0, 1);
        light.global_hypothesis = Hypothesis::new(5, 0.9);
        let mut heavy = max_at(1.0, 10.0, 1);
        heavy.global_hypothesis = Hypothesis::new(7, 0.4);

        let last = merge_maxima(
            &[heavy.clone(), light.clone()],
            HypothesisMergePolicy::LastMerged,
        );
        assert_eq!(last.global_hypothesis.class_id, 5, "last entry must win");

        let highest = merge_maxima(&[heavy, light], HypothesisMergePolicy::HighestWeight);
        assert_eq!(
            highest.global_hypothesis.class_id, 7,
            "heaviest entry must win"
        );
    }
}
