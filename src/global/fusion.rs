//! Scene-wide blending of global classification into maxima weights.
//!
//! All policies expect the maxima list sorted by weight descending; callers
//! re-sort and renormalize afterwards because weights may have changed.

use crate::engine::GlobalFusionPolicy;
use crate::types::VotingMaximum;
use log::debug;

/// Knobs shared by the fusion policies.
#[derive(Clone, Copy, Debug)]
pub struct FusionParams {
    /// Score gate for [`GlobalFusionPolicy::BlindOverride`] and
    /// [`GlobalFusionPolicy::ThresholdedOverride`].
    pub min_score: f32,
    /// Fraction of the top weight required to take part in the ranked scan.
    pub rate_limit: f32,
    /// Factor for [`GlobalFusionPolicy::FixedUpweight`].
    pub weight_factor: f32,
}

/// Applies the selected policy in place.
pub fn apply(policy: GlobalFusionPolicy, maxima: &mut [VotingMaximum], params: FusionParams) {
    if maxima.is_empty() {
        return;
    }
    match policy {
        GlobalFusionPolicy::BlindOverride => {
            if maxima[0].global_hypothesis.score > params.min_score {
                maxima[0].class_id = maxima[0].global_hypothesis.class_id;
            }
        }
        GlobalFusionPolicy::ThresholdedOverride => {
            if maxima[0].global_hypothesis.score > params.min_score {
                override_if_global_class_ranked(maxima, params.rate_limit);
            }
        }
        GlobalFusionPolicy::RankedOverride => {
            override_if_global_class_ranked(maxima, params.rate_limit);
        }
        GlobalFusionPolicy::FixedUpweight => {
            for max in maxima.iter_mut() {
                if max.class_id == max.global_hypothesis.class_id {
                    max.weight *= params.weight_factor;
                }
            }
        }
        GlobalFusionPolicy::ScoreUpweight => {
            for max in maxima.iter_mut() {
                if max.class_id == max.global_hypothesis.class_id {
                    max.weight *= 1.0 + max.global_hypothesis.score;
                }
            }
        }
        GlobalFusionPolicy::ProbabilisticOr => {
            // treat local and global evidence as independent probabilities
            for max in maxima.iter_mut() {
                let w = max.weight;
                let g = max.global_hypothesis.score;
                max.weight = w + g - w * g;
            }
        }
    }
}

/// Shared scan of the override policies: walk maxima in descending weight
/// order and force the top maximum to the global class as soon as that class
/// appears with a weight of at least `rate_limit` times the top weight. The
/// scan stops at the first maximum below the rate limit.
fn override_if_global_class_ranked(maxima: &mut [VotingMaximum], rate_limit: f32) -> bool {
    let top_weight = maxima[0].weight;
    let global_class = maxima[0].global_hypothesis.class_id;

    for i in 0..maxima.len() {
        let cur_weight = maxima[i].weight;
        if cur_weight < top_weight * rate_limit {
            break;
        }
        if maxima[i].class_id == global_class {
            debug!(
                "global fusion: overriding top class {} with global class {global_class}",
                maxima[0].class_id
            );
            maxima[0].class_id = global_class;
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hypothesis;

    const PARAMS: FusionParams = FusionParams {
        min_score: 0.70,
        rate_limit: 0.60,
        weight_factor: 1.5,
    };

    fn max(class_id: u32, weight: f32, global: Hypothesis) -> VotingMaximum {
        VotingMaximum {
            class_id,
            weight,
            global_hypothesis: global,
            ..Default::default()
        }
    }

    #[test]
    fn blind_override_respects_score_gate() {
        let mut low = vec![max(0, 1.0, Hypothesis::new(3, 0.5))];
        apply(GlobalFusionPolicy::BlindOverride, &mut low, PARAMS);
        assert_eq!(low[0].class_id, 0, "score below gate must not override");

        let mut high = vec![max(0, 1.0, Hypothesis::new(3, 0.9))];
        apply(GlobalFusionPolicy::BlindOverride, &mut high, PARAMS);
        assert_eq!(high[0].class_id, 3);
    }

    #[test]
    fn ranked_override_needs_global_class_among_top() {
        // global class 2 sits second with 0.8 of the top weight
        let mut maxima = vec![
            max(0, 1.0, Hypothesis::new(2, 0.2)),
            max(2, 0.8, Hypothesis::new(2, 0.2)),
        ];
        apply(GlobalFusionPolicy::RankedOverride, &mut maxima, PARAMS);
        assert_eq!(maxima[0].class_id, 2);

        // same constellation but the candidate falls below the rate limit
        let mut below = vec![
            max(0, 1.0, Hypothesis::new(2, 0.2)),
            max(2, 0.5, Hypothesis::new(2, 0.2)),
        ];
        apply(GlobalFusionPolicy::RankedOverride, &mut below, PARAMS);
        assert_eq!(below[0].class_id, 0, "scan must stop at the rate limit");
    }

    #[test]
    fn thresholded_override_requires_both_conditions() {
        let mut maxima = vec![
            max(0, 1.0, Hypothesis::new(2, 0.5)),
            max(2, 0.8, Hypothesis::new(2, 0.5)),
        ];
        apply(GlobalFusionPolicy::ThresholdedOverride, &mut maxima, PARAMS);
        assert_eq!(maxima[0].class_id, 0, "score gate failed, no override");

        maxima[0].global_hypothesis.score = 0.9;
        apply(GlobalFusionPolicy::ThresholdedOverride, &mut maxima, PARAMS);
        assert_eq!(maxima[0].class_id, 2);
    }

    #[test]
    fn fixed_and_score_upweight_only_touch_consistent_maxima() {
        let mut maxima = vec![
            max(1, 1.0, Hypothesis::new(1, 0.5)),
            max(0, 1.0, Hypothesis::new(1, 0.5)),
        ];
        apply(GlobalFusionPolicy::FixedUpweight, &mut maxima, PARAMS);
        assert!((maxima[0].weight - 1.5).abs() < 1e-6);
        assert!((maxima[1].weight - 1.0).abs() < 1e-6);

        let mut maxima = vec![max(1, 1.0, Hypothesis::new(1, 0.25))];
        apply(GlobalFusionPolicy::ScoreUpweight, &mut maxima, PARAMS);
        assert!((maxima[0].weight - 1.25).abs() < 1e-6);
    }

    #[test]
    fn probabilistic_or_matches_t_conorm() {
        let mut maxima = vec![max(0, 0.6, Hypothesis::new(0, 0.5))];
        apply(GlobalFusionPolicy::ProbabilisticOr, &mut maxima, PARAMS);
        assert!(
            (maxima[0].weight - 0.8).abs() < 1e-6,
            "0.6 + 0.5 - 0.3 must be 0.8, got {}",
            maxima[0].weight
        );
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut maxima: Vec<VotingMaximum> = Vec::new();
        apply(GlobalFusionPolicy::BlindOverride, &mut maxima, PARAMS);
    }
}
