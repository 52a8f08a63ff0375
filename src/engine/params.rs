//! Parameter types configuring the voting engine.
//!
//! This module groups knobs for maxima thresholds, the class-adaptive search
//! radius, the merge/filter policies, single-object strategies and the
//! global-feature fusion stage.
//!
//! Defaults mirror a conservative detection setup: no filtering, no global
//! features, adaptive behaviour opt-in.

use serde::Deserialize;

/// How the per-class search radius (bandwidth) is derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum RadiusType {
    /// Use the configured fixed radius for every class.
    #[default]
    Config,
    /// Mean half-extent of the largest training bounding-box axis, scaled.
    FirstDim,
    /// Mean half-extent of the second-largest axis, scaled.
    SecondDim,
}

/// Cross-class maxima filtering applied outside single-object mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum MaxFilterType {
    #[default]
    None,
    /// Keep only the highest-weight maximum among proximate competitors.
    Simple,
    /// Merge same-class competitors first, then keep the highest weight.
    Merge,
}

/// Whole-scene aggregation strategy for scenes known to contain one object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum SingleObjectMaxType {
    #[default]
    None,
    /// Vote-based density over the complete voting space.
    VotingSpaceVotes,
    /// Vote-based density within the class-adaptive bandwidth.
    BandwidthVotes,
    /// Vote-based density within the scene's farthest-point radius.
    ModelRadiusVotes,
    /// Merge discovered maxima per class, unconditionally.
    VotingSpaceMaxima,
    /// Merge discovered maxima per class within the bandwidth window.
    BandwidthMaxima,
    /// Merge discovered maxima per class within the scene radius window.
    ModelRadiusMaxima,
}

impl SingleObjectMaxType {
    /// True for the vote-based strategy family.
    pub fn is_vote_based(self) -> bool {
        matches!(
            self,
            Self::VotingSpaceVotes | Self::BandwidthVotes | Self::ModelRadiusVotes
        )
    }

    /// True for the maxima-based strategy family.
    pub fn is_maxima_based(self) -> bool {
        matches!(
            self,
            Self::VotingSpaceMaxima | Self::BandwidthMaxima | Self::ModelRadiusMaxima
        )
    }
}

/// Search window used by the single-object strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SingleObjectWindow {
    /// All votes/maxima regardless of distance.
    CompleteVotingSpace,
    /// Class-adaptive bandwidth around the scene centroid.
    Bandwidth,
    /// Farthest-point-from-centroid radius of the input cloud.
    ModelRadius,
}

impl SingleObjectMaxType {
    pub(crate) fn window(self) -> Option<SingleObjectWindow> {
        match self {
            Self::None => None,
            Self::VotingSpaceVotes | Self::VotingSpaceMaxima => {
                Some(SingleObjectWindow::CompleteVotingSpace)
            }
            Self::BandwidthVotes | Self::BandwidthMaxima => Some(SingleObjectWindow::Bandwidth),
            Self::ModelRadiusVotes | Self::ModelRadiusMaxima => {
                Some(SingleObjectWindow::ModelRadius)
            }
        }
    }
}

#[cfg(test)]
mod single_object_tests {
    use super::*;

    #[test]
    fn every_strategy_belongs_to_exactly_one_family() {
        let all = [
            SingleObjectMaxType::None,
            SingleObjectMaxType::VotingSpaceVotes,
            SingleObjectMaxType::BandwidthVotes,
            SingleObjectMaxType::ModelRadiusVotes,
            SingleObjectMaxType::VotingSpaceMaxima,
            SingleObjectMaxType::BandwidthMaxima,
            SingleObjectMaxType::ModelRadiusMaxima,
        ];
        for strategy in all {
            assert!(
                !(strategy.is_vote_based() && strategy.is_maxima_based()),
                "{strategy:?} claims both families"
            );
            assert_eq!(
                strategy.window().is_some(),
                strategy.is_vote_based() || strategy.is_maxima_based(),
                "{strategy:?} window/family mismatch"
            );
        }
    }
}

/// Whole-object classification method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum GlobalFeatureMethod {
    /// Nearest-neighbour voting over the training feature index.
    #[default]
    Knn,
    /// One-vs-all support-vector-machine prediction.
    Svm,
}

/// Distance used by the nearest-neighbour feature index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    ChiSquared,
    Hellinger,
    HistIntersection,
}

/// Scene-wide blending of global classification into maxima weights.
///
/// Policies assume a weight-descending maxima list and run after the first
/// normalization pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum GlobalFusionPolicy {
    /// Force the top maximum to the global class whenever the global score
    /// clears `min_score`.
    BlindOverride,
    /// As `BlindOverride`, but only when the global class also ranks among
    /// the top maxima (rate-limited scan).
    ThresholdedOverride,
    /// Rate-limited scan alone decides, regardless of score.
    #[default]
    RankedOverride,
    /// Multiply consistent maxima weights by a fixed factor.
    FixedUpweight,
    /// Multiply consistent maxima weights by `1 + global score`.
    ScoreUpweight,
    /// Probabilistic OR: `w + g - w*g` for every maximum.
    ProbabilisticOr,
}

/// How hypotheses propagate when maxima are merged.
///
/// The historical behaviour keeps whatever the last merged entry carried;
/// it is an approximation, not an aggregate, and therefore overridable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum HypothesisMergePolicy {
    /// Take both hypotheses from the last entry folded in.
    #[default]
    LastMerged,
    /// Take both hypotheses from the highest-weight input.
    HighestWeight,
}

/// Engine-wide parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VotingParams {
    /// Minimum cluster weight for a maximum to survive.
    pub min_threshold: f32,
    /// Minimum supporting-vote count for a maximum to survive.
    pub min_votes_threshold: usize,
    /// Keep only the K best maxima after normalization, if set.
    pub best_k: Option<usize>,
    /// Enables weighted quaternion averaging of member orientations.
    pub average_rotation: bool,
    /// Source of the per-class search radius.
    pub radius_type: RadiusType,
    /// Fixed search radius used with [`RadiusType::Config`].
    pub radius: f32,
    /// Scale factor applied to statistic-derived radii.
    pub radius_factor: f32,
    pub max_filter_type: MaxFilterType,
    pub single_object_max_type: SingleObjectMaxType,
    pub hypothesis_merge_policy: HypothesisMergePolicy,

    /// Enables the global-feature classification and fusion stage.
    pub use_global_features: bool,
    pub global_feature_method: GlobalFeatureMethod,
    pub global_fusion_policy: GlobalFusionPolicy,
    /// Neighbours retrieved per k-NN query.
    pub global_features_k: usize,
    pub distance_metric: DistanceMetric,
    /// Score gate for the override fusion policies.
    pub min_score: f32,
    /// Fraction of the top weight a maximum must reach to take part in the
    /// rate-limited scan.
    pub rate_limit: f32,
    /// Upweight factor for [`GlobalFusionPolicy::FixedUpweight`].
    pub weight_factor: f32,
}

impl Default for VotingParams {
    fn default() -> Self {
        Self {
            min_threshold: 0.0,
            min_votes_threshold: 1,
            best_k: None,
            average_rotation: false,
            radius_type: RadiusType::Config,
            radius: 0.1,
            radius_factor: 1.0,
            max_filter_type: MaxFilterType::None,
            single_object_max_type: SingleObjectMaxType::None,
            hypothesis_merge_policy: HypothesisMergePolicy::LastMerged,
            use_global_features: false,
            global_feature_method: GlobalFeatureMethod::Knn,
            global_fusion_policy: GlobalFusionPolicy::RankedOverride,
            global_features_k: 1,
            distance_metric: DistanceMetric::Euclidean,
            min_score: 0.70,
            rate_limit: 0.60,
            weight_factor: 1.5,
        }
    }
}
