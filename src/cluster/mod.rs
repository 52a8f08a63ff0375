//! Pluggable per-class mode finding.
//!
//! The engine invokes a [`MaximaFinder`] once per class with that class's
//! votes and a class-adaptive search radius. The strategy's internals are its
//! own business; only the [`ClusterSet`] contract is relied upon.

mod mean_shift;

pub use mean_shift::MeanShift;

use crate::types::Vote;
use nalgebra::Point3;

/// Clusters discovered by a [`MaximaFinder`].
///
/// Contract: all four collections have equal length, one entry per cluster.
/// `vote_indices[i]` indexes into the vote slice the finder was called with,
/// and `reweighted_weights[i]` holds the kernel-discounted weight of each
/// member vote, aligned with `vote_indices[i]`.
#[derive(Clone, Debug, Default)]
pub struct ClusterSet {
    /// Cluster centre positions.
    pub centers: Vec<Point3<f32>>,
    /// Accumulated cluster weights.
    pub weights: Vec<f32>,
    /// Member vote indices per cluster.
    pub vote_indices: Vec<Vec<usize>>,
    /// Kernel-discounted member weights per cluster.
    pub reweighted_weights: Vec<Vec<f32>>,
}

impl ClusterSet {
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// True when the equal-length contract holds.
    pub fn is_consistent(&self) -> bool {
        self.weights.len() == self.centers.len()
            && self.vote_indices.len() == self.centers.len()
            && self.reweighted_weights.len() == self.centers.len()
    }
}

/// Per-class mode-seeking strategy.
pub trait MaximaFinder: Send + Sync {
    /// Finds density modes among `votes` using the given search radius
    /// (bandwidth). Implementations must uphold the [`ClusterSet`] contract.
    fn find_modes(&self, votes: &[Vote], search_radius: f32) -> ClusterSet;
}

/// Gaussian kernel weight for a squared distance at the given bandwidth.
pub(crate) fn gaussian_kernel(distance_sqr: f32, bandwidth: f32) -> f32 {
    if bandwidth <= 0.0 {
        return 0.0;
    }
    let u = distance_sqr / (bandwidth * bandwidth);
    (-0.5 * u).exp()
}
