//! Nearest-neighbour index over training global features.

use super::GlobalFeature;
use crate::engine::DistanceMetric;
use log::{info, warn};
use rayon::prelude::*;

/// Index over the flattened aggregate feature cloud.
///
/// Built lazily on first use and read-only afterwards; queries are linear
/// scans parallelised over the stored features.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    features: Vec<GlobalFeature>,
    metric: DistanceMetric,
    built: bool,
}

impl FeatureIndex {
    pub fn new(features: Vec<GlobalFeature>) -> Self {
        Self {
            features,
            metric: DistanceMetric::default(),
            built: false,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn feature(&self, idx: usize) -> &GlobalFeature {
        &self.features[idx]
    }

    /// Finalizes the index for the given metric. Idempotent.
    pub fn build(&mut self, metric: DistanceMetric) {
        if self.built {
            return;
        }
        info!(
            "building global feature index: {} features, metric {:?}",
            self.features.len(),
            metric
        );
        self.metric = metric;
        self.built = true;
    }

    /// The `k` nearest stored features to `query`, ascending by distance.
    ///
    /// An empty index is logged as a warning and yields no neighbours.
    pub fn knn(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.features.is_empty() {
            warn!("nearest neighbor search on an empty feature index");
            return Vec::new();
        }
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .features
            .par_iter()
            .enumerate()
            .map(|(i, f)| (i, distance(self.metric, query, &f.descriptor)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Distance between two descriptors under the configured metric. Smaller is
/// closer for every metric; histogram intersection is negated accordingly.
fn distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    match metric {
        DistanceMetric::Euclidean => (0..n).map(|i| (a[i] - b[i]).powi(2)).sum(),
        DistanceMetric::ChiSquared => (0..n)
            .map(|i| {
                let sum = a[i] + b[i];
                if sum.abs() <= f32::EPSILON {
                    0.0
                } else {
                    (a[i] - b[i]).powi(2) / sum
                }
            })
            .sum(),
        DistanceMetric::Hellinger => (0..n)
            .map(|i| {
                let d = a[i].max(0.0).sqrt() - b[i].max(0.0).sqrt();
                d * d
            })
            .sum(),
        DistanceMetric::HistIntersection => -(0..n).map(|i| a[i].min(b[i])).sum::<f32>(),
    }
}
