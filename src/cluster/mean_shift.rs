//! Kernel mean-shift mode seeking over vote positions.

use super::{gaussian_kernel, ClusterSet, MaximaFinder};
use crate::types::Vote;
use log::debug;
use nalgebra::{Point3, Vector3};

/// Weighted Gaussian-kernel mean shift.
///
/// Every vote seeds one trajectory; converged modes closer than half the
/// bandwidth are merged. Votes within the bandwidth of a mode become its
/// members, with their weights discounted by the kernel at their distance to
/// the mode centre.
#[derive(Clone, Debug)]
pub struct MeanShift {
    /// Iteration cap per trajectory.
    pub max_iterations: usize,
    /// Convergence threshold as a fraction of the bandwidth.
    pub convergence_fraction: f32,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_fraction: 1e-3,
        }
    }
}

impl MeanShift {
    fn shift(&self, seed: Point3<f32>, votes: &[Vote], bandwidth: f32) -> Point3<f32> {
        let mut current = seed;
        let eps = bandwidth * self.convergence_fraction;
        for _ in 0..self.max_iterations {
            let mut numer = Vector3::zeros();
            let mut denom = 0.0f32;
            for vote in votes {
                let d_sqr = (vote.position - current).norm_squared();
                let k = gaussian_kernel(d_sqr, bandwidth) * vote.weight;
                numer += k * vote.position.coords;
                denom += k;
            }
            if denom <= f32::EPSILON {
                break;
            }
            let next = Point3::from(numer / denom);
            let step = (next - current).norm();
            current = next;
            if step < eps {
                break;
            }
        }
        current
    }
}

impl MaximaFinder for MeanShift {
    fn find_modes(&self, votes: &[Vote], search_radius: f32) -> ClusterSet {
        if votes.is_empty() || search_radius <= 0.0 {
            return ClusterSet::default();
        }

        // converge one trajectory per vote, then merge nearby modes
        let merge_dist = search_radius * 0.5;
        let mut modes: Vec<Point3<f32>> = Vec::new();
        for vote in votes {
            let mode = self.shift(vote.position, votes, search_radius);
            let merged = modes
                .iter()
                .any(|m| (m - mode).norm() < merge_dist);
            if !merged {
                modes.push(mode);
            }
        }

        // assign votes to modes within the bandwidth and discount by kernel
        let mut set = ClusterSet::default();
        for mode in modes {
            let mut indices = Vec::new();
            let mut reweighted = Vec::new();
            let mut total = 0.0f32;
            for (i, vote) in votes.iter().enumerate() {
                let d_sqr = (vote.position - mode).norm_squared();
                if d_sqr <= search_radius * search_radius {
                    let w = gaussian_kernel(d_sqr, search_radius) * vote.weight;
                    indices.push(i);
                    reweighted.push(w);
                    total += w;
                }
            }
            if indices.is_empty() {
                continue;
            }
            set.centers.push(mode);
            set.weights.push(total);
            set.vote_indices.push(indices);
            set.reweighted_weights.push(reweighted);
        }

        debug!(
            "mean shift: {} votes -> {} modes (bandwidth {:.4})",
            votes.len(),
            set.len(),
            search_radius
        );
        set
    }
}
