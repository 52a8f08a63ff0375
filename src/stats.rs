//! Per-class bounding-box statistics.
//!
//! During training, every class accumulates the half-extents of its two
//! largest bounding-box axes. The means feed the adaptive search radius at
//! detection time (`RadiusType::FirstDim` / `SecondDim`); the variances are
//! persisted alongside for diagnostics.

use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean or variance of the two dominant bounding-box half-extents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DimPair {
    /// Largest axis half-extent.
    pub first: f32,
    /// Second-largest axis half-extent.
    pub second: f32,
}

/// Read-only per-class statistics derived once from training data.
#[derive(Clone, Debug, Default)]
pub struct ClassStats {
    pub dimensions: BTreeMap<u32, DimPair>,
    pub variances: BTreeMap<u32, DimPair>,
}

impl ClassStats {
    /// Computes means and variances of the two largest half-extents over the
    /// training bounding boxes of each class.
    pub fn from_training_boxes(boxes: &BTreeMap<u32, Vec<BoundingBox>>) -> Self {
        let mut stats = Self::default();
        for (&class_id, class_boxes) in boxes {
            if class_boxes.is_empty() {
                continue;
            }
            let mut first_accu = 0.0f32;
            let mut first_accu_sqr = 0.0f32;
            let mut second_accu = 0.0f32;
            let mut second_accu_sqr = 0.0f32;

            for bb in class_boxes {
                let (first, second) = dominant_half_extents(bb);
                first_accu += first;
                second_accu += second;
                first_accu_sqr += first * first;
                second_accu_sqr += second * second;
            }

            let n = class_boxes.len() as f32;
            let first_mean = first_accu / n;
            let second_mean = second_accu / n;
            stats.dimensions.insert(
                class_id,
                DimPair {
                    first: first_mean,
                    second: second_mean,
                },
            );
            stats.variances.insert(
                class_id,
                DimPair {
                    first: first_accu_sqr / n - first_mean * first_mean,
                    second: second_accu_sqr / n - second_mean * second_mean,
                },
            );
        }
        stats
    }

    pub fn dimensions_for(&self, class_id: u32) -> Option<DimPair> {
        self.dimensions.get(&class_id).copied()
    }
}

/// Half-extents of the largest and second-largest box axes.
fn dominant_half_extents(bb: &BoundingBox) -> (f32, f32) {
    let mut s = [bb.size.x, bb.size.y, bb.size.z];
    s.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    (s[0] / 2.0, s[1] / 2.0)
}
