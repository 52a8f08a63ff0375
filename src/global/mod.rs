//! Whole-object ("global") feature classification.
//!
//! Global features are computed over a segmented region of the scene and
//! classified either by nearest-neighbour voting over the training feature
//! index or by a one-vs-all SVM. Results are attached to maxima as a pair of
//! hypotheses: the best class overall and the score of the maximum's own
//! class.

pub mod fusion;
mod index;
mod svm;

pub use index::FeatureIndex;
pub use svm::{ClassifierEntry, SvmModel, SvmResponse};

use crate::engine::{DistanceMetric, GlobalFeatureMethod};
use crate::error::VotingError;
use crate::persist::VotingModel;
use crate::types::Hypothesis;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A whole-object descriptor with its local reference frame and the
/// characteristic radius of the region it was computed over.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlobalFeature {
    pub class_id: u32,
    pub descriptor: Vec<f32>,
    pub reference_frame: [f32; 9],
    pub radius: f32,
}

/// Classifier state shared across all classification calls of one engine.
///
/// The feature index is built lazily on the first scene (call
/// [`GlobalClassifier::ensure_ready`] before classifying) and treated as
/// read-only afterwards. The "classifier unavailable" condition is a field
/// here, set once at load time, never a hidden global.
#[derive(Debug)]
pub struct GlobalClassifier {
    method: GlobalFeatureMethod,
    metric: DistanceMetric,
    k: usize,
    index: FeatureIndex,
    average_radii: BTreeMap<u32, f32>,
    svm: Option<SvmModel>,
    svm_unavailable: bool,
}

impl GlobalClassifier {
    /// Builds the classifier from loaded model state.
    ///
    /// The grouped per-class feature store is flattened into the aggregate
    /// index and reduced to one average radius per class. An invalid or
    /// missing classifier reference degrades to nearest-neighbour voting
    /// instead of failing the load.
    pub fn from_model(
        model: &VotingModel,
        method: GlobalFeatureMethod,
        metric: DistanceMetric,
        k: usize,
    ) -> Result<Self, VotingError> {
        if model.global_features.is_empty() {
            return Err(VotingError::GlobalFeaturesMissing);
        }

        let mut flattened = Vec::new();
        let mut average_radii = BTreeMap::new();
        for (&class_id, features) in &model.global_features {
            if features.is_empty() {
                continue;
            }
            let radius_sum: f32 = features.iter().map(|f| f.radius).sum();
            average_radii.insert(class_id, radius_sum / features.len() as f32);
            flattened.extend(features.iter().cloned());
        }
        if flattened.is_empty() {
            return Err(VotingError::GlobalFeaturesMissing);
        }

        let mut svm_unavailable = false;
        let svm = match &model.svm_path {
            Some(path) => match SvmModel::load(path) {
                Ok(model) => Some(model),
                Err(e) => {
                    error!("classifier data not usable, falling back to nearest neighbor voting: {e}");
                    svm_unavailable = true;
                    None
                }
            },
            None => {
                if method == GlobalFeatureMethod::Svm {
                    error!("no classifier reference in model data, falling back to nearest neighbor voting");
                }
                svm_unavailable = true;
                None
            }
        };

        Ok(Self {
            method,
            metric,
            k: k.max(1),
            index: FeatureIndex::new(flattened),
            average_radii,
            svm,
            svm_unavailable,
        })
    }

    /// Average characteristic radius of a class, used to crop the region
    /// around a maximum before describing it.
    pub fn average_radius(&self, class_id: u32) -> Option<f32> {
        self.average_radii.get(&class_id).copied()
    }

    /// Builds the lazy index. Call once before the first classification;
    /// subsequent calls are no-ops.
    pub fn ensure_ready(&mut self) {
        self.index.build(self.metric);
    }

    fn effective_method(&self) -> GlobalFeatureMethod {
        if self.method == GlobalFeatureMethod::Svm && (self.svm_unavailable || self.svm.is_none()) {
            GlobalFeatureMethod::Knn
        } else {
            self.method
        }
    }

    /// Classifies the global features of one maximum (or of the whole scene
    /// in single-object mode).
    ///
    /// Returns `(global_hypothesis, current_class_hypothesis)` where the
    /// first is the best class overall and the second scores `own_class`.
    pub fn classify(
        &self,
        features: &[GlobalFeature],
        own_class: u32,
        single_object_mode: bool,
    ) -> (Hypothesis, Hypothesis) {
        if features.is_empty() {
            return (Hypothesis::default(), Hypothesis::new(own_class, 0.0));
        }
        match self.effective_method() {
            GlobalFeatureMethod::Knn => self.classify_knn(features, own_class),
            GlobalFeatureMethod::Svm => self.classify_svm(features, own_class, single_object_mode),
        }
    }

    fn classify_knn(&self, features: &[GlobalFeature], own_class: u32) -> (Hypothesis, Hypothesis) {
        if !self.index.is_built() {
            warn!("classifying before the feature index was built");
        }

        let mut occurrences: BTreeMap<u32, usize> = BTreeMap::new();
        let mut all_entries = 0usize;
        for feature in features {
            // fewer than k hits are possible and fine
            for (idx, _dist) in self.index.knn(&feature.descriptor, self.k) {
                *occurrences.entry(self.index.feature(idx).class_id).or_insert(0) += 1;
                all_entries += 1;
            }
        }

        let mut current = Hypothesis::new(own_class, 0.0);
        if all_entries > 0 {
            if let Some(&count) = occurrences.get(&own_class) {
                current.score = count as f32 / all_entries as f32;
            }
        }

        let mut best = Hypothesis::default();
        for (&class_id, &count) in &occurrences {
            let score = if all_entries == 0 {
                0.0
            } else {
                count as f32 / all_entries as f32
            };
            if score > best.score {
                best = Hypothesis::new(class_id, score);
            }
        }
        (best, current)
    }

    fn classify_svm(
        &self,
        features: &[GlobalFeature],
        own_class: u32,
        single_object_mode: bool,
    ) -> (Hypothesis, Hypothesis) {
        let Some(svm) = self.svm.as_ref() else {
            return self.classify_knn(features, own_class);
        };
        let responses: Vec<SvmResponse> = features
            .iter()
            .map(|f| svm.predict(&f.descriptor))
            .collect();

        let response = if responses.len() > 1 {
            // majority-voted label, ties broken toward the highest raw score
            let mut occurrences: BTreeMap<u32, usize> = BTreeMap::new();
            for r in &responses {
                *occurrences.entry(r.label).or_insert(0) += 1;
            }
            let best_label = occurrences
                .iter()
                .max_by_key(|(_, &count)| count)
                .map(|(&label, _)| label)
                .unwrap_or_default();
            responses
                .iter()
                .filter(|r| r.label == best_label)
                .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
                .cloned()
                .unwrap_or_default()
        } else {
            responses.into_iter().next().unwrap_or_default()
        };

        let current_score = if single_object_mode {
            0.0
        } else {
            response.all_scores.get(&own_class).copied().unwrap_or(0.0)
        };
        (
            Hypothesis::new(response.label, response.score),
            Hypothesis::new(own_class, current_score),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(class_id: u32, descriptor: Vec<f32>) -> GlobalFeature {
        GlobalFeature {
            class_id,
            descriptor,
            reference_frame: [0.0; 9],
            radius: 0.5,
        }
    }

    fn model_with_features() -> VotingModel {
        let mut model = VotingModel::default();
        model
            .global_features
            .insert(0, vec![feature(0, vec![0.0, 0.0]), feature(0, vec![0.1, 0.0])]);
        model
            .global_features
            .insert(1, vec![feature(1, vec![5.0, 5.0])]);
        model
    }

    #[test]
    fn knn_voting_scores_are_occurrence_fractions() {
        let model = model_with_features();
        let mut classifier = GlobalClassifier::from_model(
            &model,
            GlobalFeatureMethod::Knn,
            DistanceMetric::Euclidean,
            3,
        )
        .unwrap();
        classifier.ensure_ready();

        let query = vec![feature(0, vec![0.05, 0.0])];
        let (global, current) = classifier.classify(&query, 1, false);
        assert_eq!(global.class_id, 0);
        assert!((global.score - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(current.class_id, 1);
        assert!((current.score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn absent_own_class_scores_zero() {
        let model = model_with_features();
        let mut classifier = GlobalClassifier::from_model(
            &model,
            GlobalFeatureMethod::Knn,
            DistanceMetric::Euclidean,
            1,
        )
        .unwrap();
        classifier.ensure_ready();
        let (_, current) = classifier.classify(&[feature(0, vec![0.0, 0.0])], 42, false);
        assert_eq!(current.score, 0.0);
    }

    #[test]
    fn svm_method_without_classifier_degrades_to_knn() {
        let model = model_with_features(); // no svm path
        let mut classifier = GlobalClassifier::from_model(
            &model,
            GlobalFeatureMethod::Svm,
            DistanceMetric::Euclidean,
            1,
        )
        .unwrap();
        classifier.ensure_ready();
        assert_eq!(classifier.effective_method(), GlobalFeatureMethod::Knn);
        let (global, _) = classifier.classify(&[feature(0, vec![0.0, 0.0])], 0, false);
        assert_eq!(global.class_id, 0, "fallback classification must work");
    }

    #[test]
    fn empty_feature_store_is_a_configuration_mismatch() {
        let model = VotingModel::default();
        match GlobalClassifier::from_model(
            &model,
            GlobalFeatureMethod::Knn,
            DistanceMetric::Euclidean,
            1,
        ) {
            Err(VotingError::GlobalFeaturesMissing) => {}
            other => panic!("expected GlobalFeaturesMissing, got {other:?}"),
        }
    }

    #[test]
    fn average_radius_is_per_class_mean() {
        let mut model = VotingModel::default();
        let mut a = feature(0, vec![0.0]);
        a.radius = 1.0;
        let mut b = feature(0, vec![0.0]);
        b.radius = 3.0;
        model.global_features.insert(0, vec![a, b]);
        let classifier = GlobalClassifier::from_model(
            &model,
            GlobalFeatureMethod::Knn,
            DistanceMetric::Euclidean,
            1,
        )
        .unwrap();
        assert_eq!(classifier.average_radius(0), Some(2.0));
        assert_eq!(classifier.average_radius(9), None);
    }
}
