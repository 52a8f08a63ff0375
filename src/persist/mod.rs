//! Persistence of trained class-level state.
//!
//! Two interchangeable encodings carry the same [`VotingModel`]: a
//! length-prefixed little-endian binary stream ([`binary`]) and a structured
//! JSON document ([`json`]) using the historical field names. The grouped
//! global feature store is consumed once after loading — the engine keeps
//! only the flattened aggregate cloud and one average radius per class.

pub mod binary;
pub mod json;

use crate::global::GlobalFeature;
use crate::stats::DimPair;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Trained state persisted between training and detection.
#[derive(Clone, Debug, Default)]
pub struct VotingModel {
    /// Per-class means of the two dominant bounding-box half-extents.
    pub dimensions: BTreeMap<u32, DimPair>,
    /// Per-class variances of the same quantities.
    pub variances: BTreeMap<u32, DimPair>,
    /// Training-time global features grouped by class.
    pub global_features: BTreeMap<u32, Vec<GlobalFeature>>,
    /// Reference to the trained classifier (single file or tar archive).
    pub svm_path: Option<PathBuf>,
}

impl VotingModel {
    /// True when no class carries any global feature.
    pub fn has_global_features(&self) -> bool {
        self.global_features.values().any(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VotingError;

    fn sample_model() -> VotingModel {
        let mut model = VotingModel::default();
        model.dimensions.insert(
            3,
            DimPair {
                first: 0.4,
                second: 0.2,
            },
        );
        model.variances.insert(
            3,
            DimPair {
                first: 0.01,
                second: 0.005,
            },
        );
        model.global_features.insert(
            3,
            vec![GlobalFeature {
                class_id: 3,
                descriptor: vec![0.1, 0.2, 0.3],
                reference_frame: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                radius: 0.35,
            }],
        );
        model.svm_path = Some(PathBuf::from("/tmp/classifier.json"));
        model
    }

    #[test]
    fn binary_and_json_encodings_agree() {
        let model = sample_model();

        let mut buf = Vec::new();
        binary::save(&model, &mut buf).unwrap();
        let from_binary = binary::load(buf.as_slice(), true).unwrap();

        let mut text = Vec::new();
        json::save(&model, &mut text).unwrap();
        let from_json = json::load(text.as_slice(), true).unwrap();

        for loaded in [&from_binary, &from_json] {
            assert_eq!(loaded.dimensions, model.dimensions);
            assert_eq!(loaded.variances, model.variances);
            assert_eq!(loaded.svm_path, model.svm_path);
            let feat = &loaded.global_features[&3][0];
            assert_eq!(feat.descriptor, vec![0.1, 0.2, 0.3]);
            assert_eq!(feat.radius, 0.35);
        }
    }

    #[test]
    fn missing_global_section_is_a_configuration_mismatch() {
        let mut model = sample_model();
        model.global_features.clear();

        let mut buf = Vec::new();
        binary::save(&model, &mut buf).unwrap();
        match binary::load(buf.as_slice(), true) {
            Err(VotingError::GlobalFeaturesMissing) => {}
            other => panic!("expected GlobalFeaturesMissing, got {other:?}"),
        }
        // without the requirement the same stream loads fine
        assert!(binary::load(buf.as_slice(), false).is_ok());
    }
}
