//! Structured-text encoding of the voting model.
//!
//! Field names follow the historical document layout so models remain
//! exchangeable with earlier tooling.

use super::VotingModel;
use crate::error::VotingError;
use crate::global::GlobalFeature;
use crate::stats::DimPair;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Serialize, Deserialize)]
struct DimEntry {
    #[serde(rename = "ClassId")]
    class_id: u32,
    #[serde(rename = "FirstDimension")]
    first: f32,
    #[serde(rename = "SecondDimension")]
    second: f32,
}

#[derive(Serialize, Deserialize)]
struct VarEntry {
    #[serde(rename = "ClassId")]
    class_id: u32,
    #[serde(rename = "FirstDimVariance")]
    first: f32,
    #[serde(rename = "SecondDimVariance")]
    second: f32,
}

#[derive(Serialize, Deserialize)]
struct FeaturePoint {
    #[serde(rename = "ReferenceFrame")]
    reference_frame: [f32; 9],
    #[serde(rename = "Descriptor")]
    descriptor: Vec<f32>,
    #[serde(rename = "GlobalDescriptorRadius")]
    radius: f32,
}

#[derive(Serialize, Deserialize)]
struct ClassFeatures {
    #[serde(rename = "ClassId")]
    class_id: u32,
    /// One or more feature clouds per class; flattened on load.
    #[serde(rename = "FeatureList")]
    feature_list: Vec<Vec<FeaturePoint>>,
}

#[derive(Serialize, Deserialize)]
struct Document {
    #[serde(rename = "BoundingBoxDimensions")]
    dimensions: Option<Vec<DimEntry>>,
    #[serde(rename = "BoundingBoxVariances")]
    variances: Option<Vec<VarEntry>>,
    #[serde(rename = "GlobalFeatures", skip_serializing_if = "Option::is_none")]
    global_features: Option<Vec<ClassFeatures>>,
    #[serde(rename = "ObjectDataSVM", skip_serializing_if = "Option::is_none")]
    svm_path: Option<String>,
}

pub fn save<W: Write>(model: &VotingModel, w: W) -> Result<(), VotingError> {
    let doc = Document {
        dimensions: Some(
            model
                .dimensions
                .iter()
                .map(|(&class_id, d)| DimEntry {
                    class_id,
                    first: d.first,
                    second: d.second,
                })
                .collect(),
        ),
        variances: Some(
            model
                .variances
                .iter()
                .map(|(&class_id, v)| VarEntry {
                    class_id,
                    first: v.first,
                    second: v.second,
                })
                .collect(),
        ),
        global_features: if model.global_features.is_empty() {
            None
        } else {
            Some(
                model
                    .global_features
                    .iter()
                    .map(|(&class_id, features)| ClassFeatures {
                        class_id,
                        feature_list: vec![features
                            .iter()
                            .map(|f| FeaturePoint {
                                reference_frame: f.reference_frame,
                                descriptor: f.descriptor.clone(),
                                radius: f.radius,
                            })
                            .collect()],
                    })
                    .collect(),
            )
        },
        svm_path: model
            .svm_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
    };
    serde_json::to_writer_pretty(w, &doc)?;
    Ok(())
}

pub fn load<R: Read>(r: R, require_global: bool) -> Result<VotingModel, VotingError> {
    let doc: Document = serde_json::from_reader(r)?;

    let dimensions = doc
        .dimensions
        .ok_or_else(|| VotingError::Format("missing BoundingBoxDimensions section".into()))?;
    let variances = doc
        .variances
        .ok_or_else(|| VotingError::Format("missing BoundingBoxVariances section".into()))?;

    let mut model = VotingModel {
        svm_path: doc.svm_path.map(PathBuf::from),
        ..Default::default()
    };
    for entry in dimensions {
        model.dimensions.insert(
            entry.class_id,
            DimPair {
                first: entry.first,
                second: entry.second,
            },
        );
    }
    for entry in variances {
        model.variances.insert(
            entry.class_id,
            DimPair {
                first: entry.first,
                second: entry.second,
            },
        );
    }

    match doc.global_features {
        Some(classes) => {
            for class in classes {
                let mut features: Vec<GlobalFeature> = Vec::new();
                for cloud in class.feature_list {
                    features.extend(cloud.into_iter().map(|p| GlobalFeature {
                        class_id: class.class_id,
                        descriptor: p.descriptor,
                        reference_frame: p.reference_frame,
                        radius: p.radius,
                    }));
                }
                model.global_features.insert(class.class_id, features);
            }
        }
        None => {
            if require_global {
                return Err(VotingError::GlobalFeaturesMissing);
            }
        }
    }
    if require_global && !model.has_global_features() {
        return Err(VotingError::GlobalFeaturesMissing);
    }

    let mut by_class: BTreeMap<u32, usize> = BTreeMap::new();
    for (&class_id, features) in &model.global_features {
        by_class.insert(class_id, features.len());
    }
    log::debug!("loaded model document: {} classes, features {by_class:?}", model.dimensions.len());
    Ok(model)
}
