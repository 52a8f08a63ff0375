//! One-vs-all support-vector-machine prediction.
//!
//! Training happens outside this crate; the persisted model references either
//! a single JSON file holding every per-class classifier or a tar archive of
//! one-vs-all files that is unpacked on load. Unpacked files are owned by the
//! predictor and removed when it is dropped.

use crate::error::VotingError;
use log::{debug, error};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A single binary one-vs-all decision function.
#[derive(Clone, Debug, Deserialize)]
pub struct ClassifierEntry {
    #[serde(rename = "ClassId")]
    pub class_id: u32,
    #[serde(rename = "Weights")]
    pub weights: Vec<f32>,
    #[serde(rename = "Bias")]
    pub bias: f32,
}

#[derive(Deserialize)]
struct ClassifierFile {
    #[serde(rename = "Classifiers")]
    classifiers: Vec<ClassifierEntry>,
}

/// Prediction outcome: winning label, its unified score and the unified
/// scores of every class.
#[derive(Clone, Debug, Default)]
pub struct SvmResponse {
    pub label: u32,
    pub score: f32,
    pub all_scores: BTreeMap<u32, f32>,
}

/// Multi-class predictor assembled from one-vs-all linear classifiers.
#[derive(Debug)]
pub struct SvmModel {
    classifiers: Vec<ClassifierEntry>,
    /// Files unpacked from an archive; removed on drop.
    extracted: Vec<PathBuf>,
}

impl SvmModel {
    /// Loads classifier data from `path`.
    ///
    /// A `.tar` reference is listed and unpacked next to the archive (one
    /// JSON file per class); anything else is read as a single JSON file
    /// containing all classifiers.
    pub fn load(path: &Path) -> Result<Self, VotingError> {
        if !path.is_file() {
            return Err(VotingError::Format(format!(
                "classifier file not valid or missing: {}",
                path.display()
            )));
        }

        if path.extension().is_some_and(|e| e == "tar") {
            Self::load_archive(path)
        } else {
            let contents = fs::read_to_string(path)?;
            let file: ClassifierFile = serde_json::from_str(&contents)?;
            Self::from_entries(file.classifiers, Vec::new())
        }
    }

    fn load_archive(path: &Path) -> Result<Self, VotingError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let listing = Command::new("tar").arg("-tf").arg(path).output()?;
        if !listing.status.success() {
            return Err(VotingError::Format(format!(
                "cannot list classifier archive {}",
                path.display()
            )));
        }
        let names: Vec<PathBuf> = String::from_utf8_lossy(&listing.stdout)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| dir.join(l.trim()))
            .collect();

        let status = Command::new("tar")
            .arg("-xf")
            .arg(path)
            .arg("-C")
            .arg(dir)
            .status()?;
        if !status.success() {
            return Err(VotingError::Format(format!(
                "cannot unpack classifier archive {}",
                path.display()
            )));
        }

        let mut classifiers = Vec::new();
        for file in &names {
            let contents = fs::read_to_string(file)?;
            let parsed: ClassifierFile = serde_json::from_str(&contents)?;
            classifiers.extend(parsed.classifiers);
        }
        Self::from_entries(classifiers, names)
    }

    fn from_entries(
        classifiers: Vec<ClassifierEntry>,
        extracted: Vec<PathBuf>,
    ) -> Result<Self, VotingError> {
        if classifiers.is_empty() {
            return Err(VotingError::Format(
                "classifier data contains no decision functions".into(),
            ));
        }
        Ok(Self {
            classifiers,
            extracted,
        })
    }

    /// Predicts the class of one descriptor.
    ///
    /// Raw decision values `w·x + b` are mapped through a sigmoid so scores
    /// from differently scaled classifiers are comparable.
    pub fn predict(&self, descriptor: &[f32]) -> SvmResponse {
        let mut response = SvmResponse::default();
        let mut best = f32::NEG_INFINITY;
        for entry in &self.classifiers {
            let decision: f32 = entry
                .weights
                .iter()
                .zip(descriptor.iter())
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + entry.bias;
            let score = 1.0 / (1.0 + (-decision).exp());
            response.all_scores.insert(entry.class_id, score);
            if score > best {
                best = score;
                response.label = entry.class_id;
                response.score = score;
            }
        }
        response
    }
}

impl Drop for SvmModel {
    fn drop(&mut self) {
        for file in &self.extracted {
            match fs::remove_file(file) {
                Ok(()) => debug!("removed unpacked classifier file {}", file.display()),
                Err(e) => error!("cannot remove {}: {e}", file.display()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(entries: Vec<ClassifierEntry>) -> SvmModel {
        SvmModel {
            classifiers: entries,
            extracted: Vec::new(),
        }
    }

    fn entry(class_id: u32, weights: Vec<f32>, bias: f32) -> ClassifierEntry {
        ClassifierEntry {
            class_id,
            weights,
            bias,
        }
    }

    #[test]
    fn prediction_picks_the_strongest_decision() {
        let m = model(vec![
            entry(0, vec![1.0, 0.0], 0.0),
            entry(1, vec![0.0, 1.0], 0.0),
        ]);
        let response = m.predict(&[0.2, 2.0]);
        assert_eq!(response.label, 1);
        assert!(response.score > 0.5);
        assert_eq!(response.all_scores.len(), 2);
    }

    #[test]
    fn scores_are_unified_into_unit_interval() {
        let m = model(vec![entry(3, vec![10.0], -2.0)]);
        let response = m.predict(&[100.0]);
        assert!(response.score > 0.0 && response.score <= 1.0);
    }

    #[test]
    fn missing_file_is_a_format_error() {
        match SvmModel::load(Path::new("/nonexistent/classifier.json")) {
            Err(VotingError::Format(_)) => {}
            other => panic!("expected a format error, got {other:?}"),
        }
    }
}
