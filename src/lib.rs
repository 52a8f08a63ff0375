#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod engine;
pub mod error;
pub mod persist;
pub mod types;

// “Expert” modules – still public, but considered unstable internals.
// (You can tighten or feature-gate these later.)
pub mod cluster;
pub mod global;
pub mod quat;
pub mod segment;
pub mod stats;

// --- High-level re-exports -------------------------------------------------

// Main entry points: engine + results.
pub use crate::engine::{VotingEngine, VotingParams};
pub use crate::types::{BoundingBox, Hypothesis, Vote, VotingMaximum};

// Policy knobs most callers touch.
pub use crate::engine::{
    DistanceMetric, GlobalFeatureMethod, GlobalFusionPolicy, HypothesisMergePolicy, MaxFilterType,
    RadiusType, SingleObjectMaxType,
};

pub use crate::cluster::{ClusterSet, MaximaFinder, MeanShift};
pub use crate::error::VotingError;
pub use crate::persist::VotingModel;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use hough_voting::prelude::*;
/// use nalgebra::Point3;
///
/// # fn main() {
/// let mut engine = VotingEngine::new(VotingParams::default(), Box::new(MeanShift::default()));
///
/// engine.vote(
///     Point3::new(0.1, 0.2, 0.3),
///     1.0,
///     0,
///     Point3::origin(),
///     BoundingBox::default(),
///     42,
/// );
///
/// let maxima = engine.find_maxima(&[], &[]).unwrap();
/// println!("found {} maxima", maxima.len());
/// # }
/// ```
pub mod prelude {
    pub use crate::cluster::{MaximaFinder, MeanShift};
    pub use crate::{BoundingBox, Vote, VotingEngine, VotingMaximum, VotingParams};
}
