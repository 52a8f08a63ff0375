//! Voting engine orchestrating vote aggregation and maxima fusion.
//!
//! Overview
//! - Feature-matching workers append votes per class (thread-safe store).
//! - `find_maxima` invokes the pluggable [`MaximaFinder`] once per class with
//!   a class-adaptive search radius, thresholds the discovered clusters and
//!   aggregates member bounding boxes and orientations into maxima.
//! - Depending on the operating mode, maxima then pass through single-object
//!   aggregation or cross-class proximity filtering, are sorted and
//!   normalized, optionally fused with a whole-object classification, and
//!   truncated to the best K.
//!
//! Modules
//! - [`params`] – configuration types for every stage.
//! - `store` – the mutex-guarded per-class vote lists.
//! - `maxima` – cluster-to-maximum aggregation.
//! - `merge` – the weighted left-fold merge of maxima.
//! - `filter` – cross-class proximity filtering (simple/merge).
//! - `single_object` – whole-scene strategies for single-object scenes.

mod filter;
mod maxima;
mod merge;
mod params;
mod single_object;
mod store;

pub use merge::merge_maxima;
pub use params::{
    DistanceMetric, GlobalFeatureMethod, GlobalFusionPolicy, HypothesisMergePolicy, MaxFilterType,
    RadiusType, SingleObjectMaxType, VotingParams,
};
pub use store::VoteStore;

use crate::cluster::MaximaFinder;
use crate::error::VotingError;
use crate::global::fusion::{self, FusionParams};
use crate::global::{GlobalClassifier, GlobalFeature};
use crate::persist::VotingModel;
use crate::segment::{self, RegionDescriptor};
use crate::stats::ClassStats;
use crate::types::{BoundingBox, Vote, VotingMaximum};
use log::{info, warn};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Vote aggregation and maxima fusion engine.
///
/// One engine instance serves one trained model for the lifetime of the
/// process; votes are cleared between scenes with [`VotingEngine::clear`].
pub struct VotingEngine {
    params: VotingParams,
    store: VoteStore,
    stats: ClassStats,
    finder: Box<dyn MaximaFinder>,
    descriptor: Option<Box<dyn RegionDescriptor>>,
    global: Option<GlobalClassifier>,
    /// Training-time global features, grouped by class, kept only until the
    /// model is persisted.
    training_features: BTreeMap<u32, Vec<GlobalFeature>>,
    /// Whole-scene features used instead of per-maximum segmentation in
    /// single-object mode.
    single_object_features: Vec<GlobalFeature>,
    single_object_mode: bool,
}

impl VotingEngine {
    pub fn new(params: VotingParams, finder: Box<dyn MaximaFinder>) -> Self {
        Self {
            params,
            store: VoteStore::new(),
            stats: ClassStats::default(),
            finder,
            descriptor: None,
            global: None,
            training_features: BTreeMap::new(),
            single_object_features: Vec::new(),
            single_object_mode: false,
        }
    }

    pub fn params(&self) -> &VotingParams {
        &self.params
    }

    /// Casts a vote for an object centre. Safe to call concurrently from
    /// parallel feature-matching workers.
    #[allow(clippy::too_many_arguments)]
    pub fn vote(
        &self,
        position: Point3<f32>,
        weight: f32,
        class_id: u32,
        keypoint: Point3<f32>,
        bounding_box: BoundingBox,
        codeword_id: i64,
    ) {
        self.store.push(Vote {
            position,
            weight,
            class_id,
            keypoint,
            bounding_box,
            codeword_id,
        });
    }

    /// All votes of the current scene, grouped by class.
    pub fn votes(&self) -> BTreeMap<u32, Vec<Vote>> {
        self.store.all()
    }

    /// Votes of one class; fails for class ids without votes.
    pub fn votes_for_class(&self, class_id: u32) -> Result<Vec<Vote>, VotingError> {
        self.store.for_class(class_id)
    }

    /// Empties the vote store. Must be called between independent detection
    /// runs to avoid cross-scene contamination.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Supplies the segmentation collaborator used to describe regions
    /// around maxima when global features are enabled.
    pub fn set_region_descriptor(&mut self, descriptor: Box<dyn RegionDescriptor>) {
        self.descriptor = Some(descriptor);
    }

    /// Declares the scene to contain exactly one object and provides its
    /// whole-scene global features.
    pub fn set_single_object_features(&mut self, features: Vec<GlobalFeature>) {
        self.single_object_features = features;
        self.single_object_mode = true;
    }

    pub fn set_single_object_mode(&mut self, enabled: bool) {
        self.single_object_mode = enabled;
    }

    /// Derives the per-class bounding-box statistics from training boxes.
    pub fn train_dimensions(&mut self, boxes: &BTreeMap<u32, Vec<BoundingBox>>) {
        self.stats = ClassStats::from_training_boxes(boxes);
    }

    /// Stores training-time global features for later persistence.
    pub fn forward_global_features(&mut self, features: BTreeMap<u32, Vec<GlobalFeature>>) {
        self.training_features = features;
    }

    /// Assembles the persistable model state from the trained engine.
    pub fn to_model(&self, svm_path: Option<PathBuf>) -> VotingModel {
        VotingModel {
            dimensions: self.stats.dimensions.clone(),
            variances: self.stats.variances.clone(),
            global_features: self.training_features.clone(),
            svm_path,
        }
    }

    /// Adopts loaded model state.
    ///
    /// With global features enabled this derives the per-class average radii,
    /// flattens the aggregate feature cloud and prepares the classifier; a
    /// missing feature section is a configuration mismatch. An unusable
    /// classifier reference only degrades the method to nearest-neighbour
    /// voting.
    pub fn load_model(&mut self, model: &VotingModel) -> Result<(), VotingError> {
        self.stats = ClassStats {
            dimensions: model.dimensions.clone(),
            variances: model.variances.clone(),
        };
        if self.params.use_global_features {
            self.global = Some(GlobalClassifier::from_model(
                model,
                self.params.global_feature_method,
                self.params.distance_metric,
                self.params.global_features_k,
            )?);
        }
        Ok(())
    }

    /// Class-adaptive search radius (bandwidth).
    ///
    /// Falls back to the configured radius when a statistic-derived radius is
    /// requested for a class without statistics.
    pub fn search_dist_for_class(&self, class_id: u32) -> f32 {
        match self.params.radius_type {
            RadiusType::Config => self.params.radius,
            RadiusType::FirstDim | RadiusType::SecondDim => {
                match self.stats.dimensions_for(class_id) {
                    Some(dims) => {
                        let dim = if self.params.radius_type == RadiusType::FirstDim {
                            dims.first
                        } else {
                            dims.second
                        };
                        dim * self.params.radius_factor
                    }
                    None => {
                        warn!(
                            "no bounding box statistics for class {class_id}, using configured radius"
                        );
                        self.params.radius
                    }
                }
            }
        }
    }

    /// Locates object instances in the accumulated votes.
    ///
    /// `points` and `normals` describe the current scene; they are used for
    /// centroid/extent computation and for segmenting regions around maxima
    /// when global features are enabled. Returns maxima sorted by weight
    /// descending with weights normalized to probabilities.
    pub fn find_maxima(
        &mut self,
        points: &[Point3<f32>],
        normals: &[Vector3<f32>],
    ) -> Result<Vec<VotingMaximum>, VotingError> {
        let votes_by_class = self.store.all();
        // a zero-vote scene can still produce a synthesized whole-scene
        // maximum in single-object mode, so only bail out otherwise
        let synthesizes = self.params.use_global_features && self.single_object_mode;
        if votes_by_class.is_empty() && !synthesizes {
            return Ok(Vec::new());
        }

        if let Some(global) = &mut self.global {
            global.ensure_ready();
        }
        let engine: &Self = self;

        let mut all_maxima: Vec<VotingMaximum> = Vec::new();
        for (&class_id, votes) in &votes_by_class {
            if votes.is_empty() {
                continue;
            }
            let radius = engine.search_dist_for_class(class_id);
            let set = engine.finder.find_modes(votes, radius);
            debug_assert!(set.is_consistent(), "clustering strategy contract violated");
            if !set.is_consistent() {
                warn!("clustering strategy returned inconsistent clusters for class {class_id}, skipping");
                continue;
            }

            let params = &engine.params;
            let class_maxima: Vec<VotingMaximum> = (0..set.len())
                .into_par_iter()
                .filter_map(|i| {
                    if set.weights[i] < params.min_threshold
                        || set.vote_indices[i].len() < params.min_votes_threshold
                    {
                        return None;
                    }
                    let mut maximum = maxima::build_maximum(
                        class_id,
                        set.centers[i],
                        set.weights[i],
                        &set.vote_indices[i],
                        &set.reweighted_weights[i],
                        votes,
                        params.average_rotation,
                    )?;
                    if params.use_global_features && !engine.single_object_mode {
                        engine.classify_region(points, normals, &mut maximum);
                    }
                    Some(maximum)
                })
                .collect();
            all_maxima.extend(class_maxima);
        }

        // single-object mode classifies the whole scene once instead of
        // segmenting per maximum
        if self.params.use_global_features && self.single_object_mode {
            if let Some(global) = &self.global {
                let (global_hyp, _) = global.classify(&self.single_object_features, 0, true);
                for max in &mut all_maxima {
                    max.global_hypothesis = global_hyp;
                }
                if all_maxima.is_empty() {
                    all_maxima.push(VotingMaximum {
                        class_id: global_hyp.class_id,
                        position: segment::centroid(points),
                        weight: global_hyp.score,
                        bounding_box: BoundingBox::enclosing(points),
                        global_hypothesis: global_hyp,
                        ..Default::default()
                    });
                }
            }
        }

        let mut maxima = self.apply_mode_policies(all_maxima, &votes_by_class, points);

        sort_maxima(&mut maxima);
        normalize_weights(&mut maxima);

        // global scores may change weights, so sort and normalize again
        if self.params.use_global_features && !maxima.is_empty() {
            fusion::apply(
                self.params.global_fusion_policy,
                &mut maxima,
                FusionParams {
                    min_score: self.params.min_score,
                    rate_limit: self.params.rate_limit,
                    weight_factor: self.params.weight_factor,
                },
            );
            sort_maxima(&mut maxima);
            normalize_weights(&mut maxima);
        }

        if let Some(k) = self.params.best_k {
            if maxima.len() >= k {
                maxima.truncate(k);
            }
        }

        for (i, max) in maxima.iter().enumerate() {
            let p = max.position;
            let s = max.bounding_box.size;
            let q = max.bounding_box.orientation;
            info!(
                "maximum {i}, class: {}, weight: {:.6}, votes: {}, \
                 position: ({:.4}, {:.4}, {:.4}), size: ({:.4}, {:.4}, {:.4}), \
                 orientation: ({:.4}, {:.4}, {:.4}, {:.4})",
                max.class_id,
                max.weight,
                max.vote_indices.len(),
                p.x,
                p.y,
                p.z,
                s.x,
                s.y,
                s.z,
                q.w,
                q.i,
                q.j,
                q.k
            );
        }
        Ok(maxima)
    }

    /// Applies the single-object strategy or the cross-class filter,
    /// whichever the configuration selects.
    fn apply_mode_policies(
        &self,
        maxima: Vec<VotingMaximum>,
        votes_by_class: &BTreeMap<u32, Vec<Vote>>,
        points: &[Point3<f32>],
    ) -> Vec<VotingMaximum> {
        let search = |class_id: u32| self.search_dist_for_class(class_id);
        if self.single_object_mode {
            let strategy = self.params.single_object_max_type;
            match strategy.window() {
                Some(window) if strategy.is_vote_based() => {
                    single_object::compute_single_max_per_class(
                        votes_by_class,
                        points,
                        window,
                        search,
                    )
                }
                Some(window) if strategy.is_maxima_based() => {
                    single_object::merge_maxima_for_each_class(
                        &maxima,
                        points,
                        window,
                        self.params.hypothesis_merge_policy,
                        search,
                    )
                }
                _ => maxima,
            }
        } else {
            match self.params.max_filter_type {
                MaxFilterType::None => maxima,
                MaxFilterType::Simple => filter::filter_maxima(
                    &maxima,
                    false,
                    self.params.hypothesis_merge_policy,
                    search,
                ),
                MaxFilterType::Merge => filter::filter_maxima(
                    &maxima,
                    true,
                    self.params.hypothesis_merge_policy,
                    search,
                ),
            }
        }
    }

    /// Segments the scene around a maximum and classifies the region.
    fn classify_region(
        &self,
        points: &[Point3<f32>],
        normals: &[Vector3<f32>],
        maximum: &mut VotingMaximum,
    ) {
        let Some(global) = &self.global else {
            return;
        };
        let Some(radius) = global.average_radius(maximum.class_id) else {
            warn!(
                "no average radius for class {}, skipping global classification",
                maximum.class_id
            );
            return;
        };

        let (region_points, region_normals) =
            segment::crop_region(points, normals, maximum.position, radius);
        if region_points.is_empty() {
            warn!("no scene points around maximum, classifying an empty region");
        }

        let features = match &self.descriptor {
            Some(descriptor) => descriptor.describe(
                &region_points,
                &region_normals,
                maximum.position,
                radius,
            ),
            None => Vec::new(),
        };

        let (global_hyp, current) =
            global.classify(&features, maximum.class_id, self.single_object_mode);
        maximum.global_hypothesis = global_hyp;
        maximum.current_class_hypothesis = current;
    }
}

/// Stable sort by weight, descending.
pub fn sort_maxima(maxima: &mut [VotingMaximum]) {
    maxima.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Turns weights into probabilities. Empty lists and zero total weight are
/// left untouched.
pub fn normalize_weights(maxima: &mut [VotingMaximum]) {
    let sum: f32 = maxima.iter().map(|m| m.weight).sum();
    if sum <= 0.0 {
        return;
    }
    for max in maxima {
        max.weight /= sum;
    }
}
