//! Shared helpers for integration tests.

use hough_voting::global::GlobalFeature;
use hough_voting::segment::RegionDescriptor;
use hough_voting::types::BoundingBox;
use hough_voting::VotingEngine;
use nalgebra::{Point3, Vector3};

/// Casts `count` unit-weight votes for `class_id`, all at the same position
/// so mean-shift recovers one cluster with weight exactly `count`.
pub fn cast_clump(engine: &VotingEngine, class_id: u32, count: usize, position: Point3<f32>) {
    for i in 0..count {
        engine.vote(
            position,
            1.0,
            class_id,
            Point3::origin(),
            BoundingBox::default(),
            i as i64,
        );
    }
}

/// A scene point with a dummy normal at every clump position.
pub fn scene_at(positions: &[Point3<f32>]) -> (Vec<Point3<f32>>, Vec<Vector3<f32>>) {
    let points: Vec<Point3<f32>> = positions.to_vec();
    let normals = vec![Vector3::z(); points.len()];
    (points, normals)
}

/// Region descriptor returning one fixed global feature regardless of the
/// region content.
pub struct FixedDescriptor {
    pub descriptor: Vec<f32>,
}

impl RegionDescriptor for FixedDescriptor {
    fn describe(
        &self,
        _points: &[Point3<f32>],
        _normals: &[Vector3<f32>],
        _center: Point3<f32>,
        radius: f32,
    ) -> Vec<GlobalFeature> {
        vec![GlobalFeature {
            class_id: 0,
            descriptor: self.descriptor.clone(),
            reference_frame: [0.0; 9],
            radius,
        }]
    }
}
