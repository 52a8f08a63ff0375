//! Scene geometry helpers and the segmentation collaborator interface.
//!
//! The engine crops a spherical region around each maximum and hands the
//! cropped points to a [`RegionDescriptor`] to obtain whole-object feature
//! vectors. Feature computation itself lives outside this crate.

use crate::global::GlobalFeature;
use nalgebra::{Point3, Vector3};

/// Computes zero or more whole-object ("global") feature vectors for a
/// segmented region of the scene.
///
/// `points`/`normals` are the cropped region, `center` and `radius` describe
/// the crop sphere. An empty result is valid and means "no segmentation".
pub trait RegionDescriptor: Send + Sync {
    fn describe(
        &self,
        points: &[Point3<f32>],
        normals: &[Vector3<f32>],
        center: Point3<f32>,
        radius: f32,
    ) -> Vec<GlobalFeature>;
}

/// Arithmetic mean of a point set. Empty input yields the origin.
pub fn centroid(points: &[Point3<f32>]) -> Point3<f32> {
    if points.is_empty() {
        return Point3::origin();
    }
    let mut sum = Vector3::zeros();
    for p in points {
        sum += p.coords;
    }
    Point3::from(sum / points.len() as f32)
}

/// Distance from `query` to the farthest point of the set.
pub fn max_distance_from(points: &[Point3<f32>], query: Point3<f32>) -> f32 {
    points
        .iter()
        .map(|p| (p - query).norm())
        .fold(0.0f32, f32::max)
}

/// Linear radius search: all points (with their normals) within `radius` of
/// `center`. Normals are optional; pass an empty slice when unavailable.
pub fn crop_region(
    points: &[Point3<f32>],
    normals: &[Vector3<f32>],
    center: Point3<f32>,
    radius: f32,
) -> (Vec<Point3<f32>>, Vec<Vector3<f32>>) {
    let r_sqr = radius * radius;
    let mut out_points = Vec::new();
    let mut out_normals = Vec::new();
    for (i, p) in points.iter().enumerate() {
        if (p - center).norm_squared() <= r_sqr {
            out_points.push(*p);
            if let Some(n) = normals.get(i) {
                out_normals.push(*n);
            }
        }
    }
    (out_points, out_normals)
}
