use nalgebra::{Matrix3, Point3, Rotation3, UnitQuaternion, Vector3};
use serde::Serialize;

/// Oriented bounding box in scene coordinates.
///
/// Boxes are never mutated in place; aggregation steps recompute them as
/// weighted combinations of their inputs.
#[derive(Clone, Debug, Serialize)]
pub struct BoundingBox {
    /// Box centre.
    pub position: Point3<f32>,
    /// Full extents along the box axes.
    pub size: Vector3<f32>,
    /// Rotation from box frame to scene frame.
    pub orientation: UnitQuaternion<f32>,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            size: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl BoundingBox {
    /// Axis-aligned box from a centre and full extents.
    pub fn axis_aligned(position: Point3<f32>, size: Vector3<f32>) -> Self {
        Self {
            position,
            size,
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Oriented box enclosing a point set, axes taken from the covariance
    /// eigenvectors. Empty input yields the default box.
    pub fn enclosing(points: &[Point3<f32>]) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let centroid = crate::segment::centroid(points);
        let mut cov = Matrix3::<f32>::zeros();
        for p in points {
            let d = p - centroid;
            cov += d * d.transpose();
        }
        cov /= points.len() as f32;

        let eig = cov.symmetric_eigen();
        let mut axes = eig.eigenvectors;
        // keep the basis right-handed
        if axes.determinant() < 0.0 {
            axes.set_column(2, &(-axes.column(2)));
        }
        let rot = Rotation3::from_matrix_unchecked(axes);

        let mut min = Vector3::repeat(f32::MAX);
        let mut max = Vector3::repeat(f32::MIN);
        for p in points {
            let local = rot.inverse() * (p - centroid);
            min = min.inf(&local);
            max = max.sup(&local);
        }

        let center_local = 0.5 * (min + max);
        Self {
            position: centroid + rot * center_local,
            size: max - min,
            orientation: UnitQuaternion::from_rotation_matrix(&rot),
        }
    }
}

/// A single weighted hypothesis for an object centre, cast by one matched
/// local feature. Immutable once cast.
#[derive(Clone, Debug, Serialize)]
pub struct Vote {
    /// Hypothesized object centre.
    pub position: Point3<f32>,
    pub weight: f32,
    pub class_id: u32,
    /// Keypoint the vote originated from.
    pub keypoint: Point3<f32>,
    /// Training bounding box carried by the activated codeword.
    pub bounding_box: BoundingBox,
    /// Id of the codeword that cast the vote.
    pub codeword_id: i64,
}

/// A classification outcome: a class id with a confidence score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Hypothesis {
    pub class_id: u32,
    pub score: f32,
}

impl Hypothesis {
    pub fn new(class_id: u32, score: f32) -> Self {
        Self { class_id, score }
    }
}

/// A spatial mode in the per-class vote distribution: one candidate object
/// detection. The weight is interpreted as a probability once the final
/// maxima list has been normalized.
#[derive(Clone, Debug, Serialize)]
pub struct VotingMaximum {
    pub class_id: u32,
    pub position: Point3<f32>,
    pub weight: f32,
    /// Indices into the vote list of `class_id`.
    pub vote_indices: Vec<usize>,
    pub bounding_box: BoundingBox,
    /// Best whole-object classification over all classes.
    pub global_hypothesis: Hypothesis,
    /// Whole-object score for this maximum's own class.
    pub current_class_hypothesis: Hypothesis,
}

impl Default for VotingMaximum {
    fn default() -> Self {
        Self {
            class_id: 0,
            position: Point3::origin(),
            weight: 0.0,
            vote_indices: Vec::new(),
            bounding_box: BoundingBox::default(),
            global_hypothesis: Hypothesis::default(),
            current_class_hypothesis: Hypothesis::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_box_covers_axis_aligned_extents() {
        // symmetric spread along all three axes so the covariance axes are
        // the coordinate axes and the box is non-degenerate
        let points = vec![
            Point3::new(0.0, -2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -0.5),
            Point3::new(0.0, 0.0, 0.5),
        ];
        let bb = BoundingBox::enclosing(&points);
        let volume = bb.size.x * bb.size.y * bb.size.z;
        assert!(
            volume > 0.0,
            "expected a non-degenerate box, got size={:?}",
            bb.size
        );
        // the longest extent must cover the dominant spread (y axis, 4.0)
        assert!(
            bb.size.max() >= 4.0 - 1e-4,
            "largest extent too small: {:?}",
            bb.size
        );
    }

    #[test]
    fn enclosing_box_of_collinear_points_keeps_the_dominant_extent() {
        let points = vec![
            Point3::new(-1.0, -2.0, -0.5),
            Point3::new(1.0, 2.0, 0.5),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let bb = BoundingBox::enclosing(&points);
        // collinear input collapses two axes but must still span the line
        let diameter = (Point3::new(1.0f32, 2.0, 0.5) - Point3::new(-1.0, -2.0, -0.5)).norm();
        assert!(
            bb.size.max() >= diameter - 1e-4,
            "largest extent too small: {:?}",
            bb.size
        );
    }

    #[test]
    fn enclosing_box_of_empty_input_is_default() {
        let bb = BoundingBox::enclosing(&[]);
        assert_eq!(bb.size, Vector3::zeros());
    }
}
