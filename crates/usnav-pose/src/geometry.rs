use glam::{DMat3, DVec3};

use crate::pose::Pose;

/// Project a point onto a plane.
///
/// The plane is the set of points `x` with `dot(x, n) + offset = 0` where `n`
/// is the normalized `normal`.
///
/// # Arguments
///
/// * `point` - The point to project.
/// * `normal` - The plane normal. It does not need to be unit length.
/// * `offset` - The plane offset along the normalized normal.
///
/// # Returns
///
/// The orthogonal projection of `point` onto the plane.
///
/// Example:
///
/// ```
/// use glam::DVec3;
/// use usnav_pose::geometry::project_point_onto_plane;
///
/// let p = project_point_onto_plane(DVec3::new(1.0, 2.0, 3.0), DVec3::new(0.0, 0.0, 2.0), 0.0);
/// assert_eq!(p, DVec3::new(1.0, 2.0, 0.0));
/// ```
pub fn project_point_onto_plane(point: DVec3, normal: DVec3, offset: f64) -> DVec3 {
    let normal = normal.normalize();
    let dist = point.dot(normal) + offset;
    point - dist * normal
}

/// Out-of-plane distance from the pointer tip to the image plane of a slice.
///
/// The slice plane passes through the slice translation and its normal is the
/// third column of the slice rotation. The pointer tip is the translation of
/// the pointer pose.
///
/// A slice with a zero normal column yields `NaN`.
///
/// # Arguments
///
/// * `pointer` - The pose of the tracked pointer.
/// * `slice` - The pose of the ultrasound image plane.
///
/// # Returns
///
/// The Euclidean distance between the tip and its projection onto the plane.
pub fn point_to_slice_distance(pointer: &Pose, slice: &Pose) -> f64 {
    // plane normal and a point lying on the plane
    let normal = slice.column(2).normalize();
    let origin = slice.translation();
    let tip = pointer.translation();

    let offset = -origin.dot(normal);
    let projected = project_point_onto_plane(tip, normal, offset);
    tip.distance(projected)
}

/// Orientation dissimilarity between two poses.
///
/// Both rotation blocks are column-normalized and the squared Frobenius norm
/// of their difference is returned, i.e. `trace((A - B)^T (A - B))`. The
/// result lies in `[0, 12]` and is symmetric in its arguments.
pub fn orientation_distance(a: &Pose, b: &Pose) -> f64 {
    let diff = normalize_columns(a.rotation()) - normalize_columns(b.rotation());
    diff.x_axis.length_squared() + diff.y_axis.length_squared() + diff.z_axis.length_squared()
}

/// Squared Frobenius norm of the difference of two full 4x4 poses.
pub fn pose_distance(a: &Pose, b: &Pose) -> f64 {
    let diff = *a.as_matrix() - *b.as_matrix();
    (0..4).map(|j| diff.col(j).length_squared()).sum()
}

// zero columns stay zero
fn normalize_columns(m: DMat3) -> DMat3 {
    DMat3::from_cols(
        m.x_axis.normalize_or_zero(),
        m.y_axis.normalize_or_zero(),
        m.z_axis.normalize_or_zero(),
    )
}
