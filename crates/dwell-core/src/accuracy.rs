//! Gaze accuracy measures used for calibration checks.

use crate::vector::Vec3;

/// Unit direction from `from` towards `to`. Zero when the points coincide.
pub fn direction_to(from: Vec3, to: Vec3) -> Vec3 {
    (to - from).normalize()
}

/// Horizontal angular error in degrees between a ground-truth direction and
/// a measured gaze direction. Both are flattened onto the XZ plane first, so
/// vertical offset is ignored.
pub fn gaze_angle_error_xz(ground_truth: Vec3, gaze: Vec3) -> f64 {
    let truth = ground_truth.project_on_plane(Vec3::UP);
    let measured = gaze.project_on_plane(Vec3::UP);
    truth.angle_between(measured)
}
