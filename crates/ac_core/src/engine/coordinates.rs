//! Planar vector helpers
//!
//! Gameplay happens on the XZ ground plane; Y carries terrain height and is
//! ignored by all distance, direction, and containment math. These helpers
//! keep that convention in one place.

use nalgebra::Vector3;

use super::constants::EPSILON;

/// Length of the XZ projection.
#[inline]
pub fn flat_length(v: &Vector3<f32>) -> f32 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Distance between two points on the ground plane.
#[inline]
pub fn flat_distance(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    flat_length(&(b - a))
}

/// XZ dot product.
#[inline]
pub fn flat_dot(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.x * b.x + a.z * b.z
}

/// Signed XZ cross product (the Y component of the 3D cross).
///
/// Positive means `b` lies to the left of `a`.
#[inline]
pub fn flat_cross(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    a.x * b.z - a.z * b.x
}

/// Unit vector along the XZ projection, zero when degenerate.
#[inline]
pub fn flat_normalize(v: &Vector3<f32>) -> Vector3<f32> {
    let len = flat_length(v);
    if len < EPSILON {
        Vector3::zeros()
    } else {
        Vector3::new(v.x / len, 0.0, v.z / len)
    }
}

/// 90-degree counterclockwise rotation in the XZ plane.
#[inline]
pub fn perpendicular(v: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(-v.z, 0.0, v.x)
}
