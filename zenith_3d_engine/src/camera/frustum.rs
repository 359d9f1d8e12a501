/// Frustum: six clipping planes.
///
/// Each plane is a Vec4 (A, B, C, D) with an inward-pointing unit normal:
/// a point P is inside when dot(plane, (P, 1)) >= 0 for all planes.

use glam::{Mat4, Vec3, Vec4};

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Gribb & Hartmann extraction for a [0, 1] clip depth range: the near
    /// plane is row 2 alone rather than row 3 + row 2.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let row = |i: usize| vp.row(i);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to plane `index` (positive = inside)
    pub fn distance(&self, index: usize, point: Vec3) -> f32 {
        self.planes[index].dot(point.extend(1.0))
    }

    /// Whether `point` lies inside all six planes (with tolerance `epsilon`)
    pub fn contains_point(&self, point: Vec3, epsilon: f32) -> bool {
        (0..6).all(|i| self.distance(i, point) >= -epsilon)
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
