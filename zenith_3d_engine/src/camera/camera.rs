/// Camera: view and projection matrices plus everything derived from them.
///
/// The caller computes view/projection from high-level parameters
/// (position, rotation, FOV, ...). The camera derives the inverses, the
/// frustum planes and the frustum corners the render passes need.
///
/// Projections follow glam's `*_rh` convention: clip-space depth in [0, 1].

use glam::{Mat4, Vec3, Vec4Swizzles};
use super::frustum::Frustum;

/// NDC corners in `Camera::frustum_corners` order: near face then far face,
/// each as (-x,-y), (+x,-y), (+x,+y), (-x,+y).
const NDC_CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

#[derive(Debug, Clone)]
pub struct Camera {
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Create a camera; the frustum is extracted from `projection * view`.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view_matrix: view,
            projection_matrix: projection,
            frustum: Frustum::from_view_projection(&(projection * view)),
        }
    }

    // ===== GETTERS =====

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix (perspective or orthographic).
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.view_matrix.inverse()
    }

    pub fn inverse_projection_matrix(&self) -> Mat4 {
        self.projection_matrix.inverse()
    }

    /// Clip space back to world space (used to rebuild positions from depth).
    pub fn inverse_view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix().inverse()
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        self.inverse_view_matrix().w_axis.xyz()
    }

    /// Frustum planes.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// The 8 world-space frustum corners (near face first).
    pub fn frustum_corners(&self) -> [Vec3; 8] {
        let inverse = self.inverse_view_projection_matrix();
        NDC_CORNERS.map(|ndc| inverse.project_point3(ndc))
    }

    // ===== SETTERS =====

    pub fn set_view(&mut self, matrix: Mat4) {
        self.view_matrix = matrix;
        self.refresh_frustum();
    }

    pub fn set_projection(&mut self, matrix: Mat4) {
        self.projection_matrix = matrix;
        self.refresh_frustum();
    }

    fn refresh_frustum(&mut self) {
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }
}

impl Default for Camera {
    /// Identity view looking down -Z with a 60° perspective.
    fn default() -> Self {
        Self::new(
            Mat4::IDENTITY,
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 500.0),
        )
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
