use glam::{Mat4, Vec3};
use super::*;

fn test_camera() -> Camera {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 10.0), Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 50.0);
    Camera::new(view, proj)
}

fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < 1e-2
}

// ============================================================================
// Matrices
// ============================================================================

#[test]
fn test_view_projection_matrix() {
    let camera = test_camera();
    assert_eq!(camera.view_projection_matrix(), *camera.projection_matrix() * *camera.view_matrix());
}

#[test]
fn test_inverse_view_projection_round_trips() {
    let camera = test_camera();
    let product = camera.view_projection_matrix() * camera.inverse_view_projection_matrix();
    assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
}

#[test]
fn test_position_from_view() {
    assert!(approx(test_camera().position(), Vec3::new(0.0, 2.0, 10.0)));
}

// ============================================================================
// Frustum corners
// ============================================================================

#[test]
fn test_frustum_corners_match_near_and_far_distances() {
    // 90° FOV, aspect 1: half-extent equals depth
    let corners = test_camera().frustum_corners();

    assert!(approx(corners[0], Vec3::new(-1.0, 1.0, 9.0)));
    assert!(approx(corners[2], Vec3::new(1.0, 3.0, 9.0)));
    assert!(approx(corners[4], Vec3::new(-50.0, -48.0, -40.0)));
    assert!(approx(corners[6], Vec3::new(50.0, 52.0, -40.0)));
}

#[test]
fn test_frustum_corners_lie_inside_frustum() {
    let camera = test_camera();
    for corner in camera.frustum_corners() {
        assert!(camera.frustum().contains_point(corner, 1e-2));
    }
}

// ============================================================================
// Setters
// ============================================================================

#[test]
fn test_set_view_refreshes_frustum() {
    let mut camera = test_camera();
    let before = *camera.frustum();
    camera.set_view(Mat4::look_at_rh(Vec3::new(30.0, 0.0, 0.0), Vec3::ZERO, Vec3::Y));
    assert_ne!(before, *camera.frustum());
    assert!(camera.frustum().contains_point(Vec3::ZERO, 0.0));
}

#[test]
fn test_set_projection_refreshes_frustum() {
    let mut camera = test_camera();
    camera.set_projection(Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 1.0, 50.0));
    assert!(!camera.frustum().contains_point(Vec3::new(5.0, 2.0, 0.0), 0.0));
}
