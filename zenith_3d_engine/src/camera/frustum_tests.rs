use glam::{Mat4, Vec3};
use super::*;

fn perspective_vp() -> Mat4 {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    projection * view
}

// ============================================================================
// Frustum::from_view_projection
// ============================================================================

#[test]
fn test_planes_are_normalized() {
    for vp in [Mat4::IDENTITY, perspective_vp(), Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0)] {
        let frustum = Frustum::from_view_projection(&vp);
        for plane in &frustum.planes {
            assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
        }
    }
}

#[test]
fn test_identity_near_plane_is_z_zero() {
    // Identity VP → clip volume x,y in [-1, 1], z in [0, 1]
    let frustum = Frustum::from_view_projection(&Mat4::IDENTITY);
    assert!(frustum.distance(PLANE_NEAR, Vec3::new(0.0, 0.0, 0.0)).abs() < 1e-6);
    assert!((frustum.distance(PLANE_FAR, Vec3::new(0.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
    assert!(frustum.contains_point(Vec3::new(0.5, -0.5, 0.5), 0.0));
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -0.5), 0.0));
}

#[test]
fn test_perspective_contains_origin() {
    let frustum = Frustum::from_view_projection(&perspective_vp());
    assert!(frustum.contains_point(Vec3::ZERO, 0.0));
    // Behind the eye
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 10.0), 0.0));
    // Far beyond the far plane
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0), 0.0));
    // Off to the side
    assert!(!frustum.contains_point(Vec3::new(50.0, 0.0, 0.0), 0.0));
}

#[test]
fn test_left_plane_faces_inward() {
    let frustum = Frustum::from_view_projection(&perspective_vp());
    assert!(frustum.planes[PLANE_LEFT].x > 0.0);
    assert!(frustum.planes[PLANE_RIGHT].x < 0.0);
    assert!(frustum.planes[PLANE_BOTTOM].y > 0.0);
    assert!(frustum.planes[PLANE_TOP].y < 0.0);
}
