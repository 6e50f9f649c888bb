use glam::{Mat4, Vec3};
use super::*;

fn ortho_frustum() -> Frustum {
    // Looking down -Z from z = 5, box of +-10 in x/y, depth 0.1..100
    let projection = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    Frustum::from_view_projection(&(projection * view))
}

// ============================================================================
// Frustum::from_view_projection
// ============================================================================

#[test]
fn test_planes_are_normalized() {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let frustum = Frustum::from_view_projection(&(projection * view));

    for plane in &frustum.planes {
        assert!((plane.truncate().length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_plane_normals_point_inward() {
    let frustum = ortho_frustum();
    assert!(frustum.planes[PLANE_LEFT].x > 0.0);
    assert!(frustum.planes[PLANE_RIGHT].x < 0.0);
    assert!(frustum.planes[PLANE_BOTTOM].y > 0.0);
    assert!(frustum.planes[PLANE_TOP].y < 0.0);
    // camera looks down -Z: near faces -Z, far faces +Z
    assert!(frustum.planes[PLANE_NEAR].z < 0.0);
    assert!(frustum.planes[PLANE_FAR].z > 0.0);
}

// ============================================================================
// Containment
// ============================================================================

#[test]
fn test_contains_point() {
    let frustum = ortho_frustum();
    assert!(frustum.contains_point(Vec3::ZERO));
    assert!(frustum.contains_point(Vec3::new(9.0, -9.0, -50.0)));
    assert!(!frustum.contains_point(Vec3::new(11.0, 0.0, 0.0)));
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
    assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
}

#[test]
fn test_intersects_sphere() {
    let frustum = ortho_frustum();
    assert!(frustum.intersects_sphere(Vec3::ZERO, 1.0));
    // center outside, radius reaches back in
    assert!(frustum.intersects_sphere(Vec3::new(10.5, 0.0, 0.0), 1.0));
    assert!(!frustum.intersects_sphere(Vec3::new(12.0, 0.0, 0.0), 1.0));
}

#[test]
fn test_distance_sign() {
    let frustum = ortho_frustum();
    assert!((frustum.distance(PLANE_LEFT, Vec3::ZERO) - 10.0).abs() < 1e-4);
    assert!(frustum.distance(PLANE_RIGHT, Vec3::new(15.0, 0.0, 0.0)) < 0.0);
}
