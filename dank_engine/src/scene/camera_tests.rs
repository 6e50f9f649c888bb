use glam::{Mat4, Vec3, Vec4};
use super::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn sized_camera() -> Camera {
    let mut camera = Camera::new();
    camera.on_view_resize(800.0, 600.0);
    camera.update(0.0);
    camera
}

// ============================================================================
// DEFAULTS AND RESIZE
// ============================================================================

#[test]
fn test_camera_defaults() {
    let camera = Camera::new();
    assert_eq!(camera.fov, 70.0);
    assert_eq!(camera.near, 0.1);
    assert_eq!(camera.far, 100.0);
    assert_eq!(camera.scale, 1.0);
    assert_eq!(camera.gamma, 1.0);
    assert_eq!(camera.mode, ProjectionMode::Orthographic);
    assert_eq!(camera.up, Vec3::Y);
}

#[test]
fn test_on_view_resize_sets_viewport() {
    let mut camera = Camera::new();
    camera.on_view_resize(1280.0, 720.0);
    assert_eq!(camera.viewport(), Vec4::new(0.0, 0.0, 1280.0, 720.0));
}

#[test]
fn test_on_view_resize_ignores_empty_size() {
    let mut camera = Camera::new();
    camera.on_view_resize(640.0, 480.0);
    camera.on_view_resize(0.0, 0.0);
    assert_eq!(camera.viewport(), Vec4::new(0.0, 0.0, 640.0, 480.0));
}

// ============================================================================
// UPDATE
// ============================================================================

#[test]
fn test_update_advances_time() {
    let mut camera = sized_camera();
    camera.update(0.25);
    camera.update(0.25);
    assert!(approx(camera.time, 0.5));
}

#[test]
fn test_orthographic_spans_view_over_scale() {
    let mut camera = Camera::new();
    camera.on_view_resize(800.0, 600.0);
    camera.scale = 2.0;
    camera.update(0.0);

    let expected = Mat4::orthographic_rh(-400.0, 400.0, -300.0, 300.0, 0.1, 100.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, 1e-6));
}

#[test]
fn test_perspective_uses_aspect_ratio() {
    let mut camera = Camera::new();
    camera.mode = ProjectionMode::Perspective;
    camera.on_view_resize(800.0, 400.0);
    camera.update(0.0);

    let expected = Mat4::perspective_rh(70f32.to_radians(), 2.0, 0.1, 100.0);
    assert!(camera.projection_matrix().abs_diff_eq(expected, 1e-6));
}

#[test]
fn test_update_without_viewport_stays_finite() {
    let mut camera = Camera::new();
    camera.update(0.016);
    assert!(camera.view_projection_matrix().is_finite());
}

#[test]
fn test_frustum_follows_camera() {
    let mut camera = sized_camera();
    camera.position = Vec3::new(0.0, 0.0, 10.0);
    camera.update(0.0);
    assert!(camera.frustum().contains_point(Vec3::ZERO));
    assert!(!camera.frustum().contains_point(Vec3::new(0.0, 0.0, 20.0)));
}

// ============================================================================
// SCREEN MAPPING
// ============================================================================

#[test]
fn test_screen_center_maps_to_target_axis() {
    let camera = sized_camera();
    let world = camera.screen_to_world(400.0, 300.0, 0.5);
    assert!(approx(world.x, 0.0));
    assert!(approx(world.y, 0.0));
}

#[test]
fn test_world_to_screen_inverts_screen_to_world() {
    let camera = sized_camera();
    let world = camera.screen_to_world(120.0, 450.0, 0.5);
    let screen = camera.world_to_screen(world, &Mat4::IDENTITY);
    assert!(approx(screen.x, 120.0));
    assert!(approx(screen.y, 450.0));
}

#[test]
fn test_world_to_screen_applies_model() {
    let camera = sized_camera();
    let model = Mat4::from_translation(Vec3::new(80.0, 0.0, 0.0));
    let screen = camera.world_to_screen(Vec3::ZERO, &model);
    // ortho spans -800..800 over 800 px: 80 units = 40 px
    assert!(approx(screen.x, 440.0));
    assert!(approx(screen.y, 300.0));
}

// ============================================================================
// UNIFORM
// ============================================================================

#[test]
fn test_uniform_layout() {
    assert_eq!(std::mem::size_of::<CameraUniform>(), 240);
    assert_eq!(std::mem::align_of::<CameraUniform>(), 16);
}

#[test]
fn test_uniform_contents() {
    let mut camera = Camera::new();
    camera.on_view_resize(800.0, 600.0);
    camera.position = Vec3::new(1.0, 2.0, 3.0);
    camera.gamma = 2.2;
    camera.update(1.5);

    let block = camera.uniform();
    assert_eq!(block.position, Vec4::new(1.0, 2.0, 3.0, 0.0));
    assert_eq!(block.light_view_position, Vec4::new(-1.0, 2.0, -3.0, 0.0));
    assert_eq!(block.view_proj, camera.view_projection_matrix());
    assert_eq!(block.near, 0.1);
    assert_eq!(block.far, 100.0);
    assert_eq!(block.gamma, 2.2);
    assert_eq!(block.time, 1.5);
    assert_eq!(bytemuck::bytes_of(&block).len(), 240);
}
