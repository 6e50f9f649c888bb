//! Unit tests for engine.rs
//!
//! Tests frame timing, pause, input forwarding, scene/camera driving and
//! the fps log line. Tests that install a capture logger are #[serial].

use crate::dank::Engine;
use crate::frame_context::FrameContext;
use crate::input::{InputEvent, InputKey};
use crate::log::{self, LogEntry, Logger};
use crate::resource::{MeshId, TextureId, TriangleMesh};
use crate::scene::{Camera, DrawableInstance, Scene};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST HELPERS
// ============================================================================

#[derive(Default)]
struct TestScene {
    camera: Camera,
    updates: u32,
    seen_delta: Vec<f32>,
    saw_key_down: bool,
}

impl Scene for TestScene {
    fn update(&mut self, ctx: &mut FrameContext) {
        self.updates += 1;
        self.seen_delta.push(ctx.delta_time);
        self.saw_key_down |= ctx.input.is_down(InputKey::Space);

        if ctx.meshes.is_empty() {
            ctx.meshes.add(MeshId(1), TriangleMesh);
        }
        ctx.draw_list.clear();
        ctx.draw_list.push(DrawableInstance::new(MeshId(1), TextureId(1)));
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}

struct CaptureLogger {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.messages.lock().unwrap().push(entry.message.clone());
    }
}

// ============================================================================
// TIMING
// ============================================================================

#[test]
fn test_update_advances_timing() {
    let mut engine = Engine::new(TestScene::default());
    engine.update(0.5);
    engine.update(0.25);

    let ctx = engine.context();
    assert_eq!(ctx.delta_time, 0.25);
    assert_eq!(ctx.absolute_time, 0.75);
    assert_eq!(ctx.absolute_frame, 2);
    assert_eq!(engine.scene().updates, 2);
}

#[test]
fn test_paused_freezes_timing() {
    let mut engine = Engine::new(TestScene::default());
    engine.update(0.5);
    engine.set_paused(true);
    engine.update(0.5);

    let ctx = engine.context();
    assert_eq!(ctx.delta_time, 0.0);
    assert_eq!(ctx.absolute_time, 0.5);
    assert_eq!(ctx.absolute_frame, 1);
    // the scene still runs while paused
    assert_eq!(engine.scene().seen_delta, vec![0.5, 0.0]);
}

#[test]
fn test_negative_delta_clamped() {
    let mut engine = Engine::new(TestScene::default());
    engine.update(-1.0);
    assert_eq!(engine.context().delta_time, 0.0);
}

#[test]
fn test_first_tick_has_zero_delta() {
    let mut engine = Engine::new(TestScene::default());
    assert_eq!(engine.tick(), 0.0);
    let dt = engine.tick();
    assert!(dt >= 0.0);
    assert_eq!(engine.context().absolute_frame, 2);
}

// ============================================================================
// SCENE, CAMERA AND INPUT
// ============================================================================

#[test]
fn test_scene_fills_draw_list() {
    let mut engine = Engine::new(TestScene::default());
    engine.update(0.016);
    engine.update(0.016);

    let (ctx, _scene) = engine.frame();
    assert_eq!(ctx.draw_list.len(), 1);
    assert_eq!(ctx.meshes.len(), 1);
}

#[test]
fn test_camera_updated_after_scene() {
    let mut engine = Engine::new(TestScene::default());
    engine.on_view_resize(800.0, 600.0);
    engine.update(0.5);

    let camera = engine.scene().camera();
    assert_eq!(camera.viewport().z, 800.0);
    assert_eq!(camera.time, 0.5);
}

#[test]
fn test_events_reach_scene_input() {
    let mut engine = Engine::new(TestScene::default());
    engine.handle_event(&InputEvent::KeyDown(InputKey::Space));
    engine.update(0.016);
    assert!(engine.scene().saw_key_down);
}

// ============================================================================
// FPS
// ============================================================================

#[test]
#[serial]
fn test_fps_logged_each_second() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(CaptureLogger { messages: messages.clone() });

    let mut engine = Engine::new(TestScene::default());
    for _ in 0..4 {
        engine.update(0.25);
    }
    log::reset_logger();

    assert_eq!(engine.context().frames_per_second, 4);
    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m == "fps: 4 | 250.00 ms"));
}

#[test]
fn test_fps_zero_before_first_second() {
    let mut engine = Engine::new(TestScene::default());
    engine.update(0.1);
    assert_eq!(engine.context().frames_per_second, 0);
}
