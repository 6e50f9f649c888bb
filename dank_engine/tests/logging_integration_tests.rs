//! Integration tests for renderer logging
//!
//! The log sink is process-wide, so every test here is #[serial].
//!
//! Run with: cargo test --test logging_integration_tests

mod test_utils;

use dank_engine::dank::device::mock_graphics_device::MockGraphicsDevice;
use dank_engine::dank::log::LogSeverity;
use dank_engine::dank::render::{FrameRenderer, Renderer, RendererConfig};
use dank_engine::dank::resource::{MeshId, TextureData, TextureSource, TextureStatus, TriangleMesh};
use dank_engine::dank::scene::DrawableInstance;
use dank_engine::dank::FrameContext;
use dank_engine::log;
use serial_test::serial;
use test_utils::{shader, CaptureLogger, ListScene};

struct FailedTexture;

impl TextureSource for FailedTexture {
    fn poll(&self) -> TextureStatus {
        TextureStatus::invalid()
    }

    fn fetch_data(&self) -> TextureData {
        TextureData::without_pixels(TextureStatus::invalid())
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_invalid_texture_logged_once() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);

    let device = MockGraphicsDevice::new();
    let mut renderer = FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).unwrap();
    let mut ctx = FrameContext::new();
    ctx.meshes.add(MeshId(1), TriangleMesh);
    let texture = ctx.textures.add(FailedTexture);
    ctx.draw_list.push(DrawableInstance::new(MeshId(1), texture));

    for _ in 0..5 {
        renderer.render(&ctx, &ListScene::default()).unwrap();
    }

    let warnings: Vec<_> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.severity == LogSeverity::Warn && e.source == "dank::GpuTextureCache")
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("invalid"));

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_pipeline_failure_logged_as_error() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);

    let device = MockGraphicsDevice::new();
    device.controller().set_fail_pipeline(true);
    assert!(FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).is_err());

    let entries = entries.lock().unwrap();
    let error = entries
        .iter()
        .find(|e| e.severity == LogSeverity::Error)
        .expect("pipeline failure should be logged");
    assert_eq!(error.source, "dank::FrameRenderer");
    assert!(error.file.is_some());
    drop(entries);

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_lifecycle_logged_at_info() {
    let (logger, entries) = CaptureLogger::new();
    log::set_logger(logger);

    let device = MockGraphicsDevice::new();
    let mut renderer = FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).unwrap();
    renderer.release().unwrap();

    let messages: Vec<String> = entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.severity == LogSeverity::Info)
        .map(|e| e.message.clone())
        .collect();
    assert!(messages.iter().any(|m| m.starts_with("Renderer initialized")));
    assert!(messages.iter().any(|m| m == "Renderer released"));

    log::reset_logger();
}
