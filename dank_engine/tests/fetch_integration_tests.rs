//! Integration tests for URI textures fetched on the worker pool
//!
//! Textures decode on a `FetchPool` backed by an in-memory loader and are
//! drawn by the frame renderer once they report Ready. No GPU required.
//!
//! Run with: cargo test --test fetch_integration_tests

mod test_utils;

use dank_engine::dank::device::mock_graphics_device::{MockCommand, MockGraphicsDevice};
use dank_engine::dank::os::{MemoryResourceLoader, Uri};
use dank_engine::dank::render::{FrameRenderer, Renderer, RendererConfig};
use dank_engine::dank::resource::{
    FetchPool, MeshId, ResourceState, TextureSource, TriangleMesh, UriTexture,
};
use dank_engine::dank::scene::DrawableInstance;
use dank_engine::dank::FrameContext;
use std::sync::Arc;
use test_utils::{png_bytes, shader, wait_until, ListScene};

fn pool() -> Arc<FetchPool> {
    let loader = Arc::new(MemoryResourceLoader::new());
    loader.insert("mem://textures/red.png", png_bytes(8, 4, [255, 0, 0, 255]));
    loader.insert("mem://textures/broken.png", vec![0u8, 1, 2, 3]);
    Arc::new(FetchPool::new(2, loader).unwrap())
}

fn drew(commands: Option<Vec<MockCommand>>) -> bool {
    commands
        .unwrap_or_default()
        .iter()
        .any(|c| matches!(c, MockCommand::DrawIndexed { .. }))
}

// ============================================================================
// FETCH THEN DRAW
// ============================================================================

#[test]
fn test_integration_uri_texture_is_drawn_once_decoded() {
    let device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut renderer = FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).unwrap();

    let texture = Arc::new(UriTexture::new(Uri::parse("mem://textures/red.png"), pool()));
    let mut ctx = FrameContext::new();
    ctx.meshes.add(MeshId(1), TriangleMesh);
    let id = ctx.textures.add_shared(texture.clone());
    ctx.draw_list.push(DrawableInstance::new(MeshId(1), id));
    let scene = ListScene::default();

    // keep rendering until the upload lands; loading frames draw nothing
    let drawn = wait_until(|| {
        renderer.render(&ctx, &scene).unwrap();
        let active = renderer.texture_cache().is_active(id);
        assert_eq!(drew(controller.last_submission()), active);
        active
    });
    assert!(drawn);

    let bound = renderer.texture_cache().bindings();
    assert_eq!(bound.len(), 1);
    assert_eq!((bound[0].1.desc().width, bound[0].1.desc().height), (8, 4));
    assert_eq!(controller.stats().texture_uploads, 1);
}

#[test]
fn test_integration_failed_fetch_is_never_drawn() {
    let device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut renderer = FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).unwrap();

    let texture = Arc::new(UriTexture::new(Uri::parse("mem://textures/broken.png"), pool()));
    let mut ctx = FrameContext::new();
    ctx.meshes.add(MeshId(1), TriangleMesh);
    let id = ctx.textures.add_shared(texture.clone());
    ctx.draw_list.push(DrawableInstance::new(MeshId(1), id));
    let scene = ListScene::default();

    assert!(wait_until(|| {
        renderer.render(&ctx, &scene).unwrap();
        renderer.texture_cache().state(id) == Some(ResourceState::Invalid)
    }));

    for _ in 0..5 {
        renderer.render(&ctx, &scene).unwrap();
        assert!(!drew(controller.last_submission()));
    }
    assert_eq!(controller.stats().textures_created, 0);
}

#[test]
fn test_integration_missing_uri_is_invalid() {
    let texture = UriTexture::new(Uri::parse("mem://textures/nowhere.png"), pool());
    assert!(wait_until(|| texture.poll().state == ResourceState::Invalid));
}

// ============================================================================
// RELOAD AND CANCEL
// ============================================================================

#[test]
fn test_integration_reload_uploads_new_stamp() {
    let device = MockGraphicsDevice::new();
    let controller = device.controller();
    let mut renderer = FrameRenderer::new(device, RendererConfig::default(), shader(), shader()).unwrap();

    let texture = Arc::new(UriTexture::new(Uri::parse("mem://textures/red.png"), pool()));
    let mut ctx = FrameContext::new();
    ctx.meshes.add(MeshId(1), TriangleMesh);
    let id = ctx.textures.add_shared(texture.clone());
    let scene = ListScene::default();

    assert!(wait_until(|| {
        renderer.render(&ctx, &scene).unwrap();
        renderer.texture_cache().is_active(id)
    }));

    texture.reload();
    assert!(wait_until(|| {
        renderer.render(&ctx, &scene).unwrap();
        controller.stats().texture_uploads == 2
    }));
    assert!(renderer.texture_cache().is_active(id));
    // same extent, so the GPU texture is reused
    assert_eq!(controller.stats().textures_created, 1);
}

#[test]
fn test_integration_cancelled_fetch_reports_idle() {
    let texture = UriTexture::new(Uri::parse("mem://textures/red.png"), pool());
    texture.poll();
    texture.cancel();
    assert!(wait_until(|| texture.poll().state == ResourceState::Idle));
}
