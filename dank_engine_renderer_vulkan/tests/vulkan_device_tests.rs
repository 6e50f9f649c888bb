//! GPU tests for VulkanGraphicsDevice
//!
//! Every test needs a Vulkan 1.3 GPU and a display, so all are ignored by
//! default.
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use dank_engine::dank::device::{
    ArgumentTableDesc, BindingResource, BufferDesc, BufferUsage, GraphicsDevice, PipelineDesc, ShaderSource,
    TextureDesc, TextureFormat,
};
use dank_engine::dank::render::{fragment_table_desc, vertex_table_desc, GpuInstance, RendererConfig};
use dank_engine::dank::Error;
use dank_engine_renderer_vulkan::dank::VulkanGraphicsDevice;
use std::sync::Arc;
use winit::event_loop::EventLoop;
use winit::window::Window;

#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let attributes = Window::default_attributes()
        .with_title("Vulkan device test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false);
    let window = event_loop.create_window(attributes).unwrap();
    (window, event_loop)
}

fn create_device(window: &Window) -> VulkanGraphicsDevice {
    VulkanGraphicsDevice::new(window, &RendererConfig::default()).unwrap()
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_update_in_range() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let buffer = device.create_buffer(BufferDesc { size: 256, usage: BufferUsage::VERTEX }).unwrap();
    assert_eq!(buffer.size(), 256);
    buffer.update(128, &[7u8; 128]).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_update_out_of_range() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let buffer = device.create_buffer(BufferDesc { size: 64, usage: BufferUsage::STORAGE }).unwrap();
    let result = buffer.update(32, &[0u8; 64]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_empty_buffer_rejected() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let result = device.create_buffer(BufferDesc { size: 0, usage: BufferUsage::UNIFORM });
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

// ============================================================================
// TEXTURES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_texture_upload() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let desc = TextureDesc { width: 4, height: 4, format: TextureFormat::Rgba8Unorm };
    let texture = device.create_texture(desc).unwrap();
    assert_eq!(texture.desc().width, 4);

    let pixels: Vec<u8> = (0..64).collect();
    device.write_texture(&texture, &pixels).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_texture_upload_wrong_size() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let desc = TextureDesc { width: 4, height: 4, format: TextureFormat::Rgba8Unorm };
    let texture = device.create_texture(desc).unwrap();
    let result = device.write_texture(&texture, &[0u8; 10]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

// ============================================================================
// ARGUMENT TABLES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_argument_table_writes() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let table = device.create_argument_table(vertex_table_desc()).unwrap();
    let camera = device.create_buffer(BufferDesc { size: 64, usage: BufferUsage::UNIFORM }).unwrap();
    let blob = device.create_buffer(BufferDesc { size: 1024, usage: BufferUsage::STORAGE }).unwrap();

    table
        .write(&[
            (0, BindingResource::UniformBuffer(Arc::clone(&camera))),
            (1, BindingResource::StorageBuffer(Arc::clone(&blob))),
            (2, BindingResource::StorageBuffer(blob)),
        ])
        .unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_sparse_texture_table() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let table = device.create_argument_table(fragment_table_desc(128)).unwrap();
    let desc = TextureDesc { width: 1, height: 1, format: TextureFormat::Rgba8Unorm };
    let texture = device.create_texture(desc).unwrap();
    device.write_texture(&texture, &[255u8; 4]).unwrap();

    // Only slot 42 is ever written
    table.write(&[(42, BindingResource::SampledTexture(texture))]).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_argument_table_kind_mismatch() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let desc: ArgumentTableDesc = vertex_table_desc();
    let table = device.create_argument_table(desc).unwrap();
    let buffer = device.create_buffer(BufferDesc { size: 64, usage: BufferUsage::STORAGE }).unwrap();

    let result = table.write(&[(0, BindingResource::StorageBuffer(buffer))]);
    assert!(result.is_err());
}

// ============================================================================
// FENCES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_fence_signal_and_wait() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let fence = device.create_fence(0).unwrap();
    assert_eq!(fence.completed_value().unwrap(), 0);

    device.signal_fence(&fence, 1).unwrap();
    device.signal_fence(&fence, 2).unwrap();
    fence.wait_for(2).unwrap();
    assert_eq!(fence.completed_value().unwrap(), 2);

    // Already reached values return immediately
    fence.wait_for(1).unwrap();
}

// ============================================================================
// PIPELINE AND SURFACE
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_pipeline_rejects_invalid_shaders() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let result = device.create_pipeline(PipelineDesc {
        vertex_shader: ShaderSource::new(vec![0xDEAD_BEEF; 8], "main"),
        fragment_shader: ShaderSource::new(Vec::new(), "main"),
        instance_layout: GpuInstance::layout(),
        argument_tables: vec![vertex_table_desc(), fragment_table_desc(128)],
    });
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_acquire_skips_zero_sized_surface() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    device.resize(0, 0).unwrap();
    assert!(device.acquire_render_target().unwrap().is_none());
    assert_eq!(device.surface_size(), (0, 0));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_validation_clean_after_setup() {
    let (window, _event_loop) = create_test_window();
    let mut device = create_device(&window);

    let _table = device.create_argument_table(fragment_table_desc(128)).unwrap();
    let _fence = device.create_fence(0).unwrap();
    let _commands = device.create_command_list().unwrap();
    device.wait_idle().unwrap();

    assert_eq!(device.validation_stats().errors, 0);
}
