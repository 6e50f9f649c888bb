/*!
# Dank Engine - Vulkan Backend

Vulkan implementation of the `dank_engine` graphics device contract.

This crate implements the `GraphicsDevice` trait with Ash for the Vulkan
bindings and gpu-allocator for memory. Engine fences map to timeline
semaphores, argument tables to descriptor sets, and render passes to
dynamic rendering with explicit layout barriers.

```no_run
use dank_engine::dank::render::RendererConfig;
use dank_engine_renderer_vulkan::dank::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> dank_engine::dank::Result<()> {
let device = VulkanGraphicsDevice::new(window, &RendererConfig::default())?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_argument_table;
mod vulkan_fence;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_command_list;
mod vulkan_device;

pub mod dank {
    pub use crate::vulkan_device::{create_renderer, VulkanGraphicsDevice};
    pub use crate::vulkan_context::GpuContext;
    pub use crate::vulkan_buffer::VulkanBuffer;
    pub use crate::vulkan_texture::VulkanTexture;
    pub use crate::vulkan_argument_table::VulkanArgumentTable;
    pub use crate::vulkan_fence::VulkanFence;
    pub use crate::vulkan_pipeline::VulkanPipeline;
    pub use crate::vulkan_swapchain::VulkanSwapchain;
    pub use crate::vulkan_command_list::VulkanCommandList;
    pub use crate::debug::ValidationStats;
}
