/// VulkanBuffer - host-visible buffer written in place

use ash::vk;
use ash::vk::Handle;
use dank_engine::dank::device::{Buffer, BufferDesc};
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_bail_warn, engine_err};
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::buffer_usage_to_vk;

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    /// Taken on drop
    allocation: Option<Allocation>,
    size: u64,
}

impl VulkanBuffer {
    /// Create a CPU-to-GPU buffer for an engine descriptor
    pub fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail_warn!("dank::vulkan::Buffer", "Buffer size must be non-zero");
        }
        Self::with_usage(ctx, desc.size, buffer_usage_to_vk(desc.usage), "buffer")
    }

    /// Create a mapped buffer with raw Vulkan usage flags (staging, etc.)
    pub(crate) fn with_usage(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Self> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = ctx.device.create_buffer(&create_info, None).map_err(|e| {
                engine_err!("dank::vulkan::Buffer", "Failed to create {} of {} bytes: {:?}", name, size, e)
            })?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate(name, requirements, MemoryLocation::CpuToGpu, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("dank::vulkan::Buffer", "Failed to bind {} memory: {:?}", name, e));
            }

            Ok(Self { ctx, buffer, allocation: Some(allocation), size })
        }
    }
}

impl Buffer for VulkanBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            return Err(Error::InvalidResource(format!(
                "buffer write of {} bytes at offset {} exceeds size {}",
                data.len(),
                offset,
                self.size
            )));
        }

        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!("dank::vulkan::Buffer", "Buffer update failed: no GPU allocation"))?;
        let mapped = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!("dank::vulkan::Buffer", "Buffer is not CPU-accessible"))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn handle(&self) -> u64 {
        self.buffer.as_raw()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
