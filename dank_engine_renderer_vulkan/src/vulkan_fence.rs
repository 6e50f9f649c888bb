/// VulkanFence - timeline semaphore behind the engine's monotonic fence

use ash::vk;
use dank_engine::dank::device::Fence;
use dank_engine::dank::Result;
use dank_engine::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanFence {
    pub fn new(ctx: Arc<GpuContext>, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let semaphore = unsafe { ctx.device.create_semaphore(&info, None) }
            .map_err(|e| engine_err!("dank::vulkan::Fence", "Failed to create timeline semaphore: {:?}", e))?;
        Ok(Self { ctx, semaphore })
    }
}

impl Fence for VulkanFence {
    fn completed_value(&self) -> Result<u64> {
        unsafe { self.ctx.device.get_semaphore_counter_value(self.semaphore) }
            .map_err(|e| engine_err!("dank::vulkan::Fence", "Failed to read timeline value: {:?}", e))
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        if self.completed_value()? >= value {
            return Ok(());
        }
        let semaphores = [self.semaphore];
        let values = [value];
        let info = vk::SemaphoreWaitInfo::default().semaphores(&semaphores).values(&values);
        unsafe { self.ctx.device.wait_semaphores(&info, u64::MAX) }
            .map_err(|e| engine_err!("dank::vulkan::Fence", "Failed to wait for timeline value {}: {:?}", value, e))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
