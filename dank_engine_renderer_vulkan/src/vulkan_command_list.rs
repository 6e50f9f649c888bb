/// VulkanCommandList - one primary command buffer per frame slot
///
/// Render passes use dynamic rendering straight onto the swapchain image
/// view, so the list needs the current swapchain views rather than
/// framebuffer objects. Target layout changes are explicit barriers
/// recorded through `transition`.

use ash::vk;
use dank_engine::dank::device::{
    ArgumentTable, Buffer, ClearValue, CommandList, Pipeline, Rect2D, RenderTarget, TargetState, Viewport,
};
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_err, engine_error};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_argument_table::VulkanArgumentTable;
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::target_transition;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_swapchain::SharedSwapchainImages;

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// Vulkan command list implementation
pub struct VulkanCommandList {
    ctx: Arc<GpuContext>,
    swapchain_images: SharedSwapchainImages,
    command_pool: vk::CommandPool,
    pub(crate) command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
}

impl VulkanCommandList {
    pub fn new(ctx: Arc<GpuContext>, swapchain_images: SharedSwapchainImages) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = ctx
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("dank::vulkan::CommandList", "Failed to create command pool: {:?}", e))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match ctx.device.allocate_command_buffers(&alloc_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!(
                        "dank::vulkan::CommandList",
                        "Failed to allocate command buffer: {:?}",
                        e
                    ));
                }
            };

            Ok(Self {
                ctx,
                swapchain_images,
                command_pool,
                command_buffer,
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    fn ensure_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn ensure_in_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Command requires an active render pass".to_string()));
        }
        Ok(())
    }

    fn target_image(&self, target: &RenderTarget) -> Result<(vk::Image, vk::ImageView)> {
        let images = self
            .swapchain_images
            .read()
            .map_err(|_| Error::BackendError("Swapchain image lock poisoned".to_string()))?;
        let index = target.index as usize;
        match (images.images.get(index), images.views.get(index)) {
            (Some(&image), Some(&view)) => Ok((image, view)),
            _ => Err(Error::BackendError(format!("Render target {} is not a swapchain image", target.index))),
        }
    }
}

fn vk_buffer(buffer: &Arc<dyn Buffer>) -> Result<vk::Buffer> {
    buffer
        .as_any()
        .downcast_ref::<VulkanBuffer>()
        .map(|buffer| buffer.buffer)
        .ok_or_else(|| Error::InvalidResource("Buffer is not a Vulkan buffer".to_string()))
}

fn vk_pipeline(pipeline: &Arc<dyn Pipeline>) -> Result<&VulkanPipeline> {
    pipeline
        .as_any()
        .downcast_ref::<VulkanPipeline>()
        .ok_or_else(|| Error::InvalidResource("Pipeline is not a Vulkan pipeline".to_string()))
}

impl CommandList for VulkanCommandList {
    fn reset(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| engine_err!("dank::vulkan::CommandList", "Failed to reset command pool: {:?}", e))?;

            let begin_info =
                vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("dank::vulkan::CommandList", "Failed to begin command buffer: {:?}", e))?;
        }
        self.is_recording = true;
        self.in_render_pass = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            return Err(Error::BackendError("Command list closed inside a render pass".to_string()));
        }
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("dank::vulkan::CommandList", "Failed to end command buffer: {:?}", e))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn transition(&mut self, target: &RenderTarget, from: TargetState, to: TargetState) -> Result<()> {
        self.ensure_recording()?;
        if from == to {
            return Ok(());
        }
        let (image, _) = self.target_image(target)?;
        let transition = target_transition(from, to);
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(transition.old_layout)
            .new_layout(transition.new_layout)
            .src_access_mask(transition.src_access)
            .dst_access_mask(transition.dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(COLOR_RANGE);
        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        Ok(())
    }

    fn begin_render_pass(&mut self, target: &RenderTarget, clear: ClearValue) -> Result<()> {
        self.ensure_recording()?;
        if self.in_render_pass {
            engine_error!("dank::vulkan::CommandList", "begin_render_pass inside an active render pass");
            return Err(Error::BackendError("Render pass already active".to_string()));
        }
        let (_, view) = self.target_image(target)?;

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue { color: vk::ClearColorValue { float32: clear.0 } });
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: target.width, height: target.height },
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass()?;
        unsafe {
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.ensure_recording()?;
        let pipeline = vk_pipeline(pipeline)?;
        unsafe {
            self.ctx
                .device
                .cmd_bind_pipeline(self.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
        }
        Ok(())
    }

    fn bind_argument_table(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        table: &Arc<dyn ArgumentTable>,
    ) -> Result<()> {
        self.ensure_recording()?;
        let pipeline = vk_pipeline(pipeline)?;
        let table = table
            .as_any()
            .downcast_ref::<VulkanArgumentTable>()
            .ok_or_else(|| Error::InvalidResource("Argument table is not a Vulkan table".to_string()))?;
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                set_index,
                &[table.set],
                &[],
            );
        }
        Ok(())
    }

    fn bind_instance_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.ensure_recording()?;
        let buffer = vk_buffer(buffer)?;
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.ensure_recording()?;
        let buffer = vk_buffer(buffer)?;
        unsafe {
            self.ctx
                .device
                .cmd_bind_index_buffer(self.command_buffer, buffer, offset, vk::IndexType::UINT32);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.ensure_in_render_pass()?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.ensure_in_render_pass()?;
        let buffer = vk_buffer(buffer)?;
        unsafe {
            self.ctx
                .device
                .cmd_draw_indexed_indirect(self.command_buffer, buffer, offset, draw_count, stride);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with it
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
