/// VulkanTexture - sampled 2D image plus its staging upload path

use ash::vk;
use ash::vk::Handle;
use dank_engine::dank::device::{Buffer, Texture, TextureDesc};
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_bail_warn, engine_err};
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::texture_format_to_vk;

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// Vulkan texture implementation
///
/// Lives in SHADER_READ_ONLY_OPTIMAL once uploaded.
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    desc: TextureDesc,
}

impl VulkanTexture {
    pub fn new(ctx: Arc<GpuContext>, desc: TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail_warn!("dank::vulkan::Texture", "Texture extent {}x{} is empty", desc.width, desc.height);
        }
        let format = texture_format_to_vk(desc.format);

        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);
            let image = ctx
                .device
                .create_image(&image_info, None)
                .map_err(|e| engine_err!("dank::vulkan::Texture", "Failed to create texture image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("texture", requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };
            if let Err(e) = ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                return Err(engine_err!("dank::vulkan::Texture", "Failed to bind texture memory: {:?}", e));
            }

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(COLOR_RANGE);
            let view = match ctx.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.free(allocation);
                    ctx.device.destroy_image(image, None);
                    return Err(engine_err!("dank::vulkan::Texture", "Failed to create texture view: {:?}", e));
                }
            };

            Ok(Self { ctx, image, view, allocation: Some(allocation), desc })
        }
    }

    /// Replace the whole image through a staging buffer and wait for the copy
    ///
    /// The previous contents are discarded, so the image is always
    /// transitioned from UNDEFINED.
    pub fn upload(&self, data: &[u8]) -> Result<()> {
        if data.len() as u64 != self.desc.byte_len() {
            return Err(Error::InvalidResource(format!(
                "texture upload of {} bytes, expected {}",
                data.len(),
                self.desc.byte_len()
            )));
        }

        let staging = VulkanBuffer::with_usage(
            Arc::clone(&self.ctx),
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            "texture staging buffer",
        )?;
        staging.update(0, data)?;

        let device = &self.ctx.device;
        let (image, width, height) = (self.image, self.desc.width, self.desc.height);
        self.ctx.one_shot(|cb| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(COLOR_RANGE)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D { width, height, depth: 1 });
            device.cmd_copy_buffer_to_image(
                cb,
                staging.buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let to_shader = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(COLOR_RANGE)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader],
            );
        })
    }
}

impl Texture for VulkanTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn handle(&self) -> u64 {
        self.image.as_raw()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
