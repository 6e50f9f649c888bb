/// VulkanArgumentTable - one descriptor set per argument table
///
/// Each table entry becomes one descriptor binding (binding number = entry
/// index) holding `count` array elements. Bindings are PARTIALLY_BOUND so
/// slots nothing wrote yet are legal as long as no draw reads them.

use ash::vk;
use dank_engine::dank::device::{validate_bindings, ArgumentTable, ArgumentTableDesc, BindingResource};
use dank_engine::dank::{Error, Result};
use dank_engine::engine_err;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{binding_kind_to_vk, shader_stage_to_vk};
use crate::vulkan_texture::VulkanTexture;

/// Descriptor bindings for a table layout
pub(crate) fn layout_bindings(desc: &ArgumentTableDesc) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    let stage = shader_stage_to_vk(desc.stage);
    desc.entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(index as u32)
                .descriptor_type(binding_kind_to_vk(entry.kind))
                .descriptor_count(entry.count)
                .stage_flags(stage)
        })
        .collect()
}

/// Create the set layout for a table; pipelines build theirs the same way
/// so tables and pipeline layouts stay compatible
pub(crate) fn create_set_layout(device: &ash::Device, desc: &ArgumentTableDesc) -> Result<vk::DescriptorSetLayout> {
    let bindings = layout_bindings(desc);
    let flags = vec![vk::DescriptorBindingFlags::PARTIALLY_BOUND; bindings.len()];
    let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&flags);
    let info = vk::DescriptorSetLayoutCreateInfo::default()
        .bindings(&bindings)
        .push_next(&mut flags_info);

    unsafe {
        device
            .create_descriptor_set_layout(&info, None)
            .map_err(|e| engine_err!("dank::vulkan::ArgumentTable", "Failed to create descriptor set layout: {:?}", e))
    }
}

/// Vulkan argument table implementation
pub struct VulkanArgumentTable {
    ctx: Arc<GpuContext>,
    desc: ArgumentTableDesc,
    layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
}

impl VulkanArgumentTable {
    pub fn new(ctx: Arc<GpuContext>, desc: ArgumentTableDesc) -> Result<Self> {
        let layout = create_set_layout(&ctx.device, &desc)?;
        let largest = desc.entries.iter().map(|entry| entry.count).max().unwrap_or(0);
        let (pool, set) = match ctx.allocate_descriptor_set(layout, largest) {
            Ok(allocated) => allocated,
            Err(e) => {
                unsafe { ctx.device.destroy_descriptor_set_layout(layout, None) };
                return Err(e);
            }
        };
        Ok(Self { ctx, desc, layout, pool, set })
    }
}

enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

impl ArgumentTable for VulkanArgumentTable {
    fn desc(&self) -> &ArgumentTableDesc {
        &self.desc
    }

    fn write(&self, bindings: &[(u32, BindingResource)]) -> Result<()> {
        validate_bindings(&self.desc, bindings)?;

        let mut infos = Vec::with_capacity(bindings.len());
        for (slot, resource) in bindings {
            let info = match resource {
                BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                    let vk_buffer = buffer.as_any().downcast_ref::<VulkanBuffer>().ok_or_else(|| {
                        Error::InvalidResource(format!("slot {} holds a buffer from another backend", slot))
                    })?;
                    DescriptorInfo::Buffer(vk::DescriptorBufferInfo {
                        buffer: vk_buffer.buffer,
                        offset: 0,
                        range: vk::WHOLE_SIZE,
                    })
                }
                BindingResource::SampledTexture(texture) => {
                    let vk_texture = texture.as_any().downcast_ref::<VulkanTexture>().ok_or_else(|| {
                        Error::InvalidResource(format!("slot {} holds a texture from another backend", slot))
                    })?;
                    DescriptorInfo::Image(vk::DescriptorImageInfo {
                        sampler: self.ctx.sampler,
                        image_view: vk_texture.view,
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    })
                }
            };
            infos.push(info);
        }

        let writes: Vec<vk::WriteDescriptorSet> = bindings
            .iter()
            .zip(&infos)
            .filter_map(|((slot, resource), info)| {
                let (binding, element, _) = self.desc.locate(*slot)?;
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(self.set)
                    .dst_binding(binding)
                    .dst_array_element(element)
                    .descriptor_type(binding_kind_to_vk(resource.kind()));
                Some(match info {
                    DescriptorInfo::Buffer(buffer) => write.buffer_info(std::slice::from_ref(buffer)),
                    DescriptorInfo::Image(image) => write.image_info(std::slice::from_ref(image)),
                })
            })
            .collect();

        unsafe {
            self.ctx.device.update_descriptor_sets(&writes, &[]);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanArgumentTable {
    fn drop(&mut self) {
        self.ctx.free_descriptor_set(self.pool, self.set);
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_argument_table_tests.rs"]
mod tests;
