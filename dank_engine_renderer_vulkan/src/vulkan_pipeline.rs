/// VulkanPipeline - the single graphics pipeline used by the frame renderer
///
/// Built for dynamic rendering against the swapchain color format: no
/// render pass objects, no depth, alpha blending, per-instance vertex
/// input at binding 0 and one descriptor set per argument table.

use ash::vk;
use dank_engine::dank::device::{Pipeline, PipelineDesc, ShaderSource};
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_debug, engine_err, engine_error};
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_argument_table::create_set_layout;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::buffer_format_to_vk;

/// Check that `source` is valid SPIR-V exposing its entry point
pub(crate) fn check_shader(source: &ShaderSource, stage: &str) -> Result<CString> {
    if source.spirv.is_empty() {
        engine_error!("dank::vulkan::Pipeline", "{} shader is empty", stage);
        return Err(Error::InitializationFailed(format!("{} shader is empty", stage)));
    }
    let entry_points = spirq::ReflectConfig::new()
        .spv(source.spirv.as_slice())
        .reflect()
        .map_err(|e| {
            engine_error!("dank::vulkan::Pipeline", "{} shader reflection failed: {:?}", stage, e);
            Error::InitializationFailed(format!("{} shader reflection failed: {:?}", stage, e))
        })?;
    if !entry_points.iter().any(|entry| entry.name == source.entry_point) {
        engine_error!(
            "dank::vulkan::Pipeline",
            "{} shader has no entry point '{}'",
            stage,
            source.entry_point
        );
        return Err(Error::InitializationFailed(format!(
            "{} shader has no entry point '{}'",
            stage, source.entry_point
        )));
    }
    CString::new(source.entry_point.as_str())
        .map_err(|_| Error::InitializationFailed(format!("{} entry point contains a NUL byte", stage)))
}

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl VulkanPipeline {
    pub fn new(ctx: Arc<GpuContext>, desc: &PipelineDesc, color_format: vk::Format) -> Result<Self> {
        let vs_entry = check_shader(&desc.vertex_shader, "vertex")?;
        let fs_entry = check_shader(&desc.fragment_shader, "fragment")?;

        // Owned by the pipeline from here on, so partial failures clean up in Drop
        let mut pipeline = Self {
            ctx,
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            set_layouts: Vec::with_capacity(desc.argument_tables.len()),
        };
        for table in &desc.argument_tables {
            let layout = create_set_layout(&pipeline.ctx.device, table)?;
            pipeline.set_layouts.push(layout);
        }

        let device = &pipeline.ctx.device;
        unsafe {
            let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&pipeline.set_layouts);
            pipeline.layout = device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| engine_err!("dank::vulkan::Pipeline", "Failed to create pipeline layout: {:?}", e))?;

            let vs_module = create_shader_module(device, &desc.vertex_shader)?;
            let fs_module = match create_shader_module(device, &desc.fragment_shader) {
                Ok(module) => module,
                Err(e) => {
                    device.destroy_shader_module(vs_module, None);
                    return Err(e);
                }
            };

            let stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::VERTEX)
                    .module(vs_module)
                    .name(&vs_entry),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(fs_module)
                    .name(&fs_entry),
            ];

            let vertex_bindings = [vk::VertexInputBindingDescription {
                binding: 0,
                stride: desc.instance_layout.stride,
                input_rate: vk::VertexInputRate::INSTANCE,
            }];
            let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
                .instance_layout
                .attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: 0,
                    format: buffer_format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect();
            let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false);

            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewport_count(1)
                .scissor_count(1);

            let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(vk::CullModeFlags::NONE)
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE);

            let multisample = vk::PipelineMultisampleStateCreateInfo::default()
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD);
            let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(std::slice::from_ref(&blend_attachment));

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let color_formats = [color_format];
            let mut rendering = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

            let create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&stages)
                .vertex_input_state(&vertex_input)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization)
                .multisample_state(&multisample)
                .color_blend_state(&color_blend)
                .dynamic_state(&dynamic_state)
                .layout(pipeline.layout)
                .push_next(&mut rendering);

            let created =
                device.create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&create_info), None);

            device.destroy_shader_module(vs_module, None);
            device.destroy_shader_module(fs_module, None);

            pipeline.pipeline = match created {
                Ok(pipelines) => pipelines.into_iter().next().unwrap_or_default(),
                Err((_, e)) => {
                    return Err(engine_err!("dank::vulkan::Pipeline", "Failed to create graphics pipeline: {:?}", e));
                }
            };
        }

        engine_debug!(
            "dank::vulkan::Pipeline",
            "Graphics pipeline created ({} sets, {} instance attributes)",
            pipeline.set_layouts.len(),
            desc.instance_layout.attributes.len()
        );
        Ok(pipeline)
    }
}

unsafe fn create_shader_module(device: &ash::Device, source: &ShaderSource) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(&source.spirv);
    device
        .create_shader_module(&info, None)
        .map_err(|e| engine_err!("dank::vulkan::Pipeline", "Failed to create shader module: {:?}", e))
}

impl Pipeline for VulkanPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            for &layout in &self.set_layouts {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
