/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Requires Vulkan 1.3 with timeline semaphores (engine fences), partially
/// bound descriptors (texture table with empty slots) and dynamic
/// rendering. One queue family must handle both graphics and present.

use ash::vk;
use dank_engine::dank::device::{
    ArgumentTable, ArgumentTableDesc, Buffer, BufferDesc, CommandList, Fence, GraphicsDevice, Pipeline,
    PipelineDesc, RenderTarget, ShaderSource, Texture, TextureDesc,
};
use dank_engine::dank::render::{FrameRenderer, RendererConfig};
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::any::Any;
use std::ffi::{CStr, CString};
use std::sync::Arc;
use winit::window::Window;

use crate::debug::{messenger_create_info, ValidationCounters, ValidationStats};
use crate::vulkan_argument_table::VulkanArgumentTable;
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::{DebugMessenger, GpuContext};
use crate::vulkan_fence::VulkanFence;
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_swapchain::{AcquiredImage, VulkanSwapchain};
use crate::vulkan_texture::VulkanTexture;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Ranking used to pick among suitable physical devices
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

/// Features this backend cannot run without, as reported by the device
pub(crate) struct RequiredFeatures {
    pub api_version: u32,
    pub timeline_semaphore: bool,
    pub descriptor_binding_partially_bound: bool,
    pub dynamic_rendering: bool,
    pub multi_draw_indirect: bool,
    pub draw_indirect_first_instance: bool,
}

impl RequiredFeatures {
    /// Name of the first missing requirement, `None` when all are met
    pub(crate) fn missing(&self) -> Option<&'static str> {
        if self.api_version < vk::API_VERSION_1_3 {
            Some("Vulkan 1.3")
        } else if !self.timeline_semaphore {
            Some("timelineSemaphore")
        } else if !self.descriptor_binding_partially_bound {
            Some("descriptorBindingPartiallyBound")
        } else if !self.dynamic_rendering {
            Some("dynamicRendering")
        } else if !self.multi_draw_indirect {
            Some("multiDrawIndirect")
        } else if !self.draw_indirect_first_instance {
            Some("drawIndirectFirstInstance")
        } else {
            None
        }
    }
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    swapchain: VulkanSwapchain,
    /// Image handed out by the last acquire, consumed by `submit`
    pending_acquire: Option<AcquiredImage>,
    surface_size: (u32, u32),
    ctx: Arc<GpuContext>,
}

impl VulkanGraphicsDevice {
    /// Create the device and a swapchain for `window`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` when no GPU satisfies the backend's
    /// requirements or any Vulkan object fails to create.
    pub fn new(window: &Window, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let enable_validation = config.enable_validation || cfg!(feature = "vulkan-validation");
            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| Error::InitializationFailed("Application name contains a NUL byte".to_string()))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Dank")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("dank::vulkan::Device", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();
            let layer_names = if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                Vec::new()
            };

            let instance_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);
            let instance = entry.create_instance(&instance_info, None).map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let validation = Box::<ValidationCounters>::default();
            let debug = if enable_validation {
                let loader = ash::ext::debug_utils::Instance::new(&entry, &instance);
                let messenger = loader
                    .create_debug_utils_messenger(&messenger_create_info(&validation), None)
                    .map_err(|e| {
                        engine_error!("dank::vulkan::Device", "Failed to create debug messenger: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
                    })?;
                Some(DebugMessenger { loader, messenger })
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_family) = pick_physical_device(&instance, &surface_loader, surface)?;

            let queue_priorities = [1.0];
            let queue_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family)
                .queue_priorities(&queue_priorities)];
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let features = vk::PhysicalDeviceFeatures::default()
                .multi_draw_indirect(true)
                .draw_indirect_first_instance(true);
            let mut features12 = vk::PhysicalDeviceVulkan12Features::default()
                .timeline_semaphore(true)
                .descriptor_binding_partially_bound(true);
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);
            let device_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&features)
                .push_next(&mut features12)
                .push_next(&mut features13);
            let device = instance.create_device(physical_device, &device_info, None).map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })?;
            let graphics_queue = device.get_device_queue(queue_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let ctx = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                graphics_queue,
                queue_family,
                debug,
                validation,
            )?);

            let swapchain = VulkanSwapchain::new(
                Arc::clone(&ctx),
                surface,
                size.width,
                size.height,
                config.vsync,
                config.frames_in_flight,
            )?;

            engine_info!(
                "dank::vulkan::Device",
                "Vulkan device ready ({}x{}, {:?}, validation {})",
                size.width,
                size.height,
                swapchain.format(),
                if enable_validation { "on" } else { "off" }
            );

            Ok(Self {
                swapchain,
                pending_acquire: None,
                surface_size: (size.width, size.height),
                ctx,
            })
        }
    }

    /// Validation message counts since the device was created
    pub fn validation_stats(&self) -> ValidationStats {
        self.ctx.validation_stats()
    }

    pub fn validation_enabled(&self) -> bool {
        self.ctx.validation_enabled()
    }
}

/// Pick the best device exposing a graphics+present queue family and
/// every required feature
unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, u32)> {
    let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
        engine_error!("dank::vulkan::Device", "Failed to enumerate physical devices: {:?}", e);
        Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
    })?;

    let mut best: Option<(u32, vk::PhysicalDevice, u32)> = None;
    for physical_device in physical_devices {
        let properties = instance.get_physical_device_properties(physical_device);
        let name = properties.device_name_as_c_str().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let mut features12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .push_next(&mut features12)
            .push_next(&mut features13);
        instance.get_physical_device_features2(physical_device, &mut features2);
        let base = features2.features;
        let required = RequiredFeatures {
            api_version: properties.api_version,
            timeline_semaphore: features12.timeline_semaphore == vk::TRUE,
            descriptor_binding_partially_bound: features12.descriptor_binding_partially_bound == vk::TRUE,
            dynamic_rendering: features13.dynamic_rendering == vk::TRUE,
            multi_draw_indirect: base.multi_draw_indirect == vk::TRUE,
            draw_indirect_first_instance: base.draw_indirect_first_instance == vk::TRUE,
        };
        if let Some(missing) = required.missing() {
            engine_debug!("dank::vulkan::Device", "Skipping '{}': missing {}", name, missing);
            continue;
        }

        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
        let family = (0..queue_families.len() as u32).find(|&index| {
            queue_families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
                    .unwrap_or(false)
        });
        let Some(family) = family else {
            engine_debug!("dank::vulkan::Device", "Skipping '{}': no graphics+present queue family", name);
            continue;
        };

        let score = device_type_score(properties.device_type);
        if best.map_or(true, |(best_score, _, _)| score > best_score) {
            best = Some((score, physical_device, family));
        }
    }

    best.map(|(_, physical_device, family)| (physical_device, family)).ok_or_else(|| {
        engine_error!("dank::vulkan::Device", "No Vulkan 1.3 GPU with the required features found");
        Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
    })
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(VulkanBuffer::new(Arc::clone(&self.ctx), &desc)?))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(VulkanTexture::new(Arc::clone(&self.ctx), desc)?))
    }

    fn write_texture(&mut self, texture: &Arc<dyn Texture>, data: &[u8]) -> Result<()> {
        let texture = texture
            .as_any()
            .downcast_ref::<VulkanTexture>()
            .ok_or_else(|| Error::InvalidResource("Texture is not a Vulkan texture".to_string()))?;
        texture.upload(data)
    }

    fn create_argument_table(&mut self, desc: ArgumentTableDesc) -> Result<Arc<dyn ArgumentTable>> {
        Ok(Arc::new(VulkanArgumentTable::new(Arc::clone(&self.ctx), desc)?))
    }

    fn create_fence(&mut self, initial_value: u64) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(VulkanFence::new(Arc::clone(&self.ctx), initial_value)?))
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(VulkanCommandList::new(Arc::clone(&self.ctx), self.swapchain.images())?))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(VulkanPipeline::new(Arc::clone(&self.ctx), &desc, self.swapchain.vk_format())?))
    }

    fn acquire_render_target(&mut self) -> Result<Option<RenderTarget>> {
        let Some(acquired) = self.swapchain.acquire()? else {
            return Ok(None);
        };
        self.pending_acquire = Some(acquired);
        let (width, height) = self.swapchain.extent();
        Ok(Some(RenderTarget {
            index: acquired.index,
            width,
            height,
            format: self.swapchain.format(),
        }))
    }

    fn submit(&mut self, commands: &dyn CommandList, target: &RenderTarget) -> Result<()> {
        let commands = commands
            .as_any()
            .downcast_ref::<VulkanCommandList>()
            .ok_or_else(|| Error::InvalidResource("Command list is not a Vulkan command list".to_string()))?;
        let acquired = match self.pending_acquire.take() {
            Some(acquired) if acquired.index == target.index => acquired,
            _ => {
                return Err(engine_err!(
                    "dank::vulkan::Device",
                    "Submit for render target {} without a matching acquire",
                    target.index
                ))
            }
        };
        let render_finished = self.swapchain.render_finished(target.index).ok_or_else(|| {
            engine_err!("dank::vulkan::Device", "No present semaphore for render target {}", target.index)
        })?;

        let wait_semaphores = [acquired.ready];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [commands.command_buffer];
        let signal_semaphores = [render_finished];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to submit commands to GPU queue: {:?}", e))
        }
    }

    fn present(&mut self, target: &RenderTarget) -> Result<()> {
        self.swapchain.present(target.index)
    }

    fn signal_fence(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<VulkanFence>()
            .ok_or_else(|| Error::InvalidResource("Fence is not a Vulkan fence".to_string()))?;

        let semaphores = [fence.semaphore];
        let values = [value];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default().signal_semaphore_values(&values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&semaphores)
            .push_next(&mut timeline_info);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to signal fence to {}: {:?}", value, e))
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface_size = (width, height);
        self.swapchain.resize(width, height)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to wait idle: {:?}", e))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            engine_warn!("dank::vulkan::Device", "Device drop without idle GPU: {}", e);
        }
        let stats = self.ctx.validation_stats();
        if stats.total() > 0 {
            engine_info!(
                "dank::vulkan::Device",
                "Validation summary: {} errors, {} warnings",
                stats.errors,
                stats.warnings
            );
        }
    }
}

/// Build a `FrameRenderer` over a new Vulkan device for `window`
pub fn create_renderer(
    window: &Window,
    config: RendererConfig,
    vertex_shader: ShaderSource,
    fragment_shader: ShaderSource,
) -> Result<FrameRenderer<VulkanGraphicsDevice>> {
    let device = VulkanGraphicsDevice::new(window, &config)?;
    FrameRenderer::new(device, config, vertex_shader, fragment_shader)
}

#[cfg(test)]
#[path = "vulkan_device_tests.rs"]
mod tests;
