/// VulkanSwapchain - presentation surface, back buffers and their semaphores
///
/// Acquire and present are split the way the frame pipeline needs them:
/// `acquire` hands out an image plus the semaphore signaled when it is
/// ready, `present` queues it behind the image's render-finished
/// semaphore. An out-of-date surface is recreated on the next acquire;
/// a zero-sized view never acquires.

use ash::vk;
use dank_engine::dank::device::TextureFormat;
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_debug, engine_err, engine_error};
use std::sync::{Arc, RwLock};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, vk_format_to_texture_format,
};

/// Back buffer images and views, read by command lists while recording
pub struct SwapchainImages {
    pub(crate) images: Vec<vk::Image>,
    pub(crate) views: Vec<vk::ImageView>,
    pub(crate) extent: vk::Extent2D,
}

pub type SharedSwapchainImages = Arc<RwLock<SwapchainImages>>;

/// Image acquired for one frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct AcquiredImage {
    pub index: u32,
    pub ready: vk::Semaphore,
}

pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: SharedSwapchainImages,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,

    /// One per frame slot, cycled on every successful acquire
    acquire_semaphores: Vec<vk::Semaphore>,
    next_acquire: usize,
    /// One per swapchain image
    render_finished: Vec<vk::Semaphore>,

    requested: (u32, u32),
    out_of_date: bool,
}

impl VulkanSwapchain {
    /// Create the swapchain for `surface`, taking ownership of the surface
    pub fn new(
        ctx: Arc<GpuContext>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
        vsync: bool,
        frames_in_flight: u32,
    ) -> Result<Self> {
        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let (formats, present_modes) = unsafe {
            let formats = surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, surface)
                .map_err(|e| {
                    engine_error!("dank::vulkan::Swapchain", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to query surface formats: {:?}", e))
                })?;
            let modes = surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, surface)
                .map_err(|e| {
                    engine_error!("dank::vulkan::Swapchain", "Failed to query present modes: {:?}", e);
                    Error::InitializationFailed(format!("Failed to query present modes: {:?}", e))
                })?;
            (formats, modes)
        };
        let surface_format = choose_surface_format(&formats).ok_or_else(|| {
            engine_error!("dank::vulkan::Swapchain", "No supported surface format among {} formats", formats.len());
            Error::InitializationFailed("No supported surface format".to_string())
        })?;
        let present_mode = choose_present_mode(vsync, &present_modes);

        let mut acquire_semaphores = Vec::with_capacity(frames_in_flight as usize);
        for _ in 0..frames_in_flight.max(1) {
            acquire_semaphores.push(create_semaphore(&ctx.device)?);
        }

        let mut swapchain = Self {
            ctx,
            surface,
            surface_loader,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Arc::new(RwLock::new(SwapchainImages {
                images: Vec::new(),
                views: Vec::new(),
                extent: vk::Extent2D { width: 0, height: 0 },
            })),
            surface_format,
            present_mode,
            acquire_semaphores,
            next_acquire: 0,
            render_finished: Vec::new(),
            requested: (width, height),
            out_of_date: false,
        };
        if width > 0 && height > 0 {
            swapchain.recreate()?;
        }
        Ok(swapchain)
    }

    pub fn images(&self) -> SharedSwapchainImages {
        Arc::clone(&self.images)
    }

    /// Engine format of the back buffers
    pub fn format(&self) -> TextureFormat {
        vk_format_to_texture_format(self.surface_format.format).unwrap_or(TextureFormat::Bgra8Srgb)
    }

    pub(crate) fn vk_format(&self) -> vk::Format {
        self.surface_format.format
    }

    pub fn extent(&self) -> (u32, u32) {
        self.images
            .read()
            .map(|images| (images.extent.width, images.extent.height))
            .unwrap_or((0, 0))
    }

    /// Semaphore the submit signals for presentation of `index`
    pub(crate) fn render_finished(&self, index: u32) -> Option<vk::Semaphore> {
        self.render_finished.get(index as usize).copied()
    }

    /// Acquire the next back buffer, `None` when the surface cannot be drawn
    pub(crate) fn acquire(&mut self) -> Result<Option<AcquiredImage>> {
        if self.requested.0 == 0 || self.requested.1 == 0 {
            return Ok(None);
        }
        if self.out_of_date || self.swapchain == vk::SwapchainKHR::null() {
            self.recreate()?;
        }

        let ready = self.acquire_semaphores[self.next_acquire];
        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(self.swapchain, u64::MAX, ready, vk::Fence::null())
        };
        match acquired {
            Ok((index, suboptimal)) => {
                self.out_of_date |= suboptimal;
                self.next_acquire = (self.next_acquire + 1) % self.acquire_semaphores.len();
                Ok(Some(AcquiredImage { index, ready }))
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!("dank::vulkan::Swapchain", "Swapchain out of date during acquire");
                self.out_of_date = true;
                Ok(None)
            }
            Err(e) => Err(engine_err!("dank::vulkan::Swapchain", "Failed to acquire swapchain image: {:?}", e)),
        }
    }

    pub(crate) fn present(&mut self, index: u32) -> Result<()> {
        let wait = [self
            .render_finished(index)
            .ok_or_else(|| engine_err!("dank::vulkan::Swapchain", "Present of unknown image {}", index))?];
        let swapchains = [self.swapchain];
        let indices = [index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait)
            .swapchains(&swapchains)
            .image_indices(&indices);

        match unsafe { self.swapchain_loader.queue_present(self.ctx.graphics_queue, &info) } {
            Ok(suboptimal) => {
                self.out_of_date |= suboptimal;
                Ok(())
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.out_of_date = true;
                Ok(())
            }
            Err(e) => Err(engine_err!("dank::vulkan::Swapchain", "Failed to present swapchain image: {:?}", e)),
        }
    }

    /// Record a new view size; the swapchain follows immediately when the
    /// size is drawable
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.requested = (width, height);
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.recreate()
    }

    fn recreate(&mut self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to wait idle before recreate: {:?}", e))?;

            let caps = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to get surface capabilities: {:?}", e))?;
            let extent = choose_extent(&caps, self.requested.0, self.requested.1);
            if extent.width == 0 || extent.height == 0 {
                self.out_of_date = true;
                return Ok(());
            }

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&caps))
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(caps.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);
            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to create swapchain: {:?}", e))?;

            let images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to get swapchain images: {:?}", e))?;
            let mut views = Vec::with_capacity(images.len());
            for &image in &images {
                let info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.surface_format.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                views.push(
                    self.ctx
                        .device
                        .create_image_view(&info, None)
                        .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to create image view: {:?}", e))?,
                );
            }

            while self.render_finished.len() < images.len() {
                self.render_finished.push(create_semaphore(&self.ctx.device)?);
            }

            let mut shared = self
                .images
                .write()
                .map_err(|_| engine_err!("dank::vulkan::Swapchain", "Swapchain image lock poisoned"))?;
            for &view in &shared.views {
                self.ctx.device.destroy_image_view(view, None);
            }
            *shared = SwapchainImages { images, views, extent };
            drop(shared);

            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.out_of_date = false;

            engine_debug!(
                "dank::vulkan::Swapchain",
                "Swapchain ready: {}x{}, {:?}, {:?}",
                extent.width,
                extent.height,
                self.surface_format.format,
                self.present_mode
            );
        }
        Ok(())
    }
}

fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    unsafe { device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
        .map_err(|e| engine_err!("dank::vulkan::Swapchain", "Failed to create semaphore: {:?}", e))
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            for &semaphore in self.acquire_semaphores.iter().chain(&self.render_finished) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            if let Ok(images) = self.images.read() {
                for &view in &images.views {
                    self.ctx.device.destroy_image_view(view, None);
                }
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
