/// GpuContext - Vulkan objects shared by every backend resource
///
/// Buffers, textures, tables, fences, command lists, pipelines and the
/// swapchain each hold an `Arc<GpuContext>`. The context destroys the
/// logical device and instance in its own `Drop`, so the device always
/// outlives every resource created from it.

use ash::vk;
use dank_engine::dank::{Error, Result};
use dank_engine::{engine_err, engine_error};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

use crate::debug::{ValidationCounters, ValidationStats};

/// Sets per descriptor pool before another pool is created
const SETS_PER_POOL: u32 = 64;
/// Descriptors of each type per pool (raised when a single table needs more)
const DESCRIPTORS_PER_POOL: u32 = 1024;

pub(crate) struct DebugMessenger {
    pub loader: ash::ext::debug_utils::Instance,
    pub messenger: vk::DebugUtilsMessengerEXT,
}

/// Shared GPU context
pub struct GpuContext {
    pub(crate) device: ash::Device,
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Dropped by hand, before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,

    /// Pool for blocking one-shot uploads (TRANSIENT + RESET_COMMAND_BUFFER)
    upload_command_pool: Mutex<vk::CommandPool>,

    /// Descriptor pools for argument tables; a new pool is appended when
    /// the last one is exhausted
    descriptor_pools: Mutex<Vec<vk::DescriptorPool>>,

    /// Linear clamp sampler paired with every sampled texture
    pub(crate) sampler: vk::Sampler,

    debug: Option<DebugMessenger>,
    /// Target of the messenger's user data pointer
    validation: Box<ValidationCounters>,

    pub(crate) instance: ash::Instance,
    pub(crate) entry: ash::Entry,
}

impl GpuContext {
    /// Assemble the context from freshly created objects
    ///
    /// Takes ownership of everything passed in; all of it is destroyed
    /// when the last `Arc<GpuContext>` drops.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        debug: Option<DebugMessenger>,
        validation: Box<ValidationCounters>,
    ) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create upload command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
            })?;

            let sampler_info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .max_lod(0.0)
                .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK);
            let sampler = device.create_sampler(&sampler_info, None).map_err(|e| {
                engine_error!("dank::vulkan::Device", "Failed to create sampler: {:?}", e);
                Error::InitializationFailed(format!("Failed to create sampler: {:?}", e))
            })?;

            let first_pool = Self::create_descriptor_pool(&device, DESCRIPTORS_PER_POOL)?;

            Ok(Self {
                device,
                physical_device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family,
                upload_command_pool: Mutex::new(upload_command_pool),
                descriptor_pools: Mutex::new(vec![first_pool]),
                sampler,
                debug,
                validation,
                instance,
                entry,
            })
        }
    }

    fn create_descriptor_pool(device: &ash::Device, descriptors: u32) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize { ty: vk::DescriptorType::UNIFORM_BUFFER, descriptor_count: descriptors },
            vk::DescriptorPoolSize { ty: vk::DescriptorType::STORAGE_BUFFER, descriptor_count: descriptors },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: descriptors,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(SETS_PER_POOL);

        unsafe {
            device
                .create_descriptor_pool(&info, None)
                .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Allocate GPU memory through gpu-allocator
    pub(crate) fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| engine_err!("dank::vulkan::Device", "GPU allocator lock poisoned"))?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!("dank::vulkan::Device", "Out of GPU memory for {} ({:.2} MB): {}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    /// Return an allocation to the allocator
    pub(crate) fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Record, submit and wait for a one-shot command buffer
    pub(crate) fn one_shot<F: FnOnce(vk::CommandBuffer)>(&self, record: F) -> Result<()> {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!("dank::vulkan::Device", "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffers = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to allocate upload command buffer: {:?}", e))?;
            let cb = command_buffers[0];

            let result = self.submit_and_wait(cb, record);
            self.device.free_command_buffers(*pool, &command_buffers);
            result
        }
    }

    unsafe fn submit_and_wait<F: FnOnce(vk::CommandBuffer)>(&self, cb: vk::CommandBuffer, record: F) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(cb, &begin_info)
            .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to begin upload command buffer: {:?}", e))?;
        record(cb);
        self.device
            .end_command_buffer(cb)
            .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to end upload command buffer: {:?}", e))?;

        let fence = self
            .device
            .create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to create upload fence: {:?}", e))?;
        let command_buffers = [cb];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let result = self
            .device
            .queue_submit(self.graphics_queue, &[submit_info], fence)
            .and_then(|_| self.device.wait_for_fences(&[fence], true, u64::MAX))
            .map_err(|e| engine_err!("dank::vulkan::Device", "Upload submission failed: {:?}", e));
        self.device.destroy_fence(fence, None);
        result
    }

    /// Allocate a descriptor set, appending a pool when the current one is full
    pub(crate) fn allocate_descriptor_set(
        &self,
        layout: vk::DescriptorSetLayout,
        largest_binding: u32,
    ) -> Result<(vk::DescriptorPool, vk::DescriptorSet)> {
        let mut pools = self
            .descriptor_pools
            .lock()
            .map_err(|_| engine_err!("dank::vulkan::Device", "Descriptor pool lock poisoned"))?;
        let layouts = [layout];

        if let Some(&pool) = pools.last() {
            let info = vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
            match unsafe { self.device.allocate_descriptor_sets(&info) } {
                Ok(sets) => return Ok((pool, sets[0])),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {}
                Err(e) => {
                    return Err(engine_err!("dank::vulkan::Device", "Failed to allocate descriptor set: {:?}", e));
                }
            }
        }

        let pool = Self::create_descriptor_pool(&self.device, DESCRIPTORS_PER_POOL.max(largest_binding))?;
        pools.push(pool);
        let info = vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
        let sets = unsafe { self.device.allocate_descriptor_sets(&info) }
            .map_err(|e| engine_err!("dank::vulkan::Device", "Failed to allocate descriptor set: {:?}", e))?;
        Ok((pool, sets[0]))
    }

    pub(crate) fn free_descriptor_set(&self, pool: vk::DescriptorPool, set: vk::DescriptorSet) {
        // Holding the lock keeps the pool externally synchronized
        if let Ok(_pools) = self.descriptor_pools.lock() {
            unsafe {
                self.device.free_descriptor_sets(pool, &[set]).ok();
            }
        }
    }

    pub fn validation_stats(&self) -> ValidationStats {
        self.validation.snapshot()
    }

    pub(crate) fn validation_enabled(&self) -> bool {
        self.debug.is_some()
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            self.device.destroy_sampler(self.sampler, None);
            if let Ok(pools) = self.descriptor_pools.get_mut() {
                for &pool in pools.iter() {
                    self.device.destroy_descriptor_pool(pool, None);
                }
            }
            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Frees the VkDeviceMemory blocks while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            if let Some(debug) = self.debug.take() {
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
