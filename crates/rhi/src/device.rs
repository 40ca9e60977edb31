//! Vulkan logical device and queue management.
//!
//! The [`Device`] owns the logical device, the graphics and present queues and
//! the gpu-allocator instance. Every other RHI wrapper holds an `Arc<Device>`,
//! so the device is destroyed only after all of them.
//!
//! # Example
//!
//! ```no_run
//! use vkframe_rhi::instance::Instance;
//! use vkframe_rhi::physical_device::select_physical_device;
//! use vkframe_rhi::device::Device;
//! use ash::vk;
//!
//! # fn example(instance: &Instance, surface: vk::SurfaceKHR) -> vkframe_rhi::RhiResult<()> {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//! let info = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! let device = Device::new(instance, &info)?;
//! let graphics_queue = device.graphics_queue();
//! # Ok(())
//! # }
//! ```

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, error, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{DEVICE_EXTENSIONS, PhysicalDeviceInfo, QueueFamilyIndices};

/// Vulkan logical device wrapper.
///
/// Shared across the renderer through `Arc`. The allocator sits behind a
/// `Mutex` and is released before the device itself is destroyed.
pub struct Device {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
    properties: vk::PhysicalDeviceProperties,
}

impl Device {
    /// Creates the logical device.
    ///
    /// One queue (priority 1.0) is created per unique family among graphics
    /// and present. Enables `VK_KHR_swapchain` and `samplerAnisotropy`.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation or allocator initialization fails.
    pub fn new(instance: &Instance, physical_device_info: &PhysicalDeviceInfo) -> RhiResult<Arc<Self>> {
        let queue_families = physical_device_info.queue_families;
        let graphics_family = queue_families.graphics()?;
        let present_family = queue_families.present()?;

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        let extension_names: Vec<*const std::ffi::c_char> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            DEVICE_EXTENSIONS.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        info!("GPU memory allocator initialized");

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
            properties: physical_device_info.properties,
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Properties of the physical device this device was created from.
    #[inline]
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    /// Locks the GPU memory allocator.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::AllocatorLockPoisoned`] if a previous holder panicked.
    pub fn allocator(&self) -> RhiResult<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| RhiError::AllocatorLockPoisoned)
    }

    /// Blocks until all queues are idle.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// The command buffers must be fully recorded, and `fence` (if not null)
    /// must be unsignaled and not in use by another submission.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo<'_>],
        fence: vk::Fence,
    ) -> Result<(), vk::Result> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }

            // Allocator memory blocks are freed through the device.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// ash::Device is Send + Sync, the rest are plain handles or guarded by the Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}
