//! Physical device (GPU) selection.
//!
//! Selection runs in two passes:
//! 1. Filter every enumerated GPU against the hard requirements (graphics and
//!    present queue families, `VK_KHR_swapchain`, non-empty surface formats and
//!    present modes, sampler anisotropy)
//! 2. Among the survivors, take the first discrete GPU, else the first one

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::{RhiError, RhiResult};
use crate::swapchain::SwapchainSupportDetails;

/// Device extensions every candidate must support.
pub const DEVICE_EXTENSIONS: [&CStr; 1] = [ash::khr::swapchain::NAME];

/// Queue family indices for graphics and presentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// True when both a graphics and a present family were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Unique family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }

    /// Graphics family index, or an error if the device was selected without one.
    pub fn graphics(&self) -> RhiResult<u32> {
        self.graphics_family
            .ok_or_else(|| RhiError::SurfaceError("no graphics queue family".to_string()))
    }

    /// Present family index, or an error if the device was selected without one.
    pub fn present(&self) -> RhiResult<u32> {
        self.present_family
            .ok_or_else(|| RhiError::SurfaceError("no present queue family".to_string()))
    }

    /// Sharing mode for resources used by both queues.
    ///
    /// CONCURRENT across both families when they differ, EXCLUSIVE otherwise.
    pub fn sharing_mode(&self) -> (vk::SharingMode, Vec<u32>) {
        let families = self.unique_families();
        if families.len() > 1 {
            (vk::SharingMode::CONCURRENT, families)
        } else {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        }
    }
}

/// Information about a selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }

    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.properties.device_type
    }

    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Reason a GPU was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsuitable {
    MissingQueueFamilies,
    MissingSwapchainExtension,
    NoSurfaceFormats,
    NoPresentModes,
    NoSamplerAnisotropy,
}

/// Everything the suitability check looks at, gathered from one GPU.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCapabilities {
    pub queue_families: QueueFamilyIndices,
    pub supports_swapchain: bool,
    pub surface_format_count: usize,
    pub present_mode_count: usize,
    pub sampler_anisotropy: bool,
}

impl DeviceCapabilities {
    /// Checks the hard requirements, in order.
    pub fn check(&self) -> Result<(), Unsuitable> {
        if !self.queue_families.is_complete() {
            return Err(Unsuitable::MissingQueueFamilies);
        }
        if !self.supports_swapchain {
            return Err(Unsuitable::MissingSwapchainExtension);
        }
        if self.surface_format_count == 0 {
            return Err(Unsuitable::NoSurfaceFormats);
        }
        if self.present_mode_count == 0 {
            return Err(Unsuitable::NoPresentModes);
        }
        if !self.sampler_anisotropy {
            return Err(Unsuitable::NoSamplerAnisotropy);
        }
        Ok(())
    }
}

/// Selects a physical device that can render to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no enumerated GPU passes the checks.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<PhysicalDeviceInfo> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut suitable = Vec::new();
    for device in devices {
        if let Some(info) = check_device_suitability(instance, device, surface, surface_loader)? {
            debug!(
                "GPU '{}' ({}) is suitable",
                info.device_name(),
                info.device_type_name()
            );
            suitable.push(info);
        }
    }

    let selected = pick_preferred(suitable).ok_or_else(|| {
        warn!("No suitable GPU found with required capabilities");
        RhiError::NoSuitableGpu
    })?;

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch
    );

    Ok(selected)
}

/// First discrete GPU among `candidates`, else the first candidate.
pub fn pick_preferred(mut candidates: Vec<PhysicalDeviceInfo>) -> Option<PhysicalDeviceInfo> {
    let index = candidates
        .iter()
        .position(|c| c.device_type() == vk::PhysicalDeviceType::DISCRETE_GPU)
        .unwrap_or(0);

    if candidates.is_empty() {
        None
    } else {
        Some(candidates.swap_remove(index))
    }
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<Option<PhysicalDeviceInfo>> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    let device_name = unsafe {
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_string_lossy()
            .into_owned()
    };

    let queue_families = find_queue_families(instance, device, surface, surface_loader);
    let supports_swapchain = supports_device_extensions(instance, device)?;

    // Surface support is only queried on devices that can create a swapchain.
    let (surface_format_count, present_mode_count) = if supports_swapchain {
        let support = SwapchainSupportDetails::query(device, surface, surface_loader)?;
        (support.formats.len(), support.present_modes.len())
    } else {
        (0, 0)
    };

    let capabilities = DeviceCapabilities {
        queue_families,
        supports_swapchain,
        surface_format_count,
        present_mode_count,
        sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
    };

    if let Err(reason) = capabilities.check() {
        debug!("GPU '{}' skipped: {:?}", device_name, reason);
        return Ok(None);
    }

    Ok(Some(PhysicalDeviceInfo {
        device,
        properties,
        features,
        memory_properties,
        queue_families,
    }))
}

fn supports_device_extensions(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
) -> RhiResult<bool> {
    let available = unsafe { instance.enumerate_device_extension_properties(device)? };

    let supported = DEVICE_EXTENSIONS.iter().all(|required| {
        available.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == *required
        })
    });

    Ok(supported)
}

fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && indices.graphics_family.is_none()
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i, surface)
                    .unwrap_or(false)
            };

            if present_support {
                indices.present_family = Some(i);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}
