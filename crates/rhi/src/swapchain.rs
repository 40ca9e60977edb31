//! Swapchain management.
//!
//! This module handles VkSwapchainKHR creation, image views, framebuffers,
//! image acquisition and presentation.
//!
//! The swapchain is created once. Its image count, format and extent never
//! change; a surface resize is not handled and surfaces as an out-of-date
//! error from acquire or present.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::instance::Instance;
//! use vkframe_rhi::render_pass::RenderPass;
//! use vkframe_rhi::swapchain::Swapchain;
//! use ash::vk;
//!
//! # fn example(instance: &Instance, device: Arc<Device>, surface: vk::SurfaceKHR) -> vkframe_rhi::RhiResult<()> {
//! let mut swapchain = Swapchain::new(instance, device.clone(), surface, 800, 600)?;
//! let render_pass = RenderPass::new(device, swapchain.format())?;
//! swapchain.create_framebuffers(&render_pass)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::render_pass::{Framebuffer, RenderPass};

/// Surface format requested when the surface offers it.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// What a surface supports for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// True if at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Parameters chosen for a swapchain before it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Applies the selection rules to queried surface support.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::SwapchainError`] if the surface reports no formats
    /// or no present modes.
    pub fn from_support(support: &SwapchainSupportDetails, width: u32, height: u32) -> RhiResult<Self> {
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats).ok_or_else(|| {
            RhiError::SwapchainError("surface reports no formats".to_string())
        })?;

        Ok(Self {
            surface_format,
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(&support.capabilities, width, height),
            image_count: determine_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
        })
    }
}

/// Vulkan swapchain wrapper.
///
/// Owns the swapchain handle, one image view per image and, once
/// [`create_framebuffers`](Self::create_framebuffers) has run, one framebuffer
/// per image. The images themselves belong to the presentation engine.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<Framebuffer>,
    format: vk::Format,
    color_space: vk::ColorSpaceKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Creates a swapchain for `surface` sized to `width` x `height` where the
    /// surface leaves the extent up to the application.
    ///
    /// Uses CONCURRENT image sharing when the graphics and present queue
    /// families differ, EXCLUSIVE otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if surface queries, swapchain creation or image view
    /// creation fail.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, &surface_loader)?;
        let plan = SwapchainPlan::from_support(&support, width, height)?;

        info!(
            "Creating swapchain: {}x{}, format {:?}, color space {:?}, present mode {:?}, {} images",
            plan.extent.width,
            plan.extent.height,
            plan.surface_format.format,
            plan.surface_format.color_space,
            plan.present_mode,
            plan.image_count
        );

        let (sharing_mode, queue_family_indices) = device.queue_families().sharing_mode();
        debug!(
            "Swapchain image sharing mode {:?} (families {:?})",
            sharing_mode, queue_family_indices
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(plan.image_count)
            .image_format(plan.surface_format.format)
            .image_color_space(plan.surface_format.color_space)
            .image_extent(plan.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(plan.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(plan.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e.into());
            }
        };
        info!("Swapchain created with {} images", images.len());

        // From here on Drop cleans up whatever was created.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            format: plan.surface_format.format,
            color_space: plan.surface_format.color_space,
            extent: plan.extent,
            present_mode: plan.present_mode,
        };
        this.create_image_views()?;

        Ok(this)
    }

    /// Creates one framebuffer per image view, bound to `render_pass`.
    ///
    /// The render pass must outlive this swapchain's framebuffers.
    pub fn create_framebuffers(&mut self, render_pass: &RenderPass) -> RhiResult<()> {
        self.framebuffers.clear();

        for &view in &self.image_views {
            let framebuffer =
                Framebuffer::new(self.device.clone(), render_pass, view, self.extent)?;
            self.framebuffers.push(framebuffer);
        }

        debug!("Created {} framebuffers", self.framebuffers.len());
        Ok(())
    }

    /// Acquires the next image, signaling `semaphore` when it is usable.
    ///
    /// Returns `(image_index, suboptimal)`. Errors are returned raw so the
    /// caller can attribute them to the acquire step.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    /// Queues presentation of `image_index` after `wait_semaphore` signals.
    ///
    /// Returns whether the swapchain is suboptimal.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.color_space
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Framebuffers in image-index order. Empty until
    /// [`create_framebuffers`](Self::create_framebuffers) runs.
    #[inline]
    pub fn framebuffers(&self) -> &[Framebuffer] {
        &self.framebuffers
    }

    fn create_image_views(&mut self) -> RhiResult<()> {
        for (i, &image) in self.images.iter().enumerate() {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            let image_view = unsafe {
                self.device
                    .handle()
                    .create_image_view(&create_info, None)
                    .map_err(|e| {
                        RhiError::SwapchainError(format!(
                            "Failed to create image view {}: {:?}",
                            i, e
                        ))
                    })?
            };

            self.image_views.push(image_view);
        }

        debug!("Created {} image views", self.image_views.len());
        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Framebuffers reference the views, views reference the images.
        self.framebuffers.clear();

        for &image_view in &self.image_views {
            unsafe {
                self.device.handle().destroy_image_view(image_view, None);
            }
        }
        self.image_views.clear();

        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

/// Picks [`PREFERRED_SURFACE_FORMAT`] if listed, else the first entry.
///
/// Returns `None` only for an empty list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    let preferred = formats.iter().find(|f| {
        f.format == PREFERRED_SURFACE_FORMAT.format
            && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
    });

    match preferred {
        Some(&format) => Some(format),
        None => {
            let first = formats.first().copied();
            if let Some(format) = first {
                warn!(
                    "Preferred surface format unavailable, using {:?} / {:?}",
                    format.format, format.color_space
                );
            }
            first
        }
    }
}

/// MAILBOX if available, else IMMEDIATE, else FIFO.
///
/// FIFO support is mandatory for every surface.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| present_modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Uses the surface's current extent unless it is the `u32::MAX` sentinel,
/// in which case the requested size is clamped into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: width.clamp(min.width, max.width),
        height: height.clamp(min.height, max.height),
    }
}

/// One image more than the minimum, capped at the maximum when there is one.
///
/// A `max_image_count` of 0 means the surface imposes no upper bound.
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            ..Default::default()
        }
    }

    fn support(
        capabilities: vk::SurfaceCapabilitiesKHR,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> SwapchainSupportDetails {
        SwapchainSupportDetails {
            capabilities,
            formats: vec![PREFERRED_SURFACE_FORMAT],
            present_modes,
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_bgra_srgb() {
        let formats = vec![
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        assert_eq!(
            choose_surface_format(&formats),
            Some(PREFERRED_SURFACE_FORMAT)
        );
    }

    #[test]
    fn test_choose_surface_format_requires_exact_pair() {
        // Right format, wrong color space: not a match, first entry wins.
        let formats = vec![
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
        ];

        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
    }

    #[test]
    fn test_choose_surface_format_empty() {
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_choose_present_mode_prefers_mailbox_in_any_order() {
        let orders = [
            vec![
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
                vk::PresentModeKHR::IMMEDIATE,
            ],
            vec![
                vk::PresentModeKHR::IMMEDIATE,
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::MAILBOX,
            ],
            vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
        ];

        for modes in orders {
            assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
        }
    }

    #[test]
    fn test_choose_present_mode_immediate_before_fifo() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::IMMEDIATE);
    }

    #[test]
    fn test_choose_present_mode_fifo_only() {
        let modes = vec![vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);

        let modes = vec![vk::PresentModeKHR::FIFO_RELAXED, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_chosen_present_mode_is_always_listed() {
        let lists = [
            vec![vk::PresentModeKHR::FIFO],
            vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE],
            vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO],
            vec![
                vk::PresentModeKHR::FIFO_RELAXED,
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::IMMEDIATE,
            ],
        ];

        for modes in lists {
            assert!(modes.contains(&choose_present_mode(&modes)));
        }
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn test_choose_extent_clamps_to_limits() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, 3000, 3000);
        assert_eq!((extent.width, extent.height), (2000, 2000));

        let extent = choose_extent(&capabilities, 50, 50);
        assert_eq!((extent.width, extent.height), (100, 100));

        let extent = choose_extent(&capabilities, 3000, 50);
        assert_eq!((extent.width, extent.height), (2000, 100));

        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_determine_image_count() {
        assert_eq!(determine_image_count(&caps(2, 3)), 3);
        assert_eq!(determine_image_count(&caps(2, 8)), 3);
        assert_eq!(determine_image_count(&caps(1, 0)), 2);
    }

    #[test]
    fn test_plan_unbounded_surface_requests_three_images() {
        let plan =
            SwapchainPlan::from_support(&support(caps(2, 0), vec![vk::PresentModeKHR::FIFO]), 800, 600)
                .unwrap();
        assert_eq!(plan.image_count, 3);
    }

    #[test]
    fn test_plan_clamps_image_count_to_max() {
        let plan =
            SwapchainPlan::from_support(&support(caps(2, 2), vec![vk::PresentModeKHR::FIFO]), 800, 600)
                .unwrap();
        assert_eq!(plan.image_count, 2);
    }

    #[test]
    fn test_plan_fifo_only_surface() {
        let plan =
            SwapchainPlan::from_support(&support(caps(2, 0), vec![vk::PresentModeKHR::FIFO]), 800, 600)
                .unwrap();
        assert_eq!(plan.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(plan.surface_format, PREFERRED_SURFACE_FORMAT);
        assert_eq!(plan.extent, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_plan_rejects_inadequate_support() {
        let no_modes = support(caps(2, 0), vec![]);
        assert!(matches!(
            SwapchainPlan::from_support(&no_modes, 800, 600),
            Err(RhiError::SwapchainError(_))
        ));

        let mut no_formats = support(caps(2, 0), vec![vk::PresentModeKHR::FIFO]);
        no_formats.formats.clear();
        assert!(!no_formats.is_adequate());
        assert!(SwapchainPlan::from_support(&no_formats, 800, 600).is_err());
    }
}
