//! Sampled textures and samplers.
//!
//! A [`Texture`] is an RGBA8 image uploaded once through a staging buffer and
//! left in `SHADER_READ_ONLY_OPTIMAL`. Layout changes go through
//! [`transition_barrier`], which only knows the two transitions an upload needs.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error, info};

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandBuffer, CommandPool};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Pixel format of every texture.
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Access masks and pipeline stages for one image layout transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Looks up the barrier parameters for `old` -> `new`.
///
/// # Errors
///
/// [`RhiError::UnsupportedLayoutTransition`] for any pair other than
/// UNDEFINED -> TRANSFER_DST_OPTIMAL and
/// TRANSFER_DST_OPTIMAL -> SHADER_READ_ONLY_OPTIMAL.
pub fn transition_barrier(
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> RhiResult<LayoutTransition> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Ok(LayoutTransition {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok(LayoutTransition {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        _ => Err(RhiError::UnsupportedLayoutTransition { old, new }),
    }
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
}

/// Records a layout transition barrier for `image`.
pub fn cmd_transition_image_layout(
    cmd: &CommandBuffer,
    image: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) -> RhiResult<()> {
    let transition = transition_barrier(old, new)?;

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old)
        .new_layout(new)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(color_subresource_range())
        .src_access_mask(transition.src_access)
        .dst_access_mask(transition.dst_access);

    cmd.pipeline_barrier(transition.src_stage, transition.dst_stage, &[barrier]);
    Ok(())
}

/// Device-local RGBA8 texture with a 2D view.
pub struct Texture {
    device: Arc<Device>,
    image: vk::Image,
    view: vk::ImageView,
    allocation: Option<Allocation>,
    extent: vk::Extent2D,
}

impl Texture {
    /// Uploads `pixels` (tightly packed RGBA8, `width * height * 4` bytes).
    ///
    /// The upload blocks on the graphics queue.
    pub fn from_rgba8(
        device: Arc<Device>,
        pool: &CommandPool,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> RhiResult<Self> {
        if width == 0 || height == 0 {
            return Err(RhiError::TextureError(
                "Texture dimensions must be greater than 0".to_string(),
            ));
        }

        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RhiError::TextureError(format!(
                "Expected {} bytes of RGBA8 for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }

        let staging = Buffer::new(
            device.clone(),
            BufferUsage::Staging,
            pixels.len() as vk::DeviceSize,
        )?;
        staging.write_data(0, pixels)?;

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = match Self::allocate(&device, requirements) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut texture = Self {
            device: device.clone(),
            image,
            view: vk::ImageView::null(),
            allocation: Some(allocation),
            extent: vk::Extent2D { width, height },
        };

        if let Some(allocation) = &texture.allocation {
            unsafe {
                device
                    .handle()
                    .bind_image_memory(image, allocation.memory(), allocation.offset())?;
            }
        }

        pool.immediate_submit(device.graphics_queue(), |cmd| {
            cmd_transition_image_layout(
                cmd,
                image,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .mip_level(0)
                        .base_array_layer(0)
                        .layer_count(1),
                )
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                });
            cmd.copy_buffer_to_image(
                staging.handle(),
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            cmd_transition_image_layout(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        })?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(color_subresource_range());

        texture.view = unsafe { device.handle().create_image_view(&view_info, None)? };

        info!("Created texture: {}x{} ({:?})", width, height, TEXTURE_FORMAT);
        Ok(texture)
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn allocate(device: &Device, requirements: vk::MemoryRequirements) -> RhiResult<Allocation> {
        let mut allocator = device.allocator()?;
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name: "texture",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        Ok(allocation)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.device.handle().destroy_image_view(self.view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free texture allocation: {:?}", e);
                    }
                }
                Err(e) => error!("Leaking texture allocation: {}", e),
            }
        }

        debug!(
            "Destroyed texture {}x{}",
            self.extent.width, self.extent.height
        );
    }
}

/// Linear, repeating, 16x anisotropic sampler.
pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = sampler_create_info();
        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        debug!("Created sampler");

        Ok(Self { device, sampler })
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
    }
}

fn sampler_create_info() -> vk::SamplerCreateInfo<'static> {
    vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(16.0)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_to_transfer_dst() {
        let t = transition_barrier(
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        assert!(t.src_access.is_empty());
        assert_eq!(t.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(t.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::TRANSFER);
    }

    #[test]
    fn test_transition_to_shader_read() {
        let t = transition_barrier(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(t.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(t.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(t.src_stage, vk::PipelineStageFlags::TRANSFER);
        assert_eq!(t.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_unknown_transitions_are_rejected() {
        let pairs = [
            (
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ),
            (
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            ),
            (
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ),
        ];

        for (old, new) in pairs {
            match transition_barrier(old, new) {
                Err(RhiError::UnsupportedLayoutTransition { old: o, new: n }) => {
                    assert_eq!((o, n), (old, new));
                }
                other => panic!("expected rejection for {:?} -> {:?}, got {:?}", old, new, other),
            }
        }
    }

    #[test]
    fn test_sampler_settings() {
        let info = sampler_create_info();
        assert_eq!(info.mag_filter, vk::Filter::LINEAR);
        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_v, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.address_mode_w, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.anisotropy_enable, vk::TRUE);
        assert_eq!(info.max_anisotropy, 16.0);
        assert_eq!(info.border_color, vk::BorderColor::INT_OPAQUE_BLACK);
        assert_eq!(info.mipmap_mode, vk::SamplerMipmapMode::LINEAR);
        assert_eq!((info.min_lod, info.max_lod), (0.0, 0.0));
    }
}
