//! Descriptor set layouts, pools and write helpers.
//!
//! Pools are sized exactly: one set per swapchain image and, for every
//! descriptor type, the set count times the per-set count. Nothing is ever
//! freed back to a pool; sets live as long as the pool.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::descriptor::{DescriptorBindingBuilder, DescriptorPool, DescriptorSetLayout};
//!
//! # fn example(device: Arc<Device>, image_count: u32) -> Result<(), vkframe_rhi::RhiError> {
//! let layout = DescriptorSetLayout::new(
//!     device.clone(),
//!     &[DescriptorBindingBuilder::uniform_buffer(0, vk::ShaderStageFlags::VERTEX)],
//! )?;
//! let pool = DescriptorPool::for_layout(device, &layout, image_count)?;
//! let sets = pool.allocate(&vec![layout.handle(); image_count as usize])?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Descriptor set layout wrapper.
///
/// Remembers the descriptor counts per type so a matching pool can be sized.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
    counts: Vec<(vk::DescriptorType, u32)>,
}

impl DescriptorSetLayout {
    /// Creates a layout with `bindings` in the given order.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        let counts = bindings
            .iter()
            .map(|b| (b.descriptor_type, b.descriptor_count))
            .collect();

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self {
            device,
            layout,
            counts,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    /// Descriptor type and count of each binding, in binding order.
    #[inline]
    pub fn descriptor_counts(&self) -> &[(vk::DescriptorType, u32)] {
        &self.counts
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Pool sizes for `set_count` sets with `per_set_counts` descriptors each.
///
/// Entries of the same type are merged. No headroom is added.
pub fn exact_pool_sizes(
    set_count: u32,
    per_set_counts: &[(vk::DescriptorType, u32)],
) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();

    for &(ty, count) in per_set_counts {
        match sizes.iter_mut().find(|size| size.ty == ty) {
            Some(size) => size.descriptor_count += count * set_count,
            None => sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(ty)
                    .descriptor_count(count * set_count),
            ),
        }
    }

    sizes
}

/// Descriptor pool wrapper.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={:?}",
            max_sets,
            pool_sizes
                .iter()
                .map(|s| (s.ty, s.descriptor_count))
                .collect::<Vec<_>>()
        );

        Ok(Self {
            device,
            pool,
            max_sets,
        })
    }

    /// Creates a pool holding exactly `set_count` sets of `layout`.
    pub fn for_layout(
        device: Arc<Device>,
        layout: &DescriptorSetLayout,
        set_count: u32,
    ) -> RhiResult<Self> {
        let sizes = exact_pool_sizes(set_count, layout.descriptor_counts());
        Self::new(device, set_count, &sizes)
    }

    /// Allocates one set per entry of `layouts`.
    ///
    /// # Errors
    ///
    /// [`RhiError::DescriptorPoolExhausted`] when the pool has no room left.
    pub fn allocate(
        &self,
        layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                    RhiError::DescriptorPoolExhausted(format!(
                        "{} set(s) requested from pool of {}",
                        layouts.len(),
                        self.max_sets
                    ))
                }
                other => RhiError::VulkanError(other),
            })?;

        debug!("Allocated {} descriptor set(s)", sets.len());

        Ok(sets)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

pub fn update_descriptor_sets(device: &Device, writes: &[vk::WriteDescriptorSet]) {
    if writes.is_empty() {
        return;
    }

    unsafe {
        device.handle().update_descriptor_sets(writes, &[]);
    }

    debug!("Wrote {} descriptor(s)", writes.len());
}

#[inline]
pub fn buffer_info(
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    range: vk::DeviceSize,
) -> vk::DescriptorBufferInfo {
    vk::DescriptorBufferInfo::default()
        .buffer(buffer)
        .offset(offset)
        .range(range)
}

#[inline]
pub fn image_info(
    sampler: vk::Sampler,
    image_view: vk::ImageView,
    image_layout: vk::ImageLayout,
) -> vk::DescriptorImageInfo {
    vk::DescriptorImageInfo::default()
        .sampler(sampler)
        .image_view(image_view)
        .image_layout(image_layout)
}

/// Shorthand constructors for single-descriptor layout bindings.
pub struct DescriptorBindingBuilder;

impl DescriptorBindingBuilder {
    #[inline]
    pub fn uniform_buffer(
        binding: u32,
        stage_flags: vk::ShaderStageFlags,
    ) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(stage_flags)
    }

    #[inline]
    pub fn combined_image_sampler(
        binding: u32,
        stage_flags: vk::ShaderStageFlags,
    ) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(stage_flags)
    }
}
