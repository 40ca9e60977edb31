//! GPU buffer management.
//!
//! Vertex, index, uniform and staging buffers backed by gpu-allocator.
//! Vertex and index data live in device-local memory and are uploaded through
//! a staging buffer; uniforms stay host-visible and are written every frame.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::buffer::{Buffer, BufferUsage};
//! use vkframe_rhi::command::CommandPool;
//!
//! # fn example(device: Arc<Device>, pool: &CommandPool) -> Result<(), vkframe_rhi::RhiError> {
//! let indices: [u16; 6] = [0, 1, 2, 2, 3, 0];
//! let index_buffer = Buffer::device_local_with_data(
//!     device,
//!     pool,
//!     BufferUsage::Index,
//!     bytemuck::cast_slice(&indices),
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::command::CommandPool;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Host-visible, rewritten every frame.
    Uniform,
    /// Host-visible transfer source for uploads.
    Staging,
}

impl BufferUsage {
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            BufferUsage::Uniform | BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// GPU buffer with gpu-allocator managed memory.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a buffer of `size` bytes with memory chosen for `usage`.
    ///
    /// # Errors
    ///
    /// [`RhiError::BufferError`] for a zero size, [`RhiError::AllocatorError`]
    /// when no memory type satisfies both the usage and the buffer's
    /// requirements.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::BufferError(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = match Self::allocate(&device, usage, requirements) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // Bind failures leave a live allocation; Drop releases both.
        let this = Self {
            device,
            buffer,
            allocation: Some(allocation),
            size,
            usage,
        };

        if let Some(allocation) = &this.allocation {
            unsafe {
                this.device.handle().bind_buffer_memory(
                    this.buffer,
                    allocation.memory(),
                    allocation.offset(),
                )?;
            }
        }

        debug!("Created {} buffer: {} bytes", usage.name(), size);
        Ok(this)
    }

    /// Creates a device-local buffer holding `data`.
    ///
    /// The bytes go through a temporary staging buffer and a blocking copy on
    /// the graphics queue. The staging buffer is released before returning.
    pub fn device_local_with_data(
        device: Arc<Device>,
        pool: &CommandPool,
        usage: BufferUsage,
        data: &[u8],
    ) -> RhiResult<Self> {
        let size = data.len() as vk::DeviceSize;

        let staging = Self::new(device.clone(), BufferUsage::Staging, size)?;
        staging.write_data(0, data)?;

        let buffer = Self::new(device.clone(), usage, size)?;

        pool.immediate_submit(device.graphics_queue(), |cmd| {
            let region = vk::BufferCopy::default().src_offset(0).dst_offset(0).size(size);
            cmd.copy_buffer(staging.handle(), buffer.handle(), &[region]);
            Ok(())
        })?;

        debug!(
            "Uploaded {} bytes to device-local {} buffer",
            size,
            usage.name()
        );
        Ok(buffer)
    }

    /// Copies `data` into mapped memory at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is not host-visible or the write runs past the end.
    pub fn write_data(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::BufferError(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        let mapped_ptr = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| {
                RhiError::BufferError(format!("{} buffer memory is not mapped", self.usage.name()))
            })?;

        unsafe {
            let dst = mapped_ptr.as_ptr().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst as *mut u8, data.len());
        }

        Ok(())
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn allocate(
        device: &Device,
        usage: BufferUsage,
        requirements: vk::MemoryRequirements,
    ) -> RhiResult<Allocation> {
        let mut allocator = device.allocator()?;
        let allocation = allocator.allocate(&AllocationCreateDesc {
            name: usage.name(),
            requirements,
            location: usage.memory_location(),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        Ok(allocation)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        error!("Failed to free buffer allocation: {:?}", e);
                    }
                }
                Err(e) => error!("Leaking {} buffer allocation: {}", self.usage.name(), e),
            }
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}
