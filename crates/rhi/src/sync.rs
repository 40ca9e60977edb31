//! Synchronization primitives.
//!
//! - [`Semaphore`] orders GPU work: acquire before render, render before present.
//! - [`Fence`] lets the host wait for a submission to finish.
//! - [`FrameSync`] bundles the three objects one frame slot needs.
//!
//! Wait and reset return the raw `vk::Result` so the frame loop can attribute
//! a failure to the step that produced it.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Number of frames the host may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Binary semaphore, created unsignaled.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Host-visible fence.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a fence, optionally already signaled so the first wait on it
    /// returns immediately.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    pub fn wait(&self, timeout: u64) -> Result<(), vk::Result> {
        let fences = [self.fence];
        unsafe { self.device.handle().wait_for_fences(&fences, true, timeout) }
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// The fence must not be pending on any queue.
    pub fn reset(&self) -> Result<(), vk::Result> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences) }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects owned by one frame slot.
///
/// ```text
/// wait in_flight -> reset in_flight
///   -> acquire (signals image_available)
///   -> submit (waits image_available, signals render_finished + in_flight)
///   -> present (waits render_finished)
/// ```
pub struct FrameSync {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// Creates both semaphores unsignaled and the fence signaled.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Creates one [`FrameSync`] per frame slot.
    pub fn for_slots(device: &Arc<Device>, slots: usize) -> RhiResult<Vec<Self>> {
        let syncs = (0..slots)
            .map(|_| Self::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;
        debug!("Created synchronization objects for {} frame slots", slots);
        Ok(syncs)
    }

    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_buffered() {
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }

    #[test]
    fn test_sync_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
