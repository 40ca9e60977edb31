//! Frame orchestration.
//!
//! [`FrameOrchestrator`] drives one frame at a time through a [`FrameBackend`]:
//!
//! ```text
//! wait(slot fence) -> reset(slot fence) -> acquire(image)
//!   -> write uniforms(image) -> submit(image cmd) -> present(image) -> slot += 1
//! ```
//!
//! Two frame slots rotate independently of the swapchain image index, so at
//! most [`MAX_FRAMES_IN_FLIGHT`] submissions are pending at once. A failure in
//! any step stops the frame and leaves the slot where it is. A suboptimal
//! swapchain still presents correctly at the fixed extent, so it is logged
//! once and the loop keeps going.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, trace, warn};

use vkframe_rhi::buffer::Buffer;
use vkframe_rhi::command::CommandBuffer;
use vkframe_rhi::device::Device;
use vkframe_rhi::swapchain::Swapchain;
use vkframe_rhi::sync::{FrameSync, MAX_FRAMES_IN_FLIGHT};
use vkframe_rhi::{FrameStage, RhiError, RhiResult};

/// GPU operations the frame loop needs.
///
/// `slot` is always below [`MAX_FRAMES_IN_FLIGHT`]; `image_index` is whatever
/// the last acquire returned. Raw `vk::Result` errors are tagged with their
/// [`FrameStage`] by the orchestrator.
pub trait FrameBackend {
    /// Blocks until the slot's previous submission has finished.
    fn wait_for_fence(&mut self, slot: usize) -> Result<(), vk::Result>;

    fn reset_fence(&mut self, slot: usize) -> Result<(), vk::Result>;

    /// Acquires an image, signaling the slot's image-available semaphore.
    /// The flag is set when the swapchain is suboptimal for the surface.
    fn acquire_next_image(&mut self, slot: usize) -> Result<(u32, bool), vk::Result>;

    /// Copies one byte block per uniform binding into the image's buffers.
    fn write_uniforms(&mut self, image_index: u32, blocks: &[&[u8]]) -> RhiResult<()>;

    /// Submits the image's command buffer, signaling the slot's fence.
    fn submit(&mut self, slot: usize, image_index: u32) -> Result<(), vk::Result>;

    /// Returns `true` when the swapchain is suboptimal for the surface.
    fn present(&mut self, slot: usize, image_index: u32) -> Result<bool, vk::Result>;

    fn wait_idle(&mut self) -> RhiResult<()>;
}

/// Where a frame slot is in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
}

/// Runs the per-frame protocol over a backend.
pub struct FrameOrchestrator<B: FrameBackend> {
    backend: B,
    slot: usize,
    frames_presented: u64,
    states: [FrameState; MAX_FRAMES_IN_FLIGHT],
    suboptimal_reported: bool,
}

impl<B: FrameBackend> FrameOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slot: 0,
            frames_presented: 0,
            states: [FrameState::Idle; MAX_FRAMES_IN_FLIGHT],
            suboptimal_reported: false,
        }
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    #[inline]
    pub fn state(&self, slot: usize) -> FrameState {
        self.states[slot]
    }

    /// Whether acquire or present has reported a suboptimal swapchain.
    #[inline]
    pub fn saw_suboptimal(&self) -> bool {
        self.suboptimal_reported
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Draws one frame, writing `uniform_blocks` into the acquired image's
    /// uniform buffers. Returns the image index that was presented.
    ///
    /// # Errors
    ///
    /// [`RhiError::FrameFailure`] naming the step that failed. The slot does
    /// not advance and its state stays at the failing step.
    pub fn draw_frame(&mut self, uniform_blocks: &[&[u8]]) -> RhiResult<u32> {
        let slot = self.slot;

        trace!(slot, "waiting for frame fence");
        self.backend
            .wait_for_fence(slot)
            .map_err(|e| RhiError::frame(FrameStage::Wait, e))?;
        self.backend
            .reset_fence(slot)
            .map_err(|e| RhiError::frame(FrameStage::Wait, e))?;

        self.states[slot] = FrameState::Acquiring;
        let (image_index, suboptimal) = self
            .backend
            .acquire_next_image(slot)
            .map_err(|e| RhiError::frame(FrameStage::Acquire, e))?;
        trace!(slot, image_index, "acquired image");
        if suboptimal {
            self.report_suboptimal(FrameStage::Acquire);
        }

        self.states[slot] = FrameState::Recording;
        self.backend.write_uniforms(image_index, uniform_blocks)?;

        self.backend
            .submit(slot, image_index)
            .map_err(|e| RhiError::frame(FrameStage::Submit, e))?;
        self.states[slot] = FrameState::Submitted;
        trace!(slot, image_index, "submitted");

        self.states[slot] = FrameState::Presenting;
        let suboptimal = self
            .backend
            .present(slot, image_index)
            .map_err(|e| RhiError::frame(FrameStage::Present, e))?;
        trace!(slot, image_index, "presented");
        if suboptimal {
            self.report_suboptimal(FrameStage::Present);
        }

        self.states[slot] = FrameState::Idle;
        self.slot = (slot + 1) % MAX_FRAMES_IN_FLIGHT;
        self.frames_presented += 1;

        Ok(image_index)
    }

    fn report_suboptimal(&mut self, stage: FrameStage) {
        if !self.suboptimal_reported {
            warn!("Swapchain is suboptimal for the surface ({:?}), continuing", stage);
            self.suboptimal_reported = true;
        }
    }

    /// Waits for the device to go idle. Must run before any teardown.
    pub fn shutdown(&mut self) -> RhiResult<()> {
        self.backend.wait_idle()?;
        info!(
            "Frame loop stopped after {} frame(s)",
            self.frames_presented
        );
        Ok(())
    }
}

/// [`FrameBackend`] over real Vulkan objects.
///
/// Owns the swapchain (with its framebuffers), one pre-recorded command buffer
/// and one set of uniform buffers per image, and the per-slot sync objects.
pub struct VulkanFrameBackend {
    device: Arc<Device>,
    swapchain: Swapchain,
    command_buffers: Vec<CommandBuffer>,
    uniform_buffers: Vec<Vec<Buffer>>,
    frame_sync: Vec<FrameSync>,
}

impl VulkanFrameBackend {
    /// `command_buffers[i]` and `uniform_buffers[i]` belong to swapchain image `i`.
    pub fn new(
        device: Arc<Device>,
        swapchain: Swapchain,
        command_buffers: Vec<CommandBuffer>,
        uniform_buffers: Vec<Vec<Buffer>>,
    ) -> RhiResult<Self> {
        let image_count = swapchain.image_count() as usize;
        if command_buffers.len() != image_count || uniform_buffers.len() != image_count {
            return Err(RhiError::SwapchainError(format!(
                "{} image(s) but {} command buffer(s) and {} uniform set(s)",
                image_count,
                command_buffers.len(),
                uniform_buffers.len()
            )));
        }

        let frame_sync = FrameSync::for_slots(&device, MAX_FRAMES_IN_FLIGHT)?;

        debug!(
            "Frame backend ready: {} images, {} slots",
            image_count, MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            device,
            swapchain,
            command_buffers,
            uniform_buffers,
            frame_sync,
        })
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}

impl FrameBackend for VulkanFrameBackend {
    fn wait_for_fence(&mut self, slot: usize) -> Result<(), vk::Result> {
        self.frame_sync[slot].in_flight().wait(u64::MAX)
    }

    fn reset_fence(&mut self, slot: usize) -> Result<(), vk::Result> {
        self.frame_sync[slot].in_flight().reset()
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<(u32, bool), vk::Result> {
        self.swapchain
            .acquire_next_image(self.frame_sync[slot].image_available())
    }

    fn write_uniforms(&mut self, image_index: u32, blocks: &[&[u8]]) -> RhiResult<()> {
        let buffers = &self.uniform_buffers[image_index as usize];
        if buffers.len() != blocks.len() {
            return Err(RhiError::BufferError(format!(
                "{} uniform block(s) for {} buffer(s)",
                blocks.len(),
                buffers.len()
            )));
        }

        for (buffer, bytes) in buffers.iter().zip(blocks) {
            buffer.write_data(0, bytes)?;
        }
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<(), vk::Result> {
        let sync = &self.frame_sync[slot];

        let wait_semaphores = [sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [sync.render_finished()];
        let command_buffers = [self.command_buffers[image_index as usize].handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .submit_graphics(&[submit_info], sync.in_flight().handle())
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<bool, vk::Result> {
        self.swapchain.present(
            self.device.present_queue(),
            image_index,
            self.frame_sync[slot].render_finished(),
        )
    }

    fn wait_idle(&mut self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ubo::MvpUbo;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Reset(usize),
        Acquire(usize),
        Write(u32),
        Submit(usize, u32),
        Present(usize, u32),
        WaitIdle,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum MockFence {
        Signaled,
        Unsignaled,
        Pending,
    }

    /// Records calls and models fences, a rotating swapchain and uniform memory.
    struct MockBackend {
        image_count: u32,
        next_image: u32,
        calls: Vec<Call>,
        fences: [MockFence; MAX_FRAMES_IN_FLIGHT],
        max_unsignaled: usize,
        uniform_memory: Vec<Vec<Vec<u8>>>,
        /// Uniform bytes each submit rendered with, in submit order.
        submitted_uniforms: Vec<(u32, Vec<Vec<u8>>)>,
        fail: Option<(FrameStage, vk::Result)>,
        suboptimal: bool,
    }

    impl MockBackend {
        fn new(image_count: u32) -> Self {
            Self {
                image_count,
                next_image: 0,
                calls: Vec::new(),
                fences: [MockFence::Signaled; MAX_FRAMES_IN_FLIGHT],
                max_unsignaled: 0,
                uniform_memory: vec![Vec::new(); image_count as usize],
                submitted_uniforms: Vec::new(),
                fail: None,
                suboptimal: false,
            }
        }

        fn suboptimal(mut self) -> Self {
            self.suboptimal = true;
            self
        }

        fn failing_at(mut self, stage: FrameStage, result: vk::Result) -> Self {
            self.fail = Some((stage, result));
            self
        }

        fn check(&self, stage: FrameStage) -> Result<(), vk::Result> {
            match self.fail {
                Some((s, result)) if s == stage => Err(result),
                _ => Ok(()),
            }
        }

        fn track_fences(&mut self) {
            let unsignaled = self
                .fences
                .iter()
                .filter(|f| **f != MockFence::Signaled)
                .count();
            self.max_unsignaled = self.max_unsignaled.max(unsignaled);
        }

        /// What a shader would see when reading binding `binding` of `image`.
        fn gpu_read(&self, image: u32, binding: usize) -> &[u8] {
            &self.uniform_memory[image as usize][binding]
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| pred(c)).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn wait_for_fence(&mut self, slot: usize) -> Result<(), vk::Result> {
            self.calls.push(Call::Wait(slot));
            self.check(FrameStage::Wait)?;
            // Waiting on an unsubmitted, unsignaled fence would hang forever.
            assert_ne!(self.fences[slot], MockFence::Unsignaled, "deadlock on slot {slot}");
            self.fences[slot] = MockFence::Signaled;
            Ok(())
        }

        fn reset_fence(&mut self, slot: usize) -> Result<(), vk::Result> {
            self.calls.push(Call::Reset(slot));
            assert_eq!(self.fences[slot], MockFence::Signaled, "reset of busy fence");
            self.fences[slot] = MockFence::Unsignaled;
            self.track_fences();
            Ok(())
        }

        fn acquire_next_image(&mut self, slot: usize) -> Result<(u32, bool), vk::Result> {
            self.calls.push(Call::Acquire(slot));
            self.check(FrameStage::Acquire)?;
            let image = self.next_image;
            self.next_image = (self.next_image + 1) % self.image_count;
            Ok((image, self.suboptimal))
        }

        fn write_uniforms(&mut self, image_index: u32, blocks: &[&[u8]]) -> RhiResult<()> {
            self.calls.push(Call::Write(image_index));
            self.uniform_memory[image_index as usize] =
                blocks.iter().map(|b| b.to_vec()).collect();
            Ok(())
        }

        fn submit(&mut self, slot: usize, image_index: u32) -> Result<(), vk::Result> {
            self.calls.push(Call::Submit(slot, image_index));
            self.check(FrameStage::Submit)?;
            assert_eq!(self.fences[slot], MockFence::Unsignaled);
            self.fences[slot] = MockFence::Pending;
            self.track_fences();
            // The GPU reads the image's uniforms while this submission runs.
            let snapshot = self.uniform_memory[image_index as usize].clone();
            self.submitted_uniforms.push((image_index, snapshot));
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<bool, vk::Result> {
            self.calls.push(Call::Present(slot, image_index));
            self.check(FrameStage::Present)?;
            Ok(self.suboptimal)
        }

        fn wait_idle(&mut self) -> RhiResult<()> {
            self.calls.push(Call::WaitIdle);
            for fence in &mut self.fences {
                if *fence == MockFence::Pending {
                    *fence = MockFence::Signaled;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_five_frames_alternate_slots() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        let ubo = MvpUbo::default();

        let mut slots = Vec::new();
        for _ in 0..5 {
            slots.push(frames.current_slot());
            frames.draw_frame(&[bytemuck::bytes_of(&ubo)]).unwrap();
        }

        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(frames.frames_presented(), 5);

        let backend = frames.backend();
        assert_eq!(backend.count(|c| matches!(c, Call::Acquire(_))), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(..))), 5);
        assert_eq!(backend.count(|c| matches!(c, Call::Present(..))), 5);
    }

    #[test]
    fn test_steps_run_in_order() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        let block = [0u8; 4];

        frames.draw_frame(&[&block]).unwrap();
        frames.draw_frame(&[&block]).unwrap();

        assert_eq!(
            frames.backend().calls,
            vec![
                Call::Wait(0),
                Call::Reset(0),
                Call::Acquire(0),
                Call::Write(0),
                Call::Submit(0, 0),
                Call::Present(0, 0),
                Call::Wait(1),
                Call::Reset(1),
                Call::Acquire(1),
                Call::Write(1),
                Call::Submit(1, 1),
                Call::Present(1, 1),
            ]
        );
    }

    #[test]
    fn test_image_index_is_independent_of_slot() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        let block = [0u8; 4];

        let images: Vec<u32> = (0..6)
            .map(|_| frames.draw_frame(&[&block]).unwrap())
            .collect();
        assert_eq!(images, vec![0, 1, 2, 0, 1, 2]);

        // Slot 0 rendered images 0, 2 and 1 in turn.
        let slot0: Vec<u32> = frames
            .backend()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit(0, image) => Some(*image),
                _ => None,
            })
            .collect();
        assert_eq!(slot0, vec![0, 2, 1]);
    }

    #[test]
    fn test_never_more_than_two_fences_unsignaled() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        let block = [0u8; 4];

        for _ in 0..10 {
            frames.draw_frame(&[&block]).unwrap();
        }

        let backend = frames.backend();
        assert!(backend.max_unsignaled <= MAX_FRAMES_IN_FLIGHT);
        assert_eq!(backend.max_unsignaled, 2);
    }

    #[test]
    fn test_slot_fence_is_waited_before_reuse() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2));
        let block = [0u8; 4];

        for _ in 0..4 {
            frames.draw_frame(&[&block]).unwrap();
        }

        // Every submit on a slot is preceded by a wait on that slot since
        // the slot's previous submit.
        let calls = &frames.backend().calls;
        for (i, call) in calls.iter().enumerate() {
            if let Call::Submit(slot, _) = call {
                let last_wait = calls[..i].iter().rposition(|c| *c == Call::Wait(*slot));
                let last_submit = calls[..i]
                    .iter()
                    .rposition(|c| matches!(c, Call::Submit(s, _) if s == slot));
                assert!(last_wait.is_some());
                assert!(last_submit.is_none() || last_wait > last_submit);
            }
        }
    }

    #[test]
    fn test_uniform_bytes_reach_acquired_image() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2));

        let sent: Vec<MvpUbo> = (0..4)
            .map(|i| MvpUbo::at(i as f32 * 0.25, 800, 600))
            .collect();
        let images: Vec<u32> = sent
            .iter()
            .map(|ubo| frames.draw_frame(&[bytemuck::bytes_of(ubo)]).unwrap())
            .collect();
        assert_eq!(images, vec![0, 1, 0, 1]);

        // Each submission saw its own frame's bytes, even though frames 2 and
        // 3 later overwrote the same image buffers.
        let submitted = &frames.backend().submitted_uniforms;
        assert_eq!(submitted.len(), sent.len());
        for ((image, blocks), (ubo, expected_image)) in
            submitted.iter().zip(sent.iter().zip(&images))
        {
            assert_eq!(image, expected_image);
            let read: MvpUbo = bytemuck::pod_read_unaligned(&blocks[0]);
            assert_eq!(&read, ubo);
        }
    }

    #[test]
    fn test_multiple_uniform_blocks_are_written() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(2));
        let model_view = [1u8; 128];
        let projection = [2u8; 64];

        let image = frames.draw_frame(&[&model_view, &projection]).unwrap();

        let backend = frames.backend();
        assert_eq!(backend.gpu_read(image, 0), &model_view[..]);
        assert_eq!(backend.gpu_read(image, 1), &projection[..]);
    }

    #[test]
    fn test_acquire_failure_stops_frame() {
        let backend =
            MockBackend::new(3).failing_at(FrameStage::Acquire, vk::Result::ERROR_OUT_OF_DATE_KHR);
        let mut frames = FrameOrchestrator::new(backend);

        let err = frames.draw_frame(&[&[0u8; 4]]).unwrap_err();
        assert!(matches!(
            err,
            RhiError::FrameFailure {
                stage: FrameStage::Acquire,
                result: vk::Result::ERROR_OUT_OF_DATE_KHR,
            }
        ));
        assert_eq!(err.class(), vkframe_rhi::FailureClass::SteadyState);

        assert_eq!(frames.current_slot(), 0);
        assert_eq!(frames.frames_presented(), 0);
        assert_eq!(frames.state(0), FrameState::Acquiring);
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Submit(..))), 0);
    }

    #[test]
    fn test_present_failure_does_not_advance() {
        let backend =
            MockBackend::new(3).failing_at(FrameStage::Present, vk::Result::ERROR_OUT_OF_DATE_KHR);
        let mut frames = FrameOrchestrator::new(backend);

        let err = frames.draw_frame(&[&[0u8; 4]]).unwrap_err();
        assert!(matches!(
            err,
            RhiError::FrameFailure {
                stage: FrameStage::Present,
                result: vk::Result::ERROR_OUT_OF_DATE_KHR,
            }
        ));
        assert_eq!(frames.current_slot(), 0);
        assert_eq!(frames.state(0), FrameState::Presenting);
    }

    #[test]
    fn test_suboptimal_swapchain_keeps_rendering() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3).suboptimal());
        let block = [0u8; 4];

        let images: Vec<u32> = (0..4)
            .map(|_| frames.draw_frame(&[&block]).unwrap())
            .collect();
        assert_eq!(images, vec![0, 1, 2, 0]);
        assert_eq!(frames.frames_presented(), 4);
        assert_eq!(frames.current_slot(), 0);
        assert!(frames.saw_suboptimal());
        assert_eq!(frames.backend().count(|c| matches!(c, Call::Present(..))), 4);
    }

    #[test]
    fn test_optimal_swapchain_is_not_flagged() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        frames.draw_frame(&[&[0u8; 4]]).unwrap();
        assert!(!frames.saw_suboptimal());
    }

    #[test]
    fn test_submit_failure_is_tagged() {
        let backend =
            MockBackend::new(3).failing_at(FrameStage::Submit, vk::Result::ERROR_DEVICE_LOST);
        let mut frames = FrameOrchestrator::new(backend);

        match frames.draw_frame(&[&[0u8; 4]]) {
            Err(RhiError::FrameFailure { stage, result }) => {
                assert_eq!(stage, FrameStage::Submit);
                assert_eq!(result, vk::Result::ERROR_DEVICE_LOST);
            }
            other => panic!("expected submit failure, got {:?}", other),
        }
        assert_eq!(frames.current_slot(), 0);
    }

    #[test]
    fn test_states_return_to_idle() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        frames.draw_frame(&[&[0u8; 4]]).unwrap();
        assert_eq!(frames.state(0), FrameState::Idle);
        assert_eq!(frames.state(1), FrameState::Idle);
    }

    #[test]
    fn test_shutdown_waits_for_idle() {
        let mut frames = FrameOrchestrator::new(MockBackend::new(3));
        frames.draw_frame(&[&[0u8; 4]]).unwrap();
        frames.shutdown().unwrap();

        let backend = frames.backend();
        assert_eq!(backend.calls.last(), Some(&Call::WaitIdle));
        assert!(backend.fences.iter().all(|f| *f == MockFence::Signaled));
    }
}
