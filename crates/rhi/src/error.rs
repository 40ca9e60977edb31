//! RHI error types and failure classification.

use std::fmt;

use ash::vk;
use thiserror::Error;

/// Step of the per-frame loop that produced a steady-state failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Wait,
    Acquire,
    Submit,
    Present,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStage::Wait => "wait",
            FrameStage::Acquire => "acquire",
            FrameStage::Submit => "submit",
            FrameStage::Present => "present",
        };
        f.write_str(name)
    }
}

/// Broad category of a failure, used to decide how it is reported.
///
/// All classes are fatal; there is no retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Instance, device, swapchain, pipeline or buffer creation failed.
    Setup,
    /// No compatible memory type, out of memory, or a pool ran dry.
    ResourceExhaustion,
    /// Acquire, submit or present failed while the frame loop was running.
    SteadyState,
    /// Shader bytecode was empty, malformed or unreadable.
    ShaderLoad,
}

/// RHI error type.
#[derive(Error, Debug)]
pub enum RhiError {
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    #[error("Failed to load Vulkan library: {0}")]
    LoadingError(#[from] ash::LoadingError),

    #[error("GPU allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    #[error("GPU allocator lock poisoned")]
    AllocatorLockPoisoned,

    #[error("No suitable GPU found")]
    NoSuitableGpu,

    #[error("Validation layer {0} requested but not available")]
    ValidationLayerUnavailable(String),

    #[error("Shader error: {0}")]
    ShaderError(String),

    #[error("Surface error: {0}")]
    SurfaceError(String),

    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    #[error("Buffer error: {0}")]
    BufferError(String),

    #[error("Texture error: {0}")]
    TextureError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),

    #[error("Descriptor pool exhausted: {0}")]
    DescriptorPoolExhausted(String),

    #[error("Unsupported image layout transition {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    },

    #[error("Frame {stage} failed: {result}")]
    FrameFailure {
        stage: FrameStage,
        result: vk::Result,
    },
}

impl RhiError {
    /// Wraps a raw result from one of the frame loop's steps.
    pub fn frame(stage: FrameStage, result: vk::Result) -> Self {
        RhiError::FrameFailure { stage, result }
    }

    /// Returns the failure class of this error.
    pub fn class(&self) -> FailureClass {
        match self {
            RhiError::FrameFailure { .. } => FailureClass::SteadyState,
            RhiError::ShaderError(_) => FailureClass::ShaderLoad,
            RhiError::AllocatorError(_)
            | RhiError::AllocatorLockPoisoned
            | RhiError::DescriptorPoolExhausted(_) => FailureClass::ResourceExhaustion,
            RhiError::VulkanError(result) if is_exhaustion(*result) => {
                FailureClass::ResourceExhaustion
            }
            _ => FailureClass::Setup,
        }
    }
}

fn is_exhaustion(result: vk::Result) -> bool {
    matches!(
        result,
        vk::Result::ERROR_OUT_OF_HOST_MEMORY
            | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
            | vk::Result::ERROR_OUT_OF_POOL_MEMORY
            | vk::Result::ERROR_FRAGMENTED_POOL
            | vk::Result::ERROR_TOO_MANY_OBJECTS
    )
}

/// Result type for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_failures_are_steady_state() {
        let err = RhiError::frame(FrameStage::Acquire, vk::Result::ERROR_OUT_OF_DATE_KHR);
        assert_eq!(err.class(), FailureClass::SteadyState);
        assert_eq!(
            err.to_string(),
            format!("Frame acquire failed: {}", vk::Result::ERROR_OUT_OF_DATE_KHR)
        );
    }

    #[test]
    fn test_memory_errors_are_exhaustion() {
        assert_eq!(
            RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY).class(),
            FailureClass::ResourceExhaustion
        );
        assert_eq!(
            RhiError::VulkanError(vk::Result::ERROR_OUT_OF_POOL_MEMORY).class(),
            FailureClass::ResourceExhaustion
        );
        assert_eq!(
            RhiError::DescriptorPoolExhausted("sets".into()).class(),
            FailureClass::ResourceExhaustion
        );
        assert_eq!(
            RhiError::AllocatorLockPoisoned.class(),
            FailureClass::ResourceExhaustion
        );
    }

    #[test]
    fn test_creation_errors_are_setup() {
        assert_eq!(
            RhiError::VulkanError(vk::Result::ERROR_INITIALIZATION_FAILED).class(),
            FailureClass::Setup
        );
        assert_eq!(RhiError::NoSuitableGpu.class(), FailureClass::Setup);
        assert_eq!(
            RhiError::ValidationLayerUnavailable("VK_LAYER_KHRONOS_validation".into()).class(),
            FailureClass::Setup
        );
    }

    #[test]
    fn test_shader_errors_are_shader_load() {
        assert_eq!(
            RhiError::ShaderError("empty".into()).class(),
            FailureClass::ShaderLoad
        );
    }
}
