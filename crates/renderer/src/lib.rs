//! Demo renderer built on `vkframe_rhi`.
//!
//! - [`Renderer`]: owns the Vulkan object graph and draws frames
//! - [`frame`]: the per-frame wait/acquire/update/submit/present loop
//! - [`pipeline_registry`]: named shaders and pipelines
//! - [`descriptors`]: demo descriptor layouts and per-image sets
//! - [`scene`]: demo geometry and draw order
//! - [`ubo`]: uniform block layouts and transforms

pub mod descriptors;
mod error;
pub mod frame;
pub mod pipeline_registry;
mod renderer;
pub mod scene;
pub mod ubo;

pub use error::{RendererError, RendererResult};
pub use frame::{FrameBackend, FrameOrchestrator, FrameState};
pub use renderer::Renderer;

pub use vkframe_rhi::sync::MAX_FRAMES_IN_FLIGHT;
