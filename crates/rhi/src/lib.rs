//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! Thin RAII wrappers over `ash`:
//! - Instance, physical device selection and logical device
//! - Swapchain, render pass and framebuffers
//! - Command pools and one-shot uploads
//! - Buffers, textures and samplers backed by gpu-allocator
//! - Shaders, pipelines and descriptors
//! - Synchronization primitives

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex;

pub use error::{FailureClass, FrameStage, RhiError, RhiResult};

pub use ash::vk;
