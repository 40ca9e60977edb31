//! Platform layer: winit window and Vulkan surface creation.

mod window;

pub use window::{Surface, SurfaceProvider, Window};
