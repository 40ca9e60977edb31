//! Window management and Vulkan surface creation.
//!
//! [`Window`] is the winit-backed [`SurfaceProvider`]. Event polling stays with
//! the winit event loop; the window only records whether a close was requested.

use std::ffi::{CStr, c_char};
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use vkframe_core::{Error, Result};

/// Source of a presentable Vulkan surface.
pub trait SurfaceProvider {
    /// Instance extensions the surface needs.
    fn required_instance_extensions(&self) -> Result<Vec<*const c_char>>;

    /// Creates a surface owned by the returned [`Surface`].
    fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface>;

    /// Current drawable size in pixels.
    fn drawable_extent(&self) -> (u32, u32);
}

/// Owned `VkSurfaceKHR`, destroyed on drop.
///
/// Must be dropped before the instance it was created from.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}

/// Fixed-size application window.
pub struct Window {
    window: Arc<WinitWindow>,
    close_requested: bool,
}

impl Window {
    /// Opens a non-resizable window of `width` x `height` physical pixels.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        info!("Window created: {}x{} \"{}\"", width, height, title);

        Ok(Self {
            window: Arc::new(window),
            close_requested: false,
        })
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Records that the user asked to close the window.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Whether a close was requested since the window opened.
    pub fn should_close(&self) -> bool {
        self.close_requested
    }
}

impl SurfaceProvider for Window {
    fn required_instance_extensions(&self) -> Result<Vec<*const c_char>> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let extensions = ash_window::enumerate_required_extensions(display_handle.as_raw())
            .map_err(|e| Error::Vulkan(format!("Failed to enumerate required extensions: {}", e)))?;

        debug!(
            "Required Vulkan extensions for surface: {:?}",
            extensions
                .iter()
                .map(|&ext| unsafe { CStr::from_ptr(ext) })
                .collect::<Vec<_>>()
        );

        Ok(extensions.to_vec())
    }

    fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }

    fn drawable_extent(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}
