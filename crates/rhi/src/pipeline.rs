//! Graphics pipeline management.
//!
//! - [`PipelineLayout`] wraps VkPipelineLayout (descriptor set layouts only).
//! - [`Pipeline`] wraps a graphics VkPipeline.
//! - [`GraphicsPipelineBuilder`] assembles fixed-function state against a
//!   render pass with a static viewport.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::pipeline::{GraphicsPipelineBuilder, PipelineLayout};
//! use vkframe_rhi::render_pass::RenderPass;
//! use vkframe_rhi::shader::Shader;
//! use vkframe_rhi::vertex::QuadVertex;
//! use ash::vk;
//!
//! # fn example(device: Arc<Device>, vs: &Shader, fs: &Shader, rp: &RenderPass) -> vkframe_rhi::RhiResult<()> {
//! let layout = PipelineLayout::new(device.clone(), &[])?;
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(vs)
//!     .fragment_shader(fs)
//!     .vertex_binding(QuadVertex::binding_description())
//!     .vertex_attributes(&QuadVertex::attribute_descriptions())
//!     .render_pass(rp)
//!     .extent(vk::Extent2D { width: 800, height: 600 })
//!     .build(device, &layout)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// Pipeline layout wrapper.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a layout over `descriptor_set_layouts`, in set-index order.
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
    ) -> RhiResult<Self> {
        let create_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(descriptor_set_layouts);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} descriptor set layout(s)",
            descriptor_set_layouts.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Graphics pipeline wrapper.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    fn create_graphics_internal(
        device: Arc<Device>,
        create_info: &vk::GraphicsPipelineCreateInfo,
    ) -> RhiResult<Self> {
        let pipeline = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[*create_info], None)
                .map_err(|(_, result)| {
                    RhiError::PipelineError(format!("Graphics pipeline creation failed: {}", result))
                })?[0]
        };

        info!("Graphics pipeline created");

        Ok(Self { device, pipeline })
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        debug!("Graphics pipeline destroyed");
    }
}

/// Viewport and scissor covering `extent * scale` from the top-left corner.
///
/// Each side is at least one pixel; Vulkan rejects empty viewports.
pub fn scaled_viewport(extent: vk::Extent2D, scale: f32) -> (vk::Viewport, vk::Rect2D) {
    let width = (extent.width as f32 * scale).floor().max(1.0);
    let height = (extent.height as f32 * scale).floor().max(1.0);

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width,
        height,
        min_depth: 0.0,
        max_depth: 1.0,
    };

    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: vk::Extent2D {
            width: width as u32,
            height: height as u32,
        },
    };

    (viewport, scissor)
}

/// Builder for graphics pipelines.
///
/// Defaults: triangle list, fill, back-face culling, counter-clockwise front
/// faces, single sample, blending off, full-extent viewport.
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    topology: vk::PrimitiveTopology,
    polygon_mode: vk::PolygonMode,
    cull_mode: vk::CullModeFlags,
    front_face: vk::FrontFace,
    render_pass: Option<vk::RenderPass>,
    extent: vk::Extent2D,
    viewport_scale: f32,
}

impl Default for GraphicsPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            render_pass: None,
            extent: vk::Extent2D::default(),
            viewport_scale: 1.0,
        }
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn vertex_binding(mut self, binding: vk::VertexInputBindingDescription) -> Self {
        self.vertex_bindings.push(binding);
        self
    }

    pub fn vertex_attributes(mut self, attributes: &[vk::VertexInputAttributeDescription]) -> Self {
        self.vertex_attributes.extend_from_slice(attributes);
        self
    }

    pub fn cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    pub fn front_face(mut self, front_face: vk::FrontFace) -> Self {
        self.front_face = front_face;
        self
    }

    pub fn render_pass(mut self, render_pass: &RenderPass) -> Self {
        self.render_pass = Some(render_pass.handle());
        self
    }

    /// Target extent; the static viewport is derived from it.
    pub fn extent(mut self, extent: vk::Extent2D) -> Self {
        self.extent = extent;
        self
    }

    /// Fraction of the extent covered by the viewport and scissor.
    pub fn viewport_scale(mut self, scale: f32) -> Self {
        self.viewport_scale = scale;
        self
    }

    /// Builds the pipeline against subpass 0 of the configured render pass.
    ///
    /// # Errors
    ///
    /// [`RhiError::PipelineError`] if a shader or the render pass is missing,
    /// the viewport is empty, or the driver rejects the pipeline.
    pub fn build(self, device: Arc<Device>, layout: &PipelineLayout) -> RhiResult<Pipeline> {
        let vertex_shader = self
            .vertex_shader
            .ok_or_else(|| RhiError::PipelineError("Vertex shader is required".to_string()))?;

        let fragment_shader = self
            .fragment_shader
            .ok_or_else(|| RhiError::PipelineError("Fragment shader is required".to_string()))?;

        let render_pass = self
            .render_pass
            .ok_or_else(|| RhiError::PipelineError("Render pass is required".to_string()))?;

        let (viewport, scissor) = scaled_viewport(self.extent, self.viewport_scale);
        if scissor.extent.width == 0 || scissor.extent.height == 0 {
            return Err(RhiError::PipelineError(format!(
                "Viewport is empty: {}x{} at scale {}",
                self.extent.width, self.extent.height, self.viewport_scale
            )));
        }

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&self.vertex_bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.topology)
            .primitive_restart_enable(false);

        let viewports = [viewport];
        let scissors = [scissor];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)];

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .layout(layout.handle())
            .render_pass(render_pass)
            .subpass(0);

        debug!(
            "Building pipeline: {} vertex binding(s), {} attribute(s), viewport {}x{}",
            self.vertex_bindings.len(),
            self.vertex_attributes.len(),
            scissor.extent.width,
            scissor.extent.height
        );

        Pipeline::create_graphics_internal(device, &pipeline_info)
    }
}
