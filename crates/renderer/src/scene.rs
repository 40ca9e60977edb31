//! Demo scenes: geometry, pipelines, uniform blocks and draw order.

use ash::vk;
use glam::{Vec2, Vec3};
use tracing::debug;

use vkframe_core::config::DemoKind;
use vkframe_rhi::command::CommandBuffer;
use vkframe_rhi::render_pass::{CLEAR_COLOR, Framebuffer, RenderPass};
use vkframe_rhi::vertex::{ColorVertex, QuadVertex};

use crate::error::RendererResult;
use crate::pipeline_registry::PipelineRegistry;
use crate::ubo::{ModelViewUbo, MvpUbo, ProjectionUbo};

pub const TEXTURED_PIPELINE: &str = "textured";
pub const TWO_UNIFORMS_PIPELINE: &str = "two-uniforms";
pub const RED_PIPELINE: &str = "red";

/// Viewport scale of the red pipeline in the two-pipelines demo.
pub const SPLIT_VIEWPORT_SCALE: f32 = 0.5;

pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex::new(Vec2::new(-0.5, -0.5), Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
    QuadVertex::new(Vec2::new(0.5, -0.5), Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 0.0)),
    QuadVertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 0.0, 1.0), Vec2::new(0.0, 1.0)),
    QuadVertex::new(Vec2::new(-0.5, 0.5), Vec3::new(1.0, 1.0, 1.0), Vec2::new(1.0, 1.0)),
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

pub const TRIANGLE_VERTICES: [ColorVertex; 3] = [
    ColorVertex::new(Vec2::new(0.0, -0.5), Vec3::new(1.0, 0.0, 0.0)),
    ColorVertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 0.0, 1.0)),
    ColorVertex::new(Vec2::new(-0.5, 0.5), Vec3::new(1.0, 0.0, 1.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    Vertices(u32),
    Indexed(u32),
}

/// One pipeline's worth of commands inside the render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawStep {
    pub pipeline: &'static str,
    /// Bind the scene's vertex buffer (and index buffer, if any).
    pub binds_geometry: bool,
    /// Bind the image's descriptor set at set 0.
    pub binds_set: bool,
    pub draw: DrawCall,
}

/// Shaders a demo needs loaded.
pub fn shader_names(kind: DemoKind) -> &'static [&'static str] {
    match kind {
        DemoKind::TexturedQuad => &["vs-textured", "fs-textured"],
        DemoKind::TwoPipelines => &["vs-two-uniforms", "vs-red", "fs-color"],
    }
}

/// Sizes of the per-image uniform buffers, in binding order.
pub fn uniform_sizes(kind: DemoKind) -> &'static [usize] {
    match kind {
        DemoKind::TexturedQuad => &[MvpUbo::SIZE],
        DemoKind::TwoPipelines => &[ModelViewUbo::SIZE, ProjectionUbo::SIZE],
    }
}

/// Draw order inside the single render pass.
pub fn draw_plan(kind: DemoKind) -> Vec<DrawStep> {
    match kind {
        DemoKind::TexturedQuad => vec![DrawStep {
            pipeline: TEXTURED_PIPELINE,
            binds_geometry: true,
            binds_set: true,
            draw: DrawCall::Indexed(QUAD_INDICES.len() as u32),
        }],
        DemoKind::TwoPipelines => vec![
            DrawStep {
                pipeline: TWO_UNIFORMS_PIPELINE,
                binds_geometry: true,
                binds_set: true,
                draw: DrawCall::Vertices(TRIANGLE_VERTICES.len() as u32),
            },
            // Positions come from the vertex shader itself.
            DrawStep {
                pipeline: RED_PIPELINE,
                binds_geometry: false,
                binds_set: false,
                draw: DrawCall::Vertices(3),
            },
        ],
    }
}

/// Uniform bytes for one frame, one block per binding.
pub fn uniform_blocks(kind: DemoKind, elapsed_secs: f32, extent: vk::Extent2D) -> Vec<Vec<u8>> {
    match kind {
        DemoKind::TexturedQuad => {
            let mvp = MvpUbo::at(elapsed_secs, extent.width, extent.height);
            vec![bytemuck::bytes_of(&mvp).to_vec()]
        }
        DemoKind::TwoPipelines => {
            let model_view = ModelViewUbo::at(elapsed_secs);
            let projection = ProjectionUbo::new(extent.width, extent.height);
            vec![
                bytemuck::bytes_of(&model_view).to_vec(),
                bytemuck::bytes_of(&projection).to_vec(),
            ]
        }
    }
}

/// Buffers and sets the recorded commands refer to.
pub struct SceneBindings<'a> {
    pub pipelines: &'a PipelineRegistry,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: Option<vk::Buffer>,
    /// One per swapchain image.
    pub descriptor_sets: &'a [vk::DescriptorSet],
}

/// Records `steps` for swapchain image `image_index` into a reusable command buffer.
pub fn record_image_commands(
    cmd: &CommandBuffer,
    image_index: usize,
    render_pass: &RenderPass,
    framebuffer: &Framebuffer,
    steps: &[DrawStep],
    bindings: &SceneBindings<'_>,
) -> RendererResult<()> {
    cmd.begin_reusable()?;
    cmd.begin_render_pass(
        render_pass.handle(),
        framebuffer.handle(),
        framebuffer.extent(),
        CLEAR_COLOR,
    );

    for step in steps {
        let pipeline = bindings.pipelines.require(step.pipeline)?;
        cmd.bind_graphics_pipeline(pipeline.handle());

        if step.binds_geometry {
            cmd.bind_vertex_buffers(0, &[bindings.vertex_buffer], &[0]);
            if let Some(index_buffer) = bindings.index_buffer {
                cmd.bind_index_buffer(index_buffer, 0, vk::IndexType::UINT16);
            }
        }

        if step.binds_set {
            cmd.bind_descriptor_sets(
                pipeline.layout(),
                0,
                &[bindings.descriptor_sets[image_index]],
            );
        }

        match step.draw {
            DrawCall::Vertices(count) => cmd.draw(count, 1, 0, 0),
            DrawCall::Indexed(count) => cmd.draw_indexed(count, 1, 0, 0, 0),
        }
    }

    cmd.end_render_pass();
    cmd.end()?;

    debug!(
        "Recorded {} draw step(s) for image {}",
        steps.len(),
        image_index
    );
    Ok(())
}
