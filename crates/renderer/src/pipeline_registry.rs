//! Named shaders and named graphics pipelines.
//!
//! Shaders are read and validated up front through [`ShaderLibrary::load`], so
//! a missing or malformed `.spv` file fails before any pipeline is built.
//! Pipelines are then created from shader names via
//! [`PipelineRegistry::create_pipeline`] and looked up by name when recording.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use vkframe_resources::read_shader_bytes;
use vkframe_rhi::device::Device;
use vkframe_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use vkframe_rhi::render_pass::RenderPass;
use vkframe_rhi::shader::{Shader, ShaderStage, spirv_words};
use vkframe_rhi::vertex::{ColorVertex, QuadVertex};

use crate::error::{RendererError, RendererResult};

/// Every shader the demos know about: name, file under the shader directory, stage.
pub const SHADER_SOURCES: [(&str, &str, ShaderStage); 5] = [
    ("vs-red", "red.vert.spv", ShaderStage::Vertex),
    ("vs-two-uniforms", "two_uniforms.vert.spv", ShaderStage::Vertex),
    ("fs-color", "color.frag.spv", ShaderStage::Fragment),
    ("vs-textured", "textured.vert.spv", ShaderStage::Vertex),
    ("fs-textured", "textured.frag.spv", ShaderStage::Fragment),
];

/// File and stage registered for `name`.
pub fn shader_source(name: &str) -> Option<(&'static str, ShaderStage)> {
    SHADER_SOURCES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|&(_, file, stage)| (file, stage))
}

/// Validated SPIR-V read from disk, not yet turned into a module.
#[derive(Debug)]
pub struct ShaderSource {
    pub name: String,
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub bytes: Vec<u8>,
}

/// Reads and validates the named shaders from `shader_dir`.
///
/// # Errors
///
/// - [`RendererError::UnknownShader`] for a name with no registered file
/// - [`RendererError::ShaderSource`] if the file is missing, unreadable or empty
/// - [`RendererError::Rhi`] with a shader error if the bytes are not SPIR-V
pub fn read_shader_sources(shader_dir: &Path, names: &[&str]) -> RendererResult<Vec<ShaderSource>> {
    names
        .iter()
        .map(|&name| {
            let (file, stage) =
                shader_source(name).ok_or_else(|| RendererError::UnknownShader(name.to_string()))?;
            let path = shader_dir.join(file);

            let bytes = read_shader_bytes(&path).map_err(|source| RendererError::ShaderSource {
                name: name.to_string(),
                source,
            })?;
            spirv_words(&bytes)?;

            Ok(ShaderSource {
                name: name.to_string(),
                path,
                stage,
                bytes,
            })
        })
        .collect()
}

/// Shader modules keyed by name.
pub struct ShaderLibrary {
    shaders: HashMap<String, Shader>,
}

impl ShaderLibrary {
    /// Loads every named shader, failing on the first bad one.
    pub fn load(device: &Arc<Device>, shader_dir: &Path, names: &[&str]) -> RendererResult<Self> {
        let sources = read_shader_sources(shader_dir, names)?;

        let mut shaders = HashMap::with_capacity(sources.len());
        for source in sources {
            let shader = Shader::from_spirv_bytes(device.clone(), &source.bytes, source.stage)?;
            debug!("Loaded shader '{}' from {}", source.name, source.path.display());
            shaders.insert(source.name, shader);
        }

        info!("Loaded {} shader(s) from {}", shaders.len(), shader_dir.display());

        Ok(Self { shaders })
    }

    pub fn get(&self, name: &str) -> RendererResult<&Shader> {
        self.shaders
            .get(name)
            .ok_or_else(|| RendererError::UnknownShader(name.to_string()))
    }
}

/// Vertex input description for a pipeline.
#[derive(Debug, Clone)]
pub struct VertexLayout {
    pub binding: vk::VertexInputBindingDescription,
    pub attributes: Vec<vk::VertexInputAttributeDescription>,
}

impl VertexLayout {
    pub fn quad() -> Self {
        Self {
            binding: QuadVertex::binding_description(),
            attributes: QuadVertex::attribute_descriptions().to_vec(),
        }
    }

    pub fn color() -> Self {
        Self {
            binding: ColorVertex::binding_description(),
            attributes: ColorVertex::attribute_descriptions().to_vec(),
        }
    }
}

/// What a named pipeline is built from.
#[derive(Debug, Clone)]
pub struct PipelineDesc<'a> {
    pub vertex_shader: &'a str,
    pub fragment_shader: &'a str,
    /// `None` when the vertex shader generates its own positions.
    pub vertex_layout: Option<VertexLayout>,
    pub set_layouts: &'a [vk::DescriptorSetLayout],
    pub viewport_scale: f32,
    pub front_face: vk::FrontFace,
}

impl<'a> PipelineDesc<'a> {
    pub fn new(vertex_shader: &'a str, fragment_shader: &'a str) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            vertex_layout: None,
            set_layouts: &[],
            viewport_scale: 1.0,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }

    pub fn vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = Some(layout);
        self
    }

    pub fn set_layouts(mut self, set_layouts: &'a [vk::DescriptorSetLayout]) -> Self {
        self.set_layouts = set_layouts;
        self
    }

    pub fn viewport_scale(mut self, scale: f32) -> Self {
        self.viewport_scale = scale;
        self
    }

    pub fn front_face(mut self, front_face: vk::FrontFace) -> Self {
        self.front_face = front_face;
        self
    }
}

/// A pipeline and the layout it was built with.
pub struct GraphicsPipeline {
    // Declared first so the pipeline drops before its layout.
    pipeline: Pipeline,
    layout: PipelineLayout,
}

impl GraphicsPipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}

/// Everything pipeline creation borrows from the renderer.
pub struct PipelineContext<'a> {
    pub device: &'a Arc<Device>,
    pub render_pass: &'a RenderPass,
    pub shaders: &'a ShaderLibrary,
    pub extent: vk::Extent2D,
}

/// Pipelines keyed by name.
pub struct PipelineRegistry<P = GraphicsPipeline> {
    pipelines: HashMap<String, P>,
}

impl<P> Default for PipelineRegistry<P> {
    fn default() -> Self {
        Self {
            pipelines: HashMap::new(),
        }
    }
}

impl<P> PipelineRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pipeline` under `name`, returning whatever it replaced.
    pub fn insert(&mut self, name: impl Into<String>, pipeline: P) -> Option<P> {
        let name = name.into();
        let previous = self.pipelines.insert(name.clone(), pipeline);
        if previous.is_some() {
            warn!("Pipeline '{}' re-registered, replacing the old one", name);
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&P> {
        self.pipelines.get(name)
    }

    /// Like [`get`](Self::get), but a missing name is an error.
    pub fn require(&self, name: &str) -> RendererResult<&P> {
        self.get(name)
            .ok_or_else(|| RendererError::UnknownPipeline(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Drops every pipeline. Must happen before the render pass is destroyed.
    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}

impl PipelineRegistry<GraphicsPipeline> {
    /// Builds a pipeline and its layout and registers it under `name`.
    ///
    /// Re-registering a name drops the previous pipeline.
    pub fn create_pipeline(
        &mut self,
        ctx: &PipelineContext<'_>,
        name: &str,
        desc: &PipelineDesc<'_>,
    ) -> RendererResult<&GraphicsPipeline> {
        let vertex_shader = ctx.shaders.get(desc.vertex_shader)?;
        let fragment_shader = ctx.shaders.get(desc.fragment_shader)?;

        let layout = PipelineLayout::new(ctx.device.clone(), desc.set_layouts)?;

        let mut builder = GraphicsPipelineBuilder::new()
            .vertex_shader(vertex_shader)
            .fragment_shader(fragment_shader)
            .render_pass(ctx.render_pass)
            .extent(ctx.extent)
            .viewport_scale(desc.viewport_scale)
            .front_face(desc.front_face);

        if let Some(vertex_layout) = &desc.vertex_layout {
            builder = builder
                .vertex_binding(vertex_layout.binding)
                .vertex_attributes(&vertex_layout.attributes);
        }

        let pipeline = builder.build(ctx.device.clone(), &layout)?;

        info!(
            "Registered pipeline '{}' ({} + {}, viewport scale {})",
            name, desc.vertex_shader, desc.fragment_shader, desc.viewport_scale
        );

        self.insert(name, GraphicsPipeline { pipeline, layout });
        self.require(name)
    }
}
