//! Top-level renderer.
//!
//! [`Renderer`] owns every Vulkan object the demos use, builds them in a fixed
//! order and destroys them in reverse.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use vkframe_core::config::{Config, DemoKind};
use vkframe_core::Timer;
use vkframe_platform::{Surface, SurfaceProvider};
use vkframe_rhi::buffer::{Buffer, BufferUsage};
use vkframe_rhi::command::CommandPool;
use vkframe_rhi::descriptor::{DescriptorPool, DescriptorSetLayout};
use vkframe_rhi::device::Device;
use vkframe_rhi::instance::Instance;
use vkframe_rhi::physical_device::select_physical_device;
use vkframe_rhi::render_pass::RenderPass;
use vkframe_rhi::swapchain::Swapchain;
use vkframe_rhi::sync::MAX_FRAMES_IN_FLIGHT;
use vkframe_rhi::texture::{Sampler, Texture};

use crate::descriptors::{
    allocate_and_write_sets, textured_layout_bindings, two_uniform_layout_bindings,
};
use crate::error::RendererResult;
use crate::frame::{FrameOrchestrator, VulkanFrameBackend};
use crate::pipeline_registry::{
    PipelineContext, PipelineDesc, PipelineRegistry, ShaderLibrary, VertexLayout,
};
use crate::scene::{
    QUAD_INDICES, QUAD_VERTICES, RED_PIPELINE, SPLIT_VIEWPORT_SCALE, SceneBindings,
    TEXTURED_PIPELINE, TRIANGLE_VERTICES, TWO_UNIFORMS_PIPELINE, draw_plan,
    record_image_commands, shader_names, uniform_blocks, uniform_sizes,
};

/// Vertex and index data uploaded for the active demo.
struct SceneGeometry {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
}

/// Sampled texture for the textured quad.
struct SceneTexture {
    texture: Texture,
    sampler: Sampler,
}

/// Owner of the whole Vulkan object graph.
///
/// # Destruction order
///
/// 1. Wait for the device to go idle
/// 2. Frame loop: sync objects, uniform buffers, framebuffers, swapchain
/// 3. Pipelines, then shader modules
/// 4. Render pass
/// 5. Descriptor pool and layout
/// 6. Geometry and texture
/// 7. Command pool
/// 8. Device, surface, instance
pub struct Renderer {
    frames: ManuallyDrop<FrameOrchestrator<VulkanFrameBackend>>,
    pipelines: ManuallyDrop<PipelineRegistry>,
    shaders: ManuallyDrop<ShaderLibrary>,
    render_pass: ManuallyDrop<RenderPass>,
    descriptor_pool: ManuallyDrop<DescriptorPool>,
    descriptor_set_layout: ManuallyDrop<DescriptorSetLayout>,
    geometry: ManuallyDrop<SceneGeometry>,
    texture: ManuallyDrop<Option<SceneTexture>>,
    command_pool: ManuallyDrop<CommandPool>,
    device: ManuallyDrop<Arc<Device>>,
    surface: ManuallyDrop<Surface>,
    instance: ManuallyDrop<Instance>,

    demo: DemoKind,
    extent: vk::Extent2D,
    timer: Timer,
}

impl Renderer {
    /// Runs the whole setup sequence against `provider`'s surface.
    ///
    /// # Errors
    ///
    /// Any failure is fatal. Shader files are read before the swapchain and
    /// pipelines exist, so a bad `.spv` fails early.
    pub fn new(provider: &impl SurfaceProvider, config: &Config) -> RendererResult<Self> {
        let demo = config.renderer.demo;
        let (width, height) = provider.drawable_extent();
        info!("Initializing renderer ({}x{}, demo {:?})", width, height, demo);

        let surface_extensions = provider.required_instance_extensions()?;
        let instance = Instance::new(config.renderer.validation, &surface_extensions)?;
        let surface = provider.create_surface(instance.entry(), instance.handle())?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let shaders = ShaderLibrary::load(&device, &config.assets.shader_dir, shader_names(demo))?;

        let mut swapchain =
            Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;
        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;
        swapchain.create_framebuffers(&render_pass)?;

        let extent = swapchain.extent();
        let image_count = swapchain.image_count();

        let command_pool = CommandPool::new(device.clone(), device.queue_families().graphics()?)?;

        let descriptor_set_layout = match demo {
            DemoKind::TexturedQuad => {
                DescriptorSetLayout::new(device.clone(), &textured_layout_bindings())?
            }
            DemoKind::TwoPipelines => {
                DescriptorSetLayout::new(device.clone(), &two_uniform_layout_bindings())?
            }
        };
        let descriptor_pool =
            DescriptorPool::for_layout(device.clone(), &descriptor_set_layout, image_count)?;

        let geometry = Self::upload_geometry(&device, &command_pool, demo)?;
        let texture = match demo {
            DemoKind::TexturedQuad => Some(Self::load_texture(&device, &command_pool, config)?),
            DemoKind::TwoPipelines => None,
        };

        let uniform_buffers = Self::create_uniform_buffers(&device, demo, image_count)?;
        let descriptor_sets = allocate_and_write_sets(
            &device,
            &descriptor_pool,
            &descriptor_set_layout,
            &uniform_buffers,
            texture.as_ref().map(|t| (&t.texture, &t.sampler)),
        )?;

        let mut pipelines: PipelineRegistry = PipelineRegistry::new();
        {
            let ctx = PipelineContext {
                device: &device,
                render_pass: &render_pass,
                shaders: &shaders,
                extent,
            };
            let set_layouts = [descriptor_set_layout.handle()];

            match demo {
                DemoKind::TexturedQuad => {
                    let desc = PipelineDesc::new("vs-textured", "fs-textured")
                        .vertex_layout(VertexLayout::quad())
                        .set_layouts(&set_layouts);
                    pipelines.create_pipeline(&ctx, TEXTURED_PIPELINE, &desc)?;
                }
                DemoKind::TwoPipelines => {
                    let desc = PipelineDesc::new("vs-two-uniforms", "fs-color")
                        .vertex_layout(VertexLayout::color())
                        .set_layouts(&set_layouts);
                    pipelines.create_pipeline(&ctx, TWO_UNIFORMS_PIPELINE, &desc)?;

                    let desc = PipelineDesc::new("vs-red", "fs-color")
                        .viewport_scale(SPLIT_VIEWPORT_SCALE)
                        .front_face(vk::FrontFace::CLOCKWISE);
                    pipelines.create_pipeline(&ctx, RED_PIPELINE, &desc)?;
                }
            }
        }

        let command_buffers = command_pool.allocate_command_buffers(image_count)?;
        let steps = draw_plan(demo);
        let bindings = SceneBindings {
            pipelines: &pipelines,
            vertex_buffer: geometry.vertex_buffer.handle(),
            index_buffer: geometry.index_buffer.as_ref().map(Buffer::handle),
            descriptor_sets: &descriptor_sets,
        };
        for (i, (cmd, framebuffer)) in command_buffers
            .iter()
            .zip(swapchain.framebuffers())
            .enumerate()
        {
            record_image_commands(cmd, i, &render_pass, framebuffer, &steps, &bindings)?;
        }
        debug!("Recorded {} command buffer(s)", command_buffers.len());

        let backend =
            VulkanFrameBackend::new(device.clone(), swapchain, command_buffers, uniform_buffers)?;
        let frames = FrameOrchestrator::new(backend);

        info!(
            "Renderer initialized: {} swapchain images, {} frames in flight, pipelines {:?}",
            image_count,
            MAX_FRAMES_IN_FLIGHT,
            pipelines.names()
        );

        Ok(Self {
            frames: ManuallyDrop::new(frames),
            pipelines: ManuallyDrop::new(pipelines),
            shaders: ManuallyDrop::new(shaders),
            render_pass: ManuallyDrop::new(render_pass),
            descriptor_pool: ManuallyDrop::new(descriptor_pool),
            descriptor_set_layout: ManuallyDrop::new(descriptor_set_layout),
            geometry: ManuallyDrop::new(geometry),
            texture: ManuallyDrop::new(texture),
            command_pool: ManuallyDrop::new(command_pool),
            device: ManuallyDrop::new(device),
            surface: ManuallyDrop::new(surface),
            instance: ManuallyDrop::new(instance),
            demo,
            extent,
            timer: Timer::new(),
        })
    }

    fn upload_geometry(
        device: &Arc<Device>,
        pool: &CommandPool,
        demo: DemoKind,
    ) -> RendererResult<SceneGeometry> {
        let geometry = match demo {
            DemoKind::TexturedQuad => SceneGeometry {
                vertex_buffer: Buffer::device_local_with_data(
                    device.clone(),
                    pool,
                    BufferUsage::Vertex,
                    bytemuck::cast_slice(&QUAD_VERTICES),
                )?,
                index_buffer: Some(Buffer::device_local_with_data(
                    device.clone(),
                    pool,
                    BufferUsage::Index,
                    bytemuck::cast_slice(&QUAD_INDICES),
                )?),
            },
            DemoKind::TwoPipelines => SceneGeometry {
                vertex_buffer: Buffer::device_local_with_data(
                    device.clone(),
                    pool,
                    BufferUsage::Vertex,
                    bytemuck::cast_slice(&TRIANGLE_VERTICES),
                )?,
                index_buffer: None,
            },
        };

        debug!(
            "Uploaded geometry: {} vertex bytes, {} index bytes",
            geometry.vertex_buffer.size(),
            geometry.index_buffer.as_ref().map_or(0, Buffer::size)
        );
        Ok(geometry)
    }

    fn load_texture(
        device: &Arc<Device>,
        pool: &CommandPool,
        config: &Config,
    ) -> RendererResult<SceneTexture> {
        let image = vkframe_resources::decode(&config.assets.texture)?;
        let texture =
            Texture::from_rgba8(device.clone(), pool, image.width, image.height, &image.pixels)?;
        let sampler = Sampler::new(device.clone())?;

        info!(
            "Texture loaded: {} ({}x{}, {} source channel(s))",
            config.assets.texture.display(),
            image.width,
            image.height,
            image.channels
        );
        Ok(SceneTexture { texture, sampler })
    }

    fn create_uniform_buffers(
        device: &Arc<Device>,
        demo: DemoKind,
        image_count: u32,
    ) -> RendererResult<Vec<Vec<Buffer>>> {
        let mut per_image = Vec::with_capacity(image_count as usize);
        for _ in 0..image_count {
            let buffers = uniform_sizes(demo)
                .iter()
                .map(|&size| Buffer::new(device.clone(), BufferUsage::Uniform, size as u64))
                .collect::<Result<Vec<_>, _>>()?;
            per_image.push(buffers);
        }
        Ok(per_image)
    }

    /// Draws one frame with uniforms for the current time.
    ///
    /// # Errors
    ///
    /// A steady-state failure from the frame loop. The caller should stop.
    pub fn render_frame(&mut self) -> RendererResult<u32> {
        let blocks = uniform_blocks(self.demo, self.timer.elapsed_secs(), self.extent);
        let block_refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
        Ok(self.frames.draw_frame(&block_refs)?)
    }

    /// Waits for all in-flight work. Safe to call more than once.
    pub fn shutdown(&mut self) -> RendererResult<()> {
        Ok(self.frames.shutdown()?)
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn demo(&self) -> DemoKind {
        self.demo
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames.frames_presented()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.frames.shutdown() {
            error!("Failed to wait for device idle during renderer drop: {}", e);
        }

        unsafe {
            ManuallyDrop::drop(&mut self.frames);
            ManuallyDrop::drop(&mut self.pipelines);
            ManuallyDrop::drop(&mut self.shaders);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.descriptor_pool);
            ManuallyDrop::drop(&mut self.descriptor_set_layout);
            ManuallyDrop::drop(&mut self.geometry);
            ManuallyDrop::drop(&mut self.texture);
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
