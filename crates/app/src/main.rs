//! vkframe demo binary.
//!
//! Opens a fixed-size window, builds the configured demo scene and draws it
//! until the window is closed or a frame fails.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use vkframe_core::Config;
use vkframe_platform::Window;
use vkframe_renderer::Renderer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults apply if it does not exist
    #[arg(long, default_value = "vkframe.toml")]
    config: PathBuf,

    /// Run without the Khronos validation layer
    #[arg(long)]
    no_validation: bool,
}

struct App {
    config: Config,
    // Dropped before the window it presents to.
    renderer: Option<Renderer>,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_cfg = &self.config.window;
        let window = match Window::new(
            event_loop,
            window_cfg.width,
            window_cfg.height,
            &window_cfg.title,
        ) {
            Ok(window) => window,
            Err(e) => {
                let err = anyhow::Error::new(e).context("failed to open window");
                self.fail(event_loop, err);
                return;
            }
        };

        match Renderer::new(&window, &self.config) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                let class = e.class();
                let err =
                    anyhow::Error::new(e).context(format!("renderer setup failed ({:?})", class));
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                if let Some(window) = self.window.as_mut() {
                    window.request_close();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && let Some(window) = self.window.as_mut()
                {
                    info!("Escape pressed, shutting down");
                    window.request_close();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(renderer) = self.renderer.as_mut()
                    && let Err(e) = renderer.render_frame()
                {
                    let class = e.class();
                    let err = anyhow::Error::new(e).context(format!("frame failed ({:?})", class));
                    self.fail(event_loop, err);
                    return;
                }
            }
            _ => {}
        }

        if self.window.as_ref().is_some_and(Window::should_close) {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref()
            && !window.should_close()
        {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut renderer) = self.renderer.take() {
            if let Err(e) = renderer.shutdown() {
                error!("Failed to drain GPU work on exit: {}", e);
            }
            info!("Presented {} frame(s)", renderer.frames_presented());
        }
        self.window = None;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    if args.no_validation {
        config.renderer.validation = false;
    }

    vkframe_core::init_logging_with(&config.log.filter);
    info!("Configuration: {}", source);
    debug!("{:?}", config);
    info!("Starting vkframe (demo {:?})", config.renderer.demo);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.failure.take() {
        return Err(err);
    }

    info!("Exited cleanly");
    Ok(())
}
