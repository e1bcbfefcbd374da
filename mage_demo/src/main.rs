//! Mage demo - thin window bootstrap around the framework
//!
//! Loads the JSON scene description, builds the application context and the
//! Vulkan backend, and drives the render loop from the winit event loop.
//! All application state lives in `AppContext`/`DemoApp`; there are no
//! process-wide globals.
//!
//! Exits nonzero on any initialization or render error (reported through
//! the logger), zero on normal window close.

use std::path::PathBuf;
use std::process::ExitCode;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use mage_framework::mage::config::SceneConfig;
use mage_framework::mage::{AppContext, Error, MeshData, Result, TextureData};
use mage_framework::{mage_error, mage_info};
use mage_framework_renderer_vulkan::mage::{BackendConfig, ModelAsset, VulkanBackend};

struct DemoApp {
    config_path: PathBuf,
    window: Option<Window>,
    context: Option<AppContext>,
    backend: Option<VulkanBackend>,
    /// First error encountered; reported after the loop exits
    failure: Option<Error>,
}

impl DemoApp {
    fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            window: None,
            context: None,
            backend: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        mage_error!("mage::demo", "{}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    fn startup(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = SceneConfig::load_from_path(&self.config_path)?;

        let window_attrs = Window::default_attributes()
            .with_title("Mage Framework")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = event_loop
            .create_window(window_attrs)
            .map_err(|e| Error::Backend(format!("Failed to create window: {}", e)))?;

        let size = window.inner_size();
        let context = AppContext::new(config, (size.width, size.height));

        let backend_config = BackendConfig {
            app_name: "Mage Demo".to_string(),
            shader_dir: context.config.shader_dir.clone(),
            post_process: context.config.post_process.clone(),
        };

        let mut backend =
            VulkanBackend::new(&window, (size.width, size.height), backend_config)?;

        let assets = resolve_assets(&context)?;
        backend.initialize(assets)?;

        mage_info!("mage::demo", "Startup complete ({}x{})", size.width, size.height);

        window.request_redraw();
        self.window = Some(window);
        self.context = Some(context);
        self.backend = Some(backend);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(context), Some(backend)) = (self.context.as_mut(), self.backend.as_mut())
        else {
            return Ok(());
        };

        let frame_delta_ms = context.begin_frame();
        backend.render_frame(
            &context.camera,
            context.frame_counter,
            context.timer.elapsed_secs(),
            frame_delta_ms,
        )
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(error) = self.startup(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(context) = self.context.as_mut() {
                    context.set_window_extent(size.width, size.height);
                }
                if let Some(backend) = self.backend.as_mut() {
                    backend.note_window_resized(size.width, size.height);
                }
                // Minimized: block on events instead of spinning
                let minimized = self
                    .context
                    .as_ref()
                    .map(|c| c.is_minimized())
                    .unwrap_or(false);
                event_loop.set_control_flow(if minimized {
                    ControlFlow::Wait
                } else {
                    ControlFlow::Poll
                });
            }
            WindowEvent::RedrawRequested => {
                let minimized = self
                    .context
                    .as_ref()
                    .map(|c| c.is_minimized())
                    .unwrap_or(true);
                if !minimized {
                    if let Err(error) = self.render() {
                        self.fail(event_loop, error);
                        return;
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Resolve configured model sources into decoded assets.
///
/// The demo ships no asset parsers; it understands the `builtin:` sources
/// only. Anything else is a missing-resource error surfaced at startup.
fn resolve_assets(context: &AppContext) -> Result<Vec<ModelAsset>> {
    context
        .config
        .models
        .iter()
        .map(|model| {
            let mesh = match model.mesh.as_str() {
                "builtin:cube" => MeshData::unit_cube(),
                other => {
                    return Err(Error::ResourceNotFound(format!(
                        "mesh '{}' (the demo only provides builtin meshes)",
                        other
                    )));
                }
            };
            let texture = match model.texture.as_str() {
                "builtin:checker" => TextureData::checkerboard(256, 256, 32),
                other => {
                    return Err(Error::ResourceNotFound(format!(
                        "texture '{}' (the demo only provides builtin textures)",
                        other
                    )));
                }
            };
            Ok(ModelAsset {
                name: model.name.clone(),
                mesh,
                texture,
                transform: model.transform.to_matrix(),
            })
        })
        .collect()
}

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("mage_demo/scene.json"));

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            mage_error!("mage::demo", "Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new(config_path);
    if let Err(e) = event_loop.run_app(&mut app) {
        mage_error!("mage::demo", "Event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    match app.failure {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
