//! Windowed host for the scene.
//!
//! [`run`] opens a winit window, creates the [`SceneRenderer`] and drives one
//! simulation frame per redraw. Frame faults are caught and logged; the next
//! redraw is still requested.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::assets::FileAssets;
use crate::config::SceneConfig;
use crate::diagnostics::guard_frame;
use crate::error::AppError;
use crate::gpu::SceneRenderer;
use crate::input::{Input, SceneCommand};
#[cfg(feature = "egui")]
use crate::pool::ParticleSystem;
use crate::simulation::FrameSimulator;

const TITLE: &str = "Petal Field";

struct App {
    scene: SceneConfig,
    sim: FrameSimulator,
    input: Input,
    window: Option<Arc<Window>>,
    renderer: Option<SceneRenderer>,
    #[cfg(feature = "egui")]
    egui: Option<crate::gpu::EguiIntegration>,
    dismiss_hinted: bool,
    error: Option<AppError>,
}

impl App {
    fn new(scene: SceneConfig, sim: FrameSimulator) -> Self {
        Self {
            scene,
            sim,
            input: Input::new(1280, 720),
            window: None,
            renderer: None,
            #[cfg(feature = "egui")]
            egui: None,
            dismiss_hinted: false,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let renderer = pollster::block_on(SceneRenderer::new(window.clone(), &self.scene))?;

        let (width, height) = renderer.size();
        self.input.set_window_size(width, height);
        self.sim.resize(width, height);

        #[cfg(feature = "egui")]
        {
            self.egui = Some(crate::gpu::EguiIntegration::new(
                renderer.device(),
                renderer.surface_format(),
                &window,
            ));
        }

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn apply(&mut self, command: SceneCommand, event_loop: &ActiveEventLoop) {
        match command {
            SceneCommand::EnterField => self.sim.enter_field(),
            SceneCommand::Reveal => self.sim.trigger_final_reveal(),
            SceneCommand::Dismiss => self.sim.dismiss(),
            SceneCommand::Exit => event_loop.exit(),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        for command in self.input.take_commands() {
            self.apply(command, event_loop);
        }

        let sim = &mut self.sim;
        let input = &mut self.input;
        guard_frame(|| {
            sim.orbit(input.drag_delta(), input.scroll_delta());
            sim.set_cursor(input.cursor_ndc());
            sim.step()
        });
        self.input.end_frame();

        self.update_title();

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        self.sim.present(renderer);

        #[cfg(feature = "egui")]
        let result = match (self.egui.as_mut(), self.window.as_ref()) {
            (Some(egui), Some(window)) => {
                let state = self.sim.state();
                let stats = crate::gpu::PanelStats {
                    phase: state.reveal.phase(),
                    fps: self.sim.clock().fps(),
                    hover_live: state.hover.live_count(),
                    hover_capacity: state.hover.capacity(),
                    petals: state.petals.capacity(),
                    fireflies: state.fireflies.capacity(),
                    dismiss_visible: state.reveal.dismiss_visible(),
                };
                let (output, commands) = egui.run_panel(window, &stats);
                let (width, height) = renderer.size();
                let result = renderer.render_with(|device, queue, encoder, view| {
                    egui.paint(device, queue, encoder, view, &output, [width, height]);
                });
                self.input.extend_commands(commands);
                result
            }
            _ => renderer.render(),
        };
        #[cfg(not(feature = "egui"))]
        let result = renderer.render();

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Render error: {e:?}"),
        }
    }

    fn update_title(&mut self) {
        let visible = self.sim.state().reveal.dismiss_visible();
        if visible != self.dismiss_hinted {
            self.dismiss_hinted = visible;
            if let Some(window) = &self.window {
                if visible {
                    window.set_title(&format!("{TITLE} (press T to dismiss)"));
                } else {
                    window.set_title(TITLE);
                }
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("Startup failed: {e}");
            self.error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let (Some(egui), Some(window)) = (self.egui.as_mut(), self.window.as_ref()) {
            if egui.on_window_event(window, &event) {
                return;
            }
        }

        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                }
                self.sim.resize(physical_size.width, physical_size.height);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Open the window and run the scene until it is closed.
pub fn run(scene: SceneConfig) -> Result<(), AppError> {
    let provider = FileAssets::new(&scene.assets);
    let sim = FrameSimulator::new(scene.clone(), Box::new(provider))?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, sim);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
