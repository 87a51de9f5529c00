//! Optional on-screen story panel, enabled with the `egui` feature.
//!
//! The panel mirrors the keyboard bindings with three buttons and shows how
//! full the particle pools are.

use std::sync::Arc;

use winit::window::Window;

use crate::input::SceneCommand;
use crate::reveal::RevealPhase;

/// Egui context, winit state and wgpu renderer.
pub struct EguiIntegration {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

/// Output from egui frame processing.
pub struct EguiFrameOutput {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Figures shown in the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelStats {
    pub phase: RevealPhase,
    pub fps: f32,
    pub hover_live: usize,
    pub hover_capacity: usize,
    pub petals: usize,
    pub fireflies: usize,
    pub dismiss_visible: bool,
}

impl EguiIntegration {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        window: &Arc<Window>,
    ) -> Self {
        let ctx = egui::Context::default();

        // Light theme over the pale background
        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::light();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            None,  // depth format
            1,     // msaa samples
            false, // dithering
        );

        Self { ctx, state, renderer }
    }

    /// Process a winit event.
    ///
    /// Returns true if egui consumed the event (don't pass to the orbit controls).
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the story panel for one frame.
    ///
    /// Returns the tessellated output and the commands clicked this frame.
    pub fn run_panel(&mut self, window: &Window, stats: &PanelStats) -> (EguiFrameOutput, Vec<SceneCommand>) {
        let raw_input = self.state.take_egui_input(window);
        let mut commands = Vec::new();
        let full_output = self.ctx.run(raw_input, |ctx| {
            story_panel(ctx, stats, &mut commands);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let output = EguiFrameOutput {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        };
        (output, commands)
    }

    /// Upload textures and buffers, then draw the panel over `view`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        output: &EguiFrameOutput,
        size_in_pixels: [u32; 2],
    ) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: output.pixels_per_point,
        };

        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &output.paint_jobs,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Story Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut render_pass = render_pass.forget_lifetime();
            self.renderer
                .render(&mut render_pass, &output.paint_jobs, &screen_descriptor);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn story_panel(ctx: &egui::Context, stats: &PanelStats, commands: &mut Vec<SceneCommand>) {
    egui::Window::new("Story")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            ui.label(format!("Phase: {:?}", stats.phase));
            ui.label(format!("{:.0} fps", stats.fps));
            ui.separator();

            let idle = stats.phase == RevealPhase::Idle;
            if ui.add_enabled(idle, egui::Button::new("Enter the field")).clicked() {
                commands.push(SceneCommand::EnterField);
            }
            let can_reveal = matches!(
                stats.phase,
                RevealPhase::Idle | RevealPhase::Entering | RevealPhase::Active
            );
            if ui.add_enabled(can_reveal, egui::Button::new("Reveal")).clicked() {
                commands.push(SceneCommand::Reveal);
            }
            if ui
                .add_enabled(stats.dismiss_visible, egui::Button::new("Dismiss"))
                .clicked()
            {
                commands.push(SceneCommand::Dismiss);
            }

            ui.separator();
            ui.label(format!(
                "Sparkles: {} / {}",
                stats.hover_live, stats.hover_capacity
            ));
            ui.label(format!("Petals: {}", stats.petals));
            ui.label(format!("Fireflies: {}", stats.fireflies));
        });
}
