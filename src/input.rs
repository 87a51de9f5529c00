//! Window input for the scene.
//!
//! `Input` turns raw winit events into the three things the scene consumes:
//! the cursor in normalized device coordinates (or none), an orbit drag and
//! wheel delta, and the scene commands bound to keys.
//!
//! | Key | Command |
//! |-----|---------|
//! | Enter | [`SceneCommand::EnterField`] |
//! | R | [`SceneCommand::Reveal`] |
//! | T | [`SceneCommand::Dismiss`] |
//! | Escape | [`SceneCommand::Exit`] |

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Actions triggered from the keyboard or the story panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    EnterField,
    Reveal,
    Dismiss,
    Exit,
}

impl SceneCommand {
    /// Command bound to `key`, if any.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Enter | KeyCode::NumpadEnter => Some(SceneCommand::EnterField),
            KeyCode::KeyR => Some(SceneCommand::Reveal),
            KeyCode::KeyT => Some(SceneCommand::Dismiss),
            KeyCode::Escape => Some(SceneCommand::Exit),
            _ => None,
        }
    }
}

/// Convert a pixel position to NDC (x right, y up).
pub fn pixel_to_ndc(position: Vec2, width: u32, height: u32) -> Option<Vec2> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(Vec2::new(
        (position.x / width as f32) * 2.0 - 1.0,
        1.0 - (position.y / height as f32) * 2.0,
    ))
}

/// Input state tracking for one window.
#[derive(Debug, Default)]
pub struct Input {
    cursor_px: Option<Vec2>,
    cursor_ndc: Option<Vec2>,
    dragging: bool,
    drag_delta: Vec2,
    scroll_delta: f32,
    commands: Vec<SceneCommand>,
    window_size: (u32, u32),
}

impl Input {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            window_size: (width, height),
            ..Default::default()
        }
    }

    /// Cursor in NDC, or `None` before the first move and after leaving.
    pub fn cursor_ndc(&self) -> Option<Vec2> {
        self.cursor_ndc
    }

    /// Drag accumulated this frame while the left button is held.
    pub fn drag_delta(&self) -> Vec2 {
        self.drag_delta
    }

    /// Wheel steps this frame. Positive scrolls forward.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Commands pressed since the last call.
    pub fn take_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Queue commands issued outside the keyboard, such as panel buttons.
    pub fn extend_commands(&mut self, commands: impl IntoIterator<Item = SceneCommand>) {
        self.commands.extend(commands);
    }

    /// Clear per-frame deltas.
    pub fn end_frame(&mut self) {
        self.drag_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        if let Some(px) = self.cursor_px {
            self.cursor_ndc = pixel_to_ndc(px, width, height);
        }
    }

    /// Record a cursor move in pixels.
    pub fn cursor_moved(&mut self, position: Vec2) {
        if self.dragging {
            if let Some(previous) = self.cursor_px {
                self.drag_delta += position - previous;
            }
        }
        self.cursor_px = Some(position);
        let (w, h) = self.window_size;
        self.cursor_ndc = pixel_to_ndc(position, w, h);
    }

    pub fn cursor_left(&mut self) {
        self.cursor_px = None;
        self.cursor_ndc = None;
        self.dragging = false;
    }

    pub fn key_pressed(&mut self, key: KeyCode) {
        if let Some(command) = SceneCommand::from_key(key) {
            self.commands.push(command);
        }
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.key_pressed(code);
                    }
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.cursor_left(),
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }
            WindowEvent::Resized(size) => self.set_window_size(size.width, size.height),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndc_mapping() {
        let center = pixel_to_ndc(Vec2::new(400.0, 300.0), 800, 600).unwrap();
        assert!(center.length() < 1e-6);
        let top_left = pixel_to_ndc(Vec2::ZERO, 800, 600).unwrap();
        assert_eq!(top_left, Vec2::new(-1.0, 1.0));
        assert_eq!(pixel_to_ndc(Vec2::ZERO, 0, 600), None);
    }

    #[test]
    fn test_cursor_defaults_to_none_and_resets_on_leave() {
        let mut input = Input::new(800, 600);
        assert_eq!(input.cursor_ndc(), None);
        input.cursor_moved(Vec2::new(800.0, 600.0));
        assert_eq!(input.cursor_ndc(), Some(Vec2::new(1.0, -1.0)));
        input.cursor_left();
        assert_eq!(input.cursor_ndc(), None);
    }

    #[test]
    fn test_drag_accumulates_only_while_held() {
        let mut input = Input::new(800, 600);
        input.cursor_moved(Vec2::new(10.0, 10.0));
        input.cursor_moved(Vec2::new(20.0, 10.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.dragging = true;
        input.cursor_moved(Vec2::new(25.0, 14.0));
        input.cursor_moved(Vec2::new(30.0, 18.0));
        assert_eq!(input.drag_delta(), Vec2::new(10.0, 8.0));

        input.end_frame();
        assert_eq!(input.drag_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_key_bindings() {
        let mut input = Input::new(800, 600);
        input.key_pressed(KeyCode::Enter);
        input.key_pressed(KeyCode::KeyR);
        input.key_pressed(KeyCode::KeyQ);
        input.key_pressed(KeyCode::KeyT);
        assert_eq!(
            input.take_commands(),
            vec![SceneCommand::EnterField, SceneCommand::Reveal, SceneCommand::Dismiss]
        );
        assert!(input.take_commands().is_empty());
    }
}
