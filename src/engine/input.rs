// Mouse input tracking for the orbit camera and door picking
// Abstracts winit events into a queryable per-frame snapshot

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// A press/release pair that moved less than this (pixels) is a click, not a drag.
const CLICK_SLOP: f32 = 4.0;

pub struct InputState {
    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    left_held: bool,
    press_position: Option<(f32, f32)>,
    dragged: bool,

    /// Cursor position of a completed left click this frame, reset in end_frame()
    pub click: Option<(f32, f32)>,

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,

    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            left_held: false,
            press_position: None,
            dragged: false,
            click: None,
            scroll_delta: 0.0,
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => match state {
                ElementState::Pressed => self.left_pressed(),
                ElementState::Released => self.left_released(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            _ => {}
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.click = None;
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    /// Left button held and moved past the click slop.
    pub fn is_dragging(&self) -> bool {
        self.left_held && self.dragged
    }

    fn cursor_moved(&mut self, x: f32, y: f32) {
        self.mouse_position = (x, y);
        if let Some((px, py)) = self.press_position {
            if (x - px).hypot(y - py) > CLICK_SLOP {
                self.dragged = true;
            }
        }
    }

    fn left_pressed(&mut self) {
        self.left_held = true;
        self.dragged = false;
        self.press_position = Some(self.mouse_position);
    }

    fn left_released(&mut self) {
        if self.left_held && !self.dragged {
            self.click = Some(self.mouse_position);
        }
        self.left_held = false;
        self.dragged = false;
        self.press_position = None;
    }
}
