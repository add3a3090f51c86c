//! Pointer and keyboard input shared between the window and the frame loop.
//!
//! The window thread writes into a [`SharedInput`] as events arrive; the
//! frame driver calls [`SharedInput::take_frame`] once per tick, which
//! under a single lock folds held pan keys into the pan offset, snapshots
//! everything the physics kernel needs and drains one-shot requests.
//!
//! # Bindings
//!
//! | Input | Effect |
//! |-------|--------|
//! | Left mouse held | pull particles toward the pointer |
//! | Right mouse drag | pan by the drag delta |
//! | `W` `A` `S` `D` | pan at [`PAN_SPEED`] px/s |
//! | `Space` | slow down all particles once |
//! | `1`..`4` | reset to square, multi-cluster, disc, image |
//! | `R` | toggle return-to-start |
//! | `Escape` | close the window |
//!
//! ```ignore
//! let input = SharedInput::new();
//! input.set_pointer(Vec2::new(100.0, 100.0));
//! input.set_pressed(true);
//!
//! let frame = input.take_frame(1.0 / 120.0);
//! assert!(frame.tick.pressed);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::layout::Layout;
use crate::physics::TickInput;

/// Pan speed for held movement keys, in px/s.
pub const PAN_SPEED: f32 = 500.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

/// Keys the simulation reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    R,
    Key1,
    Key2,
    Key3,
    Key4,
    Space,
    Escape,
    Other,
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::KeyW => KeyCode::W,
            WinitKeyCode::KeyA => KeyCode::A,
            WinitKeyCode::KeyS => KeyCode::S,
            WinitKeyCode::KeyD => KeyCode::D,
            WinitKeyCode::KeyR => KeyCode::R,
            WinitKeyCode::Digit1 | WinitKeyCode::Numpad1 => KeyCode::Key1,
            WinitKeyCode::Digit2 | WinitKeyCode::Numpad2 => KeyCode::Key2,
            WinitKeyCode::Digit3 | WinitKeyCode::Numpad3 => KeyCode::Key3,
            WinitKeyCode::Digit4 | WinitKeyCode::Numpad4 => KeyCode::Key4,
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other,
        }
    }
}

impl KeyCode {
    /// Unit pan direction for a movement key.
    pub fn pan_direction(self) -> Option<Vec2> {
        match self {
            KeyCode::A => Some(Vec2::new(1.0, 0.0)),
            KeyCode::D => Some(Vec2::new(-1.0, 0.0)),
            KeyCode::S => Some(Vec2::new(0.0, -1.0)),
            KeyCode::W => Some(Vec2::new(0.0, 1.0)),
            _ => None,
        }
    }

    /// Layout selected by a number key.
    pub fn layout(self) -> Option<Layout> {
        match self {
            KeyCode::Key1 => Layout::from_number(1),
            KeyCode::Key2 => Layout::from_number(2),
            KeyCode::Key3 => Layout::from_number(3),
            KeyCode::Key4 => Layout::from_number(4),
            _ => None,
        }
    }
}

/// One-shot requests collected since the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requests {
    /// Latest requested canvas size.
    pub resize: Option<(u32, u32)>,
    /// Latest requested layout reset.
    pub reset: Option<Layout>,
    /// Whether return-to-start was toggled an odd number of times.
    pub toggle_return_to_start: bool,
}

impl Requests {
    pub fn is_empty(&self) -> bool {
        self.resize.is_none() && self.reset.is_none() && !self.toggle_return_to_start
    }
}

/// Everything the frame loop consumes for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputFrame {
    pub tick: TickInput,
    pub requests: Requests,
}

/// Raw input state. Lives behind [`SharedInput`].
#[derive(Debug, Default)]
pub struct InputState {
    pointer: Vec2,
    pressed: bool,
    panning: bool,
    keys_held: HashSet<KeyCode>,
    pan: Vec2,
    slow_down: bool,
    requests: Requests,
}

impl InputState {
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn pressed(&self) -> bool {
        self.pressed
    }

    pub fn panning(&self) -> bool {
        self.panning
    }

    fn take_frame(&mut self, dt: f32) -> InputFrame {
        for key in &self.keys_held {
            if let Some(dir) = key.pan_direction() {
                self.pan += dir * PAN_SPEED * dt;
            }
        }

        let tick = TickInput {
            dt,
            pointer: self.pointer,
            pressed: self.pressed,
            pan: self.pan,
            slow_down: self.slow_down,
        };
        self.pan = Vec2::ZERO;
        self.slow_down = false;

        InputFrame {
            tick,
            requests: std::mem::take(&mut self.requests),
        }
    }
}

/// Cloneable handle to the input state shared by the window and the driver.
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    state: Arc<Mutex<InputState>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InputState> {
        // The state stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the raw state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&InputState) -> R) -> R {
        f(&self.lock())
    }

    // ========== Pointer ==========

    /// Move the pointer. While panning, the movement is added to the pan.
    pub fn set_pointer(&self, position: Vec2) {
        let mut state = self.lock();
        if state.panning {
            let delta = position - state.pointer;
            state.pan += delta;
        }
        state.pointer = position;
    }

    /// Start or stop pulling.
    pub fn set_pressed(&self, pressed: bool) {
        self.lock().pressed = pressed;
    }

    /// Start or stop drag panning.
    pub fn set_panning(&self, panning: bool) {
        self.lock().panning = panning;
    }

    pub fn mouse_down(&self, button: MouseButton) {
        match button {
            MouseButton::Left => self.set_pressed(true),
            MouseButton::Right => self.set_panning(true),
            _ => {}
        }
    }

    /// Any button release ends both pulling and panning.
    pub fn mouse_up(&self) {
        let mut state = self.lock();
        state.pressed = false;
        state.panning = false;
    }

    /// Add to the pan offset applied on the next tick.
    pub fn add_pan(&self, delta: Vec2) {
        self.lock().pan += delta;
    }

    // ========== Keyboard ==========

    /// Record a key press and fire its one-shot action, if any.
    ///
    /// Auto-repeat presses of a key already held do not fire again.
    pub fn key_down(&self, key: KeyCode) {
        let mut state = self.lock();
        if !state.keys_held.insert(key) {
            return;
        }
        match key {
            KeyCode::Space => state.slow_down = true,
            KeyCode::R => {
                state.requests.toggle_return_to_start = !state.requests.toggle_return_to_start;
            }
            _ => {
                if let Some(layout) = key.layout() {
                    state.requests.reset = Some(layout);
                }
            }
        }
    }

    pub fn key_up(&self, key: KeyCode) {
        self.lock().keys_held.remove(&key);
    }

    // ========== Requests ==========

    pub fn request_resize(&self, width: u32, height: u32) {
        self.lock().requests.resize = Some((width, height));
    }

    pub fn request_reset(&self, layout: Layout) {
        self.lock().requests.reset = Some(layout);
    }

    pub fn request_slow_down(&self) {
        self.lock().slow_down = true;
    }

    pub fn toggle_return_to_start(&self) {
        let mut state = self.lock();
        state.requests.toggle_return_to_start = !state.requests.toggle_return_to_start;
    }

    /// Snapshot input for one tick of length `dt` and drain requests.
    pub fn take_frame(&self, dt: f32) -> InputFrame {
        self.lock().take_frame(dt)
    }
}

/// What the window should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Continue,
    Exit,
}

/// Translate a winit window event into input state changes.
pub fn handle_window_event(input: &SharedInput, event: &WindowEvent) -> EventResponse {
    match event {
        WindowEvent::CloseRequested => return EventResponse::Exit,

        WindowEvent::KeyboardInput { event, .. } => {
            if let PhysicalKey::Code(code) = event.physical_key {
                let key = KeyCode::from(code);
                match event.state {
                    ElementState::Pressed => {
                        if key == KeyCode::Escape {
                            return EventResponse::Exit;
                        }
                        input.key_down(key);
                    }
                    ElementState::Released => input.key_up(key),
                }
            }
        }

        WindowEvent::MouseInput { state, button, .. } => match state {
            ElementState::Pressed => input.mouse_down(MouseButton::from(*button)),
            ElementState::Released => input.mouse_up(),
        },

        WindowEvent::CursorMoved { position, .. } => {
            input.set_pointer(Vec2::new(position.x as f32, position.y as f32));
        }

        WindowEvent::Resized(size) => {
            if size.width > 0 && size.height > 0 {
                input.request_resize(size.width, size.height);
            }
        }

        _ => {}
    }
    EventResponse::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_resets_pan_and_slow_down() {
        let input = SharedInput::new();
        input.add_pan(Vec2::new(3.0, -2.0));
        input.request_slow_down();
        input.set_pointer(Vec2::new(10.0, 20.0));
        input.set_pressed(true);

        let frame = input.take_frame(0.01);
        assert_eq!(frame.tick.pan, Vec2::new(3.0, -2.0));
        assert!(frame.tick.slow_down);
        assert!(frame.tick.pressed);
        assert_eq!(frame.tick.pointer, Vec2::new(10.0, 20.0));

        let next = input.take_frame(0.01);
        assert_eq!(next.tick.pan, Vec2::ZERO);
        assert!(!next.tick.slow_down);
        // continuous state survives
        assert!(next.tick.pressed);
    }

    #[test]
    fn test_held_keys_fold_into_pan() {
        let input = SharedInput::new();
        input.key_down(KeyCode::A);
        input.key_down(KeyCode::W);
        let frame = input.take_frame(0.5);
        assert_eq!(frame.tick.pan, Vec2::new(250.0, 250.0));

        input.key_up(KeyCode::A);
        input.key_down(KeyCode::S);
        let frame = input.take_frame(0.5);
        // W and S cancel
        assert_eq!(frame.tick.pan, Vec2::ZERO);
    }

    #[test]
    fn test_right_drag_pans() {
        let input = SharedInput::new();
        input.set_pointer(Vec2::new(5.0, 5.0));
        input.mouse_down(MouseButton::Right);
        input.set_pointer(Vec2::new(8.0, 1.0));
        input.set_pointer(Vec2::new(9.0, 1.0));
        input.mouse_up();
        input.set_pointer(Vec2::new(50.0, 50.0));

        let frame = input.take_frame(0.0);
        assert_eq!(frame.tick.pan, Vec2::new(4.0, -4.0));
        assert!(!frame.tick.pressed);
    }

    #[test]
    fn test_any_release_clears_pull_and_pan() {
        let input = SharedInput::new();
        input.mouse_down(MouseButton::Left);
        input.mouse_down(MouseButton::Right);
        input.mouse_up();
        input.with_state(|s| {
            assert!(!s.pressed());
            assert!(!s.panning());
        });
    }

    #[test]
    fn test_requests_drain_once() {
        let input = SharedInput::new();
        input.request_resize(10, 10);
        input.request_resize(30, 20);
        input.key_down(KeyCode::Key3);
        input.key_down(KeyCode::R);

        let frame = input.take_frame(0.01);
        assert_eq!(frame.requests.resize, Some((30, 20)));
        assert_eq!(frame.requests.reset, Some(Layout::Disc));
        assert!(frame.requests.toggle_return_to_start);

        assert!(input.take_frame(0.01).requests.is_empty());
    }

    #[test]
    fn test_key_repeat_does_not_refire() {
        let input = SharedInput::new();
        input.key_down(KeyCode::R);
        input.key_down(KeyCode::R);
        assert!(input.take_frame(0.0).requests.toggle_return_to_start);

        input.key_up(KeyCode::R);
        input.key_down(KeyCode::R);
        input.key_up(KeyCode::R);
        input.key_down(KeyCode::R);
        // two toggles cancel out
        assert!(!input.take_frame(0.0).requests.toggle_return_to_start);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCode::from(WinitKeyCode::Digit4).layout(), Some(Layout::Image));
        assert_eq!(KeyCode::from(WinitKeyCode::KeyD).pan_direction(), Some(Vec2::new(-1.0, 0.0)));
        assert_eq!(KeyCode::Space.pan_direction(), None);
        assert!(matches!(KeyCode::from(WinitKeyCode::KeyQ), KeyCode::Other));
    }
}
