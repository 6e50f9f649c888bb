use bitflags::bitflags;
use rustc_hash::FxHashMap;
use crate::input::{InputEvent, InputKey};

pub const MAX_INPUT_TOUCHES: usize = 10;

bitflags! {
    /// Per-key state flags
    ///
    /// A key press sets `DOWN | TRIGGERING`; the next update turns
    /// `TRIGGERING` into `TRIGGERED`, and the update after that clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyState: u16 {
        const DOWN       = 1 << 0;
        const TRIGGERING = 1 << 1;
        const TRIGGERED  = 1 << 2;
    }
}

bitflags! {
    /// Gestures recognised on a pointer during the last update
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TouchActions: u16 {
        const HOVER      = 1 << 0;
        const TOUCH      = 1 << 1;
        const DRAG       = 1 << 2;
        const DROP       = 1 << 3;
        const LONG_PRESS = 1 << 4;
        const RELEASE    = 1 << 5;
        const TAP        = 1 << 6;
        const DOUBLE_TAP = 1 << 7;
        const TOUCHED    = 1 << 8;
    }
}

/// Gesture thresholds
#[derive(Debug, Clone, Copy)]
pub struct InputOptions {
    /// Seconds accumulated by `update`
    pub absolute_time: f32,
    /// Pixels a pointer must travel before it counts as a drag
    pub drag_threshold: f32,
    /// Seconds a still pointer must be held for a long press
    pub long_press_threshold: f32,
    /// Max seconds between two releases for a double tap
    pub double_tap_threshold: f32,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            absolute_time: 0.0,
            drag_threshold: 10.0,
            long_press_threshold: 1.0,
            double_tap_threshold: 0.3,
        }
    }
}

/// Public snapshot of one pointer
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchState {
    pub x: f32,
    pub y: f32,
    /// Offset from where the pointer went down
    pub dx: f32,
    pub dy: f32,
    pub vx: f32,
    pub vy: f32,
    pub button: usize,
    pub actions: TouchActions,
}

#[derive(Debug, Clone, Copy, Default)]
struct Touch {
    touching: bool,
    detected_touched: bool,
    detected_release: bool,
    detected_double_tap: bool,
    detected_move: bool,
    detected_long_press: bool,
    detected_drag: bool,
    long_press_time: f32,
    last_tap_time: Option<f32>,
    last_x: f32,
    last_y: f32,
    start_x: f32,
    start_y: f32,
    vel_x: f32,
    vel_y: f32,
    x: f32,
    y: f32,
    button: usize,
    actions: TouchActions,
}

impl Touch {
    fn down(&mut self, x: f32, y: f32, button: usize) {
        self.x = x;
        self.y = y;
        self.button = button;
        if !self.touching {
            self.detected_touched = true;
        }
        self.touching = true;
        self.start_x = x;
        self.start_y = y;
        self.last_x = x;
        self.last_y = y;
    }

    fn moved(&mut self, x: f32, y: f32, options: &InputOptions) {
        self.x = x;
        self.y = y;
        if !self.detected_move {
            self.vel_x = x - self.last_x;
            self.vel_y = y - self.last_y;
            self.last_x = x;
            self.last_y = y;
            let dx = (self.start_x - x).abs();
            let dy = (self.start_y - y).abs();
            self.detected_move = dx > options.drag_threshold || dy > options.drag_threshold;
        }
    }

    fn up(&mut self, x: f32, y: f32, button: usize, options: &InputOptions) {
        self.x = x;
        self.y = y;
        self.button = button;
        self.touching = false;
        self.detected_release = true;
        if let Some(last) = self.last_tap_time {
            if options.absolute_time - last < options.double_tap_threshold {
                self.detected_double_tap = true;
            }
        }
        self.last_tap_time = Some(options.absolute_time);
    }

    /// Fold the events seen since the last update into `actions`.
    /// Returns whether the pointer still counts as present.
    fn update(&mut self, dt: f32, options: &InputOptions) -> bool {
        let mut actions = TouchActions::empty();

        if self.touching {
            actions |= TouchActions::TOUCH;
            if self.detected_touched {
                actions |= TouchActions::TOUCHED;
            }
            if self.detected_move {
                actions |= TouchActions::DRAG;
                self.detected_drag = true;
                // no long press once the pointer has been dragged
                self.long_press_time = f32::MIN;
            } else {
                self.long_press_time += dt;
                if self.long_press_time > options.long_press_threshold {
                    self.detected_long_press = true;
                }
            }
            if self.detected_long_press {
                actions |= TouchActions::LONG_PRESS;
            }
        } else {
            if self.detected_long_press {
                actions |= TouchActions::LONG_PRESS;
            }
            if self.detected_drag {
                actions |= TouchActions::DROP;
            } else if self.detected_move {
                actions |= TouchActions::HOVER;
            }
            if self.detected_double_tap {
                actions |= TouchActions::DOUBLE_TAP;
                self.last_tap_time = None;
            }
            if self.detected_release {
                if actions.is_empty() {
                    actions |= TouchActions::TAP;
                }
                actions |= TouchActions::RELEASE;
            }
            self.long_press_time = 0.0;
            self.detected_long_press = false;
            self.detected_drag = false;
        }

        self.detected_touched = false;
        self.detected_move = false;
        self.detected_release = false;
        self.detected_double_tap = false;
        self.actions = actions;

        self.touching || actions.intersects(TouchActions::RELEASE | TouchActions::HOVER)
    }
}

/// Keyboard, pointer and wheel state for the current frame
#[derive(Debug, Clone)]
pub struct InputState {
    pub options: InputOptions,
    touches: [Touch; MAX_INPUT_TOUCHES],
    touch_count: usize,
    /// Highest pointer index seen since all pointers went away
    pointers: Option<usize>,
    keys: FxHashMap<InputKey, KeyState>,
    key_count: usize,
    wheel_delta: i32,
    wheel_delta_changed: bool,
    typed: Vec<char>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            options: InputOptions::default(),
            touches: [Touch::default(); MAX_INPUT_TOUCHES],
            touch_count: 0,
            pointers: None,
            keys: FxHashMap::default(),
            key_count: 0,
            wheel_delta: 0,
            wheel_delta_changed: false,
            typed: Vec::new(),
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::KeyDown(key) => {
                self.keys.insert(key, KeyState::TRIGGERING | KeyState::DOWN);
            }
            InputEvent::KeyUp(key) => {
                self.keys.insert(key, KeyState::TRIGGERING);
            }
            InputEvent::KeyTyped(_, c) => {
                if !c.is_control() {
                    self.typed.push(c);
                }
            }
            InputEvent::PointerDown { x, y, button } => {
                if let Some(touch) = self.touch_mut(button) {
                    touch.down(x, y, button);
                }
            }
            InputEvent::PointerMove { x, y, button } => {
                let options = self.options;
                if let Some(touch) = self.touch_mut(button) {
                    touch.moved(x, y, &options);
                }
            }
            InputEvent::PointerUp { x, y, button } => {
                let options = self.options;
                if let Some(touch) = self.touch_mut(button) {
                    touch.up(x, y, button, &options);
                }
            }
            InputEvent::Scroll(delta) => {
                self.wheel_delta = delta;
                self.wheel_delta_changed = true;
            }
        }
    }

    fn touch_mut(&mut self, button: usize) -> Option<&mut Touch> {
        if button >= MAX_INPUT_TOUCHES {
            return None;
        }
        self.pointers = Some(self.pointers.map_or(button, |p| p.max(button)));
        Some(&mut self.touches[button])
    }

    /// Advance gesture timers and key state by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.options.absolute_time += dt;

        self.touch_count = 0;
        if let Some(highest) = self.pointers {
            let options = self.options;
            for touch in &mut self.touches[..=highest] {
                if touch.update(dt, &options) {
                    self.touch_count += 1;
                }
            }
        }
        if self.touch_count == 0 {
            self.pointers = None;
        }

        self.key_count = 0;
        for state in self.keys.values_mut() {
            if state.contains(KeyState::TRIGGERING) {
                *state = (*state & KeyState::DOWN) | KeyState::TRIGGERED;
            } else if state.contains(KeyState::TRIGGERED) {
                *state &= KeyState::DOWN;
            }
            if !state.is_empty() {
                self.key_count += 1;
            }
        }

        if self.wheel_delta_changed {
            self.wheel_delta_changed = false;
        } else {
            self.wheel_delta = 0;
        }
    }

    pub fn key_state(&self, key: InputKey) -> KeyState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn has_key_state(&self, key: InputKey, state: KeyState) -> bool {
        self.key_state(key).contains(state)
    }

    pub fn is_down(&self, key: InputKey) -> bool {
        self.has_key_state(key, KeyState::DOWN)
    }

    /// Keys with any state bit set after the last update
    pub fn active_key_count(&self) -> usize {
        self.key_count
    }

    pub fn touch_count(&self) -> usize {
        self.touch_count
    }

    pub fn touch(&self, pointer: usize) -> Option<TouchState> {
        let touch = self.touches.get(pointer)?;
        Some(TouchState {
            x: touch.x,
            y: touch.y,
            dx: touch.x - touch.start_x,
            dy: touch.y - touch.start_y,
            vx: touch.vel_x,
            vy: touch.vel_y,
            button: touch.button,
            actions: touch.actions,
        })
    }

    pub fn wheel_delta(&self) -> i32 {
        self.wheel_delta
    }

    /// Printable characters typed since the last call
    pub fn drain_typed(&mut self) -> Vec<char> {
        std::mem::take(&mut self.typed)
    }
}

#[cfg(test)]
#[path = "input_state_tests.rs"]
mod tests;
