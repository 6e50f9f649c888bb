use winit::keyboard::{KeyCode, NamedKey};

/// Logical keys understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputKey {
    Up,
    Down,
    Left,
    Right,
    Shift,
    Control,
    Alt,
    Command,
    CapsLock,
    Escape,
    Return,
    Backspace,
    Delete,
    Tab,
    BackButton,
    MenuButton,
    Space,
    /// Uppercase ASCII letter or digit
    Char(char),
}

impl InputKey {
    /// Map an ASCII letter, digit or space to a key
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(InputKey::Space),
            c if c.is_ascii_alphanumeric() => Some(InputKey::Char(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    /// Map a winit physical key code
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        let key = match code {
            KeyCode::ArrowUp => InputKey::Up,
            KeyCode::ArrowDown => InputKey::Down,
            KeyCode::ArrowLeft => InputKey::Left,
            KeyCode::ArrowRight => InputKey::Right,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => InputKey::Shift,
            KeyCode::ControlLeft | KeyCode::ControlRight => InputKey::Control,
            KeyCode::AltLeft | KeyCode::AltRight => InputKey::Alt,
            KeyCode::SuperLeft | KeyCode::SuperRight => InputKey::Command,
            KeyCode::CapsLock => InputKey::CapsLock,
            KeyCode::Escape => InputKey::Escape,
            KeyCode::Enter | KeyCode::NumpadEnter => InputKey::Return,
            KeyCode::Backspace => InputKey::Backspace,
            KeyCode::Delete => InputKey::Delete,
            KeyCode::Tab => InputKey::Tab,
            KeyCode::ContextMenu => InputKey::MenuButton,
            KeyCode::BrowserBack => InputKey::BackButton,
            KeyCode::Space => InputKey::Space,
            KeyCode::KeyA => InputKey::Char('A'),
            KeyCode::KeyB => InputKey::Char('B'),
            KeyCode::KeyC => InputKey::Char('C'),
            KeyCode::KeyD => InputKey::Char('D'),
            KeyCode::KeyE => InputKey::Char('E'),
            KeyCode::KeyF => InputKey::Char('F'),
            KeyCode::KeyG => InputKey::Char('G'),
            KeyCode::KeyH => InputKey::Char('H'),
            KeyCode::KeyI => InputKey::Char('I'),
            KeyCode::KeyJ => InputKey::Char('J'),
            KeyCode::KeyK => InputKey::Char('K'),
            KeyCode::KeyL => InputKey::Char('L'),
            KeyCode::KeyM => InputKey::Char('M'),
            KeyCode::KeyN => InputKey::Char('N'),
            KeyCode::KeyO => InputKey::Char('O'),
            KeyCode::KeyP => InputKey::Char('P'),
            KeyCode::KeyQ => InputKey::Char('Q'),
            KeyCode::KeyR => InputKey::Char('R'),
            KeyCode::KeyS => InputKey::Char('S'),
            KeyCode::KeyT => InputKey::Char('T'),
            KeyCode::KeyU => InputKey::Char('U'),
            KeyCode::KeyV => InputKey::Char('V'),
            KeyCode::KeyW => InputKey::Char('W'),
            KeyCode::KeyX => InputKey::Char('X'),
            KeyCode::KeyY => InputKey::Char('Y'),
            KeyCode::KeyZ => InputKey::Char('Z'),
            KeyCode::Digit0 => InputKey::Char('0'),
            KeyCode::Digit1 => InputKey::Char('1'),
            KeyCode::Digit2 => InputKey::Char('2'),
            KeyCode::Digit3 => InputKey::Char('3'),
            KeyCode::Digit4 => InputKey::Char('4'),
            KeyCode::Digit5 => InputKey::Char('5'),
            KeyCode::Digit6 => InputKey::Char('6'),
            KeyCode::Digit7 => InputKey::Char('7'),
            KeyCode::Digit8 => InputKey::Char('8'),
            KeyCode::Digit9 => InputKey::Char('9'),
            _ => return None,
        };
        Some(key)
    }

    /// Map a winit logical named key
    pub fn from_named_key(key: NamedKey) -> Option<Self> {
        let key = match key {
            NamedKey::ArrowUp => InputKey::Up,
            NamedKey::ArrowDown => InputKey::Down,
            NamedKey::ArrowLeft => InputKey::Left,
            NamedKey::ArrowRight => InputKey::Right,
            NamedKey::Shift => InputKey::Shift,
            NamedKey::Control => InputKey::Control,
            NamedKey::Alt => InputKey::Alt,
            NamedKey::Super | NamedKey::Meta => InputKey::Command,
            NamedKey::CapsLock => InputKey::CapsLock,
            NamedKey::Escape => InputKey::Escape,
            NamedKey::Enter => InputKey::Return,
            NamedKey::Backspace => InputKey::Backspace,
            NamedKey::Delete => InputKey::Delete,
            NamedKey::Tab => InputKey::Tab,
            NamedKey::BrowserBack | NamedKey::GoBack => InputKey::BackButton,
            NamedKey::ContextMenu => InputKey::MenuButton,
            NamedKey::Space => InputKey::Space,
            _ => return None,
        };
        Some(key)
    }
}

/// One host input event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(InputKey),
    KeyUp(InputKey),
    KeyTyped(InputKey, char),
    PointerMove { x: f32, y: f32, button: usize },
    PointerDown { x: f32, y: f32, button: usize },
    PointerUp { x: f32, y: f32, button: usize },
    Scroll(i32),
}
